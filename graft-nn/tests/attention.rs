use graft_core::{GraftError, Graph, Node, OpKind};
use graft_nn::{AttentionBuilder, AttentionParams};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn params(hidden_dim: usize, guide_dim: usize) -> AttentionParams {
    let mut rng = SmallRng::seed_from_u64(69420);
    let mut params = AttentionParams::default();
    params.init(hidden_dim, guide_dim, &mut rng);
    params
}

#[test]
fn bilinear_scores() -> Result<(), GraftError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let params = params(4, 3);
    let mut graph = Graph::new(false, 0);
    let candidates: Vec<_> = (0..5)
        .map(|i| graph.input([i as f32, 1., -1., 0.5]))
        .collect();
    let guide = graph.input([1f32, 2., 3.]);
    let mut builder = AttentionBuilder::new(&params);
    let hidden = builder.forward(&mut graph, &candidates, guide)?;
    assert_eq!(graph.dim(hidden), 4);
    assert_eq!(builder.hidden(), Some(hidden));
    assert_eq!(builder.intermediate_nodes().len(), 5);
    assert_eq!(builder.weights().len(), 5);
    assert_eq!(graph.count(OpKind::Bilinear), 5);
    assert_eq!(graph.count(OpKind::Linear), 5);
    assert_eq!(graph.count(OpKind::Attention), 1);
    for (i, (c, w)) in builder
        .intermediate_nodes()
        .iter()
        .zip(builder.weights())
        .enumerate()
    {
        assert_eq!(graph.node(*c), &Node::Bilinear(candidates[i], guide));
        assert_eq!(graph.dim(*c), 4);
        assert!(graph.value(*c).iter().all(|x| x.abs() < 1.0));
        assert_eq!(graph.node(*w), &Node::Linear(*c));
        assert_eq!(graph.dim(*w), 1);
    }
    assert_eq!(
        graph.node(hidden),
        &Node::Attention {
            values: candidates.clone().into(),
            scores: builder.weights().into(),
        }
    );
    Ok(())
}

#[test]
#[should_panic]
fn empty_candidates() {
    let params = params(4, 3);
    let mut graph = Graph::new(false, 0);
    let guide = graph.input([0f32; 3]);
    let mut builder = AttentionBuilder::new(&params);
    let _ = builder.forward(&mut graph, &[], guide);
}

#[test]
#[should_panic]
fn candidate_mismatch() {
    let params = params(4, 3);
    let mut graph = Graph::new(false, 0);
    let x = graph.input([0f32; 3]);
    let guide = graph.input([0f32; 3]);
    let mut builder = AttentionBuilder::new(&params);
    let _ = builder.forward(&mut graph, &[x], guide);
}

#[test]
fn guide_mismatch_unwinds_without_side_effects() -> Result<(), GraftError> {
    let params = params(4, 3);
    let mut graph = Graph::new(false, 0);
    let x = graph.input([1f32; 4]);
    let guide = graph.input([0f32; 3]);
    let mut builder = AttentionBuilder::new(&params);
    let hidden = builder.forward(&mut graph, &[x], guide)?;
    let len = graph.len();
    let short_guide = graph.input([0f32; 2]);
    let res = catch_unwind(AssertUnwindSafe(|| {
        builder.forward(&mut graph, &[x], short_guide)
    }));
    assert!(res.is_err());
    assert_eq!(graph.len(), len + 1);
    assert_eq!(builder.hidden(), Some(hidden));
    assert_eq!(builder.weights().len(), 1);
    Ok(())
}

#[test]
fn inconsistent_params() {
    let mut params = params(4, 3);
    params.to_scalar_params.w.val = graft_core::Matrix::zeros(1, 2);
    let mut graph = Graph::new(false, 0);
    let x = graph.input([0f32; 4]);
    let guide = graph.input([0f32; 3]);
    let mut builder = AttentionBuilder::new(&params);
    assert!(matches!(
        builder.forward(&mut graph, &[x], guide),
        Err(GraftError::ShapeError(_))
    ));
    assert_eq!(builder.hidden(), None);
}
