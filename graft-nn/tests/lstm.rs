use graft_core::{GraftError, Graph, NodeId, OpKind, UniParams};
use graft_nn::{Direction, LstmBuilder, LstmParams};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn params(out_dim: usize, in_dim: usize) -> LstmParams {
    let mut rng = SmallRng::seed_from_u64(69420);
    let mut params = LstmParams::default();
    params.init(out_dim, in_dim, &mut rng);
    params
}

fn sequence(graph: &mut Graph, n: usize) -> Vec<NodeId> {
    (0..n)
        .map(|i| graph.input([i as f32 * 0.3 - 0.5, 1.0 - i as f32 * 0.2]))
        .collect()
}

#[test]
fn left_to_right() -> Result<(), GraftError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let params = params(2, 2);
    let mut graph = Graph::new(false, 0);
    let xs = sequence(&mut graph, 5);
    let mut lstm = LstmBuilder::new(&params, 0.0, Direction::LeftToRight);
    lstm.resize(8);
    lstm.forward(&mut graph, &xs)?;
    assert_eq!(lstm.len(), 5);
    assert_eq!(lstm.hiddens().count(), 5);
    assert!(lstm.hiddens().all(|h| graph.dim(h) == 2));
    assert_eq!(graph.count(OpKind::Bucket), 1);
    assert_eq!(graph.count(OpKind::Linear), 38);
    assert_eq!(graph.count(OpKind::Add), 23);
    assert_eq!(graph.count(OpKind::Sigmoid), 14);
    assert_eq!(graph.count(OpKind::Tanh), 10);
    assert_eq!(graph.count(OpKind::Mul), 14);
    // Computed in input order
    let hiddens: Vec<NodeId> = lstm.hiddens().collect();
    assert!(hiddens.windows(2).all(|w| w[0] < w[1]));
    assert!(lstm.slot(0).is_some_and(|s| s.forget_gate.is_none()));
    assert!(lstm.slot(4).is_some_and(|s| s.forget_gate.is_some()));
    assert!(lstm.slot(5).is_none());
    Ok(())
}

#[test]
fn right_to_left() -> Result<(), GraftError> {
    let params = params(2, 2);
    let mut graph = Graph::new(false, 0);
    let xs = sequence(&mut graph, 5);
    let mut lstm = LstmBuilder::new(&params, 0.0, Direction::RightToLeft);
    lstm.resize(5);
    lstm.forward(&mut graph, &xs)?;
    assert_eq!(lstm.len(), 5);
    let hiddens: Vec<NodeId> = lstm.hiddens().collect();
    assert_eq!(hiddens.len(), 5);
    // Still indexed by position, but computed in order 4, 3, 2, 1, 0
    assert!(hiddens.windows(2).all(|w| w[0] > w[1]));
    assert!(lstm.slot(4).is_some_and(|s| s.forget_gate.is_none()));
    assert!(lstm.slot(0).is_some_and(|s| s.forget_gate.is_some()));
    assert_eq!(graph.count(OpKind::Linear), 38);
    Ok(())
}

#[test]
fn single_position_is_direction_independent() -> Result<(), GraftError> {
    let params = params(3, 2);
    let mut graph = Graph::new(false, 0);
    let xs = [graph.input([0.7f32, -0.2])];
    let mut l2r = LstmBuilder::new(&params, 0.0, Direction::LeftToRight);
    let mut r2l = LstmBuilder::new(&params, 0.0, Direction::RightToLeft);
    l2r.resize(1);
    r2l.resize(1);
    l2r.forward(&mut graph, &xs)?;
    r2l.forward(&mut graph, &xs)?;
    let a: Vec<NodeId> = l2r.hiddens().collect();
    let b: Vec<NodeId> = r2l.hiddens().collect();
    assert_ne!(a, b);
    assert_eq!(graph.value(a[0]), graph.value(b[0]));
    Ok(())
}

#[test]
fn boundary_cell_has_no_forget_path() -> Result<(), GraftError> {
    let mut params = params(2, 2);
    // Saturate the forget gate, so that applying it at boundary would be observable
    let mut rng = SmallRng::seed_from_u64(1);
    params.forget_input.init(2, 2, true, &mut rng);
    params.forget_input.b.val.data.fill(10.0);
    let mut graph = Graph::new(false, 0);
    let xs = sequence(&mut graph, 2);
    let mut lstm = LstmBuilder::new(&params, 0.0, Direction::LeftToRight);
    lstm.resize(2);
    lstm.forward(&mut graph, &xs)?;

    let Some(first) = lstm.slot(0) else {
        panic!("missing boundary slot");
    };
    assert_eq!(first.cell, first.input_filter);
    assert_eq!(first.forget_filter, None);
    let expected: Vec<f32> = graph
        .value(first.half_cell.activation)
        .iter()
        .zip(graph.value(first.input_gate.activation))
        .map(|(c, i)| c * i)
        .collect();
    assert_eq!(graph.value(first.cell), expected);

    let Some(second) = lstm.slot(1) else {
        panic!("missing interior slot");
    };
    let Some(forget_filter) = second.forget_filter else {
        panic!("missing forget filter");
    };
    let expected: Vec<f32> = graph
        .value(second.input_filter)
        .iter()
        .zip(graph.value(forget_filter))
        .map(|(a, b)| a + b)
        .collect();
    assert_eq!(graph.value(second.cell), expected);
    Ok(())
}

#[test]
fn invalid_inputs_are_ignored() -> Result<(), GraftError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let params = params(2, 2);
    let mut graph = Graph::new(false, 0);
    let xs = sequence(&mut graph, 3);
    let mut lstm = LstmBuilder::new(&params, 0.0, Direction::LeftToRight);
    lstm.resize(3);
    lstm.forward(&mut graph, &xs)?;
    let hiddens: Vec<NodeId> = lstm.hiddens().collect();
    let nodes = graph.len();

    // Empty sequence
    lstm.forward(&mut graph, &[])?;
    // Width mismatch in a later element
    let wide = graph.input([1f32, 2., 3.]);
    lstm.forward(&mut graph, &[xs[0], wide])?;
    // Longer than capacity
    let long = sequence(&mut graph, 4);
    lstm.forward(&mut graph, &long)?;

    assert_eq!(lstm.len(), 3);
    assert_eq!(lstm.hiddens().collect::<Vec<_>>(), hiddens);
    assert_eq!(graph.len(), nodes + 1 + 4);
    Ok(())
}

#[test]
fn resize_and_clear() -> Result<(), GraftError> {
    let params = params(2, 2);
    let mut graph = Graph::new(false, 0);
    let mut lstm = LstmBuilder::new(&params, 0.0, Direction::LeftToRight);
    assert!(lstm.is_empty());
    assert_eq!((lstm.in_dim(), lstm.out_dim()), (2, 2));
    let xs = sequence(&mut graph, 1);
    // No slots allocated yet
    lstm.forward(&mut graph, &xs)?;
    assert_eq!(lstm.len(), 0);

    lstm.resize(4);
    assert_eq!(lstm.capacity(), 4);
    let xs = sequence(&mut graph, 4);
    lstm.forward(&mut graph, &xs)?;
    assert_eq!(lstm.len(), 4);
    lstm.forward(&mut graph, &xs[..2])?;
    assert_eq!(lstm.len(), 2);
    assert!(lstm.slot(3).is_none());
    lstm.resize(1);
    assert_eq!(lstm.len(), 1);
    lstm.clear();
    assert!(lstm.is_empty());
    assert_eq!(lstm.len(), 0);
    assert_eq!(lstm.cells().count(), 0);
    Ok(())
}

#[test]
fn dropout_masks_hidden() -> Result<(), GraftError> {
    let params = params(16, 2);
    let mut graph = Graph::new(true, 3);
    let xs = sequence(&mut graph, 3);
    let mut lstm = LstmBuilder::new(&params, 0.5, Direction::LeftToRight);
    lstm.resize(3);
    lstm.forward(&mut graph, &xs)?;
    for idx in 0..3 {
        let Some(slot) = lstm.slot(idx) else {
            panic!("missing slot {idx}");
        };
        let full: Vec<f32> = graph
            .value(slot.half_hidden)
            .iter()
            .zip(graph.value(slot.output_gate.activation))
            .map(|(a, b)| a * b)
            .collect();
        for (h, f) in graph.value(slot.hidden).iter().zip(full) {
            assert!(*h == 0.0 || *h == f);
        }
    }
    Ok(())
}

#[test]
fn inconsistent_params_reset_len() -> Result<(), GraftError> {
    let mut params = params(2, 2);
    let mut graph = Graph::new(false, 0);
    let xs = sequence(&mut graph, 3);
    {
        let mut lstm = LstmBuilder::new(&params, 0.0, Direction::LeftToRight);
        lstm.resize(3);
        lstm.forward(&mut graph, &xs)?;
        assert_eq!(lstm.len(), 3);
    }
    let mut rng = SmallRng::seed_from_u64(2);
    let mut wrong = UniParams::default();
    wrong.init(3, 3, false, &mut rng);
    params.forget_hidden = wrong;
    let mut lstm = LstmBuilder::new(&params, 0.0, Direction::LeftToRight);
    lstm.resize(3);
    assert!(lstm.forward(&mut graph, &xs).is_err());
    assert_eq!(lstm.len(), 0);
    assert_eq!(lstm.hiddens().count(), 0);
    Ok(())
}
