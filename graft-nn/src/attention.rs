use graft_core::{
    BiParams, GraftError, Graph, NodeId, ParameterSet, Trainables, Transferable,
    TransferableComponents, UniParams,
};
use nanoserde::{DeJson, SerJson};
use rand::Rng;

/// Parameters of bilinear attention
#[derive(Debug, Clone, Default, PartialEq, SerJson, DeJson)]
pub struct AttentionParams {
    /// Combines candidate and guide into intermediate vector of width hidden_dim
    pub bi_atten: BiParams,
    /// Projects intermediate vector to scalar score
    pub to_scalar_params: UniParams,
    /// Width of candidates
    pub hidden_dim: usize,
    /// Width of guide
    pub guide_dim: usize,
}

impl AttentionParams {
    /// Initialize for candidates of width hidden_dim and guide of width guide_dim
    pub fn init<R: Rng + ?Sized>(&mut self, hidden_dim: usize, guide_dim: usize, rng: &mut R) {
        self.bi_atten.init(hidden_dim, hidden_dim, guide_dim, true, rng);
        self.to_scalar_params.init(1, hidden_dim, false, rng);
        self.hidden_dim = hidden_dim;
        self.guide_dim = guide_dim;
    }
}

impl ParameterSet for AttentionParams {
    fn export_trainables<'a>(&'a mut self, trainables: &mut Trainables<'a>) {
        self.bi_atten.export_trainables("bi_atten", trainables);
        self.to_scalar_params
            .export_trainables("to_scalar_params", trainables);
    }

    fn as_transferable(&mut self) -> Option<&mut dyn TransferableComponents> {
        Some(self)
    }
}

impl TransferableComponents for AttentionParams {
    fn name(&self) -> &'static str {
        "AttentionParams"
    }

    fn transferable_ptrs(&mut self) -> Vec<&mut dyn Transferable> {
        let mut ptrs = self.bi_atten.transferable_ptrs();
        ptrs.extend(self.to_scalar_params.transferable_ptrs());
        ptrs
    }
}

/// Bilinear attention.
///
/// Every candidate is combined with the guide through `tanh(W1·c + W2·g + b)`
/// and the result is projected to scalar score.
/// Output is softmax weighted sum of candidates.
#[derive(Debug)]
pub struct AttentionBuilder<'p> {
    params: &'p AttentionParams,
    intermediate_nodes: Vec<NodeId>,
    weights: Vec<NodeId>,
    hidden: Option<NodeId>,
}

impl<'p> AttentionBuilder<'p> {
    /// Builder bound to params
    #[must_use]
    pub const fn new(params: &'p AttentionParams) -> AttentionBuilder<'p> {
        AttentionBuilder {
            params,
            intermediate_nodes: Vec::new(),
            weights: Vec::new(),
            hidden: None,
        }
    }

    /// Bilinear nodes of last forward, one per candidate
    #[must_use]
    pub fn intermediate_nodes(&self) -> &[NodeId] {
        &self.intermediate_nodes
    }

    /// Score nodes of last forward, one per candidate
    #[must_use]
    pub fn weights(&self) -> &[NodeId] {
        &self.weights
    }

    /// Output of last forward
    #[must_use]
    pub const fn hidden(&self) -> Option<NodeId> {
        self.hidden
    }

    /// Attend over candidates using guide, returns output node of width `hidden_dim`.
    ///
    /// # Panics
    ///
    /// Panics if candidates are empty or any candidate or guide does not have
    /// declared width. These are bugs in model definition. The violation is
    /// logged before panicking. Binaries built with `panic = 'abort'`, like
    /// this workspace's release profile, terminate. With `panic = 'unwind'`
    /// the panic can be caught, graph and builder are then left unchanged.
    ///
    /// # Errors
    ///
    /// Errors if weights of params do not match declared dimensions.
    pub fn forward(
        &mut self,
        graph: &mut Graph,
        candidates: &[NodeId],
        guide: NodeId,
    ) -> Result<NodeId, GraftError> {
        let params = self.params;
        check_attention_inputs(
            "attention",
            graph,
            candidates,
            guide,
            params.hidden_dim,
            params.guide_dim,
        );
        self.intermediate_nodes.clear();
        self.weights.clear();
        self.hidden = None;
        for c in candidates {
            let intermediate = graph.bilinear(&params.bi_atten, *c, guide)?;
            self.intermediate_nodes.push(intermediate);
            self.weights
                .push(graph.linear(&params.to_scalar_params, intermediate)?);
        }
        let hidden = graph.attention(candidates, &self.weights)?;
        self.hidden = Some(hidden);
        Ok(hidden)
    }
}

/// Logs and panics on contract violations shared by both attention builders.
///
/// Nothing is pushed into graph before the checks pass. Whether the panic
/// aborts depends on the panic strategy of the final binary.
pub(crate) fn check_attention_inputs(
    op: &str,
    graph: &Graph,
    candidates: &[NodeId],
    guide: NodeId,
    hidden_dim: usize,
    guide_dim: usize,
) {
    if candidates.is_empty() {
        fatal(format!("Empty inputs for {op} operation"));
    }
    for (i, c) in candidates.iter().enumerate() {
        let dim = graph.dim(*c);
        if dim != hidden_dim {
            fatal(format!(
                "Input dim does not match for {op} operation, candidate {i} has dim {dim}, hidden_dim is {hidden_dim}"
            ));
        }
    }
    let dim = graph.dim(guide);
    if dim != guide_dim {
        fatal(format!(
            "Input dim does not match for {op} operation, guide has dim {dim}, guide_dim is {guide_dim}"
        ));
    }
}

fn fatal(msg: String) -> ! {
    log::error!("{msg}");
    panic!("{msg}");
}
