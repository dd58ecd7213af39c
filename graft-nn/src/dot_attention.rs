use crate::attention::check_attention_inputs;
use graft_core::{
    GraftError, Graph, NodeId, ParameterSet, Trainables, Transferable, TransferableComponents,
    UniParams,
};
use nanoserde::{DeJson, SerJson};
use rand::Rng;

/// Parameters of dot attention
#[derive(Debug, Clone, Default, PartialEq, SerJson, DeJson)]
pub struct DotAttentionParams {
    /// Projects candidate to scalar
    pub uni1: UniParams,
    /// Projects guide to scalar
    pub uni2: UniParams,
    /// Width of candidates
    pub hidden_dim: usize,
    /// Width of guide
    pub guide_dim: usize,
}

impl DotAttentionParams {
    /// Initialize for candidates of width hidden_dim and guide of width guide_dim
    pub fn init<R: Rng + ?Sized>(&mut self, hidden_dim: usize, guide_dim: usize, rng: &mut R) {
        self.uni1.init(1, hidden_dim, false, rng);
        self.uni2.init(1, guide_dim, false, rng);
        self.hidden_dim = hidden_dim;
        self.guide_dim = guide_dim;
    }
}

impl ParameterSet for DotAttentionParams {
    fn export_trainables<'a>(&'a mut self, trainables: &mut Trainables<'a>) {
        self.uni1.export_trainables("uni1", trainables);
        self.uni2.export_trainables("uni2", trainables);
    }

    fn as_transferable(&mut self) -> Option<&mut dyn TransferableComponents> {
        Some(self)
    }
}

impl TransferableComponents for DotAttentionParams {
    fn name(&self) -> &'static str {
        "DotAttentionParams"
    }

    fn transferable_ptrs(&mut self) -> Vec<&mut dyn Transferable> {
        let mut ptrs = self.uni1.transferable_ptrs();
        ptrs.extend(self.uni2.transferable_ptrs());
        ptrs
    }
}

/// Dot attention, score of candidate c is `u1·c + u2·g`.
#[derive(Debug)]
pub struct DotAttentionBuilder<'p> {
    params: &'p DotAttentionParams,
    weights: Vec<NodeId>,
    hidden: Option<NodeId>,
}

impl<'p> DotAttentionBuilder<'p> {
    /// Builder bound to params
    #[must_use]
    pub const fn new(params: &'p DotAttentionParams) -> DotAttentionBuilder<'p> {
        DotAttentionBuilder {
            params,
            weights: Vec::new(),
            hidden: None,
        }
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
    /// declared width. Terminates under `panic = 'abort'` (the release
    /// profile here), otherwise the panic unwinds with graph and builder
    /// unchanged.
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
            "dot attention",
            graph,
            candidates,
            guide,
            params.hidden_dim,
            params.guide_dim,
        );
        self.weights.clear();
        self.hidden = None;
        for c in candidates {
            let u1 = graph.linear(&params.uni1, *c)?;
            let u2 = graph.linear(&params.uni2, guide)?;
            self.weights.push(graph.add(&[u1, u2])?);
        }
        let hidden = graph.attention(candidates, &self.weights)?;
        self.hidden = Some(hidden);
        Ok(hidden)
    }
}
