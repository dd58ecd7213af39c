use graft_core::{
    GraftError, Graph, NodeId, ParameterSet, Trainables, Transferable, TransferableComponents,
    UniParams,
};
use nanoserde::{DeJson, SerJson};
use rand::Rng;

/// Parameters of LSTM.
///
/// Each of the four gates has projection of previous hidden state
/// (`out x out`, no bias) and projection of current input (`out x in`, with bias).
#[derive(Debug, Clone, Default, PartialEq, SerJson, DeJson)]
pub struct LstmParams {
    /// Input gate, previous hidden
    pub input_hidden: UniParams,
    /// Input gate, current input
    pub input_input: UniParams,
    /// Output gate, previous hidden
    pub output_hidden: UniParams,
    /// Output gate, current input
    pub output_input: UniParams,
    /// Forget gate, previous hidden
    pub forget_hidden: UniParams,
    /// Forget gate, current input
    pub forget_input: UniParams,
    /// Cell candidate, previous hidden
    pub cell_hidden: UniParams,
    /// Cell candidate, current input
    pub cell_input: UniParams,
}

impl LstmParams {
    /// Initialize for inputs of width in_dim and hidden states of width out_dim
    pub fn init<R: Rng + ?Sized>(&mut self, out_dim: usize, in_dim: usize, rng: &mut R) {
        self.input_hidden.init(out_dim, out_dim, false, rng);
        self.input_input.init(out_dim, in_dim, true, rng);
        self.output_hidden.init(out_dim, out_dim, false, rng);
        self.output_input.init(out_dim, in_dim, true, rng);
        self.forget_hidden.init(out_dim, out_dim, false, rng);
        self.forget_input.init(out_dim, in_dim, true, rng);
        self.cell_hidden.init(out_dim, out_dim, false, rng);
        self.cell_input.init(out_dim, in_dim, true, rng);
    }

    /// Width of inputs
    #[must_use]
    pub const fn in_dim(&self) -> usize {
        self.input_input.in_dim()
    }

    /// Width of hidden states
    #[must_use]
    pub const fn out_dim(&self) -> usize {
        self.input_input.out_dim()
    }

    fn groups_mut(&mut self) -> [(&'static str, &mut UniParams); 8] {
        [
            ("input_hidden", &mut self.input_hidden),
            ("input_input", &mut self.input_input),
            ("output_hidden", &mut self.output_hidden),
            ("output_input", &mut self.output_input),
            ("forget_hidden", &mut self.forget_hidden),
            ("forget_input", &mut self.forget_input),
            ("cell_hidden", &mut self.cell_hidden),
            ("cell_input", &mut self.cell_input),
        ]
    }
}

impl ParameterSet for LstmParams {
    fn export_trainables<'a>(&'a mut self, trainables: &mut Trainables<'a>) {
        for (name, group) in self.groups_mut() {
            group.export_trainables(name, trainables);
        }
    }

    fn as_transferable(&mut self) -> Option<&mut dyn TransferableComponents> {
        Some(self)
    }
}

impl TransferableComponents for LstmParams {
    fn name(&self) -> &'static str {
        "LstmParams"
    }

    fn transferable_ptrs(&mut self) -> Vec<&mut dyn Transferable> {
        self.groups_mut()
            .into_iter()
            .flat_map(|(_, group)| group.transferable_ptrs())
            .collect()
    }
}

/// Traversal order of the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Position 0 is the boundary
    #[default]
    LeftToRight,
    /// Last position is the boundary
    RightToLeft,
}

/// Nodes of one gate: `activation(hidden + input)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// Projection of previous hidden state
    pub hidden: NodeId,
    /// Projection of current input
    pub input: NodeId,
    /// Sum of both projections
    pub sum: NodeId,
    /// Sigmoid, or tanh for cell candidate
    pub activation: NodeId,
}

/// Nodes created for one sequence position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LstmSlot {
    /// Input gate
    pub input_gate: Gate,
    /// Output gate
    pub output_gate: Gate,
    /// Cell candidate
    pub half_cell: Gate,
    /// Forget gate, None at boundary position
    pub forget_gate: Option<Gate>,
    /// `half_cell ⊙ input_gate`
    pub input_filter: NodeId,
    /// `previous cell ⊙ forget_gate`, None at boundary position
    pub forget_filter: Option<NodeId>,
    /// Cell state, same node as input_filter at boundary position
    pub cell: NodeId,
    /// `tanh(cell)`
    pub half_hidden: NodeId,
    /// `half_hidden ⊙ output_gate` with dropout
    pub hidden: NodeId,
}

// Recurrence state before computing a position
#[derive(Debug, Clone, Copy)]
enum Step {
    Boundary { bucket: NodeId },
    Interior { hidden: NodeId, cell: NodeId },
}

impl Step {
    fn prev_hidden(self) -> NodeId {
        match self {
            Step::Boundary { bucket } => bucket,
            Step::Interior { hidden, .. } => hidden,
        }
    }
}

/// LSTM over sequence of input nodes.
///
/// Builder keeps arena of per position slots. Arena must be allocated
/// with [LstmBuilder::resize] before forward, sequences longer than
/// [LstmBuilder::capacity] are rejected. Only the first [LstmBuilder::len]
/// slots are valid after forward.
#[derive(Debug)]
pub struct LstmBuilder<'p> {
    params: &'p LstmParams,
    dropout: f32,
    direction: Direction,
    slots: Vec<Option<LstmSlot>>,
    len: usize,
}

impl<'p> LstmBuilder<'p> {
    /// Builder bound to params, dropout is applied to hidden states
    #[must_use]
    pub fn new(params: &'p LstmParams, dropout: f32, direction: Direction) -> Self {
        LstmBuilder {
            params,
            dropout,
            direction,
            slots: Vec::new(),
            len: 0,
        }
    }

    /// Allocate slots for sequences of up to max_len positions
    pub fn resize(&mut self, max_len: usize) {
        self.slots.resize(max_len, None);
        self.len = self.len.min(max_len);
    }

    /// Drop all slots
    pub fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }

    /// Maximum sequence length
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Are no slots allocated?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Length of last processed sequence
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Width of inputs
    #[must_use]
    pub const fn in_dim(&self) -> usize {
        self.params.in_dim()
    }

    /// Width of hidden states
    #[must_use]
    pub const fn out_dim(&self) -> usize {
        self.params.out_dim()
    }

    /// Traversal direction
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Slot of position idx, None if idx is past [LstmBuilder::len]
    #[must_use]
    pub fn slot(&self, idx: usize) -> Option<&LstmSlot> {
        if idx < self.len {
            self.slots[idx].as_ref()
        } else {
            None
        }
    }

    /// Hidden states of last sequence, in input order
    pub fn hiddens(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.valid_slots().map(|s| s.hidden)
    }

    /// Cell states of last sequence, in input order
    pub fn cells(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.valid_slots().map(|s| s.cell)
    }

    fn valid_slots(&self) -> impl Iterator<Item = &LstmSlot> + '_ {
        self.slots[..self.len].iter().flatten()
    }

    /// Run LSTM over xs.
    ///
    /// Empty sequence, sequence longer than capacity or element whose width
    /// is not `in_dim` is reported and ignored, builder state is left unchanged.
    ///
    /// # Errors
    ///
    /// Errors if weights of params have inconsistent shapes. Valid length
    /// is reset to zero in that case.
    pub fn forward(&mut self, graph: &mut Graph, xs: &[NodeId]) -> Result<(), GraftError> {
        if xs.is_empty() {
            log::warn!("Empty inputs for lstm operation");
            return Ok(());
        }
        if xs.len() > self.capacity() {
            log::warn!(
                "Sequence of {} inputs does not fit lstm of capacity {}",
                xs.len(),
                self.capacity()
            );
            return Ok(());
        }
        let in_dim = self.in_dim();
        if let Some((i, x)) = xs.iter().enumerate().find(|(_, x)| graph.dim(**x) != in_dim) {
            log::warn!(
                "Input dim does not match for lstm operation, input {i} has dim {}, in_dim is {in_dim}",
                graph.dim(*x)
            );
            return Ok(());
        }

        self.len = 0;
        let n = xs.len();
        let mut step = Step::Boundary {
            bucket: graph.bucket(self.out_dim()),
        };
        for k in 0..n {
            let idx = match self.direction {
                Direction::LeftToRight => k,
                Direction::RightToLeft => n - 1 - k,
            };
            let slot = self.step(graph, step, xs[idx])?;
            self.slots[idx] = Some(slot);
            step = Step::Interior {
                hidden: slot.hidden,
                cell: slot.cell,
            };
        }
        self.len = n;
        Ok(())
    }

    fn step(&self, graph: &mut Graph, step: Step, x: NodeId) -> Result<LstmSlot, GraftError> {
        let p = self.params;
        let prev = step.prev_hidden();
        let input_gate = gate(graph, &p.input_hidden, &p.input_input, prev, x, Graph::sigmoid)?;
        let output_gate = gate(graph, &p.output_hidden, &p.output_input, prev, x, Graph::sigmoid)?;
        let half_cell = gate(graph, &p.cell_hidden, &p.cell_input, prev, x, Graph::tanh)?;
        let (forget_gate, prev_cell) = match step {
            Step::Boundary { .. } => (None, None),
            Step::Interior { cell, .. } => (
                Some(gate(graph, &p.forget_hidden, &p.forget_input, prev, x, Graph::sigmoid)?),
                Some(cell),
            ),
        };
        let input_filter = graph.mul(half_cell.activation, input_gate.activation)?;
        let (forget_filter, cell) = match (forget_gate, prev_cell) {
            (Some(f), Some(c)) => {
                let forget_filter = graph.mul(c, f.activation)?;
                (Some(forget_filter), graph.add(&[input_filter, forget_filter])?)
            }
            _ => (None, input_filter),
        };
        let half_hidden = graph.tanh(cell);
        let hidden = graph.mul_dropout(half_hidden, output_gate.activation, self.dropout)?;
        Ok(LstmSlot {
            input_gate,
            output_gate,
            half_cell,
            forget_gate,
            input_filter,
            forget_filter,
            cell,
            half_hidden,
            hidden,
        })
    }
}

fn gate(
    graph: &mut Graph,
    hidden_params: &UniParams,
    input_params: &UniParams,
    prev_hidden: NodeId,
    x: NodeId,
    activation: fn(&mut Graph, NodeId) -> NodeId,
) -> Result<Gate, GraftError> {
    let hidden = graph.linear(hidden_params, prev_hidden)?;
    let input = graph.linear(input_params, x)?;
    let sum = graph.add(&[hidden, input])?;
    Ok(Gate {
        hidden,
        input,
        sum,
        activation: activation(graph, sum),
    })
}
