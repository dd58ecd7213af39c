use core::fmt::{Display, Formatter};

/// Id of node in [Graph](crate::graph::Graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// # Panics
    ///
    /// Panics if i does not fit into u32. Graph can not address more nodes.
    pub(crate) fn new(i: usize) -> NodeId {
        match u32::try_from(i) {
            Ok(i) => NodeId(i),
            Err(_) => panic!("Graph can not hold more than {} nodes", u32::MAX),
        }
    }

    /// Convert id to usize
    #[must_use]
    pub const fn i(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.0))
    }
}

/// Operator nodes. Each variant stores ids of its inputs.
/// Parameters of linear and bilinear nodes are not stored,
/// values are computed when the node is pushed into the graph.
#[derive(Clone, PartialEq)]
pub enum Node {
    /// Vector provided by the caller
    Input(usize),
    /// Constant vector, zero unless created with [Graph::constant](crate::graph::Graph::constant)
    Bucket(usize),
    /// W·x + b
    Linear(NodeId),
    /// tanh(W1·x1 + W2·x2 + b)
    Bilinear(NodeId, NodeId),
    /// Elementwise sum
    Add(Box<[NodeId]>),
    /// Elementwise product with dropout rate
    Mul(NodeId, NodeId, f32),
    /// Sigmoid activation
    Sigmoid(NodeId),
    /// Hyperbolic tangent activation
    Tanh(NodeId),
    /// Softmax over scalar scores, weighted sum of values
    Attention {
        /// Vectors being aggregated
        values: Box<[NodeId]>,
        /// One scalar score per value
        scores: Box<[NodeId]>,
    },
}

/// Kind of [Node] without its inputs, used for counting and plotting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
    /// [Node::Input]
    Input,
    /// [Node::Bucket]
    Bucket,
    /// [Node::Linear]
    Linear,
    /// [Node::Bilinear]
    Bilinear,
    /// [Node::Add]
    Add,
    /// [Node::Mul]
    Mul,
    /// [Node::Sigmoid]
    Sigmoid,
    /// [Node::Tanh]
    Tanh,
    /// [Node::Attention]
    Attention,
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Node::Input(dim) => f.write_fmt(format_args!("Input({dim})")),
            Node::Bucket(dim) => f.write_fmt(format_args!("Bucket({dim})")),
            Node::Linear(x) => f.write_fmt(format_args!("Linear({x})")),
            Node::Bilinear(x, y) => f.write_fmt(format_args!("Bilinear({x}, {y})")),
            Node::Add(xs) => f.write_fmt(format_args!("Add({})", join(xs))),
            Node::Mul(x, y, p) => {
                if *p > 0.0 {
                    f.write_fmt(format_args!("Mul({x}, {y}, dropout={p})"))
                } else {
                    f.write_fmt(format_args!("Mul({x}, {y})"))
                }
            }
            Node::Sigmoid(x) => f.write_fmt(format_args!("Sigmoid({x})")),
            Node::Tanh(x) => f.write_fmt(format_args!("Tanh({x})")),
            Node::Attention { values, scores } => f.write_fmt(format_args!(
                "Attention([{}], [{}])",
                join(values),
                join(scores)
            )),
        }
    }
}

fn join(ids: &[NodeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Iterator over parameters of node which does not allocate on heap.
pub struct NodeParametersIterator<'a> {
    parameters: [NodeId; 2],
    len: u8,
    idx: u8,
    rest: [&'a [NodeId]; 2],
}

impl<'a> Iterator for NodeParametersIterator<'a> {
    type Item = NodeId;
    fn next(&mut self) -> Option<Self::Item> {
        if self.idx < self.len {
            let idx = self.idx;
            self.idx += 1;
            return Some(self.parameters[idx as usize]);
        }
        for slice in &mut self.rest {
            let s: &'a [NodeId] = *slice;
            if let Some((first, tail)) = s.split_first() {
                *slice = tail;
                return Some(*first);
            }
        }
        None
    }
}

impl Node {
    /// Kind of self
    #[must_use]
    pub const fn kind(&self) -> OpKind {
        match self {
            Node::Input(..) => OpKind::Input,
            Node::Bucket(..) => OpKind::Bucket,
            Node::Linear(..) => OpKind::Linear,
            Node::Bilinear(..) => OpKind::Bilinear,
            Node::Add(..) => OpKind::Add,
            Node::Mul(..) => OpKind::Mul,
            Node::Sigmoid(..) => OpKind::Sigmoid,
            Node::Tanh(..) => OpKind::Tanh,
            Node::Attention { .. } => OpKind::Attention,
        }
    }

    /// Get number of parameters of self. This method does not allocate.
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        match self {
            Node::Input(..) | Node::Bucket(..) => 0,
            Node::Linear(..) | Node::Sigmoid(..) | Node::Tanh(..) => 1,
            Node::Bilinear(..) | Node::Mul(..) => 2,
            Node::Add(xs) => xs.len(),
            Node::Attention { values, scores } => values.len() + scores.len(),
        }
    }

    /// Get all parameters of self. This method does not allocate.
    #[must_use]
    pub fn parameters(&self) -> NodeParametersIterator<'_> {
        let zero = NodeId(0);
        let (parameters, len, rest): ([NodeId; 2], u8, [&[NodeId]; 2]) = match self {
            Node::Input(..) | Node::Bucket(..) => ([zero; 2], 0, [&[], &[]]),
            Node::Linear(x) | Node::Sigmoid(x) | Node::Tanh(x) => ([*x, zero], 1, [&[], &[]]),
            Node::Bilinear(x, y) | Node::Mul(x, y, _) => ([*x, *y], 2, [&[], &[]]),
            Node::Add(xs) => ([zero; 2], 0, [&xs[..], &[]]),
            Node::Attention { values, scores } => ([zero; 2], 0, [&values[..], &scores[..]]),
        };
        NodeParametersIterator {
            parameters,
            len,
            idx: 0,
            rest,
        }
    }

    /// Check if parameters of self contains nid.
    #[must_use]
    pub fn parameters_contain(&self, nid: NodeId) -> bool {
        self.parameters().any(|x| x == nid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_fits_u32() {
        assert_eq!(NodeId::new(u32::MAX as usize).i(), u32::MAX as usize);
    }

    #[test]
    #[should_panic(expected = "Graph can not hold more than")]
    #[cfg(target_pointer_width = "64")]
    fn id_overflow() {
        let _ = NodeId::new(u32::MAX as usize + 1);
    }

    #[test]
    fn parameters_iterate_all_inputs() {
        let (a, b, c) = (NodeId(0), NodeId(1), NodeId(2));
        let node = Node::Attention {
            values: Box::new([a, b]),
            scores: Box::new([c]),
        };
        assert_eq!(node.parameters().collect::<Vec<_>>(), [a, b, c]);
        assert_eq!(node.num_parameters(), 3);
        assert_eq!(Node::Mul(b, c, 0.0).parameters().collect::<Vec<_>>(), [b, c]);
        assert_eq!(Node::Bucket(4).parameters().count(), 0);
        assert!(Node::Add(Box::new([a, c])).parameters_contain(c));
    }

    #[test]
    fn debug_format() {
        let node = Node::Mul(NodeId(3), NodeId(4), 0.5);
        assert_eq!(format!("{node:?}"), "Mul(3, 4, dropout=0.5)");
        assert_eq!(format!("{:?}", Node::Add(Box::new([NodeId(1), NodeId(2)]))), "Add(1, 2)");
    }
}
