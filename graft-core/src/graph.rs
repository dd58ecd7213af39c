use crate::config::Config;
use crate::node::{Node, NodeId, OpKind};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

pub(crate) struct NodeData {
    pub(crate) node: Node,
    pub(crate) value: Vec<f32>,
}

/// Computation graph for one forward pass.
///
/// Graph owns every node pushed into it, builders only keep [NodeId]s.
/// Values are computed when the node is pushed, so nodes can only reference
/// nodes that were pushed before them. All nodes are released by [Graph::clear]
/// or when the graph is dropped.
pub struct Graph {
    nodes: Vec<NodeData>,
    pub(crate) rng: SmallRng,
    training: bool,
    debug: bool,
}

impl core::fmt::Debug for Graph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("training", &self.training)
            .finish()
    }
}

impl Graph {
    /// New empty graph. In training mode dropout masks are sampled from rng seeded by seed.
    #[must_use]
    pub fn new(training: bool, seed: u64) -> Graph {
        Graph {
            nodes: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            training,
            debug: false,
        }
    }

    /// New empty graph using seed and debug mask from config
    #[must_use]
    pub fn from_config(config: &Config, training: bool) -> Graph {
        let mut graph = Graph::new(training, config.seed);
        graph.debug = config.debug_graph();
        graph
    }

    /// Is graph in training mode?
    #[must_use]
    pub const fn is_training(&self) -> bool {
        self.training
    }

    /// Switch between training and inference
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Does graph have no nodes?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes of given kind
    #[must_use]
    pub fn count(&self, kind: OpKind) -> usize {
        self.nodes.iter().filter(|n| n.node.kind() == kind).count()
    }

    /// Release all nodes. Ids handed out before are invalid afterwards.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Node x
    ///
    /// # Panics
    ///
    /// Panics if x is not in this graph.
    #[must_use]
    pub fn node(&self, x: NodeId) -> &Node {
        &self.nodes[x.i()].node
    }

    /// Value of node x
    ///
    /// # Panics
    ///
    /// Panics if x is not in this graph.
    #[must_use]
    pub fn value(&self, x: NodeId) -> &[f32] {
        &self.nodes[x.i()].value
    }

    /// Width of node x
    ///
    /// # Panics
    ///
    /// Panics if x is not in this graph.
    #[must_use]
    pub fn dim(&self, x: NodeId) -> usize {
        self.nodes[x.i()].value.len()
    }

    /// All nodes with their ids in construction order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i), &n.node))
    }

    /// Push new node with already computed value.
    ///
    /// # Panics
    ///
    /// Panics if node references node that is not in the graph yet,
    /// since that would break construction order.
    pub(crate) fn push(&mut self, node: Node, value: Vec<f32>) -> NodeId {
        let len = self.nodes.len();
        for p in node.parameters() {
            assert!(
                p.i() < len,
                "Node {node:?} references {p}, but graph has only {len} nodes"
            );
        }
        let id = NodeId::new(len);
        if self.debug {
            log::debug!("Pushing {id}: {node:?}, dim {}", value.len());
        }
        self.nodes.push(NodeData { node, value });
        id
    }

    /// Puts subgraph needed to compute ids into dot language for visualization
    #[must_use]
    pub fn plot_dot(&self, ids: &[NodeId]) -> String {
        use core::fmt::Write;
        // Make a list of visited nodes
        let mut params: Vec<NodeId> = ids.into();
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        while let Some(nid) = params.pop() {
            if visited.insert(nid) {
                params.extend(self.node(nid).parameters());
            }
        }
        let outputs: BTreeSet<NodeId> = ids.iter().copied().collect();
        let mut res = String::from("strict digraph {\n  ordering=in\n  rank=source\n");
        let mut edges = String::new();
        for nid in &visited {
            let node = self.node(*nid);
            let shape = match node.kind() {
                OpKind::Input | OpKind::Bucket => "box",
                OpKind::Attention => "doubleoctagon",
                _ => "oval",
            };
            let fillcolor = if outputs.contains(nid) { "lightblue" } else { "grey" };
            let _ = writeln!(
                res,
                "  {nid}[label=\"{nid}NL{:?}NL{}\", shape={shape}, fillcolor=\"{fillcolor}\", style=filled]",
                node.kind(),
                self.dim(*nid),
            );
            for p in node.parameters() {
                let _ = writeln!(edges, "  {p} -> {nid}");
            }
        }
        res = res.replace("NL", "\\n");
        res.push_str(&edges);
        res.push('}');
        res
    }
}
