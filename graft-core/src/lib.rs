//! # graft-core
//!
//! graft-core is core part of graft, a library of attention and recurrent
//! builders. It contains the node graph with its operator nodes,
//! parameter containers with json persistence, registration of trainable
//! parameters and mirroring of parameters into device memory.
//!
#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
#![forbid(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::private_doc_tests)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::bare_urls)]

/// See [Config](config::Config)
pub mod config;
/// See [GraftError](error::GraftError)
pub mod error;
/// See [Graph](graph::Graph)
pub mod graph;
/// See [Node](node::Node)
pub mod node;
mod ops;
/// See [Param](param::Param)
pub mod param;
/// Saving and loading of parameter sets as json
pub mod persist;
pub mod transfer;
/// See [Trainables](update::Trainables)
pub mod update;

pub use config::{Config, Device};
pub use error::GraftError;
pub use graph::Graph;
pub use node::{Node, NodeId, OpKind};
pub use param::{BiParams, Matrix, Param, UniParams};
pub use persist::{load, save, Serializable};
pub use transfer::{DevicePool, DeviceSlot, Transferable, TransferableComponents};
pub use update::{Trainables, TrainablesIterMut};

/// Common surface of all parameter sets.
///
/// Parameter sets are owned by the model, builders only borrow them.
pub trait ParameterSet: Serializable {
    /// Register every trainable sub-parameter group exactly once
    fn export_trainables<'a>(&'a mut self, trainables: &mut Trainables<'a>);

    /// Device transfer capability, None if self can not be mirrored on device
    fn as_transferable(&mut self) -> Option<&mut dyn TransferableComponents> {
        None
    }
}
