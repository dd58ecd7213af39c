//! Attention and recurrent builders for graft.
//!
//! Builders borrow their parameter set, append operator nodes into a
//! [Graph](graft_core::Graph) and keep ids of the nodes they created.

#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
#![forbid(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::private_doc_tests)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::bare_urls)]

mod attention;
pub use attention::{AttentionBuilder, AttentionParams};

mod dot_attention;
pub use dot_attention::{DotAttentionBuilder, DotAttentionParams};

// Recurrent layers
mod lstm;
pub use lstm::{Direction, Gate, LstmBuilder, LstmParams, LstmSlot};
