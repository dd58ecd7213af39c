//! Optimizers for graft.
//!
//! Optimizers update parameters registered in [Trainables].
//! Gradients are computed elsewhere, one optional gradient per registered
//! parameter, in registration order.

#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]

use graft_core::{GraftError, Matrix, Trainables};

mod adagrad;
pub use adagrad::Adagrad;

mod sgd;
pub use sgd::SGD;

/// Collects gradients and checks them against registered params,
/// so that params are not touched when any gradient is invalid.
fn collect_gradients(
    trainables: &Trainables<'_>,
    gradients: impl IntoIterator<Item = Option<Matrix>>,
) -> Result<Vec<Option<Matrix>>, GraftError> {
    let grads: Vec<Option<Matrix>> = gradients.into_iter().collect();
    if grads.len() != trainables.len() {
        return Err(GraftError::shape_error(
            format!(
                "Number of parameters {} != number of gradients {}",
                trainables.len(),
                grads.len()
            )
            .into(),
        ));
    }
    for ((name, param), grad) in trainables.iter().zip(&grads) {
        if let Some(grad) = grad {
            let val = &param.val;
            if grad.rows != val.rows || grad.cols != val.cols || grad.data.len() != val.data.len() {
                return Err(GraftError::shape_error(
                    format!(
                        "Gradient of {name} has shape {}x{}, param is {}x{}",
                        grad.rows, grad.cols, val.rows, val.cols
                    )
                    .into(),
                ));
            }
        }
    }
    Ok(grads)
}
