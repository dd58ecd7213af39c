use crate::collect_gradients;
use graft_core::{GraftError, Matrix, Trainables};

/// # Adaptive gradient optimizer
///
/// Each element gets its own step size, scaled down by the root
/// of accumulated squared gradients.
#[derive(Debug)]
pub struct Adagrad {
    /// learning rate (default: 0.01)
    pub learning_rate: f32,
    /// term added to the denominator to improve numerical stability (default: 1e-8)
    pub eps: f32,
    /// weight decay (L2 penalty) (default: 0.0)
    pub weight_decay: f32,
    // Sum of squared gradients per registered param
    sum: Vec<Vec<f32>>,
}

impl Default for Adagrad {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            eps: 1e-8,
            weight_decay: 0.0,
            sum: Vec::new(),
        }
    }
}

impl Adagrad {
    /// Adagrad with given learning rate, other fields default
    #[must_use]
    pub fn new(learning_rate: f32) -> Adagrad {
        Adagrad {
            learning_rate,
            ..Default::default()
        }
    }

    /// Updates parameters with gradients, None gradients are skipped.
    ///
    /// # Errors
    ///
    /// Errors if number or shapes of gradients do not match parameters.
    /// Parameters are not modified in that case.
    pub fn update(
        &mut self,
        trainables: &mut Trainables<'_>,
        gradients: impl IntoIterator<Item = Option<Matrix>>,
    ) -> Result<(), GraftError> {
        let grads = collect_gradients(trainables, gradients)?;
        for (i, ((name, param), grad)) in trainables.iter_mut().zip(grads).enumerate() {
            // Lazy init for new parameters
            if self.sum.len() <= i {
                self.sum.push(vec![0.0; param.val.data.len()]);
            }
            let Some(grad) = grad else { continue };
            let sum = &mut self.sum[i];
            if sum.len() != grad.data.len() {
                log::debug!("Shape of {name} changed, resetting its accumulated gradients");
                *sum = vec![0.0; grad.data.len()];
            }
            for ((p, g), s) in param.val.data.iter_mut().zip(grad.data).zip(sum.iter_mut()) {
                let g = g + *p * self.weight_decay;
                *s += g * g;
                *p -= self.learning_rate * g / (s.sqrt() + self.eps);
            }
        }
        Ok(())
    }

    /// Forget accumulated gradients
    pub fn reset(&mut self) {
        self.sum.clear();
    }
}
