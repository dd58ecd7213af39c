use crate::collect_gradients;
use graft_core::{GraftError, Matrix, Trainables};

/// # Stochastic gradient descent optimizer
#[derive(Debug)]
pub struct SGD {
    /// learning rate (default: 0.001)
    pub learning_rate: f32,
    /// momentum factor (default: 0.0)
    pub momentum: f32,
    /// weight decay (L2 penalty) (default: 0.0)
    pub weight_decay: f32,
    /// dampening for momentum (default: 0.0)
    pub dampening: f32,
    /// enables Nesterov momentum (default: false)
    pub nesterov: bool,
    /// maximize the objective with respect to the params, instead of minimizing (default: false)
    pub maximize: bool,
    /// stores momentum per registered param, initialized on demand
    pub bias: Vec<Option<Vec<f32>>>,
}

impl Default for SGD {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            momentum: 0.0,
            weight_decay: 0.0,
            dampening: 0.0,
            nesterov: false,
            maximize: false,
            bias: Vec::new(),
        }
    }
}

impl SGD {
    /// Updates parameters with gradients.
    /// Number of parameters must be the same as number of gradients.
    /// Gradients can be None, those are simply skipped.
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
        if self.bias.len() < grads.len() {
            self.bias.resize(grads.len(), None);
        }
        for (i, ((_, param), grad)) in trainables.iter_mut().zip(grads).enumerate() {
            let Some(grad) = grad else { continue };
            let mut grad = grad.data;
            if self.weight_decay != 0.0 {
                grad.iter_mut()
                    .zip(&param.val.data)
                    .for_each(|(g, p)| *g += p * self.weight_decay);
            }
            if self.momentum != 0.0 {
                let bias = match &mut self.bias[i] {
                    Some(bias) => {
                        bias.iter_mut()
                            .zip(&grad)
                            .for_each(|(b, g)| *b = *b * self.momentum + g * (1.0 - self.dampening));
                        bias
                    }
                    slot @ None => slot.insert(grad.clone()),
                };
                if self.nesterov {
                    grad.iter_mut()
                        .zip(bias.iter())
                        .for_each(|(g, b)| *g += b * self.momentum);
                } else {
                    grad.clone_from(bias);
                }
            }
            let lr = if self.maximize {
                -self.learning_rate
            } else {
                self.learning_rate
            };
            param
                .val
                .data
                .iter_mut()
                .zip(grad)
                .for_each(|(p, g)| *p -= g * lr);
        }
        Ok(())
    }
}
