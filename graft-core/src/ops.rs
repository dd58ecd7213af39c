//! Operator node constructors.
//!
//! Every constructor checks shapes of its inputs, computes the value
//! and pushes new node into the graph.

use crate::error::GraftError;
use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::param::{BiParams, UniParams};
use rand::Rng;

impl Graph {
    /// Vector provided by the caller
    pub fn input(&mut self, value: impl Into<Vec<f32>>) -> NodeId {
        let value = value.into();
        self.push(Node::Input(value.len()), value)
    }

    /// Zero vector of width dim
    pub fn bucket(&mut self, dim: usize) -> NodeId {
        self.push(Node::Bucket(dim), vec![0.0; dim])
    }

    /// Constant vector
    pub fn constant(&mut self, value: impl Into<Vec<f32>>) -> NodeId {
        let value = value.into();
        self.push(Node::Bucket(value.len()), value)
    }

    /// W·x + b
    ///
    /// # Errors
    ///
    /// Errors if width of x is not `params.in_dim()`.
    pub fn linear(&mut self, params: &UniParams, x: NodeId) -> Result<NodeId, GraftError> {
        let value = params.project(self.value(x))?;
        Ok(self.push(Node::Linear(x), value))
    }

    /// tanh(W1·x1 + W2·x2 + b)
    ///
    /// # Errors
    ///
    /// Errors if widths of x1 or x2 do not match params.
    pub fn bilinear(
        &mut self,
        params: &BiParams,
        x1: NodeId,
        x2: NodeId,
    ) -> Result<NodeId, GraftError> {
        let mut value = params.combine(self.value(x1), self.value(x2))?;
        value.iter_mut().for_each(|x| *x = x.tanh());
        Ok(self.push(Node::Bilinear(x1, x2), value))
    }

    /// Elementwise sum
    ///
    /// # Errors
    ///
    /// Errors if xs is empty or inputs have different widths.
    pub fn add(&mut self, xs: &[NodeId]) -> Result<NodeId, GraftError> {
        let Some((first, rest)) = xs.split_first() else {
            return Err(GraftError::shape_error("Can not add zero nodes".into()));
        };
        let mut value = self.value(*first).to_vec();
        for x in rest {
            let v = self.value(*x);
            if v.len() != value.len() {
                return Err(GraftError::shape_error(
                    format!(
                        "Can not add node {x} of width {} to node {first} of width {}",
                        v.len(),
                        value.len()
                    )
                    .into(),
                ));
            }
            value.iter_mut().zip(v).for_each(|(a, b)| *a += b);
        }
        Ok(self.push(Node::Add(xs.into()), value))
    }

    /// Elementwise product
    ///
    /// # Errors
    ///
    /// Errors if x and y have different widths.
    pub fn mul(&mut self, x: NodeId, y: NodeId) -> Result<NodeId, GraftError> {
        self.mul_dropout(x, y, 0.0)
    }

    /// Elementwise product with dropout.
    /// In training each element is zeroed with probability rate,
    /// in inference the product is scaled by `1 - rate`.
    /// Rate `<= 0` disables dropout.
    ///
    /// # Errors
    ///
    /// Errors if x and y have different widths or rate is not below 1.
    pub fn mul_dropout(&mut self, x: NodeId, y: NodeId, rate: f32) -> Result<NodeId, GraftError> {
        if rate >= 1.0 || rate.is_nan() {
            return Err(GraftError::value_error(
                format!("Dropout rate must be below 1, got {rate}").into(),
            ));
        }
        let (a, b) = (self.value(x), self.value(y));
        if a.len() != b.len() {
            return Err(GraftError::shape_error(
                format!(
                    "Can not multiply node {x} of width {} with node {y} of width {}",
                    a.len(),
                    b.len()
                )
                .into(),
            ));
        }
        let mut value: Vec<f32> = a.iter().zip(b).map(|(a, b)| a * b).collect();
        let rate = rate.max(0.0);
        if rate > 0.0 {
            if self.is_training() {
                for v in &mut value {
                    if self.rng.gen::<f32>() < rate {
                        *v = 0.0;
                    }
                }
            } else {
                value.iter_mut().for_each(|v| *v *= 1.0 - rate);
            }
        }
        Ok(self.push(Node::Mul(x, y, rate), value))
    }

    /// Sigmoid activation
    pub fn sigmoid(&mut self, x: NodeId) -> NodeId {
        let value = self
            .value(x)
            .iter()
            .map(|x| 1.0 / (1.0 + (-x).exp()))
            .collect();
        self.push(Node::Sigmoid(x), value)
    }

    /// Hyperbolic tangent activation
    pub fn tanh(&mut self, x: NodeId) -> NodeId {
        let value = self.value(x).iter().map(|x| x.tanh()).collect();
        self.push(Node::Tanh(x), value)
    }

    /// Softmax over scalar scores, then weighted sum of values
    ///
    /// # Errors
    ///
    /// Errors if values is empty, counts of values and scores differ,
    /// any score is not scalar or values have different widths.
    pub fn attention(&mut self, values: &[NodeId], scores: &[NodeId]) -> Result<NodeId, GraftError> {
        if values.is_empty() || values.len() != scores.len() {
            return Err(GraftError::shape_error(
                format!(
                    "Attention needs equal nonzero number of values and scores, got {} and {}",
                    values.len(),
                    scores.len()
                )
                .into(),
            ));
        }
        let mut weights = Vec::with_capacity(scores.len());
        for s in scores {
            match self.value(*s) {
                [w] => weights.push(*w),
                v => {
                    return Err(GraftError::shape_error(
                        format!("Attention score {s} must be scalar, got width {}", v.len()).into(),
                    ))
                }
            }
        }
        let max = weights.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max.is_infinite() {
            // Infinite scores share all weight, all -inf scores weigh equally
            weights.iter_mut().for_each(|w| *w = if *w == max { 1.0 } else { 0.0 });
        } else {
            weights.iter_mut().for_each(|w| *w = (*w - max).exp());
        }
        let sum: f32 = weights.iter().sum();
        let dim = self.dim(values[0]);
        let mut value = vec![0.0; dim];
        for (x, w) in values.iter().zip(&weights) {
            let v = self.value(*x);
            if v.len() != dim {
                return Err(GraftError::shape_error(
                    format!("Attention value {x} has width {}, expected {dim}", v.len()).into(),
                ));
            }
            value.iter_mut().zip(v).for_each(|(a, b)| *a += w / sum * b);
        }
        Ok(self.push(
            Node::Attention {
                values: values.into(),
                scores: scores.into(),
            },
            value,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Graph, GraftError};

    #[test]
    fn softmax_is_stable() -> Result<(), GraftError> {
        let mut graph = Graph::new(false, 0);
        let a = graph.input([1.0, 0.0]);
        let b = graph.input([0.0, 1.0]);
        let sa = graph.input([1000.0]);
        let sb = graph.input([1000.0]);
        let h = graph.attention(&[a, b], &[sa, sb])?;
        assert_eq!(graph.value(h), [0.5, 0.5]);
        Ok(())
    }

    #[test]
    fn infinite_scores_take_all_weight() -> Result<(), GraftError> {
        let mut graph = Graph::new(false, 0);
        let a = graph.input([1.0, 0.0]);
        let b = graph.input([0.0, 1.0]);
        let c = graph.input([3.0, 3.0]);
        let inf = graph.input([f32::INFINITY]);
        let zero = graph.input([0.0]);
        let h = graph.attention(&[a, b], &[inf, zero])?;
        assert_eq!(graph.value(h), [1.0, 0.0]);
        let h = graph.attention(&[a, b, c], &[inf, zero, inf])?;
        assert_eq!(graph.value(h), [2.0, 1.5]);
        let ninf = graph.input([f32::NEG_INFINITY]);
        let h = graph.attention(&[a, b], &[ninf, ninf])?;
        assert_eq!(graph.value(h), [0.5, 0.5]);
        Ok(())
    }
}
