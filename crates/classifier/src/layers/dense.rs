use ndarray::{Array1, Array2, ArrayViewMutD, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{glorot_uniform, softmax};

/// Fully connected softmax output layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weight: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Dense {
    pub fn new<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        Self {
            weight: glorot_uniform(inputs, outputs, rng),
            bias: Array1::zeros(outputs),
        }
    }

    pub fn inputs(&self) -> usize {
        self.weight.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weight.ncols()
    }

    pub fn shapes_agree(&self) -> bool {
        self.bias.len() == self.weight.ncols()
    }

    /// Class probabilities for `(batch, inputs)`.
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        softmax(&(x.dot(&self.weight) + &self.bias))
    }

    /// Takes the gradient with respect to the logits.
    pub fn backward(&self, x: &Array2<f64>, d_logits: &Array2<f64>) -> (Array2<f64>, DenseGrads) {
        let grads = DenseGrads {
            weight: x.t().dot(d_logits),
            bias: d_logits.sum_axis(Axis(0)),
        };
        (d_logits.dot(&self.weight.t()), grads)
    }

    pub fn params_mut(&mut self) -> [ArrayViewMutD<'_, f64>; 2] {
        [
            self.weight.view_mut().into_dyn(),
            self.bias.view_mut().into_dyn(),
        ]
    }
}
