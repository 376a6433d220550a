//! Gated recurrent unit layer.
//!
//! Uses the "reset after" formulation with separate input and recurrent
//! biases, gates laid out as `[update | reset | candidate]` along the last
//! axis of every weight:
//!
//! ```text
//! z  = sigmoid(x Wz + bz + h Uz + cz)
//! r  = sigmoid(x Wr + br + h Ur + cr)
//! n  = tanh(x Wn + bn + r * (h Un + cn))
//! h' = z * h + (1 - z) * n
//! ```

use ndarray::{s, Array1, Array2, Array3, ArrayViewMutD, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{glorot_uniform, orthogonal, sigmoid};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gru {
    input_dim: usize,
    units: usize,
    /// Emit the hidden state of every step rather than only the last one
    return_sequences: bool,
    kernel: Array2<f64>,
    recurrent: Array2<f64>,
    bias_in: Array1<f64>,
    bias_rec: Array1<f64>,
}

/// Intermediate values of one time step, kept for back-propagation.
#[derive(Debug)]
struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    z: Array2<f64>,
    r: Array2<f64>,
    n: Array2<f64>,
    hu_n: Array2<f64>,
}

#[derive(Debug, Default)]
pub struct GruCache {
    steps: Vec<StepCache>,
}

#[derive(Debug, Clone)]
pub struct GruGrads {
    pub kernel: Array2<f64>,
    pub recurrent: Array2<f64>,
    pub bias_in: Array1<f64>,
    pub bias_rec: Array1<f64>,
}

impl Gru {
    pub fn new<R: Rng>(input_dim: usize, units: usize, return_sequences: bool, rng: &mut R) -> Self {
        Self {
            input_dim,
            units,
            return_sequences,
            kernel: glorot_uniform(input_dim, 3 * units, rng),
            recurrent: orthogonal(units, 3 * units, rng),
            bias_in: Array1::zeros(3 * units),
            bias_rec: Array1::zeros(3 * units),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn returns_sequences(&self) -> bool {
        self.return_sequences
    }

    /// Whether every weight has the shape implied by `input_dim` and `units`.
    pub fn shapes_agree(&self) -> bool {
        let gates = 3 * self.units;
        self.kernel.dim() == (self.input_dim, gates)
            && self.recurrent.dim() == (self.units, gates)
            && self.bias_in.len() == gates
            && self.bias_rec.len() == gates
    }

    /// Runs the layer over `(batch, steps, input_dim)` from a zero state.
    ///
    /// Always returns every step's hidden state as `(batch, steps, units)`;
    /// callers of a non-sequence layer read the last step.
    pub fn forward(&self, x: &Array3<f64>) -> (Array3<f64>, GruCache) {
        let (batch, steps, _) = x.dim();
        let u = self.units;
        let mut h = Array2::<f64>::zeros((batch, u));
        let mut outputs = Array3::<f64>::zeros((batch, steps, u));
        let mut cache = GruCache {
            steps: Vec::with_capacity(steps),
        };

        for t in 0..steps {
            let x_t = x.index_axis(Axis(1), t).to_owned();
            let xw = x_t.dot(&self.kernel) + &self.bias_in;
            let hu = h.dot(&self.recurrent) + &self.bias_rec;

            let z = (&xw.slice(s![.., ..u]) + &hu.slice(s![.., ..u])).mapv(sigmoid);
            let r = (&xw.slice(s![.., u..2 * u]) + &hu.slice(s![.., u..2 * u])).mapv(sigmoid);
            let hu_n = hu.slice(s![.., 2 * u..]).to_owned();
            let n = (&xw.slice(s![.., 2 * u..]) + &(&r * &hu_n)).mapv(f64::tanh);
            let h_next = &z * &h + &(1.0 - &z) * &n;

            outputs.index_axis_mut(Axis(1), t).assign(&h_next);
            cache.steps.push(StepCache {
                x: x_t,
                h_prev: h,
                z,
                r,
                n,
                hu_n,
            });
            h = h_next;
        }

        (outputs, cache)
    }

    /// Back-propagation through time.
    ///
    /// `d_out` is the loss gradient with respect to every output step. Returns
    /// the gradient with respect to the layer input and the parameter gradients.
    pub fn backward(&self, cache: &GruCache, d_out: &Array3<f64>) -> (Array3<f64>, GruGrads) {
        let (batch, steps, _) = d_out.dim();
        let u = self.units;
        let mut grads = GruGrads {
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias_in: Array1::zeros(3 * u),
            bias_rec: Array1::zeros(3 * u),
        };
        let mut dx = Array3::<f64>::zeros((batch, steps, self.input_dim));
        let mut dh_next = Array2::<f64>::zeros((batch, u));

        for (t, step) in cache.steps.iter().enumerate().rev() {
            let dh = &d_out.index_axis(Axis(1), t) + &dh_next;

            let dz = &dh * &(&step.h_prev - &step.n);
            let dn = &dh * &(1.0 - &step.z);
            let da_n = &dn * &(1.0 - &step.n * &step.n);
            let dhu_n = &da_n * &step.r;
            let dr = &da_n * &step.hu_n;
            let da_z = &dz * &(&step.z * &(1.0 - &step.z));
            let da_r = &dr * &(&step.r * &(1.0 - &step.r));

            let mut dxw = Array2::<f64>::zeros((batch, 3 * u));
            dxw.slice_mut(s![.., ..u]).assign(&da_z);
            dxw.slice_mut(s![.., u..2 * u]).assign(&da_r);
            dxw.slice_mut(s![.., 2 * u..]).assign(&da_n);
            // Only the candidate gate sees the reset gate on the recurrent side
            let mut dhu = dxw.clone();
            dhu.slice_mut(s![.., 2 * u..]).assign(&dhu_n);

            grads.kernel += &step.x.t().dot(&dxw);
            grads.recurrent += &step.h_prev.t().dot(&dhu);
            grads.bias_in += &dxw.sum_axis(Axis(0));
            grads.bias_rec += &dhu.sum_axis(Axis(0));

            dh_next = &dh * &step.z + &dhu.dot(&self.recurrent.t());
            dx.index_axis_mut(Axis(1), t)
                .assign(&dxw.dot(&self.kernel.t()));
        }

        (dx, grads)
    }

    pub fn params_mut(&mut self) -> [ArrayViewMutD<'_, f64>; 4] {
        [
            self.kernel.view_mut().into_dyn(),
            self.recurrent.view_mut().into_dyn(),
            self.bias_in.view_mut().into_dyn(),
            self.bias_rec.view_mut().into_dyn(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn output_shape_and_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let gru = Gru::new(5, 7, true, &mut rng);
        let x = Array3::from_shape_fn((2, 4, 5), |(b, t, f)| (b + t + f) as f64 * 0.1);
        let (out, cache) = gru.forward(&x);
        assert_eq!(out.dim(), (2, 4, 7));
        assert_eq!(cache.steps.len(), 4);
        // Convex mix of tanh outputs starting from zero stays in (-1, 1)
        assert!(out.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn zero_input_keeps_zero_state() {
        let mut rng = StdRng::seed_from_u64(1);
        let gru = Gru::new(3, 4, false, &mut rng);
        let (out, _) = gru.forward(&Array3::zeros((1, 5, 3)));
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
