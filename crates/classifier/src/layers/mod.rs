pub mod dense;
pub mod gru;

pub use dense::*;
pub use gru::*;

use ndarray::{Array2, Axis};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::StandardNormal;

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Uniform in `[-limit, limit]` with `limit = sqrt(6 / (fan_in + fan_out))`.
pub(crate) fn glorot_uniform<R: Rng>(fan_in: usize, fan_out: usize, rng: &mut R) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_simple_fn((fan_in, fan_out), || dist.sample(rng))
}

/// Random matrix with orthonormal rows (when `rows <= cols`) or columns.
pub(crate) fn orthogonal<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Array2<f64> {
    // Orthonormalise the columns of a tall Gaussian matrix
    let (tall, short) = (rows.max(cols), rows.min(cols));
    let mut q = Array2::<f64>::from_shape_simple_fn((tall, short), || rng.sample(StandardNormal));

    for j in 0..short {
        for k in 0..j {
            let projection = q.column(k).dot(&q.column(j));
            let basis = q.column(k).to_owned();
            q.column_mut(j).scaled_add(-projection, &basis);
        }
        let norm = q.column(j).dot(&q.column(j)).sqrt().max(f64::EPSILON);
        q.column_mut(j).mapv_inplace(|v| v / norm);
    }

    if rows < cols {
        q.reversed_axes()
    } else {
        q
    }
}

/// Row-wise softmax of `(batch, classes)` logits.
pub(crate) fn softmax(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}
