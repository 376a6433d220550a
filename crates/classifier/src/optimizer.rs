use ndarray::{ArrayD, ArrayViewMutD, Zip};

/// Adam with bias correction folded into the step size.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    step: i32,
    moments: Vec<(ArrayD<f64>, ArrayD<f64>)>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            moments: Vec::new(),
        }
    }

    pub fn steps(&self) -> i32 {
        self.step
    }

    /// Applies one update. `params` and `grads` must line up one to one and
    /// keep the same order between calls.
    pub fn update(&mut self, params: Vec<ArrayViewMutD<'_, f64>>, grads: &[ArrayD<f64>]) {
        debug_assert_eq!(params.len(), grads.len());
        if self.moments.is_empty() {
            self.moments = grads
                .iter()
                .map(|g| (ArrayD::zeros(g.raw_dim()), ArrayD::zeros(g.raw_dim())))
                .collect();
        }

        self.step += 1;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let lr = self.learning_rate * (1.0 - b2.powi(self.step)).sqrt() / (1.0 - b1.powi(self.step));

        for ((param, grad), (m, v)) in params.into_iter().zip(grads).zip(self.moments.iter_mut()) {
            Zip::from(param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *p -= lr * *m / (v.sqrt() + eps);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array1};

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut param: Array1<f64> = arr1(&[1.0, -2.0]);
        let grad = arr1(&[0.5, -3.0]).into_dyn();
        let mut adam = Adam::new(0.1);
        adam.update(vec![param.view_mut().into_dyn()], &[grad]);
        assert_eq!(adam.steps(), 1);
        assert!((param[0] - 0.9).abs() < 1e-6);
        assert!((param[1] + 1.9).abs() < 1e-6);
    }

    #[test]
    fn minimises_a_quadratic() {
        let mut x: Array1<f64> = arr1(&[3.0]);
        let mut adam = Adam::new(0.05);
        for _ in 0..2000 {
            let grad = (&x * 2.0).into_dyn();
            adam.update(vec![x.view_mut().into_dyn()], &[grad]);
        }
        assert!(x[0].abs() < 0.05);
    }
}
