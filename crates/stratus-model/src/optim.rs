//! Adam optimizer over a flat parameter vector.

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

#[derive(Debug, Clone)]
pub(crate) struct Adam {
    learning_rate: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    pub(crate) fn new(n_params: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
            t: 0,
        }
    }

    pub(crate) fn step(&mut self, params: &mut [f64], grad: &[f64]) {
        self.t = self.t.saturating_add(1);
        let bias1 = 1.0 - BETA1.powi(self.t);
        let bias2 = 1.0 - BETA2.powi(self.t);
        for (((p, &g), m), v) in params
            .iter_mut()
            .zip(grad)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_quadratic() {
        // f(p) = (p - 3)^2
        let mut p = [0.0];
        let mut adam = Adam::new(1, 0.1);
        for _ in 0..2000 {
            let g = [2.0 * (p[0] - 3.0)];
            adam.step(&mut p, &g);
        }
        assert!((p[0] - 3.0).abs() < 1e-2, "p = {}", p[0]);
    }

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut p = [1.0, 1.0];
        let mut adam = Adam::new(2, 0.01);
        adam.step(&mut p, &[5.0, -0.2]);
        assert!((p[0] - 0.99).abs() < 1e-6);
        assert!((p[1] - 1.01).abs() < 1e-6);
    }
}
