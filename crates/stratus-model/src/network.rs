//! Elman recurrent network with a linear autoregressive highway.
//!
//! All parameters live in one flat vector so gradients, optimizer state and
//! serialization share a single layout:
//!
//! ```text
//! [layer 0: Wx (h×F) | Wh (h×h) | b (h)] ... [layer L-1] [head (O×h)] [bias (O)] [highway (O×W·F)]
//! ```
//!
//! The autoregressive architecture has no recurrent layers and no head.

use rand::Rng;

use crate::config::Architecture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) struct NetworkShape {
    pub(crate) architecture: Architecture,
    pub(crate) n_features: usize,
    pub(crate) window_len: usize,
    pub(crate) horizon: usize,
    pub(crate) hidden_size: usize,
    pub(crate) layers: usize,
}

impl NetworkShape {
    pub(crate) fn n_inputs(&self) -> usize {
        self.window_len * self.n_features
    }

    pub(crate) fn n_outputs(&self) -> usize {
        self.horizon * self.n_features
    }

    fn recurrent_layers(&self) -> usize {
        match self.architecture {
            Architecture::Elman => self.layers,
            Architecture::Autoregressive => 0,
        }
    }

    fn layer_input(&self, layer: usize) -> usize {
        if layer == 0 { self.n_features } else { self.hidden_size }
    }

    fn layer_len(&self, layer: usize) -> usize {
        let h = self.hidden_size;
        h * self.layer_input(layer) + h * h + h
    }

    fn layer_offset(&self, layer: usize) -> usize {
        (0..layer).map(|l| self.layer_len(l)).sum()
    }

    fn head_offset(&self) -> usize {
        self.layer_offset(self.recurrent_layers())
    }

    fn head_len(&self) -> usize {
        if self.recurrent_layers() > 0 {
            self.n_outputs() * self.hidden_size
        } else {
            0
        }
    }

    fn bias_offset(&self) -> usize {
        self.head_offset() + self.head_len()
    }

    fn highway_offset(&self) -> usize {
        self.bias_offset() + self.n_outputs()
    }

    pub(crate) fn n_params(&self) -> usize {
        self.highway_offset() + self.n_outputs() * self.n_inputs()
    }
}

/// Hidden states of every recurrent layer, `states[layer][t * h + i]`.
struct Trace {
    states: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Network {
    shape: NetworkShape,
    params: Vec<f64>,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Network {
    /// Glorot-uniform recurrent weights; head, bias and highway start at zero
    /// so an untrained model predicts the training mean.
    pub(crate) fn init(shape: NetworkShape, rng: &mut impl Rng) -> Self {
        let mut params = vec![0.0; shape.n_params()];
        let h = shape.hidden_size;
        for layer in 0..shape.recurrent_layers() {
            let o = shape.layer_offset(layer);
            let n_in = shape.layer_input(layer);
            let limit_x = (6.0 / (n_in + h) as f64).sqrt();
            for p in &mut params[o..o + h * n_in] {
                *p = rng.gen_range(-limit_x..limit_x);
            }
            // Halved so the recurrent gain starts below 1.
            let limit_h = 0.5 * (3.0 / h as f64).sqrt();
            for p in &mut params[o + h * n_in..o + h * n_in + h * h] {
                *p = rng.gen_range(-limit_h..limit_h);
            }
        }
        Self { shape, params }
    }

    pub(crate) fn shape(&self) -> &NetworkShape {
        &self.shape
    }

    pub(crate) fn params(&self) -> &[f64] {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    /// Forward pass on one z-scored, flattened window.
    pub(crate) fn predict(&self, x: &[f64]) -> Vec<f64> {
        self.forward(x).0
    }

    fn forward(&self, x: &[f64]) -> (Vec<f64>, Trace) {
        let s = &self.shape;
        let (h, w, f) = (s.hidden_size, s.window_len, s.n_features);
        let mut states: Vec<Vec<f64>> = Vec::with_capacity(s.recurrent_layers());

        for layer in 0..s.recurrent_layers() {
            let n_in = s.layer_input(layer);
            let (wx, rest) = self.params[s.layer_offset(layer)..].split_at(h * n_in);
            let (wh, rest) = rest.split_at(h * h);
            let b = &rest[..h];
            let mut out = vec![0.0; w * h];
            for t in 0..w {
                let input = if layer == 0 {
                    &x[t * f..(t + 1) * f]
                } else {
                    &states[layer - 1][t * h..(t + 1) * h]
                };
                let (prev, cur) = out.split_at_mut(t * h);
                for i in 0..h {
                    let mut a = b[i] + dot(&wx[i * n_in..(i + 1) * n_in], input);
                    if t > 0 {
                        a += dot(&wh[i * h..(i + 1) * h], &prev[(t - 1) * h..]);
                    }
                    cur[i] = a.tanh();
                }
            }
            states.push(out);
        }

        let n_out = s.n_outputs();
        let n_in = s.n_inputs();
        let mut y = self.params[s.bias_offset()..s.bias_offset() + n_out].to_vec();
        let highway = &self.params[s.highway_offset()..];
        for (j, yj) in y.iter_mut().enumerate() {
            *yj += dot(&highway[j * n_in..(j + 1) * n_in], x);
        }
        if let Some(top) = states.last() {
            let last = &top[(w - 1) * h..];
            let head = &self.params[s.head_offset()..s.head_offset() + n_out * h];
            for (j, yj) in y.iter_mut().enumerate() {
                *yj += dot(&head[j * h..(j + 1) * h], last);
            }
        }
        (y, Trace { states })
    }

    /// Mean squared error on one sample and its gradient with respect to
    /// every parameter (backpropagation through time).
    pub(crate) fn gradient(&self, x: &[f64], target: &[f64]) -> (Vec<f64>, f64) {
        let s = &self.shape;
        let (h, w, f) = (s.hidden_size, s.window_len, s.n_features);
        let n_in_total = s.n_inputs();
        let (y, trace) = self.forward(x);
        let n_out = y.len();

        let mut loss = 0.0;
        let mut dy = vec![0.0; n_out];
        for j in 0..n_out {
            let e = y[j] - target[j];
            loss += e * e;
            dy[j] = 2.0 * e / n_out as f64;
        }
        loss /= n_out as f64;

        let mut grad = vec![0.0; s.n_params()];
        let bias = s.bias_offset();
        grad[bias..bias + n_out].copy_from_slice(&dy);
        let highway = s.highway_offset();
        for (j, &d) in dy.iter().enumerate() {
            let row = &mut grad[highway + j * n_in_total..highway + (j + 1) * n_in_total];
            for (g, &xi) in row.iter_mut().zip(x) {
                *g = d * xi;
            }
        }

        let n_layers = s.recurrent_layers();
        if n_layers == 0 {
            return (grad, loss);
        }

        let head_off = s.head_offset();
        let last = &trace.states[n_layers - 1][(w - 1) * h..];
        let mut upstream = vec![0.0; w * h];
        for (j, &d) in dy.iter().enumerate() {
            for i in 0..h {
                grad[head_off + j * h + i] = d * last[i];
                upstream[(w - 1) * h + i] += self.params[head_off + j * h + i] * d;
            }
        }

        for layer in (0..n_layers).rev() {
            let n_in = s.layer_input(layer);
            let o = s.layer_offset(layer);
            let wx = &self.params[o..o + h * n_in];
            let wh = &self.params[o + h * n_in..o + h * n_in + h * h];
            let states = &trace.states[layer];
            let mut below = vec![0.0; if layer > 0 { w * n_in } else { 0 }];
            let mut dh_next = vec![0.0; h];
            let mut da = vec![0.0; h];

            for t in (0..w).rev() {
                let ht = &states[t * h..(t + 1) * h];
                let input = if layer == 0 {
                    &x[t * f..(t + 1) * f]
                } else {
                    &trace.states[layer - 1][t * n_in..(t + 1) * n_in]
                };
                for i in 0..h {
                    da[i] = (upstream[t * h + i] + dh_next[i]) * (1.0 - ht[i] * ht[i]);
                }

                let (gwx, rest) = grad[o..].split_at_mut(h * n_in);
                let (gwh, gb) = rest.split_at_mut(h * h);
                for i in 0..h {
                    gb[i] += da[i];
                    for k in 0..n_in {
                        gwx[i * n_in + k] += da[i] * input[k];
                    }
                    if t > 0 {
                        let prev = &states[(t - 1) * h..t * h];
                        for k in 0..h {
                            gwh[i * h + k] += da[i] * prev[k];
                        }
                    }
                }

                for k in 0..h {
                    dh_next[k] = (0..h).map(|i| wh[i * h + k] * da[i]).sum();
                }
                if layer > 0 {
                    for k in 0..n_in {
                        below[t * n_in + k] = (0..h).map(|i| wx[i * n_in + k] * da[i]).sum();
                    }
                }
            }
            upstream = below;
        }

        (grad, loss)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn shape(architecture: Architecture, layers: usize) -> NetworkShape {
        NetworkShape {
            architecture,
            n_features: 2,
            window_len: 4,
            horizon: 2,
            hidden_size: 3,
            layers,
        }
    }

    fn randomized(shape: NetworkShape, seed: u64) -> Network {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut net = Network::init(shape, &mut rng);
        for p in net.params_mut() {
            *p = rng.gen_range(-0.5..0.5);
        }
        net
    }

    fn check_gradient(net: &Network) {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let s = *net.shape();
        let x: Vec<f64> = (0..s.n_inputs()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let t: Vec<f64> = (0..s.n_outputs()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let (grad, _) = net.gradient(&x, &t);
        let eps = 1e-6;
        for p in 0..s.n_params() {
            let mut plus = net.clone();
            plus.params_mut()[p] += eps;
            let mut minus = net.clone();
            minus.params_mut()[p] -= eps;
            let numeric = (plus.gradient(&x, &t).1 - minus.gradient(&x, &t).1) / (2.0 * eps);
            let tol = 1e-6 + 1e-4 * numeric.abs();
            assert!(
                (grad[p] - numeric).abs() < tol,
                "param {p}: analytic {} vs numeric {numeric}",
                grad[p]
            );
        }
    }

    #[test]
    fn parameter_count() {
        // layer 0: 3*2 + 9 + 3 = 18, layer 1: 9 + 9 + 3 = 21, head 4*3, bias 4, highway 4*8
        assert_eq!(shape(Architecture::Elman, 2).n_params(), 18 + 21 + 12 + 4 + 32);
        assert_eq!(shape(Architecture::Autoregressive, 2).n_params(), 4 + 32);
    }

    #[test]
    fn gradient_matches_finite_differences_single_layer() {
        check_gradient(&randomized(shape(Architecture::Elman, 1), 1));
    }

    #[test]
    fn gradient_matches_finite_differences_stacked() {
        check_gradient(&randomized(shape(Architecture::Elman, 2), 2));
    }

    #[test]
    fn gradient_matches_finite_differences_autoregressive() {
        check_gradient(&randomized(shape(Architecture::Autoregressive, 1), 3));
    }

    #[test]
    fn fresh_network_predicts_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let net = Network::init(shape(Architecture::Elman, 1), &mut rng);
        let y = net.predict(&[0.3; 8]);
        assert_eq!(y, vec![0.0; 4]);
    }

    #[test]
    fn init_is_seeded() {
        let a = Network::init(shape(Architecture::Elman, 2), &mut ChaCha8Rng::seed_from_u64(7));
        let b = Network::init(shape(Architecture::Elman, 2), &mut ChaCha8Rng::seed_from_u64(7));
        let c = Network::init(shape(Architecture::Elman, 2), &mut ChaCha8Rng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
