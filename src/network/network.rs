use log::trace;
use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::arena::Arena;
use crate::error::{NnError, Result};
use crate::math::matrix::{Matrix, MatrixView, Row};

/// Fully connected feed-forward network.
///
/// For an architecture `L0..Ln`, layer `i` maps the `1 x Li` activation row
/// through weights `Li x Li+1` and bias `1 x Li+1`. The same structure, filled
/// with partial derivatives instead of parameters, is what [`Network::backprop`]
/// returns.
#[derive(Debug)]
pub struct Network<'a> {
    architecture: Vec<usize>,
    activation: ActivationFunction,
    weights: Vec<Matrix<'a>>,
    biases: Vec<Matrix<'a>>,
    activations: Vec<Matrix<'a>>,
}

#[derive(Clone, Copy)]
enum Param {
    Weight,
    Bias,
}

impl<'a> Network<'a> {
    /// Allocates every weight, bias and activation buffer from `arena`
    /// (or the heap if `None`). All cells start at zero.
    pub fn new(
        arena: Option<&'a Arena>,
        architecture: &[usize],
        activation: ActivationFunction,
    ) -> Result<Network<'a>> {
        if architecture.len() < 2 {
            return Err(NnError::InvalidArchitecture(format!(
                "need at least an input and an output layer, got {} layer(s)",
                architecture.len()
            )));
        }
        if let Some(i) = architecture.iter().position(|&width| width == 0) {
            return Err(NnError::InvalidArchitecture(format!("layer {i} has zero width")));
        }

        let n = architecture.len() - 1;
        let mut weights = Vec::with_capacity(n);
        let mut biases = Vec::with_capacity(n);
        let mut activations = Vec::with_capacity(n + 1);

        activations.push(Matrix::alloc(arena, 1, architecture[0])?);
        for pair in architecture.windows(2) {
            weights.push(Matrix::alloc(arena, pair[0], pair[1])?);
            biases.push(Matrix::alloc(arena, 1, pair[1])?);
            activations.push(Matrix::alloc(arena, 1, pair[1])?);
        }
        trace!("allocated {activation} network {architecture:?}");

        Ok(Network {
            architecture: architecture.to_vec(),
            activation,
            weights,
            biases,
            activations,
        })
    }

    pub fn architecture(&self) -> &[usize] {
        &self.architecture
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    /// Number of weight layers, one less than the architecture length.
    pub fn layer_count(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self, i: usize) -> &Matrix<'a> {
        &self.weights[i]
    }

    pub fn weights_mut(&mut self, i: usize) -> &mut Matrix<'a> {
        &mut self.weights[i]
    }

    pub fn biases(&self, i: usize) -> &Matrix<'a> {
        &self.biases[i]
    }

    pub fn biases_mut(&mut self, i: usize) -> &mut Matrix<'a> {
        &mut self.biases[i]
    }

    /// Activation row of layer `i`; layer 0 is the input buffer.
    pub fn activations(&self, i: usize) -> &Matrix<'a> {
        &self.activations[i]
    }

    pub fn input(&self) -> &Matrix<'a> {
        &self.activations[0]
    }

    pub fn input_mut(&mut self) -> &mut Matrix<'a> {
        &mut self.activations[0]
    }

    pub fn output(&self) -> &Matrix<'a> {
        &self.activations[self.layer_count()]
    }

    pub fn zero(&mut self) {
        for m in self
            .weights
            .iter_mut()
            .chain(self.biases.iter_mut())
            .chain(self.activations.iter_mut())
        {
            m.fill(0.0);
        }
    }

    /// Draws every weight and bias uniformly from `[low, high)`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, low: f64, high: f64) {
        for m in self.weights.iter_mut().chain(self.biases.iter_mut()) {
            m.randomize(rng, low, high);
        }
    }

    /// Propagates the input buffer through every layer:
    /// `a[i+1] = f(a[i] * W[i] + b[i])`.
    pub fn forward(&mut self) {
        for i in 0..self.layer_count() {
            let (done, rest) = self.activations.split_at_mut(i + 1);
            let next = &mut rest[0];
            next.multiply(done[i].view(), self.weights[i].view());
            next.add(self.biases[i].view());
            next.apply(self.activation);
        }
    }

    /// Copies `input` into the input buffer, runs [`Network::forward`] and
    /// returns the output row.
    pub fn predict(&mut self, input: &[f64]) -> &[f64] {
        self.activations[0].copy_from(Row::from(input).as_matrix());
        self.forward();
        self.output().as_slice()
    }

    /// Mean over rows of the summed squared error of the outputs.
    ///
    /// Every row of `table` is `[input | target]`.
    ///
    /// # Panics
    /// Panics if `table.cols()` is not input width plus output width.
    pub fn cost(&mut self, table: MatrixView<'_>) -> f64 {
        self.check_table(table);
        let n = table.rows();
        if n == 0 {
            return 0.0;
        }

        let mut c = 0.0;
        for i in 0..n {
            let target = self.load_sample(table.row(i));
            self.forward();
            c += self
                .output()
                .as_slice()
                .iter()
                .zip(target.as_slice())
                .map(|(out, expected)| (out - expected).powi(2))
                .sum::<f64>();
        }
        c / n as f64
    }

    /// Mean gradient of [`Network::cost`] over `table`, derived analytically.
    ///
    /// The gradient network is allocated from `arena` (or the heap if `None`);
    /// its activation buffers hold the last row's error signals.
    ///
    /// # Panics
    /// Panics if `table.cols()` is not input width plus output width.
    pub fn backprop<'g>(
        &mut self,
        arena: Option<&'g Arena>,
        table: MatrixView<'_>,
    ) -> Result<Network<'g>> {
        self.check_table(table);
        let mut gradient = Network::new(arena, &self.architecture, self.activation)?;
        let n = self.layer_count();
        let rows = table.rows();

        // i - current sample
        // l - current layer
        // j - unit in layer l
        // k - unit in layer l - 1
        for i in 0..rows {
            let target = self.load_sample(table.row(i));
            self.forward();

            for a in gradient.activations.iter_mut() {
                a.fill(0.0);
            }
            let seed = gradient.activations[n].as_mut_slice();
            for ((g, out), expected) in seed
                .iter_mut()
                .zip(self.activations[n].as_slice())
                .zip(target.as_slice())
            {
                *g = 2.0 * (out - expected);
            }

            for l in (1..=n).rev() {
                let (lower, upper) = gradient.activations.split_at_mut(l);
                let g_prev = lower[l - 1].as_mut_slice();
                let g_cur = upper[0].as_slice();
                let g_weights = &mut gradient.weights[l - 1];
                let g_biases = gradient.biases[l - 1].as_mut_slice();
                let a_prev = self.activations[l - 1].as_slice();
                let a_cur = self.activations[l].as_slice();
                let weights = &self.weights[l - 1];

                for j in 0..a_cur.len() {
                    let dq = g_cur[j] * self.activation.derivative(a_cur[j]);
                    g_biases[j] += dq;
                    for k in 0..a_prev.len() {
                        *g_weights.at_mut(k, j) += dq * a_prev[k];
                        g_prev[k] += dq * weights.at(k, j);
                    }
                }
            }
        }

        if rows > 0 {
            let rows = rows as f64;
            for m in gradient.weights.iter_mut().chain(gradient.biases.iter_mut()) {
                for cell in m.as_mut_slice() {
                    *cell /= rows;
                }
            }
        }

        Ok(gradient)
    }

    /// Gradient of [`Network::cost`] by symmetric differences, one parameter
    /// at a time. Slow; meant for checking [`Network::backprop`].
    pub fn finite_diff<'g>(
        &mut self,
        arena: Option<&'g Arena>,
        eps: f64,
        table: MatrixView<'_>,
    ) -> Result<Network<'g>> {
        self.check_table(table);
        let mut gradient = Network::new(arena, &self.architecture, self.activation)?;

        for layer in 0..self.layer_count() {
            for idx in 0..self.weights[layer].as_slice().len() {
                gradient.weights[layer].as_mut_slice()[idx] =
                    self.symmetric_difference(Param::Weight, layer, idx, eps, table);
            }
            for idx in 0..self.biases[layer].as_slice().len() {
                gradient.biases[layer].as_mut_slice()[idx] =
                    self.symmetric_difference(Param::Bias, layer, idx, eps, table);
            }
        }

        Ok(gradient)
    }

    /// Plain gradient descent: `param -= rate * gradient`.
    ///
    /// # Panics
    /// Panics if `gradient` was built for another architecture.
    pub fn learn(&mut self, gradient: &Network<'_>, rate: f64) {
        assert_eq!(
            self.architecture, gradient.architecture,
            "gradient architecture does not match network"
        );
        let params = self.weights.iter_mut().chain(self.biases.iter_mut());
        let grads = gradient.weights.iter().chain(gradient.biases.iter());
        for (param, grad) in params.zip(grads) {
            for (p, g) in param.as_mut_slice().iter_mut().zip(grad.as_slice()) {
                *p -= rate * g;
            }
        }
    }

    fn check_table(&self, table: MatrixView<'_>) {
        let expected = self.architecture[0] + self.architecture[self.layer_count()];
        assert_eq!(
            table.cols(),
            expected,
            "training table has {} columns, network expects {expected} (input + output)",
            table.cols()
        );
    }

    /// Copies the input part of `sample` into the input buffer and returns the target part.
    fn load_sample<'t>(&mut self, sample: Row<'t>) -> Row<'t> {
        let input_cols = self.architecture[0];
        let output_cols = self.architecture[self.layer_count()];
        let input = sample.slice(0, input_cols);
        self.activations[0].copy_from(input.as_matrix());
        sample.slice(input_cols, output_cols)
    }

    fn param_mut(&mut self, param: Param, layer: usize, idx: usize) -> &mut f64 {
        let m = match param {
            Param::Weight => &mut self.weights[layer],
            Param::Bias => &mut self.biases[layer],
        };
        &mut m.as_mut_slice()[idx]
    }

    fn symmetric_difference(
        &mut self,
        param: Param,
        layer: usize,
        idx: usize,
        eps: f64,
        table: MatrixView<'_>,
    ) -> f64 {
        let saved = *self.param_mut(param, layer, idx);
        *self.param_mut(param, layer, idx) = saved + eps;
        let plus = self.cost(table);
        *self.param_mut(param, layer, idx) = saved - eps;
        let minus = self.cost(table);
        *self.param_mut(param, layer, idx) = saved;
        (plus - minus) / (2.0 * eps)
    }
}
