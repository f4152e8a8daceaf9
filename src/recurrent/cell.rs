//! Recurrent cell weights and single-sequence scans.
//!
//! Gate layout follows the usual stacked convention:
//!
//! ```text
//! plain: [h]            h' = tanh(W_ih x + b_ih + W_hh h + b_hh)
//! lstm:  [i, f, g, o]   c' = σ(f) ⊙ c + σ(i) ⊙ tanh(g),  h' = σ(o) ⊙ tanh(c')
//! gru:   [r, z, n]      n  = tanh(W_in x + b_in + σ(r) ⊙ (W_hn h + b_hn))
//!                       h' = (1 − σ(z)) ⊙ n + σ(z) ⊙ h
//! ```

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use super::RnnKind;

/// Weights for one direction of a recurrent transform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellWeights {
    /// Input-to-hidden: W_ih ∈ R^{(gates·hidden) × input}
    pub w_ih: Array2<f32>,

    /// Hidden-to-hidden: W_hh ∈ R^{(gates·hidden) × hidden}
    pub w_hh: Array2<f32>,

    /// Input bias: b_ih ∈ R^{gates·hidden}
    pub b_ih: Array1<f32>,

    /// Recurrent bias: b_hh ∈ R^{gates·hidden}
    pub b_hh: Array1<f32>,
}

impl CellWeights {
    pub fn zeros(kind: RnnKind, input: usize, hidden: usize) -> Self {
        let rows = kind.gates() * hidden;
        Self {
            w_ih: Array2::zeros((rows, input)),
            w_hh: Array2::zeros((rows, hidden)),
            b_ih: Array1::zeros(rows),
            b_hh: Array1::zeros(rows),
        }
    }

    /// Uniform `U(-1/sqrt(hidden), 1/sqrt(hidden))` for every tensor.
    pub fn init(kind: RnnKind, input: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let rows = kind.gates() * hidden;
        let bound = 1.0 / (hidden.max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let mut draw = || dist.sample(&mut *rng);
        Self {
            w_ih: Array2::from_shape_simple_fn((rows, input), &mut draw),
            w_hh: Array2::from_shape_simple_fn((rows, hidden), &mut draw),
            b_ih: Array1::from_shape_simple_fn(rows, &mut draw),
            b_hh: Array1::from_shape_simple_fn(rows, &mut draw),
        }
    }

    pub fn hidden(&self) -> usize {
        self.w_hh.ncols()
    }

    pub fn param_count(&self) -> usize {
        self.w_ih.len() + self.w_hh.len() + self.b_ih.len() + self.b_hh.len()
    }

    /// Run the cell over one `[steps, input]` sequence from a zero state.
    ///
    /// Returns `[steps, hidden]`; with `reverse` the scan runs from the last
    /// step to the first, but row `t` still holds the output for step `t`.
    pub fn scan(&self, kind: RnnKind, x: ArrayView2<'_, f32>, reverse: bool) -> Array2<f32> {
        let steps = x.nrows();
        let hidden = self.hidden();
        // Input contributions for every step in one matmul.
        let projected = x.dot(&self.w_ih.t()) + &self.b_ih;
        let mut out = Array2::zeros((steps, hidden));
        let mut h = Array1::<f32>::zeros(hidden);
        let mut c = Array1::<f32>::zeros(hidden);

        let order: Box<dyn Iterator<Item = usize>> = if reverse {
            Box::new((0..steps).rev())
        } else {
            Box::new(0..steps)
        };
        for t in order {
            let xw = projected.row(t);
            let hw = self.w_hh.dot(&h) + &self.b_hh;
            h = match kind {
                RnnKind::Plain => plain_step(xw, hw.view()),
                RnnKind::Lstm => lstm_step(xw, hw.view(), &mut c, hidden),
                RnnKind::Gru => gru_step(xw, hw.view(), &h, hidden),
            };
            out.row_mut(t).assign(&h);
        }
        out
    }
}

fn plain_step(xw: ArrayView1<'_, f32>, hw: ArrayView1<'_, f32>) -> Array1<f32> {
    (&xw + &hw).mapv(f32::tanh)
}

fn lstm_step(
    xw: ArrayView1<'_, f32>,
    hw: ArrayView1<'_, f32>,
    c: &mut Array1<f32>,
    hidden: usize,
) -> Array1<f32> {
    let gates = &xw + &hw;
    let mut h = Array1::zeros(hidden);
    for u in 0..hidden {
        let i = sigmoid(gates[u]);
        let f = sigmoid(gates[hidden + u]);
        let g = gates[2 * hidden + u].tanh();
        let o = sigmoid(gates[3 * hidden + u]);
        c[u] = f * c[u] + i * g;
        h[u] = o * c[u].tanh();
    }
    h
}

fn gru_step(
    xw: ArrayView1<'_, f32>,
    hw: ArrayView1<'_, f32>,
    h_prev: &Array1<f32>,
    hidden: usize,
) -> Array1<f32> {
    let r = (&xw.slice(s![..hidden]) + &hw.slice(s![..hidden])).mapv(sigmoid);
    let z = (&xw.slice(s![hidden..2 * hidden]) + &hw.slice(s![hidden..2 * hidden])).mapv(sigmoid);
    let n = (&xw.slice(s![2 * hidden..]) + &(&r * &hw.slice(s![2 * hidden..]))).mapv(f32::tanh);
    (1.0 - &z) * &n + &z * h_prev
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}
