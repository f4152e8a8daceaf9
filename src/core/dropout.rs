//! Dropout and the explicit execution mode.
//!
//! There is no module-held training flag: every forward call receives a
//! [`Mode`], and only [`Mode::Training`] carries the RNG dropout draws from.

use ndarray::{Array, Dimension};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};

use crate::error::{DualPathError, Result};

/// Execution mode threaded through every forward call.
#[derive(Debug)]
pub enum Mode {
    /// Deterministic evaluation; dropout is the identity.
    Inference,
    /// Stochastic training pass; dropout masks are drawn from the RNG.
    Training(StdRng),
}

impl Mode {
    /// Training mode with a seeded RNG.
    pub fn training(seed: u64) -> Self {
        Mode::Training(StdRng::seed_from_u64(seed))
    }

    pub fn is_training(&self) -> bool {
        matches!(self, Mode::Training(_))
    }
}

/// Inverted dropout: zero with probability `p`, scale survivors by `1/(1-p)`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Dropout {
    p: f32,
}

impl Dropout {
    pub fn new(p: f32) -> Result<Self> {
        if !p.is_finite() || !(0.0..1.0).contains(&p) {
            return Err(DualPathError::config(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }
        Ok(Self { p })
    }

    pub fn disabled() -> Self {
        Self { p: 0.0 }
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    /// Apply in place. Identity unless `mode` is training and `p > 0`.
    pub fn apply<D: Dimension>(&self, x: &mut Array<f32, D>, mode: &mut Mode) {
        let rng = match mode {
            Mode::Training(rng) if self.p > 0.0 => rng,
            _ => return,
        };
        let keep = 1.0 - f64::from(self.p);
        // `p` is validated in `new`, so `keep` lies in (0, 1].
        let Ok(mask) = Bernoulli::new(keep) else {
            return;
        };
        let scale = 1.0 / (1.0 - self.p);
        for v in x.iter_mut() {
            *v = if mask.sample(&mut *rng) { *v * scale } else { 0.0 };
        }
    }
}

impl Default for Dropout {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Dropout::new(1.0).is_err());
        assert!(Dropout::new(-0.1).is_err());
        assert!(Dropout::new(f32::NAN).is_err());
        assert!(Dropout::new(0.0).is_ok());
    }

    #[test]
    fn test_inference_is_identity() {
        let dropout = Dropout::new(0.5).unwrap();
        let mut x = Array2::from_elem((4, 4), 2.0f32);
        dropout.apply(&mut x, &mut Mode::Inference);
        assert!(x.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_training_zeroes_and_scales() {
        let dropout = Dropout::new(0.5).unwrap();
        let mut x = Array2::from_elem((32, 32), 1.0f32);
        dropout.apply(&mut x, &mut Mode::training(7));
        let zeros = x.iter().filter(|&&v| v == 0.0).count();
        assert!(x.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));
        // 1024 draws at p = 0.5: far from both extremes.
        assert!(zeros > 300 && zeros < 724, "zeros = {zeros}");
    }

    #[test]
    fn test_training_is_seeded() {
        let dropout = Dropout::new(0.3).unwrap();
        let mut a = Array2::from_elem((8, 8), 1.0f32);
        let mut b = a.clone();
        dropout.apply(&mut a, &mut Mode::training(42));
        dropout.apply(&mut b, &mut Mode::training(42));
        assert_eq!(a, b);
    }
}
