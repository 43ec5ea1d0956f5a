//! Backward finite-difference weights.
//!
//! The `n`th time derivative of a sampled quantity is approximated to order `k`
//! from `N = n + k` equally spaced samples at relative offsets
//! `−(N−1), …, −1, 0`, where `0` is the most recent sample:
//!
//! ```text
//! dⁿx/dtⁿ ≈ (Σᵢ cᵢ x(offsetᵢ)) / dtⁿ
//! ```
//!
//! The weights `c` solve `Vᵀ c = n! eₙ` with the generalized Vandermonde
//! matrix `V[i, j] = offsetᵢʲ`, so the formula is exact for polynomials of
//! degree below `N`. They depend only on `(n, k)` and are shared through a
//! [`CoefficientCache`].

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Errors that can occur when building or applying a stencil.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StencilError {
    #[error("derivative and accuracy order must be at least 1, got n={derivative}, k={accuracy}")]
    ZeroOrder { derivative: usize, accuracy: usize },

    #[error("stencil n={derivative}, k={accuracy} needs {required} samples, got {available}")]
    InsufficientSamples {
        derivative: usize,
        accuracy: usize,
        required: usize,
        available: usize,
    },

    #[error("Vandermonde system for n={derivative}, k={accuracy} is singular")]
    Singular { derivative: usize, accuracy: usize },
}

/// Backward-difference weights for one `(derivative, accuracy)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    derivative: usize,
    accuracy: usize,
    weights: Vec<f64>,
}

impl Coefficients {
    /// Solves for the weights of the `derivative`th derivative at `accuracy` order.
    ///
    /// # Errors
    ///
    /// Returns an error if either order is zero.
    pub fn new(derivative: usize, accuracy: usize) -> Result<Self, StencilError> {
        if derivative == 0 || accuracy == 0 {
            return Err(StencilError::ZeroOrder {
                derivative,
                accuracy,
            });
        }

        let samples = derivative + accuracy;
        let offsets: Vec<f64> = offsets(samples).map(|o| o as f64).collect();

        let vandermonde_t = DMatrix::from_fn(samples, samples, |row, col| {
            offsets[col].powi(row as i32)
        });
        let rhs = DVector::from_fn(samples, |row, _| {
            if row == derivative {
                factorial(derivative)
            } else {
                0.0
            }
        });

        let weights = vandermonde_t
            .lu()
            .solve(&rhs)
            .ok_or(StencilError::Singular {
                derivative,
                accuracy,
            })?;

        Ok(Self {
            derivative,
            accuracy,
            weights: weights.iter().copied().collect(),
        })
    }

    /// Returns the order of the approximated derivative.
    #[must_use]
    pub fn derivative(&self) -> usize {
        self.derivative
    }

    /// Returns the order of accuracy.
    #[must_use]
    pub fn accuracy(&self) -> usize {
        self.accuracy
    }

    /// Returns the number of samples the stencil spans, `n + k`.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.weights.len()
    }

    /// Returns the weights, oldest sample first.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Returns the relative sample offsets, oldest first, ending at `0`.
    pub fn offsets(&self) -> impl Iterator<Item = i64> {
        offsets(self.samples())
    }

    /// Returns the weight of the most recent sample (offset `0`).
    #[must_use]
    pub fn current_weight(&self) -> f64 {
        self.weights[self.weights.len() - 1]
    }

    /// Returns the weights of the past samples (offsets `< 0`), oldest first.
    #[must_use]
    pub fn past_weights(&self) -> &[f64] {
        &self.weights[..self.weights.len() - 1]
    }

    /// Checks that `available` samples are enough for this stencil.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than [`Self::samples`] are available.
    pub fn check_samples(&self, available: usize) -> Result<(), StencilError> {
        if available < self.samples() {
            return Err(StencilError::InsufficientSamples {
                derivative: self.derivative,
                accuracy: self.accuracy,
                required: self.samples(),
                available,
            });
        }
        Ok(())
    }

    /// Approximates the derivative from scalar samples, oldest first.
    ///
    /// Only the last [`Self::samples`] entries are used.
    ///
    /// # Errors
    ///
    /// Returns an error if too few samples are given.
    pub fn apply(&self, samples: &[f64], dt: f64) -> Result<f64, StencilError> {
        self.check_samples(samples.len())?;
        let window = &samples[samples.len() - self.samples()..];

        let sum: f64 = self.weights.iter().zip(window).map(|(c, x)| c * x).sum();
        Ok(sum / dt.powi(self.derivative as i32))
    }
}

/// A memo of [`Coefficients`] keyed by `(derivative, accuracy)`.
///
/// The cache is `Send + Sync`; independent runs can share one instance behind
/// an [`Arc`]. Entries are computed on first request and never change.
#[derive(Debug, Default)]
pub struct CoefficientCache {
    entries: RwLock<HashMap<(usize, usize), Arc<Coefficients>>>,
}

impl CoefficientCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the coefficients for `(derivative, accuracy)`, computing them once.
    ///
    /// # Errors
    ///
    /// Returns an error if the coefficients cannot be computed.
    pub fn get(&self, derivative: usize, accuracy: usize) -> Result<Arc<Coefficients>, StencilError> {
        let key = (derivative, accuracy);

        if let Some(found) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(found));
        }

        let computed = Arc::new(Coefficients::new(derivative, accuracy)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(computed)))
    }

    /// Returns the number of memoized stencils.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn offsets(samples: usize) -> impl Iterator<Item = i64> {
    let first = -(samples as i64 - 1);
    first..=0
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|i| i as f64).product()
}
