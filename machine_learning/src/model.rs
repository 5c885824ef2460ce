//! The linear model `y = w*x + b` over a flat `[weight, bias]` buffer.

use crate::{MlErr, Result};

pub const WEIGHT: usize = 0;
pub const BIAS: usize = 1;
pub const NUM_PARAMS: usize = 2;

/// The variable names, in parameter order.
pub const PARAM_NAMES: [&str; NUM_PARAMS] = ["weight", "bias"];

/// A read-only view of the model's parameters.
#[derive(Debug, Clone, Copy)]
pub struct LinearRegression<'a> {
    params: &'a [f32],
}

impl<'a> LinearRegression<'a> {
    /// Creates a new `LinearRegression` view.
    ///
    /// # Arguments
    /// * `params` - The flat parameters, `[weight, bias]`.
    ///
    /// # Returns
    /// The view or a size mismatch error.
    pub fn new(params: &'a [f32]) -> Result<Self> {
        if params.len() != NUM_PARAMS {
            return Err(MlErr::SizeMismatch {
                a: "params",
                b: "model",
                got: params.len(),
                expected: NUM_PARAMS,
            });
        }

        Ok(Self { params })
    }

    pub fn weight(&self) -> f32 {
        self.params[WEIGHT]
    }

    pub fn bias(&self) -> f32 {
        self.params[BIAS]
    }

    pub fn predict(&self, x: f32) -> f32 {
        self.weight() * x + self.bias()
    }

    /// The squared error of a single sample.
    pub fn loss(&self, x: f32, y: f32) -> f32 {
        (y - self.predict(x)).powi(2)
    }

    /// Writes the gradient of `loss(x, y)` with respect to `[weight, bias]` into `grad`.
    ///
    /// # Returns
    /// A size mismatch error if `grad` isn't `NUM_PARAMS` long.
    pub fn gradient(&self, x: f32, y: f32, grad: &mut [f32]) -> Result<()> {
        if grad.len() != NUM_PARAMS {
            return Err(MlErr::SizeMismatch {
                a: "grad",
                b: "model",
                got: grad.len(),
                expected: NUM_PARAMS,
            });
        }

        let residual = y - self.predict(x);
        grad[WEIGHT] = -2. * x * residual;
        grad[BIAS] = -2. * residual;
        Ok(())
    }
}
