use super::Optimizer;
use crate::{Result, error::check_sizes};

#[derive(Debug)]
pub struct Adadelta {
    learning_rate: f32,
    rho: f32,
    epsilon: f32,
    accum: Box<[f32]>,
    accum_update: Box<[f32]>,
}

impl Adadelta {
    pub const RHO: f32 = 0.95;
    pub const EPSILON: f32 = 1e-8;

    /// Creates a new `Adadelta` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - Scales the computed update.
    /// * `rho` - The decay rate of both running averages.
    /// * `epsilon` - Conditioning constant.
    ///
    /// # Returns
    /// A new `Adadelta` instance.
    pub fn new(len: usize, learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            rho,
            epsilon,
            accum: vec![0.; len].into_boxed_slice(),
            accum_update: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Adadelta {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;
        check_sizes(grad, &self.accum)?;

        let Self {
            learning_rate: lr,
            rho,
            epsilon: eps,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.accum.iter_mut())
            .zip(self.accum_update.iter_mut())
            .for_each(|(((p, g), acc), acc_up)| {
                *acc = rho * *acc + (1. - rho) * g * g;
                let update = (*acc_up + eps).sqrt() / (*acc + eps).sqrt() * g;
                *acc_up = rho * *acc_up + (1. - rho) * update * update;
                *p -= lr * update;
            });

        Ok(())
    }
}
