use super::Optimizer;
use crate::{Result, error::check_sizes};

/// Follow the regularized leader, proximal closed form.
#[derive(Debug)]
pub struct Ftrl {
    learning_rate: f32,
    learning_rate_power: f32,
    l1: f32,
    l2: f32,
    accum: Box<[f32]>,
    linear: Box<[f32]>,
}

impl Ftrl {
    pub const LEARNING_RATE_POWER: f32 = -0.5;
    pub const INITIAL_ACCUMULATOR: f32 = 0.1;

    /// Creates a new `Ftrl` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The base learning rate.
    /// * `learning_rate_power` - How the per coordinate rate decays, must be `<= 0`.
    /// * `initial_accumulator` - The starting value of the squared gradient sums.
    /// * `l1`, `l2` - Regularization strengths, `l1` drives small weights to exactly zero.
    ///
    /// # Returns
    /// A new `Ftrl` instance.
    pub fn new(
        len: usize,
        learning_rate: f32,
        learning_rate_power: f32,
        initial_accumulator: f32,
        l1: f32,
        l2: f32,
    ) -> Self {
        Self {
            learning_rate,
            learning_rate_power,
            l1,
            l2,
            accum: vec![initial_accumulator; len].into_boxed_slice(),
            linear: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Ftrl {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;
        check_sizes(grad, &self.accum)?;

        let Self {
            learning_rate: lr,
            learning_rate_power: lr_power,
            l1,
            l2,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.accum.iter_mut())
            .zip(self.linear.iter_mut())
            .for_each(|(((p, g), acc), lin)| {
                let new_acc = *acc + g * g;
                let sigma = (new_acc.powf(-lr_power) - acc.powf(-lr_power)) / lr;
                *lin += g - sigma * *p;

                let quadratic = new_acc.powf(-lr_power) / lr + 2. * l2;
                *p = if lin.abs() > l1 {
                    (lin.signum() * l1 - *lin) / quadratic
                } else {
                    0.
                };

                *acc = new_acc;
            });

        Ok(())
    }
}
