use super::Optimizer;
use crate::{Result, error::check_sizes};

#[derive(Debug)]
pub struct RmsProp {
    learning_rate: f32,
    decay: f32,
    momentum: f32,
    epsilon: f32,
    ms: Box<[f32]>,
    mom: Box<[f32]>,
}

impl RmsProp {
    pub const DECAY: f32 = 0.9;
    pub const MOMENTUM: f32 = 0.;
    pub const EPSILON: f32 = 1e-10;

    /// Creates a new `RmsProp` optimizer.
    ///
    /// The mean square starts at one rather than zero so the first steps are not huge.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `decay` - Discount of the running mean square.
    /// * `momentum` - Momentum applied on top of the scaled gradient.
    /// * `epsilon` - Conditioning constant.
    ///
    /// # Returns
    /// A new `RmsProp` instance.
    pub fn new(len: usize, learning_rate: f32, decay: f32, momentum: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            decay,
            momentum,
            epsilon,
            ms: vec![1.; len].into_boxed_slice(),
            mom: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for RmsProp {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;
        check_sizes(grad, &self.ms)?;

        let Self {
            learning_rate: lr,
            decay,
            momentum,
            epsilon: eps,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.ms.iter_mut())
            .zip(self.mom.iter_mut())
            .for_each(|(((p, g), ms), mom)| {
                *ms = decay * *ms + (1. - decay) * g * g;
                *mom = momentum * *mom + lr * g / (*ms + eps).sqrt();
                *p -= *mom;
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_square_starts_at_one() {
        let mut optimizer = RmsProp::new(1, 0.1, 0.9, 0., 0.);
        let mut params = [0.];

        optimizer.update_params(&[2.], &mut params).unwrap();

        // ms = 0.9 + 0.1 * 4 = 1.3
        let expected = -0.1 * 2. / 1.3f32.sqrt();
        assert!((params[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn momentum_carries_previous_steps() {
        let mut optimizer = RmsProp::new(1, 0.1, 0.9, 0.5, 0.);
        let mut params = [0.];

        optimizer.update_params(&[1.], &mut params).unwrap();
        let first = -params[0];
        optimizer.update_params(&[0.], &mut params).unwrap();

        assert!((-params[0] - 1.5 * first).abs() < 1e-6);
    }
}
