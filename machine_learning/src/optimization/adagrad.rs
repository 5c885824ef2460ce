use super::Optimizer;
use crate::{Result, error::check_sizes};

#[derive(Debug)]
pub struct Adagrad {
    learning_rate: f32,
    accum: Box<[f32]>,
}

impl Adagrad {
    pub const INITIAL_ACCUMULATOR: f32 = 0.1;

    /// Creates a new `Adagrad` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `initial_accumulator` - The starting value of the squared gradient sums, must be positive.
    ///
    /// # Returns
    /// A new `Adagrad` instance.
    pub fn new(len: usize, learning_rate: f32, initial_accumulator: f32) -> Self {
        Self {
            learning_rate,
            accum: vec![initial_accumulator; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Adagrad {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;
        check_sizes(grad, &self.accum)?;

        let lr = self.learning_rate;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.accum.iter_mut())
            .for_each(|((p, g), acc)| {
                *acc += g * g;
                *p -= lr * g / acc.sqrt();
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_scaled_by_accumulated_squares() {
        let mut optimizer = Adagrad::new(1, 0.3, 1.);
        let mut params = [0.];

        optimizer.update_params(&[3.], &mut params).unwrap();
        // accum = 1 + 9 = 10
        assert!((params[0] + 0.3 * 3. / 10f32.sqrt()).abs() < 1e-6);

        optimizer.update_params(&[3.], &mut params).unwrap();
        // accum = 19
        let expected = -0.3 * 3. / 10f32.sqrt() - 0.3 * 3. / 19f32.sqrt();
        assert!((params[0] - expected).abs() < 1e-6);
    }
}
