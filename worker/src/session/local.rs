use machine_learning::{
    LinearRegression,
    model::NUM_PARAMS,
    optimization::{Optimizer, OptimizerSpec},
};

use super::Session;
use crate::Result;

/// A session owning the variables, the optimizer and the global step.
pub struct LocalSession {
    params: Vec<f32>,
    grad: Vec<f32>,
    optimizer: Box<dyn Optimizer + Send>,
    step: u64,
}

impl LocalSession {
    /// Creates a new `LocalSession` with every variable set to zero.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer to apply the gradients with.
    ///
    /// # Returns
    /// A new `LocalSession` instance.
    pub fn new(optimizer: OptimizerSpec) -> Self {
        Self {
            params: vec![0.; NUM_PARAMS],
            grad: vec![0.; NUM_PARAMS],
            optimizer: optimizer.build(NUM_PARAMS),
            step: 0,
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }
}

impl Session for LocalSession {
    async fn train_step(&mut self, x: f32, y: f32) -> Result<()> {
        LinearRegression::new(&self.params)?.gradient(x, y, &mut self.grad)?;
        self.optimizer.update_params(&self.grad, &mut self.params)?;
        self.step += 1;
        Ok(())
    }

    async fn evaluate(&mut self, x: f32, y: f32) -> Result<(f32, u64)> {
        let loss = LinearRegression::new(&self.params)?.loss(x, y);
        Ok((loss, self.step))
    }

    async fn params(&mut self) -> Result<Vec<f32>> {
        Ok(self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_step_moves_towards_the_sample() -> Result<()> {
        let optimizer = OptimizerSpec::from_name("sgd", 0.1)?;
        let mut session = LocalSession::new(optimizer);

        let (before, _) = session.evaluate(1., 3.).await?;
        session.train_step(1., 3.).await?;
        let (after, step) = session.evaluate(1., 3.).await?;

        assert!(after < before);
        assert_eq!(step, 1);
        Ok(())
    }

    #[tokio::test]
    async fn sgd_step_matches_the_closed_form() -> Result<()> {
        let optimizer = OptimizerSpec::from_name("sgd", 0.5)?;
        let mut session = LocalSession::new(optimizer);

        // r = 2, grad = [-2 * 1 * 2, -2 * 2].
        session.train_step(1., 2.).await?;
        assert_eq!(session.params().await?, vec![2., 2.]);
        Ok(())
    }
}
