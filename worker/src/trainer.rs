use std::num::NonZeroUsize;

use log::info;
use machine_learning::Dataset;

use crate::{Result, session::Session, summary::SummaryWriter};

/// The summary tag of the periodic loss.
pub const LOSS_TAG: &str = "loss";
/// The summary tag read by hyperparameter tuning services.
pub const HPTUNING_METRIC_TAG: &str = "training/hptuning/metric";

/// Runs the per sample training loop over a session.
pub struct Trainer {
    max_epochs: NonZeroUsize,
    checkpoint_period: NonZeroUsize,
    loss_tags: Vec<&'static str>,
}

impl Trainer {
    /// Creates a new `Trainer` writing the loss under `LOSS_TAG`.
    ///
    /// # Arguments
    /// * `max_epochs` - The amount of passes over the dataset.
    /// * `checkpoint_period` - Evaluate every this many epochs.
    ///
    /// # Returns
    /// A new `Trainer` instance.
    pub fn new(max_epochs: NonZeroUsize, checkpoint_period: NonZeroUsize) -> Self {
        Self {
            max_epochs,
            checkpoint_period,
            loss_tags: vec![LOSS_TAG],
        }
    }

    /// Replaces the tags the periodic loss is written under.
    pub fn with_loss_tags(mut self, tags: &[&'static str]) -> Self {
        self.loss_tags = tags.to_vec();
        self
    }

    /// Trains for `max_epochs` passes over `dataset`, one step per sample.
    ///
    /// Every `checkpoint_period` epochs the loss of the first sample is logged
    /// and, when a `summary` is given, written at the current global step.
    ///
    /// # Arguments
    /// * `session` - Where the variables live.
    /// * `dataset` - The training samples, visited in order.
    /// * `summary` - The summary writer of this process, if it writes any.
    ///
    /// # Returns
    /// The variables after the last step.
    pub async fn train<S: Session>(
        &self,
        session: &mut S,
        dataset: &Dataset,
        mut summary: Option<&mut SummaryWriter>,
    ) -> Result<Vec<f32>> {
        info!("Run training with epoch number: {}", self.max_epochs);

        for epoch in 0..self.max_epochs.get() {
            for (x, y) in dataset.iter() {
                session.train_step(x, y).await?;
            }

            if epoch % self.checkpoint_period.get() != 0 {
                continue;
            }

            let Some((x, y)) = dataset.first() else {
                continue;
            };

            let (loss, step) = session.evaluate(x, y).await?;
            if let Some(writer) = summary.as_deref_mut() {
                for tag in &self.loss_tags {
                    writer.add_scalar(tag, loss, step)?;
                }
            }

            info!("Epoch: {epoch}, loss: {loss}");
        }

        if let Some(writer) = summary {
            writer.flush()?;
        }

        session.params().await
    }
}
