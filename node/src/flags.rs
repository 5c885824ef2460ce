use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use clap::Parser;
use machine_learning::{Dataset, optimization::OptimizerSpec};
use rand::{SeedableRng, rngs::StdRng};
use worker::net::ConnectOpts;

/// Trains a linear regression model standalone or on a parameter server cluster.
///
/// The cluster is read from the `TF_CONFIG` environment variable, standalone
/// training runs when it is unset or empty.
#[derive(Parser, Debug, Clone)]
#[command(name = "task", version, about, long_about = None)]
pub struct Flags {
    /// Number of epochs to run trainer
    #[arg(long = "max_epochs", default_value = "20")]
    pub max_epochs: NonZeroUsize,

    /// The checkpoint directory
    #[arg(long = "checkpoint_path", default_value = "./checkpoint/")]
    pub checkpoint_path: PathBuf,

    /// Indicates training output
    #[arg(long = "output_path", default_value = "./tensorboard/")]
    pub output_path: PathBuf,

    /// Number of epochs between two loss evaluations
    #[arg(long = "checkpoint_period", default_value = "1")]
    pub checkpoint_period: NonZeroUsize,

    /// The model directory
    #[arg(long = "model_path", default_value = "./model/")]
    pub model_path: PathBuf,

    /// Initial learning rate
    #[arg(long = "learning_rate", default_value_t = 0.01)]
    pub learning_rate: f32,

    /// Optimizer to train
    #[arg(long = "optimizer", default_value = "sgd")]
    pub optimizer: String,

    /// The path of the saved model
    #[arg(long = "saved_model_path", default_value = "./saved_model/")]
    pub saved_model_path: PathBuf,

    /// The version of the model
    #[arg(long = "model_version", default_value_t = 1)]
    pub model_version: u64,

    /// Seed of the synthetic dataset, random when unset
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Connection attempts to a parameter server that is not up yet
    #[arg(long = "connect_retries", default_value_t = 30)]
    pub connect_retries: usize,

    /// Wait between two connection attempts or readiness polls, in milliseconds
    #[arg(long = "retry_backoff_ms", default_value_t = 1000)]
    pub retry_backoff_ms: u64,
}

/// The validated configuration of this task.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub max_epochs: NonZeroUsize,
    pub checkpoint_period: NonZeroUsize,
    pub checkpoint_path: PathBuf,
    pub output_path: PathBuf,
    pub model_path: PathBuf,
    pub saved_model_path: PathBuf,
    pub model_version: u64,
    pub optimizer: OptimizerSpec,
    pub seed: Option<u64>,
    pub connect: ConnectOpts,
}

impl TryFrom<Flags> for TaskConfig {
    type Error = machine_learning::MlErr;

    fn try_from(flags: Flags) -> Result<Self, Self::Error> {
        let optimizer = OptimizerSpec::from_name(&flags.optimizer, flags.learning_rate)?;

        Ok(Self {
            max_epochs: flags.max_epochs,
            checkpoint_period: flags.checkpoint_period,
            checkpoint_path: flags.checkpoint_path,
            output_path: flags.output_path,
            model_path: flags.model_path,
            saved_model_path: flags.saved_model_path,
            model_version: flags.model_version,
            optimizer,
            seed: flags.seed,
            connect: ConnectOpts {
                retries: flags.connect_retries,
                backoff: Duration::from_millis(flags.retry_backoff_ms),
            },
        })
    }
}

impl TaskConfig {
    /// Generates the training set, deterministic when a seed was given.
    pub fn dataset(&self) -> Dataset {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Dataset::synthetic(&mut rng)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use machine_learning::MlErr;

    use super::*;

    #[test]
    fn flags_are_well_formed() {
        Flags::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let flags = Flags::parse_from(["task"]);

        assert_eq!(flags.max_epochs.get(), 20);
        assert_eq!(flags.checkpoint_path, PathBuf::from("./checkpoint/"));
        assert_eq!(flags.output_path, PathBuf::from("./tensorboard/"));
        assert_eq!(flags.checkpoint_period.get(), 1);
        assert_eq!(flags.model_path, PathBuf::from("./model/"));
        assert_eq!(flags.learning_rate, 0.01);
        assert_eq!(flags.optimizer, "sgd");
        assert_eq!(flags.saved_model_path, PathBuf::from("./saved_model/"));
        assert_eq!(flags.model_version, 1);
        assert_eq!(flags.seed, None);
        assert_eq!(flags.connect_retries, 30);
        assert_eq!(flags.retry_backoff_ms, 1000);
    }

    #[test]
    fn long_names_use_underscores() {
        let flags = Flags::parse_from([
            "task",
            "--max_epochs",
            "3",
            "--optimizer",
            "adam",
            "--learning_rate",
            "0.5",
            "--model_version",
            "7",
        ]);

        let config = TaskConfig::try_from(flags).unwrap();
        assert_eq!(config.max_epochs.get(), 3);
        assert_eq!(config.optimizer.name(), "adam");
        assert_eq!(config.model_version, 7);
    }

    #[test]
    fn zero_epochs_or_period_are_usage_errors() {
        assert!(Flags::try_parse_from(["task", "--max_epochs", "0"]).is_err());
        assert!(Flags::try_parse_from(["task", "--checkpoint_period", "0"]).is_err());
    }

    #[test]
    fn unknown_optimizer_is_rejected() {
        let flags = Flags::parse_from(["task", "--optimizer", "lbfgs"]);
        let err = TaskConfig::try_from(flags).unwrap_err();

        assert_eq!(err, MlErr::UnknownOptimizer("lbfgs".to_string()));
        assert_eq!(err.to_string(), "Unknow optimizer: lbfgs");
    }

    #[test]
    fn seeded_datasets_are_reproducible() {
        let flags = Flags::parse_from(["task", "--seed", "42"]);
        let config = TaskConfig::try_from(flags).unwrap();

        let a: Vec<_> = config.dataset().iter().collect();
        let b: Vec<_> = config.dataset().iter().collect();
        assert_eq!(a, b);
    }
}
