use super::{Adadelta, Adagrad, Adam, Ftrl, GradientDescent, Optimizer, RmsProp};
use crate::{MlErr, Result};

/// The configuration of an `Optimizer`, resolved from its name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerSpec {
    GradientDescent {
        learning_rate: f32,
    },
    Adadelta {
        learning_rate: f32,
        rho: f32,
        epsilon: f32,
    },
    Adagrad {
        learning_rate: f32,
        initial_accumulator: f32,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    Ftrl {
        learning_rate: f32,
        learning_rate_power: f32,
        initial_accumulator: f32,
        l1: f32,
        l2: f32,
    },
    RmsProp {
        learning_rate: f32,
        decay: f32,
        momentum: f32,
        epsilon: f32,
    },
}

impl OptimizerSpec {
    /// The names accepted by `from_name`.
    pub const NAMES: [&'static str; 6] = ["sgd", "adadelta", "adagrad", "adam", "ftrl", "rmsprop"];

    /// Resolves an optimizer by name using the default hyperparameters.
    ///
    /// # Arguments
    /// * `name` - One of `NAMES`.
    /// * `learning_rate` - The learning rate, must be finite and positive.
    ///
    /// # Returns
    /// The resolved optimizer or an error for unknown names and invalid learning rates.
    pub fn from_name(name: &str, learning_rate: f32) -> Result<Self> {
        let spec = match name {
            "sgd" => Self::GradientDescent { learning_rate },
            "adadelta" => Self::Adadelta {
                learning_rate,
                rho: Adadelta::RHO,
                epsilon: Adadelta::EPSILON,
            },
            "adagrad" => Self::Adagrad {
                learning_rate,
                initial_accumulator: Adagrad::INITIAL_ACCUMULATOR,
            },
            "adam" => Self::Adam {
                learning_rate,
                beta1: Adam::BETA1,
                beta2: Adam::BETA2,
                epsilon: Adam::EPSILON,
            },
            "ftrl" => Self::Ftrl {
                learning_rate,
                learning_rate_power: Ftrl::LEARNING_RATE_POWER,
                initial_accumulator: Ftrl::INITIAL_ACCUMULATOR,
                l1: 0.,
                l2: 0.,
            },
            "rmsprop" => Self::RmsProp {
                learning_rate,
                decay: RmsProp::DECAY,
                momentum: RmsProp::MOMENTUM,
                epsilon: RmsProp::EPSILON,
            },
            other => return Err(MlErr::UnknownOptimizer(other.to_string())),
        };

        if !learning_rate.is_finite() || learning_rate <= 0. {
            return Err(MlErr::InvalidLearningRate(learning_rate));
        }

        Ok(spec)
    }

    /// The name this spec resolves from.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GradientDescent { .. } => "sgd",
            Self::Adadelta { .. } => "adadelta",
            Self::Adagrad { .. } => "adagrad",
            Self::Adam { .. } => "adam",
            Self::Ftrl { .. } => "ftrl",
            Self::RmsProp { .. } => "rmsprop",
        }
    }

    /// Instanciates the optimizer for `len` parameters.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters the optimizer's slots must cover.
    ///
    /// # Returns
    /// A boxed optimizer.
    pub fn build(&self, len: usize) -> Box<dyn Optimizer + Send> {
        match *self {
            Self::GradientDescent { learning_rate } => Box::new(GradientDescent::new(learning_rate)),
            Self::Adadelta {
                learning_rate,
                rho,
                epsilon,
            } => Box::new(Adadelta::new(len, learning_rate, rho, epsilon)),
            Self::Adagrad {
                learning_rate,
                initial_accumulator,
            } => Box::new(Adagrad::new(len, learning_rate, initial_accumulator)),
            Self::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(len, learning_rate, beta1, beta2, epsilon)),
            Self::Ftrl {
                learning_rate,
                learning_rate_power,
                initial_accumulator,
                l1,
                l2,
            } => Box::new(Ftrl::new(
                len,
                learning_rate,
                learning_rate_power,
                initial_accumulator,
                l1,
                l2,
            )),
            Self::RmsProp {
                learning_rate,
                decay,
                momentum,
                epsilon,
            } => Box::new(RmsProp::new(len, learning_rate, decay, momentum, epsilon)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{Dataset, LinearRegression, model::NUM_PARAMS};

    fn mean_loss(params: &[f32], dataset: &Dataset) -> f32 {
        let model = LinearRegression::new(params).unwrap();
        dataset.iter().map(|(x, y)| model.loss(x, y)).sum::<f32>() / dataset.len() as f32
    }

    fn train(spec: OptimizerSpec, dataset: &Dataset, epochs: usize) -> [f32; NUM_PARAMS] {
        let mut optimizer = spec.build(NUM_PARAMS);
        let mut params = [0.; NUM_PARAMS];
        let mut grad = [0.; NUM_PARAMS];

        for _ in 0..epochs {
            for (x, y) in dataset.iter() {
                LinearRegression::new(&params)
                    .unwrap()
                    .gradient(x, y, &mut grad)
                    .unwrap();
                optimizer.update_params(&grad, &mut params).unwrap();
            }
        }

        params
    }

    #[test]
    fn every_name_resolves_and_round_trips() {
        for name in OptimizerSpec::NAMES {
            let spec = OptimizerSpec::from_name(name, 0.01).unwrap();
            assert_eq!(spec.name(), name);
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = OptimizerSpec::from_name("lbfgs", 0.01).unwrap_err();
        assert_eq!(err, MlErr::UnknownOptimizer("lbfgs".to_string()));
        assert_eq!(err.to_string(), "Unknow optimizer: lbfgs");
    }

    #[test]
    fn invalid_learning_rate_is_an_error() {
        assert!(OptimizerSpec::from_name("sgd", 0.).is_err());
        assert!(OptimizerSpec::from_name("adam", f32::NAN).is_err());
    }

    #[test]
    fn sgd_converges_to_the_generating_line() {
        let dataset = Dataset::synthetic(&mut StdRng::seed_from_u64(1));
        let spec = OptimizerSpec::from_name("sgd", 0.01).unwrap();

        let [w, b] = train(spec, &dataset, 20);
        assert!((w - 2.).abs() < 0.5, "w = {w}");
        assert!((b - 10.).abs() < 0.5, "b = {b}");
    }

    #[test]
    fn every_optimizer_reduces_the_loss() {
        let dataset = Dataset::synthetic(&mut StdRng::seed_from_u64(2));
        let initial = mean_loss(&[0.; NUM_PARAMS], &dataset);

        let rates = [
            ("sgd", 0.01),
            ("adadelta", 1.),
            ("adagrad", 0.5),
            ("adam", 0.1),
            ("ftrl", 0.5),
            ("rmsprop", 0.01),
        ];

        for (name, learning_rate) in rates {
            let spec = OptimizerSpec::from_name(name, learning_rate).unwrap();
            let params = train(spec, &dataset, 10);
            let loss = mean_loss(&params, &dataset);
            assert!(loss < initial, "{name}: {loss} >= {initial}");
        }
    }
}
