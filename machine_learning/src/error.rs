use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MlErr {
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    UnknownOptimizer(String),
    InvalidLearningRate(f32),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            MlErr::UnknownOptimizer(name) => write!(f, "Unknow optimizer: {name}"),
            MlErr::InvalidLearningRate(lr) => {
                write!(f, "The learning rate must be finite and positive, got {lr}")
            }
        }
    }
}

impl Error for MlErr {}

/// Checks that a gradient and the parameters it applies to have the same length.
pub(crate) fn check_sizes(grad: &[f32], params: &[f32]) -> Result<()> {
    if grad.len() != params.len() {
        return Err(MlErr::SizeMismatch {
            a: "grad",
            b: "params",
            got: grad.len(),
            expected: params.len(),
        });
    }

    Ok(())
}
