use std::{
    error::Error,
    fmt::{self, Display},
};

use machine_learning::MlErr;

/// The specific result type for the storage module.
pub type Result<T> = std::result::Result<T, StoreErr>;

/// Errors returned by the `ParameterStore`.
#[derive(Debug, PartialEq)]
pub enum StoreErr {
    /// The chief has not pushed the initial state yet.
    NotInitialized,
    /// The optimizer rejected an update.
    Ml(MlErr),
}

impl Display for StoreErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErr::NotInitialized => f.write_str("the parameter store is not initialized"),
            StoreErr::Ml(e) => write!(f, "ParameterStore error: {e}"),
        }
    }
}

impl Error for StoreErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreErr::Ml(e) => Some(e),
            StoreErr::NotInitialized => None,
        }
    }
}

impl From<MlErr> for StoreErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
