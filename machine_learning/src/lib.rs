pub mod dataset;
pub mod error;
pub mod model;
pub mod optimization;

pub use dataset::Dataset;
pub use error::{MlErr, Result};
pub use model::LinearRegression;
