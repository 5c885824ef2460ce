pub mod cluster;
pub mod flags;
pub mod roles;

pub use cluster::{TaskType, TfConfig};
pub use flags::{Flags, TaskConfig};
