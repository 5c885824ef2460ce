//! The parameter server role: holds a partition of the model's variables,
//! applies the optimizer to pushed gradients and waits on its worker done
//! queue until every trainer has finished.

mod service;
mod storage;
mod synchronization;
#[cfg(test)]
mod test;

pub use service::ParameterServer;
pub use storage::{ParameterStore, Result, StoreErr};
pub use synchronization::{DoneSender, WorkerDoneQueue};
