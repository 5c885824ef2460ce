//! The sessions a training loop runs its steps through.

mod local;
mod remote;

pub use local::LocalSession;
pub use remote::RemoteSession;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::Result;

/// A `RemoteSession` over tcp connections.
pub type TcpSession = RemoteSession<OwnedReadHalf, OwnedWriteHalf>;

/// Runs train steps and evaluations against the model's variables,
/// wherever they live.
#[allow(unused)]
#[trait_variant::make(Session: Send)]
pub trait SessionTemplate {
    /// Should compute the gradient of the sample `(x, y)`, apply it to the
    /// variables and increase the global step by one.
    ///
    /// # Arguments
    /// * `x` - The sample's feature.
    /// * `y` - The sample's target.
    async fn train_step(&mut self, x: f32, y: f32) -> Result<()>;

    /// Should evaluate the loss of `(x, y)` under the current variables.
    ///
    /// # Returns
    /// The loss and the global step.
    async fn evaluate(&mut self, x: f32, y: f32) -> Result<(f32, u64)>;

    /// Should return a copy of the current variables, `[weight, bias]`.
    async fn params(&mut self) -> Result<Vec<f32>>;
}
