use serde::{Deserialize, Serialize};

/// The state a chief pushes into a parameter server before training starts.
///
/// `params` are the variables placed on that server, in placement order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitSpec {
    pub step: u64,
    pub params: Vec<f32>,
}
