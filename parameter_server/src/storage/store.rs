use std::sync::Arc;

use comms::specs::server::InitSpec;
use machine_learning::optimization::{Optimizer, OptimizerSpec};
use parking_lot::Mutex;

use super::{Result, StoreErr};

struct State {
    params: Box<[f32]>,
    optimizer: Box<dyn Optimizer + Send>,
    step: u64,
}

/// The variables held by this server together with their optimizer slots and
/// the server's step counter.
///
/// Cloning yields another handle to the same storage. The lock is never held
/// across an await point.
#[derive(Clone)]
pub struct ParameterStore {
    optimizer: OptimizerSpec,
    state: Arc<Mutex<Option<State>>>,
}

impl ParameterStore {
    /// Creates a new uninitialized `ParameterStore`.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer to instanciate on every `init`.
    ///
    /// # Returns
    /// A new `ParameterStore` instance.
    pub fn new(optimizer: OptimizerSpec) -> Self {
        Self {
            optimizer,
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces the stored variables and step, resetting the optimizer slots.
    ///
    /// # Arguments
    /// * `spec` - The initial state.
    pub fn init(&self, spec: InitSpec) {
        let InitSpec { step, params } = spec;
        let optimizer = self.optimizer.build(params.len());

        *self.state.lock() = Some(State {
            params: params.into_boxed_slice(),
            optimizer,
            step,
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Applies `grad` to the stored variables and increments the step by one.
    ///
    /// # Arguments
    /// * `grad` - A gradient covering exactly the stored variables.
    ///
    /// # Returns
    /// The step after the update, `NotInitialized` or the optimizer's size mismatch error.
    pub fn apply(&self, grad: &[f32]) -> Result<u64> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(StoreErr::NotInitialized)?;

        state.optimizer.update_params(grad, &mut state.params)?;
        state.step += 1;
        Ok(state.step)
    }

    /// Copies the stored variables into `out`, resizing it as needed.
    ///
    /// # Returns
    /// The current step or `NotInitialized`.
    pub fn pull(&self, out: &mut Vec<f32>) -> Result<u64> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(StoreErr::NotInitialized)?;

        out.clear();
        out.extend_from_slice(&state.params);
        Ok(state.step)
    }

    /// Returns the current step or `NotInitialized`.
    pub fn step(&self) -> Result<u64> {
        self.state
            .lock()
            .as_ref()
            .map(|state| state.step)
            .ok_or(StoreErr::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sgd_store() -> ParameterStore {
        let optimizer = OptimizerSpec::from_name("sgd", 0.5).unwrap();
        ParameterStore::new(optimizer)
    }

    #[test]
    fn uninitialized_store_rejects_everything() {
        let store = sgd_store();
        let mut out = Vec::new();

        assert!(!store.is_initialized());
        assert_eq!(store.pull(&mut out), Err(StoreErr::NotInitialized));
        assert_eq!(store.apply(&[1.]), Err(StoreErr::NotInitialized));
        assert_eq!(store.step(), Err(StoreErr::NotInitialized));
    }

    #[test]
    fn step_increments_once_per_update() {
        let store = sgd_store();
        store.init(InitSpec {
            step: 0,
            params: vec![1., 2.],
        });

        assert_eq!(store.apply(&[2., 2.]), Ok(1));
        assert_eq!(store.apply(&[0., 2.]), Ok(2));

        let mut out = Vec::new();
        assert_eq!(store.pull(&mut out), Ok(2));
        assert_eq!(out, vec![0., 0.]);
    }

    #[test]
    fn failed_update_leaves_the_step_untouched() {
        let store = sgd_store();
        store.init(InitSpec {
            step: 5,
            params: vec![1.],
        });

        assert!(matches!(store.apply(&[1., 1.]), Err(StoreErr::Ml(_))));
        assert_eq!(store.step(), Ok(5));
    }

    #[test]
    fn init_restores_a_step() {
        let store = sgd_store();
        store.init(InitSpec {
            step: 41,
            params: vec![0.],
        });

        assert_eq!(store.apply(&[0.]), Ok(42));
    }

    #[test]
    fn clones_share_the_state() {
        let store = sgd_store();
        let other = store.clone();

        other.init(InitSpec {
            step: 0,
            params: vec![3.],
        });

        assert!(store.is_initialized());
    }
}
