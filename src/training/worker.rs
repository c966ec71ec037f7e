//! Optional background trainer thread.
//!
//! The worker owns the only write access to a [`SharedNetwork`]. The
//! self-play side sends it sampled batches and takes snapshot copies of the
//! weights under the same lock.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, error};

use crate::ai::dqn::train_network_on_batch;
use crate::ai::{ActionSpace, ValueNetwork};
use crate::error::TrainingError;
use crate::training::replay_buffer::Transition;

/// A value network behind a mutex, shared between self-play and the worker.
#[derive(Clone)]
pub struct SharedNetwork(Arc<Mutex<ValueNetwork>>);

impl SharedNetwork {
    pub fn new(network: ValueNetwork) -> Self {
        SharedNetwork(Arc::new(Mutex::new(network)))
    }

    /// Copy of the current weights.
    pub fn snapshot(&self) -> Result<ValueNetwork, TrainingError> {
        let guard = self.0.lock().map_err(|_| TrainingError::WorkerGone)?;
        Ok(guard.clone())
    }
}

/// Settings the worker applies to every batch.
#[derive(Debug, Clone, Copy)]
pub struct UpdateSettings {
    pub discount: f32,
    pub learning_rate: f32,
    pub shape_action_bucket: bool,
}

pub struct UpdateWorker {
    network: SharedNetwork,
    batch_tx: Option<mpsc::Sender<Vec<Transition>>>,
    loss_rx: mpsc::Receiver<f32>,
    handle: Option<JoinHandle<()>>,
}

impl UpdateWorker {
    /// Start a worker that trains `network` with every batch it receives.
    pub fn spawn(network: ValueNetwork, space: ActionSpace, settings: UpdateSettings) -> Self {
        let shared = SharedNetwork::new(network);
        let (batch_tx, batch_rx) = mpsc::channel::<Vec<Transition>>();
        let (loss_tx, loss_rx) = mpsc::channel::<f32>();

        let worker_net = shared.clone();
        let handle = std::thread::spawn(move || {
            for batch in batch_rx {
                let Ok(mut network) = worker_net.0.lock() else {
                    error!("shared network lock poisoned, stopping update worker");
                    return;
                };
                let result = train_network_on_batch(
                    &mut network,
                    &space,
                    &batch,
                    settings.discount,
                    settings.learning_rate,
                    settings.shape_action_bucket,
                );
                drop(network);
                match result {
                    Ok(loss) => {
                        if loss_tx.send(loss).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "batch update failed, stopping update worker");
                        return;
                    }
                }
            }
            debug!("update worker finished");
        });

        UpdateWorker {
            network: shared,
            batch_tx: Some(batch_tx),
            loss_rx,
            handle: Some(handle),
        }
    }

    pub fn submit(&self, batch: Vec<Transition>) -> Result<(), TrainingError> {
        let tx = self.batch_tx.as_ref().ok_or(TrainingError::WorkerGone)?;
        tx.send(batch).map_err(|_| TrainingError::WorkerGone)
    }

    pub fn snapshot(&self) -> Result<ValueNetwork, TrainingError> {
        self.network.snapshot()
    }

    /// Losses reported since the last call.
    pub fn drain_losses(&self) -> Vec<f32> {
        self.loss_rx.try_iter().collect()
    }

    /// Finish the queued batches and return the final weights together with
    /// the losses not yet drained.
    pub fn finish(mut self) -> Result<(ValueNetwork, Vec<f32>), TrainingError> {
        self.shutdown();
        let losses = self.drain_losses();
        Ok((self.network.snapshot()?, losses))
    }

    fn shutdown(&mut self) {
        self.batch_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("update worker panicked");
            }
        }
    }
}

impl Drop for UpdateWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::state_encoding::feature_len;
    use crate::game::{Action, RulesDelegate, SandboxRules};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn batch() -> Vec<Transition> {
        let rules = SandboxRules::new(3, 3, 2, 50);
        let state = rules.initial_state();
        let action = Action::Place { x: 1, y: 1, piece: 0 };
        let next_state = rules.apply(&state, &action).unwrap().next_state;
        vec![Transition {
            state,
            action,
            reward: 1.0,
            next_state,
            terminal: true,
        }]
    }

    fn settings() -> UpdateSettings {
        UpdateSettings {
            discount: 0.95,
            learning_rate: 0.05,
            shape_action_bucket: false,
        }
    }

    #[test]
    fn test_worker_trains_shared_network() {
        let mut rng = StdRng::seed_from_u64(0);
        let network = ValueNetwork::new(feature_len(3, 3, 2), 8, 4, &mut rng);
        let initial = network.clone();
        let worker = UpdateWorker::spawn(network, ActionSpace::new(3, 3, 2), settings());

        for _ in 0..5 {
            worker.submit(batch()).unwrap();
        }
        let (trained, losses) = worker.finish().unwrap();
        assert_ne!(trained, initial);
        assert_eq!(losses.len(), 5);
    }

    #[test]
    fn test_losses_are_reported() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = ValueNetwork::new(feature_len(3, 3, 2), 8, 4, &mut rng);
        let worker = UpdateWorker::spawn(network, ActionSpace::new(3, 3, 2), settings());
        worker.submit(batch()).unwrap();
        worker.submit(batch()).unwrap();

        let mut losses = Vec::new();
        while losses.len() < 2 {
            losses.extend(worker.drain_losses());
            std::thread::yield_now();
        }
        assert_eq!(losses.len(), 2);
    }

    #[test]
    fn test_worker_stops_on_bad_batch() {
        let mut rng = StdRng::seed_from_u64(2);
        // Input size does not match the 3x3x2 states in the batch.
        let network = ValueNetwork::new(5, 4, 4, &mut rng);
        let worker = UpdateWorker::spawn(network, ActionSpace::new(3, 3, 2), settings());
        worker.submit(batch()).unwrap();

        let mut result = Ok(());
        for _ in 0..1000 {
            result = worker.submit(batch());
            if result.is_err() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert!(matches!(result, Err(TrainingError::WorkerGone)));
    }
}
