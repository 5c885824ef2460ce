use std::io;

use comms::{OnoReceiver, OnoSender};
use log::{debug, info, warn};
use machine_learning::optimization::OptimizerSpec;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    task::JoinSet,
};

use super::connection;
use crate::{ParameterStore, WorkerDoneQueue};

/// The central server structure, it handles task management and io between trainers.
pub struct ParameterServer {
    store: ParameterStore,
    queue: WorkerDoneQueue,
    trainers: usize,
    tasks: JoinSet<io::Result<()>>,
    next_id: usize,
    done: usize,
}

impl ParameterServer {
    /// Creates a new `ParameterServer`.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer applied to the variables held by this server.
    /// * `trainers` - The amount of workers and masters that must report done.
    ///
    /// # Returns
    /// A new `ParameterServer` instance.
    pub fn new(optimizer: OptimizerSpec, trainers: usize) -> Self {
        Self {
            store: ParameterStore::new(optimizer),
            queue: WorkerDoneQueue::new(trainers),
            trainers,
            tasks: JoinSet::new(),
            next_id: 0,
            done: 0,
        }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Binds a new trainer connection to this server and spawns its own task.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        let store = self.store.clone();
        let done = self.queue.sender();
        self.tasks
            .spawn(async move { connection::serve(id, rx, tx, store, done).await });
    }

    /// Blocks until every trainer has enqueued into the worker done queue.
    ///
    /// Connections must be bound beforehand through `spawn`. Dropping the
    /// returned future keeps the tokens counted so far.
    pub async fn run(&mut self) {
        while self.done < self.trainers {
            self.queue.dequeue().await;
            self.done += 1;
            info!("{} workers are already done", self.done);
        }

        info!("PS exits after all workers done");
    }

    /// Accepts trainers from `listener` until every one of them reported done.
    ///
    /// # Arguments
    /// * `listener` - The bound listener of this server's task address.
    ///
    /// # Returns
    /// An io error if accepting connections failed.
    pub async fn serve(mut self, listener: TcpListener) -> io::Result<()> {
        while self.done < self.trainers {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = accepted?;
                    debug!(conn = self.next_id; "trainer connected from {addr}");

                    let (rx, tx) = stream.into_split();
                    let (rx, tx) = comms::channel(rx, tx);
                    self.spawn(rx, tx);
                }
                _ = self.queue.dequeue() => {
                    self.done += 1;
                    info!("{} workers are already done", self.done);
                }
                Some(res) = self.tasks.join_next() => {
                    match res {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!("connection failed: {e}"),
                        Err(e) => warn!("connection task panicked: {e}"),
                    }
                }
            }
        }

        info!("PS exits after all workers done");
        self.tasks.shutdown().await;
        Ok(())
    }
}
