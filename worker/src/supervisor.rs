//! Managed sessions for the trainers of a cluster.
//!
//! The chief initializes (or restores) the parameter servers and keeps
//! checkpointing them while training, the rest of the trainers wait until the
//! servers are ready.

use std::{path::PathBuf, time::Duration};

use log::{debug, info, warn};
use machine_learning::model::NUM_PARAMS;
use tokio::{sync::oneshot, task::JoinHandle, time};

use crate::{
    Result,
    checkpoint::Saver,
    net::{ConnectOpts, TcpPsClient},
    session::{RemoteSession, TcpSession},
};

/// The default period between two background checkpoints.
pub const SAVE_MODEL_SECS: u64 = 60;

/// The configuration of a `Supervisor`.
#[derive(Debug, Clone)]
pub struct SupervisorOpts {
    pub is_chief: bool,
    pub checkpoint_dir: PathBuf,
    pub save_interval: Duration,
    pub recovery_wait: Duration,
    pub connect: ConnectOpts,
}

impl SupervisorOpts {
    pub fn new(is_chief: bool, checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            is_chief,
            checkpoint_dir: checkpoint_dir.into(),
            save_interval: Duration::from_secs(SAVE_MODEL_SECS),
            recovery_wait: Duration::from_secs(1),
            connect: ConnectOpts::default(),
        }
    }
}

/// Prepares sessions against the parameter servers of a cluster.
pub struct Supervisor {
    opts: SupervisorOpts,
    ps_addrs: Vec<String>,
}

impl Supervisor {
    /// Creates a new `Supervisor`.
    ///
    /// # Arguments
    /// * `opts` - The supervisor's configuration.
    /// * `ps_addrs` - The parameter server addresses, ordered by task index.
    ///
    /// # Returns
    /// A new `Supervisor` instance.
    pub fn new(opts: SupervisorOpts, ps_addrs: Vec<String>) -> Self {
        Self { opts, ps_addrs }
    }

    /// Opens a session whose parameter servers are initialized.
    ///
    /// The chief restores the latest checkpoint, or starts from zeros at step
    /// 0, and starts the background saver. Any other trainer polls every
    /// `recovery_wait` until every server was initialized.
    ///
    /// # Returns
    /// The managed session or a connection or checkpoint error.
    pub async fn managed_session(&self) -> Result<ManagedSession> {
        let mut session = RemoteSession::new(self.connect_all().await?);

        if !self.opts.is_chief {
            self.wait_ready(&mut session).await?;
            return Ok(ManagedSession {
                session,
                saver: None,
                background: None,
            });
        }

        let saver = Saver::new(&self.opts.checkpoint_dir);
        let (step, params) = match saver.restore_latest()? {
            Some(checkpoint) => {
                info!(
                    "Restoring parameters from checkpoint at step {}",
                    checkpoint.step
                );
                (checkpoint.step, checkpoint.params)
            }
            None => (0, vec![0.; NUM_PARAMS]),
        };

        session.init(step, &params).await?;

        let background = self.spawn_saver(saver.clone()).await?;
        Ok(ManagedSession {
            session,
            saver: Some(saver),
            background: Some(background),
        })
    }

    async fn connect_all(&self) -> Result<Vec<TcpPsClient>> {
        let mut clients = Vec::with_capacity(self.ps_addrs.len());

        for (server, addr) in self.ps_addrs.iter().enumerate() {
            clients.push(TcpPsClient::connect(server, addr, self.opts.connect).await?);
        }

        Ok(clients)
    }

    async fn wait_ready(&self, session: &mut TcpSession) -> Result<()> {
        loop {
            match session.ready_step().await? {
                Some(step) => {
                    debug!(step = step; "parameter servers are ready");
                    return Ok(());
                }
                None => {
                    info!("Waiting for the chief to initialize the parameter servers");
                    time::sleep(self.opts.recovery_wait).await;
                }
            }
        }
    }

    /// Starts the periodic checkpoint task over its own connections.
    async fn spawn_saver(&self, saver: Saver) -> Result<BackgroundSaver> {
        let mut session = RemoteSession::new(self.connect_all().await?);
        let interval = self.opts.save_interval;
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let saved = match session.snapshot().await {
                            Ok((step, params)) => {
                                saver.save_blocking(step, params).await.map(|_| ())
                            }
                            Err(e) => Err(e),
                        };

                        if let Err(e) = saved {
                            warn!("background checkpoint failed: {e}");
                        }
                    }
                    _ = &mut stop_rx => break,
                }
            }

            if let Err(e) = session.close().await {
                debug!("closing the checkpoint connections failed: {e}");
            }
        });

        Ok(BackgroundSaver { stop_tx, handle })
    }
}

struct BackgroundSaver {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A session prepared by a `Supervisor`.
///
/// Dropping it without `finish` stops the background saver without a final
/// checkpoint.
pub struct ManagedSession {
    session: TcpSession,
    saver: Option<Saver>,
    background: Option<BackgroundSaver>,
}

impl ManagedSession {
    pub fn session(&mut self) -> &mut TcpSession {
        &mut self.session
    }

    /// Ends the session of a trainer that finished training.
    ///
    /// Stops the background saver, lets the chief write a final checkpoint,
    /// and enqueues into the worker done queue of every parameter server.
    ///
    /// # Returns
    /// The final global step and variables.
    pub async fn finish(mut self) -> Result<(u64, Vec<f32>)> {
        if let Some(BackgroundSaver { stop_tx, handle }) = self.background.take() {
            let _ = stop_tx.send(());
            if let Err(e) = handle.await {
                warn!("background saver panicked: {e}");
            }
        }

        let (step, params) = self.session.snapshot().await?;
        if let Some(saver) = &self.saver {
            saver.save_blocking(step, params.clone()).await?;
        }

        info!("Enqueue the data to queue to notify ps");
        self.session.done().await?;

        // The servers may exit as soon as the last trainer is done.
        if let Err(e) = self.session.close().await {
            debug!("disconnecting from the parameter servers failed: {e}");
        }

        Ok((step, params))
    }
}
