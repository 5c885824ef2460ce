use comms::specs::server::InitSpec;
use log::debug;
use machine_learning::{LinearRegression, model::NUM_PARAMS};
use tokio::io::{AsyncRead, AsyncWrite};

use super::Session;
use crate::{Result, WorkerErr, net::PsClient, placement::Placement};

/// A session whose variables live on the parameter servers.
///
/// Every train step pulls the variables from every server, computes the
/// gradient locally and pushes each server the slice of the gradient that
/// covers its variables. The global step is the one reported by server 0.
pub struct RemoteSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    clients: Vec<PsClient<R, W>>,
    placement: Placement,
    params: Vec<f32>,
    grad: Vec<f32>,
    parts: Vec<Vec<f32>>,
    part_grad: Vec<f32>,
    step: u64,
}

impl<R, W> RemoteSession<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a new `RemoteSession`.
    ///
    /// # Arguments
    /// * `clients` - One client per parameter server, ordered by server index.
    ///
    /// # Returns
    /// A new `RemoteSession` instance.
    pub fn new(clients: Vec<PsClient<R, W>>) -> Self {
        let placement = Placement::new(NUM_PARAMS, clients.len());
        let parts = (0..placement.num_servers())
            .map(|server| vec![0.; placement.shard(server).len()])
            .collect();

        Self {
            clients,
            placement,
            params: vec![0.; NUM_PARAMS],
            grad: vec![0.; NUM_PARAMS],
            parts,
            part_grad: Vec::new(),
            step: 0,
        }
    }

    /// The global step seen by the last train step or evaluation.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Sends every server its slice of `params` together with `step`.
    ///
    /// # Arguments
    /// * `step` - The global step to start from.
    /// * `params` - The full variables, `[weight, bias]`.
    pub async fn init(&mut self, step: u64, params: &[f32]) -> Result<()> {
        LinearRegression::new(params)?;

        for client in &mut self.clients {
            let server = client.server();
            self.placement.scatter(server, params, &mut self.part_grad);

            let spec = InitSpec {
                step,
                params: self.part_grad.clone(),
            };
            client.init(spec).await?;
            debug!(server = server; "initialized");
        }

        self.params.copy_from_slice(params);
        self.step = step;
        Ok(())
    }

    /// Checks whether every server was initialized by the chief.
    ///
    /// # Returns
    /// The global step once every server is ready, `None` otherwise.
    pub async fn ready_step(&mut self) -> Result<Option<u64>> {
        let mut global = None;

        for client in &mut self.clients {
            match client.get_step().await? {
                Some(step) if client.server() == 0 => global = Some(step),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        Ok(global)
    }

    /// Pulls the variables and the global step.
    pub async fn snapshot(&mut self) -> Result<(u64, Vec<f32>)> {
        self.pull_all().await?;
        let step = self.global_step().await?;
        Ok((step, self.params.clone()))
    }

    /// Enqueues into every server's worker done queue.
    pub async fn done(&mut self) -> Result<()> {
        for client in &mut self.clients {
            client.done().await?;
        }

        Ok(())
    }

    /// Disconnects from every server.
    pub async fn close(self) -> Result<()> {
        for client in self.clients {
            client.disconnect().await?;
        }

        Ok(())
    }

    async fn pull_all(&mut self) -> Result<()> {
        let Self {
            clients,
            placement,
            params,
            parts,
            ..
        } = self;

        for (client, part) in clients.iter_mut().zip(parts.iter_mut()) {
            client.pull(part).await?;
            placement.gather(client.server(), part, params);
        }

        Ok(())
    }

    async fn global_step(&mut self) -> Result<u64> {
        let chief_server = self
            .clients
            .first_mut()
            .ok_or(WorkerErr::NotReady { server: 0 })?;

        chief_server
            .get_step()
            .await?
            .ok_or(WorkerErr::NotReady { server: 0 })
    }
}

impl<R, W> Session for RemoteSession<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn train_step(&mut self, x: f32, y: f32) -> Result<()> {
        self.pull_all().await?;
        LinearRegression::new(&self.params)?.gradient(x, y, &mut self.grad)?;

        for client in &mut self.clients {
            let server = client.server();
            if self.placement.shard(server).is_empty() {
                continue;
            }

            self.placement.scatter(server, &self.grad, &mut self.part_grad);
            let step = client.push(&self.part_grad).await?;
            if server == 0 {
                self.step = step;
            }
        }

        Ok(())
    }

    async fn evaluate(&mut self, x: f32, y: f32) -> Result<(f32, u64)> {
        self.pull_all().await?;
        let loss = LinearRegression::new(&self.params)?.loss(x, y);
        let step = self.global_step().await?;
        self.step = step;
        Ok((loss, step))
    }

    async fn params(&mut self) -> Result<Vec<f32>> {
        self.pull_all().await?;
        Ok(self.params.clone())
    }
}
