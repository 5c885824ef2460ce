use std::time::Duration;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::server::InitSpec,
};
use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time,
};

use crate::{Result, WorkerErr};

/// A `PsClient` over a tcp connection.
pub type TcpPsClient = PsClient<OwnedReadHalf, OwnedWriteHalf>;

/// How to reach a parameter server that may not be listening yet.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOpts {
    pub retries: usize,
    pub backoff: Duration,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            retries: 30,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Parameter Server client wrapper.
///
/// Every request waits for its reply before returning, a client holds at
/// most one request in flight.
pub struct PsClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    server: usize,
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    rx_buf: Vec<u32>,
}

impl TcpPsClient {
    /// Connects to the parameter server at `addr`, retrying while it refuses.
    ///
    /// # Arguments
    /// * `server` - The index of the parameter server in the cluster.
    /// * `addr` - The `host:port` address of the parameter server.
    /// * `opts` - The retry policy.
    ///
    /// # Returns
    /// A connected client or the last connection error.
    pub async fn connect(server: usize, addr: &str, opts: ConnectOpts) -> Result<Self> {
        let mut attempt = 0;

        let stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(e) if attempt < opts.retries => {
                    attempt += 1;
                    warn!(server = server, attempt = attempt; "failed to connect to {addr}: {e}");
                    time::sleep(opts.backoff).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        stream.set_nodelay(true)?;
        debug!(server = server; "connected to {addr}");

        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        Ok(Self::new(server, rx, tx))
    }
}

impl<R, W> PsClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `PsClient` over an established channel.
    ///
    /// # Arguments
    /// * `server` - The index of the parameter server, used in errors and logs.
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn new(server: usize, rx: OnoReceiver<R>, tx: OnoSender<W>) -> Self {
        Self {
            server,
            rx,
            tx,
            rx_buf: Vec::new(),
        }
    }

    pub fn server(&self) -> usize {
        self.server
    }

    /// Replaces the server's variables and step.
    ///
    /// # Returns
    /// The step the server now holds.
    pub async fn init(&mut self, spec: InitSpec) -> Result<u64> {
        self.tx.send(&Msg::Control(Command::Init(spec))).await?;

        match self.recv_control().await? {
            Command::Step { step } => Ok(step),
            _ => Err(self.unexpected("control")),
        }
    }

    /// Copies the server's variables into `dst`.
    ///
    /// # Arguments
    /// * `dst` - Exactly as long as the variables held by the server.
    ///
    /// # Returns
    /// `NotReady` if the chief hasn't initialized the server yet.
    pub async fn pull(&mut self, dst: &mut [f32]) -> Result<()> {
        let server = self.server;
        self.tx.send(&Msg::Control(Command::Pull)).await?;

        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Data(Payload::Params(params)) => {
                if params.len() != dst.len() {
                    return Err(WorkerErr::ParamsLengthMismatch {
                        server,
                        got: params.len(),
                        expected: dst.len(),
                    });
                }

                dst.copy_from_slice(params);
                Ok(())
            }
            Msg::Control(Command::NotReady) => Err(WorkerErr::NotReady { server }),
            Msg::Err(detail) => Err(WorkerErr::Server {
                server,
                detail: detail.into_owned(),
            }),
            other => Err(WorkerErr::UnexpectedMessage {
                server,
                got: other.kind(),
            }),
        }
    }

    /// Sends a gradient covering the server's variables.
    ///
    /// # Returns
    /// The server's step after applying it.
    pub async fn push(&mut self, grad: &[f32]) -> Result<u64> {
        self.tx.send(&Msg::Data(Payload::Grad(grad))).await?;

        match self.recv_control().await? {
            Command::Applied { step } => Ok(step),
            Command::NotReady => Err(WorkerErr::NotReady {
                server: self.server,
            }),
            _ => Err(self.unexpected("control")),
        }
    }

    /// Asks for the server's step.
    ///
    /// # Returns
    /// The step or `None` if the server is not initialized yet.
    pub async fn get_step(&mut self) -> Result<Option<u64>> {
        self.tx.send(&Msg::Control(Command::GetStep)).await?;

        match self.recv_control().await? {
            Command::Step { step } => Ok(Some(step)),
            Command::NotReady => Ok(None),
            _ => Err(self.unexpected("control")),
        }
    }

    /// Enqueues into the server's worker done queue, there is no reply.
    pub async fn done(&mut self) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Done)).await?;
        Ok(())
    }

    /// Ends the session with the server and closes the write half.
    pub async fn disconnect(mut self) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Disconnect)).await?;

        match self.recv_control().await? {
            Command::Disconnect => {}
            _ => return Err(self.unexpected("control")),
        }

        self.tx.shutdown().await?;
        Ok(())
    }

    async fn recv_control(&mut self) -> Result<Command> {
        let server = self.server;

        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Control(cmd) => Ok(cmd),
            Msg::Err(detail) => Err(WorkerErr::Server {
                server,
                detail: detail.into_owned(),
            }),
            other => Err(WorkerErr::UnexpectedMessage {
                server,
                got: other.kind(),
            }),
        }
    }

    fn unexpected(&self, got: &'static str) -> WorkerErr {
        WorkerErr::UnexpectedMessage {
            server: self.server,
            got,
        }
    }
}
