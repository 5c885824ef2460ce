use std::{borrow::Cow, io};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{ParameterStore, StoreErr, synchronization::DoneSender};

/// Serves a single trainer connection until it disconnects or closes the stream.
///
/// # Arguments
/// * `id` - Identifier of the connection, used for observability.
/// * `rx` - The receiving end of the communication.
/// * `tx` - The sending end of the communication.
/// * `store` - The server's variables.
/// * `done` - The enqueueing end of the worker done queue.
///
/// # Returns
/// An io error if the connection broke in the middle of a message.
pub(super) async fn serve<R, W>(
    id: usize,
    mut rx: OnoReceiver<R>,
    mut tx: OnoSender<W>,
    store: ParameterStore,
    done: DoneSender,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut rx_buf: Vec<u32> = Vec::new();
    let mut params = Vec::new();

    loop {
        let msg = match rx.recv_into(&mut rx_buf).await {
            Ok(msg) => msg,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!(conn = id; "connection closed");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match msg {
            Msg::Control(Command::Init(spec)) => {
                debug!(conn = id, step = spec.step, params = spec.params.len(); "initializing store");
                let step = spec.step;
                store.init(spec);
                tx.send(&Msg::Control(Command::Step { step })).await?;
            }
            Msg::Control(Command::Pull) => match store.pull(&mut params) {
                Ok(_) => tx.send(&Msg::Data(Payload::Params(&params))).await?,
                Err(e) => tx.send(&store_err_msg(e)).await?,
            },
            Msg::Data(Payload::Grad(grad)) => match store.apply(grad) {
                Ok(step) => tx.send(&Msg::Control(Command::Applied { step })).await?,
                Err(e) => {
                    warn!(conn = id; "rejected gradient: {e}");
                    tx.send(&store_err_msg(e)).await?;
                }
            },
            Msg::Control(Command::GetStep) => match store.step() {
                Ok(step) => tx.send(&Msg::Control(Command::Step { step })).await?,
                Err(e) => tx.send(&store_err_msg(e)).await?,
            },
            Msg::Control(Command::Done) => {
                debug!(conn = id; "trainer done");
                if !done.enqueue().await {
                    warn!(conn = id; "worker done queue is closed");
                }
            }
            Msg::Control(Command::Disconnect) => {
                debug!(conn = id; "disconnecting");
                tx.send(&Msg::Control(Command::Disconnect)).await?;
                return Ok(());
            }
            other => {
                let text = format!("unexpected message kind {}", other.kind());
                warn!(conn = id; "{text}");
                tx.send(&Msg::Err(Cow::Owned(text))).await?;
            }
        }
    }
}

/// Maps a store error onto the reply the trainer expects.
fn store_err_msg(e: StoreErr) -> Msg<'static> {
    match e {
        StoreErr::NotInitialized => Msg::Control(Command::NotReady),
        e => Msg::Err(Cow::Owned(e.to_string())),
    }
}
