use std::time::Duration;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::server::InitSpec,
};
use machine_learning::optimization::OptimizerSpec;
use tokio::{
    io::{self, AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf},
    net::{TcpListener, TcpStream},
    time,
};

use crate::ParameterServer;

type Chan = (
    OnoReceiver<ReadHalf<DuplexStream>>,
    OnoSender<WriteHalf<DuplexStream>>,
);

fn channel_pair() -> (Chan, Chan) {
    let (stream1, stream2) = io::duplex(4096);
    let (rx1, tx1) = io::split(stream1);
    let (rx2, tx2) = io::split(stream2);
    let chan1 = comms::channel(rx1, tx1);
    let chan2 = comms::channel(rx2, tx2);
    (chan1, chan2)
}

fn sgd(learning_rate: f32) -> OptimizerSpec {
    OptimizerSpec::from_name("sgd", learning_rate).unwrap()
}

async fn request<R, W>(
    rx: &mut OnoReceiver<R>,
    tx: &mut OnoSender<W>,
    msg: Msg<'_>,
) -> io::Result<Command>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tx.send(&msg).await?;

    let mut rx_buf: Vec<u32> = Vec::new();
    match rx.recv_into(&mut rx_buf).await? {
        Msg::Control(cmd) => Ok(cmd),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn pull_before_init_is_not_ready() -> io::Result<()> {
    let ((mut rx, mut tx), (sv_rx, sv_tx)) = channel_pair();

    let mut server = ParameterServer::new(sgd(0.1), 1);
    server.spawn(sv_rx, sv_tx);

    let reply = request(&mut rx, &mut tx, Msg::Control(Command::Pull)).await?;
    assert_eq!(reply, Command::NotReady);

    let grad = [1.0];
    let reply = request(&mut rx, &mut tx, Msg::Data(Payload::Grad(&grad))).await?;
    assert_eq!(reply, Command::NotReady);
    Ok(())
}

#[tokio::test]
async fn trainer_round_trip() -> io::Result<()> {
    let ((mut rx, mut tx), (sv_rx, sv_tx)) = channel_pair();

    let mut server = ParameterServer::new(sgd(0.5), 1);
    server.spawn(sv_rx, sv_tx);

    let init = InitSpec {
        step: 0,
        params: vec![1.0, 1.0],
    };
    let reply = request(&mut rx, &mut tx, Msg::Control(Command::Init(init))).await?;
    assert_eq!(reply, Command::Step { step: 0 });

    let grad = [2.0, -2.0];
    let reply = request(&mut rx, &mut tx, Msg::Data(Payload::Grad(&grad))).await?;
    assert_eq!(reply, Command::Applied { step: 1 });

    tx.send(&Msg::Control(Command::Pull)).await?;
    let mut rx_buf: Vec<u32> = Vec::new();
    match rx.recv_into(&mut rx_buf).await? {
        Msg::Data(Payload::Params(params)) => assert_eq!(params, [0.0, 2.0]),
        other => panic!("unexpected message: {other:?}"),
    }

    let reply = request(&mut rx, &mut tx, Msg::Control(Command::GetStep)).await?;
    assert_eq!(reply, Command::Step { step: 1 });

    tx.send(&Msg::Control(Command::Done)).await?;
    time::timeout(Duration::from_secs(5), server.run())
        .await
        .expect("server should stop once the trainer is done");

    let reply = request(&mut rx, &mut tx, Msg::Control(Command::Disconnect)).await?;
    assert_eq!(reply, Command::Disconnect);
    Ok(())
}

#[tokio::test]
async fn size_mismatch_is_reported_as_error() -> io::Result<()> {
    let ((mut rx, mut tx), (sv_rx, sv_tx)) = channel_pair();

    let mut server = ParameterServer::new(sgd(0.5), 1);
    server.spawn(sv_rx, sv_tx);

    let init = InitSpec {
        step: 0,
        params: vec![0.0],
    };
    request(&mut rx, &mut tx, Msg::Control(Command::Init(init))).await?;

    let grad = [1.0, 2.0];
    tx.send(&Msg::Data(Payload::Grad(&grad))).await?;

    let mut rx_buf: Vec<u32> = Vec::new();
    let msg: Msg = rx.recv_into(&mut rx_buf).await?;
    assert!(matches!(msg, Msg::Err(_)));

    assert_eq!(server.store().step(), Ok(0));
    Ok(())
}

#[tokio::test]
async fn run_waits_for_every_trainer() -> io::Result<()> {
    let ((_rx1, mut tx1), (sv_rx1, sv_tx1)) = channel_pair();
    let ((_rx2, mut tx2), (sv_rx2, sv_tx2)) = channel_pair();

    let mut server = ParameterServer::new(sgd(0.5), 2);
    server.spawn(sv_rx1, sv_tx1);
    server.spawn(sv_rx2, sv_tx2);

    tx1.send(&Msg::Control(Command::Done)).await?;
    let early = time::timeout(Duration::from_millis(100), server.run()).await;
    assert!(early.is_err(), "one done token must not be enough");

    tx2.send(&Msg::Control(Command::Done)).await?;
    time::timeout(Duration::from_secs(5), server.run())
        .await
        .expect("server should stop once both trainers are done");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serve_over_tcp_returns_after_done() -> io::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = ParameterServer::new(sgd(0.5), 1);
    let handle = tokio::spawn(server.serve(listener));

    let stream = TcpStream::connect(addr).await?;
    let (rx, tx) = stream.into_split();
    let (mut rx, mut tx) = comms::channel(rx, tx);

    let init = InitSpec {
        step: 3,
        params: vec![0.0, 0.0],
    };
    let reply = request(&mut rx, &mut tx, Msg::Control(Command::Init(init))).await?;
    assert_eq!(reply, Command::Step { step: 3 });

    tx.send(&Msg::Control(Command::Done)).await?;

    time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop")
        .expect("server task panicked")?;
    Ok(())
}
