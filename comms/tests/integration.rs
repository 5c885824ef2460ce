use std::borrow::Cow;

use comms::{
    msg::{Command, Msg, Payload},
    specs::server::InitSpec,
};
use tokio::io;

#[tokio::test]
async fn send_recv_every_kind() -> io::Result<()> {
    const SIZE: usize = 1024;

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, peer_tx);

    let spec = InitSpec {
        step: 3,
        params: vec![0.5, -1.0],
    };
    let init = Msg::Control(Command::Init(spec.clone()));
    let params = [1.0, 2.0];
    let grad = [-0.25];

    tx.send(&init).await?;
    tx.send(&Msg::Data(Payload::Params(&params))).await?;
    tx.send(&Msg::Data(Payload::Grad(&grad))).await?;
    tx.send(&Msg::Err(Cow::Borrowed("boom"))).await?;

    let mut buf: Vec<u32> = Vec::new();

    let msg: Msg = rx.recv_into(&mut buf).await?;
    assert_eq!(msg, Msg::Control(Command::Init(spec)));

    let msg: Msg = rx.recv_into(&mut buf).await?;
    assert_eq!(msg, Msg::Data(Payload::Params(&params)));

    let msg: Msg = rx.recv_into(&mut buf).await?;
    assert_eq!(msg, Msg::Data(Payload::Grad(&grad)));

    let msg: Msg = rx.recv_into(&mut buf).await?;
    assert_eq!(msg, Msg::Err(Cow::Borrowed("boom")));

    Ok(())
}

#[tokio::test]
async fn closed_stream_is_unexpected_eof() {
    let (one, two) = io::duplex(64);
    drop(one);

    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let mut buf: Vec<u32> = Vec::new();
    let err = rx.recv_into::<Msg, _>(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}
