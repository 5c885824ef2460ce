mod client;

pub use client::{ConnectOpts, PsClient, TcpPsClient};
