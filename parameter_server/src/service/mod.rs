mod connection;
mod pserver;

pub use pserver::ParameterServer;
