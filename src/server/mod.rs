//! Connection acceptance and dispatch.

pub mod listener;

pub use listener::Server;
