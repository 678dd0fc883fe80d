//! Generic pub/sub contract (spec §6 "Outbound integrations — Broker").
//! `pg-bus` provides the default in-process implementation used for Run
//! log streaming when no external broker is configured.

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

pub type BrokerStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Publish `payload` to `channel`, returning the number of live
    /// subscribers it was delivered to.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> usize;

    /// Subscribe to `channel`, receiving every payload published after
    /// this call.
    async fn subscribe(&self, channel: &str) -> BrokerStream;
}
