//! `LogBus`: the default in-process pub/sub plane for Run log streaming
//! (spec §4.5, C5), a broadcast-style event bus scoped to per-run topics.
//!
//! Each run gets its own [`tokio::sync::broadcast`] channel, created
//! lazily on first publish or subscribe. A slow subscriber that falls
//! behind the channel's capacity drops its oldest unread entries
//! (`broadcast`'s native lag behaviour) rather than blocking the
//! publisher — publishing must never stall on a stuck subscriber.
//! `isComplete=true` is published exactly once per run and the topic is
//! torn down immediately after, per the "terminates streams on
//! completion" contract.

use crate::entry::LogEntry;
use parking_lot::Mutex;
use pg_core::RunId;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

const TOPIC_CAPACITY: usize = 256;

#[derive(Default)]
pub struct LogBus {
    topics: Mutex<HashMap<RunId, broadcast::Sender<LogEntry>>>,
}

impl LogBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic(&self, run_id: RunId) -> broadcast::Sender<LogEntry> {
        let mut topics = self.topics.lock();
        topics
            .entry(run_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    /// Publish a log entry for `run_id`, returning the number of live
    /// subscribers it was delivered to. If `entry.is_complete`, the topic
    /// is removed immediately after sending so no further publishes or
    /// subscriptions can observe it.
    pub fn publish(&self, entry: LogEntry) -> usize {
        let run_id = entry.run_id;
        let is_complete = entry.is_complete;
        let sender = self.topic(run_id);
        let subscriber_count = sender.send(entry).unwrap_or(0);
        if is_complete {
            self.topics.lock().remove(&run_id);
        }
        subscriber_count
    }

    /// Subscribe to `run_id`'s topic. The returned stream yields entries
    /// published after this call (no replay of history) and ends shortly
    /// after yielding an `isComplete=true` entry, on broker disconnect, or
    /// when dropped by the caller.
    pub fn subscribe(&self, run_id: RunId) -> impl Stream<Item = LogEntry> {
        let receiver = self.topic(run_id).subscribe();
        BroadcastStream::new(receiver)
            .take_while(Result::is_ok)
            .filter_map(Result::ok)
            .scan(false, |already_complete, entry| {
                if *already_complete {
                    return None;
                }
                *already_complete = entry.is_complete;
                Some(entry)
            })
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
