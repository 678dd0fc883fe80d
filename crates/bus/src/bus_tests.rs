use super::*;
use chrono::Utc;
use tokio_stream::StreamExt;

#[tokio::test]
async fn subscriber_receives_published_entries_in_order() {
    let bus = LogBus::new();
    let run_id = RunId::new();
    let mut stream = Box::pin(bus.subscribe(run_id));

    bus.publish(LogEntry::chunk(run_id, "line 1", Utc::now()));
    bus.publish(LogEntry::chunk(run_id, "line 2", Utc::now()));
    bus.publish(LogEntry::completion(run_id, Utc::now()));

    let first = stream.next().await.unwrap();
    assert_eq!(first.content, "line 1");
    let second = stream.next().await.unwrap();
    assert_eq!(second.content, "line 2");
    let third = stream.next().await.unwrap();
    assert!(third.is_complete);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn publish_with_no_subscribers_returns_zero() {
    let bus = LogBus::new();
    let run_id = RunId::new();
    let delivered = bus.publish(LogEntry::chunk(run_id, "nobody home", Utc::now()));
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn publish_counts_multiple_subscribers() {
    let bus = LogBus::new();
    let run_id = RunId::new();
    let _s1 = bus.subscribe(run_id);
    let _s2 = bus.subscribe(run_id);
    let delivered = bus.publish(LogEntry::chunk(run_id, "fan out", Utc::now()));
    assert_eq!(delivered, 2);
}

#[tokio::test]
async fn distinct_runs_do_not_cross_talk() {
    let bus = LogBus::new();
    let run_a = RunId::new();
    let run_b = RunId::new();
    let mut stream_a = Box::pin(bus.subscribe(run_a));
    let _stream_b = bus.subscribe(run_b);

    bus.publish(LogEntry::chunk(run_b, "for b", Utc::now()));
    bus.publish(LogEntry::completion(run_a, Utc::now()));

    let entry = stream_a.next().await.unwrap();
    assert_eq!(entry.run_id, run_a);
    assert!(entry.is_complete);
}
