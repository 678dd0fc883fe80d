use super::*;
use fake::RecordingNotifier;

#[tokio::test]
async fn recording_notifier_captures_calls() {
    let notifier = RecordingNotifier::new();
    let run_id = RunId::new();
    notifier.notify_run_completed("user-1", run_id, RunStatus::Succeeded).await;
    let calls = notifier.notifications.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "user-1");
    assert_eq!(calls[0].1, run_id);
    assert_eq!(calls[0].2, RunStatus::Succeeded);
}
