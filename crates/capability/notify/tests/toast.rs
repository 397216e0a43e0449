use domain::ToastSeverity;
use erp_notify::{ToastDefaults, ToastQueue};
use std::time::Duration;

/// 让定时器任务在暂停时钟推进后有机会运行。
async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn toast_is_removed_after_duration() {
    let toasts = ToastQueue::default();
    let id = toasts.show("saved", ToastSeverity::Success, 3000);

    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts.messages()[0].id, id);

    tokio::time::advance(Duration::from_millis(2999)).await;
    settle().await;
    assert_eq!(toasts.len(), 1);

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert!(toasts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn zero_duration_is_persistent() {
    let toasts = ToastQueue::default();
    let id = toasts.show("period closing in progress", ToastSeverity::Info, 0);

    tokio::time::advance(Duration::from_secs(3600)).await;
    settle().await;
    let messages = toasts.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_persistent());

    assert!(toasts.remove(&id));
    assert!(toasts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn remove_is_idempotent() {
    let toasts = ToastQueue::default();
    let id = toasts.show("deleted", ToastSeverity::Warning, 3000);

    assert!(toasts.remove(&id));
    assert!(!toasts.remove(&id));
    assert!(!toasts.remove("never-existed"));

    // 定时器已取消，到期后不应影响队列。
    let other = toasts.show("other", ToastSeverity::Info, 5000);
    tokio::time::advance(Duration::from_millis(3000)).await;
    settle().await;
    assert_eq!(toasts.messages()[0].id, other);
}

#[tokio::test(start_paused = true)]
async fn keeps_insertion_order_without_dedup() {
    let toasts = ToastQueue::default();
    toasts.show("same", ToastSeverity::Info, 0);
    toasts.show("same", ToastSeverity::Info, 0);
    toasts.show("third", ToastSeverity::Error, 0);

    let texts: Vec<String> = toasts.messages().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["same", "same", "third"]);
}

#[tokio::test(start_paused = true)]
async fn severity_helpers_use_defaults() {
    let toasts = ToastQueue::new(ToastDefaults {
        duration_ms: 1000,
        error_duration_ms: 4000,
    });
    toasts.success("ok");
    toasts.error("failed");
    toasts.warning("careful");
    toasts.info("fyi");

    let messages = toasts.messages();
    assert_eq!(messages[0].severity, ToastSeverity::Success);
    assert_eq!(messages[1].duration_ms, 4000);
    assert_eq!(messages[2].severity, ToastSeverity::Warning);
    assert_eq!(messages[3].duration_ms, 1000);

    tokio::time::advance(Duration::from_millis(1000)).await;
    settle().await;
    let remaining = toasts.messages();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].severity, ToastSeverity::Error);
}

#[tokio::test(start_paused = true)]
async fn shutdown_clears_messages_and_timers() {
    let toasts = ToastQueue::default();
    toasts.show("a", ToastSeverity::Info, 3000);
    toasts.show("b", ToastSeverity::Info, 0);
    toasts.shutdown();
    assert!(toasts.is_empty());

    tokio::time::advance(Duration::from_millis(3000)).await;
    settle().await;
    assert!(toasts.is_empty());
}

#[test]
fn show_outside_runtime_keeps_message() {
    let toasts = ToastQueue::default();
    toasts.show("offline", ToastSeverity::Warning, 3000);
    assert_eq!(toasts.len(), 1);
}
