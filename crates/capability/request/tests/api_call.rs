use api_contract::{ApiError, ErrorKind};
use domain::ToastSeverity;
use erp_cache::CacheManager;
use erp_loading::LoadingTracker;
use erp_notify::ToastQueue;
use erp_request::ApiCall;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn failure_sets_error_and_emits_one_toast() {
    let toasts = ToastQueue::default();
    let call: ApiCall<String> = ApiCall::new(toasts.clone());

    let err = call
        .execute(|| async { Err(ApiError::new(ErrorKind::Server, "boom")) })
        .await
        .expect_err("rejected");

    assert_eq!(err.message, "boom");
    assert!(!call.loading());
    assert_eq!(call.error_message().as_deref(), Some("boom"));
    assert!(call.data().is_none());
    let messages = toasts.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].severity, ToastSeverity::Error);
    assert_eq!(messages[0].text, "boom");
}

#[tokio::test(start_paused = true)]
async fn success_stores_data_and_clears_error() {
    let toasts = ToastQueue::default();
    let call: ApiCall<Vec<u32>> = ApiCall::new(toasts.clone());

    let _ = call
        .execute(|| async { Err(ApiError::network("offline")) })
        .await;
    assert!(call.error().is_some());

    let observer = call.clone();
    let rows = call
        .execute(|| async move {
            assert!(observer.loading());
            Ok(vec![1, 2])
        })
        .await
        .expect("rows");

    assert_eq!(rows, vec![1, 2]);
    assert_eq!(call.data(), Some(vec![1, 2]));
    assert!(call.error().is_none());
    assert!(!call.loading());
}

#[tokio::test(start_paused = true)]
async fn session_expiry_is_not_toasted() {
    let toasts = ToastQueue::default();
    let call: ApiCall<()> = ApiCall::new(toasts.clone());

    let err = call
        .execute(|| async { Err(ApiError::session_expired()) })
        .await
        .expect_err("expired");

    assert_eq!(err.kind, ErrorKind::SessionExpired);
    assert_eq!(call.error().map(|err| err.kind), Some(ErrorKind::SessionExpired));
    assert!(toasts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn older_response_does_not_overwrite_newer() {
    let call: ApiCall<&'static str> = ApiCall::new(ToastQueue::default());

    let slow = call.execute(|| async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok("old")
    });
    let fast = call.execute(|| async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok("new")
    });
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(slow.expect("slow"), "old");
    assert_eq!(fast.expect("fast"), "new");
    assert_eq!(call.data(), Some("new"));
    assert!(!call.loading());
}

#[tokio::test(start_paused = true)]
async fn stale_failure_still_notifies_but_keeps_state() {
    let toasts = ToastQueue::default();
    let call: ApiCall<u32> = ApiCall::new(toasts.clone());

    let slow = call.execute(|| async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Err(ApiError::network("timeout"))
    });
    let fast = call.execute(|| async { Ok(7) });
    let (slow, fast) = tokio::join!(slow, fast);

    assert!(slow.is_err());
    assert_eq!(fast.expect("fast"), 7);
    assert!(call.error().is_none());
    assert_eq!(call.data(), Some(7));
    assert_eq!(toasts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shared_tracker_uses_named_slot() {
    let tracker = LoadingTracker::new();
    let call: ApiCall<u32> =
        ApiCall::new(ToastQueue::default()).with_loading(tracker.clone(), Some("invoice-42"));

    let probe = tracker.clone();
    call.execute(|| async move {
        assert!(probe.is_loading(Some("invoice-42")));
        assert!(!probe.is_loading(None));
        Ok(1)
    })
    .await
    .expect("ok");

    assert!(!tracker.any_loading());
}

#[tokio::test(start_paused = true)]
async fn cached_execution_skips_operation_within_ttl() {
    let cache = CacheManager::new();
    let call: ApiCall<String> = ApiCall::new(ToastQueue::default()).with_cache(cache.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = calls.clone();
        let value = call
            .execute_cached("gl:accounts", Duration::from_millis(1000), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("chart".to_string())
            })
            .await
            .expect("value");
        assert_eq!(value, "chart");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get("gl:accounts").as_deref(), Some("chart"));

    call.reset();
    assert!(call.data().is_none());
}

#[tokio::test(start_paused = true)]
async fn cached_failure_is_not_stored() {
    let toasts = ToastQueue::default();
    let cache: CacheManager<String> = CacheManager::new();
    let call = ApiCall::new(toasts.clone()).with_cache(cache.clone());

    let err = call
        .execute_cached("tax:rates", Duration::from_secs(60), || async {
            Err(ApiError::new(ErrorKind::Server, "boom"))
        })
        .await
        .expect_err("fails");
    assert_eq!(err.message, "boom");
    assert!(cache.is_empty());
    assert_eq!(toasts.len(), 1);
}
