//! Integration tests for the navigation controller.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{TestHarness, ROOT};
use parking_lot::Mutex;
use slidequeue::breaker::NotFoundBreaker;
use slidequeue::config::ProviderMode;
use slidequeue::navigation::Position;
use slidequeue::provider::ProviderState;
use slidequeue::queue::{ScanSession, ScanState};
use slidequeue::registry::ParkedSession;
use slidequeue_common::{Error, MutationAction};

/// Scan session handed back by a detached random-mode controller.
fn parked_session(parked: Option<ParkedSession>) -> Arc<Mutex<ScanSession>> {
    match parked.and_then(|p| p.provider) {
        Some(ProviderState::Random(session)) => session,
        other => panic!("expected a parked random session, got {other:?}"),
    }
}

#[tokio::test]
async fn next_previous_next_is_idempotent() {
    let h = TestHarness::new().with_tree(4, 10);
    let mut nav = h.ready_controller().await;

    let mut shown = Vec::new();
    for _ in 0..5 {
        shown.push(nav.next().await.unwrap().id);
    }
    let before = nav.current_position();
    nav.previous().unwrap();
    assert_eq!(nav.next().await.unwrap().id, shown[4]);
    assert_eq!(nav.current_position(), before);
}

#[tokio::test]
async fn window_never_holds_duplicates() {
    let h = TestHarness::new().with_tree(2, 6);
    let mut nav = h.ready_controller().await;
    for _ in 0..40 {
        nav.next().await.unwrap();
        let mut ids: Vec<&str> = nav.window().items().map(|i| i.id.as_str()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        let position = nav.current_position();
        assert!(position.index.is_some_and(|i| i < position.total));
    }
}

#[tokio::test]
async fn reconnection_resumes_at_same_index() {
    let h = TestHarness::new().with_tree(1, 3);
    let mut nav = h.ready_controller().await;
    let a = nav.next().await.unwrap();
    let b = nav.next().await.unwrap();
    nav.next().await.unwrap();
    assert_eq!(nav.previous().unwrap().id, b.id);
    nav.detach().await;

    let mut resumed = h.reattach();
    assert!(resumed.initialize().await.unwrap());
    assert_eq!(resumed.current_position(), Position { index: Some(1), total: 3 });
    assert_eq!(resumed.current().unwrap().id, b.id);
    assert_eq!(resumed.previous().unwrap().id, a.id);
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn reattach_without_parked_session_starts_fresh() {
    let h = TestHarness::new().with_tree(1, 3);
    let mut nav = h.reattach();
    assert!(nav.initialize().await.unwrap());
    assert_eq!(nav.current_position(), Position { index: None, total: 0 });
}

#[tokio::test]
async fn parked_session_is_not_rescanned() {
    let h = TestHarness::new().with_tree(3, 5);
    let mut nav = h.ready_controller().await;
    nav.next().await.unwrap();
    nav.detach().await;
    let browse_calls = h.source.browse_calls();

    let mut resumed = h.reattach();
    assert!(resumed.initialize().await.unwrap());
    resumed.next().await.unwrap();
    assert_eq!(h.source.browse_calls(), browse_calls);
}

#[tokio::test]
async fn empty_root_never_panics() {
    let h = TestHarness::new();
    let mut nav = h.controller();
    assert!(!nav.initialize().await.unwrap());
    assert!(nav.next().await.is_none());
    assert!(nav.previous().is_none());
    assert_eq!(nav.current_position(), Position::default());
    assert!(nav.mutate_current(MutationAction::Favorite).await.is_err());
}

#[tokio::test]
async fn missing_root_is_not_ready() {
    let mut h = TestHarness::new();
    h.config.engine.root = Some("elsewhere".into());
    let mut nav = h.controller();
    assert!(!nav.initialize().await.unwrap());
    assert!(nav.next().await.is_none());
}

#[test]
fn unset_root_is_a_configuration_error() {
    let mut h = TestHarness::new();
    h.config.engine.root = None;
    let result = slidequeue::navigation::NavigationController::new(
        h.engine(),
        h.source.clone(),
        h.registry.clone(),
    );
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn deleting_everything_empties_the_window() {
    let h = TestHarness::new().with_tree(1, 2);
    let mut nav = h.ready_controller().await;
    nav.next().await.unwrap();
    nav.mutate_current(MutationAction::Delete).await.unwrap();
    nav.next().await.unwrap();
    nav.mutate_current(MutationAction::Delete).await.unwrap();
    assert_eq!(h.source.item_count(), 0);
    assert!(nav.next().await.is_none());
    assert_eq!(nav.current_position(), Position::default());
}

#[tokio::test]
async fn not_found_burst_removes_item() {
    let h = TestHarness::new().with_tree(1, 4);
    let mut nav = h.ready_controller().await;
    let item = nav.next().await.unwrap();

    assert!(!nav.report_not_found(&item.id).await);
    assert!(!nav.report_not_found(&item.id).await);
    assert!(nav.report_not_found(&item.id).await);
    assert!(!nav.window().contains(&item.id));

    // excluded at the provider as well
    for _ in 0..10 {
        let next = nav.next().await.unwrap();
        assert_ne!(next.id, item.id);
    }
}

#[test]
fn breaker_counts_only_inside_window() {
    let mut breaker = NotFoundBreaker::new(3, Duration::from_secs(10));
    let start = Instant::now();
    let id = format!("{ROOT}/a.jpg");

    assert!(!breaker.record_at(&id, start));
    assert!(!breaker.record_at(&id, start + Duration::from_secs(4)));
    assert!(breaker.record_at(&id, start + Duration::from_secs(9)));

    let other = format!("{ROOT}/b.jpg");
    assert!(!breaker.record_at(&other, start));
    assert!(!breaker.record_at(&other, start + Duration::from_secs(20)));
    assert!(!breaker.record_at(&other, start + Duration::from_secs(40)));
}

#[tokio::test]
async fn single_mode_shows_one_item() {
    let mut h = TestHarness::with_mode(ProviderMode::Single);
    h.source.add_images(ROOT, "img", 3);
    h.config.engine.root = Some(format!("{ROOT}/img00002.jpg"));
    let mut nav = h.ready_controller().await;
    for _ in 0..3 {
        assert_eq!(nav.next().await.unwrap().id, format!("{ROOT}/img00002.jpg"));
    }
}

#[tokio::test]
async fn pause_and_resume_signal() {
    let h = TestHarness::new().with_tree(2, 3);
    let mut nav = h.ready_controller().await;
    nav.on_pause_signal_changed(true).await;
    assert!(nav.next().await.is_some());
    nav.on_pause_signal_changed(false).await;
    assert!(nav.next().await.is_some());
}

#[tokio::test]
async fn single_not_found_excludes_at_provider() {
    let h = TestHarness::new();
    h.source.add_images(ROOT, "img", 5);
    let mut nav = h.ready_controller().await;
    let item = nav.next().await.unwrap();
    h.source.mark_missing(&item.id);

    let err = nav.resolve_current(Duration::from_secs(60)).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(nav.window().contains(&item.id), "one miss does not trip the breaker");

    nav.detach().await;
    let session = parked_session(h.registry.reattach(ROOT));
    assert!(session.lock().is_excluded(&item.id));
}

#[tokio::test]
async fn favorite_excludes_at_provider() {
    let h = TestHarness::new();
    h.source.add_images(ROOT, "img", 5);
    let mut nav = h.ready_controller().await;
    let item = nav.next().await.unwrap();

    nav.mutate_current(MutationAction::Favorite).await.unwrap();
    assert!(nav.current().unwrap().favorite);

    nav.detach().await;
    let session = parked_session(h.registry.reattach(ROOT));
    assert!(session.lock().is_excluded(&item.id));
}

#[tokio::test]
async fn resolve_while_paused_is_interrupted() {
    let h = TestHarness::new().with_tree(1, 3);
    let mut nav = h.ready_controller().await;
    let item = nav.next().await.unwrap();
    h.source.mark_missing(&item.id);

    nav.on_pause_signal_changed(true).await;
    for _ in 0..3 {
        let err = nav.resolve_current(Duration::from_secs(60)).await.unwrap_err();
        assert!(err.is_interrupted());
    }
    // nothing reached the source, so nothing was counted
    assert!(nav.window().contains(&item.id));
}

#[tokio::test(start_paused = true)]
async fn pause_handle_parks_running_scan() {
    let h = TestHarness::new().with_tree(6, 3);
    for f in 0..6 {
        h.source.delay_browse(&format!("{ROOT}/album{f:03}"), Duration::from_millis(100));
    }
    let mut nav = h.controller();
    let pause = nav.pause_handle();

    let init = tokio::spawn(async move {
        let ready = nav.initialize().await;
        (nav, ready)
    });

    // the first batch is listed and the second is in flight
    tokio::time::sleep(Duration::from_millis(150)).await;
    pause.set_paused(true).await;
    let (mut nav, ready) = init.await.unwrap();
    assert!(ready.unwrap(), "what was found before the pause is served");
    assert!(h.registry.contains(ROOT), "paused scan parks itself");
    assert!(nav.next().await.is_some());

    pause.set_paused(false).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!h.registry.contains(ROOT));

    nav.detach().await;
    let session = parked_session(h.registry.reattach(ROOT));
    let session = session.lock();
    assert_eq!(session.state(), ScanState::Completed);
    assert_eq!(session.known_len(), 18);
}

#[tokio::test]
async fn pause_before_any_media_waits_for_resume() {
    let h = TestHarness::new().with_tree(2, 3);
    let mut nav = h.controller();
    let pause = nav.pause_handle();
    pause.set_paused(true).await;

    let init = tokio::spawn(async move { nav.initialize().await });
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
    assert!(!init.is_finished(), "a pause is not an empty root");
    assert!(h.registry.contains(ROOT));

    pause.set_paused(false).await;
    assert!(init.await.unwrap().unwrap());
    assert!(!h.registry.contains(ROOT));
}
