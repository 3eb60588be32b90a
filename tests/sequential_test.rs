//! Integration tests for sequential (cursor-paginated) mode.

mod common;

use std::sync::Arc;

use common::{dated, TestHarness};
use slidequeue::config::ProviderMode;
use slidequeue::navigation::Position;
use slidequeue::provider::{Provider, ProviderStep};
use slidequeue::sequential::SequentialCursorProvider;
use slidequeue::signal::ScanSignal;
use slidequeue_common::OrderBy;

fn sequential_harness(count: u32) -> TestHarness {
    let mut h = TestHarness::with_mode(ProviderMode::Sequential).with_dated(count);
    h.config.sequential.order_by = OrderBy::DateTaken;
    h.config.sequential.page_size = 50;
    h
}

#[tokio::test]
async fn pagination_covers_index_exactly_once() {
    let h = sequential_harness(250);
    let provider =
        SequentialCursorProvider::new(Arc::new(h.engine()), h.source.clone(), ScanSignal::new())
            .unwrap();

    let mut ids = Vec::new();
    loop {
        match provider.next().await {
            ProviderStep::Item(item) => ids.push(item.id),
            ProviderStep::Wrapped => break,
            ProviderStep::Exhausted => panic!("auto-loop should wrap"),
        }
    }

    let expected: Vec<String> = (1..=250).map(|n| dated(n).id).collect();
    assert_eq!(ids, expected);
    assert_eq!(h.source.query_calls(), 5, "five pages of fifty");
}

#[tokio::test]
async fn controller_walks_in_order() {
    let h = sequential_harness(30);
    let mut nav = h.ready_controller().await;
    for n in 1..=30 {
        assert_eq!(nav.next().await.unwrap().id, dated(n).id);
    }
    // wrap with nothing new: back to the first entry
    assert_eq!(nav.next().await.unwrap().id, dated(1).id);
    assert_eq!(nav.current_position(), Position { index: Some(0), total: 30 });
}

#[tokio::test]
async fn wrap_inserts_new_head_at_front() {
    let h = sequential_harness(3);
    let mut nav = h.ready_controller().await;
    for n in 1..=3 {
        assert_eq!(nav.next().await.unwrap().id, dated(n).id);
    }

    h.source.add_item(dated(0));
    let item = nav.next().await.unwrap();
    assert_eq!(item.id, dated(0).id);
    assert_eq!(nav.current_position(), Position { index: Some(0), total: 4 });
    assert_eq!(nav.next().await.unwrap().id, dated(1).id);
}

#[tokio::test]
async fn long_cycle_keeps_pulling_after_eviction() {
    let mut h = sequential_harness(30);
    h.config.navigation.window_size = 5;
    let mut nav = h.ready_controller().await;

    for n in 1..=30 {
        assert_eq!(nav.next().await.unwrap().id, dated(n).id);
    }
    assert_eq!(nav.current_position().total, 10);

    // the first items were evicted, so the next cycle is fetched again
    assert_eq!(nav.next().await.unwrap().id, dated(1).id);
    assert_eq!(nav.next().await.unwrap().id, dated(2).id);
    assert_eq!(nav.current_position().total, 10);
}

#[tokio::test]
async fn deleted_item_is_skipped() {
    let h = sequential_harness(4);
    let mut nav = h.ready_controller().await;
    nav.next().await.unwrap();
    let second = nav.next().await.unwrap();
    nav.mutate_current(slidequeue_common::MutationAction::Delete)
        .await
        .unwrap();
    assert!(h.source.item(&second.id).is_none());
    assert_eq!(nav.next().await.unwrap().id, dated(3).id);
    assert_eq!(nav.current_position(), Position { index: Some(1), total: 2 });
}

#[tokio::test]
async fn small_collection_probe() {
    let h = sequential_harness(40);
    let provider =
        SequentialCursorProvider::new(Arc::new(h.engine()), h.source.clone(), ScanSignal::new())
            .unwrap();
    let all = provider.probe_small_collection(100).await.unwrap().unwrap();
    assert_eq!(all.len(), 40);
    assert!(provider.probe_small_collection(10).await.unwrap().is_none());
}

#[tokio::test]
async fn paused_controller_does_not_query_index() {
    let mut h = sequential_harness(20);
    h.config.sequential.page_size = 5;
    h.config.sequential.low_water = 2;
    let mut nav = h.ready_controller().await;

    nav.on_pause_signal_changed(true).await;
    let before = h.source.query_calls();
    for _ in 0..10 {
        assert!(nav.next().await.is_some());
    }
    assert_eq!(h.source.query_calls(), before);

    nav.on_pause_signal_changed(false).await;
    let mut ids = Vec::new();
    for _ in 0..10 {
        ids.push(nav.next().await.unwrap().id);
    }
    assert!(h.source.query_calls() > before);
    assert!(ids.contains(&dated(6).id));
}
