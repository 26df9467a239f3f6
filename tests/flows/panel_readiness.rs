use adpace::bus::ContextId;
use adpace::classifier::Classification;
use adpace::error::PanelError;

use super::runtime_harness::{AD, Harness};

#[tokio::test(start_paused = true)]
async fn panel_reads_status_from_live_page() {
    let mut harness = Harness::start(None).await;
    let (id, _page) = harness.open(AD);
    harness.next_status(id).await;

    let status = harness.runtime.panel(Some(id)).status().await.unwrap();
    assert_eq!(status.classification, Classification::Ad);
    assert!(status.is_ad);
    assert_eq!(status.current_speed, Some(16.0));
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_page_is_not_ready() {
    let harness = Harness::start(None).await;
    let result = harness
        .runtime
        .panel(Some(ContextId::Page(99)))
        .status()
        .await;
    assert!(matches!(result, Err(PanelError::NotReady)));
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn closed_page_is_not_ready() {
    let mut harness = Harness::start(None).await;
    let (id, _page) = harness.open(AD);
    harness.next_status(id).await;
    harness.runtime.close_page(id).await;

    let result = harness.runtime.panel(Some(id)).status().await;
    assert!(matches!(result, Err(PanelError::NotReady)));
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn panel_without_active_page() {
    let harness = Harness::start(None).await;
    let panel = harness.runtime.panel(None);
    assert!(matches!(
        panel.status().await,
        Err(PanelError::NoActivePage)
    ));
    // Settings still work without a page.
    assert!(panel.load().await.unwrap().enabled);
    harness.stop().await;
}
