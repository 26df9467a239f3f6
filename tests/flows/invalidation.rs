use adpace::classifier::Classification;
use std::time::Duration;

use super::runtime_harness::{AD, Harness, NORMAL, assert_rate};

#[tokio::test(start_paused = true)]
async fn invalidated_page_stops_and_leaves_others_running() {
    let mut harness = Harness::start(None).await;
    let (doomed, doomed_page) = harness.open(NORMAL);
    harness.next_status(doomed).await;
    let (survivor, survivor_page) = harness.open(NORMAL);
    harness.next_status(survivor).await;

    doomed_page.invalidate();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(harness.runtime.page_finished(doomed));
    assert!(!harness.runtime.hub().is_registered(doomed));
    assert_eq!(doomed_page.mutation_observer_count(), 0);
    assert_eq!(doomed_page.memory_video().unwrap().listener_count(), 0);

    // No more classification on the torn-down page.
    doomed_page.set_html(AD);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_rate(&doomed_page, 1.0);

    assert!(!harness.runtime.page_finished(survivor));
    survivor_page.set_html(AD);
    assert_eq!(
        harness.next_status(survivor).await.classification,
        Classification::Ad
    );
    harness.stop().await;
}
