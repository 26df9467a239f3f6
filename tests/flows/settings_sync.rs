use adpace::classifier::Classification;
use adpace::page::VideoElement;
use adpace::settings::SettingsPatch;

use super::runtime_harness::{AD, Harness, NORMAL, assert_rate};

#[tokio::test(start_paused = true)]
async fn panel_update_reaches_every_page() {
    let mut harness = Harness::start(None).await;
    let (first, first_page) = harness.open(AD);
    harness.next_status(first).await;
    let (second, second_page) = harness.open(AD);
    harness.next_status(second).await;

    let saved = harness
        .runtime
        .panel(Some(first))
        .update(&SettingsPatch {
            ad_speed: Some(4.0),
            ..SettingsPatch::default()
        })
        .await
        .unwrap();
    assert!((saved.ad_speed - 4.0).abs() < f64::EPSILON);
    assert_eq!(harness.store.current(), Some(saved));

    assert_eq!(harness.next_status(first).await.current_speed, Some(4.0));
    assert_eq!(harness.next_status(second).await.current_speed, Some(4.0));
    assert_rate(&first_page, 4.0);
    assert_rate(&second_page, 4.0);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn captured_speed_is_persisted_and_shared() {
    let mut harness = Harness::start(None).await;
    let (first, first_page) = harness.open(NORMAL);
    harness.next_status(first).await;
    let (second, second_page) = harness.open(NORMAL);
    harness.next_status(second).await;

    first_page.memory_video().unwrap().set_playback_rate(1.5);

    let status = harness.next_status(first).await;
    assert_eq!(status.classification, Classification::Normal);
    assert_eq!(status.current_speed, Some(1.5));

    // The coordinator saves the record and forwards it to the other page.
    let status = harness.next_status(second).await;
    assert_eq!(status.current_speed, Some(1.5));
    assert_rate(&second_page, 1.5);
    assert!((harness.store.current().unwrap().video_speed - 1.5).abs() < f64::EPSILON);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reset_restores_defaults_on_pages() {
    let mut harness = Harness::start(None).await;
    let (id, page) = harness.open(AD);
    harness.next_status(id).await;
    let panel = harness.runtime.panel(Some(id));

    panel
        .update(&SettingsPatch {
            ad_speed: Some(2.0),
            ..SettingsPatch::default()
        })
        .await
        .unwrap();
    harness.next_status(id).await;
    assert_rate(&page, 2.0);

    panel.reset().await.unwrap();
    assert_eq!(harness.next_status(id).await.current_speed, Some(16.0));
    assert_rate(&page, 16.0);
    harness.stop().await;
}
