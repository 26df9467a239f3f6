use adpace::classifier::Classification;
use adpace::settings::Settings;
use std::time::Duration;

use super::runtime_harness::{
    AD, HIDDEN_AD_MARKER, Harness, MUSIC_DURING_AD, NORMAL, assert_rate,
};

#[tokio::test(start_paused = true)]
async fn ad_then_normal_emits_one_event_per_change() {
    let mut harness = Harness::start(None).await;
    let (id, page) = harness.open(NORMAL);
    let initial = harness.next_status(id).await;
    assert_eq!(initial.classification, Classification::Normal);

    page.set_html(AD);
    let ad = harness.next_status(id).await;
    assert_eq!(ad.classification, Classification::Ad);
    assert_eq!(ad.current_speed, Some(16.0));
    assert_rate(&page, 16.0);

    // Stable classification: polls run, nothing is re-announced.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.drain(), 0);

    page.set_html(NORMAL);
    let normal = harness.next_status(id).await;
    assert_eq!(normal.classification, Classification::Normal);
    assert_eq!(normal.current_speed, Some(1.0));
    assert_rate(&page, 1.0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.drain(), 0);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn music_suppresses_ad_classification() {
    let mut harness = Harness::start(Some(Settings {
        video_speed: 1.5,
        ..Settings::default()
    }))
    .await;
    let (id, page) = harness.open(MUSIC_DURING_AD);

    let status = harness.next_status(id).await;
    assert_eq!(status.classification, Classification::Music);
    assert_rate(&page, 1.0);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn music_without_auto_normal_uses_video_speed() {
    let mut harness = Harness::start(Some(Settings {
        video_speed: 1.5,
        auto_normal_speed_for_music: false,
        ..Settings::default()
    }))
    .await;
    let (id, page) = harness.open(MUSIC_DURING_AD);

    let status = harness.next_status(id).await;
    assert_eq!(status.classification, Classification::Music);
    assert_eq!(status.current_speed, Some(1.5));
    assert_rate(&page, 1.5);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn hidden_ad_marker_is_not_an_ad() {
    let mut harness = Harness::start(None).await;
    let (id, page) = harness.open(HIDDEN_AD_MARKER);

    let status = harness.next_status(id).await;
    assert_eq!(status.classification, Classification::Normal);
    assert_rate(&page, 1.0);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn page_without_video_reports_unknown() {
    let mut harness = Harness::start(None).await;
    let (id, page) = harness.open(r#"<div id="movie_player"></div>"#);

    let status = harness.next_status(id).await;
    assert_eq!(status.classification, Classification::Unknown);
    assert_eq!(status.current_speed, None);

    page.set_html(AD);
    assert_eq!(
        harness.next_status(id).await.classification,
        Classification::Ad
    );
    harness.stop().await;
}
