use adpace::classifier::Classification;
use adpace::settings::{Settings, SettingsPatch};
use std::time::Duration;

use super::runtime_harness::{AD, Harness, NORMAL, assert_rate};

#[tokio::test(start_paused = true)]
async fn disabled_never_touches_the_rate() {
    let mut harness = Harness::start(Some(Settings {
        enabled: false,
        ..Settings::default()
    }))
    .await;
    let (id, page) = harness.open(NORMAL);
    let status = harness.next_status(id).await;
    assert_eq!(status.classification, Classification::Normal);
    assert_eq!(status.current_speed, None);

    page.set_html(AD);
    let status = harness.next_status(id).await;
    assert_eq!(status.classification, Classification::Ad);
    assert_eq!(status.current_speed, None);
    assert_rate(&page, 1.0);

    // A manual change while disabled is not captured either.
    {
        use adpace::page::VideoElement;
        page.memory_video().unwrap().set_playback_rate(1.75);
    }
    page.set_html(NORMAL);
    harness.next_status(id).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!((harness.store.current().unwrap().video_speed - 1.0).abs() < f64::EPSILON);
    assert_rate(&page, 1.75);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn enabling_through_panel_takes_effect_immediately() {
    let mut harness = Harness::start(Some(Settings {
        enabled: false,
        ..Settings::default()
    }))
    .await;
    let (id, page) = harness.open(AD);
    harness.next_status(id).await;

    harness
        .runtime
        .panel(Some(id))
        .update(&SettingsPatch {
            enabled: Some(true),
            ..SettingsPatch::default()
        })
        .await
        .unwrap();

    let status = harness.next_status(id).await;
    assert_eq!(status.current_speed, Some(16.0));
    assert_rate(&page, 16.0);
    harness.stop().await;
}
