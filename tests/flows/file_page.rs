use adpace::classifier::Classification;
use adpace::config::{Config, ConfigHandle};
use adpace::coordinator::StatusEvent;
use adpace::observability::NoopObserver;
use adpace::page::{FilePage, PageHost, VideoElement};
use adpace::runtime::Runtime;
use adpace::settings::JsonFileStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

use super::runtime_harness::{AD, NORMAL};

async fn next_event(events: &mut broadcast::Receiver<StatusEvent>) -> StatusEvent {
    tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for a status change")
        .expect("status channel open")
}

#[tokio::test]
async fn file_backed_page_round_trip() {
    let tmp = TempDir::new().unwrap();
    let html_path = tmp.path().join("watch.html");
    std::fs::write(&html_path, NORMAL).unwrap();
    let settings_path = tmp.path().join("settings.json");

    let runtime_config = Config {
        settings_path: Some(settings_path.clone()),
        ..Config::default()
    };
    let mut runtime = Runtime::start(
        ConfigHandle::new(runtime_config),
        Arc::new(JsonFileStore::new(&settings_path)),
        Arc::new(NoopObserver),
    )
    .await
    .unwrap();
    assert!(settings_path.exists());

    let mut events = runtime.subscribe_status();
    let host = FilePage::open(&html_path, None).await.unwrap();
    let refresh = host.spawn_refresh(Duration::from_millis(20));
    let id = runtime.open_page(Arc::clone(&host) as Arc<dyn PageHost>);

    let first = next_event(&mut events).await;
    assert_eq!(first.page, id);
    assert_eq!(first.status.classification, Classification::Normal);

    std::fs::write(&html_path, AD).unwrap();
    let second = next_event(&mut events).await;
    assert_eq!(second.status.classification, Classification::Ad);
    let video = host.video().unwrap();
    assert!((video.playback_rate() - 16.0).abs() < f64::EPSILON);

    std::fs::remove_file(&html_path).unwrap();
    for _ in 0..200 {
        if runtime.page_finished(id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(runtime.page_finished(id));
    refresh.abort();
    runtime.shutdown().await;
}
