use adpace::bus::ContextId;
use adpace::config::{Config, ConfigHandle};
use adpace::controller::Status;
use adpace::coordinator::StatusEvent;
use adpace::observability::NoopObserver;
use adpace::page::{PageHost, SimulatedPage};
use adpace::runtime::Runtime;
use adpace::settings::{MemoryStore, Settings, SettingsStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

pub const NORMAL: &str = r#"<html><body>
    <div id="movie_player" class="html5-video-player"><video></video></div>
</body></html>"#;

pub const AD: &str = r#"<html><body>
    <div id="movie_player" class="html5-video-player ad-showing">
        <video></video>
        <div class="ytp-ad-player-overlay">Ad</div>
    </div>
</body></html>"#;

pub const MUSIC_DURING_AD: &str = r#"<html><head>
    <meta itemprop="genre" content="Music">
</head><body>
    <div id="movie_player" class="html5-video-player ad-showing">
        <video></video>
        <div class="ytp-ad-player-overlay">Ad</div>
    </div>
</body></html>"#;

pub const HIDDEN_AD_MARKER: &str = r#"<html><body>
    <div id="movie_player" class="html5-video-player">
        <video></video>
        <div class="ytp-ad-player-overlay" style="display: none">Ad</div>
    </div>
</body></html>"#;

pub const WAIT: Duration = Duration::from_secs(30);

pub struct Harness {
    pub runtime: Runtime,
    pub store: Arc<MemoryStore>,
    pub events: broadcast::Receiver<StatusEvent>,
    /// Events received while waiting on another page.
    pending: Vec<StatusEvent>,
}

impl Harness {
    pub async fn start(settings: Option<Settings>) -> Self {
        let store = Arc::new(settings.map_or_else(MemoryStore::new, MemoryStore::with_settings));
        let runtime = Runtime::start(
            ConfigHandle::new(Config::default()),
            Arc::clone(&store) as Arc<dyn SettingsStore>,
            Arc::new(NoopObserver),
        )
        .await
        .expect("runtime starts");
        let events = runtime.subscribe_status();
        Self {
            runtime,
            store,
            events,
            pending: Vec::new(),
        }
    }

    pub fn open(&mut self, html: &str) -> (ContextId, Arc<SimulatedPage>) {
        let page = Arc::new(SimulatedPage::new(None, html));
        let id = self
            .runtime
            .open_page(Arc::clone(&page) as Arc<dyn PageHost>);
        (id, page)
    }

    /// Next status change reported by `page`.
    pub async fn next_status(&mut self, page: ContextId) -> Status {
        if let Some(index) = self.pending.iter().position(|event| event.page == page) {
            return self.pending.remove(index).status;
        }
        let Self {
            events, pending, ..
        } = self;
        tokio::time::timeout(WAIT, async {
            loop {
                match events.recv().await {
                    Ok(event) if event.page == page => return event.status,
                    Ok(event) => pending.push(event),
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => panic!("status channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for a status change")
    }

    /// Drain already-delivered events, returning how many there were.
    pub fn drain(&mut self) -> usize {
        let mut count = self.pending.len();
        self.pending.clear();
        while self.events.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    pub async fn stop(self) {
        self.runtime.shutdown().await;
    }
}

pub fn rate(page: &SimulatedPage) -> f64 {
    use adpace::page::VideoElement;
    page.memory_video().expect("video present").playback_rate()
}

pub fn assert_rate(page: &SimulatedPage, expected: f64) {
    let actual = rate(page);
    assert!(
        (actual - expected).abs() < f64::EPSILON,
        "expected rate {expected}, got {actual}"
    );
}
