use super::{
    MUTATION_CHANNEL_CAPACITY, MemoryVideo, MutationBatch, MutationFilter, PageHost,
    PageSnapshot, VideoElement, html_contains,
};
use crate::error::HostError;
use arc_swap::{ArcSwap, ArcSwapOption};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// Page backed by an HTML file on disk.
///
/// A refresh task re-reads the file on a fixed cadence. Content changes are
/// delivered as child-list mutation batches; deleting the file invalidates
/// the page the way a torn-down extension context would.
#[derive(Debug)]
pub struct FilePage {
    path: PathBuf,
    url: Option<Url>,
    html: ArcSwap<String>,
    video: ArcSwapOption<MemoryVideo>,
    video_key: Mutex<Option<String>>,
    subscribers: Mutex<Vec<(MutationFilter, mpsc::Sender<MutationBatch>)>>,
    invalidated: AtomicBool,
    next_video_id: AtomicU64,
}

impl FilePage {
    pub async fn open(path: impl Into<PathBuf>, url: Option<Url>) -> Result<Arc<Self>, HostError> {
        let path = path.into();
        let html = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| HostError::Snapshot(format!("{}: {error}", path.display())))?;
        let page = Arc::new(Self {
            path,
            url,
            html: ArcSwap::from_pointee(String::new()),
            video: ArcSwapOption::empty(),
            video_key: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
            invalidated: AtomicBool::new(false),
            next_video_id: AtomicU64::new(1),
        });
        page.install(html);
        Ok(page)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the refresh task. It stops on its own once the page is
    /// invalidated or dropped.
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(page) = weak.upgrade() else { break };
                if !page.refresh().await {
                    break;
                }
            }
        })
    }

    /// Re-read the file once. Returns `false` when the page is gone.
    pub async fn refresh(&self) -> bool {
        if self.invalidated.load(Ordering::SeqCst) {
            return false;
        }
        match tokio::fs::read_to_string(&self.path).await {
            Ok(html) => {
                if html != **self.html.load() {
                    self.install(html);
                    self.emit(MutationBatch::child_list());
                }
                true
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "page file removed, invalidating");
                self.invalidated.store(true, Ordering::SeqCst);
                false
            }
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "page file unreadable");
                true
            }
        }
    }

    fn install(&self, html: String) {
        let key = video_identity(&html);
        if let Ok(mut current) = self.video_key.lock()
            && *current != key
        {
            let video = key.as_ref().map(|_| {
                Arc::new(MemoryVideo::new(
                    self.next_video_id.fetch_add(1, Ordering::Relaxed),
                ))
            });
            self.video.store(video);
            *current = key;
        }
        self.html.store(Arc::new(html));
    }

    fn emit(&self, batch: MutationBatch) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|(filter, tx)| {
            if tx.is_closed() {
                return false;
            }
            if let Some(filtered) = filter.filter_batch(batch.clone()) {
                let _ = tx.try_send(filtered);
            }
            true
        });
    }
}

/// Identity key of the document's video element: its `id`, else its `src`,
/// else empty. `None` when there is no video element.
fn video_identity(html: &str) -> Option<String> {
    let selector = scraper::Selector::parse("video").ok()?;
    let document = scraper::Html::parse_document(html);
    let element = document.select(&selector).next()?;
    let value = element.value();
    Some(
        value
            .attr("id")
            .or_else(|| value.attr("src"))
            .unwrap_or_default()
            .to_string(),
    )
}

impl PageHost for FilePage {
    fn snapshot(&self) -> Result<PageSnapshot, HostError> {
        self.probe()?;
        Ok(PageSnapshot {
            url: self.url.clone(),
            html: self.html.load().as_ref().clone(),
        })
    }

    fn video(&self) -> Option<Arc<dyn VideoElement>> {
        self.video
            .load_full()
            .map(|video| video as Arc<dyn VideoElement>)
    }

    fn attach_mutations(
        &self,
        filter: &MutationFilter,
    ) -> Result<mpsc::Receiver<MutationBatch>, HostError> {
        self.probe()?;
        if !html_contains(&self.html.load(), &filter.root) {
            return Err(HostError::NotMounted);
        }
        let (tx, rx) = mpsc::channel(MUTATION_CHANNEL_CAPACITY);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push((filter.clone(), tx));
        }
        Ok(rx)
    }

    fn probe(&self) -> Result<(), HostError> {
        if self.invalidated.load(Ordering::SeqCst) {
            Err(HostError::Invalidated)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn refresh_picks_up_changes_and_notifies() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, r#"<div id="movie_player"><video id="a"></video></div>"#).unwrap();

        let page = FilePage::open(&path, None).await.unwrap();
        let first = page.video().unwrap().id();
        let mut rx = page.attach_mutations(&MutationFilter::default()).unwrap();

        assert!(page.refresh().await);
        assert!(rx.try_recv().is_err());

        std::fs::write(
            &path,
            r#"<div id="movie_player" class="ad-showing"><video id="a"></video></div>"#,
        )
        .unwrap();
        assert!(page.refresh().await);
        assert_eq!(rx.recv().await.unwrap(), MutationBatch::child_list());
        assert_eq!(page.video().unwrap().id(), first);
        assert!(page.snapshot().unwrap().html.contains("ad-showing"));
    }

    #[tokio::test]
    async fn new_video_identity_replaces_element() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, r#"<video id="a"></video>"#).unwrap();
        let page = FilePage::open(&path, None).await.unwrap();
        let first = page.video().unwrap().id();

        std::fs::write(&path, r#"<video id="b"></video>"#).unwrap();
        page.refresh().await;
        assert_ne!(page.video().unwrap().id(), first);

        std::fs::write(&path, "<p>no player</p>").unwrap();
        page.refresh().await;
        assert!(page.video().is_none());
    }

    #[tokio::test]
    async fn removed_file_invalidates_page() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, "<video></video>").unwrap();
        let page = FilePage::open(&path, None).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(!page.refresh().await);
        assert_eq!(page.probe().unwrap_err(), HostError::Invalidated);
    }

    #[test]
    fn video_identity_prefers_id_then_src() {
        assert_eq!(video_identity(r#"<video id="x" src="y"></video>"#).as_deref(), Some("x"));
        assert_eq!(video_identity(r#"<video src="y"></video>"#).as_deref(), Some("y"));
        assert_eq!(video_identity("<video></video>").as_deref(), Some(""));
        assert_eq!(video_identity("<div></div>"), None);
    }
}
