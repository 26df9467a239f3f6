use super::{
    MUTATION_CHANNEL_CAPACITY, MemoryVideo, MutationBatch, MutationFilter, PageHost,
    PageSnapshot, VideoElement, html_contains,
};
use crate::error::HostError;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use url::Url;

type MutationSubscriber = (MutationFilter, mpsc::Sender<MutationBatch>);

/// Scriptable in-memory page.
///
/// Replacing the markup reconciles the video element (created when a `<video>`
/// appears, dropped when it disappears) and delivers a child-list batch to
/// every attached structural observer.
#[derive(Debug)]
pub struct SimulatedPage {
    url: RwLock<Option<Url>>,
    html: RwLock<String>,
    video: RwLock<Option<Arc<MemoryVideo>>>,
    subscribers: Mutex<Vec<MutationSubscriber>>,
    invalidated: AtomicBool,
    snapshot_failures: AtomicU32,
    next_video_id: AtomicU64,
}

impl SimulatedPage {
    pub fn new(url: Option<Url>, html: impl Into<String>) -> Self {
        let page = Self {
            url: RwLock::new(url),
            html: RwLock::new(String::new()),
            video: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
            invalidated: AtomicBool::new(false),
            snapshot_failures: AtomicU32::new(0),
            next_video_id: AtomicU64::new(1),
        };
        page.replace_html(html.into());
        page
    }

    /// Swap the document markup and notify structural observers.
    pub fn set_html(&self, html: impl Into<String>) {
        self.replace_html(html.into());
        self.emit(MutationBatch::child_list());
    }

    /// Swap the markup without any mutation notification, as pages that
    /// batch updates invisibly do.
    pub fn set_html_silently(&self, html: impl Into<String>) {
        self.replace_html(html.into());
    }

    pub fn navigate(&self, url: Option<Url>) {
        if let Ok(mut current) = self.url.write() {
            *current = url;
        }
    }

    /// Replace the video element with a fresh one (new identity, rate 1.0).
    pub fn replace_video(&self) -> Option<Arc<MemoryVideo>> {
        let fresh = Arc::new(MemoryVideo::new(
            self.next_video_id.fetch_add(1, Ordering::Relaxed),
        ));
        if let Ok(mut video) = self.video.write() {
            if video.is_none() {
                return None;
            }
            *video = Some(Arc::clone(&fresh));
        }
        self.emit(MutationBatch::child_list());
        Some(fresh)
    }

    /// Deliver a batch to attached observers, honoring each observer's filter.
    pub fn emit(&self, batch: MutationBatch) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|(filter, tx)| {
            if tx.is_closed() {
                return false;
            }
            if let Some(filtered) = filter.filter_batch(batch.clone()) {
                // A full queue already guarantees a pending evaluation.
                let _ = tx.try_send(filtered);
            }
            true
        });
    }

    /// The host tears this observer instance down.
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    /// Make the next document read fail without invalidating the context.
    pub fn fail_next_snapshot(&self) {
        self.snapshot_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn memory_video(&self) -> Option<Arc<MemoryVideo>> {
        self.video.read().ok().and_then(|video| video.clone())
    }

    pub fn mutation_observer_count(&self) -> usize {
        self.subscribers
            .lock()
            .map_or(0, |subs| subs.iter().filter(|(_, tx)| !tx.is_closed()).count())
    }

    fn replace_html(&self, html: String) {
        let has_video = html_contains(&html, "video");
        if let Ok(mut video) = self.video.write() {
            match (has_video, video.is_some()) {
                (true, false) => {
                    *video = Some(Arc::new(MemoryVideo::new(
                        self.next_video_id.fetch_add(1, Ordering::Relaxed),
                    )));
                }
                (false, true) => *video = None,
                _ => {}
            }
        }
        if let Ok(mut current) = self.html.write() {
            *current = html;
        }
    }

    fn check_valid(&self) -> Result<(), HostError> {
        if self.invalidated.load(Ordering::SeqCst) {
            Err(HostError::Invalidated)
        } else {
            Ok(())
        }
    }
}

impl PageHost for SimulatedPage {
    fn snapshot(&self) -> Result<PageSnapshot, HostError> {
        self.check_valid()?;
        if self
            .snapshot_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(HostError::Snapshot("document busy".into()));
        }
        let url = self.url.read().ok().and_then(|url| url.clone());
        let html = self
            .html
            .read()
            .map(|html| html.clone())
            .map_err(|_| HostError::Snapshot("document lock poisoned".into()))?;
        Ok(PageSnapshot { url, html })
    }

    fn video(&self) -> Option<Arc<dyn VideoElement>> {
        self.memory_video()
            .map(|video| video as Arc<dyn VideoElement>)
    }

    fn attach_mutations(
        &self,
        filter: &MutationFilter,
    ) -> Result<mpsc::Receiver<MutationBatch>, HostError> {
        self.check_valid()?;
        let mounted = self
            .html
            .read()
            .is_ok_and(|html| html_contains(&html, &filter.root));
        if !mounted {
            return Err(HostError::NotMounted);
        }
        let (tx, rx) = mpsc::channel(MUTATION_CHANNEL_CAPACITY);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push((filter.clone(), tx));
        }
        Ok(rx)
    }

    fn probe(&self) -> Result<(), HostError> {
        self.check_valid()
    }
}
