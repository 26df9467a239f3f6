use super::{VideoElement, VideoId};
use std::sync::Mutex;
use tokio::sync::broadcast;

const RATE_EVENT_CAPACITY: usize = 16;

/// Attached rate-change listener.
///
/// Owns the receiving half; dropping (or [`release`](Self::release)) detaches
/// it, so a replaced element can never deliver into a stale listener.
#[derive(Debug)]
pub struct RateSubscription {
    video: VideoId,
    rx: broadcast::Receiver<f64>,
}

impl RateSubscription {
    pub fn new(video: VideoId, rx: broadcast::Receiver<f64>) -> Self {
        Self { video, rx }
    }

    pub fn video(&self) -> VideoId {
        self.video
    }

    /// Next observed rate. `None` once the element is gone.
    pub async fn changed(&mut self) -> Option<f64> {
        loop {
            match self.rx.recv().await {
                Ok(rate) => return Some(rate),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(video = %self.video, skipped, "rate events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn release(self) {
        tracing::debug!(video = %self.video, "rate listener released");
    }
}

/// In-memory video element. Every rate assignment fires a rate-change event,
/// including assignments made by the controller itself.
#[derive(Debug)]
pub struct MemoryVideo {
    id: VideoId,
    rate: Mutex<f64>,
    events: broadcast::Sender<f64>,
}

impl MemoryVideo {
    pub fn new(id: u64) -> Self {
        let (events, _) = broadcast::channel(RATE_EVENT_CAPACITY);
        Self {
            id: VideoId(id),
            rate: Mutex::new(1.0),
            events,
        }
    }

    /// Number of attached rate listeners.
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl VideoElement for MemoryVideo {
    fn id(&self) -> VideoId {
        self.id
    }

    fn playback_rate(&self) -> f64 {
        self.rate.lock().map_or(1.0, |rate| *rate)
    }

    fn set_playback_rate(&self, rate: f64) {
        if let Ok(mut current) = self.rate.lock() {
            *current = rate;
        }
        // No listener attached is not an error.
        let _ = self.events.send(rate);
    }

    fn subscribe_rate_changes(&self) -> RateSubscription {
        RateSubscription::new(self.id, self.events.subscribe())
    }
}
