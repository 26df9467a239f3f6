//! Page host abstraction.
//!
//! The observer never talks to a browser directly. Everything it needs from
//! the embedding page (the document, the video element, structural change
//! notifications, and the host validity probe) goes through [`PageHost`].

mod file;
mod simulated;
mod video;

pub use file::FilePage;
pub use simulated::SimulatedPage;
pub use video::{MemoryVideo, RateSubscription};

use crate::error::HostError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Capacity of a mutation batch channel. Overflowing batches are dropped; the
/// polling trigger covers anything lost.
pub const MUTATION_CHANNEL_CAPACITY: usize = 32;

/// Point-in-time view of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: Option<Url>,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: Option<Url>, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }
}

/// Element identity. Navigation can replace the element under the same page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoId(pub u64);

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "video#{}", self.0)
    }
}

/// Handle to the page's video element.
pub trait VideoElement: Send + Sync {
    fn id(&self) -> VideoId;

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64);

    /// Attach a rate-change listener. Dropping the subscription detaches it.
    fn subscribe_rate_changes(&self) -> RateSubscription;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ChildList,
    Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub attribute: Option<String>,
}

/// One observer callback's worth of mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn child_list() -> Self {
        Self {
            records: vec![MutationRecord {
                kind: MutationKind::ChildList,
                attribute: None,
            }],
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            records: vec![MutationRecord {
                kind: MutationKind::Attributes,
                attribute: Some(name.into()),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// What the structural trigger watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationFilter {
    /// CSS selector of the observed subtree root (the player container).
    pub root: String,
    pub child_list: bool,
    pub subtree: bool,
    /// Attribute names whose changes are reported. Empty means none.
    pub attribute_filter: Vec<String>,
}

impl Default for MutationFilter {
    fn default() -> Self {
        Self {
            root: "#movie_player".into(),
            child_list: true,
            subtree: true,
            attribute_filter: vec!["class".into()],
        }
    }
}

impl MutationFilter {
    /// Whether a record passes the filter.
    pub fn accepts(&self, record: &MutationRecord) -> bool {
        match record.kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => record
                .attribute
                .as_deref()
                .is_some_and(|name| self.attribute_filter.iter().any(|a| a == name)),
        }
    }

    /// Keep only accepted records. `None` when nothing survives.
    pub fn filter_batch(&self, batch: MutationBatch) -> Option<MutationBatch> {
        let records: Vec<_> = batch
            .records
            .into_iter()
            .filter(|record| self.accepts(record))
            .collect();
        (!records.is_empty()).then_some(MutationBatch { records })
    }
}

/// The embedding page as seen by one observer instance.
pub trait PageHost: Send + Sync {
    fn snapshot(&self) -> Result<PageSnapshot, HostError>;

    fn video(&self) -> Option<Arc<dyn VideoElement>>;

    /// Start structural observation. `HostError::NotMounted` is transient.
    fn attach_mutations(
        &self,
        filter: &MutationFilter,
    ) -> Result<mpsc::Receiver<MutationBatch>, HostError>;

    /// Probe the host. `HostError::Invalidated` means this instance is dead.
    fn probe(&self) -> Result<(), HostError>;
}

/// Does `html` contain an element matching `selector`?
pub(crate) fn html_contains(html: &str, selector: &str) -> bool {
    let Ok(selector) = scraper::Selector::parse(selector) else {
        return false;
    };
    let document = scraper::Html::parse_document(html);
    document.select(&selector).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_watches_class_changes_under_player() {
        let filter = MutationFilter::default();
        assert_eq!(filter.root, "#movie_player");
        assert!(filter.accepts(&MutationRecord {
            kind: MutationKind::ChildList,
            attribute: None,
        }));
        assert!(filter.accepts(&MutationRecord {
            kind: MutationKind::Attributes,
            attribute: Some("class".into()),
        }));
        assert!(!filter.accepts(&MutationRecord {
            kind: MutationKind::Attributes,
            attribute: Some("style".into()),
        }));
    }

    #[test]
    fn filter_batch_drops_rejected_records() {
        let filter = MutationFilter::default();
        assert!(filter.filter_batch(MutationBatch::attribute("style")).is_none());

        let mut batch = MutationBatch::attribute("style");
        batch.records.extend(MutationBatch::child_list().records);
        let kept = filter.filter_batch(batch).expect("child list survives");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.records[0].kind, MutationKind::ChildList);
    }

    #[test]
    fn html_contains_matches_selectors() {
        let html = r#"<div id="movie_player"><video></video></div>"#;
        assert!(html_contains(html, "#movie_player"));
        assert!(html_contains(html, "video"));
        assert!(!html_contains(html, ".missing"));
        assert!(!html_contains(html, "[[invalid"));
    }
}
