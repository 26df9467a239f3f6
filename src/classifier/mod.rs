//! Heuristic AD / MUSIC / NORMAL classifier.
//!
//! [`classify`] is pure: it reads a [`PageSnapshot`] and an
//! [`IndicatorSet`] and never touches playback state. Sites are supported by
//! swapping the rule table, not by changing this code.

mod defaults;
mod rules;
mod visibility;

pub use defaults::default_rules;
pub use rules::{Category, IndicatorRule, Polarity, Predicate, TextMatch};
pub use visibility::is_rendered;

use crate::error::ConfigError;
use crate::page::PageSnapshot;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Outcome of one evaluation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Ad,
    Music,
    Normal,
    /// No video element on the page.
    Unknown,
}

/// Classification plus the rules that fired, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    pub ad_evidence: Vec<String>,
    pub music_evidence: Vec<String>,
}

impl Verdict {
    fn unknown() -> Self {
        Self {
            classification: Classification::Unknown,
            ad_evidence: Vec::new(),
            music_evidence: Vec::new(),
        }
    }
}

/// Priority rule: music suppresses ad, ad beats normal.
pub fn decide(ad_signal: bool, music_signal: bool) -> Classification {
    match (ad_signal, music_signal) {
        (_, true) => Classification::Music,
        (true, false) => Classification::Ad,
        (false, false) => Classification::Normal,
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: IndicatorRule,
    selector: Option<Selector>,
}

impl CompiledRule {
    fn compile(rule: IndicatorRule) -> Result<Self, ConfigError> {
        let selector = match rule.predicate.selector() {
            Some(css) => Some(Selector::parse(css).map_err(|error| ConfigError::Indicator {
                rule: rule.name.clone(),
                message: format!("bad selector '{css}': {error}"),
            })?),
            None => None,
        };
        Ok(Self { rule, selector })
    }

    fn holds(&self, document: &Html, url: Option<&Url>) -> bool {
        let matched = self.matches(document, url);
        match self.rule.polarity {
            Polarity::Present => matched,
            Polarity::Absent => !matched,
        }
    }

    fn matches(&self, document: &Html, url: Option<&Url>) -> bool {
        if let Predicate::UrlParam { name } = &self.rule.predicate {
            return url.is_some_and(|url| url.query_pairs().any(|(key, _)| key == name.as_str()));
        }
        let Some(selector) = &self.selector else {
            return false;
        };
        let mut matches = document.select(selector);
        match &self.rule.predicate {
            Predicate::Visible { .. } => matches.any(is_rendered),
            Predicate::Exists { min_count, .. } => matches.take(*min_count).count() >= *min_count,
            Predicate::ContainerClass { class, .. } => matches
                .next()
                .is_some_and(|element| element.value().classes().any(|c| c == class.as_str())),
            Predicate::Text { matcher, .. } => matches
                .next()
                .is_some_and(|element| matcher.matches(text_of(element).trim())),
            Predicate::Attribute {
                attribute, equals, ..
            } => matches
                .next()
                .is_some_and(|element| element.value().attr(attribute) == Some(equals.as_str())),
            Predicate::UrlParam { .. } => false,
        }
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Compiled indicator table.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    video_tag: String,
    rules: Vec<CompiledRule>,
}

impl IndicatorSet {
    /// Compile a rule table, rejecting the first invalid selector.
    pub fn compile(rules: &[IndicatorRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .cloned()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            video_tag: "video".into(),
            rules,
        })
    }

    /// The built-in table. Invalid rows are skipped with a warning.
    pub fn builtin() -> Self {
        let rules = default_rules()
            .into_iter()
            .filter_map(|rule| match CompiledRule::compile(rule) {
                Ok(compiled) => Some(compiled),
                Err(error) => {
                    tracing::warn!(%error, "skipping built-in indicator");
                    None
                }
            })
            .collect();
        Self {
            video_tag: "video".into(),
            rules,
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = &IndicatorRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn has_video(document: &Html, tag: &str) -> bool {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|element| element.value().name().eq_ignore_ascii_case(tag))
}

/// Classify a document snapshot.
pub fn classify(snapshot: &PageSnapshot, indicators: &IndicatorSet) -> Verdict {
    let document = Html::parse_document(&snapshot.html);
    if !has_video(&document, &indicators.video_tag) {
        return Verdict::unknown();
    }

    let mut ad_evidence = Vec::new();
    let mut music_evidence = Vec::new();
    for compiled in &indicators.rules {
        if !compiled.holds(&document, snapshot.url.as_ref()) {
            continue;
        }
        let name = compiled.rule.name.clone();
        match compiled.rule.category {
            Category::Ad => ad_evidence.push(name),
            Category::Music => music_evidence.push(name),
        }
    }

    Verdict {
        classification: decide(!ad_evidence.is_empty(), !music_evidence.is_empty()),
        ad_evidence,
        music_evidence,
    }
}
