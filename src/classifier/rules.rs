use serde::{Deserialize, Serialize};

/// What a rule is evidence for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Ad,
    Music,
}

/// Whether the rule holds when its predicate matches or when it does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Present,
    Absent,
}

/// Text comparison applied to an element's trimmed text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum TextMatch {
    Contains(String),
    EndsWith(String),
    Equals(String),
    ContainsAnyIgnoreCase(Vec<String>),
}

impl TextMatch {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Contains(needle) => text.contains(needle.as_str()),
            Self::EndsWith(suffix) => text.ends_with(suffix.as_str()),
            Self::Equals(expected) => text == expected,
            Self::ContainsAnyIgnoreCase(needles) => {
                let lowered = text.to_lowercase();
                needles
                    .iter()
                    .any(|needle| lowered.contains(&needle.to_lowercase()))
            }
        }
    }
}

fn default_min_count() -> usize {
    1
}

/// Signal a rule inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// A matching element exists and is rendered.
    Visible { selector: String },
    /// At least `min_count` matching elements exist, rendered or not.
    Exists {
        selector: String,
        #[serde(default = "default_min_count")]
        min_count: usize,
    },
    /// The page query string carries this parameter.
    UrlParam { name: String },
    /// The first element matching `selector` carries `class`.
    ContainerClass { selector: String, class: String },
    /// The first element matching `selector` has text satisfying `matcher`.
    Text { selector: String, matcher: TextMatch },
    /// The first element matching `selector` has `attribute` equal to `equals`.
    Attribute {
        selector: String,
        attribute: String,
        equals: String,
    },
}

impl Predicate {
    /// CSS selector the predicate depends on, if any.
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Visible { selector }
            | Self::Exists { selector, .. }
            | Self::ContainerClass { selector, .. }
            | Self::Text { selector, .. }
            | Self::Attribute { selector, .. } => Some(selector),
            Self::UrlParam { .. } => None,
        }
    }
}

/// One row of the indicator table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRule {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub polarity: Polarity,
    pub predicate: Predicate,
}

impl IndicatorRule {
    pub fn new(name: impl Into<String>, category: Category, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            category,
            polarity: Polarity::Present,
            predicate,
        }
    }

    pub fn absent(self) -> Self {
        Self {
            polarity: Polarity::Absent,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_matchers() {
        assert!(TextMatch::Contains("- Topic".into()).matches("Artist - Topic"));
        assert!(TextMatch::EndsWith("VEVO".into()).matches("ArtistVEVO"));
        assert!(!TextMatch::EndsWith("VEVO".into()).matches("VEVO Artist"));
        assert!(TextMatch::Equals("Music".into()).matches("Music"));
        assert!(
            TextMatch::ContainsAnyIgnoreCase(vec!["official video".into()])
                .matches("Song (Official Video)")
        );
        assert!(!TextMatch::ContainsAnyIgnoreCase(vec!["mv".into()]).matches("Cooking show"));
    }

    #[test]
    fn rule_deserializes_from_toml_table() {
        let rule: IndicatorRule = toml::from_str(
            r##"
            name = "topic-channel"
            category = "music"
            predicate = { kind = "text", selector = "#channel", matcher = { op = "contains", value = "- Topic" } }
            "##,
        )
        .unwrap();
        assert_eq!(rule.category, Category::Music);
        assert_eq!(rule.polarity, Polarity::Present);
        assert_eq!(
            rule.predicate,
            Predicate::Text {
                selector: "#channel".into(),
                matcher: TextMatch::Contains("- Topic".into()),
            }
        );
    }

    #[test]
    fn exists_min_count_defaults_to_one() {
        let rule: IndicatorRule = toml::from_str(
            r#"
            name = "chapters"
            category = "music"
            polarity = "present"
            predicate = { kind = "exists", selector = ".chapter" }
            "#,
        )
        .unwrap();
        assert_eq!(
            rule.predicate,
            Predicate::Exists {
                selector: ".chapter".into(),
                min_count: 1,
            }
        );
    }

    #[test]
    fn url_param_has_no_selector() {
        let predicate = Predicate::UrlParam {
            name: "adformat".into(),
        };
        assert_eq!(predicate.selector(), None);
        assert_eq!(
            Predicate::Visible {
                selector: ".ad".into()
            }
            .selector(),
            Some(".ad")
        );
    }
}
