use super::rules::{Category, IndicatorRule, Predicate, TextMatch};

/// Ad markers, checked for rendering not just presence.
const AD_MARKERS: &[(&str, &str)] = &[
    ("ad-player-overlay", ".ytp-ad-player-overlay"),
    ("ad-overlay-container", ".ytp-ad-overlay-container"),
    ("ad-module", ".video-ads.ytp-ad-module"),
    ("ad-text", ".ytp-ad-text"),
    ("ad-preview", ".ytp-ad-preview-container"),
    ("ad-skip-button", ".ytp-ad-skip-button-container"),
    ("ad-text-id", r#"div[id^="ad-text"]"#),
    ("ad-class-wildcard", r#"[class*="ytp-ad-"]"#),
];

const AD_URL_PARAMS: &[&str] = &["ad_type", "adformat", "adurl"];

const PLAYER_CONTAINER: &str = "#movie_player";
const AD_STATE_CLASSES: &[&str] = &["ad-showing", "ad-interrupting"];

const CHANNEL_NAME: &str = "#top-row ytd-video-owner-renderer yt-formatted-string.ytd-channel-name";
const VIDEO_TITLE: &str = "h1.ytd-video-primary-info-renderer";

/// Built-in indicator table for the YouTube watch page.
pub fn default_rules() -> Vec<IndicatorRule> {
    let mut rules = Vec::new();

    for (name, selector) in AD_MARKERS {
        rules.push(IndicatorRule::new(
            *name,
            Category::Ad,
            Predicate::Visible {
                selector: (*selector).to_string(),
            },
        ));
    }
    for param in AD_URL_PARAMS {
        rules.push(IndicatorRule::new(
            format!("url-{param}"),
            Category::Ad,
            Predicate::UrlParam {
                name: (*param).to_string(),
            },
        ));
    }
    for class in AD_STATE_CLASSES {
        rules.push(IndicatorRule::new(
            format!("player-{class}"),
            Category::Ad,
            Predicate::ContainerClass {
                selector: PLAYER_CONTAINER.into(),
                class: (*class).to_string(),
            },
        ));
    }

    rules.extend([
        IndicatorRule::new(
            "topic-channel",
            Category::Music,
            Predicate::Text {
                selector: CHANNEL_NAME.into(),
                matcher: TextMatch::Contains("- Topic".into()),
            },
        ),
        IndicatorRule::new(
            "vevo-channel",
            Category::Music,
            Predicate::Text {
                selector: CHANNEL_NAME.into(),
                matcher: TextMatch::EndsWith("VEVO".into()),
            },
        ),
        IndicatorRule::new(
            "official-music-channel",
            Category::Music,
            Predicate::Text {
                selector: CHANNEL_NAME.into(),
                matcher: TextMatch::Contains("Official Music".into()),
            },
        ),
        IndicatorRule::new(
            "genre-music",
            Category::Music,
            Predicate::Attribute {
                selector: r#"meta[itemprop="genre"]"#.into(),
                attribute: "content".into(),
                equals: "Music".into(),
            },
        ),
        IndicatorRule::new(
            "title-keywords",
            Category::Music,
            Predicate::Text {
                selector: VIDEO_TITLE.into(),
                matcher: TextMatch::ContainsAnyIgnoreCase(vec![
                    "mv".into(),
                    "music video".into(),
                    "official video".into(),
                ]),
            },
        ),
        IndicatorRule::new(
            "chapter-markers",
            Category::Music,
            Predicate::Exists {
                selector: ".ytp-chapter-marker-segment".into(),
                min_count: 1,
            },
        ),
    ]);

    rules
}
