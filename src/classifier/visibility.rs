use scraper::ElementRef;

/// Whether an element would be rendered, judged from the snapshot alone.
///
/// `display: none` and the `hidden` attribute on the element or any ancestor
/// remove it. `visibility` inherits, so the nearest element that declares it
/// decides. Ad markers routinely stay in the document after the ad ends, so
/// presence alone is not enough.
pub fn is_rendered(element: ElementRef<'_>) -> bool {
    let lineage = std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap));
    let mut visibility = None;
    for node in lineage {
        let value = node.value();
        if value.attr("hidden").is_some() {
            return false;
        }
        let style = value.attr("style").map(declarations).unwrap_or_default();
        if declared(&style, "display") == Some("none") {
            return false;
        }
        if visibility.is_none() {
            visibility = declared(&style, "visibility").map(str::to_owned);
        }
    }
    !matches!(visibility.as_deref(), Some("hidden" | "collapse"))
}

fn declared<'a>(style: &'a [(String, String)], property: &str) -> Option<&'a str> {
    style
        .iter()
        .find(|(name, _)| name == property)
        .map(|(_, value)| value.as_str())
}

/// Inline style as lowercase `(property, value)` pairs, last one first so a
/// later declaration wins.
fn declarations(style: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let value = value
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_ascii_lowercase();
            Some((property.trim().to_ascii_lowercase(), value))
        })
        .collect();
    pairs.reverse();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn rendered(html: &str, selector: &str) -> bool {
        let document = Html::parse_document(html);
        let selector = Selector::parse(selector).unwrap();
        let element = document.select(&selector).next().unwrap();
        is_rendered(element)
    }

    #[test]
    fn plain_element_is_rendered() {
        assert!(rendered(r#"<div class="ad"></div>"#, ".ad"));
    }

    #[test]
    fn display_none_hides() {
        assert!(!rendered(r#"<div class="ad" style="display:none"></div>"#, ".ad"));
        assert!(!rendered(
            r#"<div class="ad" style="color: red; DISPLAY : None !important"></div>"#,
            ".ad"
        ));
    }

    #[test]
    fn visibility_hidden_hides() {
        assert!(!rendered(r#"<div class="ad" style="visibility: hidden"></div>"#, ".ad"));
    }

    #[test]
    fn hidden_attribute_hides() {
        assert!(!rendered(r#"<div class="ad" hidden></div>"#, ".ad"));
    }

    #[test]
    fn hidden_ancestor_hides_descendant() {
        assert!(!rendered(
            r#"<div style="display:none"><span><b class="ad">Ad</b></span></div>"#,
            ".ad"
        ));
    }

    #[test]
    fn hidden_visibility_is_inherited() {
        assert!(!rendered(
            r#"<div style="visibility:hidden"><span class="ad">Ad</span></div>"#,
            ".ad"
        ));
    }

    #[test]
    fn child_can_make_itself_visible_again() {
        assert!(rendered(
            r#"<div style="visibility:hidden"><span class="ad" style="visibility: visible">Ad</span></div>"#,
            ".ad"
        ));
        // Display is not inherited the same way: nothing undoes it.
        assert!(!rendered(
            r#"<div style="display:none"><span class="ad" style="display:block">Ad</span></div>"#,
            ".ad"
        ));
    }

    #[test]
    fn later_declaration_wins() {
        assert!(rendered(
            r#"<div class="ad" style="visibility:hidden; visibility:visible"></div>"#,
            ".ad"
        ));
        assert!(rendered(
            r#"<div class="ad" style="display:none; display:block"></div>"#,
            ".ad"
        ));
    }

    #[test]
    fn unrelated_style_keeps_element_rendered() {
        assert!(rendered(
            r#"<div class="ad" style="display: block; opacity: 0.5"></div>"#,
            ".ad"
        ));
    }
}
