//! Minimal anchor scanning over raw HTML
//!
//! The solvers only need `<a>` start tags and a handful of attributes
//! (`href`, `id`, `class`), so a tag-level regex scan is enough.

use regex::Regex;
use std::sync::LazyLock;

// Patterns are literals; compilation cannot fail at runtime.
#[allow(clippy::expect_used)]
static ANCHOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("anchor pattern"));

#[allow(clippy::expect_used)]
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute pattern")
});

/// An `<a>` element reduced to the attributes the solvers inspect
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    /// Entity-decoded `href`
    pub href: String,
    /// `id` attribute, if any
    pub id: Option<String>,
    /// Whitespace-separated `class` list
    pub classes: Vec<String>,
}

impl Anchor {
    /// Whether the element carries the given class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Substring match on the href, like a CSS `[href*=...]` selector
    pub fn href_contains(&self, needle: &str) -> bool {
        self.href.contains(needle)
    }
}

/// All anchors with a non-empty `href`, in document order
pub fn anchors(html: &str) -> Vec<Anchor> {
    ANCHOR_TAG
        .captures_iter(html)
        .filter_map(|tag| {
            let attrs = tag.get(1)?.as_str();
            let mut anchor = Anchor::default();

            for attr in ATTRIBUTE.captures_iter(attrs) {
                let name = attr.get(1).map(|m| m.as_str().to_ascii_lowercase());
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map(|m| decode_entities(m.as_str()))
                    .unwrap_or_default();

                match name.as_deref() {
                    Some("href") if anchor.href.is_empty() => anchor.href = value.trim().to_string(),
                    Some("id") => anchor.id = Some(value),
                    Some("class") => {
                        anchor.classes = value.split_whitespace().map(String::from).collect()
                    }
                    _ => {}
                }
            }

            (!anchor.href.is_empty()).then_some(anchor)
        })
        .collect()
}

/// Decode the few character references that show up inside attribute values
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
