//! Markup stripping and text resolution.
//!
//! Feed titles, descriptions and content are HTML fragments of varying
//! quality.  [`strip_markup`] reduces them to plain text with single spaces,
//! and [`normalize`] picks the entry's `text` from the first non-empty of
//! content, description and title.

use scraper::{ElementRef, Html, Node};

use crate::filter::DatedEntry;

/// Elements that flow inside a word run.  Every other element separates
/// words, so `<p>one</p><p>two</p>` becomes `one two`, not `onetwo`.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "i", "kbd", "mark", "q",
    "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Elements whose text is never prose.
const SKIP_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// An entry with plain-text fields and a resolved `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub link: String,
    pub title: String,
    pub description: String,
    /// Empty when the feed had no content for this entry.
    pub content: String,
    /// First non-empty of `content`, `description`, `title`.
    pub text: String,
    pub published_at: i64,
    pub kind: Option<String>,
}

pub fn normalize(dated: DatedEntry) -> NormalizedEntry {
    let DatedEntry { entry, published_at } = dated;

    let title = strip_markup(&entry.title);
    let description = strip_markup(&entry.description);
    let content = entry.content.as_deref().map(strip_markup).unwrap_or_default();
    let text = first_non_empty([content.as_str(), description.as_str(), title.as_str()]).to_string();

    NormalizedEntry {
        link: entry.link.trim().to_string(),
        title,
        description,
        content,
        text,
        published_at,
        kind: entry.kind,
    }
}

/// The first candidate that is not empty, or `""` if all are.
pub fn first_non_empty<'a>(candidates: impl IntoIterator<Item = &'a str>) -> &'a str {
    candidates.into_iter().find(|s| !s.is_empty()).unwrap_or("")
}

/// Remove all markup, decode entities and collapse whitespace.
pub fn strip_markup(input: &str) -> String {
    if !input.contains(['<', '&']) {
        return collapse_whitespace(input);
    }
    let fragment = Html::parse_fragment(input);
    let mut raw = String::with_capacity(input.len());
    collect_text(fragment.root_element(), &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                let separates = !INLINE_TAGS.contains(&name);
                if separates {
                    out.push(' ');
                }
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
                if separates {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawEntry;

    fn entry(title: &str, description: &str, content: Option<&str>) -> DatedEntry {
        DatedEntry {
            entry: RawEntry {
                link: " https://example.com/post ".into(),
                title: title.into(),
                description: description.into(),
                content: content.map(String::from),
                published: Some("Mon, 01 Jan 2024 00:00:00 +0000".into()),
                kind: None,
            },
            published_at: 1_704_067_200,
        }
    }

    #[test]
    fn text_falls_back_to_description_without_content() {
        let n = normalize(entry("t", "d", None));
        assert_eq!(n.text, "d");
        assert_eq!(n.content, "");
    }

    #[test]
    fn text_falls_back_to_description_with_empty_content() {
        assert_eq!(normalize(entry("t", "d", Some(""))).text, "d");
    }

    #[test]
    fn markup_only_content_counts_as_empty() {
        assert_eq!(normalize(entry("t", "d", Some("<p> </p><br/>"))).text, "d");
    }

    #[test]
    fn text_prefers_content() {
        assert_eq!(normalize(entry("t", "d", Some("c"))).text, "c");
    }

    #[test]
    fn text_falls_back_to_title_last() {
        let n = normalize(entry("<b>Only</b> title", "", None));
        assert_eq!(n.text, "Only title");
    }

    #[test]
    fn all_empty_yields_empty_text() {
        assert_eq!(normalize(entry("", "", None)).text, "");
    }

    #[test]
    fn link_is_trimmed_and_timestamp_kept() {
        let n = normalize(entry("t", "d", None));
        assert_eq!(n.link, "https://example.com/post");
        assert_eq!(n.published_at, 1_704_067_200);
    }

    #[test]
    fn strip_keeps_word_boundaries_between_blocks() {
        assert_eq!(strip_markup("<p>one</p><p>two</p>"), "one two");
        assert_eq!(strip_markup("line<br>break"), "line break");
        assert_eq!(strip_markup("<ul><li>a</li><li>b</li></ul>"), "a b");
    }

    #[test]
    fn strip_does_not_split_inline_runs() {
        assert_eq!(strip_markup("un<b>believ</b>able"), "unbelievable");
        assert_eq!(strip_markup("see <a href=\"x\">this</a>, now"), "see this, now");
    }

    #[test]
    fn strip_decodes_entities_and_collapses_whitespace() {
        assert_eq!(strip_markup("Fish &amp; \n\n  chips&nbsp;&#33;"), "Fish & chips !");
        assert_eq!(strip_markup("  plain\ttext  "), "plain text");
    }

    #[test]
    fn strip_drops_scripts_and_styles() {
        let html = "<style>p{}</style><p>kept</p><script>alert(1)</script>";
        assert_eq!(strip_markup(html), "kept");
    }

    #[test]
    fn first_non_empty_picks_in_order() {
        assert_eq!(first_non_empty(["", "b", "c"]), "b");
        assert_eq!(first_non_empty(["", ""]), "");
    }
}
