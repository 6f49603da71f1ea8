use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use trawl_core::{CrawlError, Info, LinkToken};

use crate::ContentParser;

/// Total character budget across all extracted paragraphs.
const PARAGRAPH_BUDGET: usize = 2000;

/// Minimum collapsed length for an `<article>`/`<main>` block to count as
/// a paragraph of its own.
const BLOCK_MIN_CHARS: usize = 50;

const SUPPORTED_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Extracts title, meta description, paragraph text and outbound link
/// tokens from an HTML body.
pub struct HtmlParser;

impl ContentParser for HtmlParser {
    fn supports(&self, content_type: &str) -> bool {
        SUPPORTED_TYPES
            .iter()
            .any(|supported| content_type.starts_with(supported))
    }

    fn parse(&self, body: &[u8]) -> Result<Info, CrawlError> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        Ok(Info {
            title: extract_title(&document),
            description: extract_description(&document),
            paragraphs: apply_paragraph_budget(extract_paragraphs(&document)),
            links: extract_links(&document),
        })
    }
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn collapse_whitespace(el: &ElementRef) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First non-empty `<title>`, falling back to the first non-empty `<h1>`.
fn extract_title(document: &Html) -> String {
    for sel in ["title", "h1"] {
        let Some(sel) = selector(sel) else { continue };
        if let Some(text) = document
            .select(&sel)
            .map(|el| collapse_whitespace(&el))
            .find(|text| !text.is_empty())
        {
            return text;
        }
    }
    String::new()
}

/// `content` of the first description meta tag, og:description as fallback.
fn extract_description(document: &Html) -> String {
    for sel in [
        "meta[name='description']",
        "meta[property='og:description']",
    ] {
        let Some(sel) = selector(sel) else { continue };
        if let Some(content) = document
            .select(&sel)
            .find_map(|el| el.value().attr("content"))
        {
            return content.to_string();
        }
    }
    String::new()
}

/// Document-order text of headings, paragraphs, and substantial
/// article/main blocks, with interior whitespace collapsed.
fn extract_paragraphs(document: &Html) -> Vec<String> {
    let Some(sel) = selector("h1, h2, h3, h4, h5, h6, p, article, main") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter_map(|el| {
            let text = collapse_whitespace(&el);
            if text.is_empty() {
                return None;
            }
            match el.value().name() {
                "article" | "main" if text.chars().count() <= BLOCK_MIN_CHARS => None,
                _ => Some(text),
            }
        })
        .collect()
}

/// Enforce the total paragraph budget. The paragraph that would exceed it
/// is dropped; a first paragraph that alone exceeds the budget is instead
/// truncated and terminated with an ellipsis.
fn apply_paragraph_budget(paragraphs: Vec<String>) -> Vec<String> {
    let mut kept = Vec::new();
    let mut used = 0usize;

    for text in paragraphs {
        let len = text.chars().count();
        if used + len > PARAGRAPH_BUDGET {
            if kept.is_empty() {
                let truncated: String = text.chars().take(PARAGRAPH_BUDGET - 1).collect();
                kept.push(format!("{truncated}…"));
            } else {
                debug!(dropped_chars = len, "paragraph budget reached");
            }
            break;
        }
        used += len;
        kept.push(text);
    }

    kept
}

/// Raw `href` values of `<a>` tags, in document order, verbatim.
/// Normalization is the link extractor's job, not the parser's.
fn extract_links(document: &Html) -> Vec<LinkToken> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| LinkToken {
            name: "link".to_string(),
            value: href.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Info {
        HtmlParser
            .parse(html.as_bytes())
            .expect("HTML parse never fails")
    }

    #[test]
    fn supports_is_a_real_prefix_match() {
        let parser = HtmlParser;
        assert!(parser.supports("text/html"));
        assert!(parser.supports("text/html; charset=utf-8"));
        assert!(parser.supports("application/xhtml+xml"));
        assert!(!parser.supports("application/json"));
        assert!(!parser.supports("image/png"));
        assert!(!parser.supports("text/plain"));
    }

    #[test]
    fn title_prefers_title_tag() {
        let info = parse("<html><head><title>Hello</title></head><body><h1>Nope</h1></body></html>");
        assert_eq!(info.title, "Hello");
    }

    #[test]
    fn title_falls_back_to_first_h1() {
        let info = parse("<html><head><title>  </title></head><body><h1>Heading</h1></body></html>");
        assert_eq!(info.title, "Heading");
    }

    #[test]
    fn description_from_meta_then_og() {
        let info = parse(r#"<head><meta name="description" content="plain"></head>"#);
        assert_eq!(info.description, "plain");

        let info = parse(r#"<head><meta property="og:description" content="og"></head>"#);
        assert_eq!(info.description, "og");
    }

    #[test]
    fn paragraphs_collapse_whitespace_in_order() {
        let info = parse(
            "<body><h1>First</h1><p>  one\n  two  </p><h2>Second</h2><p>three</p></body>",
        );
        assert_eq!(
            info.paragraphs,
            vec!["First", "one two", "Second", "three"]
        );
    }

    #[test]
    fn short_article_blocks_are_skipped() {
        let long = "x".repeat(60);
        let html = format!("<body><article>tiny</article><article>{long}</article></body>");
        let info = parse(&html);
        assert_eq!(info.paragraphs, vec![long]);
    }

    #[test]
    fn oversized_first_paragraph_is_truncated_with_ellipsis() {
        let html = format!("<body><p>{}</p></body>", "a".repeat(10_000));
        let info = parse(&html);
        assert_eq!(info.paragraphs.len(), 1);
        let only = &info.paragraphs[0];
        assert_eq!(only.chars().count(), 2000);
        assert!(only.ends_with('…'));
    }

    #[test]
    fn paragraph_exceeding_budget_is_dropped() {
        let html = format!(
            "<body><p>{}</p><p>{}</p></body>",
            "a".repeat(1500),
            "b".repeat(1000)
        );
        let info = parse(&html);
        assert_eq!(info.paragraphs.len(), 1);
        assert_eq!(info.paragraphs[0].chars().count(), 1500);
    }

    #[test]
    fn links_keep_document_order_and_raw_values() {
        let info = parse(
            r#"<body>
                <a href="/first">one</a>
                <a href="https://example.com/second?q=1">two</a>
                <a href="../third" />
            </body>"#,
        );
        let values: Vec<&str> = info.links.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(
            values,
            vec!["/first", "https://example.com/second?q=1", "../third"]
        );
        assert!(info.links.iter().all(|t| t.name == "link"));
    }

    #[test]
    fn empty_document_yields_empty_info() {
        let info = parse("");
        assert!(info.title.is_empty());
        assert!(info.description.is_empty());
        assert!(info.paragraphs.is_empty());
        assert!(info.links.is_empty());
    }
}
