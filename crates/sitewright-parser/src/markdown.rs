//! Markdown parser using pulldown-cmark.
//!
//! Documents may open with a YAML front matter block delimited by `---`.
//! Recognised keys are `title`, `author`/`authors`, `date`, `description`
//! and `keywords`; anything else is ignored.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd, html};
use serde::Deserialize;
use sitewright_core::ContentType;
use tracing::trace;

use crate::{ParseError, ParseOptions, Parser, sink::Sink};

const DELIMITER: &str = "---";

/// Front matter keys a markdown document may declare.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    title: Option<String>,
    author: Option<String>,
    authors: Vec<String>,
    date: Option<String>,
    description: Option<String>,
    keywords: Vec<String>,
}

/// Markdown parser.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    options: Options,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a new markdown parser with default options.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Render a markdown body, returning the HTML and the first level-1 heading.
    fn render_body(&self, body: &str, emit_comments: bool) -> (String, Option<String>) {
        let mut in_comment = false;
        let mut heading: Option<String> = None;
        let mut in_title = false;
        let mut title_done = false;

        let events = CmarkParser::new_ext(body, self.options).filter(|event| {
            match event {
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    ..
                }) if !title_done => {
                    in_title = true;
                    heading = Some(String::new());
                }
                Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_title => {
                    in_title = false;
                    title_done = true;
                }
                Event::Text(text) | Event::Code(text) if in_title => {
                    if let Some(h) = heading.as_mut() {
                        h.push_str(text);
                    }
                }
                Event::Html(raw) | Event::InlineHtml(raw) if !emit_comments => {
                    if in_comment || raw.trim_start().starts_with("<!--") {
                        in_comment = !raw.contains("-->");
                        return false;
                    }
                }
                _ => {}
            }
            true
        });

        let mut out = String::new();
        html::push_html(&mut out, events);

        (out, heading.map(|h| h.trim().to_string()))
    }
}

impl Parser for MarkdownParser {
    fn content_type(&self) -> ContentType {
        ContentType::PlainText
    }

    fn parse(&self, text: &str, options: &ParseOptions) -> Result<Sink, ParseError> {
        let (front, body) = match split_front_matter(text) {
            Some((yaml, body)) => {
                let front: FrontMatter = if yaml.trim().is_empty() {
                    FrontMatter::default()
                } else {
                    serde_yaml::from_str(yaml).map_err(|e| ParseError {
                        // The front matter starts on the line after the opening delimiter.
                        line: e.location().map(|l| l.line() + 1),
                        message: format!("invalid front matter: {e}"),
                    })?
                };
                (front, body)
            }
            None => (FrontMatter::default(), text),
        };

        let (body_html, heading) = self.render_body(body, options.emit_comments);

        let mut sink = Sink::new();
        sink.title = front.title.or(heading).unwrap_or_default();
        sink.authors = front.author.into_iter().chain(front.authors).collect();
        sink.date = front.date;
        sink.head = head_markup(front.description.as_deref(), &front.keywords);
        sink.body = body_html;

        trace!(title = %sink.title, authors = sink.authors.len(), "parsed markdown document");
        Ok(sink)
    }
}

/// Split a leading `---` front matter block from the body.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let content = content.trim_start_matches('\u{feff}');
    let rest = content.strip_prefix(DELIMITER)?;
    let after_first = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    // The closing delimiter must sit on its own line.
    let mut offset = 0;
    for line in after_first.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let front = &after_first[..offset];
            let body = &after_first[offset + line.len()..];
            return Some((front, body));
        }
        offset += line.len();
    }
    None
}

fn head_markup(description: Option<&str>, keywords: &[String]) -> String {
    let mut head = String::new();
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        head.push_str(&format!(
            "<meta name=\"description\" content=\"{}\" />\n",
            html_escape(description.trim())
        ));
    }
    if !keywords.is_empty() {
        head.push_str(&format!(
            "<meta name=\"keywords\" content=\"{}\" />\n",
            html_escape(&keywords.join(", "))
        ));
    }
    head
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Sink {
        MarkdownParser::new()
            .parse(content, &ParseOptions::default())
            .unwrap()
    }

    #[test]
    fn test_parse_simple_markdown() {
        let content = r#"---
title: "Test Post"
author: Jane Doe
date: 2024-03-05
---

# Hello World

This is a test."#;

        let sink = parse(content);

        assert_eq!(sink.title, "Test Post");
        assert_eq!(sink.authors, vec!["Jane Doe"]);
        assert_eq!(sink.date(), Some("2024-03-05"));
        assert!(sink.body.contains("<h1>Hello World</h1>"));
        assert!(sink.body.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_title_from_first_heading() {
        let sink = parse("Intro text\n\n# The `Real` Title\n\n# Second\n");
        assert_eq!(sink.title, "The Real Title");
    }

    #[test]
    fn test_no_front_matter_no_heading() {
        let sink = parse("Just a paragraph.");
        assert_eq!(sink.title, "");
        assert!(sink.authors.is_empty());
        assert!(sink.date.is_none());
        assert!(sink.head.is_empty());
    }

    #[test]
    fn test_authors_list_and_head_meta() {
        let content = r#"---
authors:
  - Ann
  - Bob
description: "Fish & chips"
keywords: [food, uk]
---
Body"#;

        let sink = parse(content);
        assert_eq!(sink.authors, vec!["Ann", "Bob"]);
        assert!(sink.head.contains("content=\"Fish &amp; chips\""));
        assert!(sink.head.contains("content=\"food, uk\""));
    }

    #[test]
    fn test_comments_dropped_unless_emitted() {
        let content = "Before\n\n<!--\nhidden\n-->\n\nText <!-- inline --> after\n";
        let parser = MarkdownParser::new();

        let stripped = parser
            .parse(content, &ParseOptions { emit_comments: false })
            .unwrap();
        assert!(!stripped.body.contains("hidden"));
        assert!(!stripped.body.contains("inline"));
        assert!(stripped.body.contains("Before"));
        assert!(stripped.body.contains("after"));

        let kept = parser
            .parse(content, &ParseOptions { emit_comments: true })
            .unwrap();
        assert!(kept.body.contains("hidden"));
        assert!(kept.body.contains("<!-- inline -->"));
    }

    #[test]
    fn test_invalid_front_matter_reports_line() {
        let content = "---\ntitle: ok\nauthors: [unclosed\n---\nBody";
        let err = MarkdownParser::new()
            .parse(content, &ParseOptions::default())
            .unwrap_err();

        assert!(err.message.contains("front matter"));
        assert!(err.line.is_some());
    }

    #[test]
    fn test_split_requires_closing_line() {
        assert!(split_front_matter("--- not front matter").is_none());
        assert!(split_front_matter("---\ntitle: x\n").is_none());

        let (front, body) = split_front_matter("---\ntitle: x\n---\nbody").unwrap();
        assert_eq!(front, "title: x\n");
        assert_eq!(body, "body");
    }

    #[test]
    fn test_tables_enabled() {
        let sink = parse("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(sink.body.contains("<table>"));
    }
}
