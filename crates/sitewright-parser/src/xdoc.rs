//! Parser for xdoc, the structured XML document dialect.
//!
//! ```xml
//! <document>
//!   <properties>
//!     <title>Welcome</title>
//!     <author email="jane@example.com">Jane Doe</author>
//!     <date>2024-03-05</date>
//!   </properties>
//!   <head><meta name="keywords" content="a, b"/></head>
//!   <body><section name="Intro"><p>Hello</p></section></body>
//! </document>
//! ```
//!
//! The contents of `<head>` and `<body>` are copied through verbatim.

use quick_xml::{
    Reader, Writer,
    events::{BytesText, Event},
};
use sitewright_core::ContentType;
use tracing::trace;

use crate::{ParseError, ParseOptions, Parser, sink::Sink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Properties,
    Head,
    Body,
}

/// Parser for `<document>` XML sources.
#[derive(Debug, Clone, Default)]
pub struct XdocParser;

impl XdocParser {
    /// Create a new xdoc parser.
    pub fn new() -> Self {
        Self
    }
}

impl Parser for XdocParser {
    fn content_type(&self) -> ContentType {
        ContentType::StructuredMarkup
    }

    fn parse(&self, text: &str, options: &ParseOptions) -> Result<Sink, ParseError> {
        let mut reader = Reader::from_str(text);
        let mut sink = Sink::new();

        let mut section = Section::Outside;
        let mut depth = 0usize;
        let mut saw_root = false;
        let mut property: Option<Vec<u8>> = None;
        let mut property_text = String::new();
        let mut writer = Writer::new(Vec::new());

        loop {
            let position = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| {
                ParseError::at_offset(text, reader.error_position() as usize, e.to_string())
            })?;

            match (section, event) {
                (_, Event::Eof) => break,

                (_, Event::Comment(_)) if !options.emit_comments => {}

                (Section::Outside, Event::Start(e)) => match e.local_name().as_ref() {
                    b"document" => saw_root = true,
                    b"properties" => section = Section::Properties,
                    b"head" => section = Section::Head,
                    b"body" => section = Section::Body,
                    _ if !saw_root => {
                        return Err(ParseError::at_offset(
                            text,
                            position,
                            "root element must be <document>",
                        ));
                    }
                    _ => {}
                },
                (Section::Outside, Event::Empty(e)) if !saw_root => {
                    if e.local_name().as_ref() != b"document" {
                        return Err(ParseError::at_offset(
                            text,
                            position,
                            "root element must be <document>",
                        ));
                    }
                    saw_root = true;
                }
                (Section::Outside, _) => {}

                (Section::Properties, Event::Start(e)) => {
                    if depth == 0 {
                        property = Some(e.local_name().as_ref().to_vec());
                        property_text.clear();
                    }
                    depth += 1;
                }
                (Section::Properties, Event::End(_)) => {
                    if depth == 0 {
                        section = Section::Outside;
                        continue;
                    }
                    depth -= 1;
                    if depth == 0 {
                        let value = property_text.trim().to_string();
                        match property.take().as_deref() {
                            Some(b"title") => sink.title = value,
                            Some(b"author") if !value.is_empty() => sink.authors.push(value),
                            Some(b"date") => sink.date = Some(value),
                            _ => {}
                        }
                    }
                }
                (Section::Properties, Event::Text(t)) => {
                    if property.is_some() {
                        property_text.push_str(&unescape(text, position, &t)?);
                    }
                }
                (Section::Properties, Event::CData(c)) => {
                    if property.is_some() {
                        property_text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                (Section::Properties, _) => {}

                (Section::Head | Section::Body, Event::End(e)) if depth == 0 => {
                    let markup = String::from_utf8_lossy(&std::mem::take(writer.get_mut()))
                        .trim()
                        .to_string();
                    if section == Section::Head {
                        sink.head = markup;
                    } else {
                        sink.body = markup;
                    }
                    trace!(section = %String::from_utf8_lossy(e.local_name().as_ref()), "closed section");
                    section = Section::Outside;
                }
                (Section::Head | Section::Body, event) => {
                    match &event {
                        Event::Start(_) => depth += 1,
                        Event::End(_) => depth -= 1,
                        _ => {}
                    }
                    writer
                        .write_event(event)
                        .map_err(|e| ParseError::at_offset(text, position, e.to_string()))?;
                }
            }
        }

        if !saw_root {
            return Err(ParseError {
                line: Some(1),
                message: "missing <document> root element".to_string(),
            });
        }

        trace!(title = %sink.title, authors = sink.authors.len(), "parsed xdoc document");
        Ok(sink)
    }
}

fn unescape(text: &str, position: usize, t: &BytesText<'_>) -> Result<String, ParseError> {
    t.unescape()
        .map(|s| s.into_owned())
        .map_err(|e| ParseError::at_offset(text, position, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<document>
  <properties>
    <title>Welcome &amp; Hello</title>
    <author email="jane@example.com">Jane Doe</author>
    <author>John Roe</author>
    <date>2024-03-05</date>
  </properties>
  <head>
    <meta name="keywords" content="a, b"/>
  </head>
  <body>
    <!-- editorial note -->
    <section name="Intro">
      <p>Hello <b>world</b></p>
    </section>
  </body>
</document>
"#;

    fn parse(content: &str, emit_comments: bool) -> Result<Sink, ParseError> {
        XdocParser::new().parse(content, &ParseOptions { emit_comments })
    }

    #[test]
    fn test_parse_properties() {
        let sink = parse(DOC, false).unwrap();

        assert_eq!(sink.title, "Welcome & Hello");
        assert_eq!(sink.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(sink.date(), Some("2024-03-05"));
    }

    #[test]
    fn test_head_and_body_copied() {
        let sink = parse(DOC, false).unwrap();

        assert!(sink.head.contains(r#"<meta name="keywords" content="a, b"/>"#));
        assert!(sink.body.contains(r#"<section name="Intro">"#));
        assert!(sink.body.contains("<p>Hello <b>world</b></p>"));
        assert!(sink.body.ends_with("</section>"));
    }

    #[test]
    fn test_comments_follow_option() {
        let stripped = parse(DOC, false).unwrap();
        assert!(!stripped.body.contains("editorial note"));

        let kept = parse(DOC, true).unwrap();
        assert!(kept.body.contains("<!-- editorial note -->"));
    }

    #[test]
    fn test_minimal_document() {
        let sink = parse("<document/>", false).unwrap();
        assert_eq!(sink, Sink::new());
    }

    #[test]
    fn test_wrong_root_rejected() {
        let err = parse("<html><body/></html>", false).unwrap_err();
        assert!(err.message.contains("<document>"));
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_mismatched_tag_reports_line() {
        let content = "<document>\n<body>\n<p>text</b>\n</body>\n</document>";
        let err = parse(content, false).unwrap_err();
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = parse("", false).unwrap_err();
        assert!(err.message.contains("missing <document>"));
    }
}
