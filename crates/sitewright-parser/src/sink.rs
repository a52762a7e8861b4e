//! The accumulated result of parsing one document.

/// Facts a parser collected from one document.
///
/// Produced fresh per document and consumed once when the page context is
/// built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sink {
    /// Document title.
    pub title: String,

    /// Document authors, in source order.
    pub authors: Vec<String>,

    /// Creation date as written in the source (expected `yyyy-MM-dd`).
    pub date: Option<String>,

    /// Markup destined for the page `<head>`.
    pub head: String,

    /// Rendered document body.
    pub body: String,
}

impl Sink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The creation date, if it is present and non-empty.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_date_is_absent() {
        let mut sink = Sink::new();
        assert!(sink.date().is_none());

        sink.date = Some("  ".to_string());
        assert!(sink.date().is_none());

        sink.date = Some(" 2024-03-05 ".to_string());
        assert_eq!(sink.date(), Some("2024-03-05"));
    }
}
