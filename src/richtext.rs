//! Styled text fragments for narrative paragraphs.
//!
//! Report sentences are written with a tiny markup (`**bold**`, `*italic*`)
//! and turned into [`Span`]s, which map onto `genpdf` styled strings.

use std::fmt;

use genpdf::style::{Color, Style, StyledString};

/// A piece of text with inline style attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    italic: bool,
    color: Option<Color>,
    size: Option<u8>,
}

impl Span {
    /// Creates an unstyled span.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns the raw text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Font size override in points.
    pub fn size(&self) -> Option<u8> {
        self.size
    }

    /// Marks the span as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Marks the span as italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Assigns a text color.
    pub fn colored(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Overrides the font size.
    pub fn sized(mut self, size: u8) -> Self {
        self.size = Some(size);
        self
    }

    fn to_style(&self) -> Style {
        let mut style = Style::new();
        if let Some(color) = self.color {
            style.set_color(color);
        }
        if let Some(size) = self.size {
            style.set_font_size(size);
        }
        if self.bold {
            style.set_bold();
        }
        if self.italic {
            style.set_italic();
        }
        style
    }

    /// Converts the span into a `genpdf` styled string.
    pub fn to_styled_string(&self) -> StyledString {
        StyledString::new(self.text.clone(), self.to_style())
    }
}

impl From<&Span> for StyledString {
    fn from(span: &Span) -> Self {
        span.to_styled_string()
    }
}

/// Error produced by [`parse_markup`] for unbalanced markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    index: usize,
    message: String,
}

impl ParseError {
    /// Byte offset where the problem was detected.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.index)
    }
}

impl std::error::Error for ParseError {}

/// Splits `input` into spans, toggling bold on `**` and italic on `*`.
///
/// Markers may nest (`**bold *and italic***`). Every opened marker must be closed.
pub fn parse_markup(input: &str) -> Result<Vec<Span>, ParseError> {
    let mut spans = Vec::new();
    let mut buffer = String::new();
    let mut bold_opened_at: Option<usize> = None;
    let mut italic_opened_at: Option<usize> = None;
    let mut index = 0;

    let flush = |buffer: &mut String, spans: &mut Vec<Span>, bold: bool, italic: bool| {
        if !buffer.is_empty() {
            spans.push(Span {
                text: std::mem::take(buffer),
                bold,
                italic,
                ..Span::default()
            });
        }
    };

    while index < input.len() {
        let rest = &input[index..];
        if rest.starts_with("**") {
            flush(
                &mut buffer,
                &mut spans,
                bold_opened_at.is_some(),
                italic_opened_at.is_some(),
            );
            bold_opened_at = match bold_opened_at {
                Some(_) => None,
                None => Some(index),
            };
            index += 2;
        } else if rest.starts_with('*') {
            flush(
                &mut buffer,
                &mut spans,
                bold_opened_at.is_some(),
                italic_opened_at.is_some(),
            );
            italic_opened_at = match italic_opened_at {
                Some(_) => None,
                None => Some(index),
            };
            index += 1;
        } else if let Some(ch) = rest.chars().next() {
            buffer.push(ch);
            index += ch.len_utf8();
        }
    }

    if let Some(opened) = bold_opened_at {
        return Err(ParseError {
            index: opened,
            message: "unterminated bold span".to_owned(),
        });
    }
    if let Some(opened) = italic_opened_at {
        return Err(ParseError {
            index: opened,
            message: "unterminated italic span".to_owned(),
        });
    }

    flush(&mut buffer, &mut spans, false, false);
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_style_reflects_flags() {
        let styled = Span::new("r = -0.42")
            .bold()
            .sized(14)
            .colored(Color::Rgb(16, 24, 40))
            .to_styled_string();
        assert_eq!(styled.s, "r = -0.42");
        assert!(styled.style.is_bold());
        assert!(!styled.style.is_italic());
        assert_eq!(styled.style.font_size(), 14);
        assert_eq!(styled.style.color(), Some(Color::Rgb(16, 24, 40)));
    }

    #[test]
    fn plain_text_is_one_span() {
        let spans = parse_markup("Weekly ratings (ISO weeks)").unwrap();
        assert_eq!(spans, vec![Span::new("Weekly ratings (ISO weeks)")]);
    }

    #[test]
    fn nested_markers_combine() {
        let spans = parse_markup("trend is **strongly *negative***.").unwrap();
        let texts: Vec<_> = spans.iter().map(Span::text).collect();
        assert_eq!(texts, vec!["trend is ", "strongly ", "negative", "."]);
        assert!(spans[1].is_bold() && !spans[1].is_italic());
        assert!(spans[2].is_bold() && spans[2].is_italic());
        assert!(!spans[3].is_bold());
    }

    #[test]
    fn multibyte_text_survives() {
        let spans = parse_markup("**전체** 기준").unwrap();
        assert_eq!(spans[0].text(), "전체");
        assert!(spans[0].is_bold());
        assert_eq!(spans[1].text(), " 기준");
    }

    #[test]
    fn unterminated_bold_is_rejected() {
        let err = parse_markup("a **b").unwrap_err();
        assert_eq!(err.index(), 2);
        assert!(err.message().contains("unterminated bold"));
    }
}
