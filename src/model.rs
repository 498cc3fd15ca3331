//! Data structures describing the logical content of the report document.
//!
//! The report is assembled as plain values (a [`Cover`] followed by
//! [`Section`]s of [`Block`]s) and only turned into `genpdf` elements by
//! [`crate::builder::PdfBuilder`]. Keeping the layout as data lets the report
//! composer be tested without fonts or a renderer.

use std::path::{Path, PathBuf};

use crate::richtext::Span;

/// Horizontal placement of an image and its caption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
}

/// Left-aligned paragraph of styled spans.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichParagraph {
    spans: Vec<Span>,
}

impl RichParagraph {
    /// Creates a paragraph from the provided spans.
    pub fn new(spans: impl Into<Vec<Span>>) -> Self {
        Self {
            spans: spans.into(),
        }
    }

    /// Creates a paragraph holding one unstyled span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Span::new(text)])
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Concatenated text of all spans.
    pub fn text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }
}

/// An image file with an optional caption and a target width in millimetres.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    path: PathBuf,
    caption: Option<RichParagraph>,
    alignment: HorizontalAlignment,
    width_mm: Option<f64>,
}

impl ImageBlock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            caption: None,
            alignment: HorizontalAlignment::Left,
            width_mm: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn caption(&self) -> Option<&RichParagraph> {
        self.caption.as_ref()
    }

    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    pub fn width_mm(&self) -> Option<f64> {
        self.width_mm
    }

    /// Sets the caption and returns the updated image block.
    pub fn with_caption(mut self, caption: impl Into<Option<RichParagraph>>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Sets the alignment and returns the updated image block.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Constrains the rendered width (in millimetres) while keeping the aspect ratio.
    pub fn with_width_mm(mut self, width_mm: impl Into<Option<f64>>) -> Self {
        self.width_mm = width_mm.into();
        self
    }
}

/// A framed table of paragraphs.
///
/// Column weights are relative; `[1, 4]` gives the second column four times
/// the width of the first.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    column_weights: Vec<usize>,
    rows: Vec<Vec<RichParagraph>>,
    header: Option<RichParagraph>,
}

impl TableBlock {
    /// Creates an empty table with the given column weights.
    pub fn new(column_weights: impl Into<Vec<usize>>) -> Self {
        Self {
            column_weights: column_weights.into(),
            rows: Vec::new(),
            header: None,
        }
    }

    pub fn column_weights(&self) -> &[usize] {
        &self.column_weights
    }

    pub fn rows(&self) -> &[Vec<RichParagraph>] {
        &self.rows
    }

    /// Title row spanning all columns, if any.
    pub fn header(&self) -> Option<&RichParagraph> {
        self.header.as_ref()
    }

    /// Sets a title row spanning the whole table.
    pub fn with_header(mut self, header: impl Into<Option<RichParagraph>>) -> Self {
        self.header = header.into();
        self
    }

    /// Appends a row. Missing cells are rendered empty; extra cells are dropped.
    pub fn with_row(mut self, cells: impl Into<Vec<RichParagraph>>) -> Self {
        let mut cells = cells.into();
        cells.resize_with(self.column_weights.len(), RichParagraph::default);
        self.rows.push(cells);
        self
    }

    /// Appends a label/value row with a bold label.
    pub fn with_labeled_row(self, label: impl Into<String>, value: RichParagraph) -> Self {
        self.with_row(vec![RichParagraph::new(vec![Span::new(label).bold()]), value])
    }
}

/// Individual content blocks that make up the cover and sections.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Styled paragraph content.
    Paragraph(RichParagraph),
    /// Sub-heading inside a page.
    Heading(String),
    /// Bulleted list, one paragraph per item.
    Bullets(Vec<RichParagraph>),
    /// Framed table.
    Table(TableBlock),
    /// Captioned image content.
    Image(ImageBlock),
    /// Images placed side by side in equal-width columns.
    ImageRow(Vec<ImageBlock>),
    /// Vertical gap in millimetres.
    Spacer(f64),
    /// Explicit page break request.
    PageBreak,
}

impl Block {
    /// Convenience helper for building a paragraph block.
    pub fn paragraph(spans: impl Into<Vec<Span>>) -> Self {
        Self::Paragraph(RichParagraph::new(spans))
    }

    /// Heading block.
    pub fn heading(text: impl Into<String>) -> Self {
        Self::Heading(text.into())
    }

    /// Bullet list from plain strings.
    pub fn bullets<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Bullets(items.into_iter().map(RichParagraph::plain).collect())
    }
}

/// First page of the document: title, subtitle and free-form blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Cover {
    title: String,
    subtitle: Option<String>,
    blocks: Vec<Block>,
}

impl Cover {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            blocks: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Sets the subtitle and returns the updated cover.
    pub fn with_subtitle(mut self, subtitle: impl Into<Option<String>>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    /// Extends the cover with multiple blocks and returns the updated instance.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }
}

/// A titled run of blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    title: String,
    blocks: Vec<Block>,
}

impl Section {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Creates a builder that can start the section on a fresh page.
    pub fn builder(title: impl Into<String>) -> SectionBuilder {
        SectionBuilder::new(title)
    }

    /// Returns `true` when the section opens with a page break.
    pub fn starts_on_new_page(&self) -> bool {
        matches!(self.blocks.first(), Some(Block::PageBreak))
    }
}

/// Builder for [`Section`] values.
#[derive(Clone, Debug, Default)]
pub struct SectionBuilder {
    title: String,
    blocks: Vec<Block>,
    start_on_new_page: bool,
}

impl SectionBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Marks the section to start on a new page.
    pub fn start_on_new_page(mut self, start_on_new_page: bool) -> Self {
        self.start_on_new_page = start_on_new_page;
        self
    }

    /// Pushes an additional block into the section.
    pub fn push_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Extends the builder with multiple blocks.
    pub fn extend_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }

    /// Builds the section, injecting a leading page break when requested.
    pub fn build(mut self) -> Section {
        if self.start_on_new_page && !matches!(self.blocks.first(), Some(Block::PageBreak)) {
            self.blocks.insert(0, Block::PageBreak);
        }

        Section {
            title: self.title,
            blocks: self.blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_inserts_page_break() {
        let section = Section::builder("Findings")
            .start_on_new_page(true)
            .push_block(Block::heading("Weekly trend"))
            .build();

        assert!(section.starts_on_new_page());
        assert_eq!(section.blocks().len(), 2);
    }

    #[test]
    fn builder_does_not_duplicate_page_break() {
        let section = Section::builder("Findings")
            .start_on_new_page(true)
            .push_block(Block::PageBreak)
            .build();

        assert_eq!(section.blocks(), &[Block::PageBreak]);
    }

    #[test]
    fn table_rows_are_padded_to_column_count() {
        let table = TableBlock::new(vec![1, 4])
            .with_row(vec![RichParagraph::plain("Pearson r")])
            .with_labeled_row("Spearman", RichParagraph::plain("0.5"));

        assert!(table.rows().iter().all(|row| row.len() == 2));
        assert_eq!(table.rows()[0][1], RichParagraph::default());
        assert!(table.rows()[1][0].spans()[0].is_bold());
    }
}
