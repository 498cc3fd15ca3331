//! Document construction: page setup and lowering of the content model into `genpdf` elements.

use std::fmt;

use genpdf::elements::{
    Break, FrameCellDecorator, LinearLayout, PageBreak, Paragraph, TableLayout, UnorderedList,
};
use genpdf::error::{Error, ErrorKind};
use genpdf::style::{self, Style};
use genpdf::{self, Alignment, Element, Margins, Mm, PageDecorator, PaperSize, Position, Size};
use log::debug;

use crate::elements::{mm_from_f64, CaptionedImage};
use crate::fonts;
use crate::model::{
    Block, Cover, HorizontalAlignment, ImageBlock, RichParagraph, Section, TableBlock,
};

const BODY_FONT_SIZE: u8 = 10;
const TITLE_FONT_SIZE: u8 = 20;
const SUBTITLE_FONT_SIZE: u8 = 11;
const HEADING_FONT_SIZE: u8 = 13;
const LINE_SPACING: f64 = 1.3;
const BULLET: &str = "\u{2022}";

type ElementFactory = dyn Fn(usize) -> Box<dyn Element>;

/// Builder for `genpdf::Document` instances with page size, margins and a footer.
#[derive(Default)]
pub struct DocumentBuilder {
    paper_size: Option<Size>,
    margins: Option<Margins>,
    footer: Option<FooterSpec>,
}

impl DocumentBuilder {
    /// Creates a new builder instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the paper size used for newly created documents.
    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    /// Sets the margins applied through the page decorator.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = Some(margins.into());
        self
    }

    /// Configures a footer callback with a fixed height that is invoked for every page.
    pub fn with_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.footer = Some(FooterSpec::new(height, footer));
        self
    }

    /// Builds a `genpdf::Document` using the resolved document font.
    pub fn build(self) -> Result<genpdf::Document, PdfBuildError> {
        let font_family = fonts::document_font_family().map_err(PdfBuildError::FontLoad)?;
        let mut document = genpdf::Document::new(font_family);
        document.set_font_size(BODY_FONT_SIZE);
        document.set_line_spacing(LINE_SPACING);

        if let Some(paper_size) = self.paper_size {
            document.set_paper_size(paper_size);
        }

        let decorator = ConfiguredPageDecorator::new(self.margins, self.footer);
        document.set_page_decorator(decorator);

        Ok(document)
    }
}

/// Definition of a footer rendered through the page decorator.
pub struct FooterSpec {
    height: Mm,
    factory: Box<ElementFactory>,
}

impl FooterSpec {
    /// Creates a new footer definition.
    pub fn new<F, E>(height: impl Into<Mm>, factory: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        Self {
            height: height.into(),
            factory: Box::new(move |page| Box::new(factory(page)) as Box<dyn Element>),
        }
    }
}

struct ConfiguredPageDecorator {
    page: usize,
    margins: Option<Margins>,
    footer: Option<FooterSpec>,
}

impl ConfiguredPageDecorator {
    fn new(margins: Option<Margins>, footer: Option<FooterSpec>) -> Self {
        Self {
            page: 0,
            margins,
            footer,
        }
    }
}

impl PageDecorator for ConfiguredPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;

        if let Some(margins) = self.margins {
            area.add_margins(margins);
        }

        if let Some(footer) = &self.footer {
            let available = area.size().height;
            if footer.height > available {
                return Err(Error::new(
                    "Footer height exceeds available space",
                    ErrorKind::InvalidData,
                ));
            }

            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, available - footer.height));
            let mut element = (footer.factory)(self.page);
            let result = element.render(context, footer_area, style)?;
            if result.has_more {
                return Err(Error::new(
                    "Footer element does not fit into the reserved space",
                    ErrorKind::PageSizeExceeded,
                ));
            }

            area.set_height(available - footer.height);
        }

        Ok(area)
    }
}

/// Failures while turning the content model into PDF bytes.
#[derive(Debug)]
pub enum PdfBuildError {
    /// No usable document font could be loaded.
    FontLoad(Error),
    /// An image block could not be decoded.
    Image(Error),
    /// A table or layout could not be assembled.
    Layout(Error),
    /// `genpdf` failed while rendering pages.
    Render(Error),
}

impl fmt::Display for PdfBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FontLoad(err) => write!(f, "Failed to load document font: {err}"),
            Self::Image(err) => write!(f, "Failed to load image: {err}"),
            Self::Layout(err) => write!(f, "Failed to lay out content: {err}"),
            Self::Render(err) => write!(f, "Failed to render PDF: {err}"),
        }
    }
}

impl std::error::Error for PdfBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FontLoad(err) | Self::Image(err) | Self::Layout(err) | Self::Render(err) => {
                Some(err)
            }
        }
    }
}

/// Rendered document bytes.
#[derive(Clone, Debug)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
}

/// Renders a [`Cover`] and [`Section`]s into an A4 PDF.
pub struct PdfBuilder {
    document: DocumentBuilder,
    cover: Option<Cover>,
    sections: Vec<Section>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    /// Creates a builder for an A4 document with 18/16 mm margins.
    pub fn new() -> Self {
        Self {
            document: DocumentBuilder::new()
                .with_paper_size(PaperSize::A4)
                .with_margins((16, 18, 16, 18)),
            cover: None,
            sections: Vec::new(),
        }
    }

    /// Sets the cover page content.
    pub fn with_cover(mut self, cover: Cover) -> Self {
        self.cover = Some(cover);
        self
    }

    /// Appends a section.
    pub fn add_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Configures a per-page footer of fixed height.
    pub fn with_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.document = self.document.with_footer(height, footer);
        self
    }

    /// Lowers the content model and renders it into PDF bytes.
    pub fn render(self) -> Result<RenderedPdf, PdfBuildError> {
        let mut document = self.document.build()?;

        if let Some(cover) = &self.cover {
            document.set_title(cover.title());
            document.push(title_paragraph(cover.title()));
            if let Some(subtitle) = cover.subtitle() {
                let mut line = Paragraph::new(subtitle);
                line.set_alignment(Alignment::Center);
                document.push(line.styled(Style::new().with_font_size(SUBTITLE_FONT_SIZE)));
            }
            document.push(Break::new(1.0));
            for block in cover.blocks() {
                push_block(&mut document, block)?;
            }
        }

        for section in &self.sections {
            let mut blocks = section.blocks();
            if let Some((Block::PageBreak, rest)) = blocks.split_first() {
                document.push(PageBreak::new());
                blocks = rest;
            }
            document.push(title_paragraph(section.title()));
            for block in blocks {
                push_block(&mut document, block)?;
            }
        }

        let mut bytes = Vec::new();
        document.render(&mut bytes).map_err(PdfBuildError::Render)?;
        debug!("Rendered PDF document ({} bytes)", bytes.len());
        Ok(RenderedPdf { bytes })
    }
}

fn alignment(value: HorizontalAlignment) -> Alignment {
    match value {
        HorizontalAlignment::Left => Alignment::Left,
        HorizontalAlignment::Center => Alignment::Center,
    }
}

fn title_paragraph(text: &str) -> impl Element {
    let mut title = Paragraph::new(text);
    title.set_alignment(Alignment::Center);
    title
        .styled(Style::new().bold().with_font_size(TITLE_FONT_SIZE))
        .padded((0, 0, 3, 0))
}

fn paragraph(content: &RichParagraph) -> Paragraph {
    let mut paragraph = Paragraph::default();
    for span in content.spans() {
        paragraph.push(span.to_styled_string());
    }
    paragraph
}

fn captioned_image(block: &ImageBlock) -> Result<CaptionedImage, PdfBuildError> {
    let element = CaptionedImage::from_path(block.path()).map_err(PdfBuildError::Image)?;

    Ok(element
        .with_caption(block.caption().map(paragraph))
        .with_alignment(alignment(block.alignment()))
        .with_width(block.width_mm().map(mm_from_f64)))
}

fn table(block: &TableBlock) -> Result<LinearLayout, PdfBuildError> {
    let mut layout = LinearLayout::vertical();

    if let Some(header) = block.header() {
        let mut title = TableLayout::new(vec![1]);
        title.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        title
            .row()
            .element(
                paragraph(header)
                    .styled(Style::new().bold())
                    .padded(2),
            )
            .push()
            .map_err(PdfBuildError::Layout)?;
        layout.push(title);
    }

    let mut body = TableLayout::new(block.column_weights().to_vec());
    body.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    for cells in block.rows() {
        let mut row = body.row();
        for cell in cells {
            row.push_element(paragraph(cell).padded(2));
        }
        row.push().map_err(PdfBuildError::Layout)?;
    }
    layout.push(body);
    Ok(layout)
}

fn push_block(document: &mut genpdf::Document, block: &Block) -> Result<(), PdfBuildError> {
    match block {
        Block::Paragraph(content) => document.push(paragraph(content)),
        Block::Heading(text) => document.push(
            Paragraph::new(text.as_str())
                .styled(Style::new().bold().with_font_size(HEADING_FONT_SIZE))
                .padded((3, 0, 1, 0)),
        ),
        Block::Bullets(items) => {
            let mut list = UnorderedList::with_bullet(BULLET);
            for item in items {
                list.push(paragraph(item));
            }
            document.push(list);
        }
        Block::Table(content) => {
            document.push(table(content)?);
        }
        Block::Image(content) => document.push(captioned_image(content)?),
        Block::ImageRow(images) => {
            if images.is_empty() {
                return Ok(());
            }
            let mut row_layout = TableLayout::new(vec![1; images.len()]);
            let mut row = row_layout.row();
            for image in images {
                row.push_element(captioned_image(image)?.padded((0, 2, 0, 2)));
            }
            row.push().map_err(PdfBuildError::Layout)?;
            document.push(row_layout);
        }
        Block::Spacer(height_mm) => {
            document.push(Break::new(0.0).padded(Margins::trbl(mm_from_f64(*height_mm), 0, 0, 0)))
        }
        Block::PageBreak => document.push(PageBreak::new()),
    }
    Ok(())
}
