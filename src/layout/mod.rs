//! # Banded Layout Engine
//!
//! Turns an [`ElementTree`] plus a [`DataStore`] into positioned pages.
//!
//! The engine never builds one tall canvas to slice afterwards. Each
//! top-level element of the details section is expanded into *blocks*
//! (a row, one grid row, one line of html) whose height is known before
//! placement. A block is then placed on the current page or, if it does not
//! fit, on a fresh page:
//!
//! 1. Header and footer are measured once. The body runs from under the
//!    header to above the footer.
//! 2. Before placing a block, ask: does it fit below the cursor? Blocks are
//!    never split. A page that holds no body content yet takes the block
//!    regardless, so an oversized block cannot loop forever.
//! 3. When a datagrid continues on a new page, its column header row is
//!    placed again first. The last data row stays with the grid footer.
//! 4. Header and footer are stamped onto every page, with `{{page}}`
//!    replaced by the page number.
//!
//! Geometry is in millimetres with the origin at the top-left of the page.

pub mod grid;
pub mod page_break;

use std::sync::Arc;

use crate::barcode::{self, EncodeOptions, Symbol};
use crate::data::DataStore;
use crate::error::ReportError;
use crate::font::{Font, FontContext};
use crate::image_loader::{self, LoadedImage};
use crate::model::props::{BarcodeProps, CellProps, HlineProps, HtmlProps, ImageProps, RowProps};
use crate::model::{ElementId, ElementTree, Properties, ReportConfig, Section};
use crate::style::{Align, Borders, Color, Dimension, FontStyle};
use crate::text::{html, StyledChar};
use page_break::{decide_break, BodySpace, BreakDecision};

/// Horizontal padding inside a cell, each side.
pub const CELL_PADDING: f64 = 1.0;

/// Bar height of a linear barcode without an explicit `height`.
pub const DEFAULT_BARCODE_HEIGHT: f64 = 10.0;

const HLINE_THICKNESS: f64 = 0.2;
const DEFAULT_HLINE_GAP: f64 = 1.0;
const PAGE_PLACEHOLDER: &str = "{{page}}";

/// A laid-out page ready for a render backend.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    /// 1-based.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// One positioned draw instruction. `(x, y)` is the top-left corner.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

/// What to draw inside an element's box.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Background fill and any subset of the four edges.
    Rect {
        fill: Option<Color>,
        borders: Borders,
        border_color: Color,
    },
    /// A straight line from `(x, y)` to `(x + width, y + height)`.
    Line { color: Color, thickness: f64 },
    /// One line of text, aligned inside the box. The box height is the line
    /// height.
    Text {
        text: String,
        font: Font,
        color: Color,
        underline: bool,
        align: Align,
    },
    /// An image scaled to fill the box.
    Image { image: Arc<LoadedImage> },
    /// A barcode scaled to fill the box.
    Symbol { symbol: Arc<Symbol>, color: Color },
}

/// An unsplittable slice of content, positioned relative to its own top.
#[derive(Debug, Clone, Default)]
pub(crate) struct Block {
    pub height: f64,
    pub elements: Vec<LayoutElement>,
    /// Start on a new page if the current one holds body content.
    pub page_break: bool,
    /// Only place this block where the next one fits too.
    pub keep_with_next: bool,
    /// Re-place this block at the top of every continuation page of its
    /// element (datagrid header rows).
    pub repeat_on_break: bool,
}

impl Block {
    fn new(height: f64, elements: Vec<LayoutElement>) -> Self {
        Self {
            height,
            elements,
            ..Default::default()
        }
    }

    /// The block's elements moved down to `top`, with `{{page}}` filled in.
    fn placed(&self, top: f64, page: usize) -> impl Iterator<Item = LayoutElement> + '_ {
        self.elements.iter().map(move |el| {
            let mut el = el.clone();
            el.y += top;
            if let DrawCommand::Text { text, .. } = &mut el.draw {
                if text.contains(PAGE_PLACEHOLDER) {
                    *text = text.replace(PAGE_PLACEHOLDER, &page.to_string());
                }
            }
            el
        })
    }
}

/// Resolve child widths along a row of `container` millimetres.
///
/// The gaps come off first. Absolute widths are honoured as given, even past
/// the container. Percentages are taken of the space left after the gaps,
/// clamped to what the absolute widths and earlier percentages leave over.
/// Children without a width share the rest equally.
pub fn resolve_widths(dims: &[Option<Dimension>], container: f64, gap: f64) -> Vec<f64> {
    let n = dims.len();
    if n == 0 {
        return Vec::new();
    }
    let available = (container - gap * (n - 1) as f64).max(0.0);

    let mut widths = vec![0.0; n];
    let mut remaining = available;
    for (i, dim) in dims.iter().enumerate() {
        if let Some(Dimension::Absolute(mm)) = dim {
            widths[i] = *mm;
            remaining -= mm;
        }
    }
    for (i, dim) in dims.iter().enumerate() {
        if let Some(pct @ Dimension::Percent(_)) = dim {
            let w = pct.resolve(available).min(remaining.max(0.0));
            widths[i] = w;
            remaining -= w;
        }
    }
    let auto = dims.iter().filter(|d| d.is_none()).count();
    if auto > 0 {
        let share = remaining.max(0.0) / auto as f64;
        for (i, dim) in dims.iter().enumerate() {
            if dim.is_none() {
                widths[i] = share;
            }
        }
    }
    widths
}

/// Text, font and decoration of one table-like cell.
#[derive(Debug, Clone)]
pub(crate) struct CellSpec {
    pub text: String,
    pub font: Font,
    pub color: Color,
    pub underline: bool,
    pub align: Align,
    pub borders: Borders,
    pub border_color: Color,
    pub fill: Option<Color>,
    pub multiline: bool,
    pub min_height: f64,
}

/// A row child after measuring.
enum Piece {
    Cell(CellSpec, Vec<String>),
    Image(Option<Arc<LoadedImage>>, f64),
    Barcode(BarcodeBox),
    Empty,
}

struct BarcodeBox {
    symbol: Arc<Symbol>,
    width: f64,
    symbol_height: f64,
    caption: Option<(String, Font)>,
}

/// Body geometry shared by every page.
#[derive(Debug, Clone, Copy)]
struct Frame {
    page_width: f64,
    page_height: f64,
    top: f64,
    body_top: f64,
    body_bottom: f64,
}

/// Where we are on the current page.
#[derive(Debug)]
struct PageCursor {
    number: usize,
    y: f64,
    /// Body content has been placed on this page.
    occupied: bool,
    elements: Vec<LayoutElement>,
}

impl PageCursor {
    fn new(number: usize, body_top: f64) -> Self {
        Self {
            number,
            y: body_top,
            occupied: false,
            elements: Vec::new(),
        }
    }
}

/// Mutable state of one layout run.
struct Run<'h> {
    frame: Frame,
    header: &'h [Block],
    footer: &'h [Block],
    pages: Vec<LayoutPage>,
    cursor: PageCursor,
}

impl<'h> Run<'h> {
    fn new(frame: Frame, header: &'h [Block], footer: &'h [Block]) -> Self {
        let mut run = Self {
            frame,
            header,
            footer,
            pages: Vec::new(),
            cursor: PageCursor::new(1, frame.body_top),
        };
        run.stamp_header();
        run
    }

    fn stamp_header(&mut self) {
        let header = self.header;
        let number = self.cursor.number;
        let mut y = self.frame.top;
        for block in header {
            self.cursor.elements.extend(block.placed(y, number));
            y += block.height;
        }
    }

    fn close(&mut self, mut cursor: PageCursor) {
        let footer = self.footer;
        let mut y = self.frame.body_bottom;
        for block in footer {
            cursor.elements.extend(block.placed(y, cursor.number));
            y += block.height;
        }
        self.pages.push(LayoutPage {
            number: cursor.number,
            width: self.frame.page_width,
            height: self.frame.page_height,
            elements: cursor.elements,
        });
    }

    fn open_page(&mut self) {
        let next = PageCursor::new(self.cursor.number + 1, self.frame.body_top);
        let done = std::mem::replace(&mut self.cursor, next);
        self.close(done);
        log::debug!("opening page {}", self.cursor.number);
        self.stamp_header();
    }

    fn space(&self) -> BodySpace {
        BodySpace {
            cursor: self.cursor.y,
            bottom: self.frame.body_bottom,
            occupied: self.cursor.occupied,
        }
    }

    fn place(&mut self, block: &Block) {
        let number = self.cursor.number;
        self.cursor
            .elements
            .extend(block.placed(self.cursor.y, number));
        self.cursor.y += block.height;
        if block.height > 0.0 || !block.elements.is_empty() {
            self.cursor.occupied = true;
        }
    }

    /// Place the blocks of one top-level element.
    fn flow(&mut self, blocks: &[Block]) {
        let repeat = blocks.iter().find(|b| b.repeat_on_break);
        for (i, block) in blocks.iter().enumerate() {
            let mut needed = block.height;
            if block.keep_with_next {
                needed += blocks.get(i + 1).map(|b| b.height).unwrap_or(0.0);
            }
            match decide_break(self.space(), needed, block.page_break) {
                BreakDecision::Place | BreakDecision::Overflow => {}
                BreakDecision::NewPage => {
                    self.open_page();
                    if let Some(header) = repeat.filter(|_| !block.repeat_on_break) {
                        self.place(header);
                    }
                }
            }
            if self.cursor.y + block.height > self.frame.body_bottom + 1e-6 {
                log::warn!(
                    "block of {:.1}mm overflows the body of page {} ({:.1}mm left)",
                    block.height,
                    self.cursor.number,
                    self.space().remaining()
                );
            }
            self.place(block);
        }
    }

    fn finish(mut self) -> Vec<LayoutPage> {
        let last = std::mem::replace(&mut self.cursor, PageCursor::new(0, 0.0));
        self.close(last);
        self.pages
    }
}

/// Lays out one report. Borrows the tree and data for the duration of the
/// run; both are read-only here.
pub struct LayoutEngine<'a> {
    tree: &'a ElementTree,
    data: &'a DataStore,
    config: &'a ReportConfig,
    fonts: FontContext,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(tree: &'a ElementTree, data: &'a DataStore, config: &'a ReportConfig) -> Self {
        Self {
            tree,
            data,
            config,
            fonts: FontContext::new(),
        }
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    /// Lay out every section. Fails without producing pages if the body has
    /// no room, a grid is bound to a non-list, or a barcode cannot be
    /// encoded.
    pub fn layout(&self) -> Result<Vec<LayoutPage>, ReportError> {
        let (page_width, page_height) = self.config.page_dimensions();
        let margins = self.config.margins;
        let content_width = page_width - margins.horizontal();
        if content_width <= 0.0 {
            return Err(ReportError::layout(format!(
                "margins leave no width on a {page_width}mm page"
            )));
        }

        let header = self.section_blocks(Section::Header)?;
        let footer = self.section_blocks(Section::Footer)?;
        let header_height: f64 = header.iter().map(|b| b.height).sum();
        let footer_height: f64 = footer.iter().map(|b| b.height).sum();

        let frame = Frame {
            page_width,
            page_height,
            top: margins.top,
            body_top: margins.top + header_height,
            body_bottom: page_height - margins.bottom - footer_height,
        };
        if frame.body_bottom - frame.body_top <= 0.0 {
            return Err(ReportError::layout(format!(
                "no room for the body: header {header_height:.1}mm and footer \
                 {footer_height:.1}mm on a {page_height}mm page"
            )));
        }

        let mut run = Run::new(frame, &header, &footer);
        for &id in self.tree.section(Section::Details) {
            let blocks = self.blocks(id)?;
            run.flow(&blocks);
        }
        let pages = run.finish();
        log::debug!("laid out {} page(s)", pages.len());
        Ok(pages)
    }

    fn content_width(&self) -> f64 {
        let (width, _) = self.config.page_dimensions();
        width - self.config.margins.horizontal()
    }

    fn left(&self) -> f64 {
        self.config.margins.left
    }

    /// Header and footer: every block stacked, no page breaks.
    fn section_blocks(&self, section: Section) -> Result<Vec<Block>, ReportError> {
        let mut blocks = Vec::new();
        for &id in self.tree.section(section) {
            blocks.extend(self.blocks(id)?);
        }
        Ok(blocks)
    }

    pub(crate) fn font(&self, style: FontStyle, size: Option<f64>) -> Font {
        self.fonts.font(
            &self.config.font_family,
            style,
            size.unwrap_or(self.config.font_size),
        )
    }

    pub(crate) fn data(&self) -> &DataStore {
        self.data
    }

    pub(crate) fn tree(&self) -> &ElementTree {
        self.tree
    }

    fn blocks(&self, id: ElementId) -> Result<Vec<Block>, ReportError> {
        let Some(element) = self.tree.get(id) else {
            return Ok(Vec::new());
        };
        match &element.props {
            Properties::Row(props) => Ok(vec![self.row_block(id, props)?]),
            Properties::Datagrid(props) => grid::grid_blocks(self, id, props),
            Properties::Html(props) => Ok(self.html_blocks(props)),
            Properties::Vgap(props) => {
                let mut block = Block::new(props.height.unwrap_or(0.0).max(0.0), Vec::new());
                block.page_break = props.page_break;
                Ok(vec![block])
            }
            Properties::Hline(props) => Ok(vec![self.hline_block(props)]),
            other => {
                log::debug!("`{}` #{} is not a block, skipped", other.kind(), id.index());
                Ok(Vec::new())
            }
        }
    }

    // ── rows ───────────────────────────────────────────────────────

    fn row_block(&self, id: ElementId, props: &RowProps) -> Result<Block, ReportError> {
        let children: Vec<&Properties> = self
            .tree
            .children(id)
            .iter()
            .filter_map(|&c| self.tree.get(c).map(|e| &e.props))
            .collect();
        let dims: Vec<Option<Dimension>> = children
            .iter()
            .map(|p| match p {
                Properties::Cell(c) => c.width,
                Properties::Image(i) => i.width,
                Properties::Barcode(b) => b.width,
                _ => None,
            })
            .collect();
        let hgap = props.hgap.unwrap_or(0.0).max(0.0);
        let widths = resolve_widths(&dims, self.content_width(), hgap);

        let mut pieces = Vec::with_capacity(children.len());
        let mut height = props.height.unwrap_or(0.0).max(0.0);
        for (props, &width) in children.iter().zip(&widths) {
            let (piece, h) = self.measure_piece(props, width)?;
            height = height.max(h);
            pieces.push(piece);
        }

        let mut elements = Vec::new();
        let mut x = self.left();
        for (piece, &width) in pieces.iter().zip(&widths) {
            self.draw_piece(piece, x, width, height, &mut elements);
            x += width + hgap;
        }

        let mut block = Block::new(height, elements);
        block.page_break = props.page_break;
        Ok(block)
    }

    fn measure_piece(&self, props: &Properties, width: f64) -> Result<(Piece, f64), ReportError> {
        Ok(match props {
            Properties::Cell(cell) => {
                let spec = self.cell_spec(cell);
                let lines = self.cell_lines(&spec, width);
                let height = cell_height(&spec, &lines);
                (Piece::Cell(spec, lines), height)
            }
            Properties::Image(image) => self.measure_image(image, width),
            Properties::Barcode(bc) => self.measure_barcode(bc, width)?,
            _ => (Piece::Empty, 0.0),
        })
    }

    fn cell_spec(&self, cell: &CellProps) -> CellSpec {
        CellSpec {
            text: self.data.bound_text(&cell.value, None),
            font: self.font(cell.font_style, cell.font_size),
            color: cell.color.unwrap_or(Color::BLACK),
            underline: cell.font_style.underline,
            align: cell.align.unwrap_or_default(),
            borders: cell.border,
            border_color: cell.border_color.unwrap_or(Color::BLACK),
            fill: cell.background_color,
            multiline: cell.multiline,
            min_height: cell.height.unwrap_or(0.0).max(0.0),
        }
    }

    /// The lines a cell's text occupies. Single-line cells keep their text
    /// on one line whatever its width.
    pub(crate) fn cell_lines(&self, spec: &CellSpec, width: f64) -> Vec<String> {
        if spec.multiline {
            let inner = (width - 2.0 * CELL_PADDING).max(0.0);
            self.fonts
                .text_layout()
                .break_into_lines(&spec.text, spec.font, inner)
                .into_iter()
                .map(|l| l.text)
                .collect()
        } else {
            vec![spec.text.replace(['\n', '\r'], " ")]
        }
    }

    /// A row made only of cells, as used by datagrids.
    pub(crate) fn cell_row(&self, cells: &[CellSpec], widths: &[f64]) -> Block {
        let lines: Vec<Vec<String>> = cells
            .iter()
            .zip(widths)
            .map(|(spec, &w)| self.cell_lines(spec, w))
            .collect();
        let height = cells
            .iter()
            .zip(&lines)
            .map(|(spec, l)| cell_height(spec, l))
            .fold(0.0, f64::max);

        let mut elements = Vec::new();
        let mut x = self.left();
        for ((spec, lines), &w) in cells.iter().zip(&lines).zip(widths) {
            draw_cell(spec, lines, x, w, height, &mut elements);
            x += w;
        }
        Block::new(height, elements)
    }

    fn measure_image(&self, props: &ImageProps, width: f64) -> (Piece, f64) {
        let src = if image_loader::is_inline_source(&props.src) {
            props.src.clone()
        } else {
            self.data.resolve_str(props.src.trim())
        };
        let image = if src.trim().is_empty() {
            None
        } else {
            match image_loader::load_image(&src) {
                Ok(image) => Some(Arc::new(image)),
                Err(e) => {
                    log::warn!("image could not be loaded, drawing a placeholder: {e}");
                    None
                }
            }
        };
        let height = props
            .height
            .or_else(|| image.as_ref().map(|i| width * i.aspect()))
            .unwrap_or(0.0)
            .max(0.0);
        (Piece::Image(image, height), height)
    }

    fn measure_barcode(&self, props: &BarcodeProps, width: f64) -> Result<(Piece, f64), ReportError> {
        let value = self.data.bound_text(&props.value, None);
        if value.is_empty() {
            log::debug!("barcode without a value, skipped");
            return Ok((Piece::Empty, 0.0));
        }
        let code_type = props.code_type();
        let options = EncodeOptions {
            checksum: props.checksum,
            extended: props.extend,
            ecc: props.ecc.unwrap_or_default(),
        };
        let symbol = barcode::encode(code_type, &value, &options).map_err(|e| {
            ReportError::Layout {
                message: format!("cannot encode `{value}` as {}", code_type.as_str()),
                source: Some(e),
            }
        })?;

        let (symbol_width, symbol_height, text) = match &symbol {
            Symbol::Linear(linear) => (
                width,
                props.height.unwrap_or(DEFAULT_BARCODE_HEIGHT),
                linear.text.clone(),
            ),
            Symbol::Matrix(_) => {
                // square, never wider than its column
                let side = props.height.unwrap_or(width).min(width);
                (side, side, value.clone())
            }
        };
        let caption = props
            .visible_value
            .then(|| (text, self.font(FontStyle::default(), None)));
        let height = symbol_height + caption.as_ref().map(|(_, f)| f.line_height()).unwrap_or(0.0);
        Ok((
            Piece::Barcode(BarcodeBox {
                symbol: Arc::new(symbol),
                width: symbol_width,
                symbol_height,
                caption,
            }),
            height,
        ))
    }

    fn draw_piece(&self, piece: &Piece, x: f64, width: f64, row_height: f64, out: &mut Vec<LayoutElement>) {
        match piece {
            Piece::Cell(spec, lines) => draw_cell(spec, lines, x, width, row_height, out),
            Piece::Image(Some(image), height) => out.push(LayoutElement {
                x,
                y: 0.0,
                width,
                height: *height,
                draw: DrawCommand::Image {
                    image: Arc::clone(image),
                },
            }),
            Piece::Image(None, height) if *height > 0.0 => out.push(LayoutElement {
                x,
                y: 0.0,
                width,
                height: *height,
                draw: DrawCommand::Rect {
                    fill: Some(Color::grey(230)),
                    borders: Borders::default(),
                    border_color: Color::BLACK,
                },
            }),
            Piece::Barcode(bc) => {
                out.push(LayoutElement {
                    x,
                    y: 0.0,
                    width: bc.width,
                    height: bc.symbol_height,
                    draw: DrawCommand::Symbol {
                        symbol: Arc::clone(&bc.symbol),
                        color: Color::BLACK,
                    },
                });
                if let Some((text, font)) = &bc.caption {
                    out.push(LayoutElement {
                        x,
                        y: bc.symbol_height,
                        width: bc.width,
                        height: font.line_height(),
                        draw: DrawCommand::Text {
                            text: text.clone(),
                            font: *font,
                            color: Color::BLACK,
                            underline: false,
                            align: Align::Center,
                        },
                    });
                }
            }
            Piece::Image(None, _) | Piece::Empty => {}
        }
    }

    // ── html, vgap, hline ──────────────────────────────────────────

    /// One block per wrapped line, so long fragments continue on the next
    /// page.
    fn html_blocks(&self, props: &HtmlProps) -> Vec<Block> {
        let source = if props.html.trim().is_empty() && !props.fieldname.is_empty() {
            self.data.resolve_str(&props.fieldname)
        } else {
            props.html.clone()
        };
        // `={{key}}` reads the same as `{{key}}`
        let markup = self.data.interpolate(&source.replace("={{", "{{"), None);

        let chars: Vec<StyledChar> = html::parse(&markup)
            .into_iter()
            .flat_map(|run| {
                let font = self.font(run.style, props.font_size);
                let underline = run.style.underline;
                run.text
                    .chars()
                    .map(move |ch| StyledChar {
                        ch,
                        font,
                        underline,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let left = self.left();
        self.fonts
            .text_layout()
            .break_runs_into_lines(&chars, self.content_width())
            .into_iter()
            .map(|line| {
                let elements = line
                    .spans
                    .into_iter()
                    .map(|span| LayoutElement {
                        x: left + span.x,
                        y: 0.0,
                        width: span.width,
                        height: line.height,
                        draw: DrawCommand::Text {
                            text: span.text,
                            font: span.font,
                            color: Color::BLACK,
                            underline: span.underline,
                            align: Align::Left,
                        },
                    })
                    .collect();
                Block::new(line.height, elements)
            })
            .collect()
    }

    fn hline_block(&self, props: &HlineProps) -> Block {
        let available = self.content_width();
        let width = props
            .width
            .map(|w| w.resolve(available))
            .unwrap_or(available);
        let line = LayoutElement {
            x: self.left(),
            y: 0.0,
            width,
            height: 0.0,
            draw: DrawCommand::Line {
                color: props.border_color.unwrap_or(Color::BLACK),
                thickness: HLINE_THICKNESS,
            },
        };
        Block::new(props.gap.unwrap_or(DEFAULT_HLINE_GAP).max(0.0), vec![line])
    }
}

fn cell_height(spec: &CellSpec, lines: &[String]) -> f64 {
    let text_height = lines.len().max(1) as f64 * spec.font.line_height();
    spec.min_height.max(text_height)
}

/// Background and borders over the full row height, text centred
/// vertically.
fn draw_cell(
    spec: &CellSpec,
    lines: &[String],
    x: f64,
    width: f64,
    height: f64,
    out: &mut Vec<LayoutElement>,
) {
    if spec.fill.is_some() || !spec.borders.is_none() {
        out.push(LayoutElement {
            x,
            y: 0.0,
            width,
            height,
            draw: DrawCommand::Rect {
                fill: spec.fill,
                borders: spec.borders,
                border_color: spec.border_color,
            },
        });
    }

    let line_height = spec.font.line_height();
    let top = ((height - lines.len() as f64 * line_height) / 2.0).max(0.0);
    let inner = (width - 2.0 * CELL_PADDING).max(0.0);
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        out.push(LayoutElement {
            x: x + CELL_PADDING,
            y: top + i as f64 * line_height,
            width: inner,
            height: line_height,
            draw: DrawCommand::Text {
                text: line.clone(),
                font: spec.font,
                color: spec.color,
                underline: spec.underline,
                align: spec.align,
            },
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ElementKind, Margins, PageSize};
    use serde_json::{json, Map, Value};

    pub(crate) fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    /// 100 × 40 mm page with 5 mm margins: 30 mm between the margins.
    pub(crate) fn small_page() -> ReportConfig {
        ReportConfig {
            page_size: PageSize::Custom {
                width: 100.0,
                height: 40.0,
            },
            margins: Margins::uniform(5.0),
            ..Default::default()
        }
    }

    pub(crate) fn texts(page: &LayoutPage) -> Vec<String> {
        page.elements
            .iter()
            .filter_map(|e| match &e.draw {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn row_with_cell(tree: &mut ElementTree, section: Section, height: f64, value: &str) {
        let row = tree
            .append(section, ElementKind::Row, &props(json!({ "height": height })))
            .unwrap();
        tree.append(row, ElementKind::Cell, &props(json!({ "value": value })))
            .unwrap();
    }

    #[test]
    fn test_resolve_widths_mixed() {
        let widths = resolve_widths(
            &[
                Some(Dimension::Absolute(40.0)),
                Some(Dimension::Percent(50.0)),
                None,
                None,
            ],
            190.0,
            0.0,
        );
        assert_eq!(widths, vec![40.0, 95.0, 27.5, 27.5]);
    }

    #[test]
    fn test_resolve_widths_gap_and_clamp() {
        let widths = resolve_widths(
            &[Some(Dimension::Absolute(150.0)), Some(Dimension::Percent(50.0)), None],
            194.0,
            2.0,
        );
        assert_eq!(widths, vec![150.0, 40.0, 0.0]);
        let total: f64 = widths.iter().sum::<f64>() + 2.0 * 2.0;
        assert!(total <= 194.0 + 1e-9);
    }

    #[test]
    fn test_resolve_widths_absolute_may_overflow() {
        let widths = resolve_widths(&[Some(Dimension::Absolute(300.0)), None], 100.0, 0.0);
        assert_eq!(widths, vec![300.0, 0.0]);
    }

    #[test]
    fn test_rows_paginate_with_header_and_footer() {
        let mut tree = ElementTree::new();
        row_with_cell(&mut tree, Section::Header, 5.0, "HEAD");
        row_with_cell(&mut tree, Section::Footer, 5.0, "Page {{page}}");
        row_with_cell(&mut tree, Section::Details, 10.0, "first");
        for i in 0..25 {
            row_with_cell(&mut tree, Section::Details, 5.0, &format!("row {i}"));
        }
        let data = DataStore::new();
        let config = small_page();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();

        // body is 20mm: 10 + 2×5 on the first page, four rows per page after
        assert_eq!(pages.len(), 7);
        for page in &pages {
            let texts = texts(page);
            assert!(texts.contains(&"HEAD".to_string()));
            assert!(texts.contains(&format!("Page {}", page.number)));
        }
        assert!(texts(&pages[0]).contains(&"row 1".to_string()));
        assert!(texts(&pages[1]).contains(&"row 2".to_string()));
    }

    #[test]
    fn test_rows_never_cross_the_body_bottom() {
        let mut tree = ElementTree::new();
        for i in 0..9 {
            row_with_cell(&mut tree, Section::Details, 7.0, &format!("r{i}"));
        }
        let data = DataStore::new();
        let config = small_page();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        for page in &pages {
            for el in &page.elements {
                assert!(el.y + el.height <= 35.0 + 1e-6);
            }
        }
        // 30mm body, 4 rows of 7mm per page
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_explicit_page_break() {
        let mut tree = ElementTree::new();
        row_with_cell(&mut tree, Section::Details, 5.0, "a");
        let row = tree
            .append(
                Section::Details,
                ElementKind::Row,
                &props(json!({"height": 5, "page-break": true})),
            )
            .unwrap();
        tree.append(row, ElementKind::Cell, &props(json!({"value": "b"})))
            .unwrap();
        let data = DataStore::new();
        let config = small_page();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[1]), vec!["b".to_string()]);
    }

    #[test]
    fn test_page_break_on_first_block_is_ignored() {
        let mut tree = ElementTree::new();
        tree.append(
            Section::Details,
            ElementKind::Vgap,
            &props(json!({"page-break": true})),
        )
        .unwrap();
        row_with_cell(&mut tree, Section::Details, 5.0, "a");
        let data = DataStore::new();
        let config = small_page();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_oversized_row_is_placed_alone() {
        let mut tree = ElementTree::new();
        row_with_cell(&mut tree, Section::Details, 5.0, "a");
        row_with_cell(&mut tree, Section::Details, 100.0, "huge");
        row_with_cell(&mut tree, Section::Details, 5.0, "b");
        let data = DataStore::new();
        let config = small_page();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(texts(&pages[1]), vec!["huge".to_string()]);
    }

    #[test]
    fn test_no_room_for_body() {
        let mut tree = ElementTree::new();
        row_with_cell(&mut tree, Section::Header, 20.0, "h");
        row_with_cell(&mut tree, Section::Footer, 10.0, "f");
        let data = DataStore::new();
        let config = small_page();
        let err = LayoutEngine::new(&tree, &data, &config).layout().unwrap_err();
        assert!(matches!(err, ReportError::Layout { .. }));
    }

    #[test]
    fn test_empty_report_has_one_page() {
        let tree = ElementTree::new();
        let data = DataStore::new();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].width, pages[0].height), (210.0, 297.0));
    }

    #[test]
    fn test_cell_binding_and_widths() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Details, ElementKind::Row, &props(json!({"hgap": 2})))
            .unwrap();
        tree.append(
            row,
            ElementKind::Cell,
            &props(json!({"value": "labels.title", "width": "50%", "border": "1"})),
        )
        .unwrap();
        tree.append(row, ElementKind::Cell, &props(json!({"value": "x"})))
            .unwrap();
        let mut data = DataStore::new();
        data.set("labels", &json!({"title": "Invoice"})).unwrap();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();

        let rect = pages[0]
            .elements
            .iter()
            .find(|e| matches!(e.draw, DrawCommand::Rect { .. }))
            .unwrap();
        assert_eq!(rect.x, 10.0);
        assert!((rect.width - 94.0).abs() < 1e-9);
        assert_eq!(texts(&pages[0]), vec!["Invoice".to_string(), "x".to_string()]);
        let second = pages[0]
            .elements
            .iter()
            .find(|e| matches!(&e.draw, DrawCommand::Text { text, .. } if text == "x"))
            .unwrap();
        assert!((second.x - (10.0 + 94.0 + 2.0 + CELL_PADDING)).abs() < 1e-9);
    }

    #[test]
    fn test_multiline_cell_grows_row() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Details, ElementKind::Row, &Map::new())
            .unwrap();
        tree.append(
            row,
            ElementKind::Cell,
            &props(json!({
                "value": "several words that will not fit on one line",
                "width": 20, "multiline": true
            })),
        )
        .unwrap();
        let data = DataStore::new();
        let config = ReportConfig::default();
        let engine = LayoutEngine::new(&tree, &data, &config);
        let font = engine.font(FontStyle::default(), None);
        let expected = engine.fonts().line_count(
            "several words that will not fit on one line",
            font,
            20.0 - 2.0 * CELL_PADDING,
        );
        assert!(expected > 1);
        let block = engine.row_block(row, &RowProps::default()).unwrap();
        assert!((block.height - expected as f64 * font.line_height()).abs() < 1e-9);
    }

    #[test]
    fn test_barcode_sizes() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Details, ElementKind::Row, &Map::new())
            .unwrap();
        tree.append(
            row,
            ElementKind::Barcode,
            &props(json!({"code-type": "EAN", "value": "9638507", "width": 40, "visible-value": true})),
        )
        .unwrap();
        tree.append(
            row,
            ElementKind::Barcode,
            &props(json!({"code-type": "QR", "value": "Hello", "width": 25})),
        )
        .unwrap();
        let data = DataStore::new();
        let config = ReportConfig::default();
        let engine = LayoutEngine::new(&tree, &data, &config);
        let block = engine.row_block(row, &RowProps::default()).unwrap();

        let symbols: Vec<&LayoutElement> = block
            .elements
            .iter()
            .filter(|e| matches!(e.draw, DrawCommand::Symbol { .. }))
            .collect();
        assert_eq!(symbols.len(), 2);
        assert_eq!((symbols[0].width, symbols[0].height), (40.0, DEFAULT_BARCODE_HEIGHT));
        assert_eq!((symbols[1].width, symbols[1].height), (25.0, 25.0));
        let caption = block
            .elements
            .iter()
            .find(|e| matches!(e.draw, DrawCommand::Text { .. }))
            .unwrap();
        assert!(matches!(&caption.draw, DrawCommand::Text { text, .. } if text == "96385074"));
        assert_eq!(block.height, 25.0);
    }

    #[test]
    fn test_qr_side_capped_at_column_width() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Details, ElementKind::Row, &Map::new())
            .unwrap();
        tree.append(
            row,
            ElementKind::Barcode,
            &props(json!({"code-type": "QR", "value": "Hello", "width": 20, "height": 60})),
        )
        .unwrap();
        tree.append(row, ElementKind::Cell, &props(json!({"value": "next"})))
            .unwrap();
        let data = DataStore::new();
        let config = ReportConfig::default();
        let engine = LayoutEngine::new(&tree, &data, &config);
        let block = engine.row_block(row, &RowProps::default()).unwrap();

        let qr = block
            .elements
            .iter()
            .find(|e| matches!(e.draw, DrawCommand::Symbol { .. }))
            .unwrap();
        assert_eq!((qr.width, qr.height), (20.0, 20.0));
        let next = block
            .elements
            .iter()
            .find(|e| matches!(&e.draw, DrawCommand::Text { text, .. } if text == "next"))
            .unwrap();
        assert!(qr.x + qr.width <= next.x);
        assert_eq!(block.height, 20.0);
    }

    #[test]
    fn test_barcode_error_fails_layout() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Details, ElementKind::Row, &Map::new())
            .unwrap();
        tree.append(
            row,
            ElementKind::Barcode,
            &props(json!({"code-type": "ITF", "value": "12345"})),
        )
        .unwrap();
        let data = DataStore::new();
        let config = ReportConfig::default();
        let err = LayoutEngine::new(&tree, &data, &config).layout().unwrap_err();
        match err {
            ReportError::Layout { source, .. } => assert!(matches!(
                source,
                Some(barcode::EncodeError::InvalidLength { .. })
            )),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_image_height_from_aspect() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Details, ElementKind::Row, &Map::new())
            .unwrap();
        tree.append(
            row,
            ElementKind::Image,
            &props(json!({"src": "logo", "width": 30})),
        )
        .unwrap();
        let mut data = DataStore::new();
        data.set_text("logo", crate::image_loader::tests::png_data_url(4, 2, 255))
            .unwrap();
        let config = ReportConfig::default();
        let engine = LayoutEngine::new(&tree, &data, &config);
        let block = engine.row_block(row, &RowProps::default()).unwrap();
        assert_eq!(block.height, 15.0);
        assert!(matches!(block.elements[0].draw, DrawCommand::Image { .. }));
    }

    #[test]
    fn test_html_lines_continue_across_pages() {
        let mut tree = ElementTree::new();
        let words = "<b>Lorem</b> ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(12);
        tree.append(
            Section::Details,
            ElementKind::Html,
            &props(json!({ "html": words })),
        )
        .unwrap();
        let data = DataStore::new();
        let config = small_page();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert!(pages.len() > 1);
        let bold = pages[0].elements.iter().any(|e| {
            matches!(&e.draw, DrawCommand::Text { font, .. } if font.face == crate::font::StandardFont::HelveticaBold)
        });
        assert!(bold);
    }

    #[test]
    fn test_html_marker_placeholder() {
        let mut tree = ElementTree::new();
        tree.append(
            Section::Details,
            ElementKind::Html,
            &props(json!({ "html": "={{note}}" })),
        )
        .unwrap();
        let mut data = DataStore::new();
        data.set_text("note", "<i>hello</i> there").unwrap();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        assert_eq!(texts(&pages[0]).concat(), "hello there");
    }

    #[test]
    fn test_hline_spans_content_width() {
        let mut tree = ElementTree::new();
        tree.append(
            Section::Details,
            ElementKind::Hline,
            &props(json!({"gap": 3, "border-color": "#ff0000"})),
        )
        .unwrap();
        let data = DataStore::new();
        let config = ReportConfig::default();
        let pages = LayoutEngine::new(&tree, &data, &config).layout().unwrap();
        let line = &pages[0].elements[0];
        assert_eq!((line.x, line.width), (10.0, 190.0));
        assert!(matches!(line.draw, DrawCommand::Line { color, .. } if color == Color::rgb(255, 0, 0)));
    }
}
