//! # Page Codec and PDF Writer
//!
//! [`render_pages`] walks laid-out pages and drives a [`RenderBackend`]. The
//! draw instructions of each page are visited top to bottom, then left to
//! right; ties keep layout order.
//!
//! [`PdfWriter`] is the backend that ships with the crate. It writes PDF 1.7
//! by hand:
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, streams
//! ...
//! xref                <- byte offset of every object
//! trailer             <- root and info references
//! %%EOF
//! ```
//!
//! Text is set in the standard Type1 fonts with WinAnsi encoding, so nothing
//! is embedded. Content streams are Flate-compressed. JPEG images pass
//! through as DCT streams, PNG becomes Flate RGB with an optional soft mask.
//! There are no timestamps or ids in the output: the same pages always give
//! the same bytes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::sync::Arc;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::barcode::Symbol;
use crate::error::ReportError;
use crate::font::{Font, StandardFont, MM_PER_PT};
use crate::image_loader::{ImagePixelData, LoadedImage};
use crate::layout::{DrawCommand, LayoutElement, LayoutPage};
use crate::model::Metadata;
use crate::style::{Align, Borders, Color};

const PT_PER_MM: f64 = 1.0 / MM_PER_PT;
const BORDER_WIDTH_PT: f64 = 0.5;
const PAGES_PLACEHOLDER: &str = "{{pages}}";

/// A box in page millimetres, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&LayoutElement> for Bounds {
    fn from(el: &LayoutElement) -> Self {
        Self {
            x: el.x,
            y: el.y,
            width: el.width,
            height: el.height,
        }
    }
}

/// The page being started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub number: usize,
    pub count: usize,
    pub width: f64,
    pub height: f64,
}

/// A drawing surface for laid-out pages. Coordinates are millimetres from
/// the top-left corner of the page.
pub trait RenderBackend {
    type Output;

    fn begin_page(&mut self, page: PageInfo) -> Result<(), ReportError>;

    fn draw_rect(
        &mut self,
        bounds: Bounds,
        fill: Option<Color>,
        borders: Borders,
        border_color: Color,
    ) -> Result<(), ReportError>;

    fn draw_line(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        thickness: f64,
    ) -> Result<(), ReportError>;

    /// One line of text aligned inside `bounds`. `{{pages}}` in `text` is
    /// the backend's to fill in.
    fn draw_text(
        &mut self,
        bounds: Bounds,
        text: &str,
        font: Font,
        color: Color,
        underline: bool,
        align: Align,
    ) -> Result<(), ReportError>;

    fn draw_image(&mut self, bounds: Bounds, image: &Arc<LoadedImage>) -> Result<(), ReportError>;

    fn draw_symbol(&mut self, bounds: Bounds, symbol: &Symbol, color: Color) -> Result<(), ReportError>;

    fn finish(self) -> Result<Self::Output, ReportError>;
}

/// Drive `backend` over `pages` and return its output.
pub fn render_pages<B: RenderBackend>(
    pages: &[LayoutPage],
    mut backend: B,
) -> Result<B::Output, ReportError> {
    if pages.is_empty() {
        return Err(ReportError::Render("nothing to render: no pages".to_string()));
    }
    let count = pages.len();
    for page in pages {
        backend.begin_page(PageInfo {
            number: page.number,
            count,
            width: page.width,
            height: page.height,
        })?;

        let mut order: Vec<&LayoutElement> = page.elements.iter().collect();
        order.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

        for el in order {
            let bounds = Bounds::from(el);
            match &el.draw {
                DrawCommand::Rect {
                    fill,
                    borders,
                    border_color,
                } => backend.draw_rect(bounds, *fill, *borders, *border_color)?,
                DrawCommand::Line { color, thickness } => backend.draw_line(
                    (el.x, el.y),
                    (el.x + el.width, el.y + el.height),
                    *color,
                    *thickness,
                )?,
                DrawCommand::Text {
                    text,
                    font,
                    color,
                    underline,
                    align,
                } => backend.draw_text(bounds, text, *font, *color, *underline, *align)?,
                DrawCommand::Image { image } => backend.draw_image(bounds, image)?,
                DrawCommand::Symbol { symbol, color } => {
                    backend.draw_symbol(bounds, symbol, *color)?
                }
            }
        }
    }
    backend.finish()
}

/// A page under construction.
struct PageState {
    info: PageInfo,
    content: String,
    fonts: BTreeSet<usize>,
    images: BTreeSet<usize>,
}

/// Writes PDF bytes. Objects are numbered in the order they are first
/// needed; object 1 is the catalog and 2 the page tree.
pub struct PdfWriter {
    metadata: Metadata,
    /// Object bodies, indexed by object number. Index 0 is unused.
    objects: Vec<Vec<u8>>,
    fonts: BTreeMap<StandardFont, usize>,
    /// Image object numbers, keyed by the address of the shared image.
    images: HashMap<usize, usize>,
    pages: Vec<PageState>,
}

impl PdfWriter {
    pub fn new(metadata: &Metadata) -> Self {
        Self {
            metadata: metadata.clone(),
            objects: vec![Vec::new(), Vec::new(), Vec::new()],
            fonts: BTreeMap::new(),
            images: HashMap::new(),
            pages: Vec::new(),
        }
    }

    fn push_object(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(data);
        self.objects.len() - 1
    }

    fn page(&mut self) -> Result<&mut PageState, ReportError> {
        self.pages
            .last_mut()
            .ok_or_else(|| ReportError::Render("drawing before the first page".to_string()))
    }

    fn font_object(&mut self, face: StandardFont) -> usize {
        if let Some(&id) = self.fonts.get(&face) {
            return id;
        }
        let data = format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
            face.pdf_name()
        );
        let id = self.push_object(data.into_bytes());
        self.fonts.insert(face, id);
        id
    }

    fn image_object(&mut self, image: &Arc<LoadedImage>) -> usize {
        let key = Arc::as_ptr(image) as usize;
        if let Some(&id) = self.images.get(&key) {
            return id;
        }
        let id = self.write_image_xobject(image);
        self.images.insert(key, id);
        id
    }

    /// One XObject, plus a soft mask object first when the image has alpha.
    fn write_image_xobject(&mut self, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let mut obj: Vec<u8> = Vec::new();
                let _ = write!(
                    obj,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /{} /BitsPerComponent 8 /Filter /DCTDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    color_space.pdf_name(),
                    data.len()
                );
                obj.extend_from_slice(data);
                obj.extend_from_slice(b"\nendstream");
                self.push_object(obj)
            }
            ImagePixelData::Decoded { rgb, alpha } => {
                let smask = alpha.as_ref().map(|alpha| {
                    let compressed = compress_to_vec_zlib(alpha, 6);
                    let mut obj: Vec<u8> = Vec::new();
                    let _ = write!(
                        obj,
                        "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceGray /BitsPerComponent 8 \
                         /Filter /FlateDecode /Length {} >>\nstream\n",
                        image.width_px,
                        image.height_px,
                        compressed.len()
                    );
                    obj.extend_from_slice(&compressed);
                    obj.extend_from_slice(b"\nendstream");
                    self.push_object(obj)
                });

                let compressed = compress_to_vec_zlib(rgb, 6);
                let smask_ref = smask
                    .map(|id| format!(" /SMask {id} 0 R"))
                    .unwrap_or_default();
                let mut obj: Vec<u8> = Vec::new();
                let _ = write!(
                    obj,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8 \
                     /Filter /FlateDecode /Length {}{} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    compressed.len(),
                    smask_ref
                );
                obj.extend_from_slice(&compressed);
                obj.extend_from_slice(b"\nendstream");
                self.push_object(obj)
            }
        }
    }

    fn info_dictionary(&self) -> String {
        let meta = &self.metadata;
        let mut info = String::from("<< ");
        for (name, value) in [
            ("Title", &meta.title),
            ("Author", &meta.author),
            ("Subject", &meta.subject),
            ("Keywords", &meta.keywords),
        ] {
            if let Some(value) = value {
                let _ = write!(info, "/{name} ({}) ", pdf_text(value));
            }
        }
        let creator = meta.creator.as_deref().unwrap_or("folio");
        let _ = write!(
            info,
            "/Creator ({}) /Producer (folio {}) >>",
            pdf_text(creator),
            env!("CARGO_PKG_VERSION")
        );
        info
    }

    /// Serialize all objects with the cross-reference table.
    fn serialize(&self, info_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; self.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, data) in self.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{i} 0 obj\n");
            output.extend_from_slice(data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", self.objects.len());
        output.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.objects.len()
        );
        output
    }
}

impl RenderBackend for PdfWriter {
    type Output = Vec<u8>;

    fn begin_page(&mut self, page: PageInfo) -> Result<(), ReportError> {
        if page.width <= 0.0 || page.height <= 0.0 {
            return Err(ReportError::Render(format!(
                "page {} has no area ({}x{}mm)",
                page.number, page.width, page.height
            )));
        }
        self.pages.push(PageState {
            info: page,
            content: String::new(),
            fonts: BTreeSet::new(),
            images: BTreeSet::new(),
        });
        Ok(())
    }

    fn draw_rect(
        &mut self,
        bounds: Bounds,
        fill: Option<Color>,
        borders: Borders,
        border_color: Color,
    ) -> Result<(), ReportError> {
        let page = self.page()?;
        let h = page.info.height;
        let (x, y) = (pt(bounds.x), pt(h - bounds.y - bounds.height));
        let (w, ht) = (pt(bounds.width), pt(bounds.height));
        let stream = &mut page.content;

        if let Some(fill) = fill {
            let (r, g, b) = fill.components();
            let _ = write!(stream, "q\n{r:.3} {g:.3} {b:.3} rg\n{x:.2} {y:.2} {w:.2} {ht:.2} re\nf\nQ\n");
        }
        if borders.is_none() {
            return Ok(());
        }
        let (r, g, b) = border_color.components();
        let _ = write!(stream, "q\n{r:.3} {g:.3} {b:.3} RG\n{BORDER_WIDTH_PT:.2} w\n");
        if borders == Borders::ALL {
            let _ = write!(stream, "{x:.2} {y:.2} {w:.2} {ht:.2} re\nS\n");
        } else {
            let sides = [
                (borders.top, (x, y + ht), (x + w, y + ht)),
                (borders.bottom, (x, y), (x + w, y)),
                (borders.left, (x, y), (x, y + ht)),
                (borders.right, (x + w, y), (x + w, y + ht)),
            ];
            for (on, (x1, y1), (x2, y2)) in sides {
                if on {
                    let _ = write!(stream, "{x1:.2} {y1:.2} m\n{x2:.2} {y2:.2} l\nS\n");
                }
            }
        }
        stream.push_str("Q\n");
        Ok(())
    }

    fn draw_line(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        thickness: f64,
    ) -> Result<(), ReportError> {
        let page = self.page()?;
        let h = page.info.height;
        let (r, g, b) = color.components();
        let _ = write!(
            page.content,
            "q\n{r:.3} {g:.3} {b:.3} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
            pt(thickness),
            pt(from.0),
            pt(h - from.1),
            pt(to.0),
            pt(h - to.1)
        );
        Ok(())
    }

    fn draw_text(
        &mut self,
        bounds: Bounds,
        text: &str,
        font: Font,
        color: Color,
        underline: bool,
        align: Align,
    ) -> Result<(), ReportError> {
        let font_id = self.font_object(font.face);
        let page = self.page()?;
        page.fonts.insert(font_id);

        let text = if text.contains(PAGES_PLACEHOLDER) {
            text.replace(PAGES_PLACEHOLDER, &page.info.count.to_string())
        } else {
            text.to_string()
        };
        let width = font.measure(&text);
        let size_mm = font.size * MM_PER_PT;
        let x = bounds.x + align.offset(bounds.width, width);
        // glyphs centred in the line box, baseline at 80% of the em
        let baseline = bounds.y + (bounds.height - size_mm) / 2.0 + 0.8 * size_mm;
        let h = page.info.height;

        let (r, g, b) = color.components();
        let _ = write!(
            page.content,
            "BT\n{r:.3} {g:.3} {b:.3} rg\n/F{font_id} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
            font.size,
            pt(x),
            pt(h - baseline),
            pdf_text(&text)
        );
        if underline {
            let uy = h - baseline - 0.12 * size_mm;
            let _ = write!(
                page.content,
                "q\n{r:.3} {g:.3} {b:.3} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                font.size * 0.06,
                pt(x),
                pt(uy),
                pt(x + width),
                pt(uy)
            );
        }
        Ok(())
    }

    fn draw_image(&mut self, bounds: Bounds, image: &Arc<LoadedImage>) -> Result<(), ReportError> {
        let image_id = self.image_object(image);
        let page = self.page()?;
        page.images.insert(image_id);
        let h = page.info.height;
        let _ = write!(
            page.content,
            "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{image_id} Do\nQ\n",
            pt(bounds.width),
            pt(bounds.height),
            pt(bounds.x),
            pt(h - bounds.y - bounds.height)
        );
        Ok(())
    }

    fn draw_symbol(&mut self, bounds: Bounds, symbol: &Symbol, color: Color) -> Result<(), ReportError> {
        let page = self.page()?;
        let h = page.info.height;
        let (r, g, b) = color.components();
        let stream = &mut page.content;
        let _ = write!(stream, "q\n{r:.3} {g:.3} {b:.3} rg\n");

        match symbol {
            Symbol::Linear(linear) => {
                let modules = linear.module_count();
                if modules > 0 {
                    let module = bounds.width / modules as f64;
                    let y = pt(h - bounds.y - bounds.height);
                    for (start, width) in linear.bars() {
                        let _ = write!(
                            stream,
                            "{:.3} {y:.3} {:.3} {:.3} re\n",
                            pt(bounds.x + start as f64 * module),
                            pt(width as f64 * module),
                            pt(bounds.height)
                        );
                    }
                }
            }
            Symbol::Matrix(matrix) => {
                if matrix.size > 0 {
                    let mw = bounds.width / matrix.size as f64;
                    let mh = bounds.height / matrix.size as f64;
                    for row in 0..matrix.size {
                        let y = pt(h - bounds.y - (row + 1) as f64 * mh);
                        // merge horizontal runs of dark modules
                        let mut col = 0;
                        while col < matrix.size {
                            if !matrix.is_dark(col, row) {
                                col += 1;
                                continue;
                            }
                            let start = col;
                            while col < matrix.size && matrix.is_dark(col, row) {
                                col += 1;
                            }
                            let _ = write!(
                                stream,
                                "{:.3} {y:.3} {:.3} {:.3} re\n",
                                pt(bounds.x + start as f64 * mw),
                                pt((col - start) as f64 * mw),
                                pt(mh)
                            );
                        }
                    }
                }
            }
        }
        stream.push_str("f\nQ\n");
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, ReportError> {
        if self.pages.is_empty() {
            return Err(ReportError::Render("no pages were started".to_string()));
        }
        let pages = std::mem::take(&mut self.pages);
        let mut page_ids = Vec::with_capacity(pages.len());

        for page in &pages {
            let compressed = compress_to_vec_zlib(page.content.as_bytes(), 6);
            let mut stream: Vec<u8> = Vec::new();
            let _ = write!(
                stream,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            stream.extend_from_slice(&compressed);
            stream.extend_from_slice(b"\nendstream");
            let content_id = self.push_object(stream);

            let fonts: String = page
                .fonts
                .iter()
                .map(|id| format!("/F{id} {id} 0 R"))
                .collect::<Vec<_>>()
                .join(" ");
            let mut resources = format!("/Font << {fonts} >>");
            if !page.images.is_empty() {
                let images: String = page
                    .images
                    .iter()
                    .map(|id| format!("/Im{id} {id} 0 R"))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(resources, " /XObject << {images} >>");
            }
            let dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {content_id} 0 R /Resources << {resources} >> >>",
                pt(page.info.width),
                pt(page.info.height)
            );
            page_ids.push(self.push_object(dict.into_bytes()));
        }

        self.objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        self.objects[2] = format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            page_ids.len()
        )
        .into_bytes();

        let info = self.info_dictionary();
        let info_id = self.push_object(info.into_bytes());
        log::debug!(
            "pdf: {} page(s), {} font(s), {} image(s)",
            page_ids.len(),
            self.fonts.len(),
            self.images.len()
        );
        Ok(self.serialize(info_id))
    }
}

fn pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// Escape a string for a PDF literal, mapping to WinAnsi. Characters
/// outside WinAnsi become `?`.
fn pdf_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match unicode_to_winansi(ch).unwrap_or(b'?') {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b @ 0x20..=0x7E => out.push(b as char),
            b => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}

/// Windows-1252 code for `ch`, if it has one.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // euro
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85), // ellipsis
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91), // quotes
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95), // bullet
        0x2013 => Some(0x96), // dashes
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        0x0009 => Some(b' '), // tab
        _ => None,
    }
}
