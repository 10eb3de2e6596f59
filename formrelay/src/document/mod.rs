//! Document assembly: turns a captured form into a paginated, print-ready
//! PDF.
//!
//! Two strategies exist, matching the two ways the form is captured:
//!
//! - [`raster::assemble`] takes a tall pixel capture of the rendered form and
//!   splits it into one image slice per page.
//! - [`text::assemble`] walks a fixed, ordered list of logical sections and
//!   emits positioned text lines, breaking pages on a running offset.
//!
//! Both produce a [`RenderedDocument`]: pure page geometry first, PDF bytes
//! second, so pagination is testable without decoding any PDF output.

use chrono::{DateTime, Utc};
use image::DynamicImage;
use printpdf::{BuiltinFont, ImageTransform, Mm, PdfDocument};
use std::collections::BTreeMap;

pub mod raster;
pub mod text;

/// Prefix of every generated contract artifact.
pub const ARTIFACT_PREFIX: &str = "BrickFace_Contract";

/// A scalar captured from one form field at submit time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
    /// Currency-like numeric string, possibly with `$` and `,` decoration
    Currency(String),
}

/// The captured set of field values from the source form at submission time.
///
/// Created on submit, consumed immediately to build a document, discarded
/// after. Field order is normalized so identical input always assembles
/// identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSnapshot {
    fields: BTreeMap<String, FieldValue>,
}

impl FormSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(value)) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    pub fn checked(&self, name: &str) -> Option<bool> {
        match self.fields.get(name) {
            Some(FieldValue::Checked(value)) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value of a currency field, with `$` and `,` stripped.
    pub fn currency(&self, name: &str) -> Option<f64> {
        let raw = match self.fields.get(name) {
            Some(FieldValue::Currency(value)) | Some(FieldValue::Text(value)) => value,
            _ => return None,
        };
        raw.replace(['$', ','], "").trim().parse::<f64>().ok()
    }
}

impl<S: Into<String>> FromIterator<(S, FieldValue)> for FormSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(name, value)| (name.into(), value)).collect(),
        }
    }
}

/// Fixed physical page the assembler targets.
///
/// One geometry serves both strategies: A4 with 10 mm margins, a
/// 190 x 277 mm content area. The page break always derives from the content
/// height, never from an independent threshold constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        width_mm: 210.0,
        height_mm: 297.0,
        margin_mm: 10.0,
    };

    pub fn content_width_mm(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    pub fn content_height_mm(&self) -> f32 {
        self.height_mm - 2.0 * self.margin_mm
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// One positioned text line. `y_mm` is measured from the top edge of the
/// page, so layout code reads top-down; serialization flips it into PDF
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x_mm: f32,
    pub y_mm: f32,
    pub size_pt: f32,
    pub text: String,
}

/// Content of a single page of the assembled document.
#[derive(Debug, Clone)]
pub enum PageContent {
    /// Nothing to draw (the zero-height capture edge case)
    Blank,
    /// One horizontal slice of the raster capture, anchored at the top margin
    Raster { pixels: DynamicImage, height_mm: f32 },
    /// Positioned text lines
    Text(Vec<PlacedLine>),
}

/// The paginated, print-ready representation built from a [`FormSnapshot`]
/// or its visual capture. Built once per submission, serialized to bytes,
/// then discarded.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    geometry: PageGeometry,
    pages: Vec<PageContent>,
}

impl RenderedDocument {
    pub fn new(geometry: PageGeometry, pages: Vec<PageContent>) -> Self {
        debug_assert!(!pages.is_empty(), "a document always has at least one page");
        Self { geometry, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageContent] {
        &self.pages
    }

    /// Serialize to PDF bytes.
    pub fn to_pdf_bytes(&self, title: &str) -> anyhow::Result<Vec<u8>> {
        let geometry = self.geometry;
        let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(geometry.width_mm), Mm(geometry.height_mm), "content");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        for (index, page) in self.pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page_index, layer_index) = doc.add_page(Mm(geometry.width_mm), Mm(geometry.height_mm), "content");
                doc.get_page(page_index).get_layer(layer_index)
            };

            match page {
                PageContent::Blank => {}
                PageContent::Text(lines) => {
                    for line in lines {
                        layer.use_text(line.text.as_str(), line.size_pt, Mm(line.x_mm), Mm(geometry.height_mm - line.y_mm), &font);
                    }
                }
                PageContent::Raster { pixels, height_mm } => {
                    // Pixels print at `dpi` dots per inch; solving for the
                    // content width gives the dpi that maps slice width onto
                    // the printable area.
                    let dpi = pixels.width() as f32 * 25.4 / geometry.content_width_mm();
                    let image = printpdf::Image::from_dynamic_image(pixels);
                    image.add_to_layer(
                        layer.clone(),
                        ImageTransform {
                            translate_x: Some(Mm(geometry.margin_mm)),
                            translate_y: Some(Mm(geometry.height_mm - geometry.margin_mm - height_mm)),
                            dpi: Some(dpi),
                            ..Default::default()
                        },
                    );
                }
            }
        }

        Ok(doc.save_to_bytes()?)
    }
}

/// Replace every non-alphanumeric character with `_`.
pub fn sanitize_name_component(raw: &str) -> String {
    raw.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}

/// Generated artifact name: `BrickFace_Contract_<Customer>_<Date>[_<Timestamp>].pdf`.
///
/// The customer component is sanitized; the date keeps its `YYYY-MM-DD`
/// hyphens. Missing fields fall back to `Unknown` and today's date.
pub fn artifact_name(snapshot: &FormSnapshot, timestamp: Option<DateTime<Utc>>) -> String {
    let customer = sanitize_name_component(snapshot.text("customerName").unwrap_or("Unknown"));
    let date = snapshot
        .text("dateOfSale")
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    match timestamp {
        Some(at) => format!("{ARTIFACT_PREFIX}_{customer}_{date}_{}.pdf", at.format("%Y%m%d%H%M%S")),
        None => format!("{ARTIFACT_PREFIX}_{customer}_{date}.pdf"),
    }
}
