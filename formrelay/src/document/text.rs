//! Structured-text assembly strategy: walk the contract's logical sections
//! in a fixed order and emit positioned lines, breaking pages on a running
//! vertical offset.

use super::{FormSnapshot, PageContent, PageGeometry, PlacedLine, RenderedDocument};

const HEADING_PT: f32 = 12.0;
const BODY_PT: f32 = 10.0;
const LINE_ADVANCE_MM: f32 = 6.0;
const SECTION_GAP_MM: f32 = 4.0;

/// Header fields, in render order.
const HEADER_FIELDS: &[(&str, &str)] = &[
    ("customerName", "Customer name"),
    ("address", "Address"),
    ("phone", "Phone"),
    ("email", "Email"),
    ("dateOfSale", "Date of sale"),
    ("salesRep", "Sales representative"),
];

/// Checklist items always render, with a placeholder marker when unset.
const CHECKLIST_ITEMS: &[(&str, &str)] = &[
    ("measurementsTaken", "Measurements taken"),
    ("colorsSelected", "Colors selected"),
    ("permitsRequired", "Permits required"),
    ("photosTaken", "Property photos taken"),
    ("hoaApproval", "HOA approval required"),
];

/// Itemized cost lines feeding the computed total.
const COST_LINES: &[(&str, &str)] = &[
    ("brickFaceCost", "Brick face"),
    ("stuccoCost", "Stucco"),
    ("stoneworkCost", "Stonework"),
    ("trimCost", "Trim and molding"),
    ("gutterCost", "Gutters and leaders"),
    ("miscCost", "Miscellaneous"),
];

const OFFICE_FIELDS: &[(&str, &str)] = &[
    ("jobNumber", "Job number"),
    ("approvedBy", "Approved by"),
    ("dateApproved", "Date approved"),
];

const PAYMENT_FIELDS: &[(&str, &str)] = &[
    ("deposit", "Deposit"),
    ("dueOnStart", "Due at start of work"),
    ("dueOnCompletion", "Due on completion"),
    ("amountFinanced", "Amount financed"),
];

/// Sum of the cost lines present in the snapshot.
pub fn cost_total(snapshot: &FormSnapshot) -> f64 {
    COST_LINES.iter().filter_map(|(name, _)| snapshot.currency(name)).sum()
}

/// Running-offset layout cursor. Lines advance down the page; a line that
/// would cross the content-area bottom starts a new page instead.
struct LayoutCursor {
    geometry: PageGeometry,
    pages: Vec<Vec<PlacedLine>>,
    y_mm: f32,
}

impl LayoutCursor {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Vec::new()],
            y_mm: geometry.margin_mm,
        }
    }

    fn line(&mut self, text: String, size_pt: f32) {
        let bottom = self.geometry.margin_mm + self.geometry.content_height_mm();
        if self.y_mm + LINE_ADVANCE_MM > bottom {
            self.pages.push(Vec::new());
            self.y_mm = self.geometry.margin_mm;
        }
        self.y_mm += LINE_ADVANCE_MM;
        let line = PlacedLine {
            x_mm: self.geometry.margin_mm,
            y_mm: self.y_mm,
            size_pt,
            text,
        };
        self.pages.last_mut().expect("cursor always has a page").push(line);
    }

    fn gap(&mut self) {
        // A trailing gap never forces a page on its own
        self.y_mm += SECTION_GAP_MM;
    }

    fn section(&mut self, heading: &str, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        self.gap();
        self.line(heading.to_string(), HEADING_PT);
        for text in lines {
            self.line(text, BODY_PT);
        }
    }
}

/// Lay the snapshot's sections out into per-page positioned lines.
///
/// Absent optional fields are omitted entirely; checklist items always
/// render with a `[x]` / `[ ]` marker. Deterministic for identical input.
pub fn layout_sections(snapshot: &FormSnapshot, geometry: PageGeometry) -> Vec<Vec<PlacedLine>> {
    let mut cursor = LayoutCursor::new(geometry);
    cursor.line("BrickFace Contract Submission".to_string(), HEADING_PT);

    let labelled = |fields: &[(&str, &str)]| -> Vec<String> {
        fields
            .iter()
            .filter_map(|(name, label)| snapshot.text(name).map(|value| format!("{label}: {value}")))
            .collect()
    };
    let currencies = |fields: &[(&str, &str)]| -> Vec<String> {
        fields
            .iter()
            .filter_map(|(name, label)| snapshot.currency(name).map(|value| format!("{label}: ${value:.2}")))
            .collect()
    };

    cursor.section("Customer", labelled(HEADER_FIELDS));

    let checklist = CHECKLIST_ITEMS
        .iter()
        .map(|(name, label)| {
            let marker = if snapshot.checked(name).unwrap_or(false) { "[x]" } else { "[ ]" };
            format!("{marker} {label}")
        })
        .collect();
    cursor.section("Checklist", checklist);

    let mut costs = currencies(COST_LINES);
    if !costs.is_empty() {
        costs.push(format!("Total: ${:.2}", cost_total(snapshot)));
    }
    cursor.section("Itemized costs", costs);

    cursor.section("Office use", labelled(OFFICE_FIELDS));
    cursor.section("Payment schedule", currencies(PAYMENT_FIELDS));

    cursor.pages
}

/// Assemble a paginated document from the snapshot's logical sections.
pub fn assemble(snapshot: &FormSnapshot, geometry: PageGeometry) -> RenderedDocument {
    let pages = layout_sections(snapshot, geometry).into_iter().map(PageContent::Text).collect();
    RenderedDocument::new(geometry, pages)
}
