//! Raster assembly strategy: split a tall capture of the rendered form into
//! one horizontal slice per page.

use image::DynamicImage;

use super::{PageContent, PageGeometry, RenderedDocument};

/// One horizontal band of the source capture, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceBounds {
    pub source_y: u32,
    pub source_h: u32,
}

/// Compute the per-page slice boundaries for a capture of
/// `image_w x image_h` pixels.
///
/// The capture is scaled to the content width; whenever the scaled height
/// exceeds one page's content height, the source is partitioned into bands
/// whose scaled heights fill a page each. Boundaries are
/// `source_y = page_index * content_h * image_w / content_w`, the final band
/// clamped to the remaining rows. The bands partition the source exactly:
/// they are contiguous and sum to `image_h`.
///
/// A zero-sized capture yields an empty plan.
pub fn plan_slices(image_w: u32, image_h: u32, geometry: &PageGeometry) -> Vec<SliceBounds> {
    if image_w == 0 || image_h == 0 {
        return Vec::new();
    }

    // Source rows that fill one page's content area once scaled.
    let rows_per_page = geometry.content_height_mm() * image_w as f32 / geometry.content_width_mm();
    let mut slices = Vec::new();
    let mut index: u32 = 0;
    loop {
        let source_y = (index as f32 * rows_per_page).round() as u32;
        if source_y >= image_h {
            break;
        }
        let next_y = (((index + 1) as f32) * rows_per_page).round() as u32;
        let source_h = next_y.min(image_h) - source_y;
        slices.push(SliceBounds { source_y, source_h });
        index += 1;
    }
    slices
}

/// Assemble a paginated document from a pixel capture of the form.
///
/// A zero-height capture yields a single empty page.
pub fn assemble(capture: &DynamicImage, geometry: PageGeometry) -> RenderedDocument {
    let plan = plan_slices(capture.width(), capture.height(), &geometry);
    if plan.is_empty() {
        return RenderedDocument::new(geometry, vec![PageContent::Blank]);
    }

    let mm_per_pixel = geometry.content_width_mm() / capture.width() as f32;
    let pages = plan
        .iter()
        .map(|slice| PageContent::Raster {
            pixels: capture.crop_imm(0, slice.source_y, capture.width(), slice.source_h),
            height_mm: slice.source_h as f32 * mm_per_pixel,
        })
        .collect();
    RenderedDocument::new(geometry, pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    const GEOMETRY: PageGeometry = PageGeometry::A4;

    #[test]
    fn short_capture_fits_one_page() {
        // 900 px wide, scaled height 190/900ths of 600 px << one page
        let plan = plan_slices(900, 600, &GEOMETRY);
        assert_eq!(plan, vec![SliceBounds { source_y: 0, source_h: 600 }]);
    }

    #[test]
    fn tall_capture_partitions_exactly() {
        let (width, height) = (900, 4000);
        let plan = plan_slices(width, height, &GEOMETRY);
        assert!(plan.len() > 1);

        // Contiguous bands covering every source row exactly once
        let mut expected_y = 0;
        for slice in &plan {
            assert_eq!(slice.source_y, expected_y);
            assert!(slice.source_h > 0);
            expected_y += slice.source_h;
        }
        assert_eq!(expected_y, height);

        // No band taller than one page's worth of source rows (+1 for rounding)
        let rows_per_page = (GEOMETRY.content_height_mm() * width as f32 / GEOMETRY.content_width_mm()).ceil() as u32;
        for slice in &plan {
            assert!(slice.source_h <= rows_per_page + 1);
        }
    }

    #[test]
    fn planning_is_idempotent() {
        assert_eq!(plan_slices(900, 4000, &GEOMETRY), plan_slices(900, 4000, &GEOMETRY));
        assert_eq!(plan_slices(1280, 9999, &GEOMETRY), plan_slices(1280, 9999, &GEOMETRY));
    }

    #[test]
    fn zero_height_capture_yields_a_single_empty_page() {
        assert!(plan_slices(900, 0, &GEOMETRY).is_empty());

        let capture = DynamicImage::new_rgb8(900, 0);
        let document = assemble(&capture, GEOMETRY);
        assert_eq!(document.page_count(), 1);
        assert!(matches!(document.pages()[0], PageContent::Blank));
    }

    #[test]
    fn assembled_pages_mirror_the_plan() {
        let capture = DynamicImage::ImageRgb8(RgbImage::from_pixel(900, 4000, image::Rgb([240, 240, 240])));
        let plan = plan_slices(900, 4000, &GEOMETRY);
        let document = assemble(&capture, GEOMETRY);
        assert_eq!(document.page_count(), plan.len());

        for (page, slice) in document.pages().iter().zip(&plan) {
            match page {
                PageContent::Raster { pixels, height_mm } => {
                    assert_eq!(pixels.height(), slice.source_h);
                    assert_eq!(pixels.width(), 900);
                    // Scaled slice height never exceeds the content area
                    assert!(*height_mm <= GEOMETRY.content_height_mm() + 0.01);
                }
                other => panic!("expected raster page, got {other:?}"),
            }
        }
    }
}
