//! Reference glyph assets (spec §6): a single binary sheet image holding
//! every glyph in index order, plus a descriptor list such as
//! `["1","2",...,"0","T:3","U:3","A:3","D:3"]` where `:N` marks a glyph
//! composed of `N` contours. The sheet's contours are binarized once and
//! sliced according to the descriptor list's declared contour counts.

use crate::contour::{self, Contour, ContourFilter};
use crate::error::{Error, Result};
use crate::raster::Raster;
use opencv::core::{Mat, Size};
use opencv::imgproc;
use opencv::prelude::*;
use std::collections::HashMap;

/// Side length of the normalized glyph tile used for template matching
/// (spec §4.4).
pub const TILE_SIZE: i32 = 36;

#[derive(Debug, Clone)]
pub struct GlyphDescriptor {
    pub label: String,
    pub contour_count: u32,
}

impl GlyphDescriptor {
    /// Parse one descriptor token, e.g. `"0"` or `"T:3"`.
    pub fn parse(token: &str) -> Self {
        match token.split_once(':') {
            Some((label, count)) => GlyphDescriptor {
                label: label.to_string(),
                contour_count: count.parse().unwrap_or(1),
            },
            None => GlyphDescriptor {
                label: token.to_string(),
                contour_count: 1,
            },
        }
    }
}

/// A glyph's contours, sliced out of the shared reference sheet, plus a
/// normalized 36x36 grey tile used as the template-match reference.
pub struct Glyph {
    pub label: String,
    pub contours: Vec<Contour>,
    pub tile: Mat,
}

pub struct GlyphSet {
    glyphs: Vec<Glyph>,
    by_label: HashMap<String, usize>,
}

impl GlyphSet {
    /// Binarize `sheet` and slice its contours per `descriptors`, in
    /// order, consuming `contour_count` contours per descriptor.
    pub fn load(sheet: &Raster, descriptors: &[GlyphDescriptor]) -> Result<Self> {
        let binarized = crate::binarize::run(sheet)?;
        let filter = ContourFilter::default();
        let mut all = contour::extract(&binarized, &filter)?;
        // Sheet layout is left-to-right; `contour::extract` already
        // sorts by x, so consuming the list in order matches the
        // descriptor order.
        all.sort_by_key(|c| c.rect.x);

        let mut glyphs = Vec::with_capacity(descriptors.len());
        let mut by_label = HashMap::new();
        let mut cursor = 0usize;

        for desc in descriptors {
            let take = desc.contour_count as usize;
            if cursor + take > all.len() {
                return Err(Error::configuration(format!(
                    "reference sheet has fewer contours than descriptors require (glyph '{}')",
                    desc.label
                )));
            }
            let slice = all[cursor..cursor + take].to_vec();
            cursor += take;

            let union_rect = slice
                .iter()
                .fold(None::<crate::geometry::Rect>, |acc, c| match acc {
                    None => Some(c.rect),
                    Some(r) => Some(r.union(&c.rect)),
                })
                .ok_or_else(|| {
                    Error::configuration(format!("glyph '{}' has no contours", desc.label))
                })?;
            let tile = extract_tile(sheet, union_rect)?;

            by_label.insert(desc.label.clone(), glyphs.len());
            glyphs.push(Glyph {
                label: desc.label.clone(),
                contours: slice,
                tile,
            });
        }

        Ok(GlyphSet { glyphs, by_label })
    }

    pub fn get(&self, label: &str) -> Option<&Glyph> {
        self.by_label.get(label).map(|&i| &self.glyphs[i])
    }

    pub fn zero_glyph(&self) -> Option<&Glyph> {
        self.get("0")
    }
}

/// Crop `rect` out of `sheet` and resize it to the normalized
/// `TILE_SIZE x TILE_SIZE` grey tile used for template matching.
pub fn extract_tile(sheet: &Raster, rect: crate::geometry::Rect) -> Result<Mat> {
    let clamped = rect.clamp_to(sheet.width(), sheet.height());
    let cv_rect = opencv::core::Rect::new(clamped.x, clamped.y, clamped.width, clamped.height);
    let roi = Mat::roi(&sheet.mat, cv_rect)?;
    let mut tile = Mat::default();
    imgproc::resize(
        &roi,
        &mut tile,
        Size::new(TILE_SIZE, TILE_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(tile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_parses_plain_and_multi_contour_tokens() {
        let d = GlyphDescriptor::parse("0");
        assert_eq!(d.label, "0");
        assert_eq!(d.contour_count, 1);

        let d = GlyphDescriptor::parse("T:3");
        assert_eq!(d.label, "T");
        assert_eq!(d.contour_count, 3);
    }
}
