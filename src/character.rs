//! Character segmenter (spec §4.7): groups a finalized Line's on-line
//! contours into per-character bounding rectangles with four type
//! classes, dropping type-4 (rejected) characters from the output.

use crate::config::Config;
use crate::contour::{Contour, SizeClass};
use crate::error::Result;
use crate::geometry::Rect;
use crate::line::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharType {
    One,
    Two,
    Three,
    Four,
}

#[derive(Debug, Clone)]
pub struct Character {
    pub source_contours: Vec<usize>,
    pub rect: Rect,
    pub char_type: CharType,
    pub adjusted_from: Option<Rect>,
}

struct LineStats {
    max_width: i32,
    min_dist: i32,
    max_dist: i32,
}

fn medium_stats(line: &Line) -> LineStats {
    let mediums: Vec<&Contour> = line
        .contours
        .iter()
        .filter(|c| matches!(c.size_class, SizeClass::Medium))
        .collect();

    let max_width = mediums.iter().map(|c| c.rect.width).max().unwrap_or(0);

    let mut dists = Vec::new();
    for w in mediums.windows(2) {
        let d = w[1].rect.x - w[0].rect.right();
        if d > 0 {
            dists.push(d);
        }
    }
    let min_dist = dists.iter().copied().min().unwrap_or(0);
    let max_dist = dists.iter().copied().max().unwrap_or(0);

    LineStats {
        max_width,
        min_dist,
        max_dist,
    }
}

/// §4.7.1 character iteration: scan left-to-right, buffering non-Medium
/// contours until a Medium anchor is found, then probe right/left for
/// neighbours that complete a grouped character.
pub fn segment(line: &Line, config: &Config) -> Result<Vec<Character>> {
    let stats = medium_stats(line);
    let mut sorted: Vec<&Contour> = line.contours.iter().collect();
    sorted.sort_by_key(|c| c.rect.x);

    let mut characters: Vec<Character> = Vec::new();
    let mut buffer: Vec<&Contour> = Vec::new();

    for c in sorted.iter().copied() {
        if matches!(c.size_class, SizeClass::Medium) {
            if !buffer.is_empty() {
                probe_left(&mut characters, &mut buffer, c, &stats, line);
            }
            characters.push(Character {
                source_contours: vec![c.index],
                rect: c.rect,
                char_type: CharType::Four, // typed in the next pass
                adjusted_from: None,
            });
            probe_right(&mut characters, &mut buffer, &stats, line);
        } else {
            buffer.push(c);
        }
    }
    buffer.clear();

    characters.sort_by_key(|c| c.rect.x);

    assign_types(&mut characters, line, config);

    let finalized: Vec<Character> = characters
        .into_iter()
        .filter(|c| !matches!(c.char_type, CharType::Four))
        .collect();
    Ok(finalized)
}

fn probe_right(characters: &mut Vec<Character>, buffer: &mut Vec<&Contour>, stats: &LineStats, line: &Line) {
    loop {
        let Some(prev) = characters.last() else { break };
        let probe_rect = Rect::new(
            prev.rect.right() + stats.min_dist,
            prev.rect.y,
            stats.max_width.max(1),
            prev.rect.height,
        );

        let mut group: Vec<usize> = Vec::new();
        let mut group_rect: Option<Rect> = None;
        let mut consumed = Vec::new();
        for (i, c) in buffer.iter().enumerate() {
            if c.rect.intersects(&probe_rect) {
                group.push(c.index);
                group_rect = Some(group_rect.map(|r| r.union(&c.rect)).unwrap_or(c.rect));
                consumed.push(i);
            }
        }
        if group.is_empty() {
            break;
        }
        let Some(rect) = group_rect else { break };
        if rect.area() as f64 <= line.thresholds.min_area {
            break;
        }
        for i in consumed.into_iter().rev() {
            buffer.remove(i);
        }
        characters.push(Character {
            source_contours: group,
            rect,
            char_type: CharType::Four,
            adjusted_from: None,
        });
    }
}

fn probe_left(
    characters: &mut Vec<Character>,
    buffer: &mut Vec<&Contour>,
    upcoming: &Contour,
    stats: &LineStats,
    line: &Line,
) {
    loop {
        let window = stats.max_width + (stats.max_dist - stats.min_dist).max(0);
        let probe_rect = Rect::new(
            upcoming.rect.x - window,
            upcoming.rect.y,
            window.max(1),
            upcoming.rect.height,
        );

        let mut group: Vec<usize> = Vec::new();
        let mut group_rect: Option<Rect> = None;
        let mut consumed = Vec::new();
        for (i, c) in buffer.iter().enumerate() {
            if c.rect.intersects(&probe_rect) {
                group.push(c.index);
                group_rect = Some(group_rect.map(|r| r.union(&c.rect)).unwrap_or(c.rect));
                consumed.push(i);
            }
        }
        if group.is_empty() {
            break;
        }
        let Some(rect) = group_rect else { break };
        if rect.area() as f64 <= line.thresholds.min_area {
            break;
        }
        for i in consumed.into_iter().rev() {
            buffer.remove(i);
        }
        characters.push(Character {
            source_contours: group,
            rect,
            char_type: CharType::Four,
            adjusted_from: None,
        });
    }
}

/// §4.7.2 type assignment, in the documented five-pass order. Later
/// passes only touch still-untyped (`Four`) characters.
fn assign_types(characters: &mut Vec<Character>, line: &Line, config: &Config) {
    let root_rects: Vec<Rect> = vec![line.contours[line.anchor_index.min(line.contours.len().saturating_sub(1))].rect];

    // Pass 1: type 1, contained in a root rectangle.
    for c in characters.iter_mut() {
        if root_rects.iter().any(|r| r.contains_rect(&c.rect)) {
            c.char_type = CharType::One;
        }
    }

    // Pass 2: type 2, neighbour estimate-rectangle vertically contains this
    // one. The estimate rectangle is sized max_char_width x max_char_height
    // (CONFIG), not the anchor-derived line thresholds.
    let max_w = config.max_char_width;
    let max_h = config.max_char_height;
    let pad = line.thresholds.containment_pad.round() as i32;

    characters.sort_by_key(|c| c.rect.x);
    for i in 0..characters.len() {
        if !matches!(characters[i].char_type, CharType::Four) {
            continue;
        }
        if i > 0 {
            let left = &characters[i - 1];
            if matches!(left.char_type, CharType::One | CharType::Two)
                || is_medium_source(left, line)
            {
                let estimate = Rect::new(left.rect.right(), left.rect.y - pad, max_w, max_h + 2 * pad);
                if estimate.y_range().contains(characters[i].rect.y_range().min)
                    && estimate.y_range().contains(characters[i].rect.y_range().max)
                {
                    characters[i].char_type = CharType::Two;
                    continue;
                }
            }
        }
        if i + 1 < characters.len() {
            let right = &characters[i + 1];
            if matches!(right.char_type, CharType::One | CharType::Two)
                || is_medium_source(right, line)
            {
                let estimate = Rect::new(right.rect.x - max_w, right.rect.y - pad, max_w, max_h + 2 * pad);
                if estimate.y_range().contains(characters[i].rect.y_range().min)
                    && estimate.y_range().contains(characters[i].rect.y_range().max)
                {
                    characters[i].char_type = CharType::Two;
                }
            }
        }
    }

    // Pass 3: rectangle adjust — snap Y/height of still-untyped characters
    // adjacent to a typed neighbour.
    for i in 0..characters.len() {
        if !matches!(characters[i].char_type, CharType::Four) {
            continue;
        }
        let neighbour_rect = if i > 0 && !matches!(characters[i - 1].char_type, CharType::Four) {
            Some(characters[i - 1].rect)
        } else if i + 1 < characters.len() && !matches!(characters[i + 1].char_type, CharType::Four) {
            Some(characters[i + 1].rect)
        } else {
            None
        };
        if let Some(n) = neighbour_rect {
            let original = characters[i].rect;
            characters[i].adjusted_from = Some(original);
            characters[i].rect = Rect::new(original.x, n.y, original.width, n.height);
        }
    }
    characters.sort_by_key(|c| c.rect.x);

    // Pass 4: type 3 — near-estimate-rectangle intersects and bottom
    // extends past the neighbour's midline.
    for i in 0..characters.len() {
        if !matches!(characters[i].char_type, CharType::Four) {
            continue;
        }
        let mut typed = false;
        if i > 0 && !matches!(characters[i - 1].char_type, CharType::Four) {
            let left = characters[i - 1].clone();
            let estimate = Rect::new(left.rect.right(), left.rect.y, left.rect.width, left.rect.height);
            if estimate.intersects(&characters[i].rect) && characters[i].rect.bottom() > left.rect.mid_y() {
                characters[i].rect = Rect::new(characters[i].rect.x, left.rect.y, characters[i].rect.width, left.rect.height);
                characters[i].char_type = CharType::Three;
                typed = true;
            }
        }
        if !typed && i + 1 < characters.len() && !matches!(characters[i + 1].char_type, CharType::Four) {
            let right = characters[i + 1].clone();
            let estimate = Rect::new(right.rect.x - right.rect.width, right.rect.y, right.rect.width, right.rect.height);
            if estimate.intersects(&characters[i].rect) && characters[i].rect.bottom() > right.rect.mid_y() {
                characters[i].rect = Rect::new(characters[i].rect.x, right.rect.y, characters[i].rect.width, right.rect.height);
                characters[i].char_type = CharType::Three;
            }
        }
    }

    // Pass 5: everything still untyped stays `Four` and is dropped by the caller.
}

fn is_medium_source(c: &Character, line: &Line) -> bool {
    c.source_contours.len() == 1
        && line
            .contours
            .iter()
            .any(|lc| lc.index == c.source_contours[0] && matches!(lc.size_class, SizeClass::Medium))
}

/// §4.7.3 line bounding rectangle: X from type 1/2/3, Y from type 1/2
/// only, padded (5,5,0,0), clamped, falling back to the union of all
/// on-line contours when empty.
pub fn line_bounding_rect(characters: &[Character], line: &Line, image_width: i32, image_height: i32) -> Rect {
    let x_rects: Vec<&Character> = characters
        .iter()
        .filter(|c| matches!(c.char_type, CharType::One | CharType::Two | CharType::Three))
        .collect();
    let y_rects: Vec<&Character> = characters
        .iter()
        .filter(|c| matches!(c.char_type, CharType::One | CharType::Two))
        .collect();

    if x_rects.is_empty() || y_rects.is_empty() {
        return line
            .contours
            .iter()
            .fold(None::<Rect>, |acc, c| match acc {
                None => Some(c.rect),
                Some(r) => Some(r.union(&c.rect)),
            })
            .unwrap_or(line.rect)
            .clamp_to(image_width, image_height);
    }

    let x_min = x_rects.iter().map(|c| c.rect.left()).min().unwrap();
    let x_max = x_rects.iter().map(|c| c.rect.right() - 1).max().unwrap();
    let y_min = y_rects.iter().map(|c| c.rect.top()).min().unwrap();
    let y_max = y_rects.iter().map(|c| c.rect.bottom() - 1).max().unwrap();

    Rect::from_minmax(x_min - 5, y_min, x_max + 5, y_max).clamp_to(image_width, image_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineThresholds;
    use crate::scope::Scope;
    use crate::raster::{Polarity, Raster};
    use opencv::core::{Mat, Scalar, CV_8UC1};

    fn mk_line(contours: Vec<Contour>) -> Line {
        let mat = Mat::new_rows_cols_with_default(100, 200, CV_8UC1, Scalar::all(0.0)).unwrap();
        let raster = Raster::new(mat, Polarity::ForegroundBright);
        let mut scope = Scope::new();
        let handle = scope.own_raster(raster);
        let thresholds = LineThresholds::from_anchor(&contours[0]);
        Line {
            rect: contours[0].rect,
            overlap: false,
            thresholds,
            anchor_index: 0,
            image: handle,
            contours,
        }
    }

    fn contour_at(index: usize, x: i32, y: i32, w: i32, h: i32, class: SizeClass) -> Contour {
        Contour {
            polyline: vec![],
            rect: Rect::new(x, y, w, h),
            filled_area: (w * h) as f64 * 0.8,
            rect_area: (w * h) as f64,
            size_class: class,
            index,
            in_line: true,
            overlap_adjusted: false,
            orig_rect: None,
        }
    }

    #[test]
    fn characters_are_strictly_sorted_by_x() {
        let contours = vec![
            contour_at(0, 10, 10, 15, 20, SizeClass::Medium),
            contour_at(1, 30, 10, 15, 20, SizeClass::Medium),
            contour_at(2, 50, 10, 15, 20, SizeClass::Medium),
        ];
        let line = mk_line(contours);
        let chars = segment(&line, &Config::default()).unwrap();
        for w in chars.windows(2) {
            assert!(w[0].rect.x < w[1].rect.x);
        }
    }

    #[test]
    fn type_one_requires_non_empty_characters() {
        let contours = vec![contour_at(0, 10, 10, 15, 20, SizeClass::Medium)];
        let line = mk_line(contours);
        let chars = segment(&line, &Config::default()).unwrap();
        assert!(!chars.is_empty());
        assert!(chars.iter().any(|c| matches!(c.char_type, CharType::One)));
    }
}
