//! Greedy word wrapping and block placement.
//!
//! Layout works in whole pixels. Widths come from a [`Measure`] implementation, which in
//! production is a [`TextShaper`](crate::TextShaper) bound to a [`Face`](crate::Face).

use crate::{
    assets::font::{Face, TextShaper},
    foundation::error::AffirmResult,
};

/// Line height as a multiple of the point size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Width measurement used by the line breaker.
pub trait Measure {
    /// Pixel width of `text` rendered on a single line.
    fn measure(&mut self, text: &str) -> AffirmResult<u32>;
}

/// [`TextShaper`] bound to one face.
pub struct FaceMeasure<'a> {
    pub shaper: &'a mut TextShaper,
    pub face: &'a Face,
}

impl Measure for FaceMeasure<'_> {
    fn measure(&mut self, text: &str) -> AffirmResult<u32> {
        self.shaper.measure(self.face, text)
    }
}

/// One wrapped line: words joined by single spaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    /// Measured width in pixels.
    pub width: u32,
}

impl Line {
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ')
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

/// Bounding rectangle the text block is centered in. Width and height may be zero or negative
/// when margins exceed the image; layout proceeds regardless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl TextRect {
    /// Image bounds shrunk by `origin` on every side: `(x, y, w - 2x, h - 2y)`. An explicit
    /// width or height replaces the derived one.
    pub fn inset(
        image_width: u32,
        image_height: u32,
        origin: (i32, i32),
        explicit: (Option<u32>, Option<u32>),
    ) -> Self {
        let (x, y) = origin;
        let derived_w = image_width as i64 - 2 * i64::from(x);
        let derived_h = image_height as i64 - 2 * i64::from(y);
        let width = explicit.0.map(i64::from).unwrap_or(derived_w);
        let height = explicit.1.map(i64::from).unwrap_or(derived_h);
        Self {
            x,
            y,
            width: clamp_i32(width),
            height: clamp_i32(height),
        }
    }

    pub fn center_x(&self) -> f64 {
        f64::from(self.x) + f64::from(self.width) / 2.0
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// A line with its drawing origin: left edge of the pen and the baseline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedLine {
    pub text: String,
    pub width: u32,
    pub x: i32,
    pub baseline_y: i32,
}

/// Every line of one render, positioned inside a [`TextRect`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutBlock {
    pub rect: TextRect,
    pub lines: Vec<PlacedLine>,
    pub line_height: i32,
    /// Y of the top of the first line box. May lie above `rect.y` (or above 0).
    pub top: i32,
}

impl LayoutBlock {
    pub fn total_height(&self) -> i32 {
        clamp_i32(self.lines.len() as i64 * i64::from(self.line_height))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// `floor(point_size * 1.2)`.
pub fn line_height(point_size: f32) -> i32 {
    (point_size * LINE_HEIGHT_FACTOR).floor() as i32
}

/// Distance from the top of a line box to its baseline: the point size converted to pixels at
/// 72 DPI, truncated.
pub fn ascender_offset(point_size: f32) -> i32 {
    point_size.floor() as i32
}

/// Greedy single-pass wrap of `text` into lines no wider than `max_width`.
///
/// Words are never split: a word wider than `max_width` sits alone on its own line.
pub fn wrap_words(text: &str, max_width: i32, measure: &mut dyn Measure) -> AffirmResult<Vec<Line>> {
    let mut lines = Vec::new();
    let mut current: Option<Line> = None;

    for word in text.split_whitespace() {
        let Some(line) = current.as_mut() else {
            current = Some(Line {
                text: word.to_string(),
                width: measure.measure(word)?,
            });
            continue;
        };

        let tentative = format!("{} {word}", line.text);
        let width = measure.measure(&tentative)?;
        if i64::from(width) <= i64::from(max_width) {
            line.text = tentative;
            line.width = width;
        } else {
            let next = Line {
                text: word.to_string(),
                width: measure.measure(word)?,
            };
            lines.push(std::mem::replace(line, next));
        }
    }

    if let Some(line) = current {
        lines.push(line);
    }
    Ok(lines)
}

/// Wrap `text` into `rect` and position every line.
///
/// The block is centered vertically (integer division, not clamped) and each line is centered
/// horizontally on its own measured width.
pub fn layout_block(
    text: &str,
    rect: TextRect,
    point_size: f32,
    measure: &mut dyn Measure,
) -> AffirmResult<LayoutBlock> {
    let lines = wrap_words(text, rect.width, measure)?;
    Ok(place_lines(lines, rect, point_size))
}

/// Position already-wrapped lines inside `rect`.
///
/// Geometry is computed in 64 bits and saturated to `i32`, so blocks far larger than any
/// canvas still lay out without error.
pub fn place_lines(lines: Vec<Line>, rect: TextRect, point_size: f32) -> LayoutBlock {
    let line_height = line_height(point_size);
    let ascender = i64::from(ascender_offset(point_size));
    let lh = i64::from(line_height);
    let total_height = lines.len() as i64 * lh;
    let top = i64::from(rect.y) + (i64::from(rect.height) - total_height) / 2;

    let placed = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let x = i64::from(rect.x) + (i64::from(rect.width) - i64::from(line.width)) / 2;
            PlacedLine {
                x: clamp_i32(x),
                baseline_y: clamp_i32(top + i as i64 * lh + ascender),
                text: line.text,
                width: line.width,
            }
        })
        .collect::<Vec<_>>();
    let top = clamp_i32(top);

    tracing::debug!(
        lines = placed.len(),
        line_height,
        top,
        "laid out text block"
    );

    LayoutBlock {
        rect,
        lines: placed,
        line_height,
        top,
    }
}
