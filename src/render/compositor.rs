use crate::{
    assets::font::{Face, PositionedGlyph, ShapedLine, TextShaper},
    foundation::{color::Rgba8, error::AffirmResult},
    layout::LayoutBlock,
    render::canvas::Canvas,
};

/// Halo radius in pixels of the outline pass.
pub const OUTLINE_RADIUS: i32 = 2;

/// Fill and outline colors for one render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextPaint {
    pub fill: Rgba8,
    pub outline: Rgba8,
}

impl Default for TextPaint {
    fn default() -> Self {
        Self {
            fill: Rgba8::WHITE,
            outline: Rgba8::BLACK,
        }
    }
}

/// Every integer offset in `[-radius, radius]²` except the origin, `dx` outer and `dy` inner.
pub fn outline_offsets(radius: i32) -> impl Iterator<Item = (i32, i32)> {
    let r = radius.max(0);
    (-r..=r)
        .flat_map(move |dx| (-r..=r).map(move |dy| (dx, dy)))
        .filter(|&off| off != (0, 0))
}

/// Stamp every line of `block` onto `canvas`: the outline color at each outline offset, then
/// the fill color at the line origin. Lines are drawn top to bottom.
///
/// Glyphs outside the canvas are clipped. All lines are shaped before any pixel is touched,
/// so shaping failures leave the canvas as it was.
pub fn composite_block(
    canvas: &mut Canvas,
    block: &LayoutBlock,
    face: &Face,
    shaper: &mut TextShaper,
    paint: TextPaint,
) -> AffirmResult<()> {
    if block.is_empty() {
        return Ok(());
    }

    let shaped = block
        .lines
        .iter()
        .map(|line| shaper.shape_line(face, &line.text))
        .collect::<AffirmResult<Vec<ShapedLine>>>()?;

    let (width, height) = canvas.dims_u16();
    let mut ctx = vello_cpu::RenderContext::new(width, height);

    // The rasterizer writes whole tiles, so the existing pixels go down first.
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(canvas.snapshot_paint()?);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
    ));

    let font = face.program().cpu_font();
    for (line, glyphs) in block.lines.iter().zip(&shaped) {
        ctx.set_paint(paint.outline.to_cpu_color());
        for (dx, dy) in outline_offsets(OUTLINE_RADIUS) {
            stamp_glyphs(
                &mut ctx,
                font,
                face.point_size(),
                &glyphs.glyphs,
                (line.x.saturating_add(dx), line.baseline_y.saturating_add(dy)),
            );
        }

        ctx.set_paint(paint.fill.to_cpu_color());
        stamp_glyphs(
            &mut ctx,
            font,
            face.point_size(),
            &glyphs.glyphs,
            (line.x, line.baseline_y),
        );
    }

    ctx.flush();
    ctx.render_to_pixmap(canvas.pixmap_mut());
    Ok(())
}

fn stamp_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    font: &vello_cpu::peniko::FontData,
    font_size: f32,
    glyphs: &[PositionedGlyph],
    origin: (i32, i32),
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((
        f64::from(origin.0),
        f64::from(origin.1),
    )));
    ctx.glyph_run(font)
        .font_size(font_size)
        .fill_glyphs(glyphs.iter().map(|g| vello_cpu::Glyph {
            id: g.id,
            x: g.x,
            y: g.y,
        }));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        assets::{decode::DecodedImage, font::FontSource},
        layout::{FaceMeasure, TextRect, layout_block},
    };

    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn solid(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            width,
            height,
            rgba8_premul: Arc::new(BLUE.repeat((width * height) as usize)),
        }
    }

    fn face(size: f32) -> Face {
        Face::new(Arc::new(FontSource::Embedded.load().unwrap()), size).unwrap()
    }

    fn near(a: [u8; 4], b: [u8; 4], tol: u8) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= tol)
    }

    #[test]
    fn outline_offsets_cover_the_square_without_origin() {
        let offs: Vec<_> = outline_offsets(2).collect();
        assert_eq!(offs.len(), 24);
        assert!(!offs.contains(&(0, 0)));
        assert!(offs.iter().all(|&(x, y)| x.abs() <= 2 && y.abs() <= 2));
        assert_eq!(offs[0], (-2, -2));
        assert_eq!(offs[1], (-2, -1));
        assert_eq!(outline_offsets(1).count(), 8);
        assert_eq!(outline_offsets(0).count(), 0);
    }

    #[test]
    fn empty_block_leaves_canvas_untouched() {
        let base = solid(40, 20);
        let mut canvas = Canvas::from_image(&base).unwrap();
        let face = face(16.0);
        let mut shaper = TextShaper::new();
        let rect = TextRect::inset(40, 20, (0, 0), (None, None));
        let block = layout_block(
            " \t ",
            rect,
            16.0,
            &mut FaceMeasure {
                shaper: &mut shaper,
                face: &face,
            },
        )
        .unwrap();

        composite_block(&mut canvas, &block, &face, &mut shaper, TextPaint::default()).unwrap();
        assert_eq!(canvas.premul_bytes(), base.rgba8_premul.as_slice());
    }

    #[test]
    fn fill_sits_inside_an_outline_halo() {
        let base = solid(240, 120);
        let mut canvas = Canvas::from_image(&base).unwrap();
        let face = face(48.0);
        let mut shaper = TextShaper::new();
        let rect = TextRect::inset(240, 120, (20, 20), (None, None));
        let block = layout_block(
            "IH",
            rect,
            48.0,
            &mut FaceMeasure {
                shaper: &mut shaper,
                face: &face,
            },
        )
        .unwrap();
        assert_eq!(block.lines.len(), 1);

        composite_block(&mut canvas, &block, &face, &mut shaper, TextPaint::default()).unwrap();

        let mut fill = 0usize;
        let mut outline = 0usize;
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                let px = canvas.pixel(x, y).unwrap();
                if near(px, [255, 255, 255, 255], 8) {
                    fill += 1;
                } else if near(px, [0, 0, 0, 255], 8) {
                    outline += 1;
                }
            }
        }
        assert!(fill > 0, "fill pixels expected");
        assert!(outline > 0, "outline halo pixels expected");

        // Corners are far from the text and keep the base color.
        assert!(near(canvas.pixel(0, 0).unwrap(), BLUE, 1));
        assert!(near(canvas.pixel(239, 119).unwrap(), BLUE, 1));

        // Scanning a row through the middle of the stems, the halo comes before the fill.
        let line = &block.lines[0];
        let y = (line.baseline_y - 17) as u32;
        let row: Vec<[u8; 4]> = (0..canvas.width())
            .map(|x| canvas.pixel(x, y).unwrap())
            .collect();
        let first_changed = row.iter().position(|&px| !near(px, BLUE, 8)).unwrap();
        let first_fill = row
            .iter()
            .position(|&px| near(px, [255, 255, 255, 255], 8))
            .unwrap();
        assert!(first_fill >= first_changed + 2, "{first_changed} {first_fill}");
        assert!(near(row[first_changed + 1], [0, 0, 0, 255], 64));
    }

    #[test]
    fn off_canvas_lines_are_clipped_without_error() {
        let base = solid(32, 32);
        let mut canvas = Canvas::from_image(&base).unwrap();
        let face = face(24.0);
        let mut shaper = TextShaper::new();
        let rect = TextRect {
            x: -5000,
            y: -5000,
            width: 100,
            height: 100,
        };
        let block = layout_block(
            "far away",
            rect,
            24.0,
            &mut FaceMeasure {
                shaper: &mut shaper,
                face: &face,
            },
        )
        .unwrap();

        composite_block(&mut canvas, &block, &face, &mut shaper, TextPaint::default()).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (32, 32));
        assert!(near(canvas.pixel(16, 16).unwrap(), BLUE, 1));
    }
}
