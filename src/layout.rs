//! Text measurement and block placement.

use std::borrow::Cow;

use crate::{
    core::{Affine, Canvas},
    error::{CinecrawlError, CinecrawlResult},
};

/// Process-wide font capability consumed by the sequencer.
///
/// Measurement is pure with respect to the sequence: the same text at the
/// same scale always measures the same within a session, so placement helpers
/// may call it any number of times per frame.
pub trait FontProvider {
    fn line_height(&mut self, scale: f32) -> CinecrawlResult<f32>;

    fn text_width(&mut self, text: &str, scale: f32) -> CinecrawlResult<f32>;

    /// Draw one line into the capture scene with its top-left at `(x, y)`.
    fn draw_line(
        &mut self,
        scene: &mut vello_cpu::RenderContext,
        text: &str,
        scale: f32,
        x: f32,
        y: f32,
        alpha: f32,
    ) -> CinecrawlResult<()>;
}

/// Top-left position for one laid-out line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinePlacement {
    pub x: f32,
    pub y: f32,
}

/// Place a block of lines vertically centered on the canvas, biased
/// `3 * margin` toward the top of the screen, each line horizontally centered
/// by its measured width.
pub fn centered_block(
    font: &mut dyn FontProvider,
    canvas: Canvas,
    lines: &[String],
    scale: f32,
    margin: f32,
) -> CinecrawlResult<Vec<LinePlacement>> {
    let line_height = font.line_height(scale)?;
    let count = lines.len() as f32;
    let block = count * line_height + (count - 1.0).max(0.0) * margin;
    let top = (canvas.height as f32 - block) / 2.0 - 3.0 * margin;
    place_from(font, canvas, lines, scale, margin, line_height, top)
}

/// Place a block of lines starting at `top`, advancing downward; used by the
/// crawl, where `top` comes from the scroll offset.
pub fn scrolled_block(
    font: &mut dyn FontProvider,
    canvas: Canvas,
    lines: &[String],
    scale: f32,
    margin: f32,
    top: f32,
) -> CinecrawlResult<Vec<LinePlacement>> {
    let line_height = font.line_height(scale)?;
    place_from(font, canvas, lines, scale, margin, line_height, top)
}

fn place_from(
    font: &mut dyn FontProvider,
    canvas: Canvas,
    lines: &[String],
    scale: f32,
    margin: f32,
    line_height: f32,
    top: f32,
) -> CinecrawlResult<Vec<LinePlacement>> {
    let mut out = Vec::with_capacity(lines.len());
    let mut y = top;
    for line in lines {
        let width = font.text_width(line, scale)?;
        out.push(LinePlacement {
            x: (canvas.width as f32 - width) / 2.0,
            y,
        });
        y += line_height + margin;
    }
    Ok(out)
}

/// RGBA8 brush color carried through Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TextBrush {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
}

/// Parley-backed [`FontProvider`] over caller-supplied font bytes.
///
/// The font is registered into the Parley collection once at construction;
/// layouts are shaped per call at `base_size_px * scale`.
pub struct CrawlFont {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    font_data: vello_cpu::peniko::FontData,
    family_name: String,
    base_size_px: f32,
}

impl CrawlFont {
    pub fn from_bytes(font_bytes: Vec<u8>, base_size_px: f32) -> CinecrawlResult<Self> {
        if !base_size_px.is_finite() || base_size_px <= 0.0 {
            return Err(CinecrawlError::layout(
                "font base size must be finite and > 0",
            ));
        }

        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| CinecrawlError::layout("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CinecrawlError::layout("registered font family has no name"))?
            .to_string();

        let font_data =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            font_data,
            family_name,
            base_size_px,
        })
    }

    fn layout(&mut self, text: &str, scale: f32) -> CinecrawlResult<parley::Layout<TextBrush>> {
        let size_px = self.base_size_px * scale;
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CinecrawlError::layout("text scale must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrush::WHITE));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

impl FontProvider for CrawlFont {
    fn line_height(&mut self, scale: f32) -> CinecrawlResult<f32> {
        Ok(self.layout("Hg", scale)?.height())
    }

    fn text_width(&mut self, text: &str, scale: f32) -> CinecrawlResult<f32> {
        Ok(self.layout(text, scale)?.width())
    }

    fn draw_line(
        &mut self,
        scene: &mut vello_cpu::RenderContext,
        text: &str,
        scale: f32,
        x: f32,
        y: f32,
        alpha: f32,
    ) -> CinecrawlResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let layout = self.layout(text, scale)?;

        scene.set_transform(affine_to_cpu(Affine::translate((
            f64::from(x),
            f64::from(y),
        ))));
        if alpha < 1.0 {
            scene.push_opacity_layer(alpha.clamp(0.0, 1.0));
        }

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                scene.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                scene
                    .glyph_run(&self.font_data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }

        if alpha < 1.0 {
            scene.pop_layer();
        }
        Ok(())
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}
