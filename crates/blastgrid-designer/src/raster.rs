//! Raster preview of an in-memory scene
//!
//! Rasterises a [`MemorySurface`] with tiny-skia and converts the result to
//! an RGB image. Text nodes are not drawn.

use crate::color::parse_rgba;
use crate::surface::{DrawingSurface, MemorySurface, Placed, Shape, Style};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::path::Path;
use tiny_skia::{Color, FillRule, Paint, Path as SkPath, PathBuilder, Pixmap, Rect, Stroke, Transform};

fn background() -> Color {
    Color::from_rgba8(255, 255, 255, 255)
}

fn paint_for(color: &str) -> Option<Paint<'static>> {
    let (r, g, b, a) = parse_rgba(color)?;
    if a <= 0.0 {
        return None;
    }
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(r, g, b, (a * 255.0).round() as u8));
    paint.anti_alias = true;
    Some(paint)
}

fn shape_path(shape: &Shape, dx: f32, dy: f32) -> Option<SkPath> {
    match shape {
        Shape::Circle { x, y, radius } => {
            PathBuilder::from_circle(*x as f32 + dx, *y as f32 + dy, *radius as f32)
        }
        Shape::Line { x1, y1, x2, y2 } => {
            let mut pb = PathBuilder::new();
            pb.move_to(*x1 as f32 + dx, *y1 as f32 + dy);
            pb.line_to(*x2 as f32 + dx, *y2 as f32 + dy);
            pb.finish()
        }
        Shape::Polygon { .. } => {
            let vertices = shape.polygon_vertices();
            let (first, rest) = vertices.split_first()?;
            let mut pb = PathBuilder::new();
            pb.move_to(first.0 as f32 + dx, first.1 as f32 + dy);
            for (x, y) in rest {
                pb.line_to(*x as f32 + dx, *y as f32 + dy);
            }
            pb.close();
            pb.finish()
        }
        Shape::Rect {
            x,
            y,
            width,
            height,
        } => Rect::from_xywh(
            *x as f32 + dx,
            *y as f32 + dy,
            *width as f32,
            *height as f32,
        )
        .map(PathBuilder::from_rect),
        Shape::Text { .. } => None,
    }
}

fn draw(pixmap: &mut Pixmap, placed: Placed<'_>) {
    let Style {
        fill,
        stroke,
        stroke_width,
    } = &placed.primitive.style;
    let (dx, dy) = (placed.origin.0 as f32, placed.origin.1 as f32);
    let Some(path) = shape_path(&placed.primitive.shape, dx, dy) else {
        return;
    };

    let is_line = matches!(placed.primitive.shape, Shape::Line { .. });
    if !is_line {
        if let Some(paint) = fill.as_deref().and_then(paint_for) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
    if let Some(paint) = stroke.as_deref().and_then(paint_for) {
        let stroke = Stroke {
            width: stroke_width.max(0.5) as f32,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

/// Rasterise the visible scene at stage size.
pub fn rasterize(surface: &MemorySurface) -> Result<RgbImage> {
    let stage = surface
        .stage()
        .context("Surface has no stage to rasterise")?;
    let width = stage.width.round().max(1.0) as u32;
    let height = stage.height.round().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height)
        .with_context(|| format!("Cannot allocate {}x{} pixmap", width, height))?;
    pixmap.fill(background());

    surface.walk(|placed| draw(&mut pixmap, placed));

    let data = pixmap.data();
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let idx = ((y * width + x) * 4) as usize;
        Rgb([data[idx], data[idx + 1], data[idx + 2]])
    }))
}

/// Rasterise the scene and write it as PNG.
pub fn save_png(surface: &MemorySurface, path: &Path) -> Result<()> {
    let image = rasterize(surface)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    image
        .save(path)
        .with_context(|| format!("Failed to write preview {}", path.display()))?;
    tracing::info!("Wrote preview {}", path.display());
    Ok(())
}
