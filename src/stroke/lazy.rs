use egui::Pos2;

use crate::stroke::brush::{Brush, DabContext};

/// Lag-smoothing decorator.
///
/// The wrapped brush follows a draw location that trails the pointer. The
/// draw location only moves once the pointer is more than `distance` away,
/// and then stops exactly `distance` short of it.
pub struct LazyMouseBrush {
    inner: Box<dyn Brush>,
    distance: f32,
    draw_loc: Option<Pos2>,
}

impl LazyMouseBrush {
    pub fn new(inner: Box<dyn Brush>, distance: f32) -> Self {
        Self { inner, distance: distance.max(0.0), draw_loc: None }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }
}

impl Brush for LazyMouseBrush {
    fn start_at(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        self.draw_loc = Some(p);
        self.inner.start_at(ctx, p);
    }

    fn continue_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        let Some(loc) = self.draw_loc else {
            self.start_at(ctx, p);
            return;
        };
        let delta = p - loc;
        let dist = delta.length();
        if dist <= self.distance {
            return;
        }
        let pulled = p - delta * (self.distance / dist);
        self.draw_loc = Some(pulled);
        self.inner.continue_to(ctx, pulled);
    }

    fn line_connect_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        self.draw_loc = Some(p);
        self.inner.line_connect_to(ctx, p);
    }

    fn finish_brush_stroke(&mut self) {
        self.draw_loc = None;
        self.inner.finish_brush_stroke();
    }

    fn has_previous(&self) -> bool {
        self.draw_loc.is_some() && self.inner.has_previous()
    }

    fn last_position(&self) -> Option<Pos2> {
        self.inner.last_position()
    }

    fn set_radius(&mut self, radius: f32) {
        self.inner.set_radius(radius);
    }

    fn radius(&self) -> f32 {
        self.inner.radius()
    }

    fn max_effective_radius(&self) -> f32 {
        self.inner.max_effective_radius()
    }

    fn draw_location(&self) -> Option<Pos2> {
        self.draw_loc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawableId, TiledImage};
    use crate::stroke::affected::AffectedArea;
    use crate::stroke::brush::HardBrush;
    use egui::pos2;
    use image::Rgba;

    #[test]
    fn draw_location_trails_pointer() {
        let mut img = TiledImage::new(200, 200);
        let mut area = AffectedArea::new(DrawableId { layer: uuid::Uuid::nil(), mask: false });
        let mut brush = LazyMouseBrush::new(Box::new(HardBrush::new(2.0)), 30.0);
        {
            let mut ctx = DabContext::new(&mut img, &mut area, Rgba([0, 0, 0, 255]), None);
            brush.start_at(&mut ctx, pos2(10.0, 10.0));
            brush.continue_to(&mut ctx, pos2(30.0, 10.0));
            assert_eq!(brush.draw_location(), Some(pos2(10.0, 10.0)));
            assert_eq!(ctx.pixels_written(), 0);

            brush.continue_to(&mut ctx, pos2(100.0, 10.0));
            let loc = brush.draw_location().unwrap();
            assert!((loc.x - 70.0).abs() < 1e-4);
            assert!(ctx.pixels_written() > 0);
        }
        assert_eq!(img.get_pixel(60, 10)[3], 255);
        assert_eq!(img.get_pixel(90, 10)[3], 0);

        brush.finish_brush_stroke();
        assert!(!brush.has_previous());
        assert_eq!(brush.draw_location(), None);
    }
}
