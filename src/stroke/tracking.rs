use egui::Pos2;

use crate::stroke::brush::{Brush, DabContext};

/// Reports every point it forwards to the stroke's [`AffectedArea`],
/// padded by the wrapped brush's max effective radius.
///
/// [`AffectedArea`]: crate::stroke::affected::AffectedArea
pub struct AffectedAreaBrush {
    inner: Box<dyn Brush>,
}

impl AffectedAreaBrush {
    pub fn new(inner: Box<dyn Brush>) -> Self {
        Self { inner }
    }

    fn record(&self, ctx: &mut DabContext<'_>, p: Pos2) {
        let radius = self.inner.max_effective_radius();
        ctx.area_mut().add_point(p, radius);
    }
}

impl Brush for AffectedAreaBrush {
    fn start_at(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        self.record(ctx, p);
        self.inner.start_at(ctx, p);
    }

    fn continue_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        self.record(ctx, p);
        self.inner.continue_to(ctx, p);
    }

    fn line_connect_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        // the connecting segment starts outside this stroke's samples
        if let Some(origin) = self.inner.last_position() {
            self.record(ctx, origin);
        }
        self.record(ctx, p);
        self.inner.line_connect_to(ctx, p);
    }

    fn finish_brush_stroke(&mut self) {
        self.inner.finish_brush_stroke();
    }

    fn has_previous(&self) -> bool {
        self.inner.has_previous()
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
        self.inner.draw_location()
    }
}
