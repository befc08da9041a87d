use egui::{Pos2, Rect, pos2, vec2};

use crate::canvas::DrawableId;

/// Bounding rectangle touched by one stroke, across every sample and every
/// mirror copy. Starts empty and only ever grows.
#[derive(Clone, Debug)]
pub struct AffectedArea {
    drawable: DrawableId,
    rect: Option<Rect>,
}

impl AffectedArea {
    pub fn new(drawable: DrawableId) -> Self {
        Self { drawable, rect: None }
    }

    pub fn drawable(&self) -> DrawableId {
        self.drawable
    }

    /// Union the square `p ± radius` into the area.
    pub fn add_point(&mut self, p: Pos2, radius: f32) {
        let radius = radius.max(0.0);
        let dab = Rect::from_center_size(p, vec2(radius * 2.0, radius * 2.0));
        self.rect = Some(match self.rect {
            Some(existing) => existing.union(dab),
            None => dab,
        });
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_none()
    }

    /// Region to snapshot for undo: the area rounded out to whole pixels,
    /// clipped to `bounds` and, if given, to `clip`. `None` when nothing is left.
    pub fn undo_rect(&self, bounds: Rect, clip: Option<Rect>) -> Option<Rect> {
        let rect = self.rect?;
        let rect = Rect::from_min_max(
            pos2(rect.min.x.floor(), rect.min.y.floor()),
            pos2(rect.max.x.ceil(), rect.max.y.ceil()),
        );
        let mut clipped = rect.intersect(bounds);
        if let Some(clip) = clip {
            clipped = clipped.intersect(clip);
        }
        clipped.is_positive().then_some(clipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn area() -> AffectedArea {
        AffectedArea::new(DrawableId { layer: Uuid::nil(), mask: false })
    }

    #[test]
    fn first_point_initialises_rect() {
        let mut a = area();
        assert!(a.is_empty());
        a.add_point(pos2(10.0, 20.0), 3.0);
        assert_eq!(a.rect(), Some(Rect::from_min_max(pos2(7.0, 17.0), pos2(13.0, 23.0))));
    }

    #[test]
    fn undo_rect_is_clipped() {
        let mut a = area();
        a.add_point(pos2(1.0, 1.0), 4.0);
        let bounds = Rect::from_min_max(Pos2::ZERO, pos2(50.0, 50.0));
        assert_eq!(a.undo_rect(bounds, None), Some(Rect::from_min_max(Pos2::ZERO, pos2(5.0, 5.0))));
        let far = Rect::from_min_max(pos2(30.0, 30.0), pos2(40.0, 40.0));
        assert_eq!(a.undo_rect(bounds, Some(far)), None);
    }

    #[test]
    fn fully_outside_canvas_is_empty() {
        let mut a = area();
        a.add_point(pos2(-20.0, -20.0), 2.0);
        let bounds = Rect::from_min_max(Pos2::ZERO, pos2(50.0, 50.0));
        assert_eq!(a.undo_rect(bounds, None), None);
    }
}
