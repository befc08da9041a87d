use egui::{Pos2, pos2};

use crate::stroke::brush::{Brush, DabContext};

/// Canvas dimensions the mirror transforms are evaluated against.
/// Captured once per stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width as f32, height: height as f32 }
    }

    pub fn center(&self) -> Pos2 {
        pos2(self.width / 2.0, self.height / 2.0)
    }
}

/// Maps the primary pointer position to one mirror copy.
pub type MirrorFn = fn(Pos2, CanvasSize) -> Pos2;

fn identity(p: Pos2, _: CanvasSize) -> Pos2 {
    p
}

fn mirror_x(p: Pos2, size: CanvasSize) -> Pos2 {
    pos2(size.width - p.x, p.y)
}

fn mirror_y(p: Pos2, size: CanvasSize) -> Pos2 {
    pos2(p.x, size.height - p.y)
}

fn mirror_xy(p: Pos2, size: CanvasSize) -> Pos2 {
    pos2(size.width - p.x, size.height - p.y)
}

fn rotate_about_center(p: Pos2, size: CanvasSize, degrees: f32) -> Pos2 {
    let c = size.center();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (dx, dy) = (p.x - c.x, p.y - c.y);
    pos2(c.x + dx * cos - dy * sin, c.y + dx * sin + dy * cos)
}

fn rotate_120(p: Pos2, size: CanvasSize) -> Pos2 {
    rotate_about_center(p, size, 120.0)
}

fn rotate_240(p: Pos2, size: CanvasSize) -> Pos2 {
    rotate_about_center(p, size, 240.0)
}

const NO_MIRROR: &[MirrorFn] = &[identity];
const VERTICAL: &[MirrorFn] = &[identity, mirror_x];
const HORIZONTAL: &[MirrorFn] = &[identity, mirror_y];
const TWO_MIRRORS: &[MirrorFn] = &[identity, mirror_x, mirror_y, mirror_xy];
const CENTRAL: &[MirrorFn] = &[identity, mirror_xy];
const CENTRAL_3: &[MirrorFn] = &[identity, rotate_120, rotate_240];

/// Symmetry mode of the brush tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SymmetryMode {
    #[default]
    None,
    /// Left↔Right copy across the vertical centre axis
    VerticalMirror,
    /// Top↔Bottom copy across the horizontal centre axis
    HorizontalMirror,
    /// Both axes (4 copies)
    TwoMirrors,
    /// Point reflection through the canvas centre
    CentralSymmetry,
    /// Three copies rotated 120° apart around the centre
    Central3,
}

impl SymmetryMode {
    pub fn all() -> &'static [SymmetryMode] {
        &[
            SymmetryMode::None,
            SymmetryMode::VerticalMirror,
            SymmetryMode::HorizontalMirror,
            SymmetryMode::TwoMirrors,
            SymmetryMode::CentralSymmetry,
            SymmetryMode::Central3,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            SymmetryMode::None => "none",
            SymmetryMode::VerticalMirror => "vertical",
            SymmetryMode::HorizontalMirror => "horizontal",
            SymmetryMode::TwoMirrors => "two_mirrors",
            SymmetryMode::CentralSymmetry => "central",
            SymmetryMode::Central3 => "central_3",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|m| m.key() == key)
    }

    pub fn transforms(self) -> &'static [MirrorFn] {
        match self {
            SymmetryMode::None => NO_MIRROR,
            SymmetryMode::VerticalMirror => VERTICAL,
            SymmetryMode::HorizontalMirror => HORIZONTAL,
            SymmetryMode::TwoMirrors => TWO_MIRRORS,
            SymmetryMode::CentralSymmetry => CENTRAL,
            SymmetryMode::Central3 => CENTRAL_3,
        }
    }

    pub fn brush_count(self) -> usize {
        self.transforms().len()
    }

    /// Position of mirror copy `index` for the primary position `p`.
    ///
    /// # Panics
    /// If `index` is not below [`SymmetryMode::brush_count`].
    pub fn transform(self, p: Pos2, index: usize, size: CanvasSize) -> Pos2 {
        let transforms = self.transforms();
        assert!(
            index < transforms.len(),
            "mirror index {} out of range for {:?} ({} brushes)",
            index,
            self,
            transforms.len()
        );
        (transforms[index])(p, size)
    }
}

// ============================================================================
// MULTIPLEXER
// ============================================================================

/// Fans one pointer path out to one brush per mirror transform.
///
/// `SymmetryMode::None` is the single-brush case of the same loop.
pub struct SymmetryBrush {
    mode: SymmetryMode,
    size: CanvasSize,
    brushes: Vec<Box<dyn Brush>>,
}

impl SymmetryBrush {
    /// `make(i)` builds the (already decorated) brush for mirror `i`.
    pub fn new(mode: SymmetryMode, size: CanvasSize, make: impl FnMut(usize) -> Box<dyn Brush>) -> Self {
        Self {
            mode,
            size,
            brushes: (0..mode.brush_count()).map(make).collect(),
        }
    }

    pub fn mode(&self) -> SymmetryMode {
        self.mode
    }

    /// Must be called before the first operation of a stroke.
    pub fn set_canvas_size(&mut self, size: CanvasSize) {
        self.size = size;
    }

    pub fn brush_count(&self) -> usize {
        self.brushes.len()
    }

    fn fan_out(&mut self, ctx: &mut DabContext<'_>, p: Pos2, op: impl Fn(&mut dyn Brush, &mut DabContext<'_>, Pos2)) {
        let (mode, size) = (self.mode, self.size);
        for (i, brush) in self.brushes.iter_mut().enumerate() {
            op(brush.as_mut(), ctx, mode.transform(p, i, size));
        }
    }
}

impl Brush for SymmetryBrush {
    fn start_at(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        self.fan_out(ctx, p, |brush, ctx, q| brush.start_at(ctx, q));
    }

    fn continue_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        self.fan_out(ctx, p, |brush, ctx, q| {
            if brush.has_previous() {
                brush.continue_to(ctx, q);
            } else {
                brush.start_at(ctx, q);
            }
        });
    }

    fn line_connect_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        self.fan_out(ctx, p, |brush, ctx, q| {
            if brush.last_position().is_some() {
                brush.line_connect_to(ctx, q);
            } else {
                brush.start_at(ctx, q);
            }
        });
    }

    fn finish_brush_stroke(&mut self) {
        for brush in self.brushes.iter_mut() {
            brush.finish_brush_stroke();
        }
    }

    fn has_previous(&self) -> bool {
        self.brushes[0].has_previous()
    }

    fn last_position(&self) -> Option<Pos2> {
        self.brushes[0].last_position()
    }

    fn set_radius(&mut self, radius: f32) {
        for brush in self.brushes.iter_mut() {
            brush.set_radius(radius);
        }
    }

    fn radius(&self) -> f32 {
        self.brushes[0].radius()
    }

    fn max_effective_radius(&self) -> f32 {
        self.brushes.iter().map(|b| b.max_effective_radius()).fold(0.0, f32::max)
    }

    fn draw_location(&self) -> Option<Pos2> {
        self.brushes[0].draw_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_zero_is_identity_for_every_mode() {
        let size = CanvasSize::new(123, 45);
        let p = pos2(17.25, 3.5);
        for mode in SymmetryMode::all() {
            assert_eq!(mode.transform(p, 0, size), p);
        }
    }

    #[test]
    fn brush_counts() {
        let counts: Vec<usize> = SymmetryMode::all().iter().map(|m| m.brush_count()).collect();
        assert_eq!(counts, vec![1, 2, 2, 4, 2, 3]);
    }

    #[test]
    fn central_3_returns_after_three_turns() {
        let size = CanvasSize::new(200, 100);
        let p = pos2(150.0, 20.0);
        let once = SymmetryMode::Central3.transform(p, 1, size);
        let twice = SymmetryMode::Central3.transform(once, 1, size);
        let thrice = SymmetryMode::Central3.transform(twice, 1, size);
        assert!((thrice - p).length() < 1e-3);
        let direct = SymmetryMode::Central3.transform(p, 2, size);
        assert!((direct - twice).length() < 1e-3);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_index_panics() {
        SymmetryMode::VerticalMirror.transform(Pos2::ZERO, 2, CanvasSize::new(10, 10));
    }
}
