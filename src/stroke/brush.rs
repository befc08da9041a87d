use egui::Pos2;
use image::{GrayImage, Rgba};

use crate::canvas::{BlendMode, blend_pixel};
use crate::stroke::affected::AffectedArea;
use crate::stroke::target::StrokeSurface;

/// Dab spacing as a fraction of the radius.
const SPACING_RATIO: f32 = 0.25;
const MIN_SPACING: f32 = 0.5;

// ============================================================================
// DAB CONTEXT
// ============================================================================

/// Everything a brush needs while placing dabs for one call: the surface picked
/// by the draw target, the stroke's affected area, the paint colour and the
/// optional selection clip.
pub struct DabContext<'a> {
    surface: StrokeSurface<'a>,
    area: &'a mut AffectedArea,
    color: Rgba<u8>,
    clip: Option<&'a GrayImage>,
    pixels_written: usize,
}

impl<'a> DabContext<'a> {
    pub fn new(
        surface: impl Into<StrokeSurface<'a>>,
        area: &'a mut AffectedArea,
        color: Rgba<u8>,
        clip: Option<&'a GrayImage>,
    ) -> Self {
        Self { surface: surface.into(), area, color, clip, pixels_written: 0 }
    }

    pub fn area(&self) -> &AffectedArea {
        &*self.area
    }

    pub fn area_mut(&mut self) -> &mut AffectedArea {
        &mut *self.area
    }

    /// Pixels changed through this context so far.
    pub fn pixels_written(&self) -> usize {
        self.pixels_written
    }

    /// Paint one pixel with `coverage` (0–1) of the paint colour.
    pub fn stamp(&mut self, x: i32, y: i32, coverage: f32) {
        if x < 0 || y < 0 || x as u32 >= self.surface.width() || y as u32 >= self.surface.height() {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let mut coverage = coverage.clamp(0.0, 1.0);
        if let Some(clip) = self.clip {
            coverage *= if x < clip.width() && y < clip.height() {
                clip.get_pixel(x, y)[0] as f32 / 255.0
            } else {
                0.0
            };
        }
        let alpha = (self.color[3] as f32 * coverage).round() as u8;
        if alpha == 0 {
            return;
        }
        let src = Rgba([self.color[0], self.color[1], self.color[2], alpha]);
        let base = self.surface.get_pixel(x, y);
        self.surface.put_pixel(x, y, blend_pixel(base, src, BlendMode::Normal, 1.0));
        self.pixels_written += 1;
    }
}

// ============================================================================
// BRUSH CAPABILITY
// ============================================================================

/// Consumes a stroke path and places dabs.
///
/// Painting calls take the [`DabContext`] of the current stroke. A brush keeps
/// its position between calls; [`Brush::finish_brush_stroke`] forgets it (but
/// remembers where the stroke ended, for line-connect).
pub trait Brush {
    fn start_at(&mut self, ctx: &mut DabContext<'_>, p: Pos2);
    fn continue_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2);
    /// Straight segment from [`Brush::last_position`] to `p`.
    /// Falls back to `start_at` when the brush has never been anywhere.
    fn line_connect_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2);
    fn finish_brush_stroke(&mut self);
    fn has_previous(&self) -> bool;
    /// Previous point of the running stroke, else the end of the last one.
    fn last_position(&self) -> Option<Pos2>;
    fn set_radius(&mut self, radius: f32);
    fn radius(&self) -> f32;
    /// How far from a path point paint can land. Used to pad the affected area.
    fn max_effective_radius(&self) -> f32;
    /// Smoothed position shown as the lazy-mouse indicator.
    fn draw_location(&self) -> Option<Pos2> {
        None
    }
}

/// Selectable dab algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushVariant {
    #[default]
    Hard,
    Soft,
}

impl BrushVariant {
    pub fn all() -> &'static [BrushVariant] {
        &[BrushVariant::Hard, BrushVariant::Soft]
    }

    pub fn key(&self) -> &'static str {
        match self {
            BrushVariant::Hard => "hard",
            BrushVariant::Soft => "soft",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.key() == key)
    }

    pub fn create(&self, radius: f32) -> Box<dyn Brush> {
        match self {
            BrushVariant::Hard => Box::new(HardBrush::new(radius)),
            BrushVariant::Soft => Box::new(SoftBrush::new(radius)),
        }
    }
}

// ============================================================================
// SHARED DAB PLACEMENT
// ============================================================================

/// Position bookkeeping shared by the dab brushes.
#[derive(Default, Clone, Debug)]
struct StrokeState {
    previous: Option<Pos2>,
    stroke_end: Option<Pos2>,
    /// Distance travelled since the last dab.
    distance_remainder: f32,
    placed_any: bool,
}

impl StrokeState {
    fn begin(&mut self, p: Pos2) {
        self.previous = Some(p);
        self.distance_remainder = 0.0;
        self.placed_any = false;
    }

    /// Walk from the previous point to `to`, calling `dab` every `spacing`
    /// pixels. The first dab of a stroke lands on the starting point.
    fn advance(&mut self, to: Pos2, spacing: f32, mut dab: impl FnMut(Pos2)) {
        let Some(from) = self.previous else {
            self.begin(to);
            return;
        };
        let delta = to - from;
        let len = delta.length();
        if len <= f32::EPSILON {
            return;
        }
        let dir = delta / len;
        let mut t = if self.placed_any { spacing - self.distance_remainder } else { 0.0 };
        while t <= len {
            dab(from + dir * t);
            t += spacing;
        }
        self.distance_remainder = len - (t - spacing);
        self.placed_any = true;
        self.previous = Some(to);
    }

    fn connect(&mut self, to: Pos2, spacing: f32, dab: impl FnMut(Pos2)) -> bool {
        let Some(origin) = self.previous.or(self.stroke_end) else {
            return false;
        };
        self.begin(origin);
        self.advance(to, spacing, dab);
        true
    }

    fn finish(&mut self) {
        if let Some(p) = self.previous.take() {
            self.stroke_end = Some(p);
        }
        self.distance_remainder = 0.0;
        self.placed_any = false;
    }
}

fn spacing_for(radius: f32) -> f32 {
    (radius * SPACING_RATIO).max(MIN_SPACING)
}

// ============================================================================
// DAB BRUSHES
// ============================================================================

/// Footprint of a single dab.
pub trait DabShape {
    /// Paint one dab of `radius` centred on `c`.
    fn dab(&self, radius: f32, ctx: &mut DabContext<'_>, c: Pos2);
    /// How far past `radius` the dab can reach.
    fn margin(&self) -> f32;
}

/// Solid disc: every pixel within `radius` of the centre gets full paint.
#[derive(Clone, Copy, Debug, Default)]
pub struct HardDisc;

impl DabShape for HardDisc {
    fn dab(&self, radius: f32, ctx: &mut DabContext<'_>, c: Pos2) {
        let r2 = radius * radius;
        let (x0, x1) = ((c.x - radius).floor() as i32, (c.x + radius).ceil() as i32);
        let (y0, y1) = ((c.y - radius).floor() as i32, (c.y + radius).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - c.x;
                let dy = y as f32 - c.y;
                if dx * dx + dy * dy <= r2 {
                    ctx.stamp(x, y, 1.0);
                }
            }
        }
    }

    fn margin(&self) -> f32 {
        1.0
    }
}

/// Radial falloff reaching one pixel past the nominal radius.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftFalloff;

impl DabShape for SoftFalloff {
    fn dab(&self, radius: f32, ctx: &mut DabContext<'_>, c: Pos2) {
        let reach = radius + 1.0;
        let (x0, x1) = ((c.x - reach).floor() as i32, (c.x + reach).ceil() as i32);
        let (y0, y1) = ((c.y - reach).floor() as i32, (c.y + reach).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - c.x;
                let dy = y as f32 - c.y;
                let t2 = (dx * dx + dy * dy) / (reach * reach);
                if t2 < 1.0 {
                    let falloff = (1.0 - t2) * (1.0 - t2);
                    ctx.stamp(x, y, falloff * 0.5);
                }
            }
        }
    }

    fn margin(&self) -> f32 {
        2.0
    }
}

/// Places spaced dabs of shape `S` along the stroke path.
pub struct DabBrush<S: DabShape> {
    radius: f32,
    shape: S,
    state: StrokeState,
}

pub type HardBrush = DabBrush<HardDisc>;
pub type SoftBrush = DabBrush<SoftFalloff>;

impl<S: DabShape + Default> DabBrush<S> {
    pub fn new(radius: f32) -> Self {
        Self { radius, shape: S::default(), state: StrokeState::default() }
    }
}

impl<S: DabShape> Brush for DabBrush<S> {
    fn start_at(&mut self, _ctx: &mut DabContext<'_>, p: Pos2) {
        self.state.begin(p);
    }

    fn continue_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        let (radius, shape) = (self.radius, &self.shape);
        self.state.advance(p, spacing_for(radius), |c| shape.dab(radius, &mut *ctx, c));
    }

    fn line_connect_to(&mut self, ctx: &mut DabContext<'_>, p: Pos2) {
        let (radius, shape) = (self.radius, &self.shape);
        if !self.state.connect(p, spacing_for(radius), |c| shape.dab(radius, &mut *ctx, c)) {
            self.start_at(ctx, p);
        }
    }

    fn finish_brush_stroke(&mut self) {
        self.state.finish();
    }

    fn has_previous(&self) -> bool {
        self.state.previous.is_some()
    }

    fn last_position(&self) -> Option<Pos2> {
        self.state.previous.or(self.state.stroke_end)
    }

    fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn max_effective_radius(&self) -> f32 {
        self.radius + self.shape.margin()
    }
}
