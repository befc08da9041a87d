use egui::{Pos2, Rect};
use image::{GrayImage, Rgba};
use serde::{Deserialize, Serialize};

use crate::canvas::{CanvasState, EditTarget};
use crate::history::{PixelPatch, StrokeRecord, UndoSink};
use crate::settings::{BrushToolSettings, LazyMouseSettings};
use crate::stroke::affected::AffectedArea;
use crate::stroke::brush::{Brush, BrushVariant, DabContext};
use crate::stroke::lazy::LazyMouseBrush;
use crate::stroke::symmetry::{CanvasSize, SymmetryBrush, SymmetryMode};
use crate::stroke::target::{Composite, DrawTargetState};
use crate::stroke::tracking::AffectedAreaBrush;
use crate::{log_debug, log_info, log_warn};

// ============================================================================
// INPUT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Press,
    Drag,
    Release,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Shift-click: draw a straight line from the previous stroke's end.
    pub connect_line: bool,
    /// Paint with the secondary colour.
    pub alternate_color: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pos: Pos2,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn press(pos: Pos2) -> Self {
        Self { kind: PointerKind::Press, pos, modifiers: Modifiers::default() }
    }

    pub fn drag(pos: Pos2) -> Self {
        Self { kind: PointerKind::Drag, pos, modifiers: Modifiers::default() }
    }

    pub fn release(pos: Pos2) -> Self {
        Self { kind: PointerKind::Release, pos, modifiers: Modifiers::default() }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// State of one stroke, from the first press to the commit.
struct StrokeSession {
    brush: SymmetryBrush,
    target: DrawTargetState,
    area: AffectedArea,
    composite: Composite,
    color: Rgba<u8>,
    clip: Option<GrayImage>,
    clip_bounds: Option<Rect>,
    pixels_written: usize,
    /// Settings the brush stack was built from.
    stack_key: StackKey,
}

impl StrokeSession {
    /// Run `f` with the brush stack and a context over the acquired surface.
    fn with_context(&mut self, canvas: &mut CanvasState, f: impl FnOnce(&mut SymmetryBrush, &mut DabContext<'_>)) {
        let Some(drawable) = canvas.drawable_mut(self.area.drawable()) else {
            log_warn!("Stroke: drawable {:?} disappeared mid-stroke", self.area.drawable());
            return;
        };
        let written = {
            let surface = self.target.acquire_surface(drawable, self.composite);
            let mut ctx = DabContext::new(surface, &mut self.area, self.color, self.clip.as_ref());
            f(&mut self.brush, &mut ctx);
            ctx.pixels_written()
        };
        if written > 0 {
            self.pixels_written += written;
            self.target.mark_touched();
        }
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Turns pointer input (or traced paths) into committed strokes.
///
/// Idle until a press creates a [`StrokeSession`]; the release finishes the
/// stroke, hands one [`StrokeRecord`] to the undo sink and returns to idle.
/// The brush stack survives between strokes. It is rebuilt when the variant,
/// symmetry or lazy-mouse settings it was built from change; a new radius is
/// pushed into the cached stack.
pub struct StrokeController {
    settings: BrushToolSettings,
    cached: Option<(StackKey, SymmetryBrush)>,
    session: Option<StrokeSession>,
    /// The next press is the first since activation or an image switch,
    /// so it never line-connects.
    first_mouse_down: bool,
}

impl Default for StrokeController {
    fn default() -> Self {
        Self::new(BrushToolSettings::default())
    }
}

impl StrokeController {
    pub fn new(settings: BrushToolSettings) -> Self {
        Self {
            settings,
            cached: None,
            session: None,
            first_mouse_down: true,
        }
    }

    pub fn settings(&self) -> &BrushToolSettings {
        &self.settings
    }

    /// Changes that affect the brush stack apply from the next stroke.
    pub fn settings_mut(&mut self) -> &mut BrushToolSettings {
        &mut self.settings
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn handle(&mut self, canvas: &mut CanvasState, event: PointerEvent, sink: &mut dyn UndoSink) {
        match event.kind {
            PointerKind::Press => self.press(canvas, event.pos, event.modifiers),
            PointerKind::Drag => self.drag(canvas, event.pos),
            PointerKind::Release => self.release(canvas, sink),
        }
    }

    /// # Panics
    /// If a stroke is already active.
    pub fn press(&mut self, canvas: &mut CanvasState, p: Pos2, modifiers: Modifiers) {
        let color = self.settings.paint_color(modifiers.alternate_color);
        if !self.begin(canvas, color, true) {
            return;
        }
        let connect = modifiers.connect_line && !self.first_mouse_down;
        self.first_mouse_down = false;
        if let Some(session) = self.session.as_mut() {
            session.with_context(canvas, |brush, ctx| {
                if connect {
                    brush.line_connect_to(ctx, p);
                } else {
                    brush.start_at(ctx, p);
                }
            });
        }
    }

    /// Ignored while idle.
    pub fn drag(&mut self, canvas: &mut CanvasState, p: Pos2) {
        self.continue_to(canvas, p);
    }

    /// Commit the active stroke. Does nothing while idle.
    pub fn release(&mut self, canvas: &mut CanvasState, sink: &mut dyn UndoSink) {
        self.finish(canvas, sink);
    }

    /// Tool switched away: commit any active stroke and forget the
    /// line-connect origin for the next press.
    pub fn deactivate(&mut self, canvas: &mut CanvasState, sink: &mut dyn UndoSink) {
        self.finish(canvas, sink);
        self.reset_first_press();
    }

    /// A different image became active.
    pub fn image_changed(&mut self) {
        self.reset_first_press();
    }

    /// The next press starts fresh even with `connect_line`.
    pub(crate) fn reset_first_press(&mut self) {
        self.first_mouse_down = true;
    }

    /// Switch between layer and mask editing. Returns the target in effect.
    pub fn set_edit_target(&mut self, canvas: &mut CanvasState, target: EditTarget) -> EditTarget {
        let effective = canvas.set_edit_target(target);
        self.settings.draw_target.set_editing_mask(effective == EditTarget::Mask);
        effective
    }

    /// Smoothed draw location while a lazy-mouse stroke is running.
    pub fn lazy_mouse_indicator(&self) -> Option<Pos2> {
        self.session.as_ref().and_then(|s| s.brush.draw_location())
    }

    /// A complete two-point stroke from `from` to `to` in the primary colour.
    pub fn draw_stroke_programmatically(
        &mut self,
        canvas: &mut CanvasState,
        from: Pos2,
        to: Pos2,
        sink: &mut dyn UndoSink,
    ) {
        if !self.begin_programmatic(canvas, true) {
            return;
        }
        self.start_at(canvas, from);
        self.continue_to(canvas, to);
        self.finish(canvas, sink);
    }

    // ------------------------------------------------------------------
    // Building blocks shared with the path tracer
    // ------------------------------------------------------------------

    pub(crate) fn begin_programmatic(&mut self, canvas: &mut CanvasState, respect_selection: bool) -> bool {
        let color = self.settings.primary_color;
        self.begin(canvas, color, respect_selection)
    }

    pub(crate) fn start_at(&mut self, canvas: &mut CanvasState, p: Pos2) {
        if let Some(session) = self.session.as_mut() {
            session.with_context(canvas, |brush, ctx| brush.start_at(ctx, p));
        }
    }

    pub(crate) fn continue_to(&mut self, canvas: &mut CanvasState, p: Pos2) {
        if let Some(session) = self.session.as_mut() {
            session.with_context(canvas, |brush, ctx| brush.continue_to(ctx, p));
        }
    }

    /// Close the current subpath without ending the stroke.
    pub(crate) fn end_subpath(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.brush.finish_brush_stroke();
        }
    }

    /// Finish the stroke and push its undo record. Returns whether a record
    /// was pushed.
    pub(crate) fn finish(&mut self, canvas: &mut CanvasState, sink: &mut dyn UndoSink) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        session.brush.finish_brush_stroke();

        let drawable_id = session.area.drawable();
        let rect = session.area.undo_rect(canvas.bounds(), session.clip_bounds);
        let mut committed = false;

        if let Some(drawable) = canvas.drawable_mut(drawable_id) {
            // before pixels must be read while the backup still exists
            let before = match rect {
                Some(r) if session.pixels_written > 0 => {
                    Some(PixelPatch::capture(session.target.original_for_undo(drawable), drawable_id, r))
                }
                _ => None,
            };
            session.target.finalize(drawable);

            if let (Some(rect), Some(before)) = (rect, before) {
                let after = PixelPatch::capture(drawable, drawable_id, rect);
                let description = if drawable_id.mask { "Brush Stroke (Mask)" } else { "Brush Stroke" };
                log_info!(
                    "Committed {} via {}: {}x{} at ({}, {}), {} pixels written",
                    description,
                    session.target.target().key(),
                    after.width,
                    after.height,
                    after.rect.min.x,
                    after.rect.min.y,
                    session.pixels_written
                );
                sink.push_stroke(StrokeRecord {
                    drawable: drawable_id,
                    rect: after.rect,
                    before,
                    after,
                    target: session.target.target(),
                    description: description.to_string(),
                });
                committed = true;
            } else {
                log_debug!("Stroke left no pixels, nothing recorded");
            }
        } else {
            log_warn!("Stroke: drawable {:?} disappeared before commit", drawable_id);
        }

        self.cached = Some((session.stack_key, session.brush));
        committed
    }

    fn begin(&mut self, canvas: &mut CanvasState, color: Rgba<u8>, respect_selection: bool) -> bool {
        assert!(self.session.is_none(), "stroke started while another stroke is active");
        let Some(drawable_id) = canvas.active_drawable_id() else {
            log_warn!("Stroke: canvas has no active layer");
            return false;
        };

        if self.settings.draw_target.editing_mask() != drawable_id.mask {
            log_warn!("Stroke: draw-target settings out of sync with edit target, resyncing");
            self.settings.draw_target.set_editing_mask(drawable_id.mask);
        }
        let (target, composite) = self.settings.draw_target.effective();
        let color = if drawable_id.mask { to_mask_gray(color) } else { color };

        let size = CanvasSize::new(canvas.width, canvas.height);
        let stack_key = StackKey::of(&self.settings);
        let brush = self.take_brush(size);

        let mut target_state = DrawTargetState::new(target);
        let Some(drawable) = canvas.drawable(drawable_id) else {
            self.cached = Some((stack_key, brush));
            return false;
        };
        target_state.prepare(drawable);

        let (clip, clip_bounds) = if respect_selection {
            (canvas.selection_mask().cloned(), canvas.selection_bounds())
        } else {
            (None, None)
        };

        log_debug!(
            "Stroke begin: target={} symmetry={} brushes={}",
            target.key(),
            brush.mode().key(),
            brush.brush_count()
        );
        self.session = Some(StrokeSession {
            brush,
            target: target_state,
            area: AffectedArea::new(drawable_id),
            composite,
            color,
            clip,
            clip_bounds,
            pixels_written: 0,
            stack_key,
        });
        true
    }

    /// The cached brush stack if it was built from the current settings,
    /// else a fresh one.
    fn take_brush(&mut self, size: CanvasSize) -> SymmetryBrush {
        let key = StackKey::of(&self.settings);
        let radius = self.settings.radius();
        if let Some((built, mut brush)) = self.cached.take()
            && built == key
        {
            brush.set_canvas_size(size);
            if brush.radius() != radius {
                brush.set_radius(radius);
            }
            return brush;
        }

        let StackKey { variant, symmetry, lazy } = key;
        log_debug!("Building brush stack: {} x{}", variant.key(), symmetry.brush_count());
        SymmetryBrush::new(symmetry, size, |_| {
            let tracked: Box<dyn Brush> = Box::new(AffectedAreaBrush::new(variant.create(radius)));
            if lazy.enabled {
                Box::new(LazyMouseBrush::new(tracked, lazy.distance()))
            } else {
                tracked
            }
        })
    }
}

/// Settings that shape the brush stack, apart from the radius.
#[derive(Clone, Copy, Debug, PartialEq)]
struct StackKey {
    variant: BrushVariant,
    symmetry: SymmetryMode,
    lazy: LazyMouseSettings,
}

impl StackKey {
    fn of(settings: &BrushToolSettings) -> Self {
        Self {
            variant: settings.variant(),
            symmetry: settings.symmetry(),
            lazy: settings.lazy_mouse(),
        }
    }
}

/// Masks store gray levels; paint with the colour's luminance.
fn to_mask_gray(c: Rgba<u8>) -> Rgba<u8> {
    let l = (0.299 * c[0] as f32 + 0.587 * c[1] as f32 + 0.114 * c[2] as f32).round() as u8;
    Rgba([l, l, l, c[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn release_while_idle_is_noop() {
        let mut canvas = CanvasState::new(32, 32);
        let mut controller = StrokeController::default();
        let mut records: Vec<StrokeRecord> = Vec::new();
        controller.release(&mut canvas, &mut records);
        controller.drag(&mut canvas, pos2(3.0, 3.0));
        assert!(records.is_empty());
        assert!(!controller.is_active());
    }

    #[test]
    #[should_panic(expected = "another stroke is active")]
    fn press_during_stroke_panics() {
        let mut canvas = CanvasState::new(32, 32);
        let mut controller = StrokeController::default();
        controller.press(&mut canvas, pos2(3.0, 3.0), Modifiers::default());
        controller.press(&mut canvas, pos2(5.0, 3.0), Modifiers::default());
    }

    #[test]
    fn brush_stack_is_reused_until_settings_change() {
        let mut canvas = CanvasState::new(32, 32);
        let mut controller = StrokeController::default();
        let mut records: Vec<StrokeRecord> = Vec::new();
        controller.draw_stroke_programmatically(&mut canvas, pos2(2.0, 2.0), pos2(20.0, 2.0), &mut records);
        assert_eq!(controller.cached.as_ref().map(|(_, b)| b.brush_count()), Some(1));

        controller.settings_mut().set_symmetry(SymmetryMode::TwoMirrors);
        controller.draw_stroke_programmatically(&mut canvas, pos2(2.0, 8.0), pos2(20.0, 8.0), &mut records);
        assert_eq!(controller.cached.as_ref().map(|(_, b)| b.brush_count()), Some(4));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn radius_change_keeps_the_cached_stack() {
        let mut canvas = CanvasState::new(32, 32);
        let mut controller = StrokeController::default();
        let mut records: Vec<StrokeRecord> = Vec::new();
        controller.draw_stroke_programmatically(&mut canvas, pos2(2.0, 2.0), pos2(20.0, 2.0), &mut records);

        controller.settings_mut().set_radius(3.0);
        let brush = controller.take_brush(CanvasSize::new(32, 32));
        // a rebuilt stack would have no line-connect origin
        assert_eq!(brush.last_position(), Some(pos2(20.0, 2.0)));
        assert_eq!(brush.radius(), 3.0);
        assert_eq!(brush.max_effective_radius(), 4.0);
        controller.cached = Some((StackKey::of(controller.settings()), brush));

        controller.settings_mut().set_lazy_mouse(true);
        let brush = controller.take_brush(CanvasSize::new(32, 32));
        assert_eq!(brush.last_position(), None);
    }

    #[test]
    fn drag_after_subpath_end_restarts_without_joining() {
        let mut canvas = CanvasState::new(64, 64);
        let mut settings = BrushToolSettings::default();
        settings.set_radius(1.0);
        let mut controller = StrokeController::new(settings);
        let mut records: Vec<StrokeRecord> = Vec::new();

        controller.press(&mut canvas, pos2(10.0, 10.0), Modifiers::default());
        controller.drag(&mut canvas, pos2(10.0, 30.0));
        controller.end_subpath();
        controller.drag(&mut canvas, pos2(40.0, 30.0));
        controller.drag(&mut canvas, pos2(40.0, 50.0));
        controller.release(&mut canvas, &mut records);

        let pixels = &canvas.layers[0].pixels;
        assert_eq!(pixels.get_pixel(10, 20)[3], 255);
        assert_eq!(pixels.get_pixel(25, 30)[3], 0);
        assert_eq!(pixels.get_pixel(40, 40)[3], 255);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn lazy_indicator_only_while_active() {
        let mut canvas = CanvasState::new(200, 50);
        let mut settings = BrushToolSettings::default();
        settings.set_lazy_mouse(true);
        let mut controller = StrokeController::new(settings);
        let mut records: Vec<StrokeRecord> = Vec::new();
        assert_eq!(controller.lazy_mouse_indicator(), None);
        controller.press(&mut canvas, pos2(10.0, 20.0), Modifiers::default());
        controller.drag(&mut canvas, pos2(100.0, 20.0));
        let loc = controller.lazy_mouse_indicator().unwrap();
        assert!((loc.x - 70.0).abs() < 1e-3);
        controller.release(&mut canvas, &mut records);
        assert_eq!(controller.lazy_mouse_indicator(), None);
    }

    #[test]
    fn mask_gray_uses_luminance() {
        assert_eq!(to_mask_gray(Rgba([255, 255, 255, 200])), Rgba([255, 255, 255, 200]));
        assert_eq!(to_mask_gray(Rgba([0, 0, 0, 255])), Rgba([0, 0, 0, 255]));
    }
}
