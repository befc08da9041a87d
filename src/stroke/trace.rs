use egui::{Pos2, pos2};
use lyon_path::iterator::PathIterator;
use lyon_path::math::{Point, point};
use lyon_path::{Path, PathEvent};

use crate::canvas::CanvasState;
use crate::history::UndoSink;
use crate::log_debug;
use crate::stroke::controller::StrokeController;

/// Max distance between a curve and its flattened polyline, in pixels.
pub const FLATTENING_TOLERANCE: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceOptions {
    /// Clip dabs to the canvas selection. Off when stroking the selection
    /// outline itself, which would otherwise be half clipped away.
    pub respect_selection: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self { respect_selection: true }
    }
}

/// Build a path through `points`, closing it back to the first point if asked.
pub fn polyline_path(points: &[Pos2], closed: bool) -> Path {
    let mut builder = Path::builder();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        builder.begin(to_point(*first));
        for p in iter {
            builder.line_to(to_point(*p));
        }
        builder.end(closed);
    }
    builder.build()
}

fn to_point(p: Pos2) -> Point {
    point(p.x, p.y)
}

fn to_pos(p: Point) -> Pos2 {
    pos2(p.x, p.y)
}

/// Strokes a geometric path with the controller's current brush, exactly as
/// if the flattened path had been dragged with the pointer.
pub struct PathTracer {
    pub tolerance: f32,
    pub options: TraceOptions,
}

impl Default for PathTracer {
    fn default() -> Self {
        Self { tolerance: FLATTENING_TOLERANCE, options: TraceOptions::default() }
    }
}

impl PathTracer {
    pub fn new(options: TraceOptions) -> Self {
        Self { options, ..Self::default() }
    }

    /// Trace every subpath as one stroke, committed once at the end.
    /// Returns whether an undo record was pushed. A shift-click right after a
    /// trace does not connect to it.
    ///
    /// # Panics
    /// If the controller already has an active stroke.
    pub fn trace(
        &self,
        controller: &mut StrokeController,
        canvas: &mut CanvasState,
        path: &Path,
        sink: &mut dyn UndoSink,
    ) -> bool {
        let committed = self.stroke_path(controller, canvas, path, sink);
        controller.reset_first_press();
        committed
    }

    fn stroke_path(
        &self,
        controller: &mut StrokeController,
        canvas: &mut CanvasState,
        path: &Path,
        sink: &mut dyn UndoSink,
    ) -> bool {
        let mut started = false;
        let mut subpaths = 0usize;
        for event in path.iter().flattened(self.tolerance) {
            match event {
                PathEvent::Begin { at } => {
                    if started {
                        controller.end_subpath();
                    } else if controller.begin_programmatic(canvas, self.options.respect_selection) {
                        started = true;
                    } else {
                        return false;
                    }
                    subpaths += 1;
                    controller.start_at(canvas, to_pos(at));
                }
                PathEvent::Line { to, .. } => controller.continue_to(canvas, to_pos(to)),
                PathEvent::End { first, close: true, .. } => controller.continue_to(canvas, to_pos(first)),
                PathEvent::End { .. } => {}
                // flattening leaves only lines
                PathEvent::Quadratic { to, .. } | PathEvent::Cubic { to, .. } => {
                    controller.continue_to(canvas, to_pos(to))
                }
            }
        }
        if !started {
            return false;
        }
        log_debug!("Traced {} subpath(s)", subpaths);
        controller.finish(canvas, sink)
    }
}

/// [`PathTracer::trace`] with the default tolerance.
pub fn trace_path(
    controller: &mut StrokeController,
    canvas: &mut CanvasState,
    path: &Path,
    options: TraceOptions,
    sink: &mut dyn UndoSink,
) -> bool {
    PathTracer::new(options).trace(controller, canvas, path, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::StrokeRecord;

    #[test]
    fn polyline_events() {
        let path = polyline_path(&[pos2(0.0, 0.0), pos2(10.0, 0.0), pos2(10.0, 10.0)], true);
        let events: Vec<PathEvent> = path.iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], PathEvent::Begin { .. }));
        assert!(matches!(events[3], PathEvent::End { close: true, .. }));
    }

    #[test]
    fn empty_path_traces_nothing() {
        let mut canvas = CanvasState::new(16, 16);
        let mut controller = StrokeController::default();
        let mut records: Vec<StrokeRecord> = Vec::new();
        let path = polyline_path(&[], false);
        assert!(!trace_path(&mut controller, &mut canvas, &path, TraceOptions::default(), &mut records));
        assert!(!controller.is_active());
    }
}
