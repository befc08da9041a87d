//! Brush-stroke pipeline: pointer samples or traced paths in, committed
//! pixel edits and undo records out.
//!
//! Brush stack per stroke, outermost first:
//! `SymmetryBrush` → (`LazyMouseBrush`) → `AffectedAreaBrush` → `HardBrush` / `SoftBrush`.

pub mod affected;
pub mod brush;
pub mod controller;
pub mod lazy;
pub mod symmetry;
pub mod target;
pub mod trace;
pub mod tracking;

pub use affected::AffectedArea;
pub use brush::{Brush, BrushVariant, DabBrush, DabContext, DabShape, HardBrush, HardDisc, SoftBrush, SoftFalloff};
pub use controller::{Modifiers, PointerEvent, PointerKind, StrokeController};
pub use lazy::LazyMouseBrush;
pub use symmetry::{CanvasSize, SymmetryBrush, SymmetryMode};
pub use target::{Composite, DrawTarget, DrawTargetState, StrokeSurface};
pub use trace::{PathTracer, TraceOptions, polyline_path, trace_path};
pub use tracking::AffectedAreaBrush;
