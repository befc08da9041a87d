//! StrokeFE: the brush-stroke pipeline of a raster editor.
//!
//! Pointer samples or traced paths go through a stack of brushes (symmetry
//! fan-out, lazy mouse, affected-region tracking) into a layer or mask, and
//! each finished stroke leaves one undo record.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod error;
pub mod history;
pub mod recording;
pub mod settings;
pub mod stroke;

pub use canvas::{BlendMode, CanvasState, DrawableId, EditTarget, Layer, SelectionShape, TiledImage};
pub use error::{CliError, PresetError, RecordingError};
pub use history::{History, PixelPatch, StrokeRecord, UndoSink};
pub use recording::{RecordedInput, StrokeRecording};
pub use settings::{BrushToolSettings, DrawTargetSettings, LazyMouseSettings};
