use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::canvas::CanvasState;
use crate::error::RecordingError;
use crate::history::UndoSink;
use crate::{log_info, log_warn};
use crate::stroke::controller::{PointerEvent, PointerKind, StrokeController};
use crate::stroke::trace::{TraceOptions, polyline_path, trace_path};

pub const RECORDING_MAGIC: &str = "SFR1";

/// One recorded input to the stroke controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecordedInput {
    Pointer(PointerEvent),
    Trace { points: Vec<Pos2>, closed: bool, respect_selection: bool },
    /// Tool deactivated (commits any running stroke).
    Deactivate,
}

#[derive(Serialize, Deserialize)]
struct RecordingFile {
    magic: String,
    inputs: Vec<RecordedInput>,
}

/// A replayable list of controller inputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrokeRecording {
    inputs: Vec<RecordedInput>,
}

impl StrokeRecording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(&self) -> &[RecordedInput] {
        &self.inputs
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn push(&mut self, input: RecordedInput) {
        self.inputs.push(input);
    }

    pub fn push_pointer(&mut self, event: PointerEvent) {
        self.inputs.push(RecordedInput::Pointer(event));
    }

    pub fn push_trace(&mut self, points: &[Pos2], closed: bool, options: TraceOptions) {
        self.inputs.push(RecordedInput::Trace {
            points: points.to_vec(),
            closed,
            respect_selection: options.respect_selection,
        });
    }

    /// Feed every input to `controller`, in order. A stroke the recording
    /// leaves open (a second press, a trace, or the end) is committed first.
    pub fn replay(&self, controller: &mut StrokeController, canvas: &mut CanvasState, sink: &mut dyn UndoSink) {
        for input in &self.inputs {
            match input {
                RecordedInput::Pointer(event) => {
                    if event.kind == PointerKind::Press && controller.is_active() {
                        log_warn!("Recording presses again without a release, committing the open stroke");
                        controller.release(canvas, sink);
                    }
                    controller.handle(canvas, *event, sink);
                }
                RecordedInput::Trace { points, closed, respect_selection } => {
                    // a press without release before a trace
                    controller.release(canvas, sink);
                    let path = polyline_path(points, *closed);
                    let options = TraceOptions { respect_selection: *respect_selection };
                    trace_path(controller, canvas, &path, options, sink);
                }
                RecordedInput::Deactivate => controller.deactivate(canvas, sink),
            }
        }
        if controller.is_active() {
            controller.deactivate(canvas, sink);
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordingError> {
        let file = RecordingFile { magic: RECORDING_MAGIC.to_string(), inputs: self.inputs.clone() };
        Ok(bincode::serialize(&file)?)
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, RecordingError> {
        // bincode writes the magic String as an 8-byte length prefix + UTF-8
        if raw.len() < 12 || std::str::from_utf8(&raw[8..12]).unwrap_or("") != RECORDING_MAGIC {
            return Err(RecordingError::InvalidFormat("not a stroke recording".into()));
        }
        let file: RecordingFile = bincode::deserialize(raw)?;
        Ok(Self { inputs: file.inputs })
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordingError> {
        let file = RecordingFile { magic: RECORDING_MAGIC.to_string(), inputs: self.inputs.clone() };
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &file)?;
        log_info!("Saved stroke recording ({} inputs) to {}", self.inputs.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RecordingError> {
        let raw = std::fs::read(path)?;
        let recording = Self::from_bytes(&raw)?;
        log_info!("Loaded stroke recording ({} inputs) from {}", recording.len(), path.display());
        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn bytes_keep_inputs() {
        let mut rec = StrokeRecording::new();
        rec.push_pointer(PointerEvent::press(pos2(1.0, 2.0)));
        rec.push_trace(&[pos2(0.0, 0.0), pos2(5.0, 5.0)], true, TraceOptions::default());
        rec.push(RecordedInput::Deactivate);
        let back = StrokeRecording::from_bytes(&rec.to_bytes().unwrap()).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn rejects_foreign_bytes() {
        let err = StrokeRecording::from_bytes(b"definitely not a recording").unwrap_err();
        assert!(matches!(err, RecordingError::InvalidFormat(_)));
    }
}
