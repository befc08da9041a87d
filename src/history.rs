use egui::{Rect, pos2};
use image::Rgba;

use crate::canvas::{CanvasState, DrawableId, TiledImage};
use crate::stroke::target::DrawTarget;
use crate::{log_info, log_warn};

// ============================================================================
// COMMAND TRAIT
// ============================================================================

/// Undoable/redoable edit.
pub trait Command {
    fn undo(&self, canvas: &mut CanvasState);
    fn redo(&self, canvas: &mut CanvasState);
    fn description(&self) -> String;
}

// ============================================================================
// PIXEL PATCH
// ============================================================================

/// A rectangular copy of one drawable's pixels.
#[derive(Clone)]
pub struct PixelPatch {
    pub drawable: DrawableId,
    pub rect: Rect,
    pub pixels: Vec<Rgba<u8>>,
    pub width: u32,
    pub height: u32,
}

impl PixelPatch {
    /// Copy `rect` (rounded outwards and clamped to the image) out of `image`.
    pub fn capture(image: &TiledImage, drawable: DrawableId, rect: Rect) -> Self {
        let min_x = (rect.min.x.floor().max(0.0) as u32).min(image.width());
        let min_y = (rect.min.y.floor().max(0.0) as u32).min(image.height());
        let max_x = (rect.max.x.ceil().max(0.0) as u32).min(image.width());
        let max_y = (rect.max.y.ceil().max(0.0) as u32).min(image.height());

        let width = max_x.saturating_sub(min_x);
        let height = max_y.saturating_sub(min_y);

        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in min_y..max_y {
            for x in min_x..max_x {
                pixels.push(*image.get_pixel(x, y));
            }
        }

        Self {
            drawable,
            rect: Rect::from_min_max(
                pos2(min_x as f32, min_y as f32),
                pos2(max_x as f32, max_y as f32),
            ),
            pixels,
            width,
            height,
        }
    }

    /// Write the patch back into its drawable.
    pub fn apply(&self, canvas: &mut CanvasState) {
        let Some(image) = canvas.drawable_mut(self.drawable) else {
            log_warn!("PixelPatch: drawable {:?} no longer exists", self.drawable);
            return;
        };
        let min_x = self.rect.min.x as u32;
        let min_y = self.rect.min.y as u32;
        for (idx, px) in self.pixels.iter().enumerate() {
            let x = min_x + idx as u32 % self.width;
            let y = min_y + idx as u32 / self.width;
            image.put_pixel(x, y, *px);
        }
    }
}

// ============================================================================
// STROKE RECORD – what the brush pipeline hands to the undo log
// ============================================================================

/// One committed stroke. `before` and `after` cover the same clipped rectangle.
pub struct StrokeRecord {
    pub drawable: DrawableId,
    pub rect: Rect,
    pub before: PixelPatch,
    pub after: PixelPatch,
    pub target: DrawTarget,
    pub description: String,
}

/// Receiver of committed strokes.
pub trait UndoSink {
    fn push_stroke(&mut self, record: StrokeRecord);
}

impl UndoSink for Vec<StrokeRecord> {
    fn push_stroke(&mut self, record: StrokeRecord) {
        self.push(record);
    }
}

pub struct StrokeCommand {
    description: String,
    before_patch: PixelPatch,
    after_patch: PixelPatch,
}

impl From<StrokeRecord> for StrokeCommand {
    fn from(record: StrokeRecord) -> Self {
        Self {
            description: record.description,
            before_patch: record.before,
            after_patch: record.after,
        }
    }
}

impl Command for StrokeCommand {
    fn undo(&self, canvas: &mut CanvasState) {
        self.before_patch.apply(canvas);
    }

    fn redo(&self, canvas: &mut CanvasState) {
        self.after_patch.apply(canvas);
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

// ============================================================================
// HISTORY
// ============================================================================

/// Linear undo/redo stack with a step limit.
pub struct History {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: max_steps.max(1),
        }
    }

    pub fn push(&mut self, command: Box<dyn Command>) {
        self.redo_stack.clear();
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }

    pub fn undo(&mut self, canvas: &mut CanvasState) -> bool {
        let Some(command) = self.undo_stack.pop() else { return false };
        log_info!("Undo: {}", command.description());
        command.undo(canvas);
        self.redo_stack.push(command);
        true
    }

    pub fn redo(&mut self, canvas: &mut CanvasState) -> bool {
        let Some(command) = self.redo_stack.pop() else { return false };
        log_info!("Redo: {}", command.description());
        command.redo(canvas);
        self.undo_stack.push(command);
        true
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }
}

impl UndoSink for History {
    fn push_stroke(&mut self, record: StrokeRecord) {
        self.push(Box::new(StrokeCommand::from(record)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_clamps_to_image() {
        let img = TiledImage::new_filled(10, 10, Rgba([1, 1, 1, 255]));
        let id = DrawableId { layer: uuid::Uuid::nil(), mask: false };
        let patch = PixelPatch::capture(&img, id, Rect::from_min_max(pos2(-3.0, 8.5), pos2(4.0, 20.0)));
        assert_eq!((patch.width, patch.height), (4, 2));
        assert_eq!(patch.pixels.len(), 8);
        assert_eq!(patch.rect.min, pos2(0.0, 8.0));
    }

    #[test]
    fn history_drops_oldest_past_limit() {
        let mut canvas = CanvasState::new(4, 4);
        let id = canvas.active_drawable_id().unwrap();
        let mut history = History::new(2);
        for _ in 0..3 {
            let image = canvas.drawable(id).unwrap();
            let patch = PixelPatch::capture(image, id, canvas.bounds());
            history.push(Box::new(StrokeCommand {
                description: "Brush Stroke".into(),
                before_patch: patch.clone(),
                after_patch: patch,
            }));
        }
        assert_eq!(history.len(), 2);
        assert!(history.undo(&mut canvas));
        assert!(history.undo(&mut canvas));
        assert!(!history.undo(&mut canvas));
        assert!(history.can_redo());
    }
}
