use std::sync::Arc;

use egui::{Pos2, Rect, pos2};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use rayon::prelude::*;
use uuid::Uuid;

// ============================================================================
// SELECTION
// ============================================================================

/// Shape used to build a selection mask.
#[derive(Clone, Debug)]
pub enum SelectionShape {
    Rectangle { min_x: u32, min_y: u32, max_x: u32, max_y: u32 },
    Ellipse   { cx: f32, cy: f32, rx: f32, ry: f32 },
}

impl SelectionShape {
    /// Returns 255 if the pixel (x, y) is inside the shape, 0 otherwise.
    pub fn contains(&self, x: u32, y: u32) -> u8 {
        match self {
            SelectionShape::Rectangle { min_x, min_y, max_x, max_y } => {
                if x >= *min_x && x <= *max_x && y >= *min_y && y <= *max_y { 255 } else { 0 }
            }
            SelectionShape::Ellipse { cx, cy, rx, ry } => {
                if *rx <= 0.0 || *ry <= 0.0 {
                    return 0;
                }
                let dx = (x as f32 - cx) / rx;
                let dy = (y as f32 - cy) / ry;
                if dx * dx + dy * dy <= 1.0 { 255 } else { 0 }
            }
        }
    }
}

// ============================================================================
// TILED IMAGE – sparse 64×64 chunk storage
// ============================================================================

pub const CHUNK_SIZE: u32 = 64;

static TRANSPARENT_PIXEL: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Sparse tiled raster backed by a flat `Vec<Option<Arc<RgbaImage>>>`.
///
/// Chunks are `Arc`-shared, so `clone()` is a reference-count bump per chunk
/// and writes copy only the chunk they touch. This is what makes the
/// full-raster backup of a direct stroke affordable.
#[derive(Clone)]
pub struct TiledImage {
    width: u32,
    height: u32,
    chunks_per_row: u32,
    chunks: Vec<Option<Arc<RgbaImage>>>,
}

impl TiledImage {
    /// Create an empty (fully transparent) tiled image. Zero dimensions are
    /// bumped to 1 so chunk arithmetic never divides an empty grid.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let chunks_per_row = width.div_ceil(CHUNK_SIZE);
        let chunks_per_col = height.div_ceil(CHUNK_SIZE);
        Self {
            width,
            height,
            chunks_per_row,
            chunks: vec![None; (chunks_per_row * chunks_per_col) as usize],
        }
    }

    /// Fill the entire image with `color`; a transparent fill allocates nothing.
    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let mut img = Self::new(width, height);
        if color[3] > 0 {
            let chunk = Arc::new(RgbaImage::from_pixel(CHUNK_SIZE, CHUNK_SIZE, color));
            for slot in img.chunks.iter_mut() {
                *slot = Some(Arc::clone(&chunk));
            }
        }
        img
    }

    /// Import from a flat `RgbaImage`. Only chunks with visible content are stored;
    /// conversion runs in parallel.
    pub fn from_rgba_image(src: &RgbaImage) -> Self {
        let mut img = Self::new(src.width(), src.height());
        let (width, height) = (img.width, img.height);
        let chunks_x = img.chunks_per_row as usize;
        let src_raw = src.as_raw();

        let converted: Vec<(usize, Option<Arc<RgbaImage>>)> = (0..img.chunks.len())
            .into_par_iter()
            .map(|flat| {
                let base_x = (flat % chunks_x) as u32 * CHUNK_SIZE;
                let base_y = (flat / chunks_x) as u32 * CHUNK_SIZE;
                let cw = CHUNK_SIZE.min(width - base_x) as usize;
                let ch = CHUNK_SIZE.min(height - base_y);
                let stride = CHUNK_SIZE as usize * 4;
                let mut data = vec![0u8; stride * CHUNK_SIZE as usize];
                let mut has_content = false;

                for ly in 0..ch {
                    let src_start = ((base_y + ly) * width + base_x) as usize * 4;
                    let dst_start = ly as usize * stride;
                    let row = &src_raw[src_start..src_start + cw * 4];
                    data[dst_start..dst_start + cw * 4].copy_from_slice(row);
                    has_content |= row.chunks_exact(4).any(|px| px[3] != 0);
                }

                let chunk = if has_content {
                    RgbaImage::from_raw(CHUNK_SIZE, CHUNK_SIZE, data).map(Arc::new)
                } else {
                    None
                };
                (flat, chunk)
            })
            .collect();

        for (idx, chunk) in converted {
            img.chunks[idx] = chunk;
        }
        img
    }

    /// Flatten back to a contiguous `RgbaImage`.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        let out_stride = self.width as usize * 4;
        let out_raw: &mut [u8] = out.as_mut();
        for (idx, slot) in self.chunks.iter().enumerate() {
            let Some(chunk) = slot else { continue };
            let base_x = (idx as u32 % self.chunks_per_row) * CHUNK_SIZE;
            let base_y = (idx as u32 / self.chunks_per_row) * CHUNK_SIZE;
            let cw = CHUNK_SIZE.min(self.width - base_x) as usize;
            let ch = CHUNK_SIZE.min(self.height - base_y) as usize;
            let chunk_raw = chunk.as_raw();
            let chunk_stride = CHUNK_SIZE as usize * 4;
            for ly in 0..ch {
                let src = ly * chunk_stride;
                let dst = (base_y as usize + ly) * out_stride + base_x as usize * 4;
                out_raw[dst..dst + cw * 4].copy_from_slice(&chunk_raw[src..src + cw * 4]);
            }
        }
        out
    }

    #[inline(always)]
    fn slot_index(&self, x: u32, y: u32) -> usize {
        ((y / CHUNK_SIZE) * self.chunks_per_row + x / CHUNK_SIZE) as usize
    }

    /// Read a pixel; out-of-bounds and unpopulated chunks read as transparent.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> &Rgba<u8> {
        if x >= self.width || y >= self.height {
            return &TRANSPARENT_PIXEL;
        }
        self.chunks[self.slot_index(x, y)]
            .as_ref()
            .map(|c| c.get_pixel(x % CHUNK_SIZE, y % CHUNK_SIZE))
            .unwrap_or(&TRANSPARENT_PIXEL)
    }

    /// Write a pixel (creates the chunk on demand, COW-clones if shared).
    /// Out-of-bounds writes are dropped.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.slot_index(x, y);
        let arc = self.chunks[idx]
            .get_or_insert_with(|| Arc::new(RgbaImage::new(CHUNK_SIZE, CHUNK_SIZE)));
        Arc::make_mut(arc).put_pixel(x % CHUNK_SIZE, y % CHUNK_SIZE, pixel);
    }

    /// Number of populated chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    /// Composite `top` onto this image, chunk by chunk in parallel.
    /// Only chunks populated in `top` are visited.
    pub fn composite_from(&mut self, top: &TiledImage, mode: BlendMode, opacity: f32) {
        debug_assert_eq!((self.width, self.height), (top.width, top.height));
        let base_chunks = &self.chunks;
        let merged: Vec<(usize, Arc<RgbaImage>)> = top
            .chunks
            .par_iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|chunk| (idx, chunk)))
            .map(|(idx, top_chunk)| {
                let mut base = match base_chunks.get(idx).and_then(|c| c.as_ref()) {
                    Some(existing) => RgbaImage::clone(existing),
                    None => RgbaImage::new(CHUNK_SIZE, CHUNK_SIZE),
                };
                for (dst, src) in base.pixels_mut().zip(top_chunk.pixels()) {
                    *dst = blend_pixel(*dst, *src, mode, opacity);
                }
                (idx, Arc::new(base))
            })
            .collect();

        for (idx, chunk) in merged {
            self.chunks[idx] = Some(chunk);
        }
    }

    /// True when both images have the same size and identical visible pixels.
    pub fn pixels_eq(&self, other: &TiledImage) -> bool {
        if self.width != other.width || self.height != other.height {
            return false;
        }
        (0..self.height).all(|y| (0..self.width).all(|x| self.get_pixel(x, y) == other.get_pixel(x, y)))
    }

    pub fn width(&self) -> u32 { self.width }

    pub fn height(&self) -> u32 { self.height }
}

// ============================================================================
// BLENDING
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Difference,
    Additive,
    Subtract,
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Difference,
            BlendMode::Additive,
            BlendMode::Subtract,
        ]
    }

    /// Stable key used in preset files.
    pub fn key(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::Difference => "difference",
            BlendMode::Additive => "additive",
            BlendMode::Subtract => "subtract",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|m| m.key() == key)
    }

    fn channel(self, base: f32, top: f32) -> f32 {
        match self {
            BlendMode::Normal => top,
            BlendMode::Multiply => base * top,
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - top),
            BlendMode::Overlay => {
                if base < 0.5 {
                    2.0 * base * top
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - top)
                }
            }
            BlendMode::Darken => base.min(top),
            BlendMode::Lighten => base.max(top),
            BlendMode::Difference => (base - top).abs(),
            BlendMode::Additive => (base + top).min(1.0),
            BlendMode::Subtract => (base - top).max(0.0),
        }
    }
}

/// Blend `top` over `base` with the given mode and layer opacity (0–1).
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 {
        return base;
    }
    // Normal, full opacity, opaque source: plain overwrite
    if mode == BlendMode::Normal && opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);
    let base_a = base[3] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let b = base[c] as f32 / 255.0;
        let t = top[c] as f32 / 255.0;
        let blended = mode.channel(b, t);
        let v = (blended * top_a + b * base_a * (1.0 - top_a)) / out_a;
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

// ============================================================================
// LAYERS
// ============================================================================

/// Which raster of the active layer edits go to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EditTarget {
    #[default]
    Layer,
    Mask,
}

/// Identifies one editable raster: a layer's pixels or its mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawableId {
    pub layer: Uuid,
    pub mask: bool,
}

pub struct Layer {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub pixels: TiledImage,
    /// Grayscale reveal mask stored as opaque gray RGBA (white = visible).
    pub mask: Option<TiledImage>,
}

impl Layer {
    pub fn new(name: String, width: u32, height: u32, fill_color: Rgba<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            pixels: TiledImage::new_filled(width, height, fill_color),
            mask: None,
        }
    }

    /// Attach a reveal-all mask if the layer has none yet.
    pub fn add_mask(&mut self) {
        if self.mask.is_none() {
            let (w, h) = (self.pixels.width(), self.pixels.height());
            self.mask = Some(TiledImage::new_filled(w, h, Rgba([255, 255, 255, 255])));
        }
    }
}

// ============================================================================
// CANVAS STATE
// ============================================================================

pub struct CanvasState {
    pub layers: Vec<Layer>,
    pub active_layer_index: usize,
    pub width: u32,
    pub height: u32,
    edit_target: EditTarget,
    selection_mask: Option<GrayImage>,
}

impl CanvasState {
    /// New canvas with a single transparent layer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, Rgba([0, 0, 0, 0]))
    }

    pub fn with_background(width: u32, height: u32, fill: Rgba<u8>) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            layers: vec![Layer::new("Background".to_string(), width, height, fill)],
            active_layer_index: 0,
            width,
            height,
            edit_target: EditTarget::Layer,
            selection_mask: None,
        }
    }

    /// Wrap a flat image as a single-layer canvas.
    pub fn from_rgba_image(img: &RgbaImage) -> Self {
        let mut state = Self::new(img.width(), img.height());
        state.layers[0].pixels = TiledImage::from_rgba_image(img);
        state
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.get(self.active_layer_index)
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        self.layers.get_mut(self.active_layer_index)
    }

    pub fn edit_target(&self) -> EditTarget {
        self.edit_target
    }

    /// Switch between layer and mask editing. Asking for the mask of a layer
    /// without one leaves the layer as the target. Returns the target in effect.
    pub fn set_edit_target(&mut self, target: EditTarget) -> EditTarget {
        let has_mask = self.active_layer().is_some_and(|l| l.mask.is_some());
        self.edit_target = match target {
            EditTarget::Mask if has_mask => EditTarget::Mask,
            _ => EditTarget::Layer,
        };
        self.edit_target
    }

    pub fn active_drawable_id(&self) -> Option<DrawableId> {
        self.active_layer().map(|layer| DrawableId {
            layer: layer.id,
            mask: self.edit_target == EditTarget::Mask && layer.mask.is_some(),
        })
    }

    pub fn drawable(&self, id: DrawableId) -> Option<&TiledImage> {
        let layer = self.layers.iter().find(|l| l.id == id.layer)?;
        if id.mask { layer.mask.as_ref() } else { Some(&layer.pixels) }
    }

    pub fn drawable_mut(&mut self, id: DrawableId) -> Option<&mut TiledImage> {
        let layer = self.layers.iter_mut().find(|l| l.id == id.layer)?;
        if id.mask { layer.mask.as_mut() } else { Some(&mut layer.pixels) }
    }

    /// Replace the selection with `shape`.
    pub fn select(&mut self, shape: &SelectionShape) {
        let mask = GrayImage::from_fn(self.width, self.height, |x, y| Luma([shape.contains(x, y)]));
        self.selection_mask = Some(mask);
    }

    pub fn clear_selection(&mut self) {
        self.selection_mask = None;
    }

    pub fn has_selection(&self) -> bool {
        self.selection_mask.is_some()
    }

    pub fn selection_mask(&self) -> Option<&GrayImage> {
        self.selection_mask.as_ref()
    }

    /// Tight bounds of the selected pixels, `None` if there is no selection.
    /// An empty selection yields a zero-area rect at the origin.
    pub fn selection_bounds(&self) -> Option<Rect> {
        let mask = self.selection_mask.as_ref()?;
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0u32, 0u32);
        for (x, y, px) in mask.enumerate_pixels() {
            if px[0] > 0 {
                min = (min.0.min(x), min.1.min(y));
                max = (max.0.max(x), max.1.max(y));
            }
        }
        if min.0 == u32::MAX {
            return Some(Rect::from_min_max(Pos2::ZERO, Pos2::ZERO));
        }
        Some(Rect::from_min_max(
            pos2(min.0 as f32, min.1 as f32),
            pos2(max.0 as f32 + 1.0, max.1 as f32 + 1.0),
        ))
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_max(Pos2::ZERO, pos2(self.width as f32, self.height as f32))
    }

    /// Flatten visible layers (masks applied) into one image.
    pub fn composite(&self) -> RgbaImage {
        let mut out = TiledImage::new(self.width, self.height);
        for layer in self.layers.iter().filter(|l| l.visible) {
            match &layer.mask {
                Some(mask) => {
                    let mut masked = layer.pixels.clone();
                    for y in 0..self.height {
                        for x in 0..self.width {
                            let px = *masked.get_pixel(x, y);
                            if px[3] == 0 {
                                continue;
                            }
                            let reveal = mask.get_pixel(x, y)[0] as u32;
                            let a = (px[3] as u32 * reveal / 255) as u8;
                            masked.put_pixel(x, y, Rgba([px[0], px[1], px[2], a]));
                        }
                    }
                    out.composite_from(&masked, layer.blend_mode, layer.opacity);
                }
                None => out.composite_from(&layer.pixels, layer.blend_mode, layer.opacity),
            }
        }
        out.to_rgba_image()
    }
}
