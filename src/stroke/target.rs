use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::canvas::{BlendMode, TiledImage, blend_pixel};

/// Where a stroke's dabs are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawTarget {
    /// Straight into the drawable, live; a full backup is kept for undo.
    #[default]
    Direct,
    /// Into a transparent overlay merged with the stroke's composite on finish.
    TempLayer,
}

impl DrawTarget {
    pub fn key(&self) -> &'static str {
        match self {
            DrawTarget::Direct => "direct",
            DrawTarget::TempLayer => "temp_layer",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "direct" => Some(DrawTarget::Direct),
            "temp_layer" => Some(DrawTarget::TempLayer),
            _ => None,
        }
    }
}

/// Blend mode and opacity used to merge a temp-layer stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Composite {
    pub blend_mode: BlendMode,
    pub opacity: f32,
}

impl Composite {
    pub const NORMAL: Composite = Composite { blend_mode: BlendMode::Normal, opacity: 1.0 };

    pub fn new(blend_mode: BlendMode, opacity: f32) -> Self {
        Self { blend_mode, opacity: opacity.clamp(0.0, 1.0) }
    }
}

impl Default for Composite {
    fn default() -> Self {
        Self::NORMAL
    }
}

// ============================================================================
// STROKE SURFACE
// ============================================================================

/// The raster a stroke's dabs accumulate in.
///
/// Both targets paint into a transparent stroke layer. For Direct the layer is
/// also live: every write recomposites that pixel over the pre-stroke backup
/// into the drawable, so the drawable always equals `backup + layer`, the same
/// merge a temp layer gets on finish.
pub struct StrokeSurface<'a> {
    layer: &'a mut TiledImage,
    live: Option<LiveTarget<'a>>,
}

struct LiveTarget<'a> {
    base: &'a TiledImage,
    out: &'a mut TiledImage,
}

impl<'a> StrokeSurface<'a> {
    pub fn width(&self) -> u32 {
        self.layer.width()
    }

    pub fn height(&self) -> u32 {
        self.layer.height()
    }

    /// Accumulated stroke pixel (not the drawable's).
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.layer.get_pixel(x, y)
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        self.layer.put_pixel(x, y, pixel);
        if let Some(live) = self.live.as_mut() {
            let merged = blend_pixel(*live.base.get_pixel(x, y), pixel, BlendMode::Normal, 1.0);
            live.out.put_pixel(x, y, merged);
        }
    }
}

/// A bare raster: dabs land in it directly.
impl<'a> From<&'a mut TiledImage> for StrokeSurface<'a> {
    fn from(layer: &'a mut TiledImage) -> Self {
        Self { layer, live: None }
    }
}

// ============================================================================
// DRAW TARGET STATE
// ============================================================================

/// Per-stroke state of a [`DrawTarget`].
///
/// Lifecycle: `prepare` → `acquire_surface`* → `original_for_undo` → `finalize`.
pub struct DrawTargetState {
    target: DrawTarget,
    backup: Option<TiledImage>,
    layer: Option<TiledImage>,
    composite: Composite,
    prepared: bool,
    touched: bool,
}

impl DrawTargetState {
    pub fn new(target: DrawTarget) -> Self {
        Self {
            target,
            backup: None,
            layer: None,
            composite: Composite::NORMAL,
            prepared: false,
            touched: false,
        }
    }

    pub fn target(&self) -> DrawTarget {
        self.target
    }

    /// # Panics
    /// When called twice without an intervening [`DrawTargetState::finalize`].
    pub fn prepare(&mut self, drawable: &TiledImage) {
        assert!(!self.prepared, "draw target prepared twice without finalize");
        if self.target == DrawTarget::Direct {
            // chunk Arcs are shared, so this is cheap until dabs land
            self.backup = Some(drawable.clone());
        }
        self.layer = Some(TiledImage::new(drawable.width(), drawable.height()));
        self.prepared = true;
        self.touched = false;
    }

    /// The surface the brushes paint into for this stroke.
    ///
    /// # Panics
    /// If the target is not prepared.
    pub fn acquire_surface<'a>(
        &'a mut self,
        drawable: &'a mut TiledImage,
        composite: Composite,
    ) -> StrokeSurface<'a> {
        self.composite = composite;
        match (self.target, self.layer.as_mut(), self.backup.as_ref()) {
            (DrawTarget::Direct, Some(layer), Some(base)) => StrokeSurface {
                layer,
                live: Some(LiveTarget { base, out: drawable }),
            },
            (DrawTarget::TempLayer, Some(layer), _) => StrokeSurface::from(layer),
            _ => panic!("surface acquired outside a prepared stroke"),
        }
    }

    /// Record that dabs wrote pixels through the acquired surface.
    pub fn mark_touched(&mut self) {
        self.touched = true;
    }

    pub fn touched(&self) -> bool {
        self.touched
    }

    pub fn has_stroke_layer(&self) -> bool {
        self.layer.is_some()
    }

    /// Pixels as they were before the stroke.
    ///
    /// # Panics
    /// If the target is not prepared (never prepared, or already finalized).
    pub fn original_for_undo<'a>(&'a self, drawable: &'a TiledImage) -> &'a TiledImage {
        assert!(self.prepared, "original_for_undo called outside a prepared stroke");
        match self.target {
            DrawTarget::Direct => self.backup.as_ref().unwrap_or(drawable),
            DrawTarget::TempLayer => drawable,
        }
    }

    /// End the stroke: merge the temp layer with the composite, or drop the
    /// backup and live layer (direct).
    pub fn finalize(&mut self, drawable: &mut TiledImage) {
        if let Some(layer) = self.layer.take()
            && self.target == DrawTarget::TempLayer
            && self.touched
        {
            drawable.composite_from(&layer, self.composite.blend_mode, self.composite.opacity);
        }
        self.backup = None;
        self.prepared = false;
    }
}
