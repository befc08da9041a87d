use image::Rgba;

use crate::canvas::BlendMode;
use crate::error::PresetError;
use crate::log_info;
use crate::stroke::brush::BrushVariant;
use crate::stroke::symmetry::SymmetryMode;
use crate::stroke::target::{Composite, DrawTarget};

pub const MIN_RADIUS: f32 = 1.0;
pub const MAX_RADIUS: f32 = 100.0;
pub const DEFAULT_RADIUS: f32 = 10.0;

pub const MIN_LAZY_DISTANCE: f32 = 10.0;
pub const MAX_LAZY_DISTANCE: f32 = 200.0;
pub const DEFAULT_LAZY_DISTANCE: f32 = 30.0;

// ============================================================================
// LAZY MOUSE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LazyMouseSettings {
    pub enabled: bool,
    distance: f32,
}

impl Default for LazyMouseSettings {
    fn default() -> Self {
        Self { enabled: false, distance: DEFAULT_LAZY_DISTANCE }
    }
}

impl LazyMouseSettings {
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(MIN_LAZY_DISTANCE, MAX_LAZY_DISTANCE);
    }
}

// ============================================================================
// DRAW TARGET
// ============================================================================

/// User preference for the draw target plus the temp-layer composite.
///
/// While a mask is being edited the preference is overridden: strokes go
/// straight into the mask with a plain normal composite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawTargetSettings {
    preference: DrawTarget,
    blend_mode: BlendMode,
    opacity: f32,
    editing_mask: bool,
}

impl Default for DrawTargetSettings {
    fn default() -> Self {
        Self {
            preference: DrawTarget::Direct,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            editing_mask: false,
        }
    }
}

impl DrawTargetSettings {
    pub fn preference(&self) -> DrawTarget {
        self.preference
    }

    pub fn set_preference(&mut self, target: DrawTarget) {
        self.preference = target;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn editing_mask(&self) -> bool {
        self.editing_mask
    }

    pub fn set_editing_mask(&mut self, editing_mask: bool) {
        self.editing_mask = editing_mask;
    }

    /// Blend mode / opacity controls have no effect on masks.
    pub fn blend_controls_enabled(&self) -> bool {
        !self.editing_mask
    }

    /// Target and composite the next stroke will use.
    pub fn effective(&self) -> (DrawTarget, Composite) {
        if self.editing_mask {
            (DrawTarget::Direct, Composite::NORMAL)
        } else {
            (self.preference, Composite::new(self.blend_mode, self.opacity))
        }
    }
}

// ============================================================================
// BRUSH TOOL SETTINGS
// ============================================================================

/// Configuration of the brush tool. The controller reads it when a stroke
/// starts, so changes apply from the next stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct BrushToolSettings {
    radius: f32,
    variant: BrushVariant,
    symmetry: SymmetryMode,
    pub draw_target: DrawTargetSettings,
    lazy_mouse: LazyMouseSettings,
    pub primary_color: Rgba<u8>,
    pub secondary_color: Rgba<u8>,
}

impl Default for BrushToolSettings {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            variant: BrushVariant::Hard,
            symmetry: SymmetryMode::None,
            draw_target: DrawTargetSettings::default(),
            lazy_mouse: LazyMouseSettings::default(),
            primary_color: Rgba([0, 0, 0, 255]),
            secondary_color: Rgba([255, 255, 255, 255]),
        }
    }
}

impl BrushToolSettings {
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// One whole pixel up (`]` key). Fractional radii snap down first.
    pub fn increase_radius(&mut self) {
        if self.radius < MAX_RADIUS {
            self.set_radius(self.radius.trunc() + 1.0);
        }
    }

    /// One whole pixel down (`[` key).
    pub fn decrease_radius(&mut self) {
        if self.radius > MIN_RADIUS {
            self.set_radius(self.radius.trunc() - 1.0);
        }
    }

    pub fn variant(&self) -> BrushVariant {
        self.variant
    }

    pub fn set_variant(&mut self, variant: BrushVariant) {
        self.variant = variant;
    }

    pub fn symmetry(&self) -> SymmetryMode {
        self.symmetry
    }

    pub fn set_symmetry(&mut self, mode: SymmetryMode) {
        self.symmetry = mode;
    }

    pub fn lazy_mouse(&self) -> LazyMouseSettings {
        self.lazy_mouse
    }

    pub fn set_lazy_mouse(&mut self, enabled: bool) {
        self.lazy_mouse.enabled = enabled;
    }

    pub fn set_lazy_distance(&mut self, distance: f32) {
        self.lazy_mouse.set_distance(distance);
    }

    /// Primary colour, or the secondary one for an alternate-colour press.
    pub fn paint_color(&self, alternate: bool) -> Rgba<u8> {
        if alternate { self.secondary_color } else { self.primary_color }
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    pub fn to_preset(&self) -> String {
        format!(
            "# StrokeFE brush preset\n\
             radius={}\n\
             brush={}\n\
             symmetry={}\n\
             draw_target={}\n\
             blend_mode={}\n\
             opacity={}\n\
             lazy_mouse={}\n\
             lazy_distance={}\n\
             primary_color={}\n\
             secondary_color={}\n",
            self.radius,
            self.variant.key(),
            self.symmetry.key(),
            self.draw_target.preference.key(),
            self.draw_target.blend_mode.key(),
            self.draw_target.opacity,
            self.lazy_mouse.enabled,
            self.lazy_mouse.distance,
            color_to_str(self.primary_color),
            color_to_str(self.secondary_color),
        )
    }

    /// Parse a preset. Missing keys keep their defaults; unknown keys are skipped.
    pub fn from_preset(text: &str) -> Result<Self, PresetError> {
        let mut s = Self::default();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else {
                return Err(PresetError::MalformedLine { line: line_no, text: line.to_string() });
            };
            let key = key.trim();
            let val = val.trim();
            let invalid = || PresetError::InvalidValue {
                line: line_no,
                key: key.to_string(),
                value: val.to_string(),
            };
            match key {
                "radius" => {
                    let r: f32 = val.parse().map_err(|_| invalid())?;
                    if !r.is_finite() {
                        return Err(invalid());
                    }
                    s.radius = r.clamp(MIN_RADIUS, MAX_RADIUS);
                }
                "brush" => s.variant = BrushVariant::from_key(val).ok_or_else(invalid)?,
                "symmetry" => s.symmetry = SymmetryMode::from_key(val).ok_or_else(invalid)?,
                "draw_target" => s.draw_target.preference = DrawTarget::from_key(val).ok_or_else(invalid)?,
                "blend_mode" => s.draw_target.blend_mode = BlendMode::from_key(val).ok_or_else(invalid)?,
                "opacity" => {
                    let o: f32 = val.parse().map_err(|_| invalid())?;
                    if !o.is_finite() {
                        return Err(invalid());
                    }
                    s.draw_target.set_opacity(o);
                }
                "lazy_mouse" => s.lazy_mouse.enabled = parse_bool(val).ok_or_else(invalid)?,
                "lazy_distance" => {
                    let d: f32 = val.parse().map_err(|_| invalid())?;
                    if !d.is_finite() {
                        return Err(invalid());
                    }
                    s.lazy_mouse.set_distance(d);
                }
                "primary_color" => s.primary_color = parse_color(val).ok_or_else(invalid)?,
                "secondary_color" => s.secondary_color = parse_color(val).ok_or_else(invalid)?,
                _ => {}
            }
        }
        Ok(s)
    }

    /// Replace everything but the mask-editing state with the preset's values.
    pub fn apply_preset(&mut self, text: &str) -> Result<(), PresetError> {
        let mut loaded = Self::from_preset(text)?;
        loaded.draw_target.editing_mask = self.draw_target.editing_mask;
        *self = loaded;
        log_info!(
            "Loaded brush preset: radius={} brush={} symmetry={} target={}",
            self.radius,
            self.variant.key(),
            self.symmetry.key(),
            self.draw_target.preference.key()
        );
        Ok(())
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn color_to_str(c: Rgba<u8>) -> String {
    format!("{},{},{},{}", c[0], c[1], c[2], c[3])
}

/// `r,g,b` or `r,g,b,a`, each 0–255.
fn parse_color(val: &str) -> Option<Rgba<u8>> {
    let parts = val
        .split(',')
        .map(|p| p.trim().parse::<u8>().ok())
        .collect::<Option<Vec<u8>>>()?;
    match parts.as_slice() {
        [r, g, b] => Some(Rgba([*r, *g, *b, 255])),
        [r, g, b, a] => Some(Rgba([*r, *g, *b, *a])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_and_distance_are_clamped() {
        let mut s = BrushToolSettings::default();
        s.set_radius(0.2);
        assert_eq!(s.radius(), MIN_RADIUS);
        s.set_radius(500.0);
        assert_eq!(s.radius(), MAX_RADIUS);
        s.set_lazy_distance(1.0);
        assert_eq!(s.lazy_mouse().distance(), MIN_LAZY_DISTANCE);
    }

    #[test]
    fn radius_steps_are_whole_pixels() {
        let mut s = BrushToolSettings::default();
        s.set_radius(4.6);
        s.increase_radius();
        assert_eq!(s.radius(), 5.0);
        s.decrease_radius();
        s.decrease_radius();
        assert_eq!(s.radius(), 3.0);
        s.set_radius(MIN_RADIUS);
        s.decrease_radius();
        assert_eq!(s.radius(), MIN_RADIUS);
        s.set_radius(MAX_RADIUS);
        s.increase_radius();
        assert_eq!(s.radius(), MAX_RADIUS);
    }

    #[test]
    fn mask_editing_forces_direct_normal() {
        let mut dt = DrawTargetSettings::default();
        dt.set_preference(DrawTarget::TempLayer);
        dt.set_blend_mode(BlendMode::Multiply);
        dt.set_opacity(0.3);
        dt.set_editing_mask(true);
        assert!(!dt.blend_controls_enabled());
        assert_eq!(dt.effective(), (DrawTarget::Direct, Composite::NORMAL));
        dt.set_editing_mask(false);
        assert_eq!(dt.effective().0, DrawTarget::TempLayer);
    }

    #[test]
    fn preset_errors_carry_line_numbers() {
        let err = BrushToolSettings::from_preset("# c\nradius=5\nbrush=crayon\n").unwrap_err();
        assert_eq!(
            err,
            PresetError::InvalidValue { line: 3, key: "brush".into(), value: "crayon".into() }
        );
        let err = BrushToolSettings::from_preset("radius 5").unwrap_err();
        assert!(matches!(err, PresetError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn unknown_keys_and_short_colors() {
        let s = BrushToolSettings::from_preset("future_key=7\nprimary_color=10, 20, 30\n").unwrap();
        assert_eq!(s.primary_color, Rgba([10, 20, 30, 255]));
    }
}
