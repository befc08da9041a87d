use egui::pos2;
use image::Rgba;
use strokefe::history::StrokeRecord;
use strokefe::settings::BrushToolSettings;
use strokefe::stroke::{BrushVariant, DrawTarget, Modifiers, StrokeController, SymmetryMode};
use strokefe::{BlendMode, CanvasState, EditTarget};

fn paint_zigzag(controller: &mut StrokeController, canvas: &mut CanvasState, records: &mut Vec<StrokeRecord>) {
    controller.press(canvas, pos2(8.0, 8.0), Modifiers::default());
    for p in [pos2(40.0, 30.0), pos2(12.0, 50.0), pos2(55.0, 58.0)] {
        controller.drag(canvas, p);
    }
    controller.release(canvas, records);
}

fn paint_with_target(
    target: DrawTarget,
    variant: BrushVariant,
    radius: f32,
    color: Rgba<u8>,
) -> (CanvasState, StrokeRecord) {
    let mut canvas = CanvasState::with_background(64, 64, Rgba([240, 230, 220, 255]));
    let mut settings = BrushToolSettings::default();
    settings.set_radius(radius);
    settings.set_variant(variant);
    settings.set_symmetry(SymmetryMode::TwoMirrors);
    settings.primary_color = color;
    settings.draw_target.set_preference(target);
    let mut controller = StrokeController::new(settings);
    let mut records: Vec<StrokeRecord> = Vec::new();

    paint_zigzag(&mut controller, &mut canvas, &mut records);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, target);
    (canvas, records.remove(0))
}

#[test]
fn test_direct_and_temp_layer_match_at_normal_full_opacity() {
    let cases = [
        (BrushVariant::Hard, 3.0, Rgba([20, 40, 160, 255])),
        (BrushVariant::Soft, 6.0, Rgba([20, 40, 160, 255])),
        (BrushVariant::Hard, 6.0, Rgba([200, 30, 90, 128])),
        (BrushVariant::Soft, 6.0, Rgba([10, 200, 90, 77])),
    ];
    for (variant, radius, color) in cases {
        let (direct_canvas, direct_record) = paint_with_target(DrawTarget::Direct, variant, radius, color);
        let (temp_canvas, temp_record) = paint_with_target(DrawTarget::TempLayer, variant, radius, color);

        let direct = &direct_canvas.layers[0].pixels;
        let temp = &temp_canvas.layers[0].pixels;
        let differing = (0..64u32)
            .flat_map(|y| (0..64u32).map(move |x| (x, y)))
            .filter(|&(x, y)| direct.get_pixel(x, y) != temp.get_pixel(x, y))
            .count();
        assert_eq!(differing, 0, "{:?} r={} {:?}", variant, radius, color);
        assert_eq!(direct_record.rect, temp_record.rect);
        assert_eq!(direct_record.before.pixels, temp_record.before.pixels);
        assert_eq!(direct_record.after.pixels, temp_record.after.pixels);
    }
}

#[test]
fn test_temp_layer_applies_stroke_opacity_once() {
    let mut canvas = CanvasState::with_background(40, 40, Rgba([255, 255, 255, 255]));
    let mut settings = BrushToolSettings::default();
    settings.set_radius(4.0);
    settings.draw_target.set_preference(DrawTarget::TempLayer);
    settings.draw_target.set_opacity(0.5);
    let mut controller = StrokeController::new(settings);
    let mut records: Vec<StrokeRecord> = Vec::new();

    // self-overlapping scribble: overlaps must not darken past 50%
    controller.press(&mut canvas, pos2(10.0, 20.0), Modifiers::default());
    for p in [pos2(30.0, 20.0), pos2(10.0, 21.0), pos2(30.0, 22.0)] {
        controller.drag(&mut canvas, p);
    }
    controller.release(&mut canvas, &mut records);

    let px = canvas.layers[0].pixels.get_pixel(20, 21);
    assert!((126..=129).contains(&px[0]), "{:?}", px);
    assert_eq!(records[0].target, DrawTarget::TempLayer);
}

#[test]
fn test_mask_editing_forces_direct_normal() {
    let mut canvas = CanvasState::with_background(50, 50, Rgba([255, 0, 0, 255]));
    canvas.layers[0].add_mask();
    let layer_before = canvas.layers[0].pixels.clone();

    let mut settings = BrushToolSettings::default();
    settings.set_radius(2.0);
    settings.draw_target.set_preference(DrawTarget::TempLayer);
    settings.draw_target.set_blend_mode(BlendMode::Multiply);
    settings.draw_target.set_opacity(0.3);
    let mut controller = StrokeController::new(settings);

    assert_eq!(controller.set_edit_target(&mut canvas, EditTarget::Mask), EditTarget::Mask);
    assert!(!controller.settings().draw_target.blend_controls_enabled());

    let mut records: Vec<StrokeRecord> = Vec::new();
    controller.draw_stroke_programmatically(&mut canvas, pos2(5.0, 25.0), pos2(45.0, 25.0), &mut records);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, DrawTarget::Direct);
    assert!(records[0].drawable.mask);
    let mask = canvas.layers[0].mask.as_ref().unwrap();
    assert_eq!(*mask.get_pixel(25, 25), Rgba([0, 0, 0, 255]));
    assert_eq!(*mask.get_pixel(25, 5), Rgba([255, 255, 255, 255]));
    assert!(canvas.layers[0].pixels.pixels_eq(&layer_before));

    controller.set_edit_target(&mut canvas, EditTarget::Layer);
    assert!(controller.settings().draw_target.blend_controls_enabled());
}

#[test]
fn test_mask_target_resynced_at_stroke_start() {
    let mut canvas = CanvasState::new(30, 30);
    canvas.layers[0].add_mask();
    // edit target switched behind the controller's back
    canvas.set_edit_target(EditTarget::Mask);

    let mut settings = BrushToolSettings::default();
    settings.draw_target.set_preference(DrawTarget::TempLayer);
    let mut controller = StrokeController::new(settings);
    let mut records: Vec<StrokeRecord> = Vec::new();
    controller.draw_stroke_programmatically(&mut canvas, pos2(5.0, 5.0), pos2(25.0, 5.0), &mut records);

    assert_eq!(records[0].target, DrawTarget::Direct);
    assert!(controller.settings().draw_target.editing_mask());
}

#[test]
fn test_mask_request_without_mask_stays_on_layer() {
    let mut canvas = CanvasState::new(30, 30);
    let mut controller = StrokeController::default();
    assert_eq!(controller.set_edit_target(&mut canvas, EditTarget::Mask), EditTarget::Layer);
    assert!(!controller.settings().draw_target.editing_mask());
}
