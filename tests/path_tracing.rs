use egui::{Pos2, pos2};
use lyon_path::Path;
use lyon_path::math::point;
use strokefe::history::StrokeRecord;
use strokefe::settings::BrushToolSettings;
use strokefe::stroke::{
    Modifiers, PathTracer, StrokeController, SymmetryMode, TraceOptions, polyline_path, trace_path,
};
use strokefe::{CanvasState, SelectionShape};

fn controller(radius: f32, symmetry: SymmetryMode) -> StrokeController {
    let mut settings = BrushToolSettings::default();
    settings.set_radius(radius);
    settings.set_symmetry(symmetry);
    StrokeController::new(settings)
}

#[test]
fn test_trace_matches_pointer_drag() {
    let points: Vec<Pos2> = vec![pos2(10.0, 10.0), pos2(60.0, 15.0), pos2(40.0, 70.0), pos2(75.0, 75.0)];

    let mut dragged = CanvasState::new(100, 100);
    let mut drag_records: Vec<StrokeRecord> = Vec::new();
    let mut c = controller(3.0, SymmetryMode::TwoMirrors);
    c.press(&mut dragged, points[0], Modifiers::default());
    for p in &points[1..] {
        c.drag(&mut dragged, *p);
    }
    c.release(&mut dragged, &mut drag_records);

    let mut traced = CanvasState::new(100, 100);
    let mut trace_records: Vec<StrokeRecord> = Vec::new();
    let mut c = controller(3.0, SymmetryMode::TwoMirrors);
    let path = polyline_path(&points, false);
    assert!(trace_path(&mut c, &mut traced, &path, TraceOptions::default(), &mut trace_records));

    assert_eq!(drag_records.len(), 1);
    assert_eq!(trace_records.len(), 1);
    assert_eq!(drag_records[0].rect, trace_records[0].rect);
    assert!(dragged.layers[0].pixels.pixels_eq(&traced.layers[0].pixels));
}

#[test]
fn test_closed_trace_draws_closing_edge() {
    let mut canvas = CanvasState::new(100, 100);
    let mut records: Vec<StrokeRecord> = Vec::new();
    let mut c = controller(1.0, SymmetryMode::None);
    let square = [pos2(20.0, 20.0), pos2(80.0, 20.0), pos2(80.0, 80.0), pos2(20.0, 80.0)];

    trace_path(&mut c, &mut canvas, &polyline_path(&square, true), TraceOptions::default(), &mut records);

    let pixels = &canvas.layers[0].pixels;
    assert_eq!(pixels.get_pixel(50, 20)[3], 255);
    assert_eq!(pixels.get_pixel(20, 50)[3], 255);
    assert_eq!(pixels.get_pixel(50, 50)[3], 0);
    assert_eq!(records.len(), 1);
}

#[test]
fn test_subpaths_share_one_record() {
    let mut builder = Path::builder();
    builder.begin(point(10.0, 10.0));
    builder.line_to(point(40.0, 10.0));
    builder.end(false);
    builder.begin(point(10.0, 60.0));
    builder.line_to(point(40.0, 60.0));
    builder.end(false);
    let path = builder.build();

    let mut canvas = CanvasState::new(64, 80);
    let mut records: Vec<StrokeRecord> = Vec::new();
    let mut c = controller(1.0, SymmetryMode::None);
    PathTracer::default().trace(&mut c, &mut canvas, &path, &mut records);

    let pixels = &canvas.layers[0].pixels;
    assert_eq!(pixels.get_pixel(25, 10)[3], 255);
    assert_eq!(pixels.get_pixel(25, 60)[3], 255);
    // no jump between the subpaths
    assert_eq!(pixels.get_pixel(25, 35)[3], 0);
    assert_eq!(records.len(), 1);
    assert!(!c.is_active());
}

#[test]
fn test_curves_are_flattened() {
    let mut builder = Path::builder();
    builder.begin(point(10.0, 50.0));
    builder.quadratic_bezier_to(point(50.0, 0.0), point(90.0, 50.0));
    builder.end(false);
    let path = builder.build();

    let mut canvas = CanvasState::new(100, 60);
    let mut records: Vec<StrokeRecord> = Vec::new();
    let mut c = controller(2.0, SymmetryMode::None);
    trace_path(&mut c, &mut canvas, &path, TraceOptions::default(), &mut records);

    // apex of the curve is at (50, 25)
    assert_eq!(canvas.layers[0].pixels.get_pixel(50, 25)[3], 255);
    assert_eq!(canvas.layers[0].pixels.get_pixel(50, 50)[3], 0);
    assert_eq!(records.len(), 1);
}

#[test]
fn test_trace_can_ignore_selection() {
    let shape = SelectionShape::Rectangle { min_x: 0, min_y: 0, max_x: 49, max_y: 99 };
    let line = polyline_path(&[pos2(10.0, 50.0), pos2(90.0, 50.0)], false);

    let mut clipped = CanvasState::new(100, 100);
    clipped.select(&shape);
    let mut records: Vec<StrokeRecord> = Vec::new();
    trace_path(&mut controller(2.0, SymmetryMode::None), &mut clipped, &line, TraceOptions::default(), &mut records);
    assert_eq!(clipped.layers[0].pixels.get_pixel(80, 50)[3], 0);

    let mut unclipped = CanvasState::new(100, 100);
    unclipped.select(&shape);
    let options = TraceOptions { respect_selection: false };
    trace_path(&mut controller(2.0, SymmetryMode::None), &mut unclipped, &line, options, &mut records);
    assert_eq!(unclipped.layers[0].pixels.get_pixel(80, 50)[3], 255);
    assert!(records[1].rect.max.x >= 90.0);
}

#[test]
fn test_shift_click_after_trace_starts_fresh() {
    let mut canvas = CanvasState::new(100, 100);
    let mut records: Vec<StrokeRecord> = Vec::new();
    let mut c = controller(1.0, SymmetryMode::None);
    let shift = Modifiers { connect_line: true, ..Modifiers::default() };

    c.press(&mut canvas, pos2(10.0, 10.0), Modifiers::default());
    c.drag(&mut canvas, pos2(10.0, 30.0));
    c.release(&mut canvas, &mut records);
    let line = polyline_path(&[pos2(20.0, 60.0), pos2(40.0, 60.0)], false);
    trace_path(&mut c, &mut canvas, &line, TraceOptions::default(), &mut records);

    c.press(&mut canvas, pos2(80.0, 60.0), shift);
    c.release(&mut canvas, &mut records);

    assert_eq!(records.len(), 2);
    assert_eq!(canvas.layers[0].pixels.get_pixel(60, 60)[3], 0);
}
