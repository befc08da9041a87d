// ============================================================================
// StrokeFE CLI — headless stroke replay via command-line arguments
// ============================================================================
//
// Usage examples:
//   StrokeFE -i photo.png -o out.png --stroke "10,10 80,40 120,90"
//   StrokeFE -i photo.png -o out.png --preset ink.txt --symmetry vertical --stroke "10,10 10,50"
//   StrokeFE -i "shots/*.png" --output-dir out/ --trace "20,20 80,20 80,80" --closed
//   StrokeFE -i photo.png -o out.png --replay session.sfr
//   StrokeFE -i photo.png -o out.png --mask --stroke "0,0 50,50"
//
// Every input gets its own canvas, controller and history; the same strokes
// are applied to each.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use egui::{Pos2, pos2};

use crate::canvas::{CanvasState, EditTarget, SelectionShape};
use crate::error::CliError;
use crate::history::History;
use crate::recording::StrokeRecording;
use crate::settings::BrushToolSettings;
use crate::stroke::controller::{PointerEvent, StrokeController};
use crate::stroke::symmetry::SymmetryMode;
use crate::stroke::trace::TraceOptions;
use crate::{log_err, log_info, logger};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// StrokeFE headless stroke renderer.
///
/// Paint brush strokes onto images without a GUI.
#[derive(Parser, Debug)]
#[command(
    name = "StrokeFE",
    about = "StrokeFE headless brush-stroke renderer",
    long_about = "Apply brush strokes, traced paths and recorded pointer sessions to\n\
                  image files. Supports PNG, JPEG, WEBP, BMP, TGA and TIFF.\n\n\
                  Example:\n  \
                  StrokeFE -i photo.png -o out.png --stroke \"10,10 80,40 120,90\"\n  \
                  StrokeFE -i \"*.png\" --output-dir out/ --replay session.sfr"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing (keeps the input file name).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Brush preset file (key=value lines).
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Brush radius, overrides the preset (1–100).
    #[arg(long)]
    pub radius: Option<f32>,

    /// Symmetry mode, overrides the preset:
    /// none, vertical, horizontal, two_mirrors, central, central_3.
    #[arg(long, value_name = "MODE")]
    pub symmetry: Option<String>,

    /// A pointer stroke as "x,y x,y ...". Repeatable.
    #[arg(long, value_name = "POINTS")]
    pub stroke: Vec<String>,

    /// A path to trace as "x,y x,y ...". Repeatable.
    #[arg(long, value_name = "POINTS")]
    pub trace: Vec<String>,

    /// Close every --trace path back to its first point.
    #[arg(long)]
    pub closed: bool,

    /// Rectangular selection "x0,y0,x1,y1" that clips all strokes.
    #[arg(long, value_name = "RECT")]
    pub select: Option<String>,

    /// Paint into the active layer's mask (created if missing).
    #[arg(long)]
    pub mask: bool,

    /// Stroke recording to replay after --stroke / --trace.
    #[arg(long, value_name = "FILE.sfr")]
    pub replay: Option<PathBuf>,

    /// Save everything that was applied as a stroke recording.
    #[arg(long, value_name = "FILE.sfr")]
    pub record: Option<PathBuf>,

    /// Echo the session log and per-file timing to the terminal.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    logger::set_echo_stderr(args.verbose);

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let (settings, recording, selection) = match prepare(&args) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("CLI setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    if let Some(path) = &args.record
        && let Err(e) = recording.save(path)
    {
        eprintln!("error: could not write recording '{}': {}", path.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        let job = Job {
            settings: &settings,
            recording: &recording,
            selection: selection.as_ref(),
            mask: args.mask,
        };
        match run_one(input_path, &output_path, &job) {
            Ok(strokes) => {
                log_info!("{} -> {}: {} stroke(s)", input_path.display(), output_path.display(), strokes);
                if args.verbose || multi {
                    println!(
                        "  → {} ({} strokes, {:.0}ms)",
                        output_path.display(),
                        strokes,
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("{}: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Setup shared by all inputs
// ============================================================================

fn prepare(args: &CliArgs) -> Result<(BrushToolSettings, StrokeRecording, Option<SelectionShape>), CliError> {
    let mut settings = match &args.preset {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let mut s = BrushToolSettings::default();
            s.apply_preset(&text)?;
            s
        }
        None => BrushToolSettings::default(),
    };
    if let Some(radius) = args.radius {
        settings.set_radius(radius);
    }
    if let Some(key) = &args.symmetry {
        let mode = SymmetryMode::from_key(key)
            .ok_or_else(|| CliError::Usage(format!("unknown symmetry mode '{}'", key)))?;
        settings.set_symmetry(mode);
    }

    let mut recording = StrokeRecording::new();
    for spec in &args.stroke {
        let points = parse_points(spec)?;
        push_pointer_stroke(&mut recording, &points);
    }
    for spec in &args.trace {
        let points = parse_points(spec)?;
        recording.push_trace(&points, args.closed, TraceOptions::default());
    }
    if let Some(path) = &args.replay {
        for input in StrokeRecording::load(path)?.inputs() {
            recording.push(input.clone());
        }
    }
    if recording.is_empty() {
        return Err(CliError::Usage("nothing to draw: give --stroke, --trace or --replay".into()));
    }

    let selection = args.select.as_deref().map(parse_selection).transpose()?;
    Ok((settings, recording, selection))
}

/// Press on the first point, drag through the rest, release on the last.
fn push_pointer_stroke(recording: &mut StrokeRecording, points: &[Pos2]) {
    let Some((first, rest)) = points.split_first() else { return };
    recording.push_pointer(PointerEvent::press(*first));
    for p in rest {
        recording.push_pointer(PointerEvent::drag(*p));
    }
    recording.push_pointer(PointerEvent::release(*points.last().unwrap_or(first)));
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

struct Job<'a> {
    settings: &'a BrushToolSettings,
    recording: &'a StrokeRecording,
    selection: Option<&'a SelectionShape>,
    mask: bool,
}

/// Returns the number of committed strokes.
fn run_one(input: &Path, output: &Path, job: &Job<'_>) -> Result<usize, CliError> {
    // -- Step 1: Load ----------------------------------------------------
    let img = image::open(input)?.into_rgba8();
    let mut canvas = CanvasState::from_rgba_image(&img);
    if let Some(shape) = job.selection {
        canvas.select(shape);
    }

    // -- Step 2: Strokes -------------------------------------------------
    let mut controller = StrokeController::new(job.settings.clone());
    if job.mask {
        if let Some(layer) = canvas.active_layer_mut() {
            layer.add_mask();
        }
        controller.set_edit_target(&mut canvas, EditTarget::Mask);
    }
    let mut history = History::new(usize::MAX);
    job.recording.replay(&mut controller, &mut canvas, &mut history);

    // -- Step 3: Save ----------------------------------------------------
    save_image(canvas.composite(), output)?;
    Ok(history.len())
}

/// JPEG has no alpha channel, so drop it for `.jpg` / `.jpeg` outputs.
fn save_image(img: image::RgbaImage, output: &Path) -> Result<(), CliError> {
    let ext = output.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    if ext == "jpg" || ext == "jpeg" {
        image::DynamicImage::ImageRgba8(img).to_rgb8().save(output)?;
    } else {
        img.save(output)?;
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse `"x,y x,y ..."`.
fn parse_points(spec: &str) -> Result<Vec<Pos2>, CliError> {
    let bad = || CliError::BadPoints(spec.to_string());
    let points = spec
        .split_whitespace()
        .map(|pair| -> Result<Pos2, CliError> {
            let (x, y) = pair.split_once(',').ok_or_else(bad)?;
            let x: f32 = x.trim().parse().map_err(|_| bad())?;
            let y: f32 = y.trim().parse().map_err(|_| bad())?;
            Ok(pos2(x, y))
        })
        .collect::<Result<Vec<Pos2>, CliError>>()?;
    if points.is_empty() {
        return Err(bad());
    }
    Ok(points)
}

/// Parse `"x0,y0,x1,y1"` (inclusive pixel corners).
fn parse_selection(spec: &str) -> Result<SelectionShape, CliError> {
    let values = spec
        .split(',')
        .map(|v| v.trim().parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>();
    match values.as_deref() {
        Some([x0, y0, x1, y1]) => Ok(SelectionShape::Rectangle {
            min_x: *x0.min(x1),
            min_y: *y0.min(y1),
            max_x: *x0.max(x1),
            max_y: *y0.max(y1),
        }),
        _ => Err(CliError::Usage(format!("invalid --select rectangle '{}' (expected x0,y0,x1,y1)", spec))),
    }
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Output path for one input: `--output`, else `--output-dir/<name>`, else
/// `<stem>_stroked.<ext>` next to the input.
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let file_name = input.file_name()?;
    if let Some(dir) = output_dir {
        return Some(dir.join(file_name));
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("png");
    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_stroked.{}", stem, ext)))
}
