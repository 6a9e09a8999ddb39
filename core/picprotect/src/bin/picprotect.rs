//! Command-line front end: detect faces, pixelate the chosen ones, export.
//!
//! Usage:
//!   picprotect photo.jpg --model seeta_fd_frontal_v1.0.bin            # list faces
//!   picprotect photo.jpg --model ... --all -o out.png                  # hide every face
//!   picprotect photo.jpg --model ... --select 2 --select 3 -o out.jpg  # hide faces 2 and 3
//!   picprotect photo.jpg --model ... --json --container 390x844       # JSON with overlay rects

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::Parser;
use picprotect::{
    DetectionOutcome, Editor, FaceRegions, NormalizedRect, OutputFormat, PicProtectError, Rect,
    RegionId, Settings, Size,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "picprotect")]
#[command(author, version, about = "Detect faces in a photo and pixelate the ones you pick", long_about = None)]
struct Args {
    /// Input image file (JPEG, PNG, or WebP)
    #[arg(required = true)]
    image: PathBuf,

    /// Where to write the resulting image
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pixelate face N (1-based, as listed). Repeatable
    #[arg(short, long = "select", value_name = "N")]
    select: Vec<usize>,

    /// Pixelate every detected face
    #[arg(short, long, conflicts_with = "select")]
    all: bool,

    /// Print the face list as JSON
    #[arg(long)]
    json: bool,

    /// Settings file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SeetaFace model path, overrides the settings file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Pixelation block size in pixels
    #[arg(long)]
    block_size: Option<u32>,

    /// Output format: png, jpeg or webp (default: from the output extension)
    #[arg(long)]
    format: Option<String>,

    /// JPEG quality from 0.0 to 1.0
    #[arg(long)]
    quality: Option<f32>,

    /// Container size WxH for overlay layout, e.g. 390x844
    #[arg(long, value_parser = parse_size)]
    container: Option<Size>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Output {
    image: String,
    width: u32,
    height: u32,
    faces_detected: usize,
    faces: Vec<FaceOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_rect: Option<Rect>,
}

#[derive(Serialize)]
struct FaceOutput {
    /// Face index (1-based)
    index: usize,
    confidence: f64,
    selected: bool,
    /// Bottom-left-origin fractions of the image
    normalized: NormalizedRect,
    /// Top-left-origin image pixels
    pixels: Rect,
    /// Tap target within the container, when laid out
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay: Option<Rect>,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), PicProtectError> {
    let settings = load_settings(args)?;
    let format = output_format(args, &settings)?;

    let mut editor = Editor::from_settings(&settings)?;

    log::debug!("reading {}", args.image.display());
    let input = std::fs::read(&args.image)?;
    let pending = editor.import_bytes(&input)?;

    match editor.complete_detection(pending) {
        DetectionOutcome::Applied(count) => log::debug!("{count} face(s) ready"),
        DetectionOutcome::Failed(err) => log::warn!("continuing without faces: {err}"),
        DetectionOutcome::Superseded => log::debug!("detection superseded"),
    }

    if let Some(container) = args.container {
        editor.layout(container);
    }

    if args.all {
        editor.set_all(true);
    } else if !args.select.is_empty() {
        let ids = selected_ids(&args.select, editor.regions());
        editor.select_only(&ids);
    }

    let report = build_report(args, &editor);
    let text = if args.json {
        serde_json::to_string_pretty(&report).map_err(|e| PicProtectError::Config(e.to_string()))?
    } else {
        format_human_readable(&report)
    };
    println!("{}", text);

    if let Some(ref path) = args.output {
        let data = editor.export(format, settings.output.quality)?;
        std::fs::write(path, data)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

/// Map 1-based face numbers to ids, dropping repeats and numbers out of range.
fn selected_ids(numbers: &[usize], regions: &FaceRegions) -> Vec<RegionId> {
    let ids: Vec<_> = regions.iter().map(|r| r.id()).collect();
    let mut picked = BTreeSet::new();
    for &n in numbers {
        match n.checked_sub(1).and_then(|i| ids.get(i)) {
            Some(&id) => {
                picked.insert(id);
            }
            None => log::warn!("no face {n}, {} detected", ids.len()),
        }
    }
    picked.into_iter().collect()
}

fn load_settings(args: &Args) -> Result<Settings, PicProtectError> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(model) = &args.model {
        settings.detector.model_path = Some(model.clone());
    }
    if let Some(block_size) = args.block_size {
        settings.block_size = block_size;
    }
    if let Some(quality) = args.quality {
        settings.output.quality = quality;
    }
    settings.validate()?;
    Ok(settings)
}

/// `--format` wins, then the output file extension, then the settings file.
fn output_format(args: &Args, settings: &Settings) -> Result<OutputFormat, PicProtectError> {
    if let Some(format) = &args.format {
        return format.parse();
    }
    let from_extension = args
        .output
        .as_deref()
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok());
    Ok(from_extension.unwrap_or(settings.output.format))
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s}"))?;
    let width: f64 = w.trim().parse().map_err(|e| format!("bad width {w}: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("bad height {h}: {e}"))?;
    Ok(Size::new(width, height))
}

fn build_report(args: &Args, editor: &Editor) -> Output {
    let (width, height) = editor
        .original()
        .map(|img| (img.width(), img.height()))
        .unwrap_or((0, 0));
    let frame = Rect::of_image(width, height);
    let overlays = editor.overlays();

    let faces = editor
        .regions()
        .iter()
        .enumerate()
        .map(|(i, region)| FaceOutput {
            index: i + 1,
            confidence: region.confidence(),
            selected: region.is_selected(),
            normalized: *region.bounds(),
            pixels: region.bounds().project(&frame),
            overlay: overlays
                .iter()
                .find(|o| o.id == region.id())
                .map(|o| o.rect),
        })
        .collect::<Vec<_>>();

    Output {
        image: args.image.display().to_string(),
        width,
        height,
        faces_detected: faces.len(),
        faces,
        display_rect: args.container.map(|_| editor.display_rect()),
    }
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));
    s.push_str(&format!("Faces detected: {}\n", output.faces_detected));

    if output.faces.is_empty() {
        s.push_str("\nNo faces found.\n");
        return s;
    }

    for face in &output.faces {
        let mark = if face.selected { " [pixelated]" } else { "" };
        s.push_str(&format!("\n--- Face {}{} ---\n", face.index, mark));
        s.push_str(&format!("Confidence: {:.2}\n", face.confidence));
        s.push_str(&format!(
            "Pixels: {:.0}x{:.0} at ({:.0}, {:.0})\n",
            face.pixels.width, face.pixels.height, face.pixels.x, face.pixels.y
        ));
        if let Some(overlay) = &face.overlay {
            s.push_str(&format!(
                "Overlay: {:.1}x{:.1} at ({:.1}, {:.1})\n",
                overlay.width, overlay.height, overlay.x, overlay.y
            ));
        }
    }

    s
}
