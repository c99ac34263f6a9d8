// ============================================================================
// StudioFE CLI - headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   studiofe --input product.png --ratio 16:9 --output banner.png
//   studiofe -i product.jpg --script caption.rhai -o out.jpg --quality 85
//   studiofe -i "shots/*.jpg" --script caption.rhai --output-dir out/ --format webp
//   studiofe -i mug.png --font "Brand Sans=brand.ttf" --script caption.rhai -o out.png
//
// Each input gets its own editor session: load, run the script, apply the
// ratio, export the displayed snapshot. AI edits need an image service and
// are not available here.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::SaveFormat;
use crate::ops::canvas_ops::AspectRatio;
use crate::ops::scripting::{compile_script, execute_script_sync};
use crate::ops::text::FontBook;
use crate::session::EditorSession;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// StudioFE headless product-photo editor.
#[derive(Parser, Debug)]
#[command(
    name = "studiofe",
    about = "StudioFE headless batch editor",
    long_about = "Open images, run Rhai edit scripts, expand to an aspect ratio and\n\
                  export, without the interactive editor. Supports PNG, JPEG, WEBP\n\
                  and BMP.\n\n\
                  Example:\n  \
                  studiofe --input product.png --ratio 16:9 --output banner.png\n  \
                  studiofe -i *.jpg --script caption.rhai --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Rhai edit script run against each input's session.
    #[arg(short, long, value_name = "SCRIPT.rhai")]
    pub script: Option<PathBuf>,

    /// Target aspect ratio applied after the script, e.g. "16:9", "4/5" or "1.5".
    #[arg(short, long, value_name = "W:H")]
    pub ratio: Option<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100). Defaults to the saved export quality.
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Font file made available to scripts under a family name, as FAMILY=FILE.
    /// May be given more than once.
    #[arg(long, value_name = "FAMILY=FILE")]
    pub font: Vec<String>,

    /// Print script console output and per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
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

    let save_format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ratio = match args.ratio.as_deref() {
        Some(r) => match AspectRatio::parse(r) {
            Some(ratio) => Some(ratio),
            None => {
                let presets: Vec<&str> = AspectRatio::presets().iter().map(|(label, _, _)| *label).collect();
                eprintln!(
                    "error: invalid ratio '{}'. Use W:H, W/H or a positive number (e.g. {}).",
                    r,
                    presets.join(", ")
                );
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let script_source: Option<String> = match &args.script {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(src) => {
                // Report syntax errors once, before touching any file.
                if let Err(e) = compile_script(&src) {
                    eprintln!("error: script '{}':\n{}", path.display(), e.friendly_message());
                    return ExitCode::FAILURE;
                }
                Some(src)
            }
            Err(e) => {
                eprintln!("error: could not read script '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let mut settings = EditorSettings::load();
    if let Some(q) = args.quality {
        settings.export_quality = q.clamp(1, 100);
    }
    let mut fonts = FontBook::system(settings.fallback_fonts.clone());
    for arg in &args.font {
        let loaded = parse_font_arg(arg).and_then(|(family, path)| {
            fonts
                .load_file(&family, &path)
                .map_err(|e| format!("font '{}': {}", family, e))
        });
        if let Err(e) = loaded {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        let job = Job {
            input: input_path,
            output: &output_path,
            script: script_source.as_deref(),
            ratio,
            format: save_format,
            verbose: args.verbose,
        };

        match run_one(&job, &settings, &mut fonts) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                crate::log_err!("CLI: {}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

struct Job<'a> {
    input: &'a Path,
    output: &'a Path,
    script: Option<&'a str>,
    ratio: Option<AspectRatio>,
    format: SaveFormat,
    verbose: bool,
}

fn run_one(job: &Job<'_>, settings: &EditorSettings, fonts: &mut FontBook) -> Result<(), String> {
    let mut session = EditorSession::new(settings.clone());

    // -- Step 1: Load ----------------------------------------------------
    session
        .open_file(job.input)
        .map_err(|e| format!("load failed: {}", e))?;

    // -- Step 2: Script (optional) ---------------------------------------
    if let Some(src) = job.script {
        let console_output = execute_script_sync(src, &mut session, fonts)
            .map_err(|e| format!("script error: {}", e.friendly_message()))?;
        if job.verbose {
            for line in &console_output {
                println!("  [script] {}", line);
            }
        }
    }

    // -- Step 3: Ratio (optional) ----------------------------------------
    if let Some(ratio) = job.ratio {
        session
            .apply_ratio(ratio)
            .map_err(|e| format!("ratio failed: {}", e))?;
    }

    // -- Step 4: Export --------------------------------------------------
    session
        .export_file(job.output, Some(job.format))
        .map_err(|e| format!("save failed: {}", e))?;

    if job.verbose {
        let view = session.view();
        println!(
            "  {} steps, final size {}x{}",
            view.history_len, view.width, view.height
        );
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

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

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is given.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, String> {
    if let Some(f) = format_arg {
        return SaveFormat::parse(f).ok_or_else(|| {
            let known: Vec<&str> = SaveFormat::all().iter().map(|s| s.extension()).collect();
            format!("unsupported format '{}' (expected one of: {})", f, known.join(", "))
        });
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Split a `--font` value into its family name and file path.
fn parse_font_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((family, path)) if !family.trim().is_empty() && !path.trim().is_empty() => {
            Ok((family.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("invalid --font '{}'. Use FAMILY=FILE.", arg)),
    }
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}
