//! # imagemark Binary Entry Point
//!
//! Command-line front end for the visible and hidden watermark pipelines.
//!
//! ## Usage
//!
//! ```bash
//! # Visible watermark on a batch of photos, processed in parallel
//! cargo run --bin imagemark -- --config config/imagemark.toml \
//!   render --variant watermark --out-dir ./out photos/*.jpg
//!
//! # Hide and recover a payload
//! cargo run --bin imagemark -- hide --payload "owner:alice" photo.png marked.png
//! cargo run --bin imagemark -- reveal marked.png
//!
//! # Inspect the auto-scaling heuristic
//! cargo run --bin imagemark -- fit --base 800x600 --overlay 1600x400
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{debug, error, info, warn, LevelFilter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use imagemark::common::config::MarkConfig;
use imagemark::processing::{fitter, payload, steganography};
use imagemark::variants::{encode_output, RenderContext, Variant};

/// Command-line arguments for the imagemark binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML format)
    ///
    /// Example: config/imagemark.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a named variant for every input image
    Render {
        /// One of: text-overlay, watermark, hidden-watermark
        #[arg(long)]
        variant: Variant,

        /// Directory the rendered images are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Source images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Hide a payload in an image (always written as PNG)
    Hide {
        /// Text to hide (defaults to the configured payload)
        #[arg(long)]
        payload: Option<String>,

        input: PathBuf,

        output: PathBuf,
    },

    /// Print the payload hidden in an image as JSON (`""` if there is none)
    Reveal { input: PathBuf },

    /// Show how an overlay would be scaled onto a base image
    Fit {
        /// Base size as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size)]
        base: (u32, u32),

        /// Overlay size as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size)]
        overlay: (u32, u32),
    },
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (width, height) = s
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let width = width.trim().parse::<u32>().map_err(|e| format!("width: {}", e))?;
    let height = height.trim().parse::<u32>().map_err(|e| format!("height: {}", e))?;
    Ok((width, height))
}

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// Format: `[HH:MM:SS] [LEVEL] message`
fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = match &args.config {
        Some(path) => MarkConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MarkConfig::default(),
    };

    match args.command {
        Command::Render {
            variant,
            out_dir,
            inputs,
        } => render_all(variant, config, out_dir, inputs).await,
        Command::Hide {
            payload: text,
            input,
            output,
        } => {
            let text = text.unwrap_or_else(|| config.stego.payload.clone());
            let framed_len = payload::serialize(text.as_str())?.len();
            let image_bytes = fs::read(&input)?;
            let marked = steganography::hide_in_bytes(&image_bytes, text.as_str(), &config.stego)?;

            if output.extension().and_then(|e| e.to_str()) != Some("png") {
                warn!("⚠️ {} is written as PNG data regardless of its extension", output.display());
            }
            fs::write(&output, marked)?;
            info!(
                "🔒 Hid {} characters as a {}-byte frame in {}",
                text.chars().count(),
                framed_len,
                output.display()
            );
            Ok(())
        }
        Command::Reveal { input } => {
            let image = image::open(&input)?;
            match steganography::reveal::<serde_json::Value>(&image, &config.stego) {
                Ok(value) => println!("{}", value),
                Err(e) => {
                    debug!("No payload in {}: {}", input.display(), e);
                    println!("\"\"");
                }
            }
            Ok(())
        }
        Command::Fit { base, overlay } => {
            let spec = fitter::fit(base, overlay, &config.fit)?;
            let origin = spec.origin(base);
            println!(
                "{}",
                serde_json::json!({
                    "watermark_scale": spec.watermark_scale,
                    "new_size": [spec.new_size.0, spec.new_size.1],
                    "origin": [origin.0, origin.1],
                })
            );
            Ok(())
        }
    }
}

/// Render every input on the blocking pool. One failing image does not stop
/// the others.
async fn render_all(
    variant: Variant,
    config: MarkConfig,
    out_dir: PathBuf,
    inputs: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let context = Arc::new(RenderContext::load(config)?);
    fs::create_dir_all(&out_dir)?;

    info!("🚀 Rendering '{}' for {} image(s)", variant, inputs.len());

    let total = inputs.len();
    let mut handles = Vec::with_capacity(total);
    for input in inputs {
        let context = Arc::clone(&context);
        let out_dir = out_dir.clone();
        let task_input = input.clone();
        let handle = tokio::task::spawn_blocking(move || {
            render_file(variant, &task_input, &out_dir, &context)
        });
        handles.push((input, handle));
    }

    let mut failures = 0;
    for (input, handle) in handles {
        match handle.await {
            Ok(Ok(output)) => info!("✅ {} -> {}", input.display(), output.display()),
            Ok(Err(e)) => {
                error!("❌ {}: {}", input.display(), e);
                failures += 1;
            }
            Err(e) => {
                error!("❌ {}: render task panicked: {}", input.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} image(s) failed", failures, total);
    }
    Ok(())
}

fn render_file(
    variant: Variant,
    input: &Path,
    out_dir: &Path,
    context: &RenderContext,
) -> imagemark::Result<PathBuf> {
    let image = image::open(input)?;
    let rendered = variant.render(&image, context)?;

    let format = variant.output_format(&context.config);
    let bytes = encode_output(&rendered, format)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let output = out_dir.join(format!("{}-{}.{}", stem, variant, format.extension()));
    fs::write(&output, bytes)?;
    Ok(output)
}
