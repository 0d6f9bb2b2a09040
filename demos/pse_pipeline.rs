//! PSE Pipeline Example
//!
//! This example runs PSE post-processing over a hierarchy of kernel mask
//! images. It loads the masks (smallest scale first), expands them into text
//! instances, groups the instances into text lines, and prints the resulting
//! boxes. Optionally it saves a visualization of the detected lines.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example pse_pipeline -- [OPTIONS] <MASKS>...
//! ```
//!
//! # Arguments
//!
//! * `<MASKS>...` - Paths to kernel mask images, smallest scale first
//! * `-o, --output-dir` - Directory to save visualization results
//! * `--min-area` - Instances at or below this pixel count are removed
//! * `--box-mode` - Shape fitted per instance: 'min-area-rect' or 'bounding-rect'
//! * `--merge-strategy` - Text-line merge: 'mean-y' or 'extent'
//!
//! # Example
//!
//! ```bash
//! cargo run --example pse_pipeline -- -o output/ kernel0.png kernel1.png kernel2.png
//! ```

use clap::Parser;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use pse_postprocess::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Command-line arguments for the PSE pipeline example
#[derive(Parser)]
#[command(name = "pse_pipeline")]
#[command(about = "PSE Pipeline Example - expands kernel masks into text lines")]
struct Args {
    /// Paths to kernel mask images, smallest scale first
    #[arg(required = true)]
    masks: Vec<PathBuf>,

    /// Directory to save visualization results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Instances at or below this pixel count are removed (default: 5)
    #[arg(long, default_value = "5")]
    min_area: usize,

    /// Shape fitted per instance: 'min-area-rect' or 'bounding-rect'
    #[arg(long, default_value = "min-area-rect")]
    box_mode: BoxMode,

    /// Fitted boxes below this area are dropped as noise (default: 10)
    #[arg(long, default_value = "10.0")]
    min_box_area: f32,

    /// Upper bound on the text-line successor search radius (default: 50)
    #[arg(long, default_value = "50")]
    max_horizontal_dist: u32,

    /// Minimum vertical overlap ratio for chaining boxes (default: 0.5)
    #[arg(long, default_value = "0.5")]
    overlap_v_threshold: f32,

    /// Text-line merge strategy: 'mean-y' or 'extent'
    #[arg(long, default_value = "mean-y")]
    merge_strategy: MergeStrategy,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    init_tracing();

    // Parse command-line arguments
    let args = Args::parse();

    info!("PSE Pipeline Example");

    // Load all masks, binarizing to strict {0, 255}
    let mut masks = Vec::new();
    for mask_path in &args.masks {
        match image::open(mask_path) {
            Ok(img) => masks.push(binarize(&img.into_luma8())),
            Err(e) => {
                error!("Failed to load mask {}: {}", mask_path.display(), e);
                return Err(e.into());
            }
        }
    }

    let pyramid = KernelPyramid::new(masks)?;
    info!(
        "Loaded {} kernel scales at {:?}",
        pyramid.len(),
        pyramid.dimensions()
    );

    // Build the post-processor
    let postprocess = PsePostProcess::new(
        Some(args.min_area),
        Some(args.box_mode),
        Some(args.min_box_area),
        Some(args.max_horizontal_dist),
        Some(args.overlap_v_threshold),
        Some(args.merge_strategy),
    );
    postprocess.validate()?;

    // Run the pipeline
    let start = Instant::now();
    let detection = postprocess.apply(&pyramid, None, None)?;
    let duration = start.elapsed();

    info!(
        "Post-processing completed in {:.2}ms",
        duration.as_secs_f64() * 1000.0
    );
    info!("Text instances: {}", detection.instances.len());
    info!("Text lines: {}", detection.text_lines.len());

    if detection.is_empty() {
        warn!("No text regions found");
    }

    // Print each text line as comma-separated corner coordinates
    for (i, line) in detection.text_lines.iter().enumerate() {
        let coords = line
            .points
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(",");
        info!("  Line #{}: {}", i + 1, coords);
    }

    // Save visualization if an output directory is provided
    if let Some(output_dir) = args.output_dir {
        std::fs::create_dir_all(&output_dir)?;
        let canvas = pyramid
            .masks()
            .last()
            .map(|m| visualize_lines(m, &detection.text_lines))
            .unwrap_or_else(|| RgbImage::new(1, 1));
        let output_path = output_dir.join("text_lines.png");
        canvas.save(&output_path)?;
        info!("Saved: {}", output_path.display());
    }

    Ok(())
}

/// Binarizes a grayscale image: any value above 127 becomes foreground.
fn binarize(img: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel.0[0] > 127 { 255u8 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Draws text-line bounding boxes over the largest kernel mask.
fn visualize_lines(mask: &GrayImage, lines: &[Quad]) -> RgbImage {
    let mut output = RgbImage::new(mask.width(), mask.height());
    for (x, y, pixel) in mask.enumerate_pixels() {
        let v = pixel.0[0];
        output.put_pixel(x, y, Rgb([v, v, v]));
    }

    let box_color = Rgb([0u8, 255u8, 0u8]);
    let (img_w, img_h) = (output.width() as i32, output.height() as i32);
    for line in lines {
        let tl = line.top_left();
        let br = line.bottom_right();
        let x = tl.x.clamp(0, img_w - 1);
        let y = tl.y.clamp(0, img_h - 1);
        let width = (br.x.clamp(0, img_w - 1) - x).max(1) as u32;
        let height = (br.y.clamp(0, img_h - 1) - y).max(1) as u32;
        draw_hollow_rect_mut(&mut output, Rect::at(x, y).of_size(width, height), box_color);
    }
    output
}
