//! quadwarp - build a perspective-warped vertex buffer for a quad
//!
//! Reads the destination corners and mesh settings from a TOML config (CLI
//! flags override it), warps the texture mesh onto the quad, and writes the
//! 16-bit vertex buffer as JSON or raw little-endian bytes.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use quadwarp::config::Config;
use quadwarp::{AttributeLayout, EstimateStatus, PointQuad, WarpAssembler, WarpStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON report
    Json,
    /// Raw little-endian i16 vertex data
    Binary,
}

/// quadwarp - perspective texture warp mesh generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "quadwarp.toml")]
    config: PathBuf,

    /// Grid points per axis
    #[arg(short, long)]
    resolution: Option<usize>,

    /// Texture coordinate extent used for quantization
    #[arg(long)]
    extent: Option<f64>,

    /// Warp strategy (homography or diagonal-ratio)
    #[arg(short, long)]
    strategy: Option<WarpStrategy>,

    /// Destination corners as x,y pairs ordered top-right, bottom-right,
    /// top-left, bottom-left (e.g. "9570,3643,8105,6155,4547,3643,6012,6155")
    #[arg(long, allow_hyphen_values = true)]
    corners: Option<String>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    strategy: WarpStrategy,
    status: EstimateStatus,
    triangles: usize,
    layout: AttributeLayout,
    corners: &'a PointQuad,
    vertices: Vec<i16>,
}

fn parse_corners(text: &str) -> Result<PointQuad> {
    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("Invalid corner coordinate {:?}", s))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(PointQuad::from_flat(&values)?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("quadwarp v{}", env!("CARGO_PKG_VERSION"));

    // Load or create configuration
    let mut config = Config::load_or_create(&args.config)?;

    // CLI args override config file values
    if let Some(resolution) = args.resolution {
        config.warp.mesh_resolution = resolution;
    }
    if let Some(extent) = args.extent {
        config.warp.texture_extent = extent;
    }
    if let Some(strategy) = args.strategy {
        config.warp.strategy = strategy;
    }
    if let Some(corners) = &args.corners {
        config.quad.corners = parse_corners(corners)?;
    }

    let options = config.warp.options();
    info!(
        "Warping {}x{} mesh with {} strategy, extent {}",
        options.resolution,
        options.resolution,
        options.strategy.as_str(),
        options.texture_extent
    );

    let mesh = WarpAssembler::new(options)
        .assemble(&config.quad.corners)
        .context("Failed to assemble warp mesh")?;

    let vertices = mesh.vertices();
    info!(
        "Generated {} triangles ({} vertices)",
        vertices.triangle_count(),
        vertices.len()
    );

    let bytes = match args.format {
        OutputFormat::Json => {
            let report = Report {
                strategy: mesh.strategy(),
                status: mesh.status(),
                triangles: vertices.triangle_count(),
                layout: AttributeLayout::DEFAULT,
                corners: &config.quad.corners,
                vertices: vertices.to_i16_vec(),
            };
            let mut json = serde_json::to_vec_pretty(&report).context("Failed to serialize report")?;
            json.push(b'\n');
            json
        }
        OutputFormat::Binary => vertices.to_le_bytes(),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write output to {:?}", path))?;
            info!("Wrote {} bytes to {:?}", bytes.len(), path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write to stdout")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corners() {
        let quad = parse_corners("1,2, 3,4 5 6,7,8").unwrap();
        assert_eq!(quad.flatten(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert!(parse_corners("1,2,3").is_err());
        assert!(parse_corners("1,2,3,4,5,6,7,x").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "quadwarp",
            "--strategy",
            "diagonal-ratio",
            "--format",
            "binary",
            "-r",
            "8",
        ])
        .unwrap();
        assert_eq!(args.strategy, Some(WarpStrategy::DiagonalRatio));
        assert_eq!(args.format, OutputFormat::Binary);
        assert_eq!(args.resolution, Some(8));
    }
}
