//! Draw a sparse matrix or laid-out graph as an edge-length colored PNG.
//!
//! Usage: visla matrix.mtx --output matrix.png

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use visla::colormap::Colormap;
use visla::config::VisConfig;
use visla::layout::GraphvizEngine;
use visla::render::SaveOptions;
use visla::telemetry::init_logging;
use visla::{Result, VisGraph};

#[derive(Parser, Debug)]
#[command(name = "visla")]
#[command(about = "Easy and attractive visualizations of sparse matrices and graphs", long_about = None)]
struct Args {
    /// Matrix (csv, mtx, npz) or laid-out graph (gv, dot) file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Override the format inferred from the file extension
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Write the image here instead of the configured display file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output resolution in dots per inch
    #[arg(long, default_value_t = 100.0, requires = "output")]
    dpi: f32,

    /// Leave the image background transparent
    #[arg(long, requires = "output")]
    transparent: bool,

    /// Graphviz layout program (sfdp, neato, fdp, dot, twopi, circo)
    #[arg(long, value_name = "NAME")]
    algorithm: Option<String>,

    /// Extra argument for the layout program, e.g. -Goverlap=false
    #[arg(long = "layout-arg", value_name = "ARG", allow_hyphen_values = true)]
    layout_args: Vec<String>,

    /// Draw rows and columns as separate node sets (auto, always, never)
    #[arg(long, value_name = "MODE")]
    bipartite: Option<String>,

    /// Keep duplicate edges
    #[arg(long)]
    no_strict: bool,

    /// Edge line width in points
    #[arg(long, value_name = "PT")]
    line_width: Option<f32>,

    /// Background color, a name or #rrggbb
    #[arg(long, value_name = "COLOR")]
    background: Option<String>,

    /// Edge colormap (turbo, viridis, plasma, inferno, grayscale)
    #[arg(long, value_name = "NAME")]
    colormap: Option<String>,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Log the duration of each pipeline phase
    #[arg(long)]
    timing: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn build_config(args: &Args) -> Result<VisConfig> {
    let mut config = match &args.config {
        Some(path) => VisConfig::from_json_file(path)?,
        None => VisConfig::default(),
    };
    if let Some(algorithm) = &args.algorithm {
        config.algorithm = algorithm.parse()?;
    }
    if !args.layout_args.is_empty() {
        config.layout_args = args.layout_args.clone();
    }
    if let Some(mode) = &args.bipartite {
        config.bipartite = mode.parse()?;
    }
    if args.no_strict {
        config.strict = false;
    }
    if let Some(width) = args.line_width {
        config.line_width = width;
    }
    if let Some(color) = &args.background {
        config.background = color.parse()?;
    }
    if let Some(name) = &args.colormap {
        config.colormap = Colormap {
            gradient: name.parse()?,
            ..config.colormap
        };
    }
    config.timing |= args.timing;
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let mut graph = VisGraph::from_file(&args.file, args.format.as_deref(), config)?;

    if !graph.is_laid_out() {
        info!(
            nodes = graph.topology().node_count(),
            edges = graph.topology().edge_count(),
            algorithm = %graph.config().algorithm,
            "laying out graph"
        );
        graph.layout(&GraphvizEngine)?;
    }

    match &args.output {
        Some(path) => {
            let options = SaveOptions {
                dpi: args.dpi,
                transparent: args.transparent,
            };
            graph.save(path, &options)?;
        }
        None => {
            graph.visualize(None)?;
        }
    }

    if graph.config().timing {
        info!(
            total_ms = graph.trace().total().as_secs_f64() * 1000.0,
            "pipeline complete"
        );
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.json_logs);

    if let Err(e) = run(&args) {
        error!(error = %e, file = %args.file.display(), "visualization failed");
        eprintln!("visla: {e}");
        std::process::exit(1);
    }
}
