//! Print the DOT topology of a sparse matrix file.
//!
//! The output can be laid out by hand, e.g. `mtx_to_gv a.mtx | sfdp > a.gv`,
//! and drawn later with `visla a.gv`.

use clap::Parser;
use std::path::PathBuf;
use tracing::error;
use visla::config::VisConfig;
use visla::ingest::{read_coordinates, resolve_format};
use visla::telemetry::init_logging;
use visla::{Result, VisGraph};

#[derive(Parser, Debug)]
#[command(name = "mtx_to_gv")]
#[command(about = "Convert a sparse matrix file to a Graphviz graph", long_about = None)]
struct Args {
    /// Matrix file (csv, mtx, npz)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Override the format inferred from the file extension
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Draw rows and columns as separate node sets (auto, always, never)
    #[arg(long, value_name = "MODE", default_value = "auto")]
    bipartite: String,

    /// Keep duplicate edges
    #[arg(long)]
    no_strict: bool,
}

fn run(args: &Args) -> Result<String> {
    let config = VisConfig {
        bipartite: args.bipartite.parse()?,
        strict: !args.no_strict,
        ..VisConfig::default()
    };
    let format = resolve_format(&args.file, args.format.as_deref())?;
    let coords = read_coordinates(&args.file, format)?;

    let mut graph = VisGraph::new(config);
    graph.add_coordinates(&coords);
    Ok(graph.to_dot())
}

fn main() {
    let args = Args::parse();
    init_logging(false);

    match run(&args) {
        Ok(dot) => print!("{dot}"),
        Err(e) => {
            error!(error = %e, file = %args.file.display(), "conversion failed");
            eprintln!("mtx_to_gv: {e}");
            std::process::exit(1);
        }
    }
}
