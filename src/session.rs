//! Graph session: owns the topology, the layout text and the phase trace,
//! and drives the pipeline from an input file to a rendered image.

use crate::config::VisConfig;
use crate::error::Result;
use crate::ingest::{read_coordinates, resolve_format, CoordinateList, FileFormat};
use crate::layout::{text_to_lines, LayoutEngine};
use crate::layout_parser::{parse_layout, ParsedLayout};
use crate::render::{prepare_segments, Canvas, RenderSegmentSet, SaveOptions};
use crate::telemetry::{Phase, SessionTrace};
use crate::topology::{edges_from_coordinates, resolve_bipartite, Topology};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A graph being visualized
#[derive(Debug, Clone)]
pub struct VisGraph {
    config: VisConfig,
    topology: Topology,
    source: Option<PathBuf>,
    dims: Option<(usize, usize)>,
    bipartite: bool,
    layout_text: Vec<String>,
    trace: SessionTrace,
}

impl Default for VisGraph {
    fn default() -> Self {
        Self::new(VisConfig::default())
    }
}

impl VisGraph {
    pub fn new(config: VisConfig) -> Self {
        let topology = Topology::new(config.strict);
        Self {
            config,
            topology,
            source: None,
            dims: None,
            bipartite: false,
            layout_text: Vec::new(),
            trace: SessionTrace::new(),
        }
    }

    /// Open a session on a matrix or laid-out graph file.
    pub fn from_file(path: impl AsRef<Path>, format: Option<&str>, config: VisConfig) -> Result<Self> {
        let mut graph = Self::new(config);
        graph.load_file(path, format)?;
        Ok(graph)
    }

    /// Load a file into this session.
    ///
    /// Matrix formats (csv, mtx, npz) add edges to the topology and discard
    /// any previous layout. `dot`/`gv` files replace the layout text when
    /// they carry node positions; a file without any positions (such as
    /// `mtx_to_gv` output) is read as topology and still needs a layout.
    pub fn load_file(&mut self, path: impl AsRef<Path>, format: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        let format = resolve_format(path, format)?;
        let timing = self.config.timing;
        info!(path = %path.display(), %format, "loading graph");

        if format.is_matrix() {
            let coords = self
                .trace
                .time(timing, Phase::Ingest, || read_coordinates(path, format))?;
            self.add_coordinates(&coords);
        } else {
            let text = self
                .trace
                .time(timing, Phase::Ingest, || std::fs::read_to_string(path))?;
            self.load_layout_text(&text);
            if let Ok(parsed) = parse_layout(&self.layout_text) {
                if parsed.positions.is_empty() && parsed.node_count() + parsed.edges.len() > 0 {
                    self.adopt_topology(parsed);
                }
            }
        }
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Take the nodes and edges of an unpositioned graph file as topology.
    fn adopt_topology(&mut self, parsed: ParsedLayout) {
        for id in &parsed.unpositioned {
            self.topology.add_node(id);
        }
        let inserted = self.topology.add_edges_from(parsed.edges);
        self.layout_text.clear();
        info!(
            nodes = self.topology.node_count(),
            edges = inserted,
            "graph file has no positions; it must be laid out"
        );
    }

    /// Add the edges of a coordinate list. Returns the number inserted.
    pub fn add_coordinates(&mut self, coords: &CoordinateList) -> usize {
        let bipartite = resolve_bipartite(self.config.bipartite, coords.m, coords.n);
        let timing = self.config.timing;
        let topology = &mut self.topology;
        let inserted = self.trace.time(timing, Phase::Topology, || {
            topology.add_edges_from(edges_from_coordinates(coords, bipartite))
        });
        self.dims = Some((coords.m, coords.n));
        self.bipartite = bipartite;
        self.layout_text.clear();
        debug!(
            m = coords.m,
            n = coords.n,
            bipartite,
            inserted,
            "topology updated"
        );
        inserted
    }

    pub fn config(&self) -> &VisConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut VisConfig {
        &mut self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Matrix dimensions of the last matrix loaded
    pub fn dims(&self) -> Option<(usize, usize)> {
        self.dims
    }

    pub fn is_bipartite(&self) -> bool {
        self.bipartite
    }

    pub fn to_dot(&self) -> String {
        self.topology.to_dot()
    }

    /// Lay out the topology with `engine`, replacing any layout text.
    pub fn layout(&mut self, engine: &dyn LayoutEngine) -> Result<()> {
        let dot = self.topology.to_dot();
        let algorithm = self.config.algorithm;
        let args = &self.config.layout_args;
        let text = self.trace.time(self.config.timing, Phase::Layout, || {
            engine.layout(&dot, algorithm, args)
        })?;
        self.load_layout_text(&text);
        Ok(())
    }

    /// Replace the layout text with already laid-out DOT.
    pub fn load_layout_text(&mut self, text: &str) {
        self.layout_text = text_to_lines(text);
        debug!(lines = self.layout_text.len(), "layout text loaded");
    }

    pub fn layout_text(&self) -> &[String] {
        &self.layout_text
    }

    pub fn is_laid_out(&self) -> bool {
        !self.layout_text.is_empty()
    }

    /// Positions and edges parsed from the current layout text.
    pub fn parsed_layout(&mut self) -> Result<ParsedLayout> {
        let lines = &self.layout_text;
        self.trace
            .time(self.config.timing, Phase::Parse, || parse_layout(lines))
    }

    /// Colored segments for the current layout.
    pub fn render_segments(&mut self) -> Result<RenderSegmentSet> {
        let parsed = self.parsed_layout()?;
        let colormap = self.config.colormap;
        self.trace.time(self.config.timing, Phase::Prepare, || {
            prepare_segments(&parsed, &colormap)
        })
    }

    /// Draw the graph.
    ///
    /// With a canvas, the segments are appended to it and it is handed back.
    /// Without one, a canvas is built from the configuration and written to
    /// `config.display_path`.
    pub fn visualize(&mut self, canvas: Option<Canvas>) -> Result<Option<Canvas>> {
        match canvas {
            Some(canvas) => self.draw_onto(canvas).map(Some),
            None => {
                let path = self.config.display_path.clone();
                self.save(path, &SaveOptions::default())?;
                Ok(None)
            }
        }
    }

    fn draw_onto(&mut self, mut canvas: Canvas) -> Result<Canvas> {
        let set = self.render_segments()?;
        canvas.add_segments(&set);
        canvas.set_square_aspect(true);
        canvas.set_axes_visible(false);
        info!(
            segments = set.len(),
            dropped = set.dropped_zero_length,
            "visualized graph"
        );
        Ok(canvas)
    }

    /// Draw the graph on a fresh canvas and save it as PNG.
    pub fn save(&mut self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
        let canvas = self.draw_onto(Canvas::from_config(&self.config))?;
        let path = path.as_ref();
        self.trace.time(self.config.timing, Phase::Render, || {
            canvas.save_png(path, options)
        })
    }

    pub fn trace(&self) -> &SessionTrace {
        &self.trace
    }

    /// Format of a path as this session would read it
    pub fn format_of(path: impl AsRef<Path>, hint: Option<&str>) -> Result<FileFormat> {
        resolve_format(path.as_ref(), hint)
    }
}
