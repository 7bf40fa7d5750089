//! End-to-end tests: file in, topology, layout, segments and PNG out.
//!
//! Layout runs use a deterministic in-process engine; the test that needs a
//! Graphviz installation is ignored by default.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use visla::config::VisConfig;
use visla::layout::{GraphvizEngine, LayoutAlgorithm, LayoutEngine};
use visla::layout_parser::parse_layout;
use visla::render::{Canvas, SaveOptions};
use visla::topology::{BipartiteMode, Edge, NodeId};
use visla::{Point, Result, VisError, VisGraph};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn node_ids(graph: &VisGraph) -> HashSet<String> {
    graph
        .topology()
        .nodes()
        .iter()
        .map(|n| n.as_str().to_string())
        .collect()
}

/// Places the k-th node it meets on a circle of radius 100
struct CircleEngine;

impl LayoutEngine for CircleEngine {
    fn layout(&self, dot: &str, _: LayoutAlgorithm, _: &[String]) -> Result<String> {
        let mut nodes: Vec<String> = Vec::new();
        let mut edges = Vec::new();
        for line in dot.lines().map(str::trim).filter(|l| l.contains(" -- ")) {
            let stmt = line.trim_end_matches(';');
            let (a, b) = stmt.split_once(" -- ").unwrap();
            for id in [a, b] {
                if !nodes.iter().any(|n| n == id) {
                    nodes.push(id.to_string());
                }
            }
            edges.push(stmt.to_string());
        }

        let mut out = String::from("strict graph {\n\tgraph [bb=\"-100,-100,100,100\"];\n");
        let k = nodes.len().max(1) as f64;
        for (i, id) in nodes.iter().enumerate() {
            let angle = std::f64::consts::TAU * i as f64 / k;
            out.push_str(&format!(
                "\t{id}\t[height=0.5,\n\t\tpos=\"{:.3},{:.3}\",\n\t\twidth=0.75];\n",
                100.0 * angle.cos(),
                100.0 * angle.sin()
            ));
        }
        for edge in edges {
            out.push_str(&format!("\t{edge};\n"));
        }
        out.push_str("}\n");
        Ok(out)
    }
}

// ============================================================================
// Ingestion and topology
// ============================================================================

#[test]
fn test_scenario_square_csv_is_symmetric() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "tri.csv", "3,3\n0,1\n1,2\n2,0\n");
    let graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();

    assert!(!graph.is_bipartite());
    assert_eq!(graph.dims(), Some((3, 3)));
    assert_eq!(
        node_ids(&graph),
        ["0", "1", "2"].iter().map(|s| s.to_string()).collect()
    );
    assert_eq!(graph.topology().edge_count(), 3);
}

#[test]
fn test_scenario_rectangular_csv_is_bipartite() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "rect.csv", "2,3\n0,0\n");
    let graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();

    assert!(graph.is_bipartite());
    assert_eq!(
        node_ids(&graph),
        ["0", "2"].iter().map(|s| s.to_string()).collect()
    );
    assert_eq!(graph.topology().edges(), &[Edge::new("0", "2")]);
}

#[test]
fn test_forced_bipartite_square_matrix() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "sq.csv", "2,2\n0,0\n1,1\n");
    let config = VisConfig {
        bipartite: BipartiteMode::Always,
        ..VisConfig::default()
    };
    let graph = VisGraph::from_file(&path, None, config).unwrap();
    assert_eq!(
        graph.topology().edges(),
        &[Edge::new("0", "2"), Edge::new("1", "3")]
    );
}

#[test]
fn test_one_based_csv_is_corrected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "one.csv", "3,3\n1,2\n2,3\n3,1\n");
    let graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();
    assert_eq!(
        graph.topology().edges(),
        &[Edge::new("0", "1"), Edge::new("1", "2"), Edge::new("2", "0")]
    );
}

#[test]
fn test_matrix_market_fixture() {
    let graph = VisGraph::from_file(fixture("path4.mtx"), None, VisConfig::default()).unwrap();
    assert_eq!(graph.dims(), Some((4, 4)));
    assert_eq!(graph.topology().node_count(), 4);
    // both triangles stored: strict mode keeps one edge per pair
    assert_eq!(graph.topology().edge_count(), 3);
    assert_eq!(graph.topology().duplicates_dropped(), 3);
}

#[test]
fn test_non_strict_keeps_mirrored_entries() {
    let config = VisConfig {
        strict: false,
        ..VisConfig::default()
    };
    let graph = VisGraph::from_file(fixture("path4.mtx"), None, config).unwrap();
    assert_eq!(graph.topology().edge_count(), 6);
    assert!(graph.to_dot().starts_with("graph {"));
}

#[test]
fn test_format_hint_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "matrix.txt", "2,2\n0,1\n");
    assert!(matches!(
        VisGraph::from_file(&path, None, VisConfig::default()),
        Err(VisError::UnsupportedFormat { .. })
    ));
    let graph = VisGraph::from_file(&path, Some("csv"), VisConfig::default()).unwrap();
    assert_eq!(graph.topology().edge_count(), 1);

    assert!(matches!(
        VisGraph::from_file(&path, Some("xls"), VisConfig::default()),
        Err(VisError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.csv");
    assert!(VisGraph::from_file(&path, None, VisConfig::default()).is_err());
}

// ============================================================================
// Layout parsing
// ============================================================================

#[test]
fn test_scenario_header_then_nodes_then_edge() {
    let lines: Vec<String> = [
        r#"graph [bb="0,0,10,10"];"#,
        r#"0 [pos="1.0,2.0"];"#,
        r#"1 [pos="3.0,4.0"];"#,
        "0 -- 1;",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let layout = parse_layout(&lines).unwrap();
    assert_eq!(layout.positions.len(), 2);
    assert_eq!(layout.positions[&NodeId::new("0")], Point::new(1.0, 2.0));
    assert_eq!(layout.positions[&NodeId::new("1")], Point::new(3.0, 4.0));
    assert_eq!(layout.edges, vec![Edge::new("0", "1")]);
}

#[test]
fn test_sfdp_output_fixture() {
    let mut graph = VisGraph::from_file(fixture("triangle_sfdp.gv"), None, VisConfig::default())
        .unwrap();
    let layout = graph.parsed_layout().unwrap();

    assert_eq!(layout.positions[&NodeId::new("0")], Point::new(27.0, 18.0));
    assert_eq!(layout.positions[&NodeId::new("1")], Point::new(97.94, 18.0));
    assert_eq!(layout.positions[&NodeId::new("2")], Point::new(62.47, 100.03));
    assert_eq!(
        layout.edges,
        vec![Edge::new("0", "1"), Edge::new("1", "2"), Edge::new("2", "0")]
    );
    assert_eq!(layout.defaults_skipped, 3);
}

#[test]
fn test_not_laid_out() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "tri.csv", "3,3\n0,1\n1,2\n2,0\n");
    let mut graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();
    assert!(matches!(graph.parsed_layout(), Err(VisError::NotLaidOut)));
    assert!(matches!(
        graph.visualize(Some(Canvas::default())),
        Err(VisError::NotLaidOut)
    ));
}

#[test]
fn test_edge_to_unpositioned_node() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "partial.gv",
        "graph {\n\ta [pos=\"0,0\"];\n\tb;\n\ta -- b;\n}\n",
    );
    let mut graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();
    assert_eq!(graph.parsed_layout().unwrap().unpositioned, vec![NodeId::new("b")]);
    match graph.render_segments() {
        Err(VisError::MissingPosition(id)) => assert_eq!(id, "b"),
        other => panic!("unexpected result {other:?}"),
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_zero_length_edges_not_rendered() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "loops.gv",
        "graph {\n\t0 [pos=\"0,0\"];\n\t1 [pos=\"0,0\"];\n\t2 [pos=\"5,0\"];\n\t0 -- 1;\n\t0 -- 0;\n\t1 -- 2;\n}\n",
    );
    let mut graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();
    let set = graph.render_segments().unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.dropped_zero_length, 2);
    assert_eq!(set.segments[0].normalized, 1.0);
}

#[test]
fn test_gv_to_png_at_requested_dpi() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("triangle.png");
    let mut graph = VisGraph::from_file(fixture("triangle_sfdp.gv"), None, VisConfig::default())
        .unwrap();
    graph
        .save(
            &out,
            &SaveOptions {
                dpi: 40.0,
                transparent: true,
            },
        )
        .unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    let pixmap = tiny_skia::Pixmap::load_png(&out).unwrap();
    assert_eq!((pixmap.width(), pixmap.height()), (256, 192));
}

#[test]
fn test_matrix_pipeline_with_engine() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "c4.csv", "4,4\n0,1\n1,2\n2,3\n3,0\n1,0\n");
    let mut config = VisConfig::default();
    config.display_path = dir.path().join("display.png");
    config.timing = true;

    let mut graph = VisGraph::from_file(&path, None, config).unwrap();
    assert_eq!(graph.topology().edge_count(), 4);
    graph.layout(&CircleEngine).unwrap();

    let set = graph.render_segments().unwrap();
    assert_eq!(set.len(), 4);
    // a square inscribed in a circle: all sides equal
    for segment in &set.segments {
        assert!((segment.normalized - 1.0).abs() < 1e-3);
    }

    assert!(graph.visualize(None).unwrap().is_none());
    assert!(dir.path().join("display.png").exists());
    assert!(!graph.trace().is_empty());
}

#[test]
fn test_unpositioned_gv_is_laid_out() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "path3.gv",
        "strict graph {\n\tnode [shape=none];\n\t0 -- 1;\n\t1 -- 2;\n}\n",
    );
    let mut graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();
    assert!(!graph.is_laid_out());
    assert_eq!(graph.topology().edge_count(), 2);
    assert!(matches!(graph.render_segments(), Err(VisError::NotLaidOut)));

    graph.layout(&CircleEngine).unwrap();
    assert!(graph.is_laid_out());
    assert_eq!(graph.render_segments().unwrap().len(), 2);
}

#[test]
fn test_converted_matrix_reloads_as_topology() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "tri.csv", "3,3\n0,1\n1,2\n2,0\n");
    let source = VisGraph::from_file(&csv, None, VisConfig::default()).unwrap();
    let gv = write(&dir, "tri.gv", &source.to_dot());

    let reloaded = VisGraph::from_file(&gv, None, VisConfig::default()).unwrap();
    assert!(!reloaded.is_laid_out());
    assert_eq!(reloaded.topology().edges(), source.topology().edges());
    assert_eq!(node_ids(&reloaded), node_ids(&source));
}

#[test]
fn test_visualize_onto_shared_canvas() {
    let mut canvas = Some(Canvas::default());
    for file in ["a.gv", "b.gv"] {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            file,
            "graph {\n\tx [pos=\"0,0\"];\n\ty [pos=\"3,4\"];\n\tx -- y;\n}\n",
        );
        let mut graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();
        canvas = graph.visualize(canvas).unwrap();
    }
    let canvas = canvas.unwrap();
    assert_eq!(canvas.segments().len(), 2);
    let extent = canvas.extent().unwrap();
    assert_eq!((extent.width(), extent.height()), (3.0, 4.0));
}

#[test]
#[ignore = "requires Graphviz binaries on PATH"]
fn test_graphviz_sfdp_layout() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "tri.csv", "3,3\n0,1\n1,2\n2,0\n");
    let mut graph = VisGraph::from_file(&path, None, VisConfig::default()).unwrap();
    graph.layout(&GraphvizEngine).unwrap();

    let layout = graph.parsed_layout().unwrap();
    assert_eq!(layout.positions.len(), 3);
    assert_eq!(layout.edges.len(), 3);
    assert!(layout.unpositioned.is_empty());
}
