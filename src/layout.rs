//! Graph layout through an external Graphviz program.

use crate::error::{Result, VisError};
use graphviz_rust::cmd::{CommandArg, Format, Layout};
use graphviz_rust::printer::PrinterContext;
use graphviz_rust::{exec, parse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Graphviz layout program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAlgorithm {
    /// Scalable force-directed placement, suited to large graphs
    #[default]
    Sfdp,
    Neato,
    Fdp,
    Dot,
    Twopi,
    Circo,
}

impl LayoutAlgorithm {
    pub const ALL: [LayoutAlgorithm; 6] = [
        LayoutAlgorithm::Sfdp,
        LayoutAlgorithm::Neato,
        LayoutAlgorithm::Fdp,
        LayoutAlgorithm::Dot,
        LayoutAlgorithm::Twopi,
        LayoutAlgorithm::Circo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayoutAlgorithm::Sfdp => "sfdp",
            LayoutAlgorithm::Neato => "neato",
            LayoutAlgorithm::Fdp => "fdp",
            LayoutAlgorithm::Dot => "dot",
            LayoutAlgorithm::Twopi => "twopi",
            LayoutAlgorithm::Circo => "circo",
        }
    }

    fn command_layout(&self) -> Layout {
        match self {
            LayoutAlgorithm::Sfdp => Layout::Sfdp,
            LayoutAlgorithm::Neato => Layout::Neato,
            LayoutAlgorithm::Fdp => Layout::Fdp,
            LayoutAlgorithm::Dot => Layout::Dot,
            LayoutAlgorithm::Twopi => Layout::Twopi,
            LayoutAlgorithm::Circo => Layout::Circo,
        }
    }
}

impl fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutAlgorithm {
    type Err = VisError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == lower)
            .ok_or_else(|| VisError::Config(format!("unknown layout algorithm `{s}`")))
    }
}

/// Computes positions for a DOT graph and returns the laid-out DOT text.
pub trait LayoutEngine {
    fn layout(&self, dot: &str, algorithm: LayoutAlgorithm, args: &[String]) -> Result<String>;
}

/// Runs the Graphviz binaries found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GraphvizEngine;

impl LayoutEngine for GraphvizEngine {
    fn layout(&self, dot: &str, algorithm: LayoutAlgorithm, args: &[String]) -> Result<String> {
        let graph =
            parse(dot).map_err(|e| VisError::Layout(format!("failed to parse DOT: {e}")))?;

        let mut cmd = vec![
            CommandArg::Format(Format::Dot),
            CommandArg::Layout(algorithm.command_layout()),
        ];
        cmd.extend(args.iter().cloned().map(CommandArg::Custom));
        debug!(%algorithm, extra_args = args.len(), "running graphviz");

        let bytes = exec(graph, &mut PrinterContext::default(), cmd)
            .map_err(|e| VisError::Layout(format!("failed to execute {algorithm}: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| VisError::Layout(format!("{algorithm} output is not utf-8")))?;
        info!(%algorithm, bytes = text.len(), "layout complete");
        Ok(text)
    }
}

/// Split layout output into trimmed, non-empty lines.
pub fn text_to_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
