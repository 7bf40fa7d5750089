//! Session configuration
//!
//! All options are plain fields set before a pipeline run. Values can be
//! loaded from JSON; missing keys fall back to the defaults.

use crate::colormap::{Colormap, Rgba};
use crate::error::{Result, VisError};
use crate::layout::LayoutAlgorithm;
use crate::topology::BipartiteMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Figure size in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FigureSize {
    pub width: f32,
    pub height: f32,
}

impl Default for FigureSize {
    fn default() -> Self {
        Self {
            width: 6.4,
            height: 4.8,
        }
    }
}

/// Configuration for a visualization session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisConfig {
    /// Background of the figure and plot area
    pub background: Rgba,
    /// Gradient used for edge-length coloring
    pub colormap: Colormap,
    /// Row/column node space policy
    pub bipartite: BipartiteMode,
    /// Collapse duplicate edges when building the topology
    pub strict: bool,
    /// Log and record the wall-clock time of each pipeline phase
    pub timing: bool,
    /// Graphviz layout program
    pub algorithm: LayoutAlgorithm,
    /// Extra arguments passed to the layout program (e.g. "-Goverlap=false")
    pub layout_args: Vec<String>,
    /// Edge line width in points
    pub line_width: f32,
    pub figure: FigureSize,
    /// Where the fire-and-forget path writes its image
    pub display_path: PathBuf,
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            background: Rgba::BLACK,
            colormap: Colormap::default(),
            bipartite: BipartiteMode::Auto,
            strict: true,
            timing: false,
            algorithm: LayoutAlgorithm::Sfdp,
            layout_args: Vec::new(),
            line_width: 1.0,
            figure: FigureSize::default(),
            display_path: PathBuf::from("visla.png"),
        }
    }
}

impl VisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VisError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.colormap.validate()?;
        if !(self.line_width > 0.0) {
            return Err(VisError::Config(format!(
                "line width must be positive, got {}",
                self.line_width
            )));
        }
        if !(self.figure.width > 0.0 && self.figure.height > 0.0) {
            return Err(VisError::Config(format!(
                "figure size must be positive, got {}x{}",
                self.figure.width, self.figure.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::Gradient;

    #[test]
    fn test_default_config() {
        let config = VisConfig::default();
        assert_eq!(config.background, Rgba::BLACK);
        assert_eq!(config.bipartite, BipartiteMode::Auto);
        assert_eq!(config.algorithm, LayoutAlgorithm::Sfdp);
        assert!(config.strict);
        assert!(!config.timing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VisConfig::from_json_str(
            r##"{
                "background": "#ffffff",
                "colormap": { "gradient": "viridis", "lo": 0.5, "hi": 0.8 },
                "bipartite": "always",
                "timing": true
            }"##,
        )
        .unwrap();
        assert_eq!(config.background, Rgba::WHITE);
        assert_eq!(config.colormap.gradient, Gradient::Viridis);
        assert_eq!(config.colormap.lo, 0.5);
        assert_eq!(config.bipartite, BipartiteMode::Always);
        assert!(config.timing);
        assert!(config.strict);
        assert_eq!(config.line_width, 1.0);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            VisConfig::from_json_str(r#"{ "background": "not-a-color" }"#),
            Err(VisError::Config(_))
        ));
        assert!(matches!(
            VisConfig::from_json_str(r#"{ "line_width": 0.0 }"#),
            Err(VisError::Config(_))
        ));
        assert!(matches!(
            VisConfig::from_json_str(r#"{ "colormap": { "lo": 0.9, "hi": 0.1 } }"#),
            Err(VisError::Config(_))
        ));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = VisConfig::default();
        config.layout_args.push("-Goverlap=false".to_string());
        let json = serde_json::to_string(&config).unwrap();
        let back = VisConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
