//! Output rendering module.
//!
//! Consumers of the finished graph and layout model: a connection list in
//! text and JSON form, and a standalone SVG diagram. Writers wrap the pure
//! string renderers with file I/O and error context.

pub mod connections;
pub mod svg;

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use crate::layout::LayoutModel;
use crate::topology::TopologyGraph;

// Re-export key types for easier access
pub use connections::{connection_rows, connections_json, connections_text, ConnectionRow};
pub use svg::render_svg;

/// Write `connections.txt` and `connections.json` into `dir`
pub fn write_connections(graph: &TopologyGraph, dir: &Path) -> Result<()> {
    let text_path = dir.join("connections.txt");
    fs::write(&text_path, connections_text(graph))
        .with_context(|| format!("Failed to write {}", text_path.display()))?;

    let json_path = dir.join("connections.json");
    let json = connections_json(graph).context("Failed to serialize connection list")?;
    fs::write(&json_path, json).with_context(|| format!("Failed to write {}", json_path.display()))?;

    log::info!("Connection list written to {} ({} links)", text_path.display(), graph.links.len());
    Ok(())
}

/// Write the SVG diagram to `path`
pub fn write_svg(graph: &TopologyGraph, model: &LayoutModel, line_height: f64, path: &Path) -> Result<()> {
    let svg = render_svg(graph, model, line_height).context("Failed to render SVG diagram")?;
    fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Diagram written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layout;
    use crate::config::LayoutConfig;
    use tempfile::TempDir;

    #[test]
    fn test_writers_create_files() {
        let dir = TempDir::new().unwrap();
        let graph = TopologyGraph::default();
        let model = compute_layout(&graph, &LayoutConfig::default());

        write_connections(&graph, dir.path()).unwrap();
        write_svg(&graph, &model, 10.0, &dir.path().join("diagram.svg")).unwrap();

        assert!(dir.path().join("connections.txt").exists());
        assert_eq!(fs::read_to_string(dir.path().join("connections.json")).unwrap(), "[]");
        assert!(dir.path().join("diagram.svg").exists());
    }
}
