//! TOML example loader
//!
//! Loads evaluation examples from an external TOML file instead of the
//! built-in set. Paths are written as node tables plus edge tables:
//!
//! ```toml
//! [[examples]]
//! query = "Where was Beethoven born?"
//! gold_refs = ["Beethoven was born in Bonn."]
//!
//! [[examples.paths]]
//! nodes = [{ id = "BE1", text = "Ludwig van Beethoven was born in Bonn." }]
//! ```

use std::path::Path as FsPath;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::{Edge, Example, Node, Path};

#[derive(Debug, Deserialize)]
struct TomlExampleFile {
    examples: Vec<TomlExample>,
}

#[derive(Debug, Deserialize)]
struct TomlExample {
    query: String,
    gold_refs: Vec<String>,
    #[serde(default)]
    paths: Vec<TomlPath>,
}

#[derive(Debug, Deserialize)]
struct TomlPath {
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

/// Load examples from a TOML file
pub fn load_examples(path: &FsPath) -> Result<Vec<Example>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read examples file: {}", path.display()))?;

    parse_examples(&content)
        .with_context(|| format!("Failed to parse examples file: {}", path.display()))
}

/// Parse examples from TOML text
pub fn parse_examples(content: &str) -> Result<Vec<Example>> {
    let file: TomlExampleFile = toml::from_str(content)?;

    file.examples
        .into_iter()
        .enumerate()
        .map(|(i, ex)| convert_example(i, ex))
        .collect()
}

fn convert_example(index: usize, toml: TomlExample) -> Result<Example> {
    if toml.gold_refs.is_empty() {
        anyhow::bail!("example {} ({:?}) has no gold_refs", index + 1, toml.query);
    }
    if toml.paths.iter().any(|p| p.nodes.is_empty()) {
        anyhow::bail!("example {} ({:?}) has a path without nodes", index + 1, toml.query);
    }

    let paths = toml
        .paths
        .into_iter()
        .map(|p| Path::new(p.nodes, p.edges))
        .collect();

    Ok(Example {
        query: toml.query,
        paths,
        gold_refs: toml.gold_refs,
    })
}
