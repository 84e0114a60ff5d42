//! Text renderings of evidence paths

use crate::data::Path;

/// Inserted before an edge whose endpoints disagree with its neighbours
pub const EDGE_MISMATCH_MARKER: &str = "  (⚠ edge-node mismatch)  ";

/// Render a path as `[N1] text  --rel→  [N2] text ...`
///
/// Edges beyond `nodes.len() - 1` are not rendered.
pub fn linearize_path(path: &Path) -> String {
    let edge_limit = path.edges.len().min(path.nodes.len().saturating_sub(1));
    let mut out = String::new();

    for (i, node) in path.nodes.iter().enumerate() {
        out.push_str(&format!("[{}] {}", node.id, node.text));

        if i < edge_limit {
            let edge = &path.edges[i];
            if edge.src != node.id || edge.dst != path.nodes[i + 1].id {
                out.push_str(EDGE_MISMATCH_MARKER);
            }
            out.push_str(&format!("  --{}→  ", edge.relation));
        }
    }

    out
}

/// Baseline context: every linearized path, separated by blank lines
pub fn concat_context(paths: &[Path]) -> String {
    paths
        .iter()
        .map(linearize_path)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Edge, Node};

    fn chain() -> Path {
        Path::new(
            vec![
                Node::new("BE1", "Ludwig van Beethoven was born in Bonn."),
                Node::new("BE2", "Bonn is a city in Germany."),
            ],
            vec![Edge::new("BE1", "BE2", "born_in_city")],
        )
    }

    #[test]
    fn test_linearize_chain() {
        assert_eq!(
            linearize_path(&chain()),
            "[BE1] Ludwig van Beethoven was born in Bonn.  --born_in_city→  [BE2] Bonn is a city in Germany."
        );
    }

    #[test]
    fn test_linearize_is_deterministic() {
        let path = chain();
        let first = linearize_path(&path);
        for _ in 0..10 {
            assert_eq!(linearize_path(&path), first);
        }
    }

    #[test]
    fn test_linearize_singleton() {
        let path = Path::single(Node::new("S5", "Smoking increases lung cancer risk."));
        assert_eq!(linearize_path(&path), "[S5] Smoking increases lung cancer risk.");
    }

    #[test]
    fn test_mismatch_is_flagged_inline() {
        let mut path = chain();
        path.edges[0].dst = "BE9".to_string();
        let text = linearize_path(&path);
        assert!(text.contains("(⚠ edge-node mismatch)"));
        assert!(text.contains("--born_in_city→"));
        assert!(text.ends_with("[BE2] Bonn is a city in Germany."));
    }

    #[test]
    fn test_surplus_edges_do_not_panic() {
        let mut path = chain();
        path.edges.push(Edge::new("BE2", "BE3", "country_has_capital"));
        path.edges.push(Edge::new("BE3", "BE4", "capital_has_river"));
        let text = linearize_path(&path);
        assert!(!text.contains("country_has_capital"));

        let empty = Path::new(vec![], vec![Edge::new("A", "B", "r")]);
        assert_eq!(linearize_path(&empty), "");
    }

    #[test]
    fn test_concat_context_joins_with_blank_line() {
        let single = Path::single(Node::new("X", "Fact."));
        let ctx = concat_context(&[chain(), single]);
        let parts: Vec<&str> = ctx.split("\n\n").collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], "[X] Fact.");
        assert_eq!(concat_context(&[]), "");
    }
}
