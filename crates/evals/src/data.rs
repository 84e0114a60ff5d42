//! Evidence graphs, examples and result rows
//!
//! Also holds the five built-in multi-hop examples used when no example file
//! is given.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A node in an evidence path: an identifier and the fact it states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub text: String,
}

impl Node {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A labeled relation between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    pub relation: String,
}

impl Edge {
    pub fn new(src: impl Into<String>, dst: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            relation: relation.into(),
        }
    }
}

/// An ordered chain of nodes; `edges[i]` connects `nodes[i]` to `nodes[i + 1]`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Path {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// A path made of one node and no edges
    pub fn single(node: Node) -> Self {
        Self {
            nodes: vec![node],
            edges: Vec::new(),
        }
    }
}

/// A query, its evidence graph and the paraphrased gold answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub query: String,
    pub paths: Vec<Path>,
    pub gold_refs: Vec<String>,
}

/// Context-construction strategy under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Linearized paths joined by blank lines
    Concat,
    /// One model-synthesized sentence
    Fluent,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Concat => "concat",
            Mode::Fluent => "fluent",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four similarity scores of one answer, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub rouge1: f64,
    pub rouge_l: f64,
    pub bleu: f64,
    pub semantic_f1: f64,
}

/// One scored answer for an (example, model, mode) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub model: String,
    pub mode: Mode,
    /// Position of the example in the input list
    pub example_index: usize,
    pub query: String,
    pub answer: String,
    pub scores: Scores,
    /// Whitespace-separated words in `answer`
    pub word_count: usize,
    /// Whether `word_count` falls inside the requested window
    pub within_word_bounds: bool,
}

/// Mean scores for one (model, mode) group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub model: String,
    pub mode: Mode,
    pub n_examples: usize,
    pub mean: Scores,
    /// Fraction of answers inside the word window
    pub word_bounds_rate: f64,
}

/// Five multi-hop examples with long-form, single-sentence answers
pub fn builtin_examples() -> Vec<Example> {
    vec![mercury(), colonization(), smoking(), neural_training(), beethoven()]
}

fn refs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn mercury() -> Example {
    let me0 = Node::new("ME0", "Mercury is the closest planet to the Sun.");
    let me1 = Node::new("ME1", "Mercury has a near‑vacuum exosphere and virtually no atmosphere.");
    let me2 = Node::new("ME2", "Mercury experiences extreme day–night temperature variation.");
    let me3 = Node::new("ME3", "Mercury rotates slowly in a 3:2 spin–orbit resonance.");
    let me4 = Node::new("ME4", "Mercury’s surface is heavily cratered.");

    Example {
        query: "What are defining characteristics of Mercury?".to_string(),
        paths: vec![
            Path::new(vec![me0.clone(), me1], vec![Edge::new("ME0", "ME1", "has_property")]),
            Path::new(vec![me0.clone(), me2], vec![Edge::new("ME0", "ME2", "has_property")]),
            Path::new(vec![me0.clone(), me3], vec![Edge::new("ME0", "ME3", "has_spin_orbit")]),
            Path::new(vec![me0, me4], vec![Edge::new("ME0", "ME4", "has_surface_feature")]),
        ],
        gold_refs: refs(&[
            "Mercury, the innermost planet, has a near‑vacuum exosphere with virtually no atmosphere, extreme day–night temperature swings, a 3:2 spin–orbit resonance with slow rotation, and a heavily cratered surface.",
            "Key traits of Mercury include its position closest to the Sun, a tenuous exosphere, drastic thermal variation, slow 3:2 spin–orbit rotation, and a battered, cratered terrain.",
            "As the closest planet, Mercury exhibits a thin exosphere instead of a true atmosphere, large diurnal temperature differences, slow 3:2 rotational locking, and a surface marked by extensive cratering.",
        ]),
    }
}

fn colonization() -> Example {
    let c1 = Node::new("C1", "Christopher Columbus sailed west from Spain in 1492 seeking a route to Asia.");
    let c2 = Node::new("C2", "Columbus landed in the Caribbean, initiating sustained European contact with the Americas.");
    let c3 = Node::new("C3", "European powers sought trade routes, gold and spices, and territorial expansion.");
    let c4 = Node::new("C4", "The Spanish monarchy financed Columbus’s voyage.");

    Example {
        query: "Why did European colonization in the Americas begin?".to_string(),
        paths: vec![Path::new(
            vec![c4, c1, c2, c3],
            vec![
                Edge::new("C4", "C1", "financed"),
                Edge::new("C1", "C2", "voyage_landed_in"),
                Edge::new("C2", "C3", "led_to"),
            ],
        )],
        gold_refs: refs(&[
            "European colonization of the Americas began after Columbus’s 1492 voyage from Spain reached the Caribbean, catalyzing sustained contact driven by monarchic sponsorship, trade ambitions, gold and spices, and expanding imperial influence.",
            "Columbus’s Caribbean landfall in 1492, financed by the Spanish crown, opened enduring European contact that was motivated by new trade routes, precious resources, and territorial expansion.",
            "Backed by Spain, Columbus’s voyage connected Europe to the Americas, and the pursuit of Asian commerce, wealth, and power subsequently spurred large‑scale colonization.",
        ]),
    }
}

fn smoking() -> Example {
    let s1 = Node::new("S1", "Tobacco smoke contains carcinogens.");
    let s2 = Node::new("S2", "Carcinogens cause DNA damage and mutations in lung cells.");
    let s3 = Node::new("S3", "Accumulated mutations can drive malignant transformation and tumor growth.");
    let s4 = Node::new("S4", "Lung cancer is a leading cause of cancer death.");
    let s5 = Node::new("S5", "Smoking substantially increases the risk of lung cancer.");

    Example {
        query: "How does smoking lead to lung cancer death?".to_string(),
        paths: vec![
            Path::new(
                vec![s1, s2, s3, s4],
                vec![
                    Edge::new("S1", "S2", "exposure_causes"),
                    Edge::new("S2", "S3", "leads_to"),
                    Edge::new("S3", "S4", "results_in"),
                ],
            ),
            Path::single(s5),
        ],
        gold_refs: refs(&[
            "Smoking delivers carcinogens that damage DNA in lung cells, and as mutations accumulate they enable malignant transformation and tumor growth, making lung cancer a leading cause of cancer death.",
            "Tobacco smoke’s carcinogens induce DNA lesions that, over time, create oncogenic mutations, drive uncontrolled proliferation, and ultimately cause lethal lung cancer in many smokers.",
            "By exposing lung tissue to carcinogens, smoking causes mutational damage that leads to malignant change and aggressive tumors, explaining lung cancer’s prominence among cancer deaths.",
        ]),
    }
}

fn neural_training() -> Example {
    let n1 = Node::new("N1", "A neural network performs a forward pass that computes activations and predictions.");
    let n2 = Node::new("N2", "A loss function measures the error between predictions and targets.");
    let n3 = Node::new("N3", "Backpropagation computes gradients of the loss with respect to the weights.");
    let n4 = Node::new("N4", "Gradient descent or its variants update weights using those gradients.");
    let n5 = Node::new("N5", "Training iterates over minibatches and epochs, often with regularization to improve generalization.");

    Example {
        query: "How are neural networks trained?".to_string(),
        paths: vec![
            Path::new(
                vec![n1, n2, n3, n4.clone()],
                vec![
                    Edge::new("N1", "N2", "loss_computed_from"),
                    Edge::new("N2", "N3", "backprop_computes_gradients"),
                    Edge::new("N3", "N4", "optimizer_updates"),
                ],
            ),
            Path::new(vec![n4, n5], vec![Edge::new("N4", "N5", "repeats_over_data")]),
        ],
        gold_refs: refs(&[
            "Neural networks are trained by forward passes that produce predictions, loss functions measuring error, backpropagation computing gradients, and gradient‑descent optimizers updating weights over many minibatches and epochs with possible regularization.",
            "Training proceeds by computing outputs, evaluating loss against targets, propagating gradients backward, and adjusting parameters via gradient descent repeatedly across batches and epochs, often with techniques like regularization or momentum.",
            "Learning involves forward computation, loss evaluation, gradient backpropagation, and iterative optimizer updates across the dataset, typically for multiple epochs with optional regularization to improve generalization.",
        ]),
    }
}

fn beethoven() -> Example {
    let be1 = Node::new("BE1", "Ludwig van Beethoven was born in Bonn.");
    let be2 = Node::new("BE2", "Bonn is a city in Germany.");
    let be3 = Node::new("BE3", "Berlin is the capital of Germany.");
    let be4 = Node::new("BE4", "The Spree River flows through Berlin.");

    Example {
        query: "Which river flows through the capital of the country where Beethoven was born, \
                and how does that relationship follow from the relevant locations?"
            .to_string(),
        paths: vec![
            Path::new(
                vec![be1, be2, be3.clone()],
                vec![
                    Edge::new("BE1", "BE2", "born_in_city"),
                    Edge::new("BE2", "BE3", "country_has_capital"),
                ],
            ),
            Path::new(vec![be3, be4], vec![Edge::new("BE3", "BE4", "capital_has_river")]),
        ],
        gold_refs: refs(&[
            "Because Beethoven was born in Bonn in Germany, whose capital is Berlin through which the Spree River flows, the river connected to the capital of his birth country is the Spree.",
            "Beethoven’s birthplace, Bonn, lies in Germany, and Germany’s capital is Berlin, a city traversed by the Spree River, making the relevant river the Spree.",
            "Bonn, Beethoven’s birthplace, is in Germany; Germany’s capital is Berlin, and Berlin is crossed by the Spree River, so the river in question is the Spree.",
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_examples_shape() {
        let examples = builtin_examples();
        assert_eq!(examples.len(), 5);
        for ex in &examples {
            assert!(!ex.paths.is_empty());
            assert_eq!(ex.gold_refs.len(), 3);
            for path in &ex.paths {
                assert!(path.edges.len() + 1 == path.nodes.len());
            }
        }
    }

    #[test]
    fn test_beethoven_example() {
        let ex = builtin_examples().pop().unwrap();
        assert!(ex.query.starts_with("Which river flows through the capital"));
        assert!(ex.query.contains("born, and how"));
        assert_eq!(ex.paths.len(), 2);
        assert_eq!(ex.paths[1].nodes[1].id, "BE4");
    }

    #[test]
    fn test_mode_display_and_order() {
        assert_eq!(Mode::Concat.to_string(), "concat");
        assert_eq!(Mode::Fluent.to_string(), "fluent");
        assert!(Mode::Concat < Mode::Fluent);
        assert_eq!(serde_json::to_string(&Mode::Fluent).unwrap(), "\"fluent\"");
    }
}
