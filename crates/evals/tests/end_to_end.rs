//! Full runs against stub completion services

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use llm::{ChatOptions, Completion, Message, Role};

use fluent_evals::{
    builtin_examples, summarize, write_csvs, ConfigArgs, Example, FileConfig, Harness,
    MetricScorer, Mode, SemanticScorer, Settings, INSUFFICIENT_CONTEXT,
};

const BEETHOVEN_SENTENCE: &str =
    "Beethoven was born in Bonn, Germany, whose capital Berlin is crossed by the Spree River.";

#[derive(Debug, Clone)]
struct Call {
    synthesis: bool,
    model: String,
    user: String,
}

/// Answers synthesis requests with a sectioned response and everything else
/// with a per-model reply; records every request
struct StubLlm {
    synthesis_reply: String,
    answer_reply: Box<dyn Fn(&str, &str) -> String + Send + Sync>,
    jitter: bool,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubLlm {
    fn new(synthesis_reply: &str, answer_reply: impl Fn(&str, &str) -> String + Send + Sync + 'static) -> Self {
        Self {
            synthesis_reply: synthesis_reply.to_string(),
            answer_reply: Box::new(answer_reply),
            jitter: false,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn fixed(reply: &str) -> Self {
        let answer = reply.to_string();
        Self::new(reply, move |_, _| answer.clone())
    }

    fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Most requests that were ever outstanding at the same time
    fn peak_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Completion for StubLlm {
    async fn complete(&self, messages: Vec<Message>, options: &ChatOptions) -> String {
        let synthesis = messages
            .iter()
            .any(|m| m.role == Role::System && m.content.contains("Evidence Weaver"));
        let user = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.jitter {
            let delay = 1 + (user.len() + options.model.len() * 7) % 13;
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls.lock().unwrap().push(Call {
            synthesis,
            model: options.model.clone(),
            user: user.clone(),
        });

        if synthesis {
            self.synthesis_reply.clone()
        } else {
            (self.answer_reply)(&options.model, &user)
        }
    }
}

struct ConstantSemantic(f64);

#[async_trait]
impl SemanticScorer for ConstantSemantic {
    async fn score(&self, _hypothesis: &str, references: &[String]) -> Result<Vec<f64>> {
        Ok(vec![self.0; references.len()])
    }
}

fn settings(models: &str, concurrency: usize, summarizer: Option<&str>) -> Settings {
    let args = ConfigArgs {
        api_key: Some("sk-test".to_string()),
        models: Some(models.to_string()),
        summarizer_model: summarizer.map(String::from),
        no_semantic: true,
        concurrency: Some(concurrency),
        ..Default::default()
    };
    Settings::resolve(&args, FileConfig::default()).unwrap()
}

fn beethoven() -> Example {
    builtin_examples()
        .into_iter()
        .find(|e| e.query.contains("Beethoven"))
        .unwrap()
}

fn in_unit(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

#[tokio::test]
async fn test_beethoven_scores_both_modes() {
    let synthesis = format!(
        "Must-keep phrases:\n- Bonn\n- Berlin\n- Spree River\nFacts:\n- Beethoven was born in Bonn.\nSynthesis: Bonn leads to Germany and Berlin.\n{BEETHOVEN_SENTENCE}\n"
    );
    let stub = Arc::new(StubLlm::new(&synthesis, |_, _| BEETHOVEN_SENTENCE.to_string()));
    let settings = settings("gpt-4o", 1, None);
    let harness = Harness::new(stub.clone(), Arc::new(MetricScorer::lexical()), &settings);

    let rows = harness.run(&settings.models, &[beethoven()]).await;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].mode, Mode::Concat);
    assert_eq!(rows[1].mode, Mode::Fluent);
    for row in &rows {
        assert_eq!(row.answer, BEETHOVEN_SENTENCE);
        assert!(row.scores.rouge1 > 0.0);
        assert!(row.scores.rouge_l > 0.0);
        assert!(row.scores.bleu > 0.0);
        assert_eq!(row.scores.semantic_f1, 0.0);
        assert!(row.within_word_bounds);
    }

    // The fluent answer is asked from the final synthesized line only
    let calls = stub.calls();
    let synthesis_calls: Vec<&Call> = calls.iter().filter(|c| c.synthesis).collect();
    assert_eq!(synthesis_calls.len(), 1);
    assert_eq!(synthesis_calls[0].model, "gpt-4o");
    let fluent_answer_call = calls
        .iter()
        .find(|c| !c.synthesis && c.user.contains(&format!("\"\"\"{BEETHOVEN_SENTENCE}\"\"\"")))
        .expect("fluent answer request");
    assert!(!fluent_answer_call.user.contains("Must-keep"));
    assert!(calls
        .iter()
        .any(|c| !c.synthesis && c.user.contains("[BE1]") && c.user.contains("--born_in_city→")));

    let summary = summarize(&rows);
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].mode, Mode::Concat);
    assert_eq!(summary[1].mode, Mode::Fluent);
    assert!(summary.iter().all(|s| s.n_examples == 1 && s.model == "gpt-4o"));
}

#[tokio::test]
async fn test_insufficient_context_everywhere_still_completes() {
    let stub = Arc::new(StubLlm::fixed(INSUFFICIENT_CONTEXT));
    let settings = settings("model-a,model-b", 2, None);
    let harness = Harness::new(stub, Arc::new(MetricScorer::lexical()), &settings);
    let examples = builtin_examples();

    let rows = harness.run(&settings.models, &examples).await;
    assert_eq!(rows.len(), 2 * examples.len() * 2);
    for row in &rows {
        assert_eq!(row.answer, INSUFFICIENT_CONTEXT);
        assert!(row.scores.rouge1 < 0.1, "rouge1 {}", row.scores.rouge1);
        assert!(row.scores.rouge_l < 0.1, "rougeL {}", row.scores.rouge_l);
        assert!(row.scores.bleu < 0.1, "bleu {}", row.scores.bleu);
        assert!(!row.within_word_bounds);
    }

    let summary = summarize(&rows);
    assert_eq!(summary.len(), 4);
    assert!(summary.iter().all(|s| s.n_examples == examples.len()));
    assert!(summary.iter().all(|s| s.word_bounds_rate == 0.0));

    let dir = tempfile::tempdir().unwrap();
    let files = write_csvs(&rows, &summary, dir.path()).unwrap();
    let written = std::fs::read_to_string(files.summary).unwrap();
    assert_eq!(written.lines().count(), 5);
}

#[tokio::test]
async fn test_without_semantic_backend_column_is_zero() {
    let stub = Arc::new(StubLlm::fixed(BEETHOVEN_SENTENCE));
    let settings = settings("gpt-4o", 1, None);
    assert!(settings.semantic_backend.is_none());
    let harness = Harness::new(stub, Arc::new(MetricScorer::lexical()), &settings);

    let rows = harness.run(&settings.models, &builtin_examples()).await;
    let summary = summarize(&rows);

    let dir = tempfile::tempdir().unwrap();
    let files = write_csvs(&rows, &summary, dir.path()).unwrap();

    let detail = std::fs::read_to_string(files.detail).unwrap();
    let mut lines = detail.lines();
    assert!(lines.next().unwrap().ends_with(",bertscore_f1"));
    for line in lines {
        assert!(line.ends_with(",0.0000"), "unexpected row: {line}");
    }
    let summary_csv = std::fs::read_to_string(files.summary).unwrap();
    for line in summary_csv.lines().skip(1) {
        assert!(line.ends_with(",0.0000"), "unexpected row: {line}");
    }
}

#[tokio::test]
async fn test_semantic_scores_flow_into_rows() {
    let stub = Arc::new(StubLlm::fixed(BEETHOVEN_SENTENCE));
    let settings = settings("gpt-4o", 1, None);
    let scorer = MetricScorer::new(Some(Arc::new(ConstantSemantic(0.75))));
    let harness = Harness::new(stub, Arc::new(scorer), &settings);

    let rows = harness.run(&settings.models, &[beethoven()]).await;
    assert!(rows.iter().all(|r| (r.scores.semantic_f1 - 0.75).abs() < 1e-12));
}

#[tokio::test]
async fn test_concurrent_run_matches_sequential_order() {
    let answer = |model: &str, user: &str| {
        let query = user
            .lines()
            .find_map(|l| l.strip_prefix("Question: "))
            .unwrap_or_default();
        format!("{model} says the answer to {query} is in the context")
    };
    let examples = builtin_examples();

    let sequential_stub = Arc::new(StubLlm::new("One line synthesis about the evidence.", answer));
    let sequential = settings("model-a,model-b,model-c", 1, None);
    let rows_sequential = Harness::new(sequential_stub, Arc::new(MetricScorer::lexical()), &sequential)
        .run(&sequential.models, &examples)
        .await;

    let concurrent_stub = Arc::new(StubLlm::new("One line synthesis about the evidence.", answer).with_jitter());
    let concurrent = settings("model-a,model-b,model-c", 6, None);
    let rows_concurrent = Harness::new(concurrent_stub, Arc::new(MetricScorer::lexical()), &concurrent)
        .run(&concurrent.models, &examples)
        .await;

    assert_eq!(rows_sequential.len(), 3 * examples.len() * 2);
    assert_eq!(rows_sequential, rows_concurrent);

    let keys: Vec<(String, usize, Mode)> = rows_concurrent
        .iter()
        .map(|r| (r.model.clone(), r.example_index, r.mode))
        .collect();
    assert_eq!(keys[0], ("model-a".to_string(), 0, Mode::Concat));
    assert_eq!(keys[1], ("model-a".to_string(), 0, Mode::Fluent));
    assert_eq!(keys[2], ("model-a".to_string(), 1, Mode::Concat));
    assert_eq!(keys.last().unwrap().0, "model-c");

    let summary = summarize(&rows_concurrent);
    let order: Vec<&str> = summary.iter().map(|s| s.model.as_str()).collect();
    assert_eq!(order, vec!["model-a", "model-a", "model-b", "model-b", "model-c", "model-c"]);
}

#[tokio::test]
async fn test_fixed_summarizer_synthesizes_every_context() {
    let stub = Arc::new(StubLlm::fixed(BEETHOVEN_SENTENCE));
    let settings = settings("model-a,model-b", 3, Some("summarizer-x"));
    let harness = Harness::new(stub.clone(), Arc::new(MetricScorer::lexical()), &settings);
    let examples = builtin_examples();

    let rows = harness.run(&settings.models, &examples).await;
    assert!(rows.iter().all(|r| r.model == "model-a" || r.model == "model-b"));

    let calls = stub.calls();
    let synthesis: Vec<&Call> = calls.iter().filter(|c| c.synthesis).collect();
    assert_eq!(synthesis.len(), 2 * examples.len());
    assert!(synthesis.iter().all(|c| c.model == "summarizer-x"));
    assert!(calls
        .iter()
        .filter(|c| !c.synthesis)
        .all(|c| c.model == "model-a" || c.model == "model-b"));
}

#[tokio::test]
async fn test_error_sentinel_answers_are_scored() {
    let sentinel = "[ERROR: Reqwest: error sending request for url]";
    let stub = Arc::new(StubLlm::fixed(sentinel));
    let settings = settings("gpt-4o", 2, None);
    let harness = Harness::new(stub, Arc::new(MetricScorer::lexical()), &settings);

    let rows = harness.run(&settings.models, &builtin_examples()).await;
    assert_eq!(rows.len(), 10);
    for row in &rows {
        assert!(llm::is_error_sentinel(&row.answer));
        assert!(in_unit(row.scores.rouge1));
        assert!(in_unit(row.scores.bleu));
    }
}

#[tokio::test]
async fn test_concurrency_one_issues_calls_in_turn() {
    let stub = Arc::new(StubLlm::fixed(BEETHOVEN_SENTENCE).with_jitter());
    let settings = settings("model-a,model-b", 1, None);
    let harness = Harness::new(stub.clone(), Arc::new(MetricScorer::lexical()), &settings);
    let examples = builtin_examples();

    harness.run(&settings.models, &examples).await;
    assert_eq!(stub.peak_in_flight(), 1);

    // concat answer, then synthesis, then fluent answer, for every pair
    let calls = stub.calls();
    assert_eq!(calls.len(), 2 * examples.len() * 3);
    for unit in calls.chunks(3) {
        assert!(!unit[0].synthesis && unit[0].user.contains("\"\"\"["));
        assert!(unit[1].synthesis);
        assert!(!unit[2].synthesis && unit[2].user.contains(BEETHOVEN_SENTENCE));
    }
}

#[tokio::test]
async fn test_higher_concurrency_overlaps_calls() {
    let stub = Arc::new(StubLlm::fixed(BEETHOVEN_SENTENCE).with_jitter());
    let settings = settings("model-a,model-b", 4, None);
    let harness = Harness::new(stub.clone(), Arc::new(MetricScorer::lexical()), &settings);

    let rows = harness.run(&settings.models, &builtin_examples()).await;
    assert_eq!(rows.len(), 20);
    assert!(stub.peak_in_flight() > 1);
}
