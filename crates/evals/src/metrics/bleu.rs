//! Sentence-level BLEU, sacreBLEU compatible
//!
//! 13a tokenization, n-grams up to order 4, clipped counts against the
//! maximum count across all references, closest-reference brevity penalty,
//! `exp` smoothing with effective order. A hypothesis with no matching
//! n-gram of any order scores 0. Scaled to [0, 1].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

const MAX_ORDER: usize = 4;

/// Stand-in for log(0) so a zero precision drags the geometric mean to ~0
const LOG_ZERO: f64 = -9_999_999_999.0;

static PUNCT_SYMBOLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\{-~\[-` -&\(-\+:-@/])").expect("static regex")
});
static PERIOD_COMMA_AFTER_NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^0-9])([\.,])").expect("static regex"));
static PERIOD_COMMA_BEFORE_NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\.,])([^0-9])").expect("static regex"));
static DASH_AFTER_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])(-)").expect("static regex"));

/// The mteval-v13a tokenizer
pub fn tokenize_13a(line: &str) -> Vec<String> {
    let mut line = line
        .replace("<skipped>", "")
        .replace("-\n", "")
        .replace('\n', " ");

    if line.contains('&') {
        line = line
            .replace("&quot;", "\"")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
    }

    let line = format!(" {line} ");
    let line = PUNCT_SYMBOLS.replace_all(&line, " $1 ");
    let line = PERIOD_COMMA_AFTER_NON_DIGIT.replace_all(&line, "$1 $2 ");
    let line = PERIOD_COMMA_BEFORE_NON_DIGIT.replace_all(&line, " $1 $2");
    let line = DASH_AFTER_DIGIT.replace_all(&line, "$1 $2 ");

    line.split_whitespace().map(String::from).collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Reference length closest to the hypothesis length; ties go to the shorter one
fn closest_ref_len(hyp_len: usize, ref_lens: &[usize]) -> usize {
    ref_lens
        .iter()
        .copied()
        .min_by_key(|&len| (hyp_len.abs_diff(len), len))
        .unwrap_or(0)
}

/// BLEU of `hypothesis` against all `references` jointly, in [0, 1]
pub fn sentence_bleu(hypothesis: &str, references: &[String]) -> f64 {
    let hyp = tokenize_13a(hypothesis);
    let refs: Vec<Vec<String>> = references.iter().map(|r| tokenize_13a(r)).collect();

    if hyp.is_empty() || refs.is_empty() {
        return 0.0;
    }

    let ref_lens: Vec<usize> = refs.iter().map(Vec::len).collect();
    let ref_len = closest_ref_len(hyp.len(), &ref_lens);

    let mut correct = [0usize; MAX_ORDER];
    let mut total = [0usize; MAX_ORDER];

    for n in 1..=MAX_ORDER {
        let mut max_ref_counts: HashMap<&[String], usize> = HashMap::new();
        for r in &refs {
            for (gram, count) in ngram_counts(r, n) {
                let slot = max_ref_counts.entry(gram).or_insert(0);
                *slot = (*slot).max(count);
            }
        }

        for (gram, count) in ngram_counts(&hyp, n) {
            let clip = max_ref_counts.get(gram).copied().unwrap_or(0);
            correct[n - 1] += count.min(clip);
            total[n - 1] += count;
        }
    }

    if correct.iter().all(|&c| c == 0) {
        return 0.0;
    }

    let score = compute_bleu(&correct, &total, hyp.len(), ref_len);
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn compute_bleu(correct: &[usize], total: &[usize], hyp_len: usize, ref_len: usize) -> f64 {
    let mut precisions = [0.0f64; MAX_ORDER];
    let mut smooth = 1.0;
    let mut effective_order = MAX_ORDER;

    for n in 1..=MAX_ORDER {
        if total[n - 1] == 0 {
            break;
        }
        effective_order = n;
        precisions[n - 1] = if correct[n - 1] == 0 {
            smooth *= 2.0;
            1.0 / (smooth * total[n - 1] as f64)
        } else {
            correct[n - 1] as f64 / total[n - 1] as f64
        };
    }

    let brevity_penalty = if hyp_len < ref_len {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    } else {
        1.0
    };

    let log_sum: f64 = precisions[..effective_order]
        .iter()
        .map(|&p| if p > 0.0 { p.ln() } else { LOG_ZERO })
        .sum();

    brevity_penalty * (log_sum / effective_order as f64).exp()
}
