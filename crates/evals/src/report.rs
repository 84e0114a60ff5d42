//! Aggregation and result files
//!
//! Rows are grouped by (model, mode) in first-seen order and averaged
//! without weighting. Result tables are written as CSV with every number
//! fixed to four decimals.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::{Mode, ResultRow, Scores, SummaryRow};

pub const DETAIL_FILE: &str = "results_longform_fluent_vs_concat_detailed.csv";
pub const SUMMARY_FILE: &str = "results_longform_fluent_vs_concat_summary.csv";
pub const JSON_FILE: &str = "results_longform_fluent_vs_concat.json";

const DETAIL_HEADER: [&str; 8] = [
    "model",
    "mode",
    "query",
    "answer",
    "rouge1",
    "rougeL",
    "bleu",
    "bertscore_f1",
];

const SUMMARY_HEADER: [&str; 7] = [
    "model",
    "mode",
    "n_examples",
    "mean_rouge1",
    "mean_rougeL",
    "mean_bleu",
    "mean_bertscore_f1",
];

/// Mean metrics per (model, mode), groups in first-seen order
pub fn summarize(rows: &[ResultRow]) -> Vec<SummaryRow> {
    let mut order: Vec<(&str, Mode)> = Vec::new();
    let mut groups: HashMap<(&str, Mode), Vec<&ResultRow>> = HashMap::new();

    for row in rows {
        let key = (row.model.as_str(), row.mode);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let items = groups.remove(&key)?;
            let n = items.len() as f64;
            let mean = |f: fn(&Scores) -> f64| items.iter().map(|r| f(&r.scores)).sum::<f64>() / n;

            Some(SummaryRow {
                model: key.0.to_string(),
                mode: key.1,
                n_examples: items.len(),
                mean: Scores {
                    rouge1: mean(|s| s.rouge1),
                    rouge_l: mean(|s| s.rouge_l),
                    bleu: mean(|s| s.bleu),
                    semantic_f1: mean(|s| s.semantic_f1),
                },
                word_bounds_rate: items.iter().filter(|r| r.within_word_bounds).count() as f64 / n,
            })
        })
        .collect()
}

fn fixed4(value: f64) -> String {
    format!("{value:.4}")
}

/// Detail and summary CSVs written by [`write_csvs`]
#[derive(Debug, Clone)]
pub struct OutputFiles {
    pub detail: PathBuf,
    pub summary: PathBuf,
}

/// Write both result tables into `dir`, creating it if needed
pub fn write_csvs(rows: &[ResultRow], summaries: &[SummaryRow], dir: &Path) -> Result<OutputFiles> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let detail = dir.join(DETAIL_FILE);
    let mut writer = csv::Writer::from_path(&detail)
        .with_context(|| format!("Failed to create {}", detail.display()))?;
    writer.write_record(DETAIL_HEADER)?;
    for row in rows {
        writer.write_record([
            row.model.clone(),
            row.mode.to_string(),
            row.query.clone(),
            row.answer.clone(),
            fixed4(row.scores.rouge1),
            fixed4(row.scores.rouge_l),
            fixed4(row.scores.bleu),
            fixed4(row.scores.semantic_f1),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", detail.display()))?;

    let summary = dir.join(SUMMARY_FILE);
    let mut writer = csv::Writer::from_path(&summary)
        .with_context(|| format!("Failed to create {}", summary.display()))?;
    writer.write_record(SUMMARY_HEADER)?;
    for s in summaries {
        writer.write_record([
            s.model.clone(),
            s.mode.to_string(),
            s.n_examples.to_string(),
            fixed4(s.mean.rouge1),
            fixed4(s.mean.rouge_l),
            fixed4(s.mean.bleu),
            fixed4(s.mean.semantic_f1),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", summary.display()))?;

    Ok(OutputFiles { detail, summary })
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    rows: &'a [ResultRow],
    summaries: &'a [SummaryRow],
}

/// Save rows and summaries with exact values as pretty JSON
pub fn save_json(rows: &[ResultRow], summaries: &[SummaryRow], dir: &Path) -> Result<PathBuf> {
    let path = dir.join(JSON_FILE);
    let report = JsonReport {
        generated_at: chrono::Local::now().to_rfc3339(),
        rows,
        summaries,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// `base/YYYYmmdd-HHMMSS` for the current local time
pub fn timestamped_dir(base: &Path) -> PathBuf {
    base.join(chrono::Local::now().format("%Y%m%d-%H%M%S").to_string())
}

/// Print the summary table
pub fn print_summary(summaries: &[SummaryRow]) {
    println!("\n========== SUMMARY (mean metrics) ==========\n");
    println!(
        "{:>14} | {:>6} | {:>4} | {:>6} | {:>6} | {:>6} | {:>7} | {:>6}",
        "model", "mode", "N", "R1", "RL", "BLEU", "BERT-F1", "len-ok"
    );
    println!("{}", "-".repeat(80));
    for s in summaries {
        println!(
            "{:>14} | {:>6} | {:>4} | {:>6.4} | {:>6.4} | {:>6.4} | {:>7.4} | {:>5.1}%",
            s.model,
            s.mode,
            s.n_examples,
            s.mean.rouge1,
            s.mean.rouge_l,
            s.mean.bleu,
            s.mean.semantic_f1,
            s.word_bounds_rate * 100.0
        );
    }
    println!("\n============================================\n");
}
