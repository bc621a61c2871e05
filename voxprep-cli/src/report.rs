//! Markdown rendering for batch evaluation results.

use std::fmt::Write;

use voxprep_core::RankedSummary;

/// Model-selection summary: one row per model, ranked by mean score.
pub fn render_summary(summary: &RankedSummary) -> String {
    let mut out = String::new();
    out.push_str("# Model selection summary\n\n");
    out.push_str("| Model | Samples | Mean score | Verdict |\n");
    out.push_str("| :--- | :---: | :---: | :--- |\n");
    for model in &summary.models {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2} | {} |",
            model.model, model.samples, model.mean_score, model.verdict
        );
    }
    let _ = writeln!(
        out,
        "\n{} file(s) evaluated, {} failed.",
        summary.evaluated, summary.failed
    );
    out
}

/// Per-file detail table, ranked by score.
pub fn render_details(summary: &RankedSummary) -> String {
    let mut out = String::new();
    out.push_str("# Detailed metrics\n\n");
    out.push_str("| File | Model | Score | RMS | LoRA |\n");
    out.push_str("| :--- | :--- | :---: | :---: | :---: |\n");
    for row in &summary.details {
        let _ = writeln!(
            out,
            "| {} | {} | {:.1} | {:.4} | {} |",
            row.file,
            row.model,
            row.score,
            row.rms,
            if row.lora_recommended { "yes" } else { "-" }
        );
    }
    out
}
