//! Markdown rendering of the daily digest. Pure and deterministic.

use chrono::NaiveDate;

use super::traits::Renderer;
use crate::models::Summary;

/// Stateless renderer over [`render_markdown_digest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, run_date: NaiveDate, summaries: &[Summary]) -> String {
        render_markdown_digest(run_date, summaries)
    }
}

pub fn render_markdown_digest(run_date: NaiveDate, summaries: &[Summary]) -> String {
    let mut lines: Vec<String> = vec![
        format!("# Daily Paper Summary - {}", run_date.format("%m%d, %Y")),
        String::new(),
    ];

    for (idx, summary) in summaries.iter().enumerate() {
        lines.push(format!("## Paper {}: [{}]({})", idx + 1, summary.title, summary.link));
        lines.push(String::new());

        lines.push("### Paper Information".into());
        lines.push(format!("- **Authors**: {}", summary.authors.join("; ")));
        lines.push(format!("- **Affiliations**: {}", join_or_na(&summary.affiliations)));
        lines.push(format!("- **arXiv Link**: [{0}]({0})", summary.link));
        lines.push(format!("- **PDF Link**: [{0}]({0})", summary.pdf_url));
        lines.push(format!("- **Code Repository**: {}", join_or_na(&summary.code_urls)));
        lines.push(format!("- **Relevance Score**: {:.1}", summary.relevance_score));
        lines.push(format!("- **Relevance Reason**: {}", summary.relevance_reason));
        lines.push(String::new());

        for (heading, body) in [
            ("Problem Addressed", &summary.problem),
            ("Approach", &summary.approach),
            ("Methodological Novelty", &summary.methodological_novelty),
            ("Empirical Novelty", &summary.empirical_novelty),
        ] {
            lines.push(format!("### {heading}"));
            lines.push(body.clone());
            lines.push(String::new());
        }

        lines.push("### Summary for Communication".into());
        lines.extend(summary.talk_track.iter().map(|line| format!("- {line}")));
        lines.push(String::new());
    }

    let mut text = lines.join("\n").trim().to_string();
    text.push('\n');
    text
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join("; ")
    }
}
