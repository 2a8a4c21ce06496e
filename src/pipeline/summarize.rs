//! Paper summarization: model-backed when an enabled LLM client is
//! available, deterministic abstract-based fallback otherwise.

use std::sync::Arc;

use serde_json::{json, Value};

use super::traits::Summarizer;
use crate::llm::{LlmClient, LlmError};
use crate::models::{Candidate, Summary};

const SUMMARY_TEMPERATURE: f32 = 0.2;
const FALLBACK_ABSTRACT_CHARS: usize = 380;
const MIN_TALK_TRACK: usize = 4;
const MAX_TALK_TRACK: usize = 5;

const FIRST_FILLER: &str = "This paper is relevant for current research workflow.";
const REPEAT_FILLER: &str = "It can be explained clearly with objective, method, and evidence.";

pub struct PaperSummarizer {
    client: Option<Arc<dyn LlmClient>>,
    model_name: String,
    system_prompt: String,
    research_field: String,
}

impl PaperSummarizer {
    /// A disabled or absent client means every summary uses the fallback.
    pub fn new(
        client: Option<Arc<dyn LlmClient>>,
        model_name: &str,
        system_prompt: &str,
        research_field: &str,
    ) -> Self {
        Self {
            client: client.filter(|c| c.enabled()),
            model_name: model_name.to_string(),
            system_prompt: system_prompt.to_string(),
            research_field: research_field.to_string(),
        }
    }

    pub fn uses_model(&self) -> bool {
        self.client.is_some()
    }

    fn summarize_with_model(
        &self,
        client: &dyn LlmClient,
        candidate: &Candidate,
    ) -> Result<Value, LlmError> {
        let payload = json!({
            "external_id": candidate.external_id,
            "title": candidate.title,
            "abstract": candidate.abstract_text,
            "authors": candidate.authors,
            "affiliations": candidate.affiliations,
            "arxiv_url": candidate.link,
            "code_urls": candidate.code_urls,
        });
        let prompt = format!(
            "Summarize this paper in English and return JSON only with keys: \
             title, authors, affiliations, code_urls, problem, approach, \
             methodological_novelty, empirical_novelty, tell_someone_in_4_5_sentences.\n\n\
             Paper JSON:\n{payload}"
        );

        let output = client.chat_json(&self.model_name, &self.system_prompt, &prompt, SUMMARY_TEMPERATURE)?;
        match output.as_object() {
            Some(map) if !map.is_empty() => Ok(output),
            _ => Err(LlmError::MalformedResponse("Empty summary object".into())),
        }
    }

    fn fallback_summary(&self, candidate: &Candidate, score: f64, reason: &str) -> Summary {
        let abstract_text = candidate.abstract_text.split_whitespace().collect::<Vec<_>>().join(" ");
        let short = truncate_chars(&abstract_text, FALLBACK_ABSTRACT_CHARS);

        Summary {
            external_id: candidate.external_id.clone(),
            source: candidate.source,
            title: candidate.title.clone(),
            authors: candidate.authors.clone(),
            affiliations: candidate.affiliations.clone(),
            link: candidate.link.clone(),
            pdf_url: candidate.pdf_url.clone(),
            code_urls: candidate.code_urls.clone(),
            problem: "Derived from abstract in fallback mode.".into(),
            approach: short.clone(),
            methodological_novelty: "Fallback mode: infer novelty from abstract wording.".into(),
            empirical_novelty: "Fallback mode: infer empirical evidence from abstract wording."
                .into(),
            talk_track: vec![
                format!("This paper targets: {}.", candidate.title),
                format!("It focuses on {} modeling challenges.", self.research_field),
                format!("Core approach is summarized from abstract: {short}"),
                "The key contribution is judged from method and experiments in the abstract."
                    .into(),
            ],
            relevance_score: score,
            relevance_reason: reason.to_string(),
        }
    }
}

impl Summarizer for PaperSummarizer {
    fn summarize(&self, candidate: &Candidate, score: f64, reason: &str) -> Summary {
        if let Some(client) = &self.client {
            match self.summarize_with_model(client.as_ref(), candidate) {
                Ok(output) => return summary_from_model(&output, candidate, score, reason),
                Err(e) => {
                    tracing::warn!(
                        external_id = %candidate.external_id,
                        error = %e,
                        "Model summary failed, using fallback summary"
                    );
                }
            }
        }
        self.fallback_summary(candidate, score, reason)
    }
}

/// Missing bibliographic fields come from the candidate, missing prose is empty.
fn summary_from_model(output: &Value, candidate: &Candidate, score: f64, reason: &str) -> Summary {
    let text = |key: &str| output.get(key).and_then(Value::as_str).map(str::to_string);
    let list = |key: &str| -> Option<Vec<String>> {
        output.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    };

    let talk_track = match output.get("tell_someone_in_4_5_sentences") {
        Some(Value::Array(_)) => list("tell_someone_in_4_5_sentences").unwrap_or_default(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    };

    Summary {
        external_id: candidate.external_id.clone(),
        source: candidate.source,
        title: text("title").unwrap_or_else(|| candidate.title.clone()),
        authors: list("authors").unwrap_or_else(|| candidate.authors.clone()),
        affiliations: list("affiliations").unwrap_or_else(|| candidate.affiliations.clone()),
        link: candidate.link.clone(),
        pdf_url: candidate.pdf_url.clone(),
        code_urls: list("code_urls").unwrap_or_else(|| candidate.code_urls.clone()),
        problem: text("problem").unwrap_or_default(),
        approach: text("approach").unwrap_or_default(),
        methodological_novelty: text("methodological_novelty").unwrap_or_default(),
        empirical_novelty: text("empirical_novelty").unwrap_or_default(),
        talk_track: normalize_talk_track(talk_track),
        relevance_score: score,
        relevance_reason: reason.to_string(),
    }
}

/// Trim and drop empty lines, pad with filler sentences up to four lines,
/// cap at five.
pub fn normalize_talk_track(items: Vec<String>) -> Vec<String> {
    let mut lines: Vec<String> = items
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < MIN_TALK_TRACK {
        lines.push(FIRST_FILLER.to_string());
        while lines.len() < MIN_TALK_TRACK {
            lines.push(REPEAT_FILLER.to_string());
        }
    }
    lines.truncate(MAX_TALK_TRACK);
    lines
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::models::SourceKind;
    use chrono::{TimeZone, Utc};

    fn candidate(abstract_text: &str) -> Candidate {
        let at = Utc.with_ymd_and_hms(2026, 2, 5, 0, 0, 0).unwrap();
        Candidate {
            source: SourceKind::Arxiv,
            external_id: "2602.01234v1".into(),
            title: "Graph Learning for Traffic".into(),
            abstract_text: abstract_text.into(),
            authors: vec!["Alice".into(), "Bob".into()],
            affiliations: vec!["MIT".into()],
            published_at: at,
            updated_at: at,
            link: "http://arxiv.org/abs/2602.01234v1".into(),
            pdf_url: "http://arxiv.org/pdf/2602.01234v1".into(),
            code_urls: vec!["https://github.com/a/b".into()],
            categories: vec!["cs.LG".into()],
        }
    }

    fn summarizer(client: MockLlmClient) -> PaperSummarizer {
        PaperSummarizer::new(
            Some(Arc::new(client)),
            "glm-4.7",
            "You are an academic summarizer.",
            "traffic engineering",
        )
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn talk_track_padded_to_four_preserving_prefix() {
        let result = normalize_talk_track(lines(&["First.", "  Second.  "]));
        assert_eq!(result.len(), 4);
        assert_eq!(&result[..2], &["First.", "Second."]);
        assert_eq!(result[2], FIRST_FILLER);
        assert_eq!(result[3], REPEAT_FILLER);
    }

    #[test]
    fn talk_track_drops_blank_lines() {
        let result = normalize_talk_track(lines(&["", "  ", "Only."]));
        assert_eq!(result[0], "Only.");
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn talk_track_from_nothing_is_all_filler() {
        let result = normalize_talk_track(Vec::new());
        assert_eq!(result, vec![FIRST_FILLER, REPEAT_FILLER, REPEAT_FILLER, REPEAT_FILLER]);
    }

    #[test]
    fn talk_track_capped_at_five() {
        let result = normalize_talk_track(lines(&["1", "2", "3", "4", "5", "6", "7"]));
        assert_eq!(result, lines(&["1", "2", "3", "4", "5"]));

        let four = normalize_talk_track(lines(&["1", "2", "3", "4"]));
        assert_eq!(four, lines(&["1", "2", "3", "4"]));
    }

    #[test]
    fn talk_track_length_bounds_for_any_input_size() {
        for n in 0..9 {
            let input: Vec<String> = (0..n).map(|i| format!("line {i}")).collect();
            let result = normalize_talk_track(input.clone());
            assert!((4..=5).contains(&result.len()), "n={n} gave {}", result.len());
            let kept = n.min(5);
            assert_eq!(&result[..kept], &input[..kept]);
        }
    }

    #[test]
    fn model_summary_fills_missing_fields() {
        let reply = r#"{
            "title": "Graph Learning for Traffic (model title)",
            "problem": "Congestion forecasting.",
            "approach": "Spatio-temporal GNN.",
            "tell_someone_in_4_5_sentences": ["It predicts traffic.", "It uses graphs."]
        }"#;
        let summary = summarizer(MockLlmClient::new(reply)).summarize(&candidate("abs"), 88.0, "fits");

        assert_eq!(summary.title, "Graph Learning for Traffic (model title)");
        assert_eq!(summary.authors, vec!["Alice", "Bob"]);
        assert_eq!(summary.affiliations, vec!["MIT"]);
        assert_eq!(summary.code_urls, vec!["https://github.com/a/b"]);
        assert_eq!(summary.problem, "Congestion forecasting.");
        assert_eq!(summary.methodological_novelty, "");
        assert_eq!(summary.empirical_novelty, "");
        assert_eq!(summary.talk_track.len(), 4);
        assert_eq!(summary.talk_track[0], "It predicts traffic.");
        assert_eq!(summary.relevance_score, 88.0);
        assert_eq!(summary.relevance_reason, "fits");
        assert_eq!(summary.link, "http://arxiv.org/abs/2602.01234v1");
    }

    #[test]
    fn model_prompt_carries_paper_payload() {
        let client = Arc::new(MockLlmClient::new(r#"{"problem": "p"}"#));
        let summarizer = PaperSummarizer::new(
            Some(client.clone() as Arc<dyn LlmClient>),
            "m",
            "s",
            "traffic",
        );
        summarizer.summarize(&candidate("An abstract."), 50.0, "r");

        let prompt = &client.prompts()[0];
        assert!(prompt.starts_with("Summarize this paper in English and return JSON only"));
        assert!(prompt.contains("tell_someone_in_4_5_sentences"));
        assert!(prompt.contains("\"arxiv_url\":\"http://arxiv.org/abs/2602.01234v1\""));
        assert!(prompt.contains("\"abstract\":\"An abstract.\""));
    }

    #[test]
    fn model_failure_uses_fallback() {
        let summary = summarizer(MockLlmClient::failing()).summarize(&candidate("Short abstract."), 70.0, "r");
        assert_eq!(summary.problem, "Derived from abstract in fallback mode.");
        assert_eq!(summary.approach, "Short abstract.");
    }

    #[test]
    fn empty_model_object_uses_fallback() {
        let summary = summarizer(MockLlmClient::new("{}")).summarize(&candidate("x"), 1.0, "r");
        assert_eq!(summary.problem, "Derived from abstract in fallback mode.");
    }

    #[test]
    fn fallback_summary_text() {
        let plain = PaperSummarizer::new(None, "m", "s", "traffic engineering");
        assert!(!plain.uses_model());

        let summary = plain.summarize(&candidate("  A   compact\nabstract. "), 42.0, "heuristic");
        assert_eq!(summary.approach, "A compact abstract.");
        assert_eq!(
            summary.talk_track,
            vec![
                "This paper targets: Graph Learning for Traffic.",
                "It focuses on traffic engineering modeling challenges.",
                "Core approach is summarized from abstract: A compact abstract.",
                "The key contribution is judged from method and experiments in the abstract.",
            ]
        );
        assert_eq!(
            summary.methodological_novelty,
            "Fallback mode: infer novelty from abstract wording."
        );
        assert_eq!(
            summary.empirical_novelty,
            "Fallback mode: infer empirical evidence from abstract wording."
        );
        assert_eq!(summary.relevance_score, 42.0);
    }

    #[test]
    fn fallback_truncates_long_abstract() {
        let long = "é".repeat(400);
        let summary = PaperSummarizer::new(None, "m", "s", "x").summarize(&candidate(&long), 0.0, "");
        assert_eq!(summary.approach.chars().count(), 380 + 3);
        assert!(summary.approach.ends_with("..."));

        let exact = "a".repeat(380);
        let summary = PaperSummarizer::new(None, "m", "s", "x").summarize(&candidate(&exact), 0.0, "");
        assert_eq!(summary.approach, exact);
    }

    #[test]
    fn disabled_client_means_fallback_strategy() {
        assert!(!summarizer(MockLlmClient::disabled()).uses_model());
        assert!(summarizer(MockLlmClient::new("{}")).uses_model());
    }
}
