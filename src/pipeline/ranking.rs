//! Relevance ranking with a model-backed strategy and a deterministic
//! heuristic fallback. The strategy is fixed at construction from the
//! availability of an enabled LLM client.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::traits::Ranker;
use super::types::RankedCandidate;
use crate::llm::{LlmClient, LlmError};
use crate::models::Candidate;

const RANK_TEMPERATURE: f32 = 0.1;

/// Research profile the ranker scores against.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingProfile {
    pub research_field: String,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
}

enum Strategy {
    Model {
        client: Arc<dyn LlmClient>,
        model_name: String,
        system_prompt: String,
    },
    Heuristic,
}

pub struct RelevanceRanker {
    profile: RankingProfile,
    strategy: Strategy,
}

impl RelevanceRanker {
    /// Model-backed when `client` is present and enabled, heuristic otherwise.
    pub fn new(
        profile: RankingProfile,
        client: Option<Arc<dyn LlmClient>>,
        model_name: &str,
        system_prompt: &str,
    ) -> Self {
        let strategy = match client {
            Some(client) if client.enabled() => Strategy::Model {
                client,
                model_name: model_name.to_string(),
                system_prompt: system_prompt.to_string(),
            },
            _ => Strategy::Heuristic,
        };
        Self { profile, strategy }
    }

    pub fn heuristic(profile: RankingProfile) -> Self {
        Self {
            profile,
            strategy: Strategy::Heuristic,
        }
    }

    pub fn uses_model(&self) -> bool {
        matches!(self.strategy, Strategy::Model { .. })
    }

    fn rank_with_model(
        &self,
        client: &dyn LlmClient,
        model_name: &str,
        system_prompt: &str,
        candidates: &[Candidate],
    ) -> Result<Vec<RankedCandidate>, LlmError> {
        let prompt = build_rank_prompt(&self.profile, candidates);
        let output = client.chat_json(model_name, system_prompt, &prompt, RANK_TEMPERATURE)?;
        let scored = parse_scores(&output)?;

        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .filter_map(|candidate| {
                scored.get(&candidate.external_id).map(|(score, reason)| RankedCandidate {
                    candidate: candidate.clone(),
                    score: *score,
                    reason: reason.clone(),
                })
            })
            .collect();

        sort_descending(&mut ranked);
        Ok(ranked)
    }
}

impl Ranker for RelevanceRanker {
    fn rank(&self, candidates: &[Candidate]) -> Vec<RankedCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        if let Strategy::Model {
            client,
            model_name,
            system_prompt,
        } = &self.strategy
        {
            match self.rank_with_model(client.as_ref(), model_name, system_prompt, candidates) {
                Ok(ranked) if !ranked.is_empty() => return ranked,
                Ok(_) => {
                    tracing::warn!("Model ranking scored no candidates, using heuristic ranking");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Model ranking failed, using heuristic ranking");
                }
            }
        }

        heuristic_rank(candidates, &self.profile)
    }
}

fn build_rank_prompt(profile: &RankingProfile, candidates: &[Candidate]) -> String {
    let payload: Vec<Value> = candidates
        .iter()
        .map(|c| {
            json!({
                "external_id": c.external_id,
                "title": c.title,
                "abstract": c.abstract_text,
                "categories": c.categories,
            })
        })
        .collect();

    format!(
        "Research field:\n{}\n\n\
         Include keywords:\n{:?}\n\n\
         Exclude keywords:\n{:?}\n\n\
         Score each paper from 0-100 and return JSON with key 'items', each item has \
         external_id, relevance_score, relevance_reason.\n\
         Candidates JSON:\n{}",
        profile.research_field,
        profile.include_keywords,
        profile.exclude_keywords,
        Value::Array(payload),
    )
}

/// `external_id -> (score, reason)` from the model's `items` array.
/// Items without an id or a numeric score are ignored.
fn parse_scores(output: &Value) -> Result<HashMap<String, (f64, String)>, LlmError> {
    let items = output
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::MalformedResponse("Missing 'items' array".into()))?;

    let mut scored = HashMap::new();
    for item in items {
        let Some(id) = item.get("external_id").and_then(Value::as_str) else {
            continue;
        };
        let score = match item.get("relevance_score") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(score) = score else {
            continue;
        };
        let reason = match item.get("relevance_reason") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        scored.insert(id.to_string(), (score, reason));
    }
    Ok(scored)
}

/// Stable sort, highest score first; equal scores keep input order.
fn sort_descending(ranked: &mut [RankedCandidate]) {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Deterministic keyword scoring:
/// `clamp(40 + 10*include + 3*field - 15*exclude + 5 if any "cs." category, 0, 100)`.
/// Hits are case-insensitive substring matches against title + abstract;
/// field tokens are research-field words longer than two characters.
pub fn heuristic_rank(candidates: &[Candidate], profile: &RankingProfile) -> Vec<RankedCandidate> {
    let include: Vec<String> = profile.include_keywords.iter().map(|k| k.to_lowercase()).collect();
    let exclude: Vec<String> = profile.exclude_keywords.iter().map(|k| k.to_lowercase()).collect();
    let field_lower = profile.research_field.to_lowercase();
    let field_tokens: Vec<&str> = field_lower
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .collect();

    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| {
            let joined = format!("{} {}", candidate.title, candidate.abstract_text).to_lowercase();

            let include_hits = include.iter().filter(|kw| joined.contains(kw.as_str())).count();
            let field_hits = field_tokens.iter().filter(|t| joined.contains(*t)).count();
            let exclude_hits = exclude.iter().filter(|kw| joined.contains(kw.as_str())).count();
            let category_bonus = if candidate.categories.iter().any(|c| c.starts_with("cs.")) {
                5.0
            } else {
                0.0
            };

            let raw = 40.0 + 10.0 * include_hits as f64 + 3.0 * field_hits as f64
                - 15.0 * exclude_hits as f64
                + category_bonus;

            RankedCandidate {
                candidate: candidate.clone(),
                score: raw.clamp(0.0, 100.0),
                reason: format!(
                    "Heuristic rank: include_hits={include_hits}, field_hits={field_hits}, exclude_hits={exclude_hits}."
                ),
            }
        })
        .collect();

    sort_descending(&mut ranked);
    ranked
}
