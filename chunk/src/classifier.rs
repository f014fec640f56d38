//! Two-stage chunk classification: a heuristic keyword prior, optionally
//! refined by an LLM for the legally costly kinds.

use guardrail_core::domain::ChunkKind;
use guardrail_core::llm::LlmProvider;

use crate::chunker::RawChunk;
use crate::heading::KEYWORD_HEADERS;

const EXCLUSION_CUES: &[&str] = &[
    "not covered",
    "excluded",
    "does not cover",
    "we do not insure",
    "following are not included",
    "except",
    "no coverage for",
];

const INCLUSION_CUES: &[&str] = &["we will pay", "coverage includes", "is covered", "benefits include"];

const DEFINITION_CUES: &[&str] = &["means", "defined as", "refers to"];

const LIMITATION_CUES: &[&str] = &["up to", "maximum", "cap", "deductible", "limit"];

const PROCEDURE_CUES: &[&str] = &["must", "required to", "notify", "within"];

/// A chunk that has been assigned a [`ChunkKind`], still missing an
/// embedding, policy id, and position.
#[derive(Debug, Clone)]
pub struct ClassifiedChunk {
    /// The chunk's text.
    pub text: String,
    /// The assigned semantic kind.
    pub kind: ChunkKind,
    /// 1-based page number.
    pub page_number: u32,
    /// Nearest section heading, if any.
    pub section_title: Option<String>,
}

/// Whether and how an LLM should refine the heuristic prior.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Enables stage-2 LLM refinement for `EXCLUSION`/`INCLUSION`/
    /// `LIMITATION` priors. Disabled deployments rely on the heuristic
    /// prior alone.
    pub llm_refinement: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { llm_refinement: false }
    }
}

fn heuristic_kind(text: &str) -> Option<ChunkKind> {
    let lower = text.to_lowercase();
    if EXCLUSION_CUES.iter().any(|cue| lower.contains(cue)) {
        Some(ChunkKind::Exclusion)
    } else if INCLUSION_CUES.iter().any(|cue| lower.contains(cue)) {
        Some(ChunkKind::Inclusion)
    } else if DEFINITION_CUES.iter().any(|cue| lower.contains(cue)) {
        Some(ChunkKind::Definition)
    } else if LIMITATION_CUES.iter().any(|cue| lower.contains(cue)) {
        Some(ChunkKind::Limitation)
    } else if PROCEDURE_CUES.iter().any(|cue| lower.contains(cue)) {
        Some(ChunkKind::Procedure)
    } else {
        None
    }
}

fn section_kind(section_title: Option<&str>) -> Option<ChunkKind> {
    let title = section_title?.to_uppercase();
    let title = title.trim();
    if !KEYWORD_HEADERS.iter().any(|kw| title.contains(kw)) {
        return None;
    }
    if title.contains("EXCLUSION") {
        Some(ChunkKind::Exclusion)
    } else if title.contains("COVERAGE") {
        Some(ChunkKind::Inclusion)
    } else if title.contains("DEFINITION") {
        Some(ChunkKind::Definition)
    } else if title.contains("LIMITATION") {
        Some(ChunkKind::Limitation)
    } else if title.contains("OBLIGATION") {
        Some(ChunkKind::Procedure)
    } else {
        None
    }
}

/// The heuristic prior for one chunk: cue-word match first, falling back
/// to the chunk's section heading, and finally [`ChunkKind::General`].
#[must_use]
pub fn heuristic_prior(raw: &RawChunk) -> ChunkKind {
    heuristic_kind(&raw.text)
        .or_else(|| section_kind(raw.section_title.as_deref()))
        .unwrap_or(ChunkKind::General)
}

/// Only these priors are worth the cost of an LLM refinement call: they
/// are the legally costly kinds per `spec` §4.2.
fn is_refinable(kind: ChunkKind) -> bool {
    matches!(kind, ChunkKind::Exclusion | ChunkKind::Inclusion | ChunkKind::Limitation)
}

/// Classifies a batch of raw chunks, refining the heuristic prior with an
/// LLM call when `config.llm_refinement` is set and the prior is one of
/// the legally costly three kinds.
///
/// An LLM answer that the provider itself could not produce in a
/// conforming shape (surfaced as `ProviderError::InvalidResponse`) is
/// logged and discarded — the heuristic prior wins, per `spec` §4.2's
/// prior-override model.
pub async fn classify_chunks<L: LlmProvider>(
    raw: Vec<RawChunk>,
    llm: Option<&L>,
    config: &ClassifierConfig,
) -> Vec<ClassifiedChunk> {
    let mut out = Vec::with_capacity(raw.len());
    for chunk in raw {
        let prior = heuristic_prior(&chunk);
        let kind = if config.llm_refinement && is_refinable(prior) {
            match llm {
                Some(provider) => {
                    match provider
                        .classify_chunk(&chunk.text, chunk.section_title.as_deref())
                        .await
                    {
                        Ok(refined) => refined,
                        Err(err) => {
                            tracing::warn!(%err, "llm classification refinement discarded, heuristic prior wins");
                            prior
                        }
                    }
                }
                None => prior,
            }
        } else {
            prior
        };

        out.push(ClassifiedChunk {
            text: chunk.text,
            kind,
            page_number: chunk.page_number,
            section_title: chunk.section_title,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, section: Option<&str>) -> RawChunk {
        RawChunk {
            text: text.to_string(),
            page_number: 1,
            section_title: section.map(str::to_string),
        }
    }

    #[test]
    fn exclusion_cue_wins() {
        let chunk = raw("Flood damage is not covered under this policy.", None);
        assert_eq!(heuristic_prior(&chunk), ChunkKind::Exclusion);
    }

    #[test]
    fn inclusion_cue_detected() {
        let chunk = raw("We will pay for water damage up to the limit.", None);
        // "up to" is also a limitation cue but exclusion/inclusion take
        // priority order ahead of limitation in the scan.
        assert_eq!(heuristic_prior(&chunk), ChunkKind::Inclusion);
    }

    #[test]
    fn section_context_wins_without_cue_words() {
        let chunk = raw("Pre-existing conditions arising from prior injury.", Some("EXCLUSIONS"));
        assert_eq!(heuristic_prior(&chunk), ChunkKind::Exclusion);
    }

    #[test]
    fn no_cue_no_section_is_general() {
        let chunk = raw("This policy is issued by Example Insurance Co.", None);
        assert_eq!(heuristic_prior(&chunk), ChunkKind::General);
    }

    #[tokio::test]
    async fn llm_refinement_agrees_with_prior_when_enabled() {
        let chunks = vec![raw("Flood damage is excluded from this policy.", None)];
        let llm = guardrail_core::mock::MockLlmProvider;
        let config = ClassifierConfig { llm_refinement: true };
        let classified = classify_chunks(chunks, Some(&llm), &config).await;
        assert_eq!(classified[0].kind, ChunkKind::Exclusion);
    }

    #[tokio::test]
    async fn refinement_disabled_keeps_prior() {
        let chunks = vec![raw("Flood damage is not covered by this policy.", None)];
        let config = ClassifierConfig { llm_refinement: false };
        let classified =
            classify_chunks::<guardrail_core::mock::MockLlmProvider>(chunks, None, &config).await;
        assert_eq!(classified[0].kind, ChunkKind::Exclusion);
    }
}
