//! Gemini client for edit-plan resolution.
//!
//! Sends clip metadata and the user's instruction to the Gemini
//! `generateContent` endpoint and converts the JSON-only reply into
//! validated-shape `EditOperation`s. The raw payload is loosely
//! typed on the wire; everything suspicious is rejected here rather
//! than passed downstream.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use liveedit_models::timestamp::parse_timestamp;
use liveedit_models::{EditOperation, EditPlan};

use crate::error::{PlannerError, PlannerResult};
use crate::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Per-clip metadata embedded in the prompt.
#[derive(Debug, Clone)]
pub struct ClipMeta {
    pub name: String,
    /// Probed duration; `None` renders as "unknown"
    pub duration_secs: Option<f64>,
}

/// Resolves an instruction plus clip metadata into an edit plan.
///
/// The pipeline depends on this trait so tests can substitute a
/// scripted resolver for the real service.
#[async_trait]
pub trait PlanResolver: Send + Sync {
    async fn resolve_plan(
        &self,
        instruction: &str,
        clips: &[ClipMeta],
    ) -> PlannerResult<EditPlan>;
}

/// Gemini API client.
pub struct GeminiPlanner {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    retry: RetryPolicy,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// The JSON shape the prompt demands from the model.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlan {
    order: Vec<i64>,
    cuts: Vec<RawCut>,
    transitions: Vec<RawTransition>,
    audio_cues: Vec<RawAudioCue>,
}

#[derive(Debug, Deserialize)]
struct RawCut {
    clip: i64,
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTransition {
    between: Vec<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawAudioCue {
    time: Option<String>,
    #[allow(dead_code)]
    description: Option<String>,
}

impl GeminiPlanner {
    /// Create a client from the environment (`GEMINI_API_KEY`,
    /// optional `GEMINI_MODEL`).
    pub fn from_env() -> PlannerResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| PlannerError::MissingApiKey)?;
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
            retry: RetryPolicy::new("gemini_resolve_plan"),
        }
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Compose a prompt that forces JSON-only output and bases the
    /// plan solely on the user's instructions.
    fn build_prompt(&self, instruction: &str, clips: &[ClipMeta]) -> String {
        let clip_block = clips
            .iter()
            .enumerate()
            .map(|(i, meta)| {
                let duration = meta
                    .duration_secs
                    .map(|d| format!("{:.1}", d))
                    .unwrap_or_else(|| "unknown".to_string());
                format!("clip {}: name={}, duration_sec={}", i, meta.name, duration)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are an expert video editor AI. Follow the user's instructions EXACTLY.

USER INSTRUCTIONS: {instruction}

Available clips (indexed from 0):
{clip_block}

Return ONLY valid JSON (no markdown, no explanation) in this exact format:
{{
  "order": [2,1,0],
  "cuts": [{{"clip":0,"start":"00:01","end":"00:05"}}],
  "transitions": [{{"between":[0,1],"type":"crossfade","duration":0.5}}],
  "audio_cues": [{{"time":"00:03","description":"fade in music"}}]
}}

CRITICAL RULES:
- "order" is the array of clip indices in desired playback order
- "cuts" trim clips; start/end are MM:SS clock strings
- Transition duration must match the user's request
- Keep cuts within each clip's actual duration
- Return ONLY the JSON object, nothing else"#
        )
    }

    /// One call to the generateContent endpoint, returning the model
    /// text.
    async fn call_api(&self, prompt: &str) -> PlannerResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::Api { status, body });
        }

        let gemini: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::parse_failed(format!("invalid response body: {}", e)))?;

        gemini
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or(PlannerError::EmptyResponse)
    }
}

#[async_trait]
impl PlanResolver for GeminiPlanner {
    async fn resolve_plan(
        &self,
        instruction: &str,
        clips: &[ClipMeta],
    ) -> PlannerResult<EditPlan> {
        let prompt = self.build_prompt(instruction, clips);

        let text = self
            .retry
            .run(|| self.call_api(&prompt))
            .await
            .map_err(|failure| {
                if failure.exhausted {
                    PlannerError::Exhausted {
                        attempts: failure.attempts,
                        last: Box::new(failure.error),
                    }
                } else {
                    failure.error
                }
            })?;

        let mut plan = parse_plan_text(&text)?;

        // The model sometimes invents clip indices; clean the order
        // here the way cut and transition indices are validated later.
        for op in &mut plan.operations {
            if let EditOperation::Reorder { order } = op {
                let before = order.len();
                order.retain(|&i| i < clips.len());
                if order.len() < before {
                    warn!(
                        dropped = before - order.len(),
                        "dropped out-of-range clip indices from order"
                    );
                }
            }
        }

        debug!(operations = plan.operations.len(), "resolved edit plan");
        Ok(plan)
    }
}

/// Extract and convert the model's JSON reply.
///
/// Strips markdown code fences and any prose around the outermost
/// JSON object before parsing, since models do not always honor the
/// JSON-only instruction.
pub fn parse_plan_text(text: &str) -> PlannerResult<EditPlan> {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);

    let start = text
        .find('{')
        .ok_or_else(|| PlannerError::parse_failed("no JSON object in response"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| PlannerError::parse_failed("unterminated JSON object in response"))?;
    if end < start {
        return Err(PlannerError::parse_failed("malformed JSON object in response"));
    }

    let raw: RawPlan = serde_json::from_str(&text[start..=end])
        .map_err(|e| PlannerError::parse_failed(format!("invalid plan JSON: {}", e)))?;

    raw_to_plan(raw)
}

fn raw_to_plan(raw: RawPlan) -> PlannerResult<EditPlan> {
    let mut operations = Vec::new();

    let order: Vec<usize> = raw
        .order
        .iter()
        .filter_map(|&i| {
            if i < 0 {
                warn!("dropping negative clip index {} from order", i);
                None
            } else {
                Some(i as usize)
            }
        })
        .collect();
    if !order.is_empty() {
        operations.push(EditOperation::Reorder { order });
    }

    for cut in raw.cuts {
        if cut.clip < 0 {
            return Err(PlannerError::parse_failed(format!(
                "negative clip index {} in cuts",
                cut.clip
            )));
        }
        let start = match &cut.start {
            Some(ts) => parse_timestamp(ts)
                .map_err(|e| PlannerError::parse_failed(format!("bad cut start: {}", e)))?,
            None => 0.0,
        };
        let end = cut
            .end
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(|e| PlannerError::parse_failed(format!("bad cut end: {}", e)))?;
        operations.push(EditOperation::Trim {
            clip_index: cut.clip as usize,
            start,
            end,
        });
    }

    for transition in raw.transitions {
        let is_crossfade = transition
            .kind
            .as_deref()
            .map(|k| k.eq_ignore_ascii_case("crossfade"))
            .unwrap_or(true);
        if !is_crossfade {
            warn!(
                "ignoring unsupported transition type {:?}",
                transition.kind
            );
            continue;
        }
        let [a, b] = match transition.between.as_slice() {
            [a, b] if *a >= 0 && *b >= 0 => [*a as usize, *b as usize],
            other => {
                return Err(PlannerError::parse_failed(format!(
                    "malformed transition pair {:?}",
                    other
                )));
            }
        };
        operations.push(EditOperation::Crossfade {
            between: [a, b],
            duration: transition.duration.unwrap_or(0.5),
        });
    }

    // Audio cues carry timing only; ducking stays whatever the
    // enqueue request asked for.
    if let Some(cue) = raw.audio_cues.iter().find(|c| c.time.is_some()) {
        let time = cue.time.as_deref().unwrap_or("0");
        let start = parse_timestamp(time)
            .map_err(|e| PlannerError::parse_failed(format!("bad audio cue time: {}", e)))?;
        operations.push(EditOperation::AudioOverlay {
            start,
            duck_db: 0.0,
        });
    }

    Ok(EditPlan { operations })
}
