//! Long-running profile → article generation with supersession.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use parley_core::{
    classify, ApiRequest, Classification, Credential, GenerationOutcome, GenerationPhase,
    GenerationRequest, ProfileSnapshot, RawFailure, RequestId, Topic, Transport,
};

use crate::error::SessionError;

/// Default deadline for one generation request. Generation is expensive.
pub const DEFAULT_GENERATION_DEADLINE: Duration = Duration::from_secs(360);

pub const DEFAULT_GENERATION_PATH: &str = "/api/v1/profile/analyze";

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub path: String,
    pub deadline: Duration,
    /// Attach the session credential as a bearer header.
    pub forward_credential: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_GENERATION_PATH.to_string(),
            deadline: DEFAULT_GENERATION_DEADLINE,
            forward_credential: false,
        }
    }
}

/// What a `submit` call did to the task's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReport {
    /// This request's outcome is now the current one.
    Applied(GenerationOutcome),
    /// A newer submission or a reset replaced this request; nothing was applied.
    Superseded,
}

/// Read-only view of a generation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSnapshot {
    pub phase: GenerationPhase,
    pub outcome: Option<GenerationOutcome>,
    pub request_id: Option<RequestId>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct ActiveRequest {
    request: GenerationRequest,
    outcome: GenerationOutcome,
}

#[derive(Debug, Default)]
struct GenerationState {
    active: Option<ActiveRequest>,
    last_profile: Option<ProfileSnapshot>,
    last_credential: Option<Credential>,
}

pub struct GenerationTask {
    transport: Arc<dyn Transport>,
    settings: GenerationSettings,
    state: Mutex<GenerationState>,
}

impl GenerationTask {
    pub fn new(transport: Arc<dyn Transport>, settings: GenerationSettings) -> Self {
        Self {
            transport,
            settings,
            state: Mutex::new(GenerationState::default()),
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Submit a profile. Allowed from any phase; a running request is
    /// cancelled and its eventual result ignored.
    pub async fn submit(
        &self,
        profile: ProfileSnapshot,
        credential: Option<&Credential>,
    ) -> Result<SubmitReport, SessionError> {
        let body = serde_json::to_value(&profile)?;
        let request = GenerationRequest::new(profile.clone());
        let (id, cancel) = (request.id, request.cancellation.clone());

        {
            let mut state = self.state.lock().await;
            if let Some(previous) = state.active.take() {
                if previous.outcome.is_pending() {
                    previous.request.cancellation.cancel();
                    info!(previous = %previous.request.id, next = %id, "Generation request superseded");
                }
            }
            state.active = Some(ActiveRequest {
                request,
                outcome: GenerationOutcome::Pending,
            });
            state.last_profile = Some(profile);
            state.last_credential = credential.cloned();
        }
        info!(request_id = %id, "Generation request submitted");

        let mut call = ApiRequest::post(&self.settings.path, body);
        if self.settings.forward_credential {
            if let Some(credential) = credential {
                call = call.with_bearer(credential.clone());
            }
        }

        let start = Instant::now();
        let result = self
            .transport
            .execute(&call, self.settings.deadline, &cancel)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let outcome = match result.and_then(parse_article) {
            Ok((article, topics)) => GenerationOutcome::Succeeded { article, topics },
            Err(failure) => match classify(&failure) {
                Classification::Failed(error) => GenerationOutcome::Failed(error),
                Classification::Superseded => {
                    debug!(request_id = %id, latency_ms, "Generation request cancelled");
                    return Ok(SubmitReport::Superseded);
                }
            },
        };

        let mut state = self.state.lock().await;
        let Some(active) = state.active.as_mut().filter(|a| a.request.id == id) else {
            debug!(request_id = %id, latency_ms, "Discarding late generation result");
            return Ok(SubmitReport::Superseded);
        };

        match &outcome {
            GenerationOutcome::Succeeded { article, topics } => info!(
                request_id = %id,
                latency_ms,
                article_chars = article.chars().count(),
                topics = topics.len(),
                "Generation succeeded"
            ),
            GenerationOutcome::Failed(error) => warn!(
                request_id = %id,
                latency_ms,
                kind = %error.kind(),
                detail = error.detail(),
                "Generation failed"
            ),
            GenerationOutcome::Pending => {}
        }
        active.outcome = outcome.clone();
        Ok(SubmitReport::Applied(outcome))
    }

    /// Return to `Idle`. A running request is cancelled and its result discarded.
    pub async fn reset(&self) -> GenerationPhase {
        let mut state = self.state.lock().await;
        if let Some(active) = state.active.take() {
            if active.outcome.is_pending() {
                active.request.cancellation.cancel();
                info!(request_id = %active.request.id, "Running generation request reset");
            }
        }
        GenerationPhase::Idle
    }

    /// Reset, then submit the most recently submitted profile again.
    pub async fn regenerate(&self) -> Result<SubmitReport, SessionError> {
        let (profile, credential) = {
            let state = self.state.lock().await;
            let profile = state
                .last_profile
                .clone()
                .ok_or(SessionError::NothingToRegenerate)?;
            (profile, state.last_credential.clone())
        };
        self.reset().await;
        self.submit(profile, credential.as_ref()).await
    }

    pub async fn snapshot(&self) -> GenerationSnapshot {
        let state = self.state.lock().await;
        match &state.active {
            Some(active) => GenerationSnapshot {
                phase: active.outcome.phase(),
                outcome: Some(active.outcome.clone()),
                request_id: Some(active.request.id),
                submitted_at: Some(active.request.submitted_at),
            },
            None => GenerationSnapshot {
                phase: GenerationPhase::Idle,
                outcome: None,
                request_id: None,
                submitted_at: None,
            },
        }
    }

    pub async fn phase(&self) -> GenerationPhase {
        self.snapshot().await.phase
    }

    pub async fn outcome(&self) -> Option<GenerationOutcome> {
        self.snapshot().await.outcome
    }

    pub async fn active_request_id(&self) -> Option<RequestId> {
        self.snapshot().await.request_id
    }
}

#[derive(Deserialize)]
struct ArticlePayload {
    article: Option<String>,
    topics: Option<Vec<Topic>>,
}

/// Extract `article` and `topics` from a generation response body.
pub fn parse_article(body: Value) -> Result<(String, Vec<Topic>), RawFailure> {
    let excerpt = || body.to_string().chars().take(200).collect::<String>();
    if !body.is_object() {
        return Err(RawFailure::MalformedResponse {
            raw: format!("expected an object; body: {}", excerpt()),
        });
    }
    let payload: ArticlePayload =
        serde_json::from_value(body.clone()).map_err(|e| RawFailure::MalformedResponse {
            raw: format!("{e}; body: {}", excerpt()),
        })?;

    match payload.article {
        Some(article) if !article.trim().is_empty() => {
            Ok((article, payload.topics.unwrap_or_default()))
        }
        _ => Err(RawFailure::MalformedResponse {
            raw: format!("missing article; body: {}", excerpt()),
        }),
    }
}
