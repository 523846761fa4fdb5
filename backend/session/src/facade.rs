//! The surface a view layer talks to: one chat plus one generation task.
//!
//! Nothing is pushed to the caller. Read the snapshots after each awaited
//! call returns.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use parley_core::{ConversationEntry, Credential, GenerationPhase, ProfileSnapshot, Transport};

use crate::chat::{ChatPhase, ChatSession, ChatSettings, SendOutcome};
use crate::error::SessionError;
use crate::generation::{GenerationSettings, GenerationSnapshot, GenerationTask, SubmitReport};

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub chat: ChatSettings,
    pub generation: GenerationSettings,
}

pub struct Session {
    id: Uuid,
    chat: ChatSession,
    generation: GenerationTask,
    credential: Option<Credential>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, settings: SessionSettings) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "Session opened");
        Self {
            id,
            chat: ChatSession::new(Arc::clone(&transport), settings.chat),
            generation: GenerationTask::new(transport, settings.generation),
            credential: None,
        }
    }

    /// Attach the bearer credential handed over by the auth collaborator.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn send_chat_message(&self, text: &str) -> SendOutcome {
        self.chat.send(text).await
    }

    pub async fn submit_for_generation(
        &self,
        profile: ProfileSnapshot,
    ) -> Result<SubmitReport, SessionError> {
        self.generation
            .submit(profile, self.credential.as_ref())
            .await
    }

    /// Throw away the current article and request a fresh one for the same profile.
    pub async fn regenerate(&self) -> Result<SubmitReport, SessionError> {
        self.generation.regenerate().await
    }

    /// Reset the generation task. The conversation is left alone.
    pub async fn reset(&self) -> GenerationPhase {
        self.generation.reset().await
    }

    pub async fn conversation(&self) -> Vec<ConversationEntry> {
        self.chat.conversation().await
    }

    pub async fn chat_phase(&self) -> ChatPhase {
        self.chat.phase().await
    }

    pub async fn generation(&self) -> GenerationSnapshot {
        self.generation.snapshot().await
    }

    /// Cancel everything in flight. Pending calls resolve as superseded.
    pub async fn close(&self) {
        self.chat.abandon().await;
        self.generation.reset().await;
        info!(session = %self.id, "Session closed");
    }
}
