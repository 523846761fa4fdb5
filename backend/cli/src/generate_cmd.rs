use std::path::Path;

use anyhow::{bail, Context, Result};

use parley_core::{GenerationOutcome, ProfileSnapshot};
use parley_logging::{EventLogger, SessionEvent};
use parley_session::{Session, SubmitReport};

use crate::terminal_output::{note_info, note_success, print_article};

pub async fn run(session: &Session, profile_path: &Path, regenerate: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(profile_path)
        .await
        .with_context(|| format!("Failed to read profile: {}", profile_path.display()))?;
    let profile: ProfileSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse profile JSON at: {}", profile_path.display()))?;
    if profile.interests.is_empty() {
        bail!("profile must list at least one interest");
    }

    let session_id = session.id().to_string();
    EventLogger::log_event(
        &session_id,
        SessionEvent::GenerationSubmitted {
            profile_name: profile.name.clone(),
        },
    );
    note_info(&format!("Generating an article for {}; this can take a few minutes", profile.name));
    let report = session.submit_for_generation(profile).await?;
    render(&session_id, report)?;

    if regenerate {
        EventLogger::log_event(&session_id, SessionEvent::Reset);
        note_info("Regenerating");
        let report = session.regenerate().await?;
        render(&session_id, report)?;
    }
    Ok(())
}

fn render(session_id: &str, report: SubmitReport) -> Result<()> {
    match report {
        SubmitReport::Applied(GenerationOutcome::Succeeded { article, topics }) => {
            EventLogger::log_event(
                session_id,
                SessionEvent::GenerationSucceeded {
                    article_chars: article.chars().count(),
                    topics: topics.len(),
                },
            );
            note_success("Article ready");
            print_article(&article, &topics);
            Ok(())
        }
        SubmitReport::Applied(GenerationOutcome::Failed(error)) => {
            EventLogger::log_event(
                session_id,
                SessionEvent::GenerationFailed {
                    kind: error.kind().to_string(),
                    detail: error.detail().into(),
                },
            );
            bail!(error.user_message())
        }
        SubmitReport::Applied(GenerationOutcome::Pending) | SubmitReport::Superseded => {
            EventLogger::log_event(
                session_id,
                SessionEvent::Superseded {
                    operation: "generation".into(),
                },
            );
            bail!("generation request was superseded")
        }
    }
}
