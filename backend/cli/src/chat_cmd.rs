use std::future::Future;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use parley_logging::{EventLogger, SessionEvent};
use parley_session::{ChatPhase, RejectReason, SendOutcome, Session};

use crate::terminal_output::{note_info, note_warn, print_entries};

const QUIT: &str = "/quit";

/// One-shot send when `message` is given, otherwise a line REPL on stdin.
pub async fn run(session: &Session, message: Option<String>) -> Result<()> {
    let mut shown = 0;
    if let Some(message) = message {
        send(session, &message, &mut shown).await;
        return Ok(());
    }

    print_new(session, &mut shown).await;
    note_info(&format!("Type a message and press Enter. {QUIT} or Ctrl-C to leave."));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut closed = false;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim() == QUIT {
            break;
        }

        if send_until(session, &line, &mut shown, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        {
            closed = true;
            break;
        }
    }

    if !closed {
        session.close().await;
    }
    EventLogger::log_event(&session.id().to_string(), SessionEvent::Closed);
    Ok(())
}

/// Send one line, closing the session if `interrupt` fires first.
///
/// The exchange keeps being polled across the close so it settles through
/// its cancel handle. Returns `true` when the session was closed.
async fn send_until(
    session: &Session,
    text: &str,
    shown: &mut usize,
    interrupt: impl Future<Output = ()>,
) -> bool {
    let pending = send(session, text, shown);
    tokio::pin!(pending);
    let interrupted = tokio::select! {
        _ = &mut pending => false,
        _ = interrupt => true,
    };
    if interrupted {
        note_warn("Interrupted; abandoning the pending reply");
        session.close().await;
        pending.await;
    }
    interrupted
}

async fn send(session: &Session, text: &str, shown: &mut usize) -> SendOutcome {
    let session_id = session.id().to_string();
    if let Some(event) = accepted_event(text, session.chat_phase().await) {
        EventLogger::log_event(&session_id, event);
    }
    let outcome = session.send_chat_message(text).await;
    EventLogger::log_event(&session_id, outcome_event(&outcome));
    if !matches!(outcome, SendOutcome::Rejected(_)) {
        print_new(session, shown).await;
    }
    outcome
}

/// `ChatSent` for a message the session will accept.
fn accepted_event(text: &str, phase: ChatPhase) -> Option<SessionEvent> {
    let message = text.trim();
    (!message.is_empty() && phase == ChatPhase::Idle).then(|| SessionEvent::ChatSent {
        text: message.to_string(),
    })
}

fn outcome_event(outcome: &SendOutcome) -> SessionEvent {
    match outcome {
        SendOutcome::Rejected(reason) => SessionEvent::ChatRejected {
            reason: match reason {
                RejectReason::EmptyMessage => "empty message",
                RejectReason::ReplyPending => "reply pending",
            }
            .to_string(),
        },
        SendOutcome::Replied(entry) => SessionEvent::ChatReplied {
            text: entry.text().to_string(),
        },
        SendOutcome::Failed(error) => SessionEvent::ChatFailed {
            kind: error.kind().to_string(),
            detail: error.detail().to_string(),
        },
        SendOutcome::Superseded => SessionEvent::Superseded {
            operation: "chat".to_string(),
        },
    }
}

async fn print_new(session: &Session, shown: &mut usize) {
    let log = session.conversation().await;
    if log.len() > *shown {
        print_entries(&log[*shown..]);
        *shown = log.len();
    }
}
