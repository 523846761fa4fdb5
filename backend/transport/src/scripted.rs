//! In-memory transport that replays canned replies.
//!
//! Honours deadlines and cancellation exactly like [`crate::HttpTransport`],
//! which makes it suitable for session tests and for offline demos.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use parley_core::{ApiRequest, CancelHandle, RawFailure, Transport};

use crate::envelope;

type Responder = dyn Fn(&ApiRequest) -> ScriptedReply + Send + Sync;

/// What the fake backend answers with.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// An HTTP response with a raw body; normalized through the envelope.
    Http { status: u16, body: Vec<u8> },
    /// A failure that never reached HTTP (e.g. connection refused).
    Fail(RawFailure),
}

/// One canned reply.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    response: ScriptedResponse,
    delay: Duration,
    honour_cancel: bool,
}

impl ScriptedReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::http(status, body.to_string().into_bytes())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::http(status, body.into().into_bytes())
    }

    pub fn http(status: u16, body: Vec<u8>) -> Self {
        Self {
            response: ScriptedResponse::Http { status, body },
            delay: Duration::ZERO,
            honour_cancel: true,
        }
    }

    pub fn fail(failure: RawFailure) -> Self {
        Self {
            response: ScriptedResponse::Fail(failure),
            delay: Duration::ZERO,
            honour_cancel: true,
        }
    }

    /// Answer only after `delay` has elapsed.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Keep going after cancellation, like a network stack that cannot abort.
    pub fn ignoring_cancel(mut self) -> Self {
        self.honour_cancel = false;
        self
    }
}

/// Replays queued replies in order, then falls back to a responder if set.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    queue: Arc<Mutex<VecDeque<ScriptedReply>>>,
    seen: Arc<Mutex<Vec<ApiRequest>>>,
    fallback: Option<Arc<Responder>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback<F>(mut self, responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> ScriptedReply + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(responder));
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        locked(&self.queue).push_back(reply);
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        locked(&self.seen).clone()
    }

    fn next_reply(&self, request: &ApiRequest) -> ScriptedReply {
        locked(&self.seen).push(request.clone());
        let queued = locked(&self.queue).pop_front();
        match (queued, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(responder)) => responder(request),
            (None, None) => ScriptedReply::fail(RawFailure::Connectivity {
                raw: format!("connection refused: no scripted reply for {}", request.path),
            }),
        }
    }
}

/// A panic elsewhere must not lose queued replies or recorded requests.
fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        deadline: Duration,
        cancel: &CancelHandle,
    ) -> Result<Value, RawFailure> {
        if deadline.is_zero() {
            return Err(RawFailure::Unrecognized(
                "deadline must be greater than zero".to_string(),
            ));
        }

        let reply = self.next_reply(request);
        debug!(path = %request.path, delay_ms = reply.delay.as_millis() as u64, "Scripted reply");

        let respond = async {
            tokio::time::sleep(reply.delay).await;
            match &reply.response {
                ScriptedResponse::Http { status, body } => envelope::interpret(*status, body),
                ScriptedResponse::Fail(failure) => Err(failure.clone()),
            }
        };

        if reply.honour_cancel {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(RawFailure::Cancelled),
                outcome = tokio::time::timeout(deadline, respond) => {
                    outcome.unwrap_or(Err(RawFailure::Timeout { deadline }))
                }
            }
        } else {
            tokio::time::timeout(deadline, respond)
                .await
                .unwrap_or(Err(RawFailure::Timeout { deadline }))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn replays_in_order_and_records_requests() {
        let transport = ScriptedTransport::new();
        transport.push(ScriptedReply::json(200, json!({ "response": "one" })));
        transport.push(ScriptedReply::json(500, json!({ "detail": "two" })));
        let cancel = CancelHandle::new();

        let first = transport
            .execute(&ApiRequest::get("/a"), Duration::from_secs(1), &cancel)
            .await;
        let second = transport
            .execute(&ApiRequest::get("/b"), Duration::from_secs(1), &cancel)
            .await;

        assert_eq!(first.unwrap()["response"], "one");
        assert!(matches!(second, Err(RawFailure::ServerMessage { status_code: 500, .. })));
        let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reply_times_out() {
        let transport = ScriptedTransport::new();
        transport.push(ScriptedReply::json(200, json!({})).after(Duration::from_secs(30)));

        let result = transport
            .execute(&ApiRequest::get("/slow"), Duration::from_secs(5), &CancelHandle::new())
            .await;
        assert_eq!(
            result,
            Err(RawFailure::Timeout {
                deadline: Duration::from_secs(5)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_reply() {
        let transport = ScriptedTransport::new();
        transport.push(ScriptedReply::json(200, json!({})).after(Duration::from_secs(30)));
        let cancel = CancelHandle::new();
        cancel.cancel();

        let result = transport
            .execute(&ApiRequest::get("/x"), Duration::from_secs(60), &cancel)
            .await;
        assert_eq!(result, Err(RawFailure::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn stubborn_reply_ignores_cancel() {
        let transport = ScriptedTransport::new();
        transport.push(
            ScriptedReply::json(200, json!({ "ok": true }))
                .after(Duration::from_secs(2))
                .ignoring_cancel(),
        );
        let cancel = CancelHandle::new();
        cancel.cancel();

        let result = transport
            .execute(&ApiRequest::get("/x"), Duration::from_secs(60), &cancel)
            .await;
        assert_eq!(result.unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn poisoned_queue_still_accepts_replies() {
        let transport = ScriptedTransport::new();
        let queue = Arc::clone(&transport.queue);
        let _ = std::thread::spawn(move || {
            let _guard = queue.lock().unwrap();
            panic!("poison the queue");
        })
        .join();
        assert!(transport.queue.is_poisoned());

        transport.push(ScriptedReply::json(200, json!({ "response": "kept" })));
        let value = transport
            .execute(&ApiRequest::get("/chat"), Duration::from_secs(1), &CancelHandle::new())
            .await
            .unwrap();
        assert_eq!(value, json!({ "response": "kept" }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_queue_uses_fallback_then_refuses() {
        let echo = ScriptedTransport::new()
            .with_fallback(|req| ScriptedReply::json(200, json!({ "path": req.path })));
        let value = echo
            .execute(&ApiRequest::get("/echo"), Duration::from_secs(1), &CancelHandle::new())
            .await
            .unwrap();
        assert_eq!(value["path"], "/echo");

        let bare = ScriptedTransport::new();
        let result = bare
            .execute(&ApiRequest::get("/none"), Duration::from_secs(1), &CancelHandle::new())
            .await;
        assert!(matches!(result, Err(RawFailure::Connectivity { .. })));
    }
}
