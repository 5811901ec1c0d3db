//! Reply Handlers
//!
//! The pluggable async callback that produces the companion's replies to
//! user messages. The companion core knows nothing about where replies come
//! from (an LLM, a rules engine, a canned script); it hands the handler the
//! user's text and a snapshot of the conversation and reveals whatever comes
//! back.
//!
//! Failures are the handler's to report and the conversation's to absorb:
//! an `Err` (or a panic inside the handler task) turns into the confused
//! fallback line, never into an error for the caller.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::conversation::Message;

/// Produces a reply to a user message
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Reply to `text`, given the conversation so far (including `text`)
    async fn respond(&self, text: &str, history: &[Message]) -> anyhow::Result<String>;
}

/// [`MessageHandler`] backed by an async closure
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(String, Vec<Message>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send,
{
    /// Wrap an async closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(String, Vec<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    async fn respond(&self, text: &str, history: &[Message]) -> anyhow::Result<String> {
        (self.f)(text.to_string(), history.to_vec()).await
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Wrap an async closure as a shareable handler
///
/// ```
/// use companion_core::handler_fn;
///
/// let echo = handler_fn(|text, _history| async move {
///     Ok::<_, anyhow::Error>(format!("You said: {text}"))
/// });
/// # let _ = echo;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(String, Vec<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    Arc::new(FnHandler::new(f))
}

/// Reply request identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplyId(pub(crate) u64);

/// A handler invocation waiting to be driven
///
/// Produced by the companion when the pre-reply delay elapses. The driver
/// polls `future` to completion and feeds the outcome back with
/// [`Companion::complete_reply`](crate::Companion::complete_reply).
pub struct PendingReply {
    /// Identifies the request when completing it
    pub id: ReplyId,
    /// The handler call
    pub future: BoxFuture<'static, anyhow::Result<String>>,
}

impl PendingReply {
    /// Build the pending call of `handler` for `text`
    pub(crate) fn new(
        id: ReplyId,
        handler: Arc<dyn MessageHandler>,
        text: String,
        history: Vec<Message>,
    ) -> Self {
        let future = Box::pin(async move { handler.respond(&text, &history).await });
        Self { id, future }
    }
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Sender;
    use futures::executor::block_on;

    #[test]
    fn test_closure_handler_sees_text_and_history() {
        let handler = handler_fn(|text, history| async move {
            Ok::<_, anyhow::Error>(format!("{text} ({} in history)", history.len()))
        });
        let history = vec![Message::new("hello", Sender::User)];

        let reply = block_on(handler.respond("hello", &history)).unwrap();

        assert_eq!(reply, "hello (1 in history)");
    }

    #[test]
    fn test_pending_reply_owns_its_inputs() {
        let handler = handler_fn(|_text, _history| async {
            Err::<String, _>(anyhow::anyhow!("backend down"))
        });
        let pending = PendingReply::new(ReplyId(7), handler, "hi".to_string(), Vec::new());

        assert_eq!(pending.id, ReplyId(7));
        let err = block_on(pending.future).unwrap_err();
        assert_eq!(err.to_string(), "backend down");
    }
}
