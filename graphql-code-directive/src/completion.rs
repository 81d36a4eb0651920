//! Bridging a fire-and-forget script run back to its caller.
//!
//! The executor reports each invocation's outcome exactly once on a oneshot
//! channel created for that invocation. Awaiting the receiving end parks the
//! resolution on the scheduler until the report arrives; sibling work is
//! never blocked and nothing polls.
//!
//! With no deadline configured the wait is unbounded: a script that neither
//! returns nor throws leaves its field pending forever. That default is
//! deliberate (see DESIGN.md); configure a deadline to bound the wait
//! instead.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::ExecutionError;
use crate::json_ext::Value;

pub(crate) type Outcome = Result<Value, ExecutionError>;

pub(crate) fn channel() -> (CompletionSender, CompletionReceiver) {
    let (sender, receiver) = oneshot::channel();
    (CompletionSender { sender }, CompletionReceiver { receiver })
}

/// The executor's half of an invocation's completion channel.
pub(crate) struct CompletionSender {
    sender: oneshot::Sender<Outcome>,
}

impl CompletionSender {
    /// Reports the invocation's outcome. A report nobody is waiting for is
    /// dropped silently: the caller may have stopped waiting after a
    /// deadline or an abandoned request.
    pub(crate) fn report(self, outcome: Outcome) {
        let _ = self.sender.send(outcome);
    }
}

/// The caller's half of an invocation's completion channel.
pub(crate) struct CompletionReceiver {
    receiver: oneshot::Receiver<Outcome>,
}

impl CompletionReceiver {
    /// Waits for the invocation to settle.
    ///
    /// The deadline bounds only this wait; the launched script keeps running
    /// regardless. A sender dropped without reporting (worker panic, runtime
    /// teardown) settles as [`ExecutionError::Interrupted`] rather than
    /// hanging.
    pub(crate) async fn settle(self, deadline: Option<Duration>) -> Outcome {
        match deadline {
            None => self
                .receiver
                .await
                .unwrap_or(Err(ExecutionError::Interrupted)),
            Some(deadline) => match tokio::time::timeout(deadline, self.receiver).await {
                Ok(outcome) => outcome.unwrap_or(Err(ExecutionError::Interrupted)),
                Err(_elapsed) => Err(ExecutionError::DeadlineExceeded { deadline }),
            },
        }
    }
}
