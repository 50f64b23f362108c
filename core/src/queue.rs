//! Serialized execution queue for asynchronous work.
//!
//! # Design
//! Sequential-looking test code would otherwise fire concurrent network
//! calls that race and interleave non-deterministically. `ControlFlow`
//! restores program-order semantics: task N+1 does not start before task N
//! has settled, and completions are observed in submission order.
//!
//! The implementation is a ticket chain of oneshot channels. `execute`
//! synchronously swaps the queue tail, so the position of a task is fixed
//! the moment it is submitted. The serialized future first waits for its
//! predecessor's ticket, runs the task, then fires its own ticket. A
//! dropped predecessor closes its channel, which counts as settled, so
//! abandoning a submission never wedges the queue. A failed task also
//! settles normally; failures do not halt the queue.
//!
//! When a tokio runtime is current at submission time the serialized
//! future is spawned immediately, so tasks start in submission order even
//! if a caller never awaits one of the returned futures. Outside a runtime
//! the future is poll-driven and runs when first awaited.

use std::future::Future;
use std::sync::Mutex;

use futures::future::Either;
use tokio::sync::oneshot;

/// A FIFO queue that runs submitted futures one at a time.
#[derive(Debug)]
pub struct ControlFlow {
    tail: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ControlFlow {
    pub const fn new() -> Self {
        Self {
            tail: Mutex::new(None),
        }
    }

    /// Submit a task. Its queue position is reserved immediately, and on a
    /// running tokio runtime the task is started as soon as its predecessor
    /// settles, whether or not the returned future is ever awaited.
    pub fn execute<F>(&self, task: F) -> impl Future<Output = F::Output> + Send + 'static
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (done, ticket) = oneshot::channel();
        let predecessor = {
            let mut tail = match self.tail.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            tail.replace(ticket)
        };
        let serialized = async move {
            if let Some(previous) = predecessor {
                // Err means the predecessor was dropped; either way it has
                // settled and this task may start.
                let _ = previous.await;
            }
            let output = task.await;
            let _ = done.send(());
            output
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Either::Left(join(handle.spawn(serialized))),
            Err(_) => Either::Right(serialized),
        }
    }
}

impl Default for ControlFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Await a spawned serialized task, forwarding its output or panic.
async fn join<T>(handle: tokio::task::JoinHandle<T>) -> T {
    match handle.await {
        Ok(output) => output,
        Err(err) => match err.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            // Only reachable if the runtime shuts down while the caller
            // still holds the future.
            Err(err) => panic!("serialized task cancelled: {err}"),
        },
    }
}

static CONTROL_FLOW: ControlFlow = ControlFlow::new();

/// The process-wide queue shared by every `HttpClient`. Calls from
/// different clients are serialized relative to each other.
pub fn control_flow() -> &'static ControlFlow {
    &CONTROL_FLOW
}
