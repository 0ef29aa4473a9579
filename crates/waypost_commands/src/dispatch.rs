//! # Command Dispatch
//!
//! Callers hand in one form-encoded parameter set per command. The
//! dispatcher queues it on a bounded channel, a worker runs the handler
//! against the shared [`CommandContext`], and the [`Response`] comes back on
//! a one-shot channel.
//!
//! ```text
//! submit ──► [bounded queue] ──► waypost-dispatch-N ──► execute ──► reply
//! ```
//!
//! A full queue is refused immediately rather than blocking the caller.
//! A panicking handler fails its own command and nothing else.

use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::handlers;
use crate::params::{encode, Params, ResultMap};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Outcome of one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Command name as given
    pub command: String,
    /// Result fields, or the failure
    pub outcome: Result<ResultMap, CommandError>,
}

impl Response {
    /// Whether the command succeeded.
    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Error code of a failed command.
    #[must_use]
    pub fn error(&self) -> Option<ErrorCode> {
        self.outcome.as_ref().err().map(CommandError::code)
    }

    /// Result field `key` of a successful command.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.outcome
            .as_ref()
            .ok()
            .and_then(|fields| fields.get(key))
            .map(String::as_str)
    }

    /// One form-encoded line: `command`, `success`, then either the result
    /// fields or `error` and an optional `detail`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = vec![("command", self.command.as_str())];
        match &self.outcome {
            Ok(fields) => {
                pairs.push(("success", "True"));
                pairs.extend(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
            Err(error) => {
                pairs.push(("success", "False"));
                pairs.push(("error", error.code().name()));
                if let Some(detail) = error.detail() {
                    pairs.push(("detail", detail));
                }
            }
        }
        encode(pairs)
    }
}

/// Runs one command on the calling thread.
///
/// The command must exist, the caller must name a configured group, and
/// the group's password must match when one is set.
pub fn execute(ctx: &CommandContext, params: Params) -> Response {
    let command = params.get("command").unwrap_or_default().trim().to_string();
    let outcome = run(ctx, &command, params);
    match &outcome {
        Ok(_) => tracing::debug!(%command, "command succeeded"),
        Err(error) => tracing::debug!(%command, error = %error, detail = ?error.detail(), "command failed"),
    }
    Response { command, outcome }
}

fn run(ctx: &CommandContext, command: &str, params: Params) -> CommandResult<ResultMap> {
    let handler = handlers::lookup(command)
        .ok_or_else(|| CommandError::with_detail(ErrorCode::UnknownCommand, command))?;
    let group = params.require("group", ErrorCode::NoGroupSpecified)?.to_string();
    if ctx.gate.authenticate(&group, params.get("password")).is_none() {
        tracing::debug!(%group, %command, "authentication failed");
        return Err(ErrorCode::AccessDenied.into());
    }

    let invocation = Invocation::new(command, group, params);
    catch_unwind(AssertUnwindSafe(|| handler(ctx, &invocation))).unwrap_or_else(|_| {
        tracing::error!(command = %invocation.command, "command handler panicked");
        Err(CommandError::with_detail(
            ErrorCode::OperationFailed,
            "handler panicked",
        ))
    })
}

/// A queued command.
struct Job {
    params: Params,
    reply: Sender<Response>,
}

/// Bounded worker pool running commands against one context.
pub struct Dispatcher {
    jobs: Option<Sender<Job>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    submitted: AtomicU64,
    rejected: AtomicU64,
}

impl Dispatcher {
    /// Starts `dispatch_workers` workers over a queue of `queue_capacity`.
    #[must_use]
    pub fn start(ctx: Arc<CommandContext>) -> Self {
        let (tx, rx) = bounded::<Job>(ctx.session.queue_capacity);
        let workers = (0..ctx.session.dispatch_workers)
            .filter_map(|i| {
                let ctx = Arc::clone(&ctx);
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("waypost-dispatch-{i}"))
                    .spawn(move || work(&ctx, &rx))
                    .map_err(|error| tracing::warn!(%error, "could not start dispatch worker"))
                    .ok()
            })
            .collect::<Vec<_>>();
        tracing::info!(workers = workers.len(), "dispatcher started");

        Self {
            jobs: Some(tx),
            workers: Mutex::new(workers),
            submitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Queues a command. The response arrives on the returned receiver.
    pub fn submit(&self, params: Params) -> CommandResult<Receiver<Response>> {
        let Some(jobs) = &self.jobs else {
            return Err(CommandError::with_detail(
                ErrorCode::OperationFailed,
                "dispatcher stopped",
            ));
        };
        let (reply, response) = bounded(1);
        match jobs.try_send(Job { params, reply }) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(response)
            }
            Err(TrySendError::Full(_)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("command queue full");
                Err(ErrorCode::CommandQueueFull.into())
            }
            Err(TrySendError::Disconnected(_)) => Err(CommandError::with_detail(
                ErrorCode::OperationFailed,
                "dispatch workers gone",
            )),
        }
    }

    /// Queues a command and waits for its response. Refusals come back as
    /// failed responses.
    #[must_use]
    pub fn call(&self, params: Params) -> Response {
        let command = params.get("command").unwrap_or_default().trim().to_string();
        let outcome = self.submit(params).and_then(|response| {
            response.recv().map_err(|_| {
                CommandError::with_detail(ErrorCode::OperationFailed, "worker dropped the command")
            })
        });
        match outcome {
            Ok(response) => response,
            Err(error) => Response {
                command,
                outcome: Err(error),
            },
        }
    }

    /// Commands accepted so far.
    #[inline]
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Commands refused because the queue was full.
    #[inline]
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Stops accepting commands, lets queued ones finish, and joins the
    /// workers.
    pub fn shutdown(&mut self) {
        self.jobs.take();
        for worker in self.workers.lock().drain(..) {
            if worker.join().is_err() {
                tracing::error!("dispatch worker panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.workers.lock().len())
            .field("submitted", &self.submitted())
            .field("rejected", &self.rejected())
            .finish()
    }
}

fn work(ctx: &CommandContext, jobs: &Receiver<Job>) {
    for job in jobs {
        let response = execute(ctx, job.params);
        // The caller may have stopped waiting.
        let _ = job.reply.send(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_success() {
        let response = Response {
            command: "getbalance".to_string(),
            outcome: Ok(ResultMap::from([("data".to_string(), "1 000".to_string())])),
        };
        assert_eq!(
            response.encode(),
            "command=getbalance&success=True&data=1+000"
        );
        assert_eq!(response.field("data"), Some("1 000"));
    }

    #[test]
    fn test_encode_failure_with_detail() {
        let response = Response {
            command: "rez".to_string(),
            outcome: Err(CommandError::with_detail(
                ErrorCode::InventoryItemNotFound,
                "Chair",
            )),
        };
        assert!(!response.success());
        assert_eq!(response.error(), Some(ErrorCode::InventoryItemNotFound));
        assert_eq!(
            response.encode(),
            format!(
                "command=rez&success=False&error={}&detail=Chair",
                ErrorCode::InventoryItemNotFound.name()
            )
        );
    }
}
