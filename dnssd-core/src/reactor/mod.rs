//! Drives registered sessions on the tokio runtime.
//!
//! Each registered [`Session`] gets its own task that waits for replies,
//! drains `MoreComing` batches and stops on unregistration, deadline
//! expiry or session termination. Outcomes are reported as
//! [`ReactorEvent`]s on the channel returned by [`Reactor::new`].

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::DnssdError;
use crate::session::Session;
use crate::transport::Descriptor;

/// Unbounded, so a session task never waits on a slow reader before it
/// finishes.
pub type ReactorEvents = mpsc::UnboundedReceiver<ReactorEvent>;

#[derive(Debug)]
pub enum ReactorEvent {
    /// The session ended on its own. `error` is `None` when a daemon
    /// error closed a one-shot session, otherwise it is the failure.
    Terminated {
        descriptor: Descriptor,
        error: Option<DnssdError>,
    },
    /// The session's deadline passed; it has been torn down.
    Expired(Descriptor),
    /// The session was unregistered and torn down.
    Unregistered(Descriptor),
}

impl ReactorEvent {
    pub fn descriptor(&self) -> Descriptor {
        match self {
            ReactorEvent::Terminated { descriptor, .. } => *descriptor,
            ReactorEvent::Expired(d) | ReactorEvent::Unregistered(d) => *d,
        }
    }
}

struct SessionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Reactor {
    tasks: HashMap<Descriptor, SessionTask>,
    events_tx: mpsc::UnboundedSender<ReactorEvent>,
}

enum Step {
    Cancelled,
    Expired,
    Processed(Result<(), DnssdError>),
}

impl Reactor {
    pub fn new() -> (Self, ReactorEvents) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                tasks: HashMap::new(),
                events_tx,
            },
            events_rx,
        )
    }

    /// Start driving `session`. With a `deadline`, the session is torn
    /// down once it elapses.
    pub fn register(
        &mut self,
        session: Session,
        deadline: Option<Duration>,
    ) -> Result<Descriptor, DnssdError> {
        let descriptor = session.descriptor();
        if !session.is_active() {
            return Err(DnssdError::InvalidState("only active sessions can be registered"));
        }
        if self.tasks.contains_key(&descriptor) {
            return Err(DnssdError::InvalidState("session already registered"));
        }

        // drop bookkeeping for tasks that already finished
        self.tasks.retain(|_, task| !task.handle.is_finished());

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(drive(
            session,
            cancel.clone(),
            deadline,
            self.events_tx.clone(),
        ));
        tracing::debug!(%descriptor, ?deadline, "session registered");
        self.tasks.insert(descriptor, SessionTask { cancel, handle });
        Ok(descriptor)
    }

    /// Stop driving the session and wait until it has been torn down.
    ///
    /// Returns `false` if no such session was registered.
    pub async fn unregister(&mut self, descriptor: Descriptor) -> bool {
        let Some(task) = self.tasks.remove(&descriptor) else {
            return false;
        };
        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            tracing::warn!(%descriptor, error = %e, "session task failed");
        }
        true
    }

    /// Unregister every session.
    pub async fn shutdown(&mut self) {
        let descriptors: Vec<Descriptor> = self.tasks.keys().copied().collect();
        for descriptor in descriptors {
            self.unregister(descriptor).await;
        }
    }

    /// Number of sessions whose tasks are still running.
    pub fn active_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    pub fn is_registered(&self, descriptor: Descriptor) -> bool {
        self.tasks
            .get(&descriptor)
            .is_some_and(|task| !task.handle.is_finished())
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.cancel.cancel();
        }
    }
}

async fn drive(
    mut session: Session,
    cancel: CancellationToken,
    deadline: Option<Duration>,
    events: mpsc::UnboundedSender<ReactorEvent>,
) {
    let descriptor = session.descriptor();
    let expiry = async move {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(expiry);

    let event = loop {
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Cancelled,
            _ = &mut expiry => Step::Expired,
            result = session.process_result() => Step::Processed(result),
        };

        match step {
            Step::Cancelled => break ReactorEvent::Unregistered(descriptor),
            Step::Expired => {
                tracing::info!(%descriptor, "session deadline reached");
                break ReactorEvent::Expired(descriptor);
            }
            Step::Processed(Err(error)) => {
                break ReactorEvent::Terminated {
                    descriptor,
                    error: Some(error),
                };
            }
            Step::Processed(Ok(())) => {
                if let Err(error) = drain(&mut session) {
                    break ReactorEvent::Terminated {
                        descriptor,
                        error: Some(error),
                    };
                }
                if !session.is_active() {
                    break ReactorEvent::Terminated {
                        descriptor,
                        error: None,
                    };
                }
            }
        }
    };

    session.teardown();
    // nobody listening is fine
    let _ = events.send(event);
}

/// Process replies already queued behind a `MoreComing` reply.
fn drain(session: &mut Session) -> Result<(), DnssdError> {
    while session.is_active() && session.more_coming() {
        if !session.try_process_result()? {
            break;
        }
    }
    Ok(())
}
