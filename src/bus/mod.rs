//! Typed in-process event dispatch.
//!
//! Side effects that must not block a request (verification mail) ride a
//! bounded channel to a single worker task. Delivery is at-most-once: a
//! full queue or a shutdown drops the event with a warning and a counter
//! increment. Failed handlers re-publish a `TaskFailed` event carrying the
//! original event name.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::lifecycle::Shutdown;
use crate::mail::Mailer;
use crate::observability::metrics;

const QUEUE_CAPACITY: usize = 1024;

/// Events emitted by the user module.
#[derive(Debug, Clone)]
pub enum UserEvent {
    /// Send the post-registration greeting mail.
    SendVerificationEmail {
        first_name: String,
        last_name: String,
        user_uuid: Uuid,
        email: String,
    },
    /// A handler failed; logged and counted, never retried.
    TaskFailed {
        event_name: &'static str,
        reason: String,
    },
}

impl UserEvent {
    fn name(&self) -> &'static str {
        match self {
            UserEvent::SendVerificationEmail { .. } => "SendUserVerificationEmailEvent",
            UserEvent::TaskFailed { .. } => "FailedTaskEvent",
        }
    }
}

/// Cloneable publishing handle.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<UserEvent>,
}

impl EventBus {
    /// Fire-and-forget publish. Dropped events are logged, not retried.
    pub fn publish(&self, event: UserEvent) {
        let name = event.name();
        match self.tx.try_send(event) {
            Ok(()) => metrics::record_bus_event(name, true),
            Err(error) => {
                metrics::record_bus_event(name, false);
                tracing::warn!(event = name, error = %error, "Event dropped");
            }
        }
    }
}

/// Create the bus and spawn its worker. The worker drains queued events
/// after a shutdown signal, then exits.
pub fn start(mailer: Option<Mailer>, shutdown: &Shutdown) -> (EventBus, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let bus = EventBus { tx };
    let worker_bus = bus.clone();
    let mut shutdown_rx = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        let mut rx = rx;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => handle_event(event, mailer.as_ref(), &worker_bus).await,
                    None => break,
                },
                _ = shutdown_rx.recv() => {
                    rx.close();
                    while let Some(event) = rx.recv().await {
                        handle_event(event, mailer.as_ref(), &worker_bus).await;
                    }
                    break;
                }
            }
        }
        tracing::debug!("Event worker stopped");
    });

    (bus, handle)
}

async fn handle_event(event: UserEvent, mailer: Option<&Mailer>, bus: &EventBus) {
    match event {
        UserEvent::SendVerificationEmail {
            first_name,
            last_name,
            user_uuid,
            email,
        } => {
            let Some(mailer) = mailer else {
                tracing::debug!(user = %user_uuid, "Mail disabled, skipping verification email");
                return;
            };
            let name = format!("{first_name} {last_name}").trim().to_string();
            if let Err(error) = mailer.send_verification(&email, &name, user_uuid).await {
                tracing::error!(user = %user_uuid, error = %error, "Verification email failed");
                bus.publish(UserEvent::TaskFailed {
                    event_name: "SendUserVerificationEmailEvent",
                    reason: error.to_string(),
                });
            }
        }
        UserEvent::TaskFailed { event_name, reason } => {
            metrics::record_bus_event(event_name, false);
            tracing::error!(event = event_name, reason = %reason, "Task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_to_the_worker() {
        let shutdown = Shutdown::new();
        let (bus, handle) = start(None, &shutdown);

        bus.publish(UserEvent::SendVerificationEmail {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_uuid: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
        });

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn publish_never_blocks_when_queue_is_full() {
        // No worker is draining this bus; fill past capacity.
        let (tx, _rx) = mpsc::channel(1);
        let bus = EventBus { tx };
        for _ in 0..3 {
            bus.publish(UserEvent::TaskFailed {
                event_name: "SendUserVerificationEmailEvent",
                reason: "x".to_string(),
            });
        }
    }
}
