//! Background relay publisher.
//!
//! Saves hand already signed events to a spawned worker so the caller never
//! waits on the network. Failures are logged and dropped; nothing is
//! retried or persisted across restarts.

use crate::error::{TrackerError, TrackerResult};
use dayseal_relay::{RelayEvent, RelaySync};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum PublishCommand {
    Publish(RelayEvent),
    /// Acknowledged once every earlier event has been broadcast.
    Stop(oneshot::Sender<()>),
}

/// Worker side. Consumes events in submission order.
pub struct Publisher {
    sync: RelaySync,
    command_rx: mpsc::Receiver<PublishCommand>,
}

/// Handle for queueing events on the worker.
#[derive(Clone)]
pub struct PublisherHandle {
    command_tx: mpsc::Sender<PublishCommand>,
}

/// Creates a publisher and its handle. Call [`Publisher::run`] (or
/// [`spawn_publisher`]) to start it.
pub fn create_publisher(sync: RelaySync, capacity: usize) -> (PublisherHandle, Publisher) {
    let (command_tx, command_rx) = mpsc::channel(capacity);
    (
        PublisherHandle { command_tx },
        Publisher { sync, command_rx },
    )
}

/// Creates a publisher and spawns it on the current runtime.
pub fn spawn_publisher(sync: RelaySync, capacity: usize) -> (PublisherHandle, JoinHandle<()>) {
    let (handle, publisher) = create_publisher(sync, capacity);
    (handle, tokio::spawn(publisher.run()))
}

impl PublisherHandle {
    /// Queues `event`. Waits only if the queue is full.
    pub async fn submit(&self, event: RelayEvent) -> TrackerResult<()> {
        self.command_tx
            .send(PublishCommand::Publish(event))
            .await
            .map_err(|_| TrackerError::PublisherStopped)
    }

    /// Returns after everything queued so far has been broadcast and the
    /// worker has exited.
    pub async fn stop(&self) -> TrackerResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command_tx
            .send(PublishCommand::Stop(ack_tx))
            .await
            .map_err(|_| TrackerError::PublisherStopped)?;
        ack_rx
            .await
            .map_err(|_| TrackerError::PublisherStopped)
    }
}

impl Publisher {
    /// Runs until stopped or until every handle is dropped.
    pub async fn run(mut self) {
        info!("relay publisher started");
        while let Some(command) = self.command_rx.recv().await {
            match command {
                PublishCommand::Publish(event) => {
                    let report = self.sync.broadcast(&event).await;
                    if report.is_accepted() {
                        debug!(event = %event.id, accepted = report.accepted.len(), "published");
                    } else {
                        warn!(event = %event.id, "background publish reached no relay; dropping");
                    }
                }
                PublishCommand::Stop(ack) => {
                    let _ = ack.send(());
                    break;
                }
            }
        }
        info!("relay publisher stopped");
    }
}
