//! Snapshot Handoff
//!
//! A single-use channel that moves exactly one [`ResourceSnapshot`]
//! from a process harness to the phase that owns it. Both halves are
//! consumed on use, so sending or receiving twice does not compile.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::snapshot::ResourceSnapshot;
use crate::error::HarnessError;

/// Creates a connected sender/receiver pair.
pub fn snapshot_handoff() -> (SnapshotSender, SnapshotReceiver) {
    let (tx, rx) = oneshot::channel();
    (SnapshotSender { tx }, SnapshotReceiver { rx })
}

/// Producing half, owned by the harness thread.
#[derive(Debug)]
pub struct SnapshotSender {
    tx: oneshot::Sender<ResourceSnapshot>,
}

impl SnapshotSender {
    /// Hands over the snapshot.
    ///
    /// Returns false if the receiver is gone, in which case nobody is
    /// waiting for the result anymore.
    pub fn send(self, snapshot: ResourceSnapshot) -> bool {
        self.tx.send(snapshot).is_ok()
    }
}

/// Consuming half, awaited by the phase orchestrator.
///
/// Resolves to [`HarnessError::HandoffDropped`] if the sender is
/// dropped without sending.
#[derive(Debug)]
pub struct SnapshotReceiver {
    rx: oneshot::Receiver<ResourceSnapshot>,
}

impl Future for SnapshotReceiver {
    type Output = Result<ResourceSnapshot, HarnessError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| HarnessError::HandoffDropped))
    }
}
