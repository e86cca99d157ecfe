//! Narration sequencer
//!
//! A single drain task owns playback, so at most one clip is ever playing
//! and clips start in strict enqueue order. Playback failure counts as
//! completion; a failed clip never blocks the queue.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::{ClipPlayer, NarrationClip};

struct QueuedClip {
    clip: NarrationClip,
    epoch: u64,
    done: oneshot::Sender<()>,
}

/// Handle to the narration queue
///
/// Cloneable; every component that narrates holds one. The queue itself is
/// mutated only by the drain task.
#[derive(Clone)]
pub struct Narrator {
    tx: mpsc::UnboundedSender<QueuedClip>,
    epoch: Arc<watch::Sender<u64>>,
    player: Arc<dyn ClipPlayer>,
}

impl Narrator {
    /// Start the drain task and return a handle to it
    pub fn spawn<P: ClipPlayer + 'static>(player: P) -> Self {
        let player: Arc<dyn ClipPlayer> = Arc::new(player);
        let (tx, rx) = mpsc::unbounded_channel();
        let (epoch_tx, epoch_rx) = watch::channel(0u64);

        tokio::spawn(drain(rx, epoch_rx, Arc::clone(&player)));

        Self {
            tx,
            epoch: Arc::new(epoch_tx),
            player,
        }
    }

    /// Append a clip to the queue
    ///
    /// The returned receiver resolves when the clip has finished playing
    /// (naturally or on playback error). It is dropped unresolved when the
    /// clip is flushed before completion.
    pub fn enqueue(&self, clip: NarrationClip) -> oneshot::Receiver<()> {
        let (done_tx, done_rx) = oneshot::channel();
        let item = QueuedClip {
            clip,
            epoch: *self.epoch.borrow(),
            done: done_tx,
        };
        if self.tx.send(item).is_err() {
            tracing::warn!("narration queue closed, dropping clip");
        }
        done_rx
    }

    /// Discard every queued clip and stop the in-flight one
    ///
    /// Clips enqueued after the flush play normally.
    pub fn flush(&self) {
        let next = *self.epoch.borrow() + 1;
        let _ = self.epoch.send(next);
        self.player.cancel();
        tracing::debug!(epoch = next, "narration queue flushed");
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<QueuedClip>,
    mut epoch_rx: watch::Receiver<u64>,
    player: Arc<dyn ClipPlayer>,
) {
    while let Some(item) = rx.recv().await {
        // Flushed while still queued
        if item.epoch < *epoch_rx.borrow() {
            continue;
        }

        let play = player.play(&item.clip);
        tokio::pin!(play);

        let flushed = loop {
            tokio::select! {
                // A flush racing a natural completion must win
                biased;
                changed = epoch_rx.changed() => {
                    if changed.is_err() {
                        break false;
                    }
                    if item.epoch < *epoch_rx.borrow_and_update() {
                        // Flushed mid-clip: suppress completion side effects
                        break true;
                    }
                }
                result = &mut play => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "clip playback failed, continuing");
                    }
                    break false;
                }
            }
        };

        if flushed {
            continue;
        }
        let _ = item.done.send(());
    }

    tracing::debug!("narration drain task stopped");
}
