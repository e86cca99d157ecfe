//! Narration sequencer properties
//!
//! Uses a semaphore-gated mock player so tests control exactly when each
//! clip "finishes"; no audio hardware involved.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tactile_tutor::{ClipPlayer, NarrationClip, Narrator};
use tokio::sync::Semaphore;

/// Player that records started clips and holds each until a permit arrives
struct GatedPlayer {
    started: Arc<Mutex<Vec<Vec<u8>>>>,
    gate: Arc<Semaphore>,
    fail_on: Option<Vec<u8>>,
}

impl GatedPlayer {
    fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>, Arc<Semaphore>) {
        let started = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                started: Arc::clone(&started),
                gate: Arc::clone(&gate),
                fail_on: None,
            },
            started,
            gate,
        )
    }

    /// Player that finishes every clip immediately, failing on `fail_on`
    fn immediate(fail_on: Option<Vec<u8>>) -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
        let started = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Semaphore::new(Semaphore::MAX_PERMITS));
        (
            Self {
                started: Arc::clone(&started),
                gate,
                fail_on,
            },
            started,
        )
    }
}

#[async_trait]
impl ClipPlayer for GatedPlayer {
    async fn play(&self, clip: &NarrationClip) -> tactile_tutor::Result<()> {
        self.started.lock().unwrap().push(clip.audio.clone());
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| tactile_tutor::Error::Audio("gate closed".to_string()))?;
        permit.forget();

        if self.fail_on.as_deref() == Some(clip.audio.as_slice()) {
            return Err(tactile_tutor::Error::Audio("simulated failure".to_string()));
        }
        Ok(())
    }
}

fn clip(tag: &str) -> NarrationClip {
    NarrationClip::new(tag.as_bytes().to_vec())
}

/// Poll until `cond` holds or a generous deadline passes
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn clips_start_in_fifo_order_one_at_a_time() {
    let (player, started, gate) = GatedPlayer::new();
    let narrator = Narrator::spawn(player);

    let done_a = narrator.enqueue(clip("a"));
    let done_b = narrator.enqueue(clip("b"));
    let done_c = narrator.enqueue(clip("c"));

    // Only the head of the queue starts
    wait_until(|| started.lock().unwrap().len() == 1).await;
    assert_eq!(started.lock().unwrap().as_slice(), &[b"a".to_vec()]);

    gate.add_permits(1);
    done_a.await.expect("a finishes");
    wait_until(|| started.lock().unwrap().len() == 2).await;

    gate.add_permits(1);
    done_b.await.expect("b finishes");
    wait_until(|| started.lock().unwrap().len() == 3).await;

    gate.add_permits(1);
    done_c.await.expect("c finishes");

    assert_eq!(
        started.lock().unwrap().as_slice(),
        &[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
    );
}

#[tokio::test]
async fn playback_failure_counts_as_finished() {
    let (player, started) = GatedPlayer::immediate(Some(b"b".to_vec()));
    let narrator = Narrator::spawn(player);

    let done_a = narrator.enqueue(clip("a"));
    let done_b = narrator.enqueue(clip("b"));
    let done_c = narrator.enqueue(clip("c"));

    done_a.await.expect("a finishes");
    done_b.await.expect("failed clip still completes");
    done_c.await.expect("queue not blocked by the failure");

    assert_eq!(
        started.lock().unwrap().as_slice(),
        &[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
    );
}

#[tokio::test]
async fn flush_discards_queue_and_suppresses_in_flight() {
    let (player, started, gate) = GatedPlayer::new();
    let narrator = Narrator::spawn(player);

    let done_a = narrator.enqueue(clip("a"));
    let _done_b = narrator.enqueue(clip("b"));
    let _done_c = narrator.enqueue(clip("c"));

    wait_until(|| started.lock().unwrap().len() == 1).await;

    narrator.flush();
    gate.add_permits(10);

    // The in-flight clip's completion side effect is suppressed
    assert!(done_a.await.is_err(), "flushed clip must not signal completion");

    // Queued clips were discarded; a post-flush clip plays normally
    let done_d = narrator.enqueue(clip("d"));
    done_d.await.expect("post-flush clip plays");

    let log = started.lock().unwrap().clone();
    assert_eq!(log, vec![b"a".to_vec(), b"d".to_vec()]);
}

#[tokio::test]
async fn flush_on_empty_queue_is_harmless() {
    let (player, _started) = GatedPlayer::immediate(None);
    let narrator = Narrator::spawn(player);

    narrator.flush();

    let done = narrator.enqueue(clip("a"));
    done.await.expect("clip after idle flush plays");
}
