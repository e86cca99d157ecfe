//! Feature hold/cooldown gate
//!
//! Turns the noisy per-frame stream of touched-feature observations into
//! discrete confirmed-hold events: a feature must be observed continuously
//! for the hold threshold, and after an announcement every trigger is
//! suppressed until the cooldown expires.

use std::time::Duration;

use tokio::time::Instant;

/// Gate state while feature detection is active
///
/// The candidate and its dwell start travel together, so a dwell timer can
/// never exist without a candidate.
#[derive(Debug)]
pub struct HoldGate {
    hold_threshold: Duration,
    cooldown: Duration,
    candidate: Option<(String, Instant)>,
    cooldown_until: Option<Instant>,
}

impl HoldGate {
    /// Create a gate with the given dwell threshold and suppression window.
    /// A zero cooldown degenerates to "no suppression".
    #[must_use]
    pub const fn new(hold_threshold: Duration, cooldown: Duration) -> Self {
        Self {
            hold_threshold,
            cooldown,
            candidate: None,
            cooldown_until: None,
        }
    }

    /// Process one capture tick's observation
    ///
    /// Returns the confirmed feature exactly once per continuous dwell that
    /// reaches the hold threshold; confirming starts the cooldown window and
    /// clears the candidate.
    pub fn observe(&mut self, feature: Option<&str>, now: Instant) -> Option<String> {
        let cooled = self.cooldown_until.is_none_or(|until| now > until);

        let Some(feature) = feature else {
            // During cooldown a momentary drop-out keeps the candidate, so
            // flicker does not restart a dwell that is about to be eligible
            if cooled {
                self.candidate = None;
            }
            return None;
        };

        match &self.candidate {
            Some((held, since)) if held == feature => {
                if now.duration_since(*since) >= self.hold_threshold {
                    self.candidate = None;
                    self.cooldown_until = Some(now + self.cooldown);
                    return Some(feature.to_string());
                }
            }
            _ => {
                // Switching candidates (or adopting the first) restarts the
                // dwell timer; ignored entirely while cooling down
                if cooled {
                    self.candidate = Some((feature.to_string(), now));
                }
            }
        }

        None
    }

    /// Feature currently being held, if any
    #[must_use]
    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_ref().map(|(feature, _)| feature.as_str())
    }

    /// Whether the gate is inside a post-announcement cooldown at `now`
    #[must_use]
    pub fn cooling_down(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now <= until)
    }
}
