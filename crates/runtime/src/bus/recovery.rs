//! Desync recovery: `Normal -> Recovering -> Normal`.
//!
//! Recovery replaces the subordinate's replica with a snapshot of the
//! authority's. Optimistic work in flight is abandoned, never replayed.

use duel_core::{ApplyOptions, Role, SimulationHost, fingerprint};
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::{ActionBus, RecoveryRound, SyncPhase};
use crate::api::{Result, Transport};
use crate::events::{DesyncCause, RecoveryEvent};
use crate::wire::{RecoveryRequest, RecoveryResponse};

impl<H, T> ActionBus<H, T>
where
    H: SimulationHost,
    T: Transport,
{
    /// Starts a new recovery round on request of the host application.
    ///
    /// Useful after [`RecoveryEvent::RecoveryStalled`]. A round already in
    /// progress is restarted with a fresh attempt budget. The authority has
    /// nothing to recover from, so the call is a no-op there.
    pub fn request_recovery(&mut self) -> Result<()> {
        if self.role()? == Role::Authority {
            warn!(target: "sync::recovery", "recovery requested on the authority; ignoring");
            return Ok(());
        }
        if self.phase == SyncPhase::Recovering {
            info!(target: "sync::recovery", "restarting recovery round");
            self.recovery = None;
            self.send_recovery_request(Instant::now());
            return Ok(());
        }
        self.enter_recovery(DesyncCause::Requested);
        Ok(())
    }

    /// Suspends dispatch and asks the authority for a snapshot.
    ///
    /// Entering while already recovering does nothing.
    pub(super) fn enter_recovery(&mut self, cause: DesyncCause) {
        if self.phase == SyncPhase::Recovering {
            return;
        }

        self.phase = SyncPhase::Recovering;
        warn!(
            target: "sync::recovery",
            last_seq = self.seq,
            mismatches = self.mismatch_count,
            ?cause,
            "desync detected; requesting snapshot"
        );
        self.events.publish(RecoveryEvent::DesyncDetected {
            last_seq: self.seq,
            mismatch_count: self.mismatch_count,
            cause,
        });
        self.recovery = None;
        self.send_recovery_request(Instant::now());
    }

    fn send_recovery_request(&mut self, now: Instant) {
        let round = self.recovery.get_or_insert(RecoveryRound {
            attempts: 0,
            deadline: None,
        });
        round.attempts += 1;
        round.deadline = Some(now + self.config.recovery_timeout);
        let attempt = round.attempts;

        let sender_id = self.local_origin();
        info!(
            target: "sync::recovery",
            attempt,
            last_seq = self.seq,
            "sending recovery request"
        );
        self.transport.broadcast(
            RecoveryRequest {
                last_seq: self.seq,
                sender_id,
                resume_intent_counter: self.intent_counter + 1,
            }
            .into(),
        );
    }

    /// Re-sends an unanswered request, or gives up once the attempt budget is
    /// spent.
    pub(super) fn poll_recovery(&mut self, now: Instant) {
        let Some(round) = self.recovery.as_mut() else {
            return;
        };
        let Some(deadline) = round.deadline else {
            return;
        };
        if now < deadline {
            return;
        }

        if round.attempts < self.config.recovery_max_attempts {
            self.send_recovery_request(now);
            return;
        }

        round.deadline = None;
        let attempts = round.attempts;
        error!(
            target: "sync::recovery",
            attempts,
            last_seq = self.seq,
            "recovery stalled; no snapshot received"
        );
        self.events.publish(RecoveryEvent::RecoveryStalled {
            last_seq: self.seq,
            attempts,
        });
    }

    pub(super) fn on_recovery_response(&mut self, response: RecoveryResponse) -> Result<()> {
        if self.phase != SyncPhase::Recovering {
            warn!(
                target: "sync::recovery",
                authority_seq = response.authority_seq,
                "ignoring recovery response received outside recovery"
            );
            return Ok(());
        }
        // Answer to a request from an earlier round.
        if response.authority_seq < self.seq {
            warn!(
                target: "sync::recovery",
                authority_seq = response.authority_seq,
                last_seq = self.seq,
                "ignoring stale recovery response"
            );
            return Ok(());
        }

        let RecoveryResponse {
            snapshot,
            authority_seq,
            authority_fingerprint,
        } = response;

        self.pending.clear();
        self.log.clear();
        if let Err(error) = self.host.apply_snapshot(&snapshot, ApplyOptions::FORCE) {
            error!(
                target: "sync::recovery",
                authority_seq,
                %error,
                "failed to install recovery snapshot"
            );
            return Err(error.into());
        }

        self.seq = authority_seq;
        self.phase = SyncPhase::Normal;
        self.mismatch_count = 0;
        self.recovery = None;

        let actual = fingerprint(self.host.state());
        let converged = actual == authority_fingerprint;
        if converged {
            info!(
                target: "sync::recovery",
                authority_seq,
                fingerprint = %actual,
                "recovery complete"
            );
        } else {
            error!(
                target: "sync::recovery",
                authority_seq,
                expected = %authority_fingerprint,
                %actual,
                "replica still diverges after snapshot"
            );
        }
        self.events.publish(RecoveryEvent::RecoveryCompleted {
            authority_seq,
            converged,
        });

        self.drain_confirmations();
        Ok(())
    }
}
