//! Subordinate path: optimistic dispatch, confirmations and id reconciliation.

use chrono::Utc;
use duel_core::{
    Command, EntityId, Fingerprint, RoleError, SimulationHost, decode, encode, fingerprint,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::intents::PendingIntent;
use super::log::LogEntry;
use super::{ActionBus, Dispatched, SyncPhase};
use crate::api::{Result, Transport};
use crate::events::{DesyncCause, ReplicationEvent};
use crate::wire::{ConfirmedCommand, IntentId, IntentRejected, Seq, SubmitIntent};

impl<H, T> ActionBus<H, T>
where
    H: SimulationHost,
    T: Transport,
{
    pub(super) fn dispatch_as_subordinate(&mut self, command: Command) -> Result<Dispatched> {
        let sender = self
            .session
            .local_identity()
            .cloned()
            .ok_or(RoleError::MissingLocalIdentity)?;

        let wire = encode(&command, self.host.state());
        let report = self.host.execute(&command)?;

        self.intent_counter += 1;
        let intent_id = IntentId::new(sender.clone(), self.intent_counter);
        let now = Instant::now();
        self.pending.insert(PendingIntent {
            intent_id: intent_id.clone(),
            command,
            optimistic: true,
            locally_created: report.created,
            submitted_at: now,
            deadline: now + self.config.intent_timeout,
        });

        debug!(
            target: "sync::subordinate",
            %intent_id,
            kind = %wire.kind,
            pending = self.pending.len(),
            "submitting intent"
        );
        self.transport.broadcast(
            SubmitIntent {
                command: wire,
                intent_id: intent_id.clone(),
                sender_id: sender,
            }
            .into(),
        );

        Ok(Dispatched::Submitted { intent_id })
    }

    pub(super) fn on_confirmed_command(&mut self, confirmed: ConfirmedCommand) {
        if confirmed.seq <= self.seq {
            debug!(
                target: "sync::subordinate",
                seq = confirmed.seq,
                last_seq = self.seq,
                "dropping duplicate confirmation"
            );
            return;
        }

        if self.phase == SyncPhase::Recovering || confirmed.seq > self.seq + 1 {
            self.buffer_confirmation(confirmed);
            return;
        }

        self.apply_confirmation(confirmed);
        self.drain_confirmations();
    }

    fn buffer_confirmation(&mut self, confirmed: ConfirmedCommand) {
        debug!(
            target: "sync::subordinate",
            seq = confirmed.seq,
            last_seq = self.seq,
            phase = %self.phase,
            "buffering confirmation"
        );
        self.confirmations.insert(confirmed.seq, confirmed);

        if self.confirmations.len() <= self.config.max_buffered_confirmations {
            return;
        }
        match self.phase {
            SyncPhase::Normal => self.enter_recovery(DesyncCause::ConfirmationGap {
                last_seq: self.seq,
                buffered: self.confirmations.len(),
            }),
            // The oldest entries are the likeliest to be covered by the snapshot.
            SyncPhase::Recovering => {
                self.confirmations.pop_first();
            }
        }
    }

    /// Applies buffered confirmations that have become contiguous.
    pub(super) fn drain_confirmations(&mut self) {
        while self.phase == SyncPhase::Normal {
            let Some(entry) = self.confirmations.first_entry() else {
                break;
            };
            let seq = *entry.key();
            if seq <= self.seq {
                entry.remove();
                continue;
            }
            if seq != self.seq + 1 {
                break;
            }
            let confirmed = entry.remove();
            self.apply_confirmation(confirmed);
        }
    }

    /// Applies the confirmation for `self.seq + 1`.
    fn apply_confirmation(&mut self, confirmed: ConfirmedCommand) {
        let ConfirmedCommand {
            seq,
            command,
            fingerprint: expected,
            intent_id,
            created_entity_ids,
        } = confirmed;

        let own = intent_id
            .as_ref()
            .and_then(|intent_id| self.pending.remove(intent_id));

        match own {
            // Already applied optimistically.
            Some(intent) => self.reconcile_created(&intent.locally_created, &created_entity_ids),
            None => {
                let local = decode(&command, self.host.state());
                match self.host.execute(&local) {
                    Ok(report) => self.reconcile_created(&report.created, &created_entity_ids),
                    Err(error) => {
                        warn!(
                            target: "sync::subordinate",
                            seq,
                            kind = %command.kind,
                            code = error.error_code(),
                            %error,
                            "confirmed command failed locally"
                        );
                        self.enter_recovery(DesyncCause::RemoteExecutionFailed { seq });
                        return;
                    }
                }
            }
        }

        self.seq = seq;
        let origin = match &intent_id {
            Some(intent_id) => intent_id.sender.clone(),
            None => self
                .session
                .authority_identity()
                .cloned()
                .unwrap_or_else(|| self.local_origin()),
        };
        let entry = LogEntry {
            seq,
            command,
            fingerprint: expected,
            timestamp: Utc::now(),
            origin,
            intent_id,
            created_entity_ids,
        };
        self.log.append(entry.clone());
        self.events
            .publish(ReplicationEvent::CommandConfirmed(entry));

        self.check_fingerprint(seq, expected);
    }

    fn check_fingerprint(&mut self, seq: Seq, expected: Fingerprint) {
        // Unconfirmed optimistic effects make the replicas incomparable until
        // the last of them resolves.
        if !self.pending.is_empty() {
            debug!(
                target: "sync::subordinate",
                seq,
                pending = self.pending.len(),
                "fingerprint check deferred while intents are outstanding"
            );
            return;
        }

        let actual = fingerprint(self.host.state());
        if actual == expected {
            self.mismatch_count = 0;
            return;
        }

        self.mismatch_count += 1;
        warn!(
            target: "sync::subordinate",
            seq,
            %expected,
            %actual,
            mismatches = self.mismatch_count,
            "fingerprint mismatch"
        );
        if self.mismatch_count >= self.config.mismatch_threshold {
            self.enter_recovery(DesyncCause::FingerprintMismatch {
                seq,
                expected,
                actual,
            });
        }
    }

    /// Adopts the authority's ids for entities this replica created locally.
    ///
    /// Ids correspond by position. Local ids are first moved out of the way
    /// so chains like `[5, 6] -> [6, 7]` cannot collide with themselves.
    fn reconcile_created(&mut self, local: &[EntityId], authority: &[EntityId]) {
        if local.len() != authority.len() {
            warn!(
                target: "sync::subordinate",
                local = local.len(),
                authority = authority.len(),
                "created entity counts differ; reconciling the common prefix"
            );
        }

        let renames: Vec<(EntityId, EntityId)> = local
            .iter()
            .zip(authority)
            .filter(|(local, authority)| local != authority)
            .map(|(&local, &authority)| (local, authority))
            .collect();
        if renames.is_empty() {
            return;
        }

        if let Some(highest) = authority.iter().max() {
            self.host.state_mut().reserve_entity_ids_through(*highest);
        }

        let parked: Vec<(EntityId, EntityId)> = renames
            .into_iter()
            .map(|(local, authority)| (self.move_entity(local), authority))
            .collect();

        for (parked, authority) in parked {
            if self.host.state().entity(authority).is_some() {
                // Someone else holds the authority's id; give it a fresh one.
                self.move_entity(authority);
            }
            self.rename_everywhere(parked, authority);
            info!(
                target: "sync::subordinate",
                local = %parked,
                %authority,
                "adopted authority entity id"
            );
        }
    }

    /// Moves `id` onto a freshly allocated id and returns the new id.
    fn move_entity(&mut self, id: EntityId) -> EntityId {
        let spare = self.host.state_mut().allocate_entity_id();
        self.rename_everywhere(id, spare);
        spare
    }

    fn rename_everywhere(&mut self, from: EntityId, to: EntityId) {
        self.host.state_mut().rename_entity(from, to);
        self.pending.rename_entity(from, to);
    }

    pub(super) fn on_intent_rejected(&mut self, rejected: IntentRejected) {
        let IntentRejected { intent_id, reason } = rejected;
        if self.pending.remove(&intent_id).is_none() {
            debug!(
                target: "sync::subordinate",
                %intent_id,
                "ignoring rejection for unknown intent"
            );
            return;
        }

        warn!(target: "sync::subordinate", %intent_id, %reason, "intent rejected");
        self.events.publish(ReplicationEvent::CommandRejected {
            intent_id: intent_id.clone(),
            reason,
        });
        self.enter_recovery(DesyncCause::IntentRejected { intent_id });
    }

    /// Removes every intent past its deadline; any expiry starts recovery.
    pub fn expire_intents(&mut self, now: Instant) {
        let expired = self.pending.drain_expired(now);
        let Some(first) = expired.first() else {
            return;
        };

        for intent in &expired {
            warn!(
                target: "sync::subordinate",
                intent_id = %intent.intent_id,
                waited_ms = now.duration_since(intent.submitted_at).as_millis() as u64,
                "intent timed out"
            );
        }
        let intent_id = first.intent_id.clone();
        self.enter_recovery(DesyncCause::IntentTimeout { intent_id });
    }
}
