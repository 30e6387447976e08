//! Authority path: sequencing, intent admission and recovery responses.

use chrono::Utc;
use duel_core::{
    Command, ExecutionReport, PeerId, SimulationHost, WireCommand, decode, encode, fingerprint,
    validate,
};
use tracing::{debug, info, warn};

use super::log::LogEntry;
use super::ordering::{GateOutcome, IntentOrderingGate};
use super::{ActionBus, Dispatched};
use crate::api::{Result, Transport};
use crate::events::ReplicationEvent;
use crate::wire::{
    ConfirmedCommand, IntentId, IntentRejected, RecoveryRequest, RecoveryResponse, Seq,
    SubmitIntent,
};

impl<H, T> ActionBus<H, T>
where
    H: SimulationHost,
    T: Transport,
{
    pub(super) fn dispatch_as_authority(&mut self, command: Command) -> Result<Dispatched> {
        // Zone hints describe the state the command was issued against.
        let wire = encode(&command, self.host.state());
        let report = self.host.execute(&command)?;
        let origin = self.local_origin();
        let seq = self.commit(wire, report, origin, None);
        Ok(Dispatched::Confirmed { seq })
    }

    /// Sequences an executed command: assigns the next seq, logs it and
    /// broadcasts the confirmation.
    fn commit(
        &mut self,
        command: WireCommand,
        report: ExecutionReport,
        origin: PeerId,
        intent_id: Option<IntentId>,
    ) -> Seq {
        self.seq += 1;
        let seq = self.seq;
        let fingerprint = fingerprint(self.host.state());

        let entry = LogEntry {
            seq,
            command: command.clone(),
            fingerprint,
            timestamp: Utc::now(),
            origin,
            intent_id: intent_id.clone(),
            created_entity_ids: report.created.clone(),
        };
        self.log.append(entry.clone());

        debug!(
            target: "sync::authority",
            seq,
            kind = %command.kind,
            %fingerprint,
            origin = %entry.origin,
            "command confirmed"
        );

        self.transport.broadcast(
            ConfirmedCommand {
                seq,
                command,
                fingerprint,
                intent_id,
                created_entity_ids: report.created,
            }
            .into(),
        );
        self.events
            .publish(ReplicationEvent::CommandConfirmed(entry));
        seq
    }

    pub(super) fn on_submit_intent(&mut self, intent: SubmitIntent) {
        let intent_id = intent.intent_id.clone();
        let capacity = self.config.max_buffered_intents;
        let gate = self
            .gates
            .entry(intent.sender_id.clone())
            .or_insert_with(|| IntentOrderingGate::new(capacity));

        match gate.offer(intent) {
            GateOutcome::Admitted(intents) => {
                for intent in intents {
                    self.admit_intent(intent);
                }
            }
            GateOutcome::Buffered => {
                debug!(
                    target: "sync::authority",
                    %intent_id,
                    expected = gate.next_expected(),
                    "intent arrived early; buffered"
                );
            }
            GateOutcome::Stale => {
                debug!(
                    target: "sync::authority",
                    %intent_id,
                    expected = gate.next_expected(),
                    "dropping duplicate or abandoned intent"
                );
            }
            GateOutcome::Overflow => {
                warn!(
                    target: "sync::authority",
                    %intent_id,
                    buffered = gate.buffered(),
                    "intent buffer full; dropping intent"
                );
            }
        }
    }

    /// Validates and executes an intent that passed the ordering gate.
    fn admit_intent(&mut self, intent: SubmitIntent) {
        let SubmitIntent {
            command: wire,
            intent_id,
            sender_id,
        } = intent;

        if intent_id.sender != sender_id {
            let reason = format!("intent {intent_id} was submitted by {sender_id}");
            self.reject(intent_id, reason);
            return;
        }

        let command = decode(&wire, self.host.state());
        if let Err(rejection) = validate(&command, &sender_id, self.host.state()) {
            debug!(
                target: "sync::authority",
                %intent_id,
                code = rejection.code(),
                "intent failed validation"
            );
            self.reject(intent_id, rejection.to_string());
            return;
        }

        match self.host.execute(&command) {
            Ok(report) => {
                self.commit(wire, report, sender_id, Some(intent_id));
            }
            Err(error) => {
                warn!(
                    target: "sync::authority",
                    %intent_id,
                    code = error.error_code(),
                    "validated intent failed to execute"
                );
                self.reject(intent_id, error.to_string());
            }
        }
    }

    fn reject(&mut self, intent_id: IntentId, reason: String) {
        info!(target: "sync::authority", %intent_id, %reason, "rejecting intent");
        self.transport
            .broadcast(IntentRejected { intent_id, reason }.into());
    }

    pub(super) fn on_recovery_request(&mut self, request: RecoveryRequest) -> Result<()> {
        let snapshot = self.host.build_snapshot()?;

        let capacity = self.config.max_buffered_intents;
        let dropped = self
            .gates
            .entry(request.sender_id.clone())
            .or_insert_with(|| IntentOrderingGate::new(capacity))
            .reset(request.resume_intent_counter);

        let authority_fingerprint = fingerprint(self.host.state());
        info!(
            target: "sync::authority",
            requester = %request.sender_id,
            requester_seq = request.last_seq,
            authority_seq = self.seq,
            resume = request.resume_intent_counter,
            dropped,
            bytes = snapshot.len(),
            "answering recovery request"
        );

        self.transport.broadcast(
            RecoveryResponse {
                snapshot,
                authority_seq: self.seq,
                authority_fingerprint,
            }
            .into(),
        );
        Ok(())
    }
}
