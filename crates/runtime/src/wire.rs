//! Messages exchanged between the two peers.
//!
//! The channel is a best-effort broadcast: messages may be lost, duplicated or
//! reordered. Every message is self-describing and carries enough identity
//! (sequence numbers, intent ids) for the receiver to order and deduplicate.
//! On text channels messages travel as JSON objects tagged by `type`.

use std::fmt;

use duel_core::{EntityId, Fingerprint, PeerId, Snapshot, WireCommand};
use serde::{Deserialize, Serialize};

/// Authority-assigned sequence number. Strictly increasing, never reused.
pub type Seq = u64;

/// Identity of a subordinate submission.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntentId {
    pub sender: PeerId,
    /// Per-sender counter starting at 1.
    pub counter: u64,
}

impl IntentId {
    pub fn new(sender: PeerId, counter: u64) -> Self {
        Self { sender, counter }
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.sender, self.counter)
    }
}

/// Subordinate → authority: please sequence this command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitIntent {
    pub command: WireCommand,
    pub intent_id: IntentId,
    pub sender_id: PeerId,
}

/// Authority → all: a command was sequenced and executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedCommand {
    pub seq: Seq,
    pub command: WireCommand,
    /// Fingerprint of the authority's state after execution.
    pub fingerprint: Fingerprint,
    #[serde(default)]
    pub intent_id: Option<IntentId>,
    /// Entities the authority created while executing, in creation order.
    #[serde(default)]
    pub created_entity_ids: Vec<EntityId>,
}

/// Authority → subordinate: an intent was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRejected {
    pub intent_id: IntentId,
    pub reason: String,
}

/// Subordinate → authority: send me your full state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRequest {
    pub last_seq: Seq,
    pub sender_id: PeerId,
    /// Counter of the next intent the subordinate will issue. Intents below it
    /// were abandoned by the subordinate.
    pub resume_intent_counter: u64,
}

/// Authority → subordinate: full state at `authority_seq`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryResponse {
    pub snapshot: Snapshot,
    pub authority_seq: Seq,
    pub authority_fingerprint: Fingerprint,
}

/// Closed set of peer-to-peer messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WireMessage {
    SubmitIntent(SubmitIntent),
    ConfirmedCommand(ConfirmedCommand),
    IntentRejected(IntentRejected),
    RecoveryRequest(RecoveryRequest),
    RecoveryResponse(RecoveryResponse),
}

/// Framing failures.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode {kind} message")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode wire message")]
    Decode(#[source] serde_json::Error),
}

impl WireMessage {
    /// Message type tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(|source| WireError::Encode {
            kind: self.kind(),
            source,
        })
    }

    pub fn from_json(frame: &str) -> Result<Self, WireError> {
        serde_json::from_str(frame).map_err(WireError::Decode)
    }
}

impl From<SubmitIntent> for WireMessage {
    fn from(message: SubmitIntent) -> Self {
        WireMessage::SubmitIntent(message)
    }
}

impl From<ConfirmedCommand> for WireMessage {
    fn from(message: ConfirmedCommand) -> Self {
        WireMessage::ConfirmedCommand(message)
    }
}

impl From<IntentRejected> for WireMessage {
    fn from(message: IntentRejected) -> Self {
        WireMessage::IntentRejected(message)
    }
}

impl From<RecoveryRequest> for WireMessage {
    fn from(message: RecoveryRequest) -> Self {
        WireMessage::RecoveryRequest(message)
    }
}

impl From<RecoveryResponse> for WireMessage {
    fn from(message: RecoveryResponse) -> Self {
        WireMessage::RecoveryResponse(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{CardId, CommandKind, EntityKind, EntityRef, Value};

    fn sample_command() -> WireCommand {
        WireCommand::new(CommandKind::PlayCard).with(
            "card",
            Value::Entity(EntityRef {
                entity_id: EntityId(4),
                secondary_id: Some(CardId::from("imp")),
                kind: EntityKind::Card,
                zone_hint: None,
            }),
        )
    }

    #[test]
    fn messages_are_tagged_in_kebab_case() {
        let message = WireMessage::from(RecoveryRequest {
            last_seq: 3,
            sender_id: PeerId::from("guest"),
            resume_intent_counter: 5,
        });
        let json = message.to_json().expect("encode");
        assert!(json.contains(r#""type":"recovery-request""#), "{json}");
        assert_eq!(message.kind(), "recovery-request");
        assert_eq!(WireMessage::from_json(&json).expect("decode"), message);
    }

    #[test]
    fn confirmed_command_survives_framing() {
        let message = WireMessage::from(ConfirmedCommand {
            seq: 9,
            command: sample_command(),
            fingerprint: Fingerprint(0xdead_beef),
            intent_id: Some(IntentId::new(PeerId::from("guest"), 2)),
            created_entity_ids: vec![EntityId(30)],
        });
        let json = message.to_json().expect("encode");
        assert_eq!(WireMessage::from_json(&json).expect("decode"), message);
    }

    #[test]
    fn commands_without_payload_decode() {
        let frame = r#"{"type":"submit-intent","command":{"kind":"end_turn"},"intent_id":{"sender":"guest","counter":1},"sender_id":"guest"}"#;
        match WireMessage::from_json(frame).expect("decode") {
            WireMessage::SubmitIntent(intent) => {
                assert_eq!(intent.command, WireCommand::new(CommandKind::EndTurn));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn garbage_frames_are_errors() {
        assert!(matches!(
            WireMessage::from_json(r#"{"type":"launch-missiles"}"#),
            Err(WireError::Decode(_))
        ));
    }

    #[test]
    fn intent_ids_render_sender_and_counter() {
        assert_eq!(IntentId::new(PeerId::from("guest"), 7).to_string(), "guest#7");
    }
}
