//! Host-authoritative replication engine.
//!
//! One [`ActionBus`] exists per peer and session. On the authority it
//! sequences local commands and submitted intents, executing each exactly
//! once and broadcasting the confirmed result. On the subordinate it applies
//! local commands optimistically, submits them, and reconciles its replica
//! with the authority's confirmations, falling back to snapshot recovery when
//! the replicas diverge.
//!
//! The bus is a synchronous state machine. Time enters only through
//! [`ActionBus::tick`], and the async shell lives in the peer worker.

mod authority;
mod intents;
mod log;
mod ordering;
mod recovery;
mod subordinate;

pub use intents::{PendingIntent, PendingIntents};
pub use log::{ActionLog, LogEntry};
pub use ordering::{GateOutcome, IntentOrderingGate};

use std::collections::{BTreeMap, HashMap};

use duel_core::{Command, Fingerprint, PeerId, Role, SessionMetadata, fingerprint};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::warn;

use crate::api::{Result, SimulationHost, SyncError, Transport};
use crate::config::SyncConfig;
use crate::events::EventBus;
use crate::wire::{ConfirmedCommand, IntentId, Seq, WireMessage};

/// Origin recorded for commands issued by a peer without an identity.
const OFFLINE_ORIGIN: &str = "offline";

/// Replication phase of one peer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncPhase {
    Normal,
    /// Waiting for a snapshot. Local dispatch is suspended.
    Recovering,
}

/// What happened to a locally dispatched command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Executed and sequenced by this peer (authority).
    Confirmed { seq: Seq },
    /// Applied optimistically and submitted to the authority.
    Submitted { intent_id: IntentId },
}

/// Point-in-time summary of a bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub role: Role,
    pub phase: SyncPhase,
    pub last_seq: Seq,
    pub pending_intents: usize,
    pub mismatch_count: u32,
    pub log_len: usize,
    pub fingerprint: Fingerprint,
}

/// One round of recovery requests.
#[derive(Debug)]
struct RecoveryRound {
    /// Requests sent so far in this round.
    attempts: u32,
    /// When to re-send. `None` once the round has stalled.
    deadline: Option<Instant>,
}

pub struct ActionBus<H, T> {
    host: H,
    transport: T,
    session: SessionMetadata,
    config: SyncConfig,
    events: EventBus,

    /// Last sequence number issued (authority) or applied (subordinate).
    seq: Seq,
    log: ActionLog,
    phase: SyncPhase,
    mismatch_count: u32,

    /// Last intent counter issued by this peer.
    intent_counter: u64,
    pending: PendingIntents,
    /// Confirmations received ahead of `seq + 1`, or during recovery.
    confirmations: BTreeMap<Seq, ConfirmedCommand>,
    recovery: Option<RecoveryRound>,

    /// Authority-side ordering gates, one per submitting peer.
    gates: HashMap<PeerId, IntentOrderingGate>,
}

impl<H, T> ActionBus<H, T>
where
    H: SimulationHost,
    T: Transport,
{
    pub fn new(
        host: H,
        transport: T,
        session: SessionMetadata,
        config: SyncConfig,
        events: EventBus,
    ) -> Self {
        Self {
            host,
            transport,
            session,
            config,
            events,
            seq: 0,
            log: ActionLog::new(),
            phase: SyncPhase::Normal,
            mismatch_count: 0,
            intent_counter: 0,
            pending: PendingIntents::default(),
            confirmations: BTreeMap::new(),
            recovery: None,
            gates: HashMap::new(),
        }
    }

    /// Role of this peer, derived from the session on every call.
    ///
    /// Missing identities are an error unless the configuration opts into
    /// offline authority.
    pub fn role(&self) -> Result<Role> {
        if self.config.allow_offline_authority {
            return Ok(self.session.role_or_offline_authority());
        }
        Ok(self.session.role()?)
    }

    /// Executes a locally issued command.
    ///
    /// The authority sequences and broadcasts it. A subordinate applies it
    /// optimistically and submits it for confirmation. Either way a command
    /// the rule engine refuses is returned as an error with no network effect.
    pub fn dispatch(&mut self, command: Command) -> Result<Dispatched> {
        let role = self.role()?;
        if self.phase == SyncPhase::Recovering {
            return Err(SyncError::RecoveryInProgress);
        }

        match role {
            Role::Authority => self.dispatch_as_authority(command),
            Role::Subordinate => self.dispatch_as_subordinate(command),
        }
    }

    /// Handles one message received from the other peer.
    pub fn handle_message(&mut self, message: WireMessage) -> Result<()> {
        let role = self.role()?;
        let kind = message.kind();

        match (message, role) {
            (WireMessage::SubmitIntent(intent), Role::Authority) => {
                self.on_submit_intent(intent);
                Ok(())
            }
            (WireMessage::RecoveryRequest(request), Role::Authority) => {
                self.on_recovery_request(request)
            }
            (WireMessage::ConfirmedCommand(confirmed), Role::Subordinate) => {
                self.on_confirmed_command(confirmed);
                Ok(())
            }
            (WireMessage::IntentRejected(rejected), Role::Subordinate) => {
                self.on_intent_rejected(rejected);
                Ok(())
            }
            (WireMessage::RecoveryResponse(response), Role::Subordinate) => {
                self.on_recovery_response(response)
            }
            (WireMessage::SubmitIntent(_) | WireMessage::RecoveryRequest(_), Role::Subordinate)
            | (
                WireMessage::ConfirmedCommand(_)
                | WireMessage::IntentRejected(_)
                | WireMessage::RecoveryResponse(_),
                Role::Authority,
            ) => {
                warn!(
                    target: "sync::bus",
                    %role,
                    kind,
                    "ignoring message not addressed to this role"
                );
                Ok(())
            }
        }
    }

    /// Advances timers to `now`: expires overdue intents and re-sends or
    /// stalls an unanswered recovery request.
    pub fn tick(&mut self, now: Instant) {
        self.expire_intents(now);
        self.poll_recovery(now);
    }

    /// Earliest instant at which [`ActionBus::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let recovery = self.recovery.as_ref().and_then(|round| round.deadline);
        match (self.pending.next_deadline(), recovery) {
            (Some(intent), Some(recovery)) => Some(intent.min(recovery)),
            (intent, recovery) => intent.or(recovery),
        }
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.log
    }

    pub fn last_seq(&self) -> Seq {
        self.seq
    }

    pub fn sync_phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn pending_intents(&self) -> &PendingIntents {
        &self.pending
    }

    pub fn mismatch_count(&self) -> u32 {
        self.mismatch_count
    }

    pub fn status(&self) -> Result<SyncStatus> {
        Ok(SyncStatus {
            role: self.role()?,
            phase: self.phase,
            last_seq: self.seq,
            pending_intents: self.pending.len(),
            mismatch_count: self.mismatch_count,
            log_len: self.log.len(),
            fingerprint: fingerprint(self.host.state()),
        })
    }

    pub fn session(&self) -> &SessionMetadata {
        &self.session
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Identity recorded as the origin of commands this peer issues.
    fn local_origin(&self) -> PeerId {
        self.session
            .local_identity()
            .cloned()
            .unwrap_or_else(|| PeerId::from(OFFLINE_ORIGIN))
    }
}
