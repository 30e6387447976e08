//! Peer role derivation from session metadata.
//!
//! A role is never stored: it is recomputed from the metadata supplied by the
//! host application every time it is needed. Missing metadata is an error.
//! Guessing a role wrongly would make both peers sequence commands, or
//! neither.

use crate::state::PeerId;

/// Execution role of the local peer.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Sequences, validates and executes; its state is the source of truth.
    Authority,
    /// Executes optimistically and reconciles against the authority.
    Subordinate,
}

/// Failure to derive a role.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    #[error("session metadata does not name the local identity")]
    MissingLocalIdentity,

    #[error("session metadata does not name the authority identity")]
    MissingAuthorityIdentity,
}

/// Identity metadata of the current session, supplied externally.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionMetadata {
    pub local: Option<PeerId>,
    pub authority: Option<PeerId>,
}

impl SessionMetadata {
    pub fn new(local: impl Into<PeerId>, authority: impl Into<PeerId>) -> Self {
        Self {
            local: Some(local.into()),
            authority: Some(authority.into()),
        }
    }

    pub fn local_identity(&self) -> Option<&PeerId> {
        self.local.as_ref()
    }

    pub fn authority_identity(&self) -> Option<&PeerId> {
        self.authority.as_ref()
    }

    /// Derives the local role.
    pub fn role(&self) -> Result<Role, RoleError> {
        let local = self.local.as_ref().ok_or(RoleError::MissingLocalIdentity)?;
        let authority = self
            .authority
            .as_ref()
            .ok_or(RoleError::MissingAuthorityIdentity)?;
        Ok(if local == authority {
            Role::Authority
        } else {
            Role::Subordinate
        })
    }

    /// Derives the local role, treating absent metadata as a single-player
    /// session in which the local peer is the authority.
    pub fn role_or_offline_authority(&self) -> Role {
        match (&self.local, &self.authority) {
            (Some(local), Some(authority)) if local != authority => Role::Subordinate,
            _ => Role::Authority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_identities_make_authority() {
        assert_eq!(SessionMetadata::new("a", "a").role(), Ok(Role::Authority));
        assert_eq!(SessionMetadata::new("b", "a").role(), Ok(Role::Subordinate));
    }

    #[test]
    fn missing_metadata_fails_loudly() {
        let missing_local = SessionMetadata {
            local: None,
            authority: Some(PeerId::from("a")),
        };
        assert_eq!(missing_local.role(), Err(RoleError::MissingLocalIdentity));

        let missing_authority = SessionMetadata {
            local: Some(PeerId::from("a")),
            authority: None,
        };
        assert_eq!(
            missing_authority.role(),
            Err(RoleError::MissingAuthorityIdentity)
        );
    }

    #[test]
    fn offline_fallback_is_opt_in() {
        assert_eq!(
            SessionMetadata::default().role_or_offline_authority(),
            Role::Authority
        );
        assert_eq!(
            SessionMetadata::new("b", "a").role_or_offline_authority(),
            Role::Subordinate
        );
    }
}
