use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of an issued credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Issued,
    /// Final state.
    Revoked,
}

impl CredentialStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// `issued -> revoked` is the only legal status transition.
    pub fn revoke(self) -> Result<Self, CoreError> {
        match self {
            Self::Issued => {
                tracing::debug!(from = %self, to = %Self::Revoked, "credential status transition");
                Ok(Self::Revoked)
            }
            Self::Revoked => Err(CoreError::InvalidStatusTransition {
                from: self,
                to: Self::Revoked,
            }),
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "issued"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// The states of one credential transfer from issuer custody into the
/// holder's accepted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferState {
    /// Credential issued, still in issuer custody.
    Issued,
    /// Grant message accepted by the issuer's protocol client.
    Granted,
    /// Holder has seen the grant notification.
    Notified,
    /// Holder admitted the credential. Final state.
    Admitted,
}

impl TransferState {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "Issued"),
            Self::Granted => write!(f, "Granted"),
            Self::Notified => write!(f, "Notified"),
            Self::Admitted => write!(f, "Admitted"),
        }
    }
}

/// Events that advance a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    Grant,
    Notify,
    Admit,
}

/// Transfer transitions.
///
/// Valid transitions:
/// - Issued → Granted (Grant)
/// - Granted → Notified (Notify)
/// - Notified → Admitted (Admit)
///
/// There is no rollback; a failed step leaves the last successful state.
pub struct TransferStateMachine;

impl TransferStateMachine {
    pub fn transition(
        current: TransferState,
        event: TransferEvent,
    ) -> Result<TransferState, CoreError> {
        let new_state = match (current, event) {
            (TransferState::Issued, TransferEvent::Grant) => TransferState::Granted,
            (TransferState::Granted, TransferEvent::Notify) => TransferState::Notified,
            (TransferState::Notified, TransferEvent::Admit) => TransferState::Admitted,
            _ => {
                let target = match event {
                    TransferEvent::Grant => TransferState::Granted,
                    TransferEvent::Notify => TransferState::Notified,
                    TransferEvent::Admit => TransferState::Admitted,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "transfer state transition"
        );

        Ok(new_state)
    }

    pub fn can_transition(current: TransferState, event: TransferEvent) -> bool {
        Self::transition(current, event).is_ok()
    }

    /// The event that advances `current`, if any.
    pub fn next_event(current: TransferState) -> Option<TransferEvent> {
        match current {
            TransferState::Issued => Some(TransferEvent::Grant),
            TransferState::Granted => Some(TransferEvent::Notify),
            TransferState::Notified => Some(TransferEvent::Admit),
            TransferState::Admitted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = TransferState::Issued;
        let state = TransferStateMachine::transition(state, TransferEvent::Grant).unwrap();
        assert_eq!(state, TransferState::Granted);
        let state = TransferStateMachine::transition(state, TransferEvent::Notify).unwrap();
        assert_eq!(state, TransferState::Notified);
        let state = TransferStateMachine::transition(state, TransferEvent::Admit).unwrap();
        assert_eq!(state, TransferState::Admitted);
        assert!(state.is_final());
    }

    #[test]
    fn test_cannot_skip_notify() {
        let result = TransferStateMachine::transition(TransferState::Granted, TransferEvent::Admit);
        assert!(matches!(
            result,
            Err(CoreError::InvalidStateTransition {
                from: TransferState::Granted,
                to: TransferState::Admitted
            })
        ));
    }

    #[test]
    fn test_cannot_regrant() {
        assert!(!TransferStateMachine::can_transition(
            TransferState::Admitted,
            TransferEvent::Grant
        ));
        assert!(!TransferStateMachine::can_transition(
            TransferState::Notified,
            TransferEvent::Grant
        ));
    }

    #[test]
    fn test_next_event_walks_to_admitted() {
        let mut state = TransferState::Issued;
        while let Some(event) = TransferStateMachine::next_event(state) {
            state = TransferStateMachine::transition(state, event).unwrap();
        }
        assert_eq!(state, TransferState::Admitted);
    }

    #[test]
    fn test_status_revoke() {
        let status = CredentialStatus::Issued.revoke().unwrap();
        assert_eq!(status, CredentialStatus::Revoked);
        assert!(status.is_final());
        assert!(CredentialStatus::Revoked.revoke().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TransferState::Notified), "Notified");
        assert_eq!(format!("{}", CredentialStatus::Revoked), "revoked");
    }
}
