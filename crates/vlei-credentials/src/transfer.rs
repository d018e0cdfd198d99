//! Grant / notify / admit handshake moving an issued credential into the
//! holder's accepted set.

use chrono::Utc;
use vlei_core::{ProtocolConfig, TransferEvent, TransferState, TransferStateMachine};
use vlei_identity::{
    complete_operation, AdmitRequest, CredentialRecord, GrantRequest, Notification, Session,
    GRANT_ROUTE,
};

use crate::error::CredentialError;
use crate::issuer::Issued;

const EXCHANGE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.6f+00:00";

/// One credential's progress from issuer custody to holder acceptance.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub said: String,
    pub record: CredentialRecord,
    /// Holder identifier the grant is addressed to.
    pub holder: String,
    pub state: TransferState,
    /// Said of the grant message, once sent.
    pub grant_said: Option<String>,
    /// Grant notification seen by the holder.
    pub notification: Option<Notification>,
}

impl Transfer {
    pub fn new(issued: &Issued, holder: impl Into<String>) -> Self {
        Self {
            said: issued.said.clone(),
            record: issued.record.clone(),
            holder: holder.into(),
            state: TransferState::Issued,
            grant_said: None,
            notification: None,
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.state.is_final()
    }
}

pub struct TransferCoordinator {
    config: ProtocolConfig,
}

impl TransferCoordinator {
    pub fn new(config: ProtocolConfig) -> Self {
        Self { config }
    }

    /// Drive `transfer` to `Admitted`. On failure the transfer keeps the last
    /// state reached and can be driven again from there.
    pub async fn transfer(
        &self,
        issuer: &Session,
        issuer_alias: &str,
        holder: &Session,
        holder_alias: &str,
        transfer: &mut Transfer,
    ) -> Result<(), CredentialError> {
        while let Some(event) = TransferStateMachine::next_event(transfer.state) {
            match event {
                TransferEvent::Grant => self.grant(issuer, issuer_alias, transfer).await?,
                TransferEvent::Notify => self.await_notification(holder, transfer).await?,
                TransferEvent::Admit => self.admit(holder, holder_alias, transfer).await?,
            }
            transfer.state = TransferStateMachine::transition(transfer.state, event)?;
        }

        tracing::info!(
            said = %transfer.said,
            issuer = issuer_alias,
            holder = holder_alias,
            "credential admitted"
        );
        Ok(())
    }

    async fn grant(
        &self,
        issuer: &Session,
        issuer_alias: &str,
        transfer: &mut Transfer,
    ) -> Result<(), CredentialError> {
        let missing = transfer.record.missing_parts();
        if !missing.is_empty() {
            return Err(CredentialError::IncompleteRecord {
                said: transfer.said.clone(),
                missing: missing.join(", "),
            });
        }

        let client = issuer.client();
        let op = client
            .grant(GrantRequest {
                sender_alias: issuer_alias.to_string(),
                record: transfer.record.clone(),
                recipient: transfer.holder.clone(),
                datetime: exchange_timestamp(),
            })
            .await
            .map_err(|e| CredentialError::GrantFailed(e.to_string()))?;
        let done = complete_operation(client, op, &self.config)
            .await
            .map_err(|e| CredentialError::GrantFailed(e.to_string()))?;

        transfer.grant_said = done
            .response
            .as_ref()
            .and_then(|response| response.get("said"))
            .and_then(|said| said.as_str())
            .map(str::to_string);
        tracing::debug!(said = %transfer.said, holder = %transfer.holder, "grant sent");
        Ok(())
    }

    async fn await_notification(
        &self,
        holder: &Session,
        transfer: &mut Transfer,
    ) -> Result<(), CredentialError> {
        let retry = &self.config.notification_retry;

        for attempt in 1..=retry.attempts {
            match holder.client().list_notifications().await {
                Ok(notes) => {
                    let found = notes.into_iter().find(|note| {
                        !note.read
                            && note.route == GRANT_ROUTE
                            && transfer
                                .grant_said
                                .as_ref()
                                .map_or(true, |said| *said == note.message_said)
                    });
                    if let Some(note) = found {
                        tracing::debug!(said = %transfer.said, attempt, "grant notification received");
                        transfer.notification = Some(note);
                        return Ok(());
                    }
                }
                Err(e) if attempt == retry.attempts => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "failed to list notifications");
                }
            }
            if attempt < retry.attempts {
                tokio::time::sleep(retry.delay()).await;
            }
        }

        Err(CredentialError::GrantNotificationTimeout {
            attempts: retry.attempts,
        })
    }

    async fn admit(
        &self,
        holder: &Session,
        holder_alias: &str,
        transfer: &mut Transfer,
    ) -> Result<(), CredentialError> {
        let note = transfer.notification.as_ref().ok_or_else(|| {
            CredentialError::AdmitFailed(format!("no grant notification for {}", transfer.said))
        })?;
        let recipient = transfer
            .record
            .issuer()
            .ok_or_else(|| CredentialError::AdmitFailed("record names no issuer".into()))?
            .to_string();

        let client = holder.client();
        let op = client
            .admit(AdmitRequest {
                sender_alias: holder_alias.to_string(),
                grant_said: note.message_said.clone(),
                recipient,
                message: String::new(),
                datetime: exchange_timestamp(),
            })
            .await
            .map_err(|e| CredentialError::AdmitFailed(e.to_string()))?;
        complete_operation(client, op, &self.config)
            .await
            .map_err(|e| CredentialError::AdmitFailed(e.to_string()))?;

        client
            .mark_notification(&note.id)
            .await
            .map_err(|e| CredentialError::AdmitFailed(e.to_string()))?;
        Ok(())
    }
}

fn exchange_timestamp() -> String {
    Utc::now().format(EXCHANGE_TIMESTAMP).to_string()
}
