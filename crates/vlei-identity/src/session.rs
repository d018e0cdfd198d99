use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;
use vlei_core::{ProtocolConfig, WitnessPolicy};

use crate::error::IdentityError;
use crate::operation::complete_operation;
use crate::protocol::{ProtocolClient, SessionConnector};

const PASSCODE_LEN: usize = 21;

/// One actor's isolated connection. Key material lives with the protocol
/// client; the passcode reopens the same agent.
#[derive(Clone)]
pub struct Session {
    pub id: Uuid,
    passcode: String,
    client: Arc<dyn ProtocolClient>,
}

impl Session {
    pub fn client(&self) -> &dyn ProtocolClient {
        self.client.as_ref()
    }

    pub fn passcode(&self) -> &str {
        &self.passcode
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("agent", &self.client.agent_prefix())
            .finish()
    }
}

/// Creates sessions and drives identifier setup steps. Each step waits for
/// its operation under the configured budget; any failure is a
/// [`IdentityError::SessionSetupFailure`] and is not retried here.
pub struct SessionManager {
    connector: Arc<dyn SessionConnector>,
    config: ProtocolConfig,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn SessionConnector>, config: ProtocolConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Open a session under a fresh random passcode.
    pub async fn create_session(&self) -> Result<Session, IdentityError> {
        let passcode: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PASSCODE_LEN)
            .map(char::from)
            .collect();
        self.open_session(passcode).await
    }

    /// Reopen the session bound to `passcode`.
    pub async fn open_session(&self, passcode: String) -> Result<Session, IdentityError> {
        let client = self
            .connector
            .connect(&passcode)
            .await
            .map_err(|e| IdentityError::setup("connect", e))?;
        let session = Session {
            id: Uuid::now_v7(),
            passcode,
            client,
        };
        tracing::debug!(session = %session.id, agent = %session.client.agent_prefix(), "session opened");
        Ok(session)
    }

    /// Create an identifier and wait until the witness quorum acknowledges it.
    pub async fn create_identity(
        &self,
        session: &Session,
        alias: &str,
        policy: &WitnessPolicy,
    ) -> Result<String, IdentityError> {
        let step = "create-identity";
        let client = session.client();
        let op = client
            .create_identifier(alias, policy)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        let done = complete_operation(client, op, &self.config)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        let prefix = done
            .response_prefix()
            .map(str::to_string)
            .ok_or_else(|| IdentityError::setup(step, "operation response carries no prefix"))?;

        tracing::info!(alias, prefix = %prefix, witnesses = policy.witnesses.len(), "identifier created");
        Ok(prefix)
    }

    /// Authorize the session's agent as the end role for `alias`.
    pub async fn assign_role(&self, session: &Session, alias: &str) -> Result<(), IdentityError> {
        let step = "assign-role";
        let client = session.client();
        let op = client
            .add_end_role(alias, &self.config.end_role)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        complete_operation(client, op, &self.config)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        tracing::debug!(alias, role = %self.config.end_role, "end role assigned");
        Ok(())
    }

    pub async fn issue_introduction_link(
        &self,
        session: &Session,
        alias: &str,
    ) -> Result<String, IdentityError> {
        let step = "issue-introduction";
        let links = session
            .client()
            .get_introduction(alias, &self.config.end_role)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        links
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::setup(step, format!("no introduction link for {}", alias)))
    }

    pub async fn accept_introduction_link(
        &self,
        session: &Session,
        link: &str,
        contact_alias: &str,
    ) -> Result<(), IdentityError> {
        let step = "accept-introduction";
        let client = session.client();
        let op = client
            .resolve_introduction(link, contact_alias)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        complete_operation(client, op, &self.config)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        tracing::debug!(contact = contact_alias, "introduction accepted");
        Ok(())
    }

    pub async fn create_registry(
        &self,
        session: &Session,
        alias: &str,
        registry_name: &str,
    ) -> Result<String, IdentityError> {
        let step = "create-registry";
        let client = session.client();
        let op = client
            .create_registry(alias, registry_name)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        let done = complete_operation(client, op, &self.config)
            .await
            .map_err(|e| IdentityError::setup(step, e))?;
        let identifier = done
            .registry_identifier()
            .map(str::to_string)
            .ok_or_else(|| IdentityError::setup(step, "operation response carries no registry"))?;

        tracing::info!(alias, registry = registry_name, identifier = %identifier, "registry created");
        Ok(identifier)
    }
}
