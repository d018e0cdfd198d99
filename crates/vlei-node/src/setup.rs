//! Top-down creation of the actor hierarchy and its credential chain.
//!
//! Root, then QVI, then every organization, then every person, then every
//! agent: a layer is finished across all organizations before the next one
//! starts. Every actor gets its own session, identifier, end role, introduction link
//! and, when it issues, a registry. Each credential is issued, transferred
//! through the grant/admit handshake and persisted before the next step. A
//! failure aborts the run and leaves already-persisted records in place.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use vlei_core::{
    ecr_rules, oor_rules, standard_rules, ActorRole, Credential, CredentialKind, Edge, Identity,
    IntroductionRecord, ProtocolConfig, Registry, ISSUER_TO_ISSUEE,
};
use vlei_credentials::{FlowVariant, IssuanceCoordinator, IssueRequest, Transfer, TransferCoordinator};
use vlei_identity::{Session, SessionConnector, SessionManager};

use crate::storage::Storage;

/// Actor hierarchy to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupPlan {
    pub root: RootPlan,
    pub qvi: QviPlan,
    #[serde(default)]
    pub organizations: Vec<OrganizationPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootPlan {
    pub alias: String,
    pub registry_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QviPlan {
    pub alias: String,
    pub lei: String,
    pub registry_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub id: String,
    pub alias: String,
    pub name: String,
    pub lei: String,
    pub registry_name: String,
    #[serde(default)]
    pub persons: Vec<PersonPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonPlan {
    pub alias: String,
    pub legal_name: String,
    pub official_role: String,
    /// Registry for ECR issuance in the direct flow.
    #[serde(default)]
    pub registry_name: Option<String>,
    #[serde(default)]
    pub agents: Vec<AgentPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPlan {
    pub alias: String,
    pub engagement_context_role: String,
    pub agent_type: String,
}

impl SetupPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading setup plan {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing setup plan {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
            .with_context(|| format!("writing setup plan {}", path.display()))
    }

    /// One organization with one person and one agent.
    pub fn sample() -> Self {
        Self {
            root: RootPlan {
                alias: "gleif".into(),
                registry_name: "gleif-registry".into(),
            },
            qvi: QviPlan {
                alias: "qvi".into(),
                lei: "254900OPPU84GM83MG36".into(),
                registry_name: "qvi-registry".into(),
            },
            organizations: vec![OrganizationPlan {
                id: "jupiter".into(),
                alias: "jupiter".into(),
                name: "Jupiter Knitting Company".into(),
                lei: "3358004DXAMRWRUIYJ05".into(),
                registry_name: "jupiter-registry".into(),
                persons: vec![PersonPlan {
                    alias: "jupiter-cpo".into(),
                    legal_name: "Chief Procurement Officer".into(),
                    official_role: "ChiefProcurementOfficer".into(),
                    registry_name: None,
                    agents: vec![AgentPlan {
                        alias: "jupiterSellerAgent".into(),
                        engagement_context_role: "Sales Agent".into(),
                        agent_type: "AI".into(),
                    }],
                }],
            }],
        }
    }
}

/// Created actor and issued credential listing.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupSummary {
    pub flow: FlowVariant,
    pub actors: Vec<ActorSummary>,
    pub credentials: Vec<IssuedSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSummary {
    pub alias: String,
    pub role: ActorRole,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSummary {
    pub kind: String,
    pub said: String,
    pub issuer: String,
    pub holder: String,
}

struct Actor {
    identity: Identity,
    session: Session,
    link: String,
}

impl Actor {
    fn alias(&self) -> &str {
        &self.identity.alias
    }

    fn prefix(&self) -> &str {
        &self.identity.prefix
    }

    fn registry(&self) -> Result<&str> {
        self.identity
            .registry
            .as_deref()
            .with_context(|| format!("{} has no registry", self.identity.alias))
    }
}

/// Organization created in the first layer.
struct Entity<'p> {
    plan: &'p OrganizationPlan,
    actor: Actor,
    credential: Credential,
}

/// Person created in the second layer, with the credential their agents'
/// ECRs chain to in the direct flow.
struct Member<'p, 'e> {
    entity: &'e Entity<'p>,
    plan: &'p PersonPlan,
    actor: Actor,
    oor_credential: Credential,
}

pub struct SetupOrchestrator {
    sessions: SessionManager,
    issuance: IssuanceCoordinator,
    transfers: TransferCoordinator,
    storage: Arc<Storage>,
    flow: FlowVariant,
}

impl SetupOrchestrator {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        storage: Arc<Storage>,
        config: ProtocolConfig,
        flow: FlowVariant,
    ) -> Self {
        Self {
            issuance: IssuanceCoordinator::new(config.clone()),
            transfers: TransferCoordinator::new(config.clone()),
            sessions: SessionManager::new(connector, config),
            storage,
            flow,
        }
    }

    pub async fn run(&self, plan: &SetupPlan) -> Result<SetupSummary> {
        let mut summary = SetupSummary {
            flow: self.flow,
            ..Default::default()
        };
        tracing::info!(flow = %self.flow, organizations = plan.organizations.len(), "setup started");

        let root = self
            .create_actor(
                &plan.root.alias,
                ActorRole::Root,
                None,
                None,
                Some(&plan.root.registry_name),
                &mut summary,
            )
            .await?;
        let qvi = self
            .create_actor(
                &plan.qvi.alias,
                ActorRole::IntermediateIssuer,
                Some(&plan.qvi.lei),
                None,
                Some(&plan.qvi.registry_name),
                &mut summary,
            )
            .await?;
        self.introduce(&root, &qvi).await?;

        let request = IssueRequest::new(root.alias(), root.registry()?, CredentialKind::Qvi, qvi.prefix())
            .attribute("LEI", plan.qvi.lei.as_str())
            .rules(standard_rules());
        let qvi_credential = self.issue(&root, &qvi, request, &mut summary).await?;
        self.commit_pause().await;

        let mut entities = Vec::with_capacity(plan.organizations.len());
        for organization in &plan.organizations {
            let entity = self
                .setup_organization(organization, &qvi, &qvi_credential, &mut summary)
                .await
                .with_context(|| format!("setting up organization {}", organization.id))?;
            entities.push(entity);
        }

        let mut members = Vec::new();
        for entity in &entities {
            for person in &entity.plan.persons {
                let member = self
                    .setup_person(entity, person, &qvi, &mut summary)
                    .await
                    .with_context(|| format!("setting up person {}", person.alias))?;
                members.push(member);
            }
        }

        for member in &members {
            for agent in &member.plan.agents {
                self.setup_agent(member, agent, &mut summary)
                    .await
                    .with_context(|| format!("setting up agent {}", agent.alias))?;
            }
        }

        tracing::info!(
            actors = summary.actors.len(),
            credentials = summary.credentials.len(),
            "setup complete"
        );
        Ok(summary)
    }

    async fn setup_organization<'p>(
        &self,
        plan: &'p OrganizationPlan,
        qvi: &Actor,
        qvi_credential: &Credential,
        summary: &mut SetupSummary,
    ) -> Result<Entity<'p>> {
        let le = self
            .create_actor(
                &plan.alias,
                ActorRole::Organization,
                Some(&plan.lei),
                None,
                Some(&plan.registry_name),
                summary,
            )
            .await?;
        self.introduce(qvi, &le).await?;

        let request = IssueRequest::new(qvi.alias(), qvi.registry()?, CredentialKind::LegalEntity, le.prefix())
            .attribute("LEI", plan.lei.as_str())
            .edge("qvi", edge_to(qvi_credential))
            .rules(standard_rules());
        let credential = self.issue(qvi, &le, request, summary).await?;
        Ok(Entity {
            plan,
            actor: le,
            credential,
        })
    }

    async fn setup_person<'p, 'e>(
        &self,
        entity: &'e Entity<'p>,
        plan: &'p PersonPlan,
        qvi: &Actor,
        summary: &mut SetupSummary,
    ) -> Result<Member<'p, 'e>> {
        let organization = entity.plan;
        let le = &entity.actor;
        let le_credential = &entity.credential;
        let registry_name = match self.flow {
            FlowVariant::Official => None,
            FlowVariant::Direct => Some(
                plan.registry_name
                    .clone()
                    .unwrap_or_else(|| format!("{}-registry", plan.alias)),
            ),
        };
        let person = self
            .create_actor(
                &plan.alias,
                ActorRole::Person,
                Some(&organization.lei),
                Some(&plan.official_role),
                registry_name.as_deref(),
                summary,
            )
            .await?;
        self.introduce(le, &person).await?;

        let lei = organization.lei.as_str();
        let oor_credential = match self.flow {
            FlowVariant::Official => {
                self.introduce(qvi, &person).await?;
                let auth = IssueRequest::new(le.alias(), le.registry()?, CredentialKind::OorAuth, qvi.prefix())
                    .attribute("AID", "")
                    .attribute("LEI", lei)
                    .attribute("personLegalName", plan.legal_name.as_str())
                    .attribute("officialRole", plan.official_role.as_str())
                    .edge("le", edge_to(le_credential))
                    .rules(standard_rules());
                let auth_credential = self.issue(le, qvi, auth, summary).await?;
                self.commit_pause().await;

                let oor = IssueRequest::new(qvi.alias(), qvi.registry()?, CredentialKind::Oor, person.prefix())
                    .attribute("personLegalName", plan.legal_name.as_str())
                    .attribute("officialRole", plan.official_role.as_str())
                    .attribute("LEI", lei)
                    .edge("auth", edge_to(&auth_credential).with_operator(ISSUER_TO_ISSUEE))
                    .rules(oor_rules());
                self.issue(qvi, &person, oor, summary).await?
            }
            FlowVariant::Direct => {
                let oor = IssueRequest::new(le.alias(), le.registry()?, CredentialKind::Oor, person.prefix())
                    .attribute("personLegalName", plan.legal_name.as_str())
                    .attribute("officialRole", plan.official_role.as_str())
                    .attribute("LEI", lei)
                    .edge("le", edge_to(le_credential))
                    .rules(oor_rules());
                self.issue(le, &person, oor, summary).await?
            }
        };

        Ok(Member {
            entity,
            plan,
            actor: person,
            oor_credential,
        })
    }

    async fn setup_agent(
        &self,
        member: &Member<'_, '_>,
        agent: &AgentPlan,
        summary: &mut SetupSummary,
    ) -> Result<()> {
        let lei = member.entity.plan.lei.as_str();
        let title = format!("{} ({})", agent.engagement_context_role, agent.agent_type);
        let actor = self
            .create_actor(&agent.alias, ActorRole::Agent, Some(lei), Some(&title), None, summary)
            .await?;

        let (issuer, edge_name, predecessor) = match self.flow {
            FlowVariant::Official => (&member.entity.actor, "le", &member.entity.credential),
            FlowVariant::Direct => (&member.actor, "oor", &member.oor_credential),
        };
        self.introduce(issuer, &actor).await?;

        let ecr = IssueRequest::new(issuer.alias(), issuer.registry()?, CredentialKind::Ecr, actor.prefix())
            .attribute("engagementContextRole", agent.engagement_context_role.as_str())
            .attribute("agentType", agent.agent_type.as_str())
            .attribute("personLegalName", member.plan.legal_name.as_str())
            .attribute("LEI", lei)
            .edge(edge_name, edge_to(predecessor))
            .rules(ecr_rules());
        self.issue(issuer, &actor, ecr, summary).await?;
        Ok(())
    }

    async fn create_actor(
        &self,
        alias: &str,
        role: ActorRole,
        lei: Option<&str>,
        title: Option<&str>,
        registry_name: Option<&str>,
        summary: &mut SetupSummary,
    ) -> Result<Actor> {
        let policy = self.sessions.config().witness_policy.clone();
        let session = self.sessions.create_session().await?;
        let prefix = self.sessions.create_identity(&session, alias, &policy).await?;
        self.sessions.assign_role(&session, alias).await?;
        let link = self.sessions.issue_introduction_link(&session, alias).await?;

        let mut identity = Identity::new(alias, prefix.clone(), role);
        if let Some(lei) = lei {
            identity = identity.with_lei(lei);
        }
        if let Some(title) = title {
            identity = identity.with_title(title);
        }
        identity.add_introduction_link(link.clone());

        if let Some(name) = registry_name {
            let identifier = self.sessions.create_registry(&session, alias, name).await?;
            self.storage.save_registry(&Registry {
                name: name.to_string(),
                identifier: identifier.clone(),
                owner_alias: alias.to_string(),
                owner_prefix: prefix.clone(),
                created_at: Utc::now(),
            })?;
            identity = identity.with_registry(identifier);
        }

        self.storage.save_identity(&identity)?;
        summary.actors.push(ActorSummary {
            alias: alias.to_string(),
            role,
            prefix,
        });
        tracing::info!(alias, role = %role, "actor ready");
        Ok(Actor {
            identity,
            session,
            link,
        })
    }

    /// Resolve each actor's introduction link in the other's session.
    async fn introduce(&self, a: &Actor, b: &Actor) -> Result<()> {
        for (from, to) in [(a, b), (b, a)] {
            self.sessions
                .accept_introduction_link(&from.session, &to.link, to.alias())
                .await?;
            self.storage.save_introduction(&IntroductionRecord {
                alias: from.alias().to_string(),
                link: to.link.clone(),
                contact_alias: to.alias().to_string(),
                resolved_at: Utc::now(),
            })?;
        }
        Ok(())
    }

    async fn issue(
        &self,
        issuer: &Actor,
        holder: &Actor,
        request: IssueRequest,
        summary: &mut SetupSummary,
    ) -> Result<Credential> {
        let issued = self
            .issuance
            .issue(&issuer.session, &request)
            .await
            .with_context(|| format!("issuing {} to {}", request.schema, holder.alias()))?;

        let mut transfer = Transfer::new(&issued, holder.prefix());
        self.transfers
            .transfer(
                &issuer.session,
                issuer.alias(),
                &holder.session,
                holder.alias(),
                &mut transfer,
            )
            .await
            .with_context(|| format!("transferring {} to {}", issued.said, holder.alias()))?;

        let credential = issued.to_credential()?;
        self.storage.save_credential(&credential)?;
        summary.credentials.push(IssuedSummary {
            kind: credential
                .kind()
                .map(|kind| kind.code().to_string())
                .unwrap_or_else(|| credential.credential_type.clone()),
            said: credential.said.clone(),
            issuer: issuer.alias().to_string(),
            holder: holder.alias().to_string(),
        });
        Ok(credential)
    }

    async fn commit_pause(&self) {
        let delay = self.sessions.config().commit_delay();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "waiting for issuance to settle");
            tokio::time::sleep(delay).await;
        }
    }
}

fn edge_to(credential: &Credential) -> Edge {
    Edge::new(&credential.said, &credential.schema)
}
