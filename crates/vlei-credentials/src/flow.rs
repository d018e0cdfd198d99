//! Chain flow tables.
//!
//! A flow says, per credential kind, which edge names lead to the
//! predecessor and in what priority, which kinds are reconciled by attribute
//! join rather than an edge, and the canonical order of a complete chain.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vlei_core::{ActorRole, CoreError, CredentialKind};

/// Edge name to follow and the kind it is expected to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRule {
    pub name: &'static str,
    pub predecessor: CredentialKind,
}

/// Splice rule for a target credential the edge walk cannot reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeJoin {
    /// Kind whose attributes identify the subject.
    pub source: CredentialKind,
    /// Kind located by matching those attributes.
    pub target: CredentialKind,
    pub attributes: &'static [&'static str],
}

/// Named issuance topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowVariant {
    /// QVI issues OOR against an LE-issued authorization; LE issues ECR.
    #[default]
    Official,
    /// LE issues OOR; the person issues ECR.
    Direct,
}

impl FlowVariant {
    pub fn flow(&self) -> ChainFlow {
        match self {
            Self::Official => ChainFlow::official(),
            Self::Direct => ChainFlow::direct(),
        }
    }
}

impl fmt::Display for FlowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Official => write!(f, "official"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

impl FromStr for FlowVariant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "official" => Ok(Self::Official),
            "direct" => Ok(Self::Direct),
            other => Err(CoreError::ValidationError(format!(
                "unknown flow variant: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFlow {
    pub variant: FlowVariant,
    edges: BTreeMap<CredentialKind, Vec<EdgeRule>>,
    join: Option<AttributeJoin>,
    /// Complete chain order, deepest kind first.
    canonical: Vec<CredentialKind>,
}

impl ChainFlow {
    pub fn official() -> Self {
        use CredentialKind::*;
        Self {
            variant: FlowVariant::Official,
            edges: BTreeMap::from([
                (
                    Ecr,
                    vec![
                        EdgeRule { name: "oor", predecessor: Oor },
                        EdgeRule { name: "le", predecessor: LegalEntity },
                    ],
                ),
                (Oor, vec![EdgeRule { name: "auth", predecessor: OorAuth }]),
                (OorAuth, vec![EdgeRule { name: "le", predecessor: LegalEntity }]),
                (LegalEntity, vec![EdgeRule { name: "qvi", predecessor: Qvi }]),
            ]),
            join: Some(AttributeJoin {
                source: Ecr,
                target: Oor,
                attributes: &["personLegalName", "LEI"],
            }),
            canonical: vec![Ecr, Oor, OorAuth, LegalEntity, Qvi],
        }
    }

    pub fn direct() -> Self {
        use CredentialKind::*;
        Self {
            variant: FlowVariant::Direct,
            edges: BTreeMap::from([
                (Ecr, vec![EdgeRule { name: "oor", predecessor: Oor }]),
                (Oor, vec![EdgeRule { name: "le", predecessor: LegalEntity }]),
                (LegalEntity, vec![EdgeRule { name: "qvi", predecessor: Qvi }]),
            ]),
            join: None,
            canonical: vec![Ecr, Oor, LegalEntity, Qvi],
        }
    }

    /// Candidate edges of `kind`, highest priority first.
    pub fn candidate_edges(&self, kind: CredentialKind) -> &[EdgeRule] {
        self.edges.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn join(&self) -> Option<&AttributeJoin> {
        self.join.as_ref()
    }

    pub fn canonical(&self) -> &[CredentialKind] {
        &self.canonical
    }

    /// Deepest credential an actor of `role` holds. The root holds none.
    pub fn terminal_kind(&self, role: ActorRole) -> Option<CredentialKind> {
        match role {
            ActorRole::Root => None,
            ActorRole::IntermediateIssuer => Some(CredentialKind::Qvi),
            ActorRole::Organization => Some(CredentialKind::LegalEntity),
            ActorRole::Person => Some(CredentialKind::Oor),
            ActorRole::Agent => Some(CredentialKind::Ecr),
        }
    }

    /// Length of a complete chain starting at `kind`.
    pub fn expected_length(&self, kind: CredentialKind) -> usize {
        self.canonical
            .iter()
            .position(|k| *k == kind)
            .map(|index| self.canonical.len() - index)
            .unwrap_or(1)
    }
}

impl Default for ChainFlow {
    fn default() -> Self {
        Self::official()
    }
}
