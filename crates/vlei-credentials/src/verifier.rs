//! Credential chain reconstruction and validation.
//!
//! The chain starts at the deepest credential held by the leaf actor and
//! follows one edge per credential toward the root, choosing among edge
//! names by the flow's priority table. Credentials the walk cannot reach are
//! spliced in by attribute join where the flow declares one.
//!
//! Structural problems never surface as errors: they are reported as invalid
//! links with a reason. The only error is an unknown leaf.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use vlei_core::{Credential, Edge};

use crate::error::CredentialError;
use crate::flow::ChainFlow;
use crate::graph::CredentialGraph;

/// How a chain element reaches the element after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Through the named edge.
    Edge { name: String, edge: Edge },
    /// Through matching subject attributes. `edge` is the edge the walk had
    /// selected on this credential before the join replaced it; it must
    /// still resolve to a credential further up the chain.
    AttributeJoin {
        attributes: Vec<(String, String)>,
        edge: Option<(String, Edge)>,
    },
    /// No qualifying edge; end of the walk.
    Root,
}

#[derive(Debug, Clone)]
pub struct ChainElement {
    /// Key the credential was found under.
    pub key: String,
    pub credential: Credential,
    pub link: Link,
}

/// An ordered credential chain, leaf first.
#[derive(Debug, Clone)]
pub struct Chain {
    pub leaf_alias: String,
    pub expected_length: usize,
    pub elements: Vec<ChainElement>,
    /// Non-fatal observations made while building.
    pub warnings: Vec<String>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.elements.len() == self.expected_length
    }

    pub fn credentials(&self) -> Vec<Credential> {
        self.elements
            .iter()
            .map(|element| element.credential.clone())
            .collect()
    }
}

/// Why a link failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFault {
    Revoked,
    /// The record under a lookup key carries another said.
    KeyMismatch { key: String, said: String },
    PredecessorNotFound { said: String },
    /// The predecessor found for an edge carries another said.
    SaidMismatch { declared: String, actual: String },
    SchemaMismatch { declared: String, actual: String },
    /// The edge resolves, but not to the next chain element.
    EdgeTargetMismatch { declared: String, next: String },
    JoinMismatch { attribute: String },
    Cycle { said: String },
}

impl fmt::Display for LinkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revoked => write!(f, "credential status is revoked"),
            Self::KeyMismatch { key, said } => {
                write!(f, "said mismatch: stored {} under {}, credential may be tampered", said, key)
            }
            Self::PredecessorNotFound { said } => write!(f, "predecessor {} not found", said),
            Self::SaidMismatch { declared, actual } => {
                write!(f, "edge said mismatch: {} != {}", declared, actual)
            }
            Self::SchemaMismatch { declared, actual } => {
                write!(f, "edge schema mismatch: {} != {}", declared, actual)
            }
            Self::EdgeTargetMismatch { declared, next } => {
                write!(f, "edge points to {} but next credential is {}", declared, next)
            }
            Self::JoinMismatch { attribute } => {
                write!(f, "attribute {} does not match next credential", attribute)
            }
            Self::Cycle { said } => write!(f, "edge cycles back to {}", said),
        }
    }
}

/// Validation of one chain element and its link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResult {
    pub position: usize,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub said: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip)]
    pub fault: Option<LinkFault>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    /// Every link valid and the chain complete.
    pub valid: bool,
    pub complete: bool,
    pub expected_length: usize,
    pub links: Vec<LinkResult>,
    /// Validated prefix of the chain, up to and including the first failure.
    pub chain: Vec<Credential>,
}

impl ChainVerification {
    pub fn all_links_valid(&self) -> bool {
        self.links.iter().all(|link| link.valid)
    }

    pub fn invalid_links(&self) -> impl Iterator<Item = &LinkResult> {
        self.links.iter().filter(|link| !link.valid)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeResult {
    pub from: String,
    pub to: String,
    /// Edge name, or the joined attributes.
    pub edge_name: String,
    pub joined: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeVerification {
    pub valid: bool,
    pub edges: Vec<EdgeResult>,
}

impl EdgeVerification {
    pub fn invalid_count(&self) -> usize {
        self.edges.iter().filter(|edge| !edge.valid).count()
    }
}

/// Builds and validates chains over a [`CredentialGraph`].
pub struct ChainVerifier<'a> {
    graph: &'a CredentialGraph,
    flow: ChainFlow,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(graph: &'a CredentialGraph, flow: ChainFlow) -> Self {
        Self { graph, flow }
    }

    pub fn flow(&self) -> &ChainFlow {
        &self.flow
    }

    pub fn build_chain(&self, leaf_alias: &str) -> Result<Chain, CredentialError> {
        let identity = self
            .graph
            .identity(leaf_alias)
            .ok_or_else(|| CredentialError::NotFound(format!("identity {}", leaf_alias)))?;
        let terminal = self.flow.terminal_kind(identity.role).ok_or_else(|| {
            CredentialError::NotFound(format!("{} ({}) holds no credential", leaf_alias, identity.role))
        })?;
        let candidates = self.graph.issued_to(&identity.prefix, terminal);
        let (leaf_key, leaf) = candidates.first().ok_or_else(|| {
            CredentialError::NotFound(format!("no {} credential issued to {}", terminal.label(), leaf_alias))
        })?;

        let mut warnings = Vec::new();
        let mut elements = self.follow(leaf_key, leaf, &HashSet::new(), &mut warnings);
        self.splice_joined(&mut elements, &mut warnings);

        let chain = Chain {
            leaf_alias: leaf_alias.to_string(),
            expected_length: self.flow.expected_length(terminal),
            elements,
            warnings,
        };
        tracing::debug!(
            leaf = leaf_alias,
            length = chain.len(),
            expected = chain.expected_length,
            "chain built"
        );
        Ok(chain)
    }

    /// Walk edges from `start` until no qualifying edge remains, the target
    /// is missing, or the target is already known or already walked.
    fn follow(
        &self,
        start_key: &str,
        start: &Credential,
        known: &HashSet<String>,
        warnings: &mut Vec<String>,
    ) -> Vec<ChainElement> {
        let mut segment: Vec<ChainElement> = Vec::new();
        let mut walked: HashSet<String> = HashSet::new();
        let mut key = start_key.to_string();
        let mut current = start.clone();

        loop {
            walked.insert(key.clone());
            let selected = current.kind().and_then(|kind| {
                self.flow
                    .candidate_edges(kind)
                    .iter()
                    .find_map(|rule| current.edge(rule.name).map(|edge| (*rule, edge.clone())))
            });

            let Some((rule, edge)) = selected else {
                segment.push(ChainElement {
                    key,
                    credential: current,
                    link: Link::Root,
                });
                break;
            };

            let target = edge.target_said.clone();
            segment.push(ChainElement {
                key,
                credential: current,
                link: Link::Edge {
                    name: rule.name.to_string(),
                    edge,
                },
            });

            if known.contains(&target) || walked.contains(&target) {
                break;
            }
            let Some(next) = self.graph.credential(&target) else {
                break;
            };
            if next.kind() != Some(rule.predecessor) {
                warnings.push(format!(
                    "edge {} reaches {} where {} is expected",
                    rule.name, next.credential_type, rule.predecessor.label()
                ));
            }
            key = target;
            current = next.clone();
        }

        segment
    }

    fn splice_joined(&self, elements: &mut Vec<ChainElement>, warnings: &mut Vec<String>) {
        let Some(join) = self.flow.join() else {
            return;
        };
        if elements
            .iter()
            .any(|element| element.credential.kind() == Some(join.target))
        {
            return;
        }
        let Some(source_index) = elements
            .iter()
            .position(|element| element.credential.kind() == Some(join.source))
        else {
            return;
        };

        let source = &elements[source_index].credential;
        let values: Option<Vec<(String, String)>> = join
            .attributes
            .iter()
            .map(|name| {
                source
                    .attribute_str(name)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();
        let Some(values) = values else {
            return;
        };

        let mut candidates: Vec<(&String, &Credential)> = self
            .graph
            .credentials()
            .filter(|(_, credential)| {
                credential.kind() == Some(join.target)
                    && values
                        .iter()
                        .all(|(name, value)| credential.attribute_str(name) == Some(value.as_str()))
            })
            .collect();
        candidates.sort_by(|a, b| b.1.issued_at.cmp(&a.1.issued_at).then_with(|| a.0.cmp(b.0)));

        let Some(&(key, candidate)) = candidates.first() else {
            return;
        };
        if candidates.len() > 1 {
            let message = format!(
                "{} {} credentials match the subject; using most recent {}",
                candidates.len(),
                join.target.label(),
                key
            );
            tracing::warn!(target_kind = %join.target, matches = candidates.len(), "ambiguous attribute join");
            warnings.push(message);
        }

        let known: HashSet<String> = elements.iter().map(|element| element.key.clone()).collect();
        let segment = self.follow(key, candidate, &known, warnings);
        let selected = match std::mem::replace(&mut elements[source_index].link, Link::Root) {
            Link::Edge { name, edge } => Some((name, edge)),
            _ => None,
        };
        elements[source_index].link = Link::AttributeJoin {
            attributes: values,
            edge: selected,
        };
        let at = source_index + 1;
        elements.splice(at..at, segment);
    }

    /// Validate every link of the built chain, stopping at the first failure.
    pub fn verify_chain(&self, leaf_alias: &str) -> Result<ChainVerification, CredentialError> {
        let chain = self.build_chain(leaf_alias)?;
        Ok(self.verify_built(&chain))
    }

    pub fn verify_built(&self, chain: &Chain) -> ChainVerification {
        let mut links = Vec::with_capacity(chain.len());
        let mut validated = Vec::with_capacity(chain.len());

        for (position, element) in chain.elements.iter().enumerate() {
            let fault = self.link_fault(element, &chain.elements[position + 1..]);
            let valid = fault.is_none();

            links.push(LinkResult {
                position,
                credential_type: element.credential.credential_type.clone(),
                said: element.credential.said.clone(),
                valid,
                reason: fault.as_ref().map(ToString::to_string),
                fault,
            });
            validated.push(element.credential.clone());

            if !valid {
                tracing::info!(
                    leaf = %chain.leaf_alias,
                    position,
                    reason = links[position].reason.as_deref().unwrap_or_default(),
                    "chain link invalid"
                );
                break;
            }
        }

        let complete = validated.len() == chain.expected_length;
        let valid = complete && links.iter().all(|link| link.valid);
        ChainVerification {
            valid,
            complete,
            expected_length: chain.expected_length,
            links,
            chain: validated,
        }
    }

    /// `rest` holds the elements after `element`.
    fn link_fault(&self, element: &ChainElement, rest: &[ChainElement]) -> Option<LinkFault> {
        let next = rest.first();
        let credential = &element.credential;
        if credential.is_revoked() {
            return Some(LinkFault::Revoked);
        }
        if element.key != credential.said {
            return Some(LinkFault::KeyMismatch {
                key: element.key.clone(),
                said: credential.said.clone(),
            });
        }

        match &element.link {
            Link::Root => None,
            Link::AttributeJoin { attributes, edge } => {
                let next = next?;
                if let Some(fault) = join_mismatch(attributes, next) {
                    return Some(fault);
                }
                let (_, edge) = edge.as_ref()?;
                if let Some(fault) = self.edge_fault(edge) {
                    return Some(fault);
                }
                if rest.iter().any(|later| later.key == edge.target_said) {
                    None
                } else {
                    Some(LinkFault::EdgeTargetMismatch {
                        declared: edge.target_said.clone(),
                        next: next.key.clone(),
                    })
                }
            }
            Link::Edge { edge, .. } => {
                if let Some(fault) = self.edge_fault(edge) {
                    return Some(fault);
                }
                match next {
                    Some(next) if next.key != edge.target_said => Some(LinkFault::EdgeTargetMismatch {
                        declared: edge.target_said.clone(),
                        next: next.key.clone(),
                    }),
                    Some(_) => None,
                    None => Some(LinkFault::Cycle {
                        said: edge.target_said.clone(),
                    }),
                }
            }
        }
    }

    /// Resolve `edge` against the graph: the predecessor must exist under
    /// the declared said and carry the declared schema.
    fn edge_fault(&self, edge: &Edge) -> Option<LinkFault> {
        let Some(predecessor) = self.graph.credential(&edge.target_said) else {
            return Some(LinkFault::PredecessorNotFound {
                said: edge.target_said.clone(),
            });
        };
        if predecessor.said != edge.target_said {
            return Some(LinkFault::SaidMismatch {
                declared: edge.target_said.clone(),
                actual: predecessor.said.clone(),
            });
        }
        if predecessor.schema != edge.target_schema {
            return Some(LinkFault::SchemaMismatch {
                declared: edge.target_schema.clone(),
                actual: predecessor.schema.clone(),
            });
        }
        None
    }

    /// Check every adjacent pair of the full built chain.
    pub fn verify_edges(&self, leaf_alias: &str) -> Result<EdgeVerification, CredentialError> {
        let chain = self.build_chain(leaf_alias)?;
        Ok(self.verify_built_edges(&chain))
    }

    pub fn verify_built_edges(&self, chain: &Chain) -> EdgeVerification {
        let edges: Vec<EdgeResult> = chain
            .elements
            .windows(2)
            .map(|pair| self.edge_result(&pair[0], &pair[1]))
            .collect();
        EdgeVerification {
            valid: edges.iter().all(|edge| edge.valid),
            edges,
        }
    }

    fn edge_result(&self, current: &ChainElement, next: &ChainElement) -> EdgeResult {
        let from = current.credential.credential_type.clone();
        let to = next.credential.credential_type.clone();

        if let Link::AttributeJoin { attributes, edge } = &current.link {
            let names: Vec<&str> = attributes.iter().map(|(name, _)| name.as_str()).collect();
            let reason = match join_mismatch(attributes, next) {
                Some(LinkFault::JoinMismatch { attribute }) => {
                    Some(format!("attribute {} does not match", attribute))
                }
                Some(other) => Some(other.to_string()),
                None => edge.as_ref().and_then(|(name, edge)| {
                    self.edge_fault(edge)
                        .map(|fault| format!("edge {}: {}", name, fault))
                }),
            };
            return EdgeResult {
                from,
                to,
                edge_name: names.join("+"),
                joined: true,
                valid: reason.is_none(),
                reason,
            };
        }

        let found = current.credential.edges.as_ref().and_then(|edges| {
            edges
                .iter()
                .find(|(_, edge)| edge.target_said == next.credential.said)
        });

        match found {
            None => EdgeResult {
                from,
                to,
                edge_name: "unknown".into(),
                joined: false,
                valid: false,
                reason: Some(if current.credential.has_edges() {
                    "edge does not reference next credential".into()
                } else {
                    "no edge found".into()
                }),
            },
            Some((name, edge)) if edge.target_schema != next.credential.schema => EdgeResult {
                from,
                to,
                edge_name: name.clone(),
                joined: false,
                valid: false,
                reason: Some(format!(
                    "edge schema mismatch: {} != {}",
                    edge.target_schema, next.credential.schema
                )),
            },
            Some((name, _)) => EdgeResult {
                from,
                to,
                edge_name: name.clone(),
                joined: false,
                valid: true,
                reason: None,
            },
        }
    }
}

fn join_mismatch(attributes: &[(String, String)], next: &ChainElement) -> Option<LinkFault> {
    attributes
        .iter()
        .find(|(name, value)| next.credential.attribute_str(name) != Some(value.as_str()))
        .map(|(name, _)| LinkFault::JoinMismatch {
            attribute: name.clone(),
        })
}
