use std::collections::{BTreeMap, HashMap};

use vlei_core::{ActorRole, Credential, CredentialKind, Identity};

/// Read-only view of persisted identities and credentials, rebuilt per
/// verification.
#[derive(Debug, Clone, Default)]
pub struct CredentialGraph {
    identities: Vec<Identity>,
    by_alias: HashMap<String, usize>,
    by_prefix: HashMap<String, usize>,
    credentials: BTreeMap<String, Credential>,
}

impl CredentialGraph {
    /// Index credentials under their own said.
    pub fn new(identities: Vec<Identity>, credentials: Vec<Credential>) -> Self {
        Self::from_keyed(
            identities,
            credentials
                .into_iter()
                .map(|credential| (credential.said.clone(), credential)),
        )
    }

    /// Index credentials under explicit lookup keys. A key that differs from
    /// the stored said is a consistency fault the verifier reports.
    pub fn from_keyed(
        identities: Vec<Identity>,
        credentials: impl IntoIterator<Item = (String, Credential)>,
    ) -> Self {
        let mut graph = Self {
            credentials: credentials.into_iter().collect(),
            ..Self::default()
        };
        for identity in identities {
            graph.insert_identity(identity);
        }
        graph
    }

    fn insert_identity(&mut self, identity: Identity) {
        if let Some(&index) = self.by_alias.get(&identity.alias) {
            self.by_prefix.remove(&self.identities[index].prefix);
            self.by_prefix.insert(identity.prefix.clone(), index);
            self.identities[index] = identity;
            return;
        }
        let index = self.identities.len();
        self.by_alias.insert(identity.alias.clone(), index);
        self.by_prefix.insert(identity.prefix.clone(), index);
        self.identities.push(identity);
    }

    /// Look up by alias, then by protocol identifier.
    pub fn identity(&self, key: &str) -> Option<&Identity> {
        self.by_alias
            .get(key)
            .or_else(|| self.by_prefix.get(key))
            .map(|&index| &self.identities[index])
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn agents(&self) -> impl Iterator<Item = &Identity> {
        self.identities
            .iter()
            .filter(|identity| identity.role == ActorRole::Agent)
    }

    pub fn credential(&self, key: &str) -> Option<&Credential> {
        self.credentials.get(key)
    }

    pub fn credentials(&self) -> impl Iterator<Item = (&String, &Credential)> {
        self.credentials.iter()
    }

    /// Credentials of `kind` held by `prefix`, most recently issued first.
    pub fn issued_to(&self, prefix: &str, kind: CredentialKind) -> Vec<(&String, &Credential)> {
        let mut found: Vec<_> = self
            .credentials
            .iter()
            .filter(|(_, credential)| credential.issuee == prefix && credential.kind() == Some(kind))
            .collect();
        found.sort_by(|a, b| b.1.issued_at.cmp(&a.1.issued_at).then_with(|| a.0.cmp(b.0)));
        found
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use vlei_core::CredentialStatus;

    fn credential(said: &str, issuee: &str, kind: CredentialKind, age_minutes: i64) -> Credential {
        Credential {
            said: said.into(),
            credential_type: kind.label().into(),
            issuer: "Eissuer".into(),
            issuee: issuee.into(),
            schema: kind.schema().into(),
            registry: "Ereg".into(),
            status: CredentialStatus::Issued,
            lei: None,
            attributes: Default::default(),
            edges: None,
            rules: None,
            issued_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_identity_lookup_by_alias_or_prefix() {
        let graph = CredentialGraph::new(
            vec![Identity::new("agent-1", "EAgent", ActorRole::Agent)],
            vec![],
        );
        assert_eq!(graph.identity("agent-1").unwrap().prefix, "EAgent");
        assert_eq!(graph.identity("EAgent").unwrap().alias, "agent-1");
        assert!(graph.identity("agent-2").is_none());
        assert_eq!(graph.agents().count(), 1);
    }

    #[test]
    fn test_duplicate_alias_replaces() {
        let graph = CredentialGraph::new(
            vec![
                Identity::new("jupiter", "EOld", ActorRole::Organization),
                Identity::new("jupiter", "ENew", ActorRole::Organization),
            ],
            vec![],
        );
        assert_eq!(graph.identity_count(), 1);
        assert!(graph.identity("EOld").is_none());
        assert_eq!(graph.identity("jupiter").unwrap().prefix, "ENew");
    }

    #[test]
    fn test_issued_to_newest_first() {
        let graph = CredentialGraph::new(
            vec![],
            vec![
                credential("E1", "EAgent", CredentialKind::Ecr, 30),
                credential("E2", "EAgent", CredentialKind::Ecr, 5),
                credential("E3", "EAgent", CredentialKind::Oor, 1),
                credential("E4", "EOther", CredentialKind::Ecr, 1),
            ],
        );
        let found = graph.issued_to("EAgent", CredentialKind::Ecr);
        let saids: Vec<_> = found.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(saids, vec!["E2", "E1"]);
    }

    #[test]
    fn test_keyed_construction() {
        let graph = CredentialGraph::from_keyed(
            vec![],
            vec![(
                "Ekey".to_string(),
                credential("Eother", "EAgent", CredentialKind::Qvi, 0),
            )],
        );
        assert_eq!(graph.credential("Ekey").unwrap().said, "Eother");
        assert_eq!(graph.credential_count(), 1);
    }
}
