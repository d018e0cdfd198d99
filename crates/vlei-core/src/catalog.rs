//! Credential kinds, their schema ids, and the rules blocks attached at
//! issuance.

use std::fmt;

use serde_json::{json, Value};

use crate::error::CoreError;

pub const QVI_SCHEMA: &str = "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao";
pub const LEGAL_ENTITY_SCHEMA: &str = "ENPXp1vQzRF6JwIuS-mp2U8Uf1MoADoP_GqQ62VsDZWY";
pub const OOR_SCHEMA: &str = "EBNaNu-M9P5cgrnfl2Fvymy4E_jvxxyjb70PRtiANlJy";
pub const OOR_AUTH_SCHEMA: &str = "EKA57bKBKxr_kN7iN5i7lMUxpMG-s19dRcmov1iDxz-E";
pub const ECR_SCHEMA: &str = "EEy9PkikFcANV1l7EHukCeXqrzT1hNZjGlUk7wuMO5jw";

/// Operator carried by the OOR `auth` edge.
pub const ISSUER_TO_ISSUEE: &str = "I2I";

const USAGE_DISCLAIMER: &str = "Usage of a valid, unexpired, and non-revoked vLEI Credential, as defined in the associated Ecosystem Governance Framework, does not assert that the Legal Entity is trustworthy, honest, reputable in its business dealings, safe to do business with, or compliant with any laws or that an implied or expressly intended purpose will be fulfilled.";

const ISSUANCE_DISCLAIMER: &str = "All information in a valid, unexpired, and non-revoked vLEI Credential, as defined in the associated Ecosystem Governance Framework, is accurate as of the date the validation process was complete. The vLEI Credential has been issued to the legal entity or person named in the vLEI Credential as the subject; and the qualified vLEI Issuer exercised reasonable care to perform the validation process set forth in the vLEI Ecosystem Governance Framework.";

const ECR_PRIVACY_DISCLAIMER: &str = "It is the sole responsibility of Holders as Issuees of an ECR vLEI Credential to present that Credential in a privacy-preserving manner using the mechanisms provided in the Issuance and Presentation Exchange (IPEX) protocol specification and the Authentic Chained Data Container (ACDC) specification. https://github.com/WebOfTrust/IETF-IPEX and https://github.com/trustoverip/tswg-acdc-specification.";

/// The five credential kinds of the delegation hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialKind {
    Qvi,
    LegalEntity,
    OorAuth,
    Oor,
    Ecr,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 5] = [
        Self::Qvi,
        Self::LegalEntity,
        Self::OorAuth,
        Self::Oor,
        Self::Ecr,
    ];

    pub fn schema(&self) -> &'static str {
        match self {
            Self::Qvi => QVI_SCHEMA,
            Self::LegalEntity => LEGAL_ENTITY_SCHEMA,
            Self::OorAuth => OOR_AUTH_SCHEMA,
            Self::Oor => OOR_SCHEMA,
            Self::Ecr => ECR_SCHEMA,
        }
    }

    /// Display label persisted as the credential `type`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Qvi => "QVI",
            Self::LegalEntity => "Legal Entity vLEI",
            Self::OorAuth => "OOR Authorization",
            Self::Oor => "Official Organizational Role",
            Self::Ecr => "Engagement Context Role",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Qvi => "QVI",
            Self::LegalEntity => "LE",
            Self::OorAuth => "OOR_AUTH",
            Self::Oor => "OOR",
            Self::Ecr => "ECR",
        }
    }

    pub fn from_schema(schema: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.schema() == schema)
    }

    /// Resolve a display label or short code. Exact matches win; otherwise
    /// the most specific keyword found in the label decides.
    pub fn from_label(label: &str) -> Option<Self> {
        if let Some(kind) = Self::ALL
            .into_iter()
            .find(|kind| kind.label() == label || kind.code() == label)
        {
            return Some(kind);
        }
        if label.contains("Engagement") || label.contains("ECR") {
            Some(Self::Ecr)
        } else if label.contains("Authorization") || label.contains("AUTH") {
            Some(Self::OorAuth)
        } else if label.contains("Official") || label.contains("OOR") {
            Some(Self::Oor)
        } else if label.contains("Legal Entity") {
            Some(Self::LegalEntity)
        } else if label.contains("QVI") {
            Some(Self::Qvi)
        } else {
            None
        }
    }

    pub fn parse(label: &str) -> Result<Self, CoreError> {
        Self::from_label(label).ok_or_else(|| CoreError::UnknownCredentialKind(label.to_string()))
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Usage and issuance disclaimers. Default rules block.
pub fn standard_rules() -> Value {
    json!({
        "usageDisclaimer": { "l": USAGE_DISCLAIMER },
        "issuanceDisclaimer": { "l": ISSUANCE_DISCLAIMER },
    })
}

/// The OOR schema accepts only the two standard disclaimers.
pub fn oor_rules() -> Value {
    standard_rules()
}

pub fn ecr_rules() -> Value {
    json!({
        "usageDisclaimer": { "l": USAGE_DISCLAIMER },
        "issuanceDisclaimer": { "l": ISSUANCE_DISCLAIMER },
        "privacyDisclaimer": { "l": ECR_PRIVACY_DISCLAIMER },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        for kind in CredentialKind::ALL {
            assert_eq!(CredentialKind::from_schema(kind.schema()), Some(kind));
            assert_eq!(kind.schema().len(), 44);
        }
        assert_eq!(CredentialKind::from_schema("Eunknown"), None);
    }

    #[test]
    fn test_label_exact_match() {
        for kind in CredentialKind::ALL {
            assert_eq!(CredentialKind::from_label(kind.label()), Some(kind));
            assert_eq!(CredentialKind::from_label(kind.code()), Some(kind));
        }
    }

    #[test]
    fn test_label_keyword_match() {
        assert_eq!(
            CredentialKind::from_label("vLEI OOR Authorization Credential"),
            Some(CredentialKind::OorAuth)
        );
        assert_eq!(
            CredentialKind::from_label("Legal Entity Credential"),
            Some(CredentialKind::LegalEntity)
        );
        assert_eq!(
            CredentialKind::from_label("ECR (direct)"),
            Some(CredentialKind::Ecr)
        );
        assert!(CredentialKind::parse("Membership").is_err());
    }

    #[test]
    fn test_rules_blocks() {
        let standard = standard_rules();
        assert!(standard["usageDisclaimer"]["l"].is_string());
        assert!(standard.get("privacyDisclaimer").is_none());
        assert_eq!(oor_rules(), standard);
        assert!(ecr_rules()["privacyDisclaimer"]["l"]
            .as_str()
            .unwrap()
            .contains("privacy-preserving"));
    }
}
