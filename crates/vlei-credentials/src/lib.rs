//! vLEI Credentials: issuance, transfer handshake, chain verification and
//! trust scoring.

pub mod decision;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod flow;
pub mod graph;
pub mod issuer;
pub mod transfer;
pub mod trust_score;
pub mod verifier;

pub use decision::{report, Decision, VerificationReport};
pub use error::CredentialError;
pub use flow::{AttributeJoin, ChainFlow, EdgeRule, FlowVariant};
pub use graph::CredentialGraph;
pub use issuer::{credential_from_record, Completion, IssuanceCoordinator, IssueRequest, Issued};
pub use transfer::{Transfer, TransferCoordinator};
pub use trust_score::{Confidence, Recommendation, RiskLevel, ScoreInputs, TrustDecision};
pub use verifier::{
    Chain, ChainElement, ChainVerification, ChainVerifier, EdgeResult, EdgeVerification, Link,
    LinkFault, LinkResult,
};
