use serde::{Deserialize, Serialize};

/// Points awarded per structural predicate.
const POINTS_CHAIN_VALID: u8 = 30;
const POINTS_EDGES_VALID: u8 = 25;
const POINTS_COMPLETE_LENGTH: u8 = 20;
const POINTS_ALL_LINKS_VALID: u8 = 20;
/// Bonus when all four predicates hold.
const POINTS_ALL_PASS: u8 = 5;

const MAX_SCORE: u8 = 100;

const HIGH_THRESHOLD: u8 = 90;
const MEDIUM_THRESHOLD: u8 = 75;
const REVIEW_THRESHOLD: u8 = 60;
const CRITICAL_THRESHOLD: u8 = 40;

/// The structural results a score is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInputs {
    pub chain_valid: bool,
    pub edges_valid: bool,
    pub chain_length: usize,
    pub expected_length: usize,
    pub all_links_valid: bool,
}

impl ScoreInputs {
    pub fn complete_length(&self) -> bool {
        self.chain_length == self.expected_length
    }

    /// Point-additive score in `[0, 100]`.
    pub fn score(&self) -> u8 {
        let mut score = 0u8;
        if self.chain_valid {
            score += POINTS_CHAIN_VALID;
        }
        if self.edges_valid {
            score += POINTS_EDGES_VALID;
        }
        if self.complete_length() {
            score += POINTS_COMPLETE_LENGTH;
        }
        if self.all_links_valid {
            score += POINTS_ALL_LINKS_VALID;
        }
        if self.chain_valid && self.edges_valid && self.complete_length() && self.all_links_valid {
            score += POINTS_ALL_PASS;
        }
        score.min(MAX_SCORE)
    }

    pub fn decision(&self) -> TrustDecision {
        TrustDecision::from_inputs(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn assess(score: u8, edges_valid: bool) -> Self {
        if score < CRITICAL_THRESHOLD {
            Self::Critical
        } else if !edges_valid || score < MEDIUM_THRESHOLD {
            Self::High
        } else if score < HIGH_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approved,
    ApprovedWithConditions,
    ReviewRequired,
    Rejected,
}

impl Recommendation {
    pub fn from_score(score: u8, chain_valid: bool) -> Self {
        if score >= HIGH_THRESHOLD && chain_valid {
            Self::Approved
        } else if score >= MEDIUM_THRESHOLD && chain_valid {
            Self::ApprovedWithConditions
        } else if score >= REVIEW_THRESHOLD {
            Self::ReviewRequired
        } else {
            Self::Rejected
        }
    }
}

/// Score plus its ordinal mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustDecision {
    pub approved: bool,
    pub confidence: Confidence,
    pub trust_score: u8,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
}

impl TrustDecision {
    pub fn from_inputs(inputs: &ScoreInputs) -> Self {
        let score = inputs.score();
        Self {
            approved: score >= MEDIUM_THRESHOLD && inputs.chain_valid,
            confidence: Confidence::from_score(score),
            trust_score: score,
            risk_level: RiskLevel::assess(score, inputs.edges_valid),
            recommendation: Recommendation::from_score(score, inputs.chain_valid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(chain: bool, edges: bool, complete: bool, links: bool) -> ScoreInputs {
        ScoreInputs {
            chain_valid: chain,
            edges_valid: edges,
            chain_length: if complete { 5 } else { 3 },
            expected_length: 5,
            all_links_valid: links,
        }
    }

    fn subsets() -> Vec<[bool; 4]> {
        (0..16u8)
            .map(|bits| [bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0])
            .collect()
    }

    #[test]
    fn test_perfect_score() {
        let decision = inputs(true, true, true, true).decision();
        assert_eq!(decision.trust_score, 100);
        assert!(decision.approved);
        assert_eq!(decision.confidence, Confidence::High);
        assert_eq!(decision.risk_level, RiskLevel::Low);
        assert_eq!(decision.recommendation, Recommendation::Approved);
    }

    #[test]
    fn test_zero_score() {
        let decision = inputs(false, false, false, false).decision();
        assert_eq!(decision.trust_score, 0);
        assert!(!decision.approved);
        assert_eq!(decision.risk_level, RiskLevel::Critical);
        assert_eq!(decision.recommendation, Recommendation::Rejected);
    }

    #[test]
    fn test_point_values() {
        assert_eq!(inputs(true, false, false, false).score(), 30);
        assert_eq!(inputs(false, true, false, false).score(), 25);
        assert_eq!(inputs(false, false, true, false).score(), 20);
        assert_eq!(inputs(false, false, false, true).score(), 20);
        assert_eq!(inputs(true, true, true, false).score(), 75);
    }

    #[test]
    fn test_score_monotonic_over_predicates() {
        for a in subsets() {
            for b in subsets() {
                let superset = a.iter().zip(b.iter()).all(|(x, y)| !*x || *y);
                if !superset {
                    continue;
                }
                let low = inputs(a[0], a[1], a[2], a[3]).score();
                let high = inputs(b[0], b[1], b[2], b[3]).score();
                assert!(high >= low, "{:?} -> {:?}", a, b);
                assert!(high <= 100);
            }
        }
    }

    #[test]
    fn test_invalid_edges_raise_risk() {
        // Chain valid, complete, all links valid, edges broken: 70 points.
        let decision = inputs(true, false, true, true).decision();
        assert_eq!(decision.trust_score, 70);
        assert_eq!(decision.risk_level, RiskLevel::High);
        assert_eq!(decision.recommendation, Recommendation::ReviewRequired);
        assert!(!decision.approved);
    }

    #[test]
    fn test_conditional_approval() {
        let decision = inputs(true, true, true, false).decision();
        assert_eq!(decision.trust_score, 75);
        assert_eq!(decision.confidence, Confidence::Medium);
        assert_eq!(decision.risk_level, RiskLevel::Medium);
        assert_eq!(decision.recommendation, Recommendation::ApprovedWithConditions);
        assert!(decision.approved);
    }

    #[test]
    fn test_risk_boundaries() {
        assert_eq!(RiskLevel::assess(39, true), RiskLevel::Critical);
        assert_eq!(RiskLevel::assess(40, true), RiskLevel::High);
        assert_eq!(RiskLevel::assess(74, true), RiskLevel::High);
        assert_eq!(RiskLevel::assess(75, true), RiskLevel::Medium);
        assert_eq!(RiskLevel::assess(89, true), RiskLevel::Medium);
        assert_eq!(RiskLevel::assess(90, true), RiskLevel::Low);
        assert_eq!(RiskLevel::assess(95, false), RiskLevel::High);
        assert_eq!(RiskLevel::assess(20, false), RiskLevel::Critical);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_value(inputs(true, true, true, true).decision()).unwrap();
        assert_eq!(json["trustScore"], 100);
        assert_eq!(json["riskLevel"], "LOW");
        assert_eq!(
            serde_json::to_value(Recommendation::ApprovedWithConditions).unwrap(),
            "APPROVED_WITH_CONDITIONS"
        );
    }
}
