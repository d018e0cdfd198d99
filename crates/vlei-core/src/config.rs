use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Quorum requirement for a new identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessPolicy {
    /// Witness acknowledgements required (`toad`).
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    /// Witness identifiers.
    #[serde(default = "default_witnesses")]
    pub witnesses: Vec<String>,
}

/// Bounded fixed-spacing retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Connection and timing settings shared by every protocol-client session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Agent admin endpoint.
    #[serde(default = "default_admin_url")]
    pub admin_url: String,
    /// Agent boot endpoint.
    #[serde(default = "default_boot_url")]
    pub boot_url: String,
    #[serde(default)]
    pub witness_policy: WitnessPolicy,
    /// Budget for any single asynchronous operation.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Spacing between operation status checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Holder inbox polling while waiting for a grant.
    #[serde(default = "default_notification_retry")]
    pub notification_retry: RetryPolicy,
    /// Wait before the first record lookup after issuance.
    #[serde(default = "default_record_initial_delay_ms")]
    pub record_initial_delay_ms: u64,
    /// Record lookups after issuance.
    #[serde(default = "default_record_retry")]
    pub record_retry: RetryPolicy,
    /// Pause after credentials that later issuers depend on.
    #[serde(default = "default_commit_delay_ms")]
    pub commit_delay_ms: u64,
    /// Role added to every identifier.
    #[serde(default = "default_end_role")]
    pub end_role: String,
}

fn default_admin_url() -> String {
    "http://localhost:3901".into()
}
fn default_boot_url() -> String {
    "http://localhost:3903".into()
}
fn default_threshold() -> usize {
    1
}
fn default_witnesses() -> Vec<String> {
    vec![
        "BBilc4-L3tFUnfM_wJr4S4OJanAv_VmF_dJNN6vkf2Ha".into(),
        "BLskRTInXnMxWaGqcpSyMgo0nYbalW99cGZESrz3zapM".into(),
        "BIKKuvBwpmDVA4Ds-EpL5bt9OqPzWPja2LigFYZN2YfX".into(),
    ]
}
fn default_operation_timeout_ms() -> u64 {
    120_000
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_notification_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 5,
        delay_ms: 5_000,
    }
}
fn default_record_initial_delay_ms() -> u64 {
    1_000
}
fn default_record_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 10,
        delay_ms: 2_000,
    }
}
fn default_commit_delay_ms() -> u64 {
    10_000
}
fn default_end_role() -> String {
    "agent".into()
}

impl Default for WitnessPolicy {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            witnesses: default_witnesses(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            admin_url: default_admin_url(),
            boot_url: default_boot_url(),
            witness_policy: WitnessPolicy::default(),
            operation_timeout_ms: default_operation_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            notification_retry: default_notification_retry(),
            record_initial_delay_ms: default_record_initial_delay_ms(),
            record_retry: default_record_retry(),
            commit_delay_ms: default_commit_delay_ms(),
            end_role: default_end_role(),
        }
    }
}

impl ProtocolConfig {
    /// Millisecond-scale timings for tests and in-process runs.
    pub fn fast() -> Self {
        Self {
            operation_timeout_ms: 500,
            poll_interval_ms: 2,
            notification_retry: RetryPolicy {
                attempts: 5,
                delay_ms: 2,
            },
            record_initial_delay_ms: 1,
            record_retry: RetryPolicy {
                attempts: 10,
                delay_ms: 2,
            },
            commit_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn record_initial_delay(&self) -> Duration {
        Duration::from_millis(self.record_initial_delay_ms)
    }

    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(self.commit_delay_ms)
    }
}
