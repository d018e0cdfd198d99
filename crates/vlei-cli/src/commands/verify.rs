//! `vlei verify`: verify a seller agent through a running node.

use clap::Args;
use serde::Serialize;
use serde_json::Value;

use vlei_credentials::VerificationReport;

use super::{api_error, unreachable_node};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Alias of the seller agent.
    pub seller: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:9001")]
    pub endpoint: String,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SellerRef<'a> {
    identifier: &'a str,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    seller: SellerRef<'a>,
}

pub async fn run(args: &VerifyArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/verify/trading-partner", args.endpoint);
    let body = VerifyRequest {
        seller: SellerRef {
            identifier: &args.seller,
        },
    };

    let client = reqwest::Client::new();
    let resp = match client.post(&url).json(&body).send().await {
        Ok(r) => r,
        Err(e) => {
            unreachable_node(&args.endpoint, &e);
            return Ok(());
        }
    };
    if !resp.status().is_success() {
        return Err(api_error("verification", resp).await);
    }

    let report: Value = resp.json().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&serde_json::from_value(report)?);
    Ok(())
}

fn print_report(report: &VerificationReport) {
    let trust = &report.decision.trust;
    println!("Verification {}", report.verification_id);
    println!(
        "  Seller:   {} ({}) at {}",
        report.seller.agent.alias, report.seller.agent.role, report.seller.company.name
    );
    println!("  LEI:      {}", report.seller.company.lei);
    println!();
    println!(
        "  Decision: {} (score {}, confidence {}, risk {})",
        if trust.approved { "APPROVED" } else { "NOT APPROVED" },
        trust.trust_score,
        label(&trust.confidence),
        label(&trust.risk_level)
    );
    println!("  Recommendation: {}", label(&trust.recommendation));
    println!();
    println!("  Chain:");
    for credential in &report.credentials {
        let icon = if credential.valid { "PASS" } else { "FAIL" };
        println!("    [{}] {}", icon, credential.credential_type);
    }
    for reason in &report.decision.reasoning {
        println!("  - {}", reason);
    }
    for flag in &report.red_flags {
        println!("  ! {}", flag);
    }
    for warning in &report.warnings {
        println!("  ~ {}", warning);
    }
}

/// Wire name of a serialized enum.
fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(name)) => name,
        _ => String::from("?"),
    }
}
