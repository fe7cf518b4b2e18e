use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_ledger_core::advice::classifier::{self, AdviceInput};
use loan_ledger_core::advice::AdvicePolicy;

use crate::input;

/// Arguments for rate advice
#[derive(Args)]
pub struct AdviseArgs {
    /// Path to JSON input file ({"rate": ..., "policy": {...}})
    #[arg(long)]
    pub input: Option<String>,

    /// Effective interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Band policy file (JSON or YAML); defaults to the built-in bands
    #[arg(long)]
    pub policy: Option<String>,
}

pub fn run_advise(args: AdviseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut advice_input: AdviceInput = if let Some(rate) = args.rate {
        AdviceInput { rate, policy: None }
    } else if let Some(data) = input::read_payload(args.input.as_deref())? {
        serde_json::from_value(data)?
    } else {
        return Err("--rate is required (or provide --input)".into());
    };

    if let Some(ref path) = args.policy {
        let policy: AdvicePolicy = input::file::read_config(path)?;
        advice_input.policy = Some(policy);
    }

    let result = classifier::classify_rate(&advice_input)?;
    Ok(serde_json::to_value(result)?)
}
