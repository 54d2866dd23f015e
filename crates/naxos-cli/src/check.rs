//! `naxos check-group`: validate group parameters without running a session.

use anyhow::Result;
use clap::Args;
use naxos_crypto::{Config, GroupParameters};
use serde::Serialize;

/// Arguments for the `check-group` subcommand.
#[derive(Debug, Args)]
pub struct CheckGroupArgs {
    /// Group preset to check instead of the configured group
    #[arg(long)]
    pub group: Option<String>,
}

/// Sizes of a validated group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub modulus_bits: usize,
    pub order_bits: usize,
    pub element_len: usize,
    pub generator: String,
}

impl GroupSummary {
    pub fn of(params: &GroupParameters) -> Self {
        Self {
            modulus_bits: params.modulus().bits_vartime(),
            order_bits: params.order_bits(),
            element_len: params.element_len(),
            generator: format!("{:x}", params.generator())
                .trim_start_matches('0')
                .to_string(),
        }
    }
}

/// Validate the group and print its sizes.
pub fn run(args: &CheckGroupArgs, config: &Config) -> Result<()> {
    let params = match &args.group {
        Some(preset) => GroupParameters::preset(preset)?,
        None => config.group_parameters()?,
    };
    let summary = GroupSummary::of(&params);
    tracing::info!(?summary, "group parameters valid");
    print_summary(&summary);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(summary: &GroupSummary) {
    println!("valid safe-prime group");
    println!("  modulus:   {} bits", summary.modulus_bits);
    println!("  order:     {} bits", summary.order_bits);
    println!("  element:   {} bytes", summary.element_len);
    println!("  generator: 0x{}", summary.generator);
}
