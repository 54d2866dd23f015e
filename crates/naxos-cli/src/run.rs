//! `naxos run`: execute one exchange between two in-process parties.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use naxos_crypto::{
    Config, ExpectedPeer, GroupParameters, NaxosError, Party, PartyMessage, Role, SessionIdentity,
    SessionKey, equal_keys,
};
use serde::Serialize;
use tracing::info;

use crate::transport::ChannelTransport;

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Group preset (`modp2048` or `toy`), overrides the config file
    #[arg(long)]
    pub group: Option<String>,

    /// Initiator identity
    #[arg(long)]
    pub initiator: Option<String>,

    /// Responder identity
    #[arg(long)]
    pub responder: Option<String>,

    /// How long a party waits for its peer's message
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Public outcome of a run. Session keys are never part of it.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub modulus_bits: usize,
    pub initiator: PartyMessage,
    pub responder: PartyMessage,
    pub keys_agree: bool,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(preset) = &self.group {
            config.group = naxos_crypto::config::GroupConfig {
                preset: Some(preset.clone()),
                ..Default::default()
            };
        }
        if let Some(id) = &self.initiator {
            config.session.initiator_id.clone_from(id);
        }
        if let Some(id) = &self.responder {
            config.session.responder_id.clone_from(id);
        }
    }
}

/// Run the subcommand and print the report.
pub fn run(args: &RunArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config);
    let params = Arc::new(config.group_parameters()?);
    let ids = config.session_identity()?;
    let report = exchange(params, &ids, Duration::from_millis(args.timeout_ms))?;

    print_report(&report, args.json)?;

    if !report.keys_agree {
        return Err(NaxosError::KeyMismatch.into());
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).context("Failed to encode report")?;
        println!("{out}");
        return Ok(());
    }
    println!("group:       {}-bit modulus", report.modulus_bits);
    for msg in [&report.initiator, &report.responder] {
        println!("{}:", msg.identity);
        println!("  static public key: {}", msg.static_public);
        println!("  exchange value:    {}", msg.public_value);
    }
    println!("keys agree:  {}", report.keys_agree);
    Ok(())
}

/// Drive both parties on their own threads and compare the derived keys.
///
/// Static keys are generated up front and each side is handed the other's
/// public key, standing in for out-of-band key distribution.
pub fn exchange(
    params: Arc<GroupParameters>,
    ids: &SessionIdentity,
    timeout: Duration,
) -> Result<RunReport> {
    let (initiator_end, responder_end) = ChannelTransport::pair(timeout);
    let modulus_bits = params.modulus().bits_vartime();

    let (initiator, initiator_pin) =
        register(Arc::clone(&params), Role::Initiator, &ids.initiator)?;
    let (responder, responder_pin) = register(params, Role::Responder, &ids.responder)?;

    let initiator = spawn_party(initiator, responder_pin, initiator_end)?;
    let responder = spawn_party(responder, initiator_pin, responder_end)?;

    let (initiator_msg, initiator_key) = join_party(initiator, Role::Initiator)?;
    let (responder_msg, responder_key) = join_party(responder, Role::Responder)?;

    let keys_agree = equal_keys(&initiator_key, &responder_key);
    info!(keys_agree, "exchange finished");
    Ok(RunReport {
        modulus_bits,
        initiator: initiator_msg,
        responder: responder_msg,
        keys_agree,
    })
}

fn register(
    params: Arc<GroupParameters>,
    role: Role,
    identity: &str,
) -> Result<(Party, ExpectedPeer)> {
    let mut party = Party::new(params, role, identity);
    let public = party
        .generate_static_keys()
        .with_context(|| format!("Failed to generate {role} static keys"))?;
    Ok((party, ExpectedPeer::new(identity, public)))
}

type PartyHandle = thread::JoinHandle<naxos_crypto::Result<(PartyMessage, SessionKey)>>;

fn spawn_party(
    party: Party,
    peer: ExpectedPeer,
    transport: ChannelTransport,
) -> Result<PartyHandle> {
    let role = party.role();
    thread::Builder::new()
        .name(format!("naxos-{role}"))
        .spawn(move || drive_party(party, &peer, &transport))
        .with_context(|| format!("Failed to spawn {role} thread"))
}

fn join_party(handle: PartyHandle, role: Role) -> Result<(PartyMessage, SessionKey)> {
    let outcome = handle
        .join()
        .map_err(|_| anyhow::anyhow!("{role} thread panicked"))?;
    outcome.with_context(|| format!("{role} failed"))
}

/// One side of the run once its static keys are in place: ephemeral, send,
/// receive, derive.
fn drive_party(
    mut party: Party,
    peer: &ExpectedPeer,
    transport: &ChannelTransport,
) -> naxos_crypto::Result<(PartyMessage, SessionKey)> {
    let role = party.role();
    party.generate_ephemeral()?;
    let outgoing = party.outgoing_message()?;
    if let Err(e) = transport.send(&outgoing) {
        party.abort();
        return Err(e);
    }
    info!(%role, identity = party.identity(), "exchange value sent");

    let incoming = match transport.recv() {
        Ok(msg) => msg,
        Err(e) => {
            party.abort();
            return Err(e);
        }
    };
    let key = party.derive_key(peer, &incoming)?;
    info!(%role, peer = %peer.identity, "session key derived");
    Ok((outgoing, key))
}
