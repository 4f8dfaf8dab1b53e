//! Tagwarden - policy automation for idle volumes and instance tags
//!
//! The `tagwarden` command drives the policy engines against a local JSON
//! inventory, publishing notifications into a file outbox.
//!
//! ## Commands
//!
//! - `mark`: schedule unmarked detached volumes for deletion
//! - `notify-and-delete`: warn about volumes due soon, delete overdue ones
//! - `clear`: remove every deletion marker
//! - `status`: show each detached volume's lifecycle state
//! - `check-tags`: evaluate an instance's tags against the required set
//! - `dns-upsert` / `dns-remove`: maintain an instance's address record

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use tagwarden_core::{
    ComplianceConfig, CredentialChain, DnsConfig, DnsUpdater, JanitorConfig, TagComplianceChecker,
    TriggerEvent, VolumeJanitor,
};
use tagwarden_gateway::{FileInventory, OutboxNotifier, LOCAL_PRINCIPAL};

#[derive(Parser)]
#[command(name = "tagwarden")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tag-driven volume lifecycle, tag compliance and DNS policies", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Inventory document (volumes, instances, zones)
    #[arg(long, global = true, env = "TAGWARDEN_INVENTORY", default_value = "inventory.json")]
    inventory: PathBuf,

    /// Directory receiving published notifications
    #[arg(long, global = true, env = "TAGWARDEN_OUTBOX", default_value = ".tagwarden/outbox")]
    outbox: PathBuf,

    /// Trigger event payload as JSON (file path, or `-` for stdin)
    #[arg(long, global = true)]
    event: Option<PathBuf>,

    /// Region (overrides the event payload)
    #[arg(long, global = true, env = "TAGWARDEN_REGION")]
    region: Option<String>,

    /// Account id (overrides the event payload)
    #[arg(long, global = true, env = "TAGWARDEN_ACCOUNT")]
    account: Option<String>,

    /// Instance id (overrides the event payload's detail)
    #[arg(long, global = true)]
    instance_id: Option<String>,

    /// Evaluate as of this instant (RFC 3339) instead of the current time
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule every unmarked detached volume for deletion
    Mark,

    /// Warn about volumes inside the warning window, delete overdue volumes
    NotifyAndDelete,

    /// Remove the deletion marker from every detached volume
    Clear,

    /// Show the lifecycle state of every detached volume (no writes)
    Status,

    /// Check an instance's tags against the required tag set
    CheckTags {
        /// Seconds to wait before reading the instance's tags
        #[arg(long, default_value = "5")]
        delay_secs: u64,

        /// Channel receiving non-compliance alerts
        #[arg(long, env = "TAGWARDEN_COMPLIANCE_CHANNEL")]
        channel: Option<String>,
    },

    /// Create or replace an instance's address record
    DnsUpsert(DnsArgs),

    /// Remove an instance's address record
    DnsRemove(DnsArgs),
}

#[derive(Args)]
struct DnsArgs {
    /// Target hosted zone id
    #[arg(long, env = "TAGWARDEN_DNS_ZONE_ID")]
    zone_id: String,

    /// Role assumed when the zone is not visible to the local identity
    #[arg(long, env = "TAGWARDEN_DNS_ROLE_ARN")]
    role_arn: String,

    /// Required hostname prefix (case-insensitive)
    #[arg(long, env = "TAGWARDEN_DNS_HOSTNAME_PREFIX", default_value = "lx238")]
    hostname_prefix: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tagwarden_core::init_tracing(cli.json, level);

    let event = load_event(&cli)?;
    let now = cli.now.unwrap_or_else(Utc::now);
    let inventory = Arc::new(
        FileInventory::open(&cli.inventory)
            .with_context(|| format!("Failed to open inventory {:?}", cli.inventory))?,
    );
    let outbox = Arc::new(OutboxNotifier::new(&cli.outbox));

    match cli.command {
        Commands::Mark => {
            let janitor = janitor(&inventory, &outbox)?;
            print_report(&janitor.mark(&event, now).await?)
        }
        Commands::NotifyAndDelete => {
            let janitor = janitor(&inventory, &outbox)?;
            print_report(&janitor.notify_and_delete(&event, now).await?)
        }
        Commands::Clear => {
            let janitor = janitor(&inventory, &outbox)?;
            print_report(&janitor.clear(&event).await?)
        }
        Commands::Status => {
            let janitor = janitor(&inventory, &outbox)?;
            print_report(&janitor.inspect(&event, now).await?)
        }
        Commands::CheckTags {
            delay_secs,
            channel,
        } => {
            let mut config =
                ComplianceConfig::default().with_pre_check_delay(Duration::from_secs(delay_secs));
            if let Some(channel) = channel {
                config = config.with_channel(channel);
            }
            let checker = TagComplianceChecker::new(inventory.clone(), outbox.clone(), config);
            print_report(&checker.check(&event).await?)
        }
        Commands::DnsUpsert(args) => {
            let updater = dns_updater(&inventory, args)?;
            print_report(&updater.upsert_for_instance(&event).await?)
        }
        Commands::DnsRemove(args) => {
            let updater = dns_updater(&inventory, args)?;
            print_report(&updater.remove_for_instance(&event).await?)
        }
    }
}

/// Event from `--event` (if given), then flag overrides on top.
fn load_event(cli: &Cli) -> Result<TriggerEvent> {
    let mut event = match &cli.event {
        Some(path) => TriggerEvent::from_json(&read_payload(path)?)
            .context("Failed to parse trigger event")?,
        None => TriggerEvent::default(),
    };
    if let Some(region) = &cli.region {
        event.region = region.clone();
    }
    if let Some(account) = &cli.account {
        event.account = account.clone();
    }
    if let Some(instance_id) = &cli.instance_id {
        event = event.with_instance_id(instance_id.clone());
    }
    Ok(event)
}

fn read_payload(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("Failed to read event from stdin")?;
        Ok(payload)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read event {:?}", path))
    }
}

fn janitor(inventory: &Arc<FileInventory>, outbox: &Arc<OutboxNotifier>) -> Result<VolumeJanitor> {
    let config = JanitorConfig::from_env().context("Invalid janitor configuration")?;
    info!(
        marker_key = %config.marker_key(),
        retention_days = config.retention_days,
        warning_days = config.warning_days,
        "janitor configured"
    );
    Ok(VolumeJanitor::new(
        inventory.clone(),
        outbox.clone(),
        config,
    )?)
}

fn dns_updater(inventory: &Arc<FileInventory>, args: DnsArgs) -> Result<DnsUpdater> {
    let chain = CredentialChain::local_then_assumed(
        Arc::new(inventory.credential("local-identity", LOCAL_PRINCIPAL)),
        Arc::new(inventory.credential("assumed-role", &args.role_arn)),
    );
    let config =
        DnsConfig::new(args.zone_id, args.role_arn).with_hostname_prefix(args.hostname_prefix);
    Ok(DnsUpdater::new(inventory.clone(), chain, config)?)
}

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
