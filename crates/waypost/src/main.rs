//! # WAYPOST Console
//!
//! Runs one scripted agent session against the simulated grid and drives it
//! from standard input.
//!
//! Every input line is one form-encoded command:
//!
//! ```text
//! command=getbalance&group=Builders
//! command=rez&group=Builders&item=Lamp&position=%3C128%2C128%2C22%3E
//! ```
//!
//! Every response is one form-encoded line on standard output.
//! Notifications for subscribed groups are printed as they happen, prefixed
//! with `notification `.
//!
//! ```bash
//! RUST_LOG=waypost_core=debug waypost_console --config data/waypost.toml < commands.txt
//! ```

mod world;

use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use waypost_commands::notifications::subscribers;
use waypost_commands::params::encode;
use waypost_commands::{
    CommandContext, Dispatcher, Notification, NotificationEmitter, NotificationKind, Params,
    Session, WaypostConfig,
};
use waypost_core::{EventKind, Grid, GridEvent, Subscription};
use waypost_grid::{NetworkConditions, SimulatedGrid, SimulationConfig};

#[derive(Parser, Debug)]
#[command(name = "waypost_console")]
#[command(about = "Scripted agent session driven by key=value command lines")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "data/waypost.toml")]
    config: PathBuf,

    /// Network preset for the simulated grid (perfect, good, average, poor)
    #[arg(long, default_value = "perfect")]
    network: String,

    /// Seed for simulated network jitter
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,

    /// Name of the home region
    #[arg(long, default_value = "Ahern")]
    region: String,

    /// Starting money balance
    #[arg(long, default_value_t = 1000)]
    balance: i64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match WaypostConfig::load(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "cannot start without a configuration");
            return ExitCode::FAILURE;
        }
    };
    let Some(network) = NetworkConditions::preset(&cli.network) else {
        error!(network = %cli.network, "unknown network preset");
        return ExitCode::FAILURE;
    };

    let grid = Arc::new(SimulatedGrid::with_config(SimulationConfig {
        network,
        seed: cli.seed,
        ..SimulationConfig::default()
    }));
    let store = Arc::new(world::session_store("Waypost", "Resident"));
    let session = Session::start(store, Arc::clone(&grid) as Arc<dyn Grid>, &config);
    world::seed(&grid, &cli.region, cli.balance, config.session.upload_cost);
    let _notifications = attach_notifications(&grid, session.context());

    let dispatcher = Dispatcher::start(Arc::clone(session.context()));
    info!(
        region = %cli.region,
        network = %cli.network,
        groups = config.groups.len(),
        "session ready"
    );

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "stopped reading commands");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let response = dispatcher.call(Params::decode(line));
        println!("{}", response.encode());
    }

    info!(
        submitted = dispatcher.submitted(),
        rejected = dispatcher.rejected(),
        "input closed; shutting down"
    );
    ExitCode::SUCCESS
}

/// Prints local chat and inventory offers for the groups subscribed to them.
fn attach_notifications(grid: &SimulatedGrid, ctx: &Arc<CommandContext>) -> Vec<Subscription> {
    let emitter = Arc::new(NotificationEmitter::default());
    [EventKind::Chat, EventKind::InventoryOffered]
        .into_iter()
        .map(|kind| {
            let emitter = Arc::clone(&emitter);
            let ctx = Arc::clone(ctx);
            grid.events().subscribe(kind, move |event| {
                let notification = match event {
                    GridEvent::Chat(chat) => Notification::Local(chat),
                    GridEvent::InventoryOffered { offer } => Notification::Inventory(offer),
                    _ => return,
                };
                notify(&emitter, &ctx, notification);
            })
        })
        .collect()
}

fn notify(emitter: &NotificationEmitter, ctx: &CommandContext, notification: Notification<'_>) {
    let kind: NotificationKind = notification.kind();
    let record = emitter.emit(notification, None);
    for group in subscribers(&ctx.gate, kind) {
        let mut pairs = vec![("group", group.name.as_str())];
        pairs.extend(record.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        println!("notification {}", encode(pairs));
    }
}
