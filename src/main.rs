use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loadout::config::Config;
use loadout::dispatch::Dispatcher;
use loadout::events::{EventBus, LoaderEvent};
use loadout::fetch::{FetchError, Fetcher};
use loadout::models::Manifest;
use loadout::modules;
use loadout::notify::{UpdateCheck, UpdateNotifier};
use loadout::store::Store;

#[derive(Parser)]
#[command(name = "loadout")]
#[command(about = "Remote-manifest module loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the manifest and run every module applicable to a page URL
    Run {
        /// Page URL to dispatch against
        url: String,

        /// Keep running: periodic update checks until interrupted
        #[arg(short, long)]
        watch: bool,
    },
    /// Show the cached manifest and enablement state
    Status,
    /// Enable a module
    Enable { id: String },
    /// Disable a module
    Disable { id: String },
    /// Check for a newer release now
    CheckUpdate,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "loadout=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env();
    let store = Store::open_default()?;
    store.migrate()?;

    match cli.command {
        Commands::Run { url, watch } => {
            let fetcher = Fetcher::new(&config);
            let bus = EventBus::default();
            let dispatcher = Arc::new(Dispatcher::new(
                modules::builtin_registry(),
                store.clone(),
                fetcher.clone(),
                bus.clone(),
            ));

            let manifest = match fetcher.load_manifest(&store).await {
                Ok(m) => m,
                Err(FetchError::ManifestUnavailable) => {
                    tracing::error!("No manifest and no cache; nothing to load");
                    Manifest {
                        version: "0".to_string(),
                        modules: Vec::new(),
                    }
                }
                Err(e) => return Err(e.into()),
            };

            let loaded = dispatcher.run_applicable(&manifest, &url).await;
            for id in &loaded {
                println!("loaded {id}");
            }

            if watch {
                let notifier =
                    UpdateNotifier::new(fetcher.clone(), store.clone(), bus.clone());
                let (delay, interval) = (config.initial_check_delay, config.check_interval);
                tokio::spawn(async move { notifier.run(delay, interval).await });

                let mut events = bus.subscribe();
                tokio::spawn(async move {
                    while let Ok(event) = events.recv().await {
                        if let LoaderEvent::UpdateAvailable { current, latest } = event {
                            println!("update available: {current} -> {latest}");
                        }
                    }
                });

                tracing::info!("Watching for updates, Ctrl-C to stop");
                tokio::signal::ctrl_c().await?;
            }
        }
        Commands::Status => {
            match store.cached_manifest()? {
                Some(manifest) => {
                    println!("manifest v{}", manifest.version);
                    for m in &manifest.modules {
                        let enabled = store.is_enabled(&m.id)?;
                        println!(
                            "  {:<24} {:<9} {}",
                            m.id,
                            m.module_type.as_str(),
                            if enabled && m.enabled { "enabled" } else { "disabled" }
                        );
                    }
                }
                None => println!("no cached manifest"),
            }
            if let Some(version) = store.last_notified_version()? {
                println!("last notified version: {version}");
            }
            if let Some(when) = store.last_update_check()? {
                println!("last update check: {}", when.to_rfc3339());
            }
        }
        Commands::Enable { id } => {
            store.set_enabled(&id, true)?;
            println!("{id} enabled");
        }
        Commands::Disable { id } => {
            store.set_enabled(&id, false)?;
            println!("{id} disabled");
        }
        Commands::CheckUpdate => {
            let fetcher = Fetcher::new(&config);
            let bus = EventBus::default();
            let notifier = UpdateNotifier::new(fetcher, store, bus);
            match notifier.check(true).await {
                UpdateCheck::UpdateAvailable { current, latest } => {
                    println!("update available: {current} -> {latest}")
                }
                UpdateCheck::UpToDate { version } => println!("up to date (v{version})"),
                UpdateCheck::Unavailable => println!("update check failed"),
            }
        }
    }

    Ok(())
}
