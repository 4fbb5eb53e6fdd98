//! Chansey CLI - provider queue and triage capture from the terminal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use chansey_lib::config::{self, SyncConfig};
use chansey_lib::models::{PatientCase, SortOrder};
use chansey_lib::queue::reconcile::{load_queue, sorted_cases};
use chansey_lib::queue::{HttpTriageApi, QueueSnapshot, QueueSource, QueueSynchronizer};
use chansey_lib::store::{read_latest_record, FileStore, LocalStore};
use chansey_lib::triage::{SimulatedAnalyzer, Transition, TriageRecorder};

#[derive(Parser)]
#[command(name = "chansey")]
#[command(about = "Chansey - telehealth triage queue", long_about = None)]
#[command(version = config::APP_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the patient queue once and print it
    Queue {
        /// Sort order: urgency or time
        #[arg(long, default_value = "urgency")]
        sort: SortOrder,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Keep the queue in sync and print every change until Ctrl-C
    Watch {
        /// Sort order: urgency or time
        #[arg(long, default_value = "urgency")]
        sort: SortOrder,
    },

    /// Record one (simulated) voice triage and store it locally
    Triage {
        /// Simulated analysis time in milliseconds
        #[arg(long, env = "CHANSEY_ANALYSIS_DELAY_MS", default_value_t = config::DEFAULT_ANALYSIS_DELAY_MS)]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    chansey_lib::init_tracing();
    let cli = Cli::parse();

    let store: Arc<dyn LocalStore> = Arc::new(open_store()?);

    match cli.command {
        Commands::Queue { sort, json } => queue(store, sort, json).await,
        Commands::Watch { sort } => watch(store, sort).await,
        Commands::Triage { delay_ms } => triage(store, delay_ms).await,
    }
}

fn open_store() -> Result<FileStore> {
    let dir = config::store_dir().context("Cannot resolve data directory")?;
    FileStore::open(&dir).with_context(|| format!("Cannot open local store at {}", dir.display()))
}

fn http_api(config: &SyncConfig) -> Result<HttpTriageApi> {
    HttpTriageApi::from_config(config).context("Cannot build triage service client")
}

async fn queue(store: Arc<dyn LocalStore>, sort: SortOrder, json: bool) -> Result<()> {
    let config = SyncConfig::from_env()?;
    let api = http_api(&config)?;
    let local = read_latest_record(store.as_ref());

    let load = load_queue(&api, local.as_ref(), Utc::now()).await;
    let cases = sorted_cases(&load.cases, sort);

    if json {
        println!("{}", serde_json::to_string_pretty(&cases)?);
    } else {
        print_source(&load.source);
        print_cases(&cases);
    }
    Ok(())
}

async fn watch(store: Arc<dyn LocalStore>, sort: SortOrder) -> Result<()> {
    let config = SyncConfig::from_env()?;
    let api = Arc::new(http_api(&config)?);
    let handle = QueueSynchronizer::new(api, store, &config).start();
    let mut updates = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_snapshot(&snapshot, sort);
            }
        }
    }

    handle.stop().await;
    Ok(())
}

async fn triage(store: Arc<dyn LocalStore>, delay_ms: u64) -> Result<()> {
    let analyzer = Arc::new(SimulatedAnalyzer::new(Duration::from_millis(delay_ms)));
    let recorder = TriageRecorder::new(analyzer, store);

    recorder.begin();
    println!("Recording... analysing");
    match recorder.end().await {
        Transition::Applied(Some(record)) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Transition::Applied(None) => anyhow::bail!("Triage analysis failed"),
        Transition::Ignored { from } => anyhow::bail!("Recorder busy ({from})"),
    }
}

fn print_snapshot(snapshot: &QueueSnapshot, sort: SortOrder) {
    if let Some(source) = &snapshot.source {
        print_source(source);
    }
    println!(
        "{} case(s), {} pending",
        snapshot.cases.len(),
        snapshot.pending_count()
    );
    print_cases(&snapshot.sorted(sort));
    println!();
}

fn print_source(source: &QueueSource) {
    match source {
        QueueSource::Remote => println!("Source: triage service"),
        QueueSource::Fallback(reason) => println!("Source: offline fallback ({reason:?})"),
    }
}

fn print_cases(cases: &[PatientCase]) {
    for case in cases {
        println!(
            "{:<10} {:<7} {:<20} {:>3}  {:<14} {}",
            case.status,
            case.urgency,
            case.name,
            case.age,
            case.timestamp,
            case.specialties.join(", ")
        );
    }
}
