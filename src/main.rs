use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use payadmit::application::admission::AdmissionCoordinator;
use payadmit::application::reconciliation::{Reconciler, Settlement};
use payadmit::config::AdmissionConfig;
use payadmit::domain::payment::ReferenceId;
use payadmit::domain::ports::PaymentStoreBox;
use payadmit::infrastructure::in_memory::InMemoryPaymentStore;
#[cfg(feature = "storage-rocksdb")]
use payadmit::infrastructure::rocksdb::RocksDBStore;
use payadmit::interfaces::csv::record_writer::{RecordOutcome, RecordWriter};
use payadmit::interfaces::csv::request_reader::RequestReader;
use payadmit::logging;
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "PAYADMIT_DB_PATH")]
    db_path: Option<PathBuf>,

    /// JSON file with admission settings (optional).
    #[arg(long, global = true, env = "PAYADMIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Admit every payment in a CSV file with `reference, amount, currency` columns
    Admit {
        /// Input payments CSV file
        input: PathBuf,

        /// Number of rows admitted at the same time.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: u16,

        /// Amounts strictly above this are left Processing.
        #[arg(long, env = "PAYADMIT_LARGE_AMOUNT_THRESHOLD")]
        large_amount_threshold: Option<Decimal>,

        /// Currency whose payments are rejected. Repeat or comma-separate for several.
        #[arg(
            long = "rejected-currency",
            env = "PAYADMIT_REJECTED_CURRENCIES",
            value_delimiter = ','
        )]
        rejected_currencies: Vec<String>,
    },
    /// Print the payment stored under a reference
    Find { reference: String },
    /// Settle a Processing payment: confirm it, or fail it with --decline
    Settle {
        reference: String,

        /// Fail the payment with this reason instead of confirming it.
        #[arg(long)]
        decline: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("warn");
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AdmissionConfig::from_json_file(path).into_diagnostic()?,
        None => AdmissionConfig::default(),
    };
    let store = open_store(cli.db_path)?;

    match cli.command {
        Command::Admit {
            input,
            concurrency,
            large_amount_threshold,
            rejected_currencies,
        } => {
            if let Some(threshold) = large_amount_threshold {
                config.large_amount_threshold = threshold;
            }
            if !rejected_currencies.is_empty() {
                config.rejected_currencies = rejected_currencies;
            }
            config.validate().into_diagnostic()?;

            let evaluator = config.evaluator();
            info!(
                large_amount_threshold = %evaluator.large_amount_threshold(),
                rejected_currencies = ?config.rejected_currencies,
                concurrency,
                "admitting payments"
            );
            let coordinator = AdmissionCoordinator::new(store, evaluator)
                .with_replay_policy(config.replay_policy());
            admit_file(coordinator, input, usize::from(concurrency)).await
        }
        Command::Find { reference } => {
            let coordinator = AdmissionCoordinator::new(store, config.evaluator());
            let reference = ReferenceId::new(reference).into_diagnostic()?;
            let Some(record) = coordinator
                .find_by_reference(&reference)
                .await
                .into_diagnostic()?
            else {
                return Err(miette!("No payment found for reference '{reference}'"));
            };

            let mut writer = RecordWriter::new(io::stdout().lock());
            writer
                .write_record(&record, RecordOutcome::Found)
                .into_diagnostic()?;
            writer.flush().into_diagnostic()
        }
        Command::Settle { reference, decline } => {
            let reconciler = Reconciler::new(store);
            let reference = ReferenceId::new(reference).into_diagnostic()?;
            let settlement = match decline {
                Some(reason) => Settlement::Declined { reason },
                None => Settlement::Confirmed,
            };
            let Some(record) = reconciler
                .settle(&reference, settlement)
                .await
                .into_diagnostic()?
            else {
                return Err(miette!("No payment found for reference '{reference}'"));
            };

            let mut writer = RecordWriter::new(io::stdout().lock());
            writer
                .write_record(&record, RecordOutcome::Settled)
                .into_diagnostic()?;
            writer.flush().into_diagnostic()
        }
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<PaymentStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            // Use persistent storage (RocksDB)
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryPaymentStore::new()))
        }
        None => Ok(Box::new(InMemoryPaymentStore::new())),
    }
}

/// Admits every row of `input`, at most `concurrency` at a time, and prints
/// the resulting records in input order.
async fn admit_file(
    coordinator: AdmissionCoordinator,
    input: PathBuf,
    concurrency: usize,
) -> Result<()> {
    let coordinator = Arc::new(coordinator);
    let limiter = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    let file = File::open(input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    for (row, request) in reader.requests().enumerate() {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                error!(row = row + 1, "Error reading payment request: {}", e);
                continue;
            }
        };

        let permit = Arc::clone(&limiter).acquire_owned().await.into_diagnostic()?;
        let coordinator = Arc::clone(&coordinator);
        tasks.spawn(async move {
            let admission = coordinator.admit(request).await;
            drop(permit);
            (row, admission)
        });
    }

    let mut admitted = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (row, admission) = joined.into_diagnostic()?;
        match admission {
            Ok(admission) => admitted.push((row, admission)),
            Err(e) => error!(row = row + 1, "Error admitting payment: {}", e),
        }
    }
    admitted.sort_by_key(|(row, _)| *row);

    // Output admitted payments
    let stdout = io::stdout();
    let mut writer = RecordWriter::new(stdout.lock());
    writer
        .write_admissions(admitted.iter().map(|(_, admission)| admission))
        .into_diagnostic()?;

    Ok(())
}
