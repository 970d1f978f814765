/// Invoice Index Validator
/// Validates customer/invoice index fields captured from documents
///
/// This binary:
/// - Loads environment-specific backend settings (production or test)
/// - Trims and length-checks the customer and invoice number of each document
/// - Confirms each customer/invoice pair exists in the backend table
/// - Holds one backend connection per batch and always releases it
/// - Reports per-document results as text or JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use shared::{BatchReport, Document, DocumentStatus, FieldKind, ValidationSession};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use validator::config::parse_environment;
use validator::{
    load_documents, load_records, run_batch, BatchOutput, BatchSession, CaptureEvents, DatabaseConfig,
    FieldValidator, MemoryConnector, PgConnector, ServiceConfig, StoreConnector, ValidatorError,
};

#[derive(Parser)]
#[command(name = "validator", version, about = "Customer/invoice index field validator")]
struct Cli {
    /// Deployment environment: production or test
    #[arg(long, global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every document of a batch file. JSON output includes the
    /// documents with their trimmed field values; text output lists only
    /// the per-document results
    Run {
        /// JSON array of documents
        #[arg(long)]
        batch: PathBuf,

        /// Check against a JSON record fixture instead of the database
        #[arg(long)]
        records: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate a single customer/invoice pair
    Check {
        #[arg(long)]
        customer: String,

        #[arg(long)]
        invoice: String,

        /// Check against a JSON record fixture instead of the database
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Length-check a single field value without touching the backend
    Validate {
        /// customer or invoice
        #[arg(long)]
        field: FieldKind,

        #[arg(long)]
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Exit status when validation rejected input but nothing failed fatally
const EXIT_INVALID: u8 = 2;

fn connector_for_records(path: &Path) -> Result<MemoryConnector> {
    let records = load_records(path)?;
    info!("Using {} offline records from {}", records.len(), path.display());
    Ok(MemoryConnector::new(records))
}

fn postgres_connector(config: &ServiceConfig) -> Result<PgConnector> {
    let database = DatabaseConfig::from_env(config.environment)?;
    Ok(PgConnector::new(database, &config.lookup)?)
}

async fn run_with<C: StoreConnector>(
    connector: C,
    config: &ServiceConfig,
    documents: &mut [Document],
) -> Result<BatchReport> {
    let mut session = BatchSession::new(connector, config.limits);
    let report = run_batch(&mut session, config.environment, documents)
        .await
        .context("Batch processing aborted")?;
    Ok(report)
}

async fn check_with<C: StoreConnector>(
    connector: C,
    config: &ServiceConfig,
    customer: &str,
    invoice: &str,
) -> Result<Result<ValidationSession, ValidatorError>> {
    let mut session = BatchSession::new(connector, config.limits);
    session.batch_open().await?;

    let outcome = check_pair(&mut session, customer, invoice).await;
    let closed = session.batch_close().await;

    // Fatal errors end the command; validation failures are reported
    let outcome = match outcome {
        Err(e) if e.is_fatal() => return Err(e.into()),
        other => other,
    };
    closed?;
    Ok(outcome)
}

async fn check_pair<H: CaptureEvents>(
    host: &mut H,
    customer: &str,
    invoice: &str,
) -> Result<ValidationSession, ValidatorError> {
    host.document_open("cli")?;
    host.field_captured(FieldKind::CustomerNumber, customer).await?;
    host.field_captured(FieldKind::InvoiceNumber, invoice).await?;
    host.document_complete()
}

fn print_report(report: &BatchReport, documents: &[Document], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = BatchOutput {
                report,
                normalized_documents: documents,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Batch {} ({})", report.batch_id, report.environment);
            for document in &report.documents {
                match &document.status {
                    DocumentStatus::Accepted {
                        customer_number,
                        invoice_number,
                    } => println!(
                        "  {:<20} accepted  customer={} invoice={}",
                        document.document_id, customer_number, invoice_number
                    ),
                    DocumentStatus::Invalid { message, .. } => {
                        println!("  {:<20} invalid   {}", document.document_id, message)
                    }
                    DocumentStatus::Rejected { reason } => {
                        println!("  {:<20} rejected  {}", document.document_id, reason)
                    }
                }
            }
            println!(
                "{} accepted, {} invalid, {} rejected",
                report.accepted, report.invalid, report.rejected
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();

    // Logs go to stderr so JSON reports on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "validator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ServiceConfig::from_env()?;
    if let Some(environment) = cli.environment.as_deref() {
        config.environment = parse_environment(environment)?;
    }

    match cli.command {
        Commands::Run {
            batch,
            records,
            format,
        } => {
            let mut documents = load_documents(&batch)?;
            let report = match records {
                Some(path) => run_with(connector_for_records(&path)?, &config, &mut documents).await?,
                None => run_with(postgres_connector(&config)?, &config, &mut documents).await?,
            };

            print_report(&report, &documents, format)?;
            if report.invalid > 0 {
                return Ok(ExitCode::from(EXIT_INVALID));
            }
        }
        Commands::Check {
            customer,
            invoice,
            records,
        } => {
            let outcome = match records {
                Some(path) => {
                    check_with(connector_for_records(&path)?, &config, &customer, &invoice).await?
                }
                None => {
                    check_with(postgres_connector(&config)?, &config, &customer, &invoice).await?
                }
            };

            match outcome {
                Ok(session) => println!(
                    "found: customer={} invoice={}",
                    session.customer_number, session.invoice_number
                ),
                Err(e) => {
                    println!("{}", e);
                    return Ok(ExitCode::from(EXIT_INVALID));
                }
            }
        }
        Commands::Validate { field, value } => {
            let validator = FieldValidator::new(config.limits);
            match validator.validate_value(field, &value, &ValidationSession::blank()) {
                Ok((canonical, _)) => println!("{}", canonical),
                Err(e) => {
                    println!("{}", e);
                    return Ok(ExitCode::from(EXIT_INVALID));
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
