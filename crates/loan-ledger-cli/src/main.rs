mod commands;
mod input;
mod output;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::advice::AdviseArgs;
use commands::loan::{DraftArgs, EditArgs, RecordArgs};
use commands::schedule::{ScheduleArgs, SummaryArgs, TogglePaidArgs, ValidateArgs};

/// Loan terms reconciliation and repayment schedules
#[derive(Parser)]
#[command(
    name = "loanctl",
    version,
    about = "Loan terms reconciliation and repayment schedules",
    long_about = "A CLI over the loan-ledger engine: generate and validate monthly \
                  repayment schedules, keep processing fee, GST, other charges and \
                  the effective interest rate consistent, and produce the record \
                  a loan is stored as. Inputs are JSON via --input or stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Date used as "today" for paid/future checks (defaults to the local date)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Log solver decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a monthly installment schedule
    Schedule(ScheduleArgs),
    /// Check a schedule's order, paid prefix and amounts
    ValidateSchedule(ValidateArgs),
    /// Mark an installment paid (cascading) or unpaid (latest only)
    TogglePaid(TogglePaidArgs),
    /// Progress summary of a schedule
    Summary(SummaryArgs),
    /// Compute derived loan quantities
    Derive(DraftArgs),
    /// Reconcile fees and interest rate for a draft
    Reconcile(DraftArgs),
    /// Replay a list of field edits over a draft
    Edit(EditArgs),
    /// List every issue blocking submission of a draft
    Check(DraftArgs),
    /// Produce the persisted record of a settled draft
    Record(RecordArgs),
    /// Classify an effective interest rate
    Advise(AdviseArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "loan_ledger_core=debug,loanctl=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    tracing::debug!(%today, "using reference date");

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::ValidateSchedule(args) => commands::schedule::run_validate(args, today),
        Commands::TogglePaid(args) => commands::schedule::run_toggle_paid(args, today),
        Commands::Summary(args) => commands::schedule::run_summary(args, today),
        Commands::Derive(args) => commands::loan::run_derive(args),
        Commands::Reconcile(args) => commands::loan::run_reconcile(args),
        Commands::Edit(args) => commands::loan::run_edit(args, today),
        Commands::Check(args) => commands::loan::run_check(args, today),
        Commands::Record(args) => commands::loan::run_record(args, today),
        Commands::Advise(args) => commands::advice::run_advise(args),
        Commands::Version => {
            println!("loanctl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
