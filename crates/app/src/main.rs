use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{CurrencyCode, MoneyCents};

mod commands;
mod error;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "settleup")]
#[command(about = "Balances and settlement plans for shared group expenses")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Net balance of every member.
    Balances(BalancesArgs),
    /// Payments that settle the group.
    Settle(GroupArgs),
    /// Expenses as CSV.
    Export { group: PathBuf },
    /// Validate expenses and fail unless every balance is settled.
    ///
    /// Balances within one cent of zero count as settled. A group can still
    /// fail with no payments left to make when a few cents of rounding are
    /// spread across members; the report carries a note when that happens.
    Check(GroupArgs),
    /// The active exchange-rate table.
    Rates,
    /// Convert an amount between two currencies.
    Convert {
        #[arg(allow_hyphen_values = true)]
        amount: MoneyCents,
        from: CurrencyCode,
        to: CurrencyCode,
    },
}

#[derive(Args, Debug)]
struct GroupArgs {
    /// Path to the group document (JSON).
    #[arg(value_name = "GROUP")]
    path: PathBuf,
    /// Target currency; defaults to `app.currency`.
    #[arg(long)]
    currency: Option<CurrencyCode>,
}

#[derive(Args, Debug)]
struct BalancesArgs {
    #[command(flatten)]
    group: GroupArgs,
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "settleup={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match commands::run(cli.command, &settings).await {
        Ok(code) => Ok(code),
        Err(err) => {
            tracing::error!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
