use std::{io::Write, path::Path, process::ExitCode};

use engine::{
    Balance, CurrencyCode, Engine, Group, MoneyCents, Settlement, apply_settlements,
    balances_csv, compute_settlements, expenses_csv, is_settled, validate_expense,
};
use serde::Serialize;

use crate::{
    Command, Format,
    error::Result,
    settings::Settings,
};

#[derive(Debug, Serialize)]
struct BalancesView<'a> {
    currency: CurrencyCode,
    balances: &'a [Balance],
}

#[derive(Debug, Serialize)]
struct SettlementsView<'a> {
    currency: CurrencyCode,
    settlements: &'a [Settlement],
}

/// Shown when balances are left but all of them are too small to pay.
const DUST_NOTE: &str =
    "remaining balances are cent-level rounding leftovers; no payment can clear them";

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    currency: CurrencyCode,
    settled: bool,
    balances: &'a [Balance],
    settlements: Vec<Settlement>,
    /// What the balances would look like once every suggested payment is made.
    after_settlement: Vec<Balance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'static str>,
}

/// The `check` report and the exit code it maps to: failure while any
/// balance is outstanding.
fn check_balances(
    currency: CurrencyCode,
    balances: &[Balance],
) -> Result<(CheckReport<'_>, ExitCode)> {
    let settlements = compute_settlements(balances)?;
    let after_settlement = apply_settlements(balances, &settlements)?;
    let settled = is_settled(balances);
    let note = (!settled && settlements.is_empty()).then_some(DUST_NOTE);
    let code = if settled {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };
    Ok((
        CheckReport {
            currency,
            settled,
            balances,
            settlements,
            after_settlement,
            note,
        },
        code,
    ))
}

#[derive(Debug, Serialize)]
struct Conversion {
    amount: MoneyCents,
    from_currency: CurrencyCode,
    to_currency: CurrencyCode,
    converted_amount: MoneyCents,
}

/// Parse a group document and validate each of its expenses.
fn parse_group(raw: &str) -> Result<Group> {
    let group: Group = serde_json::from_str(raw)?;
    for expense in &group.expenses {
        validate_expense(expense)?;
    }
    Ok(group)
}

fn load_group(path: &Path) -> Result<Group> {
    let group = parse_group(&std::fs::read_to_string(path)?)?;
    tracing::debug!(
        "loaded group {:?}: {} members, {} expenses",
        group.name,
        group.members.len(),
        group.expenses.len()
    );
    Ok(group)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_bytes(bytes: &[u8]) -> Result<()> {
    std::io::stdout().lock().write_all(bytes)?;
    Ok(())
}

pub async fn run(command: Command, settings: &Settings) -> Result<ExitCode> {
    let engine = Engine::builder().normalizer(settings.normalizer()?).build();
    let default_currency = settings.currency()?;

    match command {
        Command::Balances(args) => {
            let group = load_group(&args.group.path)?;
            let currency = args.group.currency.unwrap_or(default_currency);
            let balances = engine.balances(&group, currency).await?;
            match args.format {
                Format::Json => print_json(&BalancesView {
                    currency,
                    balances: &balances,
                })?,
                Format::Csv => print_bytes(&balances_csv(&balances, currency)?)?,
            }
        }
        Command::Settle(args) => {
            let group = load_group(&args.path)?;
            let currency = args.currency.unwrap_or(default_currency);
            let settlements = engine.settlements(&group, currency).await?;
            tracing::info!(
                "{} payments settle {} members",
                settlements.len(),
                group.members.len()
            );
            print_json(&SettlementsView {
                currency,
                settlements: &settlements,
            })?;
        }
        Command::Export { group } => {
            let group = load_group(&group)?;
            print_bytes(&expenses_csv(&group.expenses, &group.members)?)?;
        }
        Command::Check(args) => {
            let group = load_group(&args.path)?;
            let currency = args.currency.unwrap_or(default_currency);
            let balances = engine.balances(&group, currency).await?;
            let (report, code) = check_balances(currency, &balances)?;
            print_json(&report)?;
            if !report.settled {
                tracing::warn!("group still has outstanding balances");
            }
            return Ok(code);
        }
        Command::Rates => {
            let rates = engine.rates().await;
            if rates.is_fallback() {
                tracing::info!("serving the embedded rate table");
            }
            print_json(&*rates)?;
        }
        Command::Convert { amount, from, to } => {
            let converted_amount = engine.convert(amount, from, to).await?;
            print_json(&Conversion {
                amount,
                from_currency: from,
                to_currency: to,
                converted_amount,
            })?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
