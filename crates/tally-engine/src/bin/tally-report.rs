//! # Tally Report
//!
//! Prints a financial report as JSON.
//!
//! ## Usage
//! ```bash
//! # Trial balance over everything
//! cargo run -p tally-engine --bin tally-report -- trial-balance
//!
//! # One month of profit and loss
//! cargo run -p tally-engine --bin tally-report -- profit-and-loss --from 2024-01-01 --to 2024-01-31
//!
//! # Single account, custom config
//! cargo run -p tally-engine --bin tally-report -- balance CASH --config ./engine.toml
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use tally_core::{AccountName, DateRange};
use tally_engine::telemetry::init_tracing;
use tally_engine::{BackOffice, EngineConfig};

#[derive(Debug, Parser)]
#[command(name = "tally-report")]
#[command(about = "Prints a financial report as JSON")]
#[command(version)]
struct Cli {
    /// Start of range (YYYY-MM-DD or RFC 3339)
    #[arg(long, global = true, value_parser = start_of)]
    from: Option<DateTime<Utc>>,

    /// End of range, inclusive (YYYY-MM-DD or RFC 3339)
    #[arg(long, global = true, value_parser = end_of)]
    to: Option<DateTime<Utc>>,

    /// Config file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Defaults to trial-balance
    #[command(subcommand)]
    report: Option<Report>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Report {
    /// Per-account debit and credit totals
    TrialBalance,

    /// Trial balance; exits non-zero if unbalanced
    Verify,

    /// Revenue, expenses and net profit
    ProfitAndLoss,

    /// Assets, liabilities and equity
    BalanceSheet,

    /// One account
    Balance {
        /// e.g. CASH or ACCOUNTS_RECEIVABLE
        account: AccountName,
    },

    /// Pending credit transactions
    Receivables {
        /// Receivables for one customer
        #[arg(long)]
        customer: Option<String>,
    },
}

fn start_of(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_date(raw, false)
}

fn end_of(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_date(raw, true)
}

/// `YYYY-MM-DD` means start of day for `--from` and end of day for `--to`.
fn parse_date(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("invalid date {}: {}", raw, e))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| format!("invalid time for {}", raw))?;
    Ok(Utc.from_utc_datetime(&day.and_time(time)))
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = EngineConfig::load(cli.config)?;
    init_tracing(&config.logging.filter);

    let range = DateRange::new(cli.from, cli.to)?;
    let office = BackOffice::open(&config).await?;

    let (json, ok) = match cli.report.unwrap_or(Report::TrialBalance) {
        Report::TrialBalance => (serde_json::to_string_pretty(&office.trial_balance(&range).await?)?, true),
        Report::Verify => {
            let trial = office.trial_balance(&range).await?;
            let balanced = trial.is_balanced;
            (serde_json::to_string_pretty(&trial)?, balanced)
        }
        Report::ProfitAndLoss => (serde_json::to_string_pretty(&office.profit_and_loss(&range).await?)?, true),
        Report::BalanceSheet => (serde_json::to_string_pretty(&office.balance_sheet(&range).await?)?, true),
        Report::Balance { account } => {
            (serde_json::to_string_pretty(&office.account_balance(account, &range).await?)?, true)
        }
        Report::Receivables { customer } => {
            let pending = office.outstanding_receivables(customer.as_deref()).await?;
            (serde_json::to_string_pretty(&pending)?, true)
        }
    };

    println!("{}", json);
    Ok(ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dates_cover_whole_days() {
        let cli = Cli::try_parse_from([
            "tally-report",
            "profit-and-loss",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
        ])
        .unwrap();
        assert_eq!(cli.report, Some(Report::ProfitAndLoss));

        let from = cli.from.unwrap();
        assert_eq!((from.hour(), from.minute()), (0, 0));
        let to = cli.to.unwrap();
        assert_eq!(to.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
    }

    #[test]
    fn test_balance_parses_account() {
        let cli = Cli::try_parse_from(["tally-report", "balance", "ACCOUNTS_RECEIVABLE", "-c", "engine.toml"]).unwrap();
        assert_eq!(
            cli.report,
            Some(Report::Balance {
                account: AccountName::AccountsReceivable
            })
        );
        assert_eq!(cli.config, Some(PathBuf::from("engine.toml")));

        assert!(Cli::try_parse_from(["tally-report", "balance", "PETTY_CASH"]).is_err());
        assert!(Cli::try_parse_from(["tally-report", "balance"]).is_err());
        assert!(Cli::try_parse_from(["tally-report", "verify", "--from", "yesterday"]).is_err());
    }

    #[test]
    fn test_report_defaults_to_trial_balance() {
        let cli = Cli::try_parse_from(["tally-report"]).unwrap();
        assert_eq!(cli.report, None);

        let cli = Cli::try_parse_from(["tally-report", "receivables", "--customer", "cust-1"]).unwrap();
        assert_eq!(
            cli.report,
            Some(Report::Receivables {
                customer: Some("cust-1".to_string())
            })
        );
    }
}
