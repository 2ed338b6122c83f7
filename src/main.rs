use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};

mod aggregate;
mod console;
mod datetime;
mod error;
mod lifecycle;
mod report;
mod sqlite_store;
mod store;
mod timer;

use console::{ConsoleMarkdownList, ConsolePresenter};
use lifecycle::TimerLifecycle;
use sqlite_store::SqliteTimerStore;

/// CLI driver for the timer engine.
///
/// Team, user, and project identity normally arrive resolved from the chat
/// platform; here they are plain flags.
///
/// # Examples
/// ```
/// $ cargo run -- start "Bug fix"
/// $ cargo run -- status
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        short = 't',
        long = "team",
        help = "Team identifier",
        default_value = "default",
        global = true
    )]
    team: String,

    #[clap(
        short = 'u',
        long = "user",
        help = "User identifier",
        default_value = "default",
        global = true
    )]
    user: String,

    #[clap(long = "db", help = "Path to the timer database", global = true)]
    db: Option<PathBuf>,

    #[clap(long = "json", help = "Emit the report as JSON", global = true)]
    json: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

#[derive(Debug, Subcommand)]
enum SubCommands {
    #[clap(about = "Start timing a task, stopping any running timer first")]
    Start(StartArgs),
    #[clap(about = "Stop the running timer")]
    Stop,
    #[clap(about = "Show today's totals and the running timer")]
    Status,
    #[clap(about = "Show totals over a date range")]
    Report(ReportArgs),
}

#[derive(Debug, clap::Args)]
struct StartArgs {
    #[clap(help = "Task to start timing")]
    task: String,

    #[clap(
        short = 'p',
        long = "project",
        help = "Project identifier",
        default_value = "general"
    )]
    project: String,
}

#[derive(Debug, clap::Args)]
struct ReportArgs {
    #[clap(
        long = "from",
        help = "First day in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    from: DateTime<Utc>,

    #[clap(
        long = "to",
        help = "Last day (inclusive) in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    to: DateTime<Utc>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logger().context("Failed to initialize logging")?;

    let db_path = match &args.db {
        Some(path) => path.clone(),
        None => default_database_path()?,
    };
    let store = SqliteTimerStore::open(&db_path).context("Failed to open the timer database")?;
    let lifecycle = TimerLifecycle::new(&store);
    let now = datetime::now();

    let mut stdout = io::stdout();
    let mut presenter = ConsoleMarkdownList::new(&mut stdout);

    match &args.subcommand {
        SubCommands::Start(start) => {
            let task_hash = timer::task_hash(&start.project, &start.task);
            let outcome = lifecycle.start(
                &args.team,
                &args.user,
                &start.project,
                &task_hash,
                &start.task,
                &now,
            )?;
            let report = report::start_report(&outcome);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                presenter.show_start(&report)?;
            }
        }
        SubCommands::Stop => {
            let outcome = lifecycle.stop(&args.team, &args.user, &now)?;
            let report = report::stop_report(&outcome);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                presenter.show_stop(&report)?;
            }
        }
        SubCommands::Status => {
            let period = lifecycle.status(&args.team, &args.user, &now)?;
            let summary = report::period_summary(&period);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                presenter.show_period(&summary)?;
            }
        }
        SubCommands::Report(range) => {
            // The --to day is inclusive; the engine takes a half-open range.
            let end = range.to + Duration::days(1);
            let period = lifecycle.period_report(&args.team, &args.user, &range.from, &end, &now)?;
            let summary = report::period_summary(&period);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                presenter.show_period(&summary)?;
            }
        }
    }

    Ok(())
}

/// Logs to stderr so report output on stdout stays clean.
fn setup_logger() -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr())
        .apply()
        .context("Failed to apply logger configuration")?;

    Ok(())
}

fn default_database_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Failed to resolve the user data directory")?;
    Ok(base.join("punchcard").join("timers.db"))
}

/// Parses a date as local midnight.
fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let naive_date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date: {}", s))?;
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;
    let datetime = Local
        .from_local_datetime(&naive_datetime)
        .single()
        .context("Failed to convert to DateTime<Local>")?
        .to_utc();

    Ok(datetime)
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use rstest::rstest;

    use super::parse_date;

    #[test]
    fn test_parse_date() {
        let parsed = parse_date("2024-01-15").unwrap();

        assert_eq!(
            parsed,
            Local.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap().to_utc()
        );
    }

    #[rstest]
    #[case::empty("")]
    #[case::wrong_order("15-01-2024")]
    #[case::not_a_date("today")]
    fn test_parse_date_invalid(#[case] input: &str) {
        assert!(parse_date(input).is_err());
    }
}
