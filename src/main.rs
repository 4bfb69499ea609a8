mod conditions;
mod config;
mod date_range;
mod ingest;
mod metrics;
mod profile;
mod report;
#[cfg(feature = "serve")]
mod serve;
mod session;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use config::HealthConfig;
use ingest::{IngestReport, RawRow};
use report::HealthReport;
use session::HealthSession;
use std::path::PathBuf;
use std::process::ExitCode;

/// Validate bulk health-metric imports into a session-scoped log,
/// generate blank entry templates, and report on what was accepted.
#[derive(Parser, Debug)]
#[command(name = "healthboard", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "healthboard.toml", global = true)]
    config: PathBuf,

    /// Extra logging (per-row rejections, config resolution)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one blank entry row per date, as JSONL
    Template {
        #[command(subcommand)]
        range: TemplateRange,
    },
    /// Bulk-import rows from JSONL/JSON files into one session and print a report
    Import {
        /// Files to import, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Serve the HTTP API (one session per client)
    Serve,
}

#[derive(Subcommand, Debug)]
enum TemplateRange {
    /// Every day between two dates, inclusive
    Day {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Whole weeks from a start date
    Week {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long, default_value_t = 1)]
        weeks: u32,
    },
    /// Every day of a calendar month
    Month {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "healthboard=debug"
    } else if cli.quiet {
        "healthboard=warn"
    } else {
        "healthboard=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = HealthConfig::load(&cli.config)?;
    tracing::debug!(?config, "resolved config");

    match cli.command {
        Command::Template { range } => print_template(range),
        Command::Import { files, format } => import(config, &files, format),
        Command::Serve => serve_http(config).await,
    }
}

fn print_template(range: TemplateRange) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", render_template(range)?);
    Ok(())
}

/// One blank JSONL row per date in `range`.
fn render_template(range: TemplateRange) -> Result<String, Box<dyn std::error::Error>> {
    let dates = match range {
        TemplateRange::Day { from, to } => date_range::by_day(from, to),
        TemplateRange::Week { start, weeks } => date_range::by_week(start, weeks)?,
        TemplateRange::Month { year, month } => date_range::by_month(year, month)?,
    };
    let mut out = String::new();
    for date in dates {
        out.push_str(&serde_json::to_string(&RawRow::blank(date))?);
        out.push('\n');
    }
    Ok(out)
}

fn import(
    config: HealthConfig,
    files: &[PathBuf],
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let (session, imports) = import_files(&config, files)?;
    let report = HealthReport::build(&session, config.reports.recent_window);

    match format {
        Format::Text => print!("{}", render_import_text(&imports, &report)),
        Format::Json => {
            let imports: Vec<serde_json::Value> = imports
                .iter()
                .map(|(file, outcome)| {
                    serde_json::json!({ "file": file.display().to_string(), "result": outcome })
                })
                .collect();
            let samples: Vec<metrics::MetricSample> = session.metrics().samples().collect();
            let out = serde_json::json!({
                "imports": imports,
                "samples": samples,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

/// Ingest every file, in order, into one fresh session.
fn import_files(
    config: &HealthConfig,
    files: &[PathBuf],
) -> Result<(HealthSession, Vec<(PathBuf, IngestReport)>), Box<dyn std::error::Error>> {
    let mut session = HealthSession::new(config.ranges.to_ranges());
    if let Some(input) = &config.profile {
        session.save_profile(input.clone())?;
    }

    let mut imports = Vec::with_capacity(files.len());
    for file in files {
        let _span = tracing::info_span!("import", file = %file.display()).entered();
        let rows = ingest::read_rows(file)?;
        tracing::debug!(rows = rows.len(), "read import file");
        imports.push((file.clone(), session.ingest(&rows)));
    }
    Ok((session, imports))
}

/// Per-file counts, each unparseable row by number, then the report.
fn render_import_text(imports: &[(PathBuf, IngestReport)], report: &HealthReport) -> String {
    let mut out = String::new();
    for (file, outcome) in imports {
        out.push_str(&format!(
            "{}: added {} metric(s), rejected {}\n",
            file.display(),
            outcome.accepted,
            outcome.rejected.len()
        ));
        for warning in outcome.warnings() {
            out.push_str(&format!("  warning: {warning}\n"));
        }
    }
    out.push('\n');
    out.push_str(&report.render_text());
    out
}

#[cfg(feature = "serve")]
async fn serve_http(config: HealthConfig) -> Result<(), Box<dyn std::error::Error>> {
    serve::run(&config).await
}

#[cfg(not(feature = "serve"))]
async fn serve_http(_config: HealthConfig) -> Result<(), Box<dyn std::error::Error>> {
    Err("healthboard was built without the `serve` feature".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("healthboard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn template_week_renders_blank_rows() {
        let cli = parse(&["template", "week", "--start", "2025-01-06", "--weeks", "2"]);
        let Command::Template { range } = cli.command else {
            panic!("expected template command");
        };
        let out = render_template(range).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 14);
        let first: RawRow = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, RawRow::new("2025-01-06", ["", "", "", ""]));
        let last: RawRow = serde_json::from_str(lines[13]).unwrap();
        assert_eq!(last.date, "2025-01-19");
    }

    #[test]
    fn template_rejects_out_of_range_weeks() {
        let cli = parse(&["template", "week", "--start", "2025-01-06", "--weeks", "53"]);
        let Command::Template { range } = cli.command else {
            panic!("expected template command");
        };
        assert!(render_template(range).is_err());
    }

    #[test]
    fn import_merges_files_into_one_session_and_names_bad_rows() {
        let dir = TempDir::new().unwrap();
        let first = write_file(
            dir.path(),
            "first.jsonl",
            concat!(
                "{\"date\":\"2025-01-01\",\"heart_rate\":\"abc\"}\n",
                "{\"date\":\"2025-01-02\",\"heart_rate\":\"70\",\"glucose\":\"95\"}\n",
            ),
        );
        let second = write_file(
            dir.path(),
            "second.json",
            r#"[{"date":"2025-01-03","heart_rate":"999"},{"date":"2025-01-04","heart_rate":"72"}]"#,
        );

        let config = HealthConfig::default();
        let (session, imports) = import_files(&config, &[first.clone(), second.clone()]).unwrap();
        assert_eq!(session.metrics().len(), 2);
        assert_eq!(imports[0].1.accepted, 1);
        assert_eq!(imports[1].1.accepted, 1);

        let report = HealthReport::build(&session, config.reports.recent_window);
        let text = render_import_text(&imports, &report);
        assert!(text.contains(&format!(
            "{}: added 1 metric(s), rejected 1\n  warning: row 1 (2025-01-01): heart_rate value \"abc\" is not an integer\n",
            first.display()
        )));
        // range rejections are counted but not listed
        assert!(text.contains(&format!(
            "{}: added 1 metric(s), rejected 1\n\n",
            second.display()
        )));
        assert!(!text.contains("row 1 (2025-01-03)"));
        assert!(text.contains("  Heart Rate: 72 bpm\n"));
        assert!(text.contains("  Heart Rate: [70, 72]\n"));
    }

    #[test]
    fn import_stops_on_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.jsonl");
        assert!(import_files(&HealthConfig::default(), &[missing]).is_err());
    }
}
