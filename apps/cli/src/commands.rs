//! CLI command definitions, routing, and tracing setup.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use prospector_core::{RunOutcome, RunReport, Workflow};
use prospector_shared::{AppConfig, CompanyRecord, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Prospector: triage waitlist signups by researching their websites.
#[derive(Parser)]
#[command(
    name = "prospector",
    version,
    about = "Classify waitlist signups by fetching their websites and asking a language model.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.prospector/prospector.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Classify a single company and print the run report as JSON.
    Classify {
        /// Domain entered at signup (e.g. acme.com).
        #[arg(long)]
        domain: String,

        /// Company name entered at signup.
        #[arg(long)]
        name: String,

        /// What they said they want to use the product for.
        #[arg(long)]
        hint: Option<String>,
    },

    /// Classify every record of a JSON-lines file.
    Batch {
        /// Input file, one record per line.
        input: PathBuf,

        /// Write results here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// only results.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "prospector=info",
        1 => "prospector=debug",
        _ => "prospector=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Classify { domain, name, hint } => {
            cmd_classify(config_path, &domain, &name, hint.as_deref()).await
        }
        Command::Batch { input, out } => cmd_batch(config_path, &input, out.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

async fn cmd_classify(
    config_path: Option<&Path>,
    domain: &str,
    name: &str,
    hint: Option<&str>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let workflow = Workflow::from_config(&config)?;

    let record = CompanyRecord::new(domain, name, hint.unwrap_or_default());
    info!(domain, name, "classifying company");

    let report = workflow.run(&record).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

/// One output line for a run that failed.
#[derive(Debug, Serialize)]
struct FailedRun {
    record: serde_json::Value,
    error: String,
}

/// Per-batch tallies.
#[derive(Debug, Default, PartialEq)]
struct BatchSummary {
    classified: usize,
    gave_up: usize,
    failed: usize,
}

impl BatchSummary {
    fn record(&mut self, report: &RunReport) {
        match report.outcome {
            RunOutcome::Classified { .. } => self.classified += 1,
            RunOutcome::GaveUp => self.gave_up += 1,
        }
    }
}

/// Non-blank input lines, with their 1-based line numbers.
fn batch_lines(input: &str) -> Vec<(usize, &str)> {
    input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect()
}

fn parse_record(line: &str) -> std::result::Result<CompanyRecord, String> {
    serde_json::from_str(line).map_err(|e| format!("invalid record: {e}"))
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .wrap_err("invalid progress template")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

async fn cmd_batch(config_path: Option<&Path>, input: &Path, out: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let workflow = Workflow::from_config(&config)?;

    let content = std::fs::read_to_string(input)
        .wrap_err_with(|| format!("failed to read {}", input.display()))?;
    let lines = batch_lines(&content);

    let mut writer: BufWriter<Box<dyn Write>> = match out {
        Some(path) => {
            let file = std::fs::File::create(path)
                .wrap_err_with(|| format!("failed to create {}", path.display()))?;
            BufWriter::new(Box::new(file))
        }
        None => BufWriter::new(Box::new(std::io::stdout())),
    };

    info!(input = %input.display(), records = lines.len(), "starting batch");

    let bar = progress_bar(lines.len())?;
    let summary = run_batch(&workflow, &lines, &mut writer, &bar).await?;

    bar.finish_and_clear();

    eprintln!();
    eprintln!("  Batch complete");
    eprintln!("  Classified: {}", summary.classified);
    eprintln!("  Gave up:    {}", summary.gave_up);
    eprintln!("  Failed:     {}", summary.failed);
    if let Some(path) = out {
        eprintln!("  Output:     {}", path.display());
    }
    eprintln!();

    Ok(())
}

/// Run every line through `workflow`, writing one JSON line per input line.
/// A line that fails to parse or a run that fails is written as
/// `{record, error}` and counted; the batch carries on. Each line is flushed
/// as soon as it is written.
async fn run_batch<W: Write>(
    workflow: &Workflow,
    lines: &[(usize, &str)],
    writer: &mut W,
    bar: &ProgressBar,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for &(line_no, line) in lines {
        let output = match parse_record(line) {
            Err(error) => {
                warn!(line = line_no, %error, "skipping line");
                summary.failed += 1;
                serde_json::to_string(&FailedRun {
                    record: serde_json::Value::String(line.to_string()),
                    error,
                })?
            }
            Ok(record) => {
                bar.set_message(record.domain.clone());
                match workflow.run(&record).await {
                    Ok(report) => {
                        summary.record(&report);
                        serde_json::to_string(&report)?
                    }
                    Err(e) => {
                        warn!(line = line_no, domain = %record.domain, error = %e, "run failed, skipping");
                        summary.failed += 1;
                        serde_json::to_string(&FailedRun {
                            record: serde_json::to_value(&record)?,
                            error: e.to_string(),
                        })?
                    }
                }
            }
        };

        writeln!(writer, "{output}")?;
        writer.flush()?;
        bar.inc(1);
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use clap::CommandFactory;
    use prospector_core::testing::{
        FetchOutcome, MockFetcher, MockSearcher, ScriptedModel, info_reply, nothing_reply,
    };
    use prospector_shared::{PolicyConfig, ProspectingConfig};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_classify() {
        let cli = Cli::try_parse_from([
            "prospector",
            "-vv",
            "classify",
            "--domain",
            "acme.com",
            "--name",
            "Acme Inc",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Classify { domain, name, hint } => {
                assert_eq!(domain, "acme.com");
                assert_eq!(name, "Acme Inc");
                assert!(hint.is_none());
            }
            _ => panic!("expected classify"),
        }
    }

    #[test]
    fn parses_batch_with_global_config() {
        let cli = Cli::try_parse_from([
            "prospector",
            "batch",
            "signups.jsonl",
            "--out",
            "out.jsonl",
            "--config",
            "custom.toml",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.command, Command::Batch { .. }));
    }

    #[test]
    fn batch_lines_skip_blanks() {
        let input = "{\"domain\":\"a.com\",\"company_name\":\"A\"}\n\n   \n{\"url\":\"b.io\",\"companyName\":\"B\"}\n";
        let lines = batch_lines(input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, 1);
        assert_eq!(lines[1].0, 4);
    }

    #[test]
    fn parse_record_accepts_waitlist_export() {
        let record = parse_record(r#"{"url":"b.io","companyName":"B","info":"rag"}"#).unwrap();
        assert_eq!(record, CompanyRecord::new("b.io", "B", "rag"));
        assert!(parse_record("not json").unwrap_err().starts_with("invalid record"));
    }

    fn mock_workflow(fetcher: MockFetcher, searcher: MockSearcher, model: ScriptedModel) -> Workflow {
        Workflow::new(
            Arc::new(fetcher),
            Arc::new(searcher),
            Arc::new(model),
            ProspectingConfig::default(),
            PolicyConfig::default(),
        )
    }

    fn output_lines(out: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn batch_writes_one_line_per_record() {
        let workflow = mock_workflow(
            MockFetcher::new().with("acme.com", FetchOutcome::Page("Acme builds agents".into())),
            MockSearcher::returning(vec![]),
            ScriptedModel::new(vec![
                Ok(info_reply("AI Native Early Legit Startup", 9)),
                Ok(nothing_reply()),
            ]),
        );
        let input = concat!(
            "{\"domain\":\"acme.com\",\"company_name\":\"Acme\"}\n",
            "not json\n",
            "{\"url\":\"deadsite.io\",\"companyName\":\"Dead\"}\n",
        );
        let lines = batch_lines(input);

        let mut out = Vec::new();
        let summary = run_batch(&workflow, &lines, &mut out, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                classified: 1,
                gave_up: 1,
                failed: 1,
            }
        );

        let written = output_lines(&out);
        assert_eq!(written.len(), 3);
        assert_eq!(written[0]["outcome"]["status"], "classified");
        assert_eq!(written[0]["outcome"]["source_url"], "https://acme.com/");
        assert_eq!(written[1]["record"], "not json");
        assert!(written[1]["error"].as_str().unwrap().starts_with("invalid record"));
        assert_eq!(written[2]["outcome"]["status"], "gave_up");
        assert_eq!(written[2]["record"]["domain"], "deadsite.io");
    }

    #[tokio::test]
    async fn batch_continues_after_search_failure() {
        let workflow = mock_workflow(
            MockFetcher::new().with("acme.com", FetchOutcome::Page("Acme builds agents".into())),
            MockSearcher::failing(),
            ScriptedModel::new(vec![Ok(info_reply("Other", 3))]),
        );
        let input = concat!(
            "{\"domain\":\"deadsite.io\",\"company_name\":\"Dead\"}\n",
            "{\"domain\":\"acme.com\",\"company_name\":\"Acme\"}\n",
        );
        let lines = batch_lines(input);

        let mut out = Vec::new();
        let summary = run_batch(&workflow, &lines, &mut out, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.classified, 1);

        let written = output_lines(&out);
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["record"]["domain"], "deadsite.io");
        assert_eq!(written[0]["record"]["company_name"], "Dead");
        assert!(written[0]["error"].as_str().unwrap().contains("HTTP 500"));
        assert_eq!(written[1]["outcome"]["status"], "classified");
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let workflow = mock_workflow(
            MockFetcher::new(),
            MockSearcher::returning(vec![]),
            ScriptedModel::new(vec![]),
        );

        let mut out = Vec::new();
        let summary = run_batch(&workflow, &batch_lines("\n  \n"), &mut out, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert!(out.is_empty());
    }
}
