//! WellTrack CLI - Command-line interface for WellTrack Insight
//!
//! Commands:
//! - predict: Run the full pipeline on a combined request
//! - habit / mood / sleep: Score a single model
//! - motivation: Generate a daily motivational message
//! - doctor: Diagnose configuration, artifacts and credentials

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use welltrack_insight::schema::{
    HabitRequest, MoodRequest, PredictAllRequest, RequestAdapter, SleepRequest,
};
use welltrack_insight::{
    ArtifactRegistry, Config, InsightError, SynthesisError, TextGenerator, WellnessPipeline,
    PRODUCER_NAME, VERSION,
};

/// WellTrack - wellness predictions and recommendations from daily telemetry
#[derive(Parser)]
#[command(name = "welltrack")]
#[command(version = VERSION)]
#[command(about = "Predict habit success, mood and sleep quality, and suggest next steps", long_about = None)]
struct Cli {
    /// Config file (defaults to ./welltrack.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print a recommendation
    Predict {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Print the full pipeline report instead of only the recommendation
        #[arg(long)]
        report: bool,
    },

    /// Score the habit-success model
    Habit {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Score the mood model
    Mood {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Score the sleep-quality model
    Sleep {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate a short motivational message
    Motivation {
        /// Date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Diagnose configuration, artifacts and credentials
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), WelltrackCliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Predict { input, report } => cmd_predict(config_path, &input, report),
        Commands::Habit { input } => {
            let request: HabitRequest = RequestAdapter::parse(&read_input(&input)?)?;
            let response = build_pipeline(config_path)?.predict_habit(&request)?;
            print_json(&response)
        }
        Commands::Mood { input } => {
            let request: MoodRequest = RequestAdapter::parse(&read_input(&input)?)?;
            let response = build_pipeline(config_path)?.predict_mood(&request)?;
            print_json(&response)
        }
        Commands::Sleep { input } => {
            let request: SleepRequest = RequestAdapter::parse(&read_input(&input)?)?;
            let response = build_pipeline(config_path)?.predict_sleep(&request)?;
            print_json(&response)
        }
        Commands::Motivation { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let motivation = build_pipeline(config_path)?.daily_motivation(date)?;
            print_json(&motivation)
        }
        Commands::Doctor { json } => cmd_doctor(config_path, json),
    }
}

fn cmd_predict(
    config: Option<&Path>,
    input: &Path,
    report: bool,
) -> Result<(), WelltrackCliError> {
    let request: PredictAllRequest = RequestAdapter::parse(&read_input(input)?)?;
    let pipeline = build_pipeline(config)?;

    let report_value = pipeline.report(&request)?;
    if report {
        print_json(&report_value)
    } else {
        print_json(&report_value.recommendation)
    }
}

/// Load config and artifacts; a missing API key degrades synthesis instead of failing
fn build_pipeline(config_path: Option<&Path>) -> Result<WellnessPipeline, WelltrackCliError> {
    let (config, _) = Config::load(config_path)?;
    let registry = ArtifactRegistry::load(&config.models.dir)?;

    let generator: Box<dyn TextGenerator> = match config.groq_client() {
        Ok(client) => Box::new(client),
        Err(e) => {
            warn!(error = %e, "text generation unavailable");
            Box::new(Unavailable(e))
        }
    };

    Ok(WellnessPipeline::new(registry, generator, config.retry_config()))
}

/// Generator standing in for a backend that could not be configured
struct Unavailable(SynthesisError);

impl TextGenerator for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn generate(
        &self,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, SynthesisError> {
        Err(self.0.clone())
    }
}

fn read_input(input: &Path) -> Result<String, WelltrackCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), WelltrackCliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), WelltrackCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    match Config::load(config_path) {
        Ok((config, source)) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: match source {
                    Some(path) => format!("Loaded {}", path.display()),
                    None => "No config file, using defaults".to_string(),
                },
            });

            checks.push(match ArtifactRegistry::load(&config.models.dir) {
                Ok(_) => DoctorCheck {
                    name: "artifacts".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Models loaded from {}", config.models.dir.display()),
                },
                Err(e) => DoctorCheck {
                    name: "artifacts".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            });

            checks.push(match config.api_key() {
                Some(_) => DoctorCheck {
                    name: "api_key".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("{} is set ({})", config.llm.api_key_env, config.llm.model),
                },
                None => DoctorCheck {
                    name: "api_key".to_string(),
                    status: CheckStatus::Warning,
                    message: format!(
                        "{} is not set; recommendations fall back to rule-only output",
                        config.llm.api_key_env
                    ),
                },
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("WellTrack Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(WelltrackCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum WelltrackCliError {
    Io(io::Error),
    Insight(InsightError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for WelltrackCliError {
    fn from(e: io::Error) -> Self {
        WelltrackCliError::Io(e)
    }
}

impl From<InsightError> for WelltrackCliError {
    fn from(e: InsightError) -> Self {
        WelltrackCliError::Insight(e)
    }
}

impl From<serde_json::Error> for WelltrackCliError {
    fn from(e: serde_json::Error) -> Self {
        WelltrackCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<WelltrackCliError> for CliError {
    fn from(e: WelltrackCliError) -> Self {
        match e {
            WelltrackCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            WelltrackCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax")
            }
            WelltrackCliError::DoctorFailed => CliError::new(
                "DOCTOR_FAILED",
                "One or more health checks failed".to_string(),
                "Review the doctor report for details",
            ),
            WelltrackCliError::Insight(e) => {
                let message = e.to_string();
                match e {
                    InsightError::Validation(_) => CliError::new(
                        "VALIDATION_ERROR",
                        message,
                        "Quantities must be non-negative and ratios between 0 and 1",
                    ),
                    InsightError::Json(_) => CliError::new(
                        "JSON_ERROR",
                        message,
                        "Ensure the input matches the request schema for this command",
                    ),
                    InsightError::ArtifactLoad { .. } => CliError::new(
                        "ARTIFACT_ERROR",
                        message,
                        "Run 'welltrack doctor' to check the model directory",
                    ),
                    InsightError::FeatureShape { .. } => CliError::new(
                        "FEATURE_SHAPE_ERROR",
                        message,
                        "Model artifacts do not match the expected feature layout",
                    ),
                    InsightError::StageFailure { .. } => CliError::new(
                        "STAGE_FAILURE",
                        message,
                        "Check the model artifacts for this stage",
                    ),
                    InsightError::Synthesis(_) => CliError::new(
                        "SYNTHESIS_ERROR",
                        message,
                        "Check the API key and network access",
                    ),
                    InsightError::Config(_) => CliError::new(
                        "CONFIG_ERROR",
                        message,
                        "Check welltrack.toml",
                    ),
                    InsightError::Io(_) => {
                        CliError::new("IO_ERROR", message, "Check file paths and permissions")
                    }
                }
            }
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
