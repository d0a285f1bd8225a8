//! catlearn - command-line front end for the category-learning model.
//!
//! Every command writes one JSON document (or a one-line summary) to
//! stdout. Logs go to stderr.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cl_common::error::{format_error_human, StructuredError};
use cl_common::{Error, OutputFormat, Result, SCHEMA_VERSION};
use cl_config::{load_settings, Settings, SettingsSnapshot, ValidationError};
use cl_core::exit_codes::ExitCode;
use cl_core::logging::{event_names, generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use cl_core::schema::{available_schemas, generate_schema};
use cl_core::{
    report_draw, CategoryLearningModel, DensityError, LogDensity, ModelData, ModelParams, ParamError,
    ParamsFile,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "catlearn")]
#[command(about = "Hierarchical NIW category-learning model: validate data, evaluate densities, report draws")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to settings.json (overrides CATLEARN_SETTINGS and XDG lookup)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a data file and print its dimensions and derived hyperparameters
    Check(DataArgs),

    /// Evaluate the log density of one parameter draw
    Eval(EvalArgs),

    /// Print NIW posteriors and predictive scales for every (category, subject)
    Beliefs(ModelArgs),

    /// Print category probabilities for every test trial
    Predict(ModelArgs),

    /// Reconstruct m_0_cor, m_0_cov and S_0 for one draw or an array of draws
    Report(ReportArgs),

    /// Print the JSON schema of an input file format
    Schema(SchemaArgs),

    /// Show the resolved settings and where they came from
    Settings,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Check(_) => "check",
            Commands::Eval(_) => "eval",
            Commands::Beliefs(_) => "beliefs",
            Commands::Predict(_) => "predict",
            Commands::Report(_) => "report",
            Commands::Schema(_) => "schema",
            Commands::Settings => "settings",
        }
    }
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Data contract JSON file
    #[arg(long)]
    data: PathBuf,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Data contract JSON file
    #[arg(long)]
    data: PathBuf,

    /// Parameter draw JSON file
    #[arg(long)]
    params: PathBuf,
}

#[derive(Args, Debug)]
struct EvalArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Read --params as a JSON array on the unconstrained scale
    #[arg(long)]
    unconstrained: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Parameter draw JSON file (one object, or an array of draws)
    #[arg(long)]
    params: PathBuf,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Schema name (data, params)
    name: Option<String>,

    /// List available schemas
    #[arg(long)]
    list: bool,
}

/// Result of a successful command.
struct CommandOutput {
    payload: Value,
    summary: String,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::Clean
                }
                _ => ExitCode::ArgsError,
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    init_logging(&LogConfig::from_env(cli.global.log_level, cli.global.log_format));

    let run_id = generate_run_id();
    let command = cli.command.name();
    tracing::info!(event = event_names::COMMAND_STARTED, %run_id, command, "command started");

    let result = match &cli.command {
        Commands::Check(args) => run_check(&cli.global, args),
        Commands::Eval(args) => run_eval(&cli.global, args),
        Commands::Beliefs(args) => run_beliefs(&cli.global, args),
        Commands::Predict(args) => run_predict(&cli.global, args),
        Commands::Report(args) => run_report(&cli.global, args),
        Commands::Schema(args) => run_schema(args),
        Commands::Settings => run_settings(&cli.global),
    };

    let exit_code = match result {
        Ok(output) => {
            emit_success(&cli.global, &run_id, command, output);
            tracing::info!(event = event_names::COMMAND_FINISHED, %run_id, command, "command finished");
            ExitCode::Clean
        }
        Err(CliError::Args(message)) => {
            emit_args_error(&cli.global, &run_id, command, &message);
            ExitCode::ArgsError
        }
        Err(CliError::Lib(err)) => {
            let code = ExitCode::for_error(&err);
            tracing::warn!(
                event = event_names::COMMAND_FAILED,
                %run_id,
                command,
                error_code = err.code(),
                "command failed"
            );
            emit_error(&cli.global, &run_id, command, &err);
            code
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Command failures: bad invocation or a library error.
enum CliError {
    Args(String),
    Lib(Error),
}

impl From<Error> for CliError {
    fn from(err: Error) -> Self {
        CliError::Lib(err)
    }
}

impl From<DensityError> for CliError {
    fn from(err: DensityError) -> Self {
        CliError::Lib(err.into())
    }
}

impl From<ParamError> for CliError {
    fn from(err: ParamError) -> Self {
        CliError::Lib(err.into())
    }
}

type CliResult = std::result::Result<CommandOutput, CliError>;

fn emit_success(global: &GlobalOpts, run_id: &str, command: &str, output: CommandOutput) {
    match global.format {
        OutputFormat::Json => {
            let mut doc = json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": command,
            });
            if let (Some(doc), Value::Object(payload)) = (doc.as_object_mut(), output.payload) {
                doc.extend(payload);
            }
            println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
        }
        OutputFormat::Summary => println!("{}", output.summary),
    }
}

fn emit_error(global: &GlobalOpts, run_id: &str, command: &str, err: &Error) {
    match global.format {
        OutputFormat::Json => {
            let doc = json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": run_id,
                "command": command,
                "error": StructuredError::from(err),
                "remediation": err.remediation(),
            });
            println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
        }
        OutputFormat::Summary => {
            let use_color = !global.no_color && std::io::IsTerminal::is_terminal(&std::io::stderr());
            eprintln!("{}", format_error_human(err, use_color));
        }
    }
}

fn emit_args_error(global: &GlobalOpts, run_id: &str, command: &str, message: &str) {
    match global.format {
        OutputFormat::Json => {
            let doc = json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": run_id,
                "command": command,
                "error": { "code": ExitCode::ArgsError.code_name(), "message": message },
            });
            println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
        }
        OutputFormat::Summary => eprintln!("error: {}", message),
    }
}

fn settings_error(err: ValidationError) -> Error {
    match err {
        ValidationError::IoError(msg) => Error::Config(msg),
        ValidationError::VersionMismatch { expected, actual } => {
            Error::VersionMismatch { expected, actual }
        }
        other => Error::InvalidSettings(other.to_string()),
    }
}

fn settings(global: &GlobalOpts) -> Result<(Settings, SettingsSnapshot)> {
    let (settings, snapshot) = load_settings(global.settings.as_deref()).map_err(settings_error)?;
    tracing::debug!(
        event = event_names::SETTINGS_RESOLVED,
        source = %snapshot.source,
        hash = snapshot.short_id(),
        "settings resolved"
    );
    Ok((settings, snapshot))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_model(
    global: &GlobalOpts,
    data_path: &Path,
) -> Result<(CategoryLearningModel, Settings, SettingsSnapshot)> {
    let (settings, snapshot) = settings(global)?;
    let data = ModelData::from_file(data_path, &settings)?;
    tracing::info!(
        event = event_names::DATA_LOADED,
        path = %data_path.display(),
        categories = data.num_categories(),
        subjects = data.num_subjects(),
        dim = data.dim(),
        trials = data.trials().len(),
        "data loaded"
    );
    Ok((CategoryLearningModel::new(data), settings, snapshot))
}

fn load_params(path: &Path, settings: &Settings) -> Result<ModelParams> {
    let file: ParamsFile = read_json(path)?;
    Ok(ModelParams::from_file_form(&file, settings.tolerances.simplex)?)
}

fn run_check(global: &GlobalOpts, args: &DataArgs) -> CliResult {
    let (model, _, snapshot) = load_model(global, &args.data)?;
    let data = model.data();
    let summary = format!(
        "ok: M={} L={} K={} trials={} sigma_kappanu={} dim={}",
        data.num_categories(),
        data.num_subjects(),
        data.dim(),
        data.trials().len(),
        data.hyper().sigma_kappanu,
        model.dim()
    );
    Ok(CommandOutput {
        payload: json!({
            "status": "ok",
            "data": {
                "M": data.num_categories(),
                "L": data.num_subjects(),
                "K": data.dim(),
                "N_test": data.trials().len(),
                "max_count": data.max_count(),
            },
            "hyperparameters": data.hyper(),
            "parameter_dim": model.dim(),
            "parameter_names": model.parameter_names(),
            "settings": snapshot,
        }),
        summary,
    })
}

fn run_eval(global: &GlobalOpts, args: &EvalArgs) -> CliResult {
    let (model, settings, snapshot) = load_model(global, &args.model.data)?;
    if args.unconstrained {
        let theta: Vec<f64> = read_json(&args.model.params)?;
        let (params, log_jacobian) = model.layout().constrain(&theta)?;
        let breakdown = model.evaluate(&params)?;
        let log_density = model.log_density(&theta)?;
        return Ok(CommandOutput {
            summary: format!("log_density={}", log_density),
            payload: json!({
                "scale": "unconstrained",
                "log_density": log_density,
                "log_jacobian": log_jacobian,
                "breakdown": breakdown,
                "settings": snapshot,
            }),
        });
    }
    let params = load_params(&args.model.params, &settings)?;
    let breakdown = model.evaluate(&params)?;
    Ok(CommandOutput {
        summary: format!("log_density={}", breakdown.log_density),
        payload: json!({
            "scale": "constrained",
            "log_density": breakdown.log_density,
            "breakdown": breakdown,
            "settings": snapshot,
        }),
    })
}

fn run_beliefs(global: &GlobalOpts, args: &ModelArgs) -> CliResult {
    let (model, settings, _) = load_model(global, &args.data)?;
    let params = load_params(&args.params, &settings)?;
    let beliefs = model.beliefs(&params)?;
    Ok(CommandOutput {
        summary: format!("{} cells updated", beliefs.cells.len()),
        payload: json!({ "beliefs": beliefs }),
    })
}

fn run_predict(global: &GlobalOpts, args: &ModelArgs) -> CliResult {
    let (model, settings, _) = load_model(global, &args.data)?;
    let params = load_params(&args.params, &settings)?;
    let trials = model.category_probabilities(&params)?;
    Ok(CommandOutput {
        summary: format!("{} trials predicted", trials.len()),
        payload: json!({ "lapse_rate": params.lapse_rate, "trials": trials }),
    })
}

fn run_report(global: &GlobalOpts, args: &ReportArgs) -> CliResult {
    let (settings, _) = settings(global)?;
    let raw: Value = read_json(&args.params)?;
    let files: Vec<ParamsFile> = match raw {
        Value::Array(_) => serde_json::from_value(raw).map_err(Error::from)?,
        Value::Object(_) => vec![serde_json::from_value(raw).map_err(Error::from)?],
        _ => {
            return Err(CliError::Args(
                "--params must hold a parameter object or an array of them".to_string(),
            ))
        }
    };
    let draws = files
        .iter()
        .map(|file| {
            ModelParams::from_file_form(file, settings.tolerances.simplex).map(|p| report_draw(&p))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(CommandOutput {
        summary: format!("{} draws reported", draws.len()),
        payload: json!({ "draws": draws }),
    })
}

fn run_schema(args: &SchemaArgs) -> CliResult {
    if args.list || args.name.is_none() {
        let list: Vec<Value> = available_schemas()
            .into_iter()
            .map(|(name, description)| json!({ "name": name, "description": description }))
            .collect();
        let names: Vec<&str> = available_schemas().into_iter().map(|(n, _)| n).collect();
        return Ok(CommandOutput {
            summary: names.join(" "),
            payload: json!({ "schemas": list }),
        });
    }
    let name = args.name.as_deref().unwrap_or_default();
    let schema = generate_schema(name)
        .ok_or_else(|| CliError::Args(format!("unknown schema '{}' (try --list)", name)))?;
    Ok(CommandOutput {
        summary: format!("schema {}", name),
        payload: json!({ "name": name, "schema": schema }),
    })
}

fn run_settings(global: &GlobalOpts) -> CliResult {
    let (settings, snapshot) = settings(global)?;
    Ok(CommandOutput {
        summary: format!("{} ({})", snapshot.source, snapshot.short_id()),
        payload: json!({ "settings": settings, "snapshot": snapshot }),
    })
}
