// crates/gateway-topology-cli/src/main.rs
// ============================================================================
// Module: Gateway Topology CLI Entry Point
// Description: Command dispatcher for topology composition and simulation.
// Purpose: Provide a safe, localized CLI over the composition engine.
// Dependencies: clap, gateway-topology-config, gateway-topology-core, serde, thiserror.
// ============================================================================

//! ## Overview
//! The `gateway-topology` CLI loads `gateway-topology.toml`, composes the
//! declared topology against the asset root, and then renders the manifest,
//! prints the build order or URL output, resolves routes, or simulates
//! invocations. All user-facing strings are routed through the i18n catalog.
//! Inputs are untrusted and are validated by the config and core crates
//! before any composition work happens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use gateway_topology_cli::i18n::Locale;
use gateway_topology_cli::i18n::set_locale;
use gateway_topology_cli::t;
use gateway_topology_config::AuditSinkKind;
use gateway_topology_config::TopologyConfig;
use gateway_topology_config::config_toml_example;
use gateway_topology_core::CompositionAuditSink;
use gateway_topology_core::DeploymentId;
use gateway_topology_core::FileAuditSink;
use gateway_topology_core::FsAssetInventory;
use gateway_topology_core::GatewayRecord;
use gateway_topology_core::HttpMethod;
use gateway_topology_core::InvocationRequest;
use gateway_topology_core::NoopAuditSink;
use gateway_topology_core::PathCaptures;
use gateway_topology_core::RequestPath;
use gateway_topology_core::RouteId;
use gateway_topology_core::Simulator;
use gateway_topology_core::Stage;
use gateway_topology_core::StderrAuditSink;
use gateway_topology_core::Topology;
use gateway_topology_core::UnitId;
use gateway_topology_core::compose;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "GATEWAY_TOPOLOGY_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "gateway-topology", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `GATEWAY_TOPOLOGY_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Config file path (defaults to gateway-topology.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Directory that bundle locations are resolved against (defaults to cwd).
    #[arg(long, value_name = "DIR", global = true)]
    asset_root: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compose the topology and emit its manifest.
    Synth(SynthCommand),
    /// Print logical ids in build order.
    Order,
    /// Print the `URL` stack output.
    Url,
    /// Resolve a request against a stage's deployed route table.
    Resolve(RequestArgs),
    /// Simulate a request end to end (keys, quotas, grants).
    Invoke(InvokeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
struct SynthCommand {
    /// Write the manifest to this path instead of stdout.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Request selector shared by `resolve` and `invoke`.
#[derive(Args, Debug)]
struct RequestArgs {
    /// Stage name.
    #[arg(long, value_name = "STAGE")]
    stage: String,
    /// Request method.
    #[arg(long, value_name = "METHOD", default_value = "GET")]
    method: HttpMethod,
    /// Request path, starting with `/`.
    #[arg(long, value_name = "PATH")]
    path: String,
}

/// Arguments for the `invoke` command.
#[derive(Args, Debug)]
struct InvokeCommand {
    /// Request selector.
    #[command(flatten)]
    request: RequestArgs,
    /// Raw API key value presented in the request.
    #[arg(long, value_name = "VALUE", conflicts_with = "api_key_name")]
    api_key: Option<String>,
    /// Name of a declared key whose value is presented.
    #[arg(long, value_name = "NAME")]
    api_key_name: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate,
    /// Print the canonical example configuration.
    Example,
}

/// CLI language selection.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

/// Global options consumed by composing commands.
struct CommandContext {
    /// Explicit config path.
    config: Option<PathBuf>,
    /// Explicit asset root.
    asset_root: Option<PathBuf>,
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// JSON report emitted by `resolve`.
#[derive(Debug, Serialize)]
struct ResolveReport<'a> {
    /// Stage name.
    stage: &'a str,
    /// Deployment serving the stage.
    deployment: &'a DeploymentId,
    /// Matched route.
    route: &'a RouteId,
    /// Route pattern.
    pattern: &'a str,
    /// Route method.
    method: HttpMethod,
    /// Target compute unit.
    target: &'a UnitId,
    /// Whether the route requires a key.
    api_key_required: bool,
    /// Captured parameters.
    captures: &'a PathCaptures,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let context = CommandContext {
        config: cli.config,
        asset_root: cli.asset_root,
    };
    match command {
        Commands::Synth(command) => command_synth(&context, &command),
        Commands::Order => command_order(&context),
        Commands::Url => command_url(&context),
        Commands::Resolve(command) => command_resolve(&context, &command),
        Commands::Invoke(command) => command_invoke(&context, &command),
        Commands::Config {
            command,
        } => command_config(&context, &command),
    }
}

/// Prints CLI help text.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Composition Commands
// ============================================================================

/// Executes the `synth` command.
fn command_synth(context: &CommandContext, command: &SynthCommand) -> CliResult<ExitCode> {
    let topology = compose_topology(context)?;
    let manifest = topology.manifest();
    let rendered = serde_json::to_string_pretty(manifest)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    match &command.output {
        Some(path) => {
            fs::write(path, format!("{rendered}\n")).map_err(|err| {
                CliError::new(t!("synth.write_failed", path = path.display(), error = err))
            })?;
            write_stdout_line(&t!(
                "synth.written",
                fingerprint = manifest.fingerprint.value,
                path = path.display()
            ))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        None => {
            write_stdout_line(&rendered)
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `order` command.
fn command_order(context: &CommandContext) -> CliResult<ExitCode> {
    let topology = compose_topology(context)?;
    let order = topology
        .graph()
        .build_order()
        .map_err(|err| CliError::new(t!("order.failed", error = err)))?;
    for id in order {
        write_stdout_line(id.as_str())
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `url` command.
fn command_url(context: &CommandContext) -> CliResult<ExitCode> {
    let topology = compose_topology(context)?;
    let url = topology.url().ok_or_else(|| CliError::new(t!("url.missing")))?;
    write_stdout_line(url).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Request Commands
// ============================================================================

/// Executes the `resolve` command.
fn command_resolve(context: &CommandContext, command: &RequestArgs) -> CliResult<ExitCode> {
    let topology = compose_topology(context)?;
    let record = primary_gateway(&topology)?;
    let stage = stage_named(record, &command.stage)?;
    let deployment = stage
        .deployment()
        .and_then(|id| record.deployment(id))
        .ok_or_else(|| CliError::new(t!("stage.unbound", stage = stage.name)))?;
    let path = RequestPath::parse(&command.path)
        .map_err(|err| CliError::new(t!("request.invalid", error = err)))?;
    let matched = deployment.routes().resolve(command.method, &path).ok_or_else(|| {
        CliError::new(t!(
            "resolve.no_match",
            method = command.method,
            path = command.path,
            stage = stage.name
        ))
    })?;
    let report = ResolveReport {
        stage: &stage.name,
        deployment: deployment.id(),
        route: &matched.route.id,
        pattern: matched.route.pattern.as_str(),
        method: matched.route.method,
        target: &matched.route.target,
        api_key_required: matched.route.api_key_required,
        captures: &matched.captures,
    };
    write_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `invoke` command; exits non-zero unless the request is served.
fn command_invoke(context: &CommandContext, command: &InvokeCommand) -> CliResult<ExitCode> {
    let topology = compose_topology(context)?;
    let selector = &command.request;
    let mut request = InvocationRequest::new(&selector.stage, selector.method, &selector.path);
    if let Some(value) = &command.api_key {
        request = request.with_api_key(value);
    } else if let Some(name) = &command.api_key_name {
        let key = topology
            .key_named(name)
            .ok_or_else(|| CliError::new(t!("invoke.key_not_found", name = name)))?;
        request = request.with_api_key(&key.value);
    }
    let mut simulator = Simulator::for_primary_gateway(&topology)
        .map_err(|err| CliError::new(t!("request.invalid", error = err)))?;
    let outcome = simulator
        .invoke(&request)
        .map_err(|err| CliError::new(t!("request.invalid", error = err)))?;
    write_json(&outcome)?;
    Ok(if outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(context: &CommandContext, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => command_config_validate(context),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(context: &CommandContext) -> CliResult<ExitCode> {
    let config = load_config(context)?;
    config
        .deployment_environment()
        .map_err(|err| CliError::new(t!("config.environment_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Composition Helpers
// ============================================================================

/// Loads the configuration selected by the global flags.
fn load_config(context: &CommandContext) -> CliResult<TopologyConfig> {
    TopologyConfig::load(context.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Loads config, opens the asset root and audit sink, and composes.
fn compose_topology(context: &CommandContext) -> CliResult<Topology> {
    let config = load_config(context)?;
    let environment = config
        .deployment_environment()
        .map_err(|err| CliError::new(t!("config.environment_failed", error = err)))?;
    let root = match &context.asset_root {
        Some(root) => root.clone(),
        None => std::env::current_dir()
            .map_err(|err| CliError::new(t!("assets.root_failed", error = err)))?,
    };
    let inventory = FsAssetInventory::new(&root).map_err(|err| {
        CliError::new(t!("assets.open_failed", path = root.display(), error = err))
    })?;
    let audit = open_audit_sink(&config)?;
    compose(&config.topology, environment, &inventory, audit.as_ref())
        .map_err(|err| CliError::new(t!("compose.failed", kind = err.kind(), error = err)))
}

/// Opens the configured audit sink.
fn open_audit_sink(config: &TopologyConfig) -> CliResult<Box<dyn CompositionAuditSink>> {
    match (config.audit.sink, config.audit.path.as_deref()) {
        (AuditSinkKind::Stderr, _) => Ok(Box::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Box::new(NoopAuditSink)),
        (AuditSinkKind::File, path) => {
            let path = Path::new(path.unwrap_or_default());
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(t!("audit.open_failed", path = path.display(), error = err))
            })?;
            Ok(Box::new(sink))
        }
    }
}

/// Returns the topology's primary gateway record.
fn primary_gateway(topology: &Topology) -> CliResult<&GatewayRecord> {
    topology.primary_gateway().ok_or_else(|| CliError::new(t!("gateway.missing")))
}

/// Looks up a stage by name on `record`.
fn stage_named<'a>(record: &'a GatewayRecord, name: &str) -> CliResult<&'a Stage> {
    record.stage_named(name).ok_or_else(|| {
        CliError::new(t!("stage.not_found", stage = name, gateway = record.gateway.name))
    })
}

/// Resolves the CLI locale from flags or the environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
