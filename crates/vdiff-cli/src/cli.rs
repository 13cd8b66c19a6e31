//! Command-line front end for building and inspecting diff reports.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;
use vdiff_config::AppConfig;
use vdiff_core::{BuildParam, BuildRequest, BuildService, NumberInput, PathFilterInput};
use vdiff_events::{Event, EventBus, EventEnvelope, EventId, EventStream};
use vdiff_telemetry::build_sha;

use crate::bootstrap;
use crate::error::{CliError, CliResult};
use crate::output::{self, BuildState, StatusView};

/// Parses CLI arguments, executes the requested command and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return report_outcome(Err(err.into())),
    };
    if let Err(err) = bootstrap::install_logging(&config) {
        return report_outcome(Err(err));
    }

    let run_id = Uuid::new_v4();
    let span = info_span!(
        "app",
        mode = "cli",
        build_sha = %build_sha(),
        run_id = %run_id,
        command = cli.command.label()
    );
    report_outcome(execute(cli, &config).instrument(span).await)
}

fn report_outcome(result: CliResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn execute(cli: Cli, config: &AppConfig) -> CliResult<()> {
    info!("cli command started");
    let service = bootstrap::build_service(config).await?;
    let format = cli.output;

    match cli.command {
        Command::Build(args) => {
            handle_build(&service, &args, config.clean_on_start, format).await
        }
        Command::Wait(args) => handle_wait(&service, &args, format).await,
        Command::Status(args) => handle_status(&service, &args, format).await,
        Command::Show(args) => handle_show(&service, &args, format).await,
        Command::Fingerprint(args) => handle_fingerprint(&service, &args, format),
    }
}

#[derive(Parser)]
#[command(name = "vdiff", about = "Build and inspect visual diff reports")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "VDIFF_CONFIG",
        help = "YAML configuration file; VDIFF_* variables override it"
    )]
    config: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the report for a request, or reuse a finished one with `--wait`.
    Build(BuildArgs),
    /// Wait for a build running elsewhere to publish its report.
    Wait(RequestArgs),
    /// Show whether a request is cached, building or idle.
    Status(RequestArgs),
    /// Print the viewer resource of a finished report.
    Show(RequestArgs),
    /// Print the fingerprint and workspace of a request.
    Fingerprint(RequestArgs),
}

impl Command {
    const fn label(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::Wait(_) => "wait",
            Self::Status(_) => "status",
            Self::Show(_) => "show",
            Self::Fingerprint(_) => "fingerprint",
        }
    }
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    request: RequestArgs,
    #[arg(long, help = "Label echoed in the chat notification")]
    label: Option<String>,
    #[arg(
        long,
        help = "Serve a cached report or wait for an in-flight build instead of rebuilding"
    )]
    wait: bool,
}

#[derive(Args)]
struct RequestArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON build request; flags below override its fields"
    )]
    request: Option<PathBuf>,
    #[arg(long)]
    mode: Option<String>,
    #[arg(long, value_name = "PREFIX")]
    expect: Option<String>,
    #[arg(long, value_name = "PREFIX")]
    actual: Option<String>,
    #[arg(long)]
    threshold: Option<String>,
    #[arg(
        long = "filter",
        short = 'f',
        value_name = "REGEX",
        help = "Path filter; repeat to require several patterns"
    )]
    filters: Vec<String>,
    #[arg(long)]
    radius: Option<String>,
    #[arg(long)]
    swidth: Option<String>,
    #[arg(long)]
    colordist: Option<String>,
}

impl RequestArgs {
    fn to_request(&self) -> CliResult<BuildRequest> {
        let mut request = match &self.request {
            Some(path) => read_request(path)?,
            None => BuildRequest::default(),
        };
        if let Some(mode) = &self.mode {
            request.mode.clone_from(mode);
        }
        if let Some(expect) = &self.expect {
            request.expect_path.clone_from(expect);
        }
        if let Some(actual) = &self.actual {
            request.actual_path.clone_from(actual);
        }
        if !self.filters.is_empty() {
            request.path_filters = Some(PathFilterInput::Many(self.filters.clone()));
        }
        override_number(&mut request.threshold, self.threshold.as_ref());
        override_number(&mut request.radius, self.radius.as_ref());
        override_number(&mut request.swidth, self.swidth.as_ref());
        override_number(&mut request.colordist, self.colordist.as_ref());
        Ok(request)
    }

    fn to_param(&self) -> CliResult<BuildParam> {
        Ok(BuildParam::new(self.to_request()?)?)
    }
}

fn override_number(slot: &mut Option<NumberInput>, value: Option<&String>) {
    if let Some(value) = value {
        *slot = Some(NumberInput::Text(value.clone()));
    }
}

fn read_request(path: &Path) -> CliResult<BuildRequest> {
    let text = fs::read_to_string(path).map_err(|err| {
        CliError::validation(format!(
            "failed to read request file {}: {err}",
            path.display()
        ))
    })?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::validation(format!("invalid request file {}: {err}", path.display()))
    })
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

async fn handle_build(
    service: &BuildService,
    args: &BuildArgs,
    clean_on_start: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let param = args.request.to_param()?;
    let location = service.locate(&param)?;
    if clean_on_start && !args.wait {
        service.prepare_workspace(true).await?;
    }
    let printer =
        (format == OutputFormat::Table).then(|| ProgressPrinter::spawn(service.events()));

    let label = args.label.as_deref();
    let result = if args.wait {
        service.ensure_report(&param, label).await
    } else {
        service.build(&param, label).await
    };
    if let Some(printer) = printer {
        printer.finish(service.events()).await;
    }

    let report = result?;
    output::render_report(&report, &service.report_url(&location), format)
}

async fn handle_wait(
    service: &BuildService,
    args: &RequestArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let param = args.to_param()?;
    let location = service.locate(&param)?;
    let report = service.await_result(&param).await?;
    output::render_report(&report, &service.report_url(&location), format)
}

async fn handle_status(
    service: &BuildService,
    args: &RequestArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let param = args.to_param()?;
    let location = service.locate(&param)?;
    let state = if service.load_report(&param).await?.is_some() {
        BuildState::Cached
    } else if service.is_building(&param)? {
        BuildState::Building
    } else {
        BuildState::Idle
    };
    output::render_status(
        &StatusView {
            fingerprint: location.hash(),
            state,
            workspace: location.root().display().to_string(),
        },
        format,
    )
}

async fn handle_show(
    service: &BuildService,
    args: &RequestArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let param = args.to_param()?;
    let resource = service.resource(&param).await?.ok_or_else(|| {
        CliError::validation("no report has been built for this request; run `vdiff build` first")
    })?;
    output::render_resource(&resource, format)
}

fn handle_fingerprint(
    service: &BuildService,
    args: &RequestArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let param = args.to_param()?;
    output::render_location(&service.locate(&param)?, format)
}

/// Prints build progress to stderr while a build runs in this process.
struct ProgressPrinter {
    stop_at: oneshot::Sender<EventId>,
    handle: JoinHandle<()>,
}

impl ProgressPrinter {
    fn spawn(events: &EventBus) -> Self {
        let seen = events.last_event_id().unwrap_or(0);
        let stream = events.subscribe(None);
        let (stop_at, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(drain_progress(stream, seen, stop_rx, |line| {
            eprintln!("{line}");
        }));
        Self { stop_at, handle }
    }

    /// Let the printer catch up with everything published so far, then stop.
    async fn finish(self, events: &EventBus) {
        let last = events.last_event_id().unwrap_or(0);
        if self.stop_at.send(last).is_err() {
            return;
        }
        if let Err(err) = self.handle.await {
            warn!(error = %err, "progress printer stopped unexpectedly");
        }
    }
}

/// Emit a line for every progress event until the id received on `stop_at`
/// has been seen.
async fn drain_progress<F>(
    mut stream: EventStream,
    mut seen: EventId,
    mut stop_at: oneshot::Receiver<EventId>,
    mut emit: F,
) where
    F: FnMut(String) + Send,
{
    let mut last = None;
    loop {
        if last.is_some_and(|last| seen >= last) {
            break;
        }
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(envelope)) => {
                    seen = envelope.id;
                    if let Some(line) = progress_line(&envelope) {
                        emit(line);
                    }
                }
                Some(Err(_lagged)) => {}
                None => break,
            },
            stop = &mut stop_at, if last.is_none() => match stop {
                Ok(id) => last = Some(id),
                Err(_) => break,
            },
        }
    }
}

fn progress_line(envelope: &EventEnvelope) -> Option<String> {
    match &envelope.event {
        Event::BuildProgress {
            percent, message, ..
        } => Some(format!("[{percent:>3}%] {message}")),
        _ => None,
    }
}
