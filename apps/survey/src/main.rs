use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use catalog::TaskCatalog;
use clap::{Parser, Subcommand};
use flow::{
    group_from_launch, FlowController, FlowOptions, FormLayout, HttpFormSink, LogSink,
    SubmissionSink, SystemClock, TokioTickScheduler,
};
use serde::Serialize;
use shared::domain::Group;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod results;
mod terminal;

use crate::config::{load_settings, Settings};
use crate::results::write_report;
use crate::terminal::Terminal;

#[derive(Parser, Debug)]
#[command(name = "survey", about = "Cognitive flexibility study runner")]
struct Cli {
    /// Configuration file; defaults to ./survey.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs one participant session in the terminal.
    Run {
        /// Preselects the group (assisted/manual, or A/B) and skips the landing screen.
        #[arg(long, conflicts_with = "launch_url")]
        group: Option<String>,
        /// Launch link carrying a `group` query parameter.
        #[arg(long)]
        launch_url: Option<String>,
        /// Overrides the configured form endpoint.
        #[arg(long)]
        endpoint: Option<String>,
        /// Logs the submission instead of sending it.
        #[arg(long)]
        dry_run: bool,
        /// Also writes the session's result records to this JSON file.
        #[arg(long)]
        results_json: Option<PathBuf>,
    },
    /// Prints the active task catalog.
    Catalog {
        #[arg(long)]
        json: bool,
    },
    /// Prints the active form field layout as a `survey.toml` fragment.
    Layout,
}

#[derive(Serialize)]
struct LayoutDocument<'a> {
    form_layout: &'a FormLayout,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    init_tracing(&settings)?;

    let catalog = load_catalog(&settings)?;

    match cli.command {
        Command::Run {
            group,
            launch_url,
            endpoint,
            dry_run,
            results_json,
        } => {
            if endpoint.is_some() {
                settings.form_endpoint = endpoint;
            }
            let group = preselected_group(group.as_deref(), launch_url.as_deref())?;
            run_session(settings, catalog, group, dry_run, results_json.as_deref())?;
        }
        Command::Catalog { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.tasks())?);
            } else {
                for task in catalog.tasks() {
                    let kind = match &task.choices {
                        Some(choices) => format!("{} choices", choices.len()),
                        None => "free text".to_string(),
                    };
                    println!("{}. {} ({kind})", task.id, task.title);
                }
            }
        }
        Command::Layout => {
            let layout = settings.layout_for(catalog.len());
            layout.validate(catalog.len())?;
            let document = LayoutDocument {
                form_layout: &layout,
            };
            print!(
                "{}",
                toml::to_string_pretty(&document).context("failed to render field layout")?
            );
        }
    }

    Ok(())
}

fn init_tracing(settings: &Settings) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_filter)
            .with_context(|| format!("invalid log filter '{}'", settings.log_filter))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn load_catalog(settings: &Settings) -> Result<TaskCatalog> {
    match &settings.catalog_path {
        Some(path) => TaskCatalog::load(path)
            .with_context(|| format!("failed to load task catalog from {}", path.display())),
        None => Ok(TaskCatalog::builtin()),
    }
}

fn preselected_group(group: Option<&str>, launch_url: Option<&str>) -> Result<Option<Group>> {
    if let Some(raw) = group {
        return match Group::parse_label(raw) {
            Some(group) => Ok(Some(group)),
            None => bail!("unknown group '{raw}'; expected assisted, manual, A or B"),
        };
    }
    let Some(raw) = launch_url else {
        return Ok(None);
    };
    let group = group_from_launch(raw);
    if group.is_none() {
        warn!(launch_url = raw, "launch link has no usable group; showing landing screen");
    }
    Ok(group)
}

fn run_session(
    settings: Settings,
    catalog: TaskCatalog,
    group: Option<Group>,
    dry_run: bool,
    results_json: Option<&Path>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let clock = Arc::new(SystemClock);
    let scheduler = Arc::new(TokioTickScheduler::new(
        runtime.handle().clone(),
        settings.tick_interval(),
        clock.clone(),
    ));
    let elapsed = scheduler.subscribe();

    let http = match settings.endpoint()? {
        Some(endpoint) if !dry_run => {
            info!(%endpoint, "submissions go to form endpoint");
            Some(Arc::new(HttpFormSink::new(endpoint, runtime.handle().clone())))
        }
        _ => {
            info!("no form endpoint in use; submissions are logged only");
            None
        }
    };
    let sink: Arc<dyn SubmissionSink> = match &http {
        Some(http) => http.clone(),
        None => Arc::new(LogSink),
    };

    let layout = settings.layout_for(catalog.len());
    let options = FlowOptions {
        assisted_gate: settings.assisted_gate,
        pre_survey_url: settings.pre_survey_url.clone(),
    };
    let mut flow = FlowController::new(catalog, layout, sink)?
        .with_options(options)
        .with_clock(clock)
        .with_scheduler(scheduler);
    info!(session_id = %flow.session().id(), "session started");

    if let Some(group) = group {
        flow.select_group(group)?;
    }

    let mut terminal =
        Terminal::new(io::stdin().lock(), io::stdout().lock()).with_elapsed(elapsed);
    terminal.run(&mut flow)?;
    if let Some(path) = results_json {
        write_report(path, &flow.session().report())?;
    }
    drop(flow);

    if let Some(http) = http {
        runtime.block_on(http.drain(settings.submit_timeout()));
    }
    Ok(())
}
