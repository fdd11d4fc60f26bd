mod app;
mod cli;
mod config;
mod hub;
mod input;
mod k8s;
mod modal;
mod model;
mod namespace;
mod store;
mod submission;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppEvent, Catalog};
use clap::Parser;
use cli::CliArgs;
use config::Settings;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use hub::HubClient;
use k8s::KubeGateway;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use submission::{DeployEffect, SubmitTicket};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
type EventSender = mpsc::UnboundedSender<AppEvent>;
type GatewaySender = mpsc::UnboundedSender<KubeGateway>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let settings = Settings::load(&args)?;
    init_tracing(&settings.log_filter, settings.log_file.as_deref())?;
    if let Some(source) = &settings.source {
        info!(config = %source, "loaded config file");
    }

    let hub = HubClient::new(&settings.api_url, settings.token.clone())?;
    let mut gateway = KubeGateway::load();
    let mut app = App::new(hub.base_url().to_string(), gateway.clusters());

    run(&mut app, &hub, &mut gateway).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(app: &mut App, hub: &HubClient, gateway: &mut KubeGateway) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, hub, gateway).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    hub: &HubClient,
    gateway: &mut KubeGateway,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let (gateway_tx, mut gateway_rx) = mpsc::unbounded_channel::<KubeGateway>();
    let command = app.request_catalog();
    execute_app_command(command, hub, gateway, &tx, &gateway_tx);

    let mut reader = EventStream::new();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            execute_app_command(command, hub, gateway, &tx, &gateway_tx);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_event = rx.recv() => {
                if let Some(event) = maybe_event {
                    let command = app.handle_event(event);
                    execute_app_command(command, hub, gateway, &tx, &gateway_tx);
                }
            }
            maybe_gateway = gateway_rx.recv() => {
                if let Some(reloaded) = maybe_gateway {
                    *gateway = reloaded;
                    let command = app.handle_event(AppEvent::ClustersLoaded(gateway.clusters()));
                    execute_app_command(command, hub, gateway, &tx, &gateway_tx);
                }
            }
        }
    }

    Ok(())
}

/// Starts the work a command asks for. Results come back through `tx`.
fn execute_app_command(
    command: AppCommand,
    hub: &HubClient,
    gateway: &KubeGateway,
    tx: &EventSender,
    gateway_tx: &GatewaySender,
) {
    match command {
        AppCommand::None => {}
        AppCommand::RefreshCatalog => spawn_catalog_load(hub.clone(), tx.clone()),
        AppCommand::ReloadClusters => spawn_kubeconfig_reload(gateway_tx.clone()),
        AppCommand::Deploy(effect) => execute_deploy_effect(effect, hub, gateway, tx),
    }
}

fn execute_deploy_effect(
    effect: DeployEffect,
    hub: &HubClient,
    gateway: &KubeGateway,
    tx: &EventSender,
) {
    match effect {
        DeployEffect::FetchNamespaces { ticket, context } => {
            let gateway = gateway.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = gateway
                    .list_namespaces(&context)
                    .await
                    .map_err(|error| compact_error(&error));
                let _ = tx.send(AppEvent::NamespacesLoaded { ticket, result });
            });
        }
        DeployEffect::Install { ticket, request } => {
            let hub = hub.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let response = hub.install(&request).await;
                let _ = tx.send(AppEvent::InstallFinished { ticket, response });
            });
        }
        DeployEffect::ScheduleAutoClose { ticket, delay } => {
            spawn_auto_close(tx.clone(), ticket, delay);
        }
    }
}

fn spawn_catalog_load(hub: HubClient, tx: EventSender) {
    tokio::spawn(async move {
        let result = tokio::try_join!(hub.templates(), hub.applications())
            .map(|(templates, applications)| Catalog {
                templates,
                applications,
            })
            .map_err(|error| compact_error(&error));
        let _ = tx.send(AppEvent::CatalogLoaded(result));
    });
}

/// Reads the kubeconfig on the blocking pool and hands the new gateway back.
fn spawn_kubeconfig_reload(tx: GatewaySender) {
    tokio::spawn(async move {
        match tokio::task::spawn_blocking(KubeGateway::load).await {
            Ok(gateway) => {
                let _ = tx.send(gateway);
            }
            Err(error) => warn!("kubeconfig reload task failed: {error}"),
        }
    });
}

fn spawn_auto_close(tx: EventSender, ticket: SubmitTicket, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(AppEvent::AutoCloseElapsed { ticket });
    });
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("; ")
}
