// ABOUTME: Main entry point for the courier CLI and chat bridge
// ABOUTME: Initializes logging, config, agent, and task store, then runs the chosen command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courier::{compose, console::ConsoleRenderer, logging, metrics};
use courier_agent::testing::recording::RecordingAgent;
use courier_agent::{A2AClient, AgentRegistry, RemoteAgent, TaskIdParams, TaskQueryParams};
use courier_core::store::open_store;
use courier_core::{
    Config, DispatchOutcome, JournalingHandler, TaskMessageChannel, UpdateHandler, UserMessage,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Send messages to a remote A2A agent, one ordered conversation per task"
)]
struct Cli {
    /// Config file to use instead of the default search path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message to the agent and print the updates it streams back
    Send(SendArgs),
    /// Run the Slack Socket Mode bridge
    #[cfg(feature = "slack")]
    Slack,
    /// Inspect the local task journal
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Query or cancel a task on the remote agent
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
    /// Print the agent card published by the agent
    Card {
        /// Agent base URL (defaults to agent.url)
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(clap::Args)]
struct SendArgs {
    /// Task id; messages with the same id form one conversation
    #[arg(long)]
    task: String,
    #[arg(long)]
    session: Option<String>,
    /// JSON payload sent as a data part
    #[arg(long)]
    data: Option<String>,
    /// File sent inline as a file part (repeatable)
    #[arg(long = "file")]
    files: Vec<PathBuf>,
    /// Write a JSON transcript of the exchange to this path
    #[arg(long)]
    record: Option<PathBuf>,
    /// Save files returned by the agent into this directory
    #[arg(long)]
    save_files: Option<PathBuf>,
    /// Do not write the exchange to the task store
    #[arg(long)]
    no_journal: bool,
    /// Message text
    text: Vec<String>,
}

#[derive(Subcommand)]
enum TaskAction {
    /// Print a task and its history as JSON
    Show { id: String },
    /// Remove a task from the journal
    Delete { id: String },
}

#[derive(Subcommand)]
enum RemoteAction {
    /// Fetch a task (tasks/get)
    Get {
        id: String,
        /// Number of history messages to include
        #[arg(long)]
        history: Option<u32>,
    },
    /// Cancel a task (tasks/cancel)
    Cancel { id: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::install_panic_hook();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let _log_guard = logging::init(&config.logging)?;

    tracing::debug!(
        agent_type = %config.agent.agent_type,
        agent_url = ?config.agent.url,
        store = ?config.store.store_type,
        "Configuration loaded"
    );

    match cli.command {
        Command::Send(args) => send(config, args).await,
        #[cfg(feature = "slack")]
        Command::Slack => run_slack(config).await.map(|_| ExitCode::SUCCESS),
        Command::Task { action } => task(config, action).await.map(|_| ExitCode::SUCCESS),
        Command::Remote { action } => remote(config, action).await.map(|_| ExitCode::SUCCESS),
        Command::Card { url } => card(config, url).await.map(|_| ExitCode::SUCCESS),
    }
}

fn start_metrics(config: &Config) -> Result<()> {
    if let Some(listen) = config.metrics.listen_addr()? {
        metrics::init_metrics(listen)?;
    }
    Ok(())
}

async fn send(config: Config, args: SendArgs) -> Result<ExitCode> {
    start_metrics(&config)?;

    let parts = compose::compose_parts(&args.text, args.data.as_deref(), &args.files).await?;
    let agent = AgentRegistry::default().create_from_config(&config.agent)?;

    let recorder = args
        .record
        .as_ref()
        .map(|_| Arc::new(RecordingAgent::wrap(Arc::clone(&agent))));
    let agent: Arc<dyn RemoteAgent> = match &recorder {
        Some(recorder) => Arc::clone(recorder) as Arc<dyn RemoteAgent>,
        None => agent,
    };

    let mut console = ConsoleRenderer::stdout();
    if let Some(dir) = &args.save_files {
        console = console.with_save_dir(dir);
    }
    let handler: Arc<dyn UpdateHandler<()>> = if args.no_journal {
        Arc::new(console)
    } else {
        Arc::new(JournalingHandler::new(console, open_store(&config.store)?))
    };

    let channel = TaskMessageChannel::new(agent, handler);
    let mut message = UserMessage::new(args.task, parts, ());
    if let Some(session) = args.session {
        message = message.with_session(session);
    }

    let outcome = channel.dispatch(message).await;

    if let (Some(path), Some(recorder)) = (&args.record, &recorder) {
        recorder.save_transcript(path).await?;
        tracing::info!(path = %path.display(), "Transcript saved");
    }

    match outcome {
        DispatchOutcome::Completed { updates } => {
            tracing::debug!(updates, "Message completed");
            Ok(ExitCode::SUCCESS)
        }
        DispatchOutcome::Failed(error) => {
            eprintln!("error: {}", error);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(feature = "slack")]
async fn run_slack(config: Config) -> Result<()> {
    use courier::platform::SlackBridge;

    let slack_config = config.slack.clone().context(
        "Slack is not configured: add a [slack] section or set SLACK_APP_TOKEN and SLACK_BOT_TOKEN",
    )?;
    start_metrics(&config)?;

    let agent = AgentRegistry::default().create_from_config(&config.agent)?;
    let store = open_store(&config.store)?;
    let bridge = SlackBridge::connect(slack_config).await?;

    let handler = JournalingHandler::new(bridge.renderer(), store);
    let channel = Arc::new(TaskMessageChannel::new(agent, Arc::new(handler)));

    tracing::info!(agent = %config.agent.agent_type, "Starting Slack bridge");
    bridge.run(channel).await
}

async fn task(config: Config, action: TaskAction) -> Result<()> {
    let store = open_store(&config.store)?;
    match action {
        TaskAction::Show { id } => {
            let record = store
                .load(&id)
                .await?
                .with_context(|| format!("No task '{}' in the journal", id))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        TaskAction::Delete { id } => {
            store.delete(&id).await?;
            println!("Deleted task {}", id);
        }
    }
    Ok(())
}

async fn remote(config: Config, action: RemoteAction) -> Result<()> {
    let client = A2AClient::from_config(&config.agent)?;
    let task = match action {
        RemoteAction::Get { id, history } => {
            client
                .get_task(TaskQueryParams {
                    id,
                    history_length: history,
                })
                .await?
        }
        RemoteAction::Cancel { id } => client.cancel_task(TaskIdParams { id }).await?,
    };
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}

async fn card(config: Config, url: Option<String>) -> Result<()> {
    let base = url
        .or_else(|| config.agent.url.clone())
        .context("No agent URL: pass --url or set agent.url")?;
    let client = A2AClient::from_config(&config.agent)?;
    let card = client.agent_card(&base).await?;
    println!("{}", serde_json::to_string_pretty(&card)?);
    Ok(())
}
