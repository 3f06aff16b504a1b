//! `agent-relay` command line

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agent_relay::{
    render_cards, ConnectionStatus, HttpPrClient, HttpTransport, ProjectForm, RelayConfig,
    SessionState, StreamClient,
};

#[derive(Parser, Debug)]
#[command(name = "agent-relay", version, about = "Stream a goal through the agent backend")]
struct Cli {
    /// JSON config file; environment variables are used when absent
    #[arg(long, global = true, env = "AGENT_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a goal and print progress until the run finishes
    Run {
        /// Goal text
        goal: Option<String>,
        /// Build the goal from a project form JSON file instead
        #[arg(long, conflicts_with = "goal")]
        form: Option<PathBuf>,
        /// Submit the PR draft once the run is done
        #[arg(long, default_value_t = false)]
        create_pr: bool,
        /// Print agent cards at the end
        #[arg(long, default_value_t = false)]
        cards: bool,
    },
    /// Print the goal text built from a project form
    Goal { form: PathBuf },
    /// Check that the backend is reachable
    Health,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<RelayConfig> {
    let mut config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RelayConfig::from_env().context("invalid environment configuration")?,
    };
    if let Some(base) = &cli.api_base {
        config.api_base = base.clone();
        config = config.validate().context("invalid --api-base")?;
    }
    Ok(config)
}

fn read_form(path: &PathBuf) -> Result<ProjectForm> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid form in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match &cli.command {
        Command::Goal { form } => {
            println!("{}", read_form(form)?.to_goal());
        }
        Command::Health => {
            let config = load_config(&cli)?;
            let transport = HttpTransport::new(&config.api_base)?;
            let status = transport
                .health()
                .await
                .with_context(|| format!("backend at {} is not healthy", config.api_base))?;
            println!("{}: {status}", config.api_base);
        }
        Command::Run {
            goal,
            form,
            create_pr,
            cards,
        } => {
            let goal = match (goal, form) {
                (Some(goal), _) => goal.clone(),
                (None, Some(form)) => read_form(form)?.to_goal(),
                (None, None) => bail!("either a goal or --form is required"),
            };
            let config = load_config(&cli)?;
            run(&config, &goal, *create_pr, *cards).await?;
        }
    }

    Ok(())
}

async fn run(config: &RelayConfig, goal: &str, create_pr: bool, cards: bool) -> Result<()> {
    let transport = HttpTransport::new(&config.api_base)?.with_max_frame_bytes(config.max_frame_bytes);
    let submitter = HttpPrClient::new(&config.api_base)?.with_cookie(config.cookie.clone());
    let mut client = StreamClient::new(
        Arc::new(transport),
        Arc::new(submitter),
        config.client_options(),
    );
    let session = client.session();

    info!(api_base = %config.api_base, "Starting run");
    client.start(goal);

    let mut printer = Printer::default();
    printer.update(&session.snapshot());

    while !client.is_settled() {
        tokio::select! {
            signal = client.next_signal() => {
                let Some(signal) = signal else { break };
                client.handle(signal);
                printer.update(&session.snapshot());
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                client.stop();
                break;
            }
        }
    }

    let state = session.snapshot();
    if cards {
        for card in render_cards(&state, Utc::now()) {
            println!("{card}");
        }
    }

    if create_pr && state.connection == ConnectionStatus::Done {
        client.request_pr();
        client.run_until_settled().await;
        println!("{}", session.read(|s| s.pr_status.clone()));
    }

    match state.connection {
        ConnectionStatus::Error => bail!("stream ended with an error (trace {})", state.trace_id),
        _ => Ok(()),
    }
}

/// Prints new log lines and status changes
#[derive(Default)]
struct Printer {
    seen: u64,
    status_line: String,
}

impl Printer {
    fn update(&mut self, state: &SessionState) {
        for line in state.log.since(self.seen) {
            println!("{line}");
        }
        self.seen = state.log.total();

        if state.status_line != self.status_line {
            eprintln!("» {}", state.status_line);
            self.status_line = state.status_line.clone();
        }
    }
}
