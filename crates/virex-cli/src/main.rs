//! `virex` command-line host.

mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use virex::config::default_config_dir;
use virex::{
    init_logging, load_config_or_default, ArtifactStore, ChannelObserver, ClientConfig, DeepLink,
    JobRunner, JobState, JobSubmission, LogFormat, SessionStore, TransferClient, VirexApi,
};

const CONFIG_FILE: &str = "config.json";

#[derive(Parser)]
#[command(name = "virex")]
#[command(about = "Upload videos to the Virex processing service and manage results")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/virex/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the processing server is reachable
    Health,
    /// Sign in with a virexpro://auth link
    Login {
        #[arg(help = "Deep link, e.g. virexpro://auth?user_id=42&code=abc")]
        link: String,
    },
    /// Forget the stored identity
    Logout,
    /// Show identity, entitlement and endpoint
    Status {
        /// Refresh the subscription from the server first
        #[arg(long)]
        refresh: bool,
    },
    /// List processing templates
    Templates,
    /// Submit a video for processing and wait for the result
    Process {
        #[arg(help = "Path to the source video")]
        file: PathBuf,
        /// Template id (defaults to the last one used)
        #[arg(long, short)]
        template: Option<String>,
        /// Overlay text burned into the result
        #[arg(long)]
        text: Option<String>,
    },
    /// Query server-side metadata for a local video
    Info {
        file: PathBuf,
    },
    /// Manage processed results
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Manage the server endpoint
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List results, newest first
    List,
    /// Delete one result by file name or path
    Delete { name: String },
    /// Delete every result
    Clear,
}

#[derive(Subcommand)]
enum ServerAction {
    /// Show the current endpoint
    Show,
    /// Use a custom endpoint
    Set { url: String },
    /// Return to the configured default endpoint
    Reset,
}

/// Everything a command needs, built once at startup.
struct App {
    session: Arc<SessionStore>,
    api: VirexApi,
    runner: JobRunner,
    json: bool,
}

impl App {
    fn new(config: &ClientConfig, json: bool) -> anyhow::Result<Self> {
        let session = Arc::new(
            SessionStore::open(config.session_path(), &config.server_url)
                .context("Failed to open session")?,
        );
        let client = TransferClient::new(&config.transfer, session.clone())
            .context("Failed to build HTTP client")?;
        let store = ArtifactStore::new(config.resolved_cache_directory());

        match store.sweep_scratch() {
            Ok(0) => {}
            Ok(n) => info!("Removed {} leftover scratch files", n),
            Err(e) => warn!("Failed to sweep cache directory: {}", e),
        }

        Ok(Self {
            api: VirexApi::new(client.clone()),
            runner: JobRunner::new(client, store),
            session,
            json,
        })
    }

    fn store(&self) -> &ArtifactStore {
        self.runner.store()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_dir().join(CONFIG_FILE));
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let app = App::new(&config, cli.json)?;

    match cli.command {
        Commands::Health => health(&app).await,
        Commands::Login { link } => login(&app, &link).await,
        Commands::Logout => {
            app.session.logout()?;
            println!("Signed out");
            Ok(())
        }
        Commands::Status { refresh } => status(&app, refresh).await,
        Commands::Templates => templates(&app).await,
        Commands::Process {
            file,
            template,
            text,
        } => process(&app, file, template, text).await,
        Commands::Info { file } => {
            let info = app.api.video_info(&file).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Commands::History { action } => history(&app, action),
        Commands::Server { action } => server(&app, action),
    }
}

async fn health(app: &App) -> anyhow::Result<()> {
    let status = app.api.health_check().await?;
    if app.json {
        println!("{}", serde_json::to_string(&status)?);
    } else if status.is_healthy() {
        println!("{} is up (HTTP {})", app.session.server_url(), status.status);
    } else {
        println!("{} answered HTTP {}", app.session.server_url(), status.status);
    }
    Ok(())
}

async fn login(app: &App, link: &str) -> anyhow::Result<()> {
    let link: DeepLink = link.parse()?;
    app.api.authenticate(&link).await?;
    println!("Signed in as {}", app.session.display_name());
    Ok(())
}

async fn status(app: &App, refresh: bool) -> anyhow::Result<()> {
    if refresh {
        app.api.refresh_subscription().await?;
    }
    output::print_status(&app.session, app.store(), app.json)
}

async fn templates(app: &App) -> anyhow::Result<()> {
    let response = app.api.fetch_templates().await?;
    if app.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let last = app.session.last_template();
    for template in &response.templates {
        output::print_template(template, template.id == last);
    }
    Ok(())
}

async fn process(
    app: &App,
    file: PathBuf,
    template: Option<String>,
    text: Option<String>,
) -> anyhow::Result<()> {
    let template = template.unwrap_or_else(|| app.session.last_template());
    let mut submission = JobSubmission::new(file, template);
    if let Some(text) = text {
        submission = submission.with_overlay_text(text);
    }

    let (observer, mut transitions) = ChannelObserver::new();
    let handle = app.runner.spawn(submission, Arc::new(observer));

    while let Some(snapshot) = transitions.recv().await {
        output::print_transition(&snapshot, app.json)?;
    }

    let snapshot = handle.await.context("Job task panicked")?;
    match (snapshot.state, snapshot.error) {
        (JobState::Completed, _) => Ok(()),
        (_, Some(error)) => bail!("{}", error),
        (state, None) => bail!("Job ended in unexpected state {}", state),
    }
}

fn history(app: &App, action: HistoryAction) -> anyhow::Result<()> {
    let store = app.store();
    match action {
        HistoryAction::List => output::print_history(&store.list()?, app.json),
        HistoryAction::Delete { name } => {
            let Some(artifact) = store.artifact_for(&name) else {
                bail!("No result named '{}'", name);
            };
            if store.delete(&artifact)? {
                println!("Deleted {}", artifact.file_name);
            } else {
                println!("{} was already gone", artifact.file_name);
            }
            Ok(())
        }
        HistoryAction::Clear => {
            let removed = store.clear_all()?;
            println!("Deleted {} results", removed);
            Ok(())
        }
    }
}

fn server(app: &App, action: ServerAction) -> anyhow::Result<()> {
    match action {
        ServerAction::Show => println!("{}", app.session.server_url()),
        ServerAction::Set { url } => {
            let url = app.session.set_server_url(&url)?;
            println!("Server set to {}", url);
        }
        ServerAction::Reset => {
            app.session.reset_server_url()?;
            println!("Server reset to {}", app.session.server_url());
        }
    }
    Ok(())
}
