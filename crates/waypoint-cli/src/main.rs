use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use waypoint_core::config::WaypointConfig;
use waypoint_core::content::git::GitCli;
use waypoint_core::error::Error;
use waypoint_core::hosting::github::GitHubHosting;
use waypoint_core::hosting::{HostingProvider, NoopHosting};
use waypoint_core::model::checkpoint::Checkpoint;
use waypoint_core::session::SessionEngine;
use waypoint_core::session::checkpoint::CheckpointRequest;
use waypoint_core::session::collapse::CollapseRequest;
use waypoint_core::session::init::InitRequest;
use waypoint_core::session::jump::JumpRequest;
use waypoint_core::storage::duckdb::DuckDbStore;
use waypoint_core::templates::Templates;

#[derive(Parser)]
#[command(name = "waypoint", about = "Checkpointed work sessions on top of git")]
struct Cli {
    /// Path to the checkpoint database (default: ~/.waypoint/waypoint.db)
    #[arg(long, global = true, env = "WAYPOINT_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Repository to operate on
    #[arg(long, global = true, default_value = ".", env = "WAYPOINT_REPO")]
    repo: PathBuf,

    /// Name of the primary branch line
    #[arg(long, global = true, default_value = "main", env = "WAYPOINT_PRIMARY_LINE")]
    primary_line: String,

    /// Name of the git remote to publish to
    #[arg(long, global = true, default_value = "origin", env = "WAYPOINT_REMOTE")]
    remote: String,

    /// GitHub API base URL
    #[arg(long, global = true, default_value = "https://api.github.com", env = "WAYPOINT_GITHUB_API_URL")]
    github_api_url: String,

    /// GitHub token for repository creation and pull requests
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Owner of the GitHub repository that receives pull requests
    #[arg(long, global = true, env = "WAYPOINT_GITHUB_OWNER")]
    github_owner: Option<String>,

    /// GitHub repository that receives pull requests
    #[arg(long, global = true, env = "WAYPOINT_GITHUB_REPO")]
    github_repo: Option<String>,

    /// Directory holding `gitignore` and `README.md` templates
    #[arg(long, global = true, env = "WAYPOINT_TEMPLATES_DIR")]
    templates_dir: Option<PathBuf>,

    /// Commit author name, overriding git configuration
    #[arg(long, global = true, env = "WAYPOINT_GIT_USER_NAME")]
    git_user_name: Option<String>,

    /// Commit author email, overriding git configuration
    #[arg(long, global = true, env = "WAYPOINT_GIT_USER_EMAIL")]
    git_user_email: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the repository (templates, initial commit, optional remote)
    Init {
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
        /// Also create the remote repository on GitHub
        #[arg(long)]
        remote: bool,
    },
    /// Open a new session
    Start,
    /// Record a checkpoint
    #[command(alias = "checkpoint")]
    Save {
        /// Checkpoint label
        label: Option<String>,
    },
    /// Move back to the parent of the active checkpoint
    #[command(alias = "rewind")]
    Back,
    /// Move to the checkpoint with the given number
    Jump { number: i64 },
    /// Show the checkpoint tree
    Tree,
    /// Show the session state
    Status,
    /// List checkpoints in creation order
    Log,
    /// Collapse the session into one change and open a pull request
    #[command(alias = "collapse")]
    Done {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Discard the session without publishing
    Abandon,
}

impl Cli {
    fn config(&self) -> std::io::Result<WaypointConfig> {
        Ok(WaypointConfig {
            db_path: self.db_path.clone().unwrap_or_else(WaypointConfig::default_db_path),
            repo_path: std::fs::canonicalize(&self.repo)?,
            primary_line: self.primary_line.clone(),
            remote: self.remote.clone(),
            github_api_url: self.github_api_url.clone(),
            github_token: self.github_token.clone(),
            github_owner: self.github_owner.clone(),
            github_repo: self.github_repo.clone(),
            templates_dir: self.templates_dir.clone(),
            git_user_name: self.git_user_name.clone(),
            git_user_email: self.git_user_email.clone(),
        })
    }
}

fn build_engine(config: &WaypointConfig) -> Result<SessionEngine, Error> {
    let storage = Arc::new(DuckDbStore::open(&config.db_path)?);
    tracing::debug!("Database opened at {:?}", config.db_path);

    let mut git = GitCli::new(&config.repo_path, config.primary_line.clone(), config.remote.clone());
    if let (Some(name), Some(email)) = (&config.git_user_name, &config.git_user_email) {
        git = git.with_identity(name.clone(), email.clone());
    }

    let hosting: Arc<dyn HostingProvider> = if let Some(token) = &config.github_token {
        let mut gh = GitHubHosting::new(config.github_api_url.clone(), token.clone());
        if let (Some(owner), Some(repo)) = (&config.github_owner, &config.github_repo) {
            gh = gh.with_repository(owner.clone(), repo.clone());
        }
        Arc::new(gh)
    } else {
        tracing::debug!("No GITHUB_TOKEN set, pull requests must be opened manually");
        Arc::new(NoopHosting)
    };

    let templates = Templates::load(config.templates_dir.as_deref())?;

    Ok(SessionEngine::new(storage, Arc::new(git), hosting, config.repo_path.clone())
        .with_templates(templates)
        .with_primary_line(config.primary_line.clone()))
}

fn describe(cp: &Checkpoint) -> String {
    format!("#{} {} [{}] {}", cp.number, cp.label, cp.branch_line, cp.short_token())
}

fn emit<T: serde::Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<(), Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = cli.config()?;
    let engine = build_engine(&config)?;
    let json = cli.json;

    match cli.command {
        Command::Init { name, remote } => {
            let resp = engine.init(InitRequest { name, create_remote: remote }).await?;
            emit(json, &resp, || {
                let mut out = format!("Initialized {} at {}", resp.name, &resp.token);
                if let Some(remote) = &resp.remote {
                    out.push_str(&format!("\nRemote repository: {}", remote.web_url));
                }
                out
            })
        }
        Command::Start => {
            let resp = engine.start().await?;
            emit(json, &resp, || format!("Session started: {}", describe(&resp.checkpoint)))
        }
        Command::Save { label } => {
            let resp = engine.checkpoint(CheckpointRequest { label }).await?;
            emit(json, &resp, || {
                let mut out = String::new();
                if let Some(root) = &resp.started {
                    out.push_str(&format!("Session started: {}\n", describe(root)));
                }
                let verb = if resp.forked { "Forked" } else { "Saved" };
                out.push_str(&format!("{verb} {}", describe(&resp.checkpoint)));
                out
            })
        }
        Command::Back => {
            let resp = engine.rewind().await?;
            emit(json, &resp, || {
                format!("Rewound #{} -> {}", resp.from.number, describe(&resp.to))
            })
        }
        Command::Jump { number } => {
            let resp = engine.jump(JumpRequest::new(number)).await?;
            emit(json, &resp, || {
                let mut out = String::new();
                if let Some(saved) = &resp.autosaved {
                    out.push_str(&format!("Saved pending changes as {}\n", describe(saved)));
                }
                out.push_str(&format!("Jumped #{} -> {}", resp.from.number, describe(&resp.to)));
                out
            })
        }
        Command::Tree => {
            let tree = engine.tree().await?;
            emit(json, &serde_json::json!({ "tree": &tree }), || tree.trim_end().to_string())
        }
        Command::Status => {
            let status = engine.status().await?;
            emit(json, &status, || match &status.active {
                Some(active) => format!(
                    "Session open in {}\nActive: {}\nCheckpoints: {}{}",
                    status.context.path,
                    describe(active),
                    status.checkpoints,
                    if status.pending_changes { "\nUncommitted changes present" } else { "" }
                ),
                None => format!("No session open in {}", status.context.path),
            })
        }
        Command::Log => {
            let checkpoints = engine.log().await?;
            emit(json, &checkpoints, || {
                checkpoints
                    .iter()
                    .map(|cp| format!("{}  {}", describe(cp), cp.created_at))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Done { title, body } => {
            let resp = engine.collapse(CollapseRequest { title, body }).await?;
            print_warnings(&resp.warnings);
            emit(json, &resp, || {
                let mut out = format!(
                    "Collapsed {} checkpoint(s) into {} on {}",
                    resp.collapsed_checkpoints, &resp.token, resp.review_line
                );
                if let Some(review) = &resp.review {
                    out.push_str(&format!("\nPull request #{}: {}", review.number, review.web_url));
                }
                out
            })
        }
        Command::Abandon => {
            let resp = engine.abandon().await?;
            print_warnings(&resp.warnings);
            emit(json, &resp, || {
                format!("Abandoned session ({} checkpoint(s) discarded)", resp.discarded_checkpoints)
            })
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let directive = if cli.verbose { "waypoint=debug" } else { "waypoint=info" };
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match directive.parse() {
        Ok(d) => filter.add_directive(d),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_integrity() => {
            eprintln!("error: {e}");
            eprintln!("the checkpoint database is inconsistent for this repository");
            ExitCode::from(3)
        }
        Err(e) if e.is_precondition() => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
