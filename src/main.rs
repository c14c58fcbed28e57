use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use frigate_cfg::config::{self as cfg, ValidationReport};
use frigate_cfg::store::{
    ConfigDestination, ConfigSource, ConfigStore, DEFAULT_COMMIT_MESSAGE, FixedPathPicker,
    FsSlotStore, GithubStore, Outcome, RemoteLocation, remote::DEFAULT_API_URL,
};

/// frigate-cfg CLI
#[derive(Debug, Parser)]
#[command(
    name = frigate_cfg::PKG_NAME,
    version = frigate_cfg::PKG_VERSION,
    about = "Validate, normalize and store Frigate NVR configuration files"
)]
struct Cli {
    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    /// Directory holding the local configuration cache
    #[arg(long = "cache-dir", global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the JSON validation report for a file (exit status 1 when invalid)
    Validate { file: PathBuf },

    /// Print or write the normalized YAML for a file
    Normalize {
        file: PathBuf,
        /// Write to this path instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Load a file and store it in the local cache
    Import { file: PathBuf },

    /// Write the local cache to a file
    Export { output: PathBuf },

    /// Fetch a configuration from a GitHub repository into the local cache
    Pull(RemoteArgs),

    /// Commit the local cache to a GitHub repository
    Push {
        #[command(flatten)]
        remote: RemoteArgs,
        /// Commit message
        #[arg(long, default_value = DEFAULT_COMMIT_MESSAGE)]
        message: String,
    },

    /// Print a camera entry with defaults filled in
    Template {
        /// Camera name
        #[arg(long, default_value = "camera_1")]
        name: String,
    },

    /// Print the JSON Schema for the configuration and exit
    PrintSchema,
}

#[derive(Debug, Args)]
struct RemoteArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    repo: String,
    /// Path of the configuration file inside the repository
    #[arg(long)]
    path: String,
    #[arg(long, default_value = "main")]
    branch: String,

    /// Personal access token with contents access
    #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// API root (GitHub Enterprise or a test server)
    #[arg(long = "github-api", default_value = DEFAULT_API_URL)]
    github_api: String,
}

impl RemoteArgs {
    fn location(&self) -> RemoteLocation {
        RemoteLocation::new(&self.owner, &self.repo, &self.path, &self.branch)
    }
}

fn open_cache(cli: &Cli) -> anyhow::Result<FsSlotStore> {
    let store = match &cli.cache_dir {
        Some(dir) => FsSlotStore::new(dir),
        None => FsSlotStore::at_default_location()?,
    };
    debug!(dir = %store.dir().display(), "Using local cache");
    Ok(store)
}

fn attach_remote(store: ConfigStore, args: &RemoteArgs) -> anyhow::Result<ConfigStore> {
    match &args.github_token {
        Some(token) => {
            let remote = GithubStore::with_api_url(token.as_str(), &args.github_api)?;
            Ok(store.with_remote(remote))
        }
        None => Ok(store),
    }
}

async fn validate_file(file: &Path) -> anyhow::Result<ValidationReport> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read config file {}", file.display()))?;
    let report = match cfg::decode(&text) {
        Ok(tree) => cfg::check(&tree),
        Err(err) => ValidationReport {
            valid: false,
            error: Some(err.to_string()),
            violations: Vec::new(),
        },
    };
    Ok(report)
}

fn expect_done<T>(outcome: Outcome<T>) -> anyhow::Result<T> {
    match outcome {
        Outcome::Done(value) => Ok(value),
        Outcome::Cancelled => bail!("operation cancelled"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    frigate_cfg::init_tracing(cli.log_level.as_deref());
    debug!(version = frigate_cfg::PKG_VERSION, "Starting frigate-cfg");

    match &cli.command {
        Command::Validate { file } => {
            let report = validate_file(file).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.valid {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Normalize { file, output } => {
            let config = cfg::load_from_path_async(file).await?;
            let text = cfg::encode(&config)?;
            match output {
                Some(out) => {
                    tokio::fs::write(out, &text)
                        .await
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    info!(output = %out.display(), "Normalized configuration written");
                }
                None => print!("{text}"),
            }
        }

        Command::Import { file } => {
            let mut store = ConfigStore::new(open_cache(&cli)?, FixedPathPicker::open(file));
            let config = expect_done(store.load(ConfigSource::UserFile).await?)?;
            let receipt = expect_done(store.save(&config, ConfigDestination::LocalCache).await?)?;
            info!(target_name = %receipt.target, cameras = config.cameras.len(), "Imported");
        }

        Command::Export { output } => {
            let mut store = ConfigStore::new(open_cache(&cli)?, FixedPathPicker::save(output));
            let config = expect_done(store.load(ConfigSource::LocalCache).await?)?;
            let receipt = expect_done(store.save(&config, ConfigDestination::UserFile).await?)?;
            info!(target_name = %receipt.target, "Exported");
        }

        Command::Pull(remote) => {
            let store = ConfigStore::new(open_cache(&cli)?, FixedPathPicker::cancelling());
            let mut store = attach_remote(store, remote)?;
            let location = remote.location();
            let config = expect_done(store.load(ConfigSource::Remote(location.clone())).await?)?;
            store.save(&config, ConfigDestination::LocalCache).await?;
            info!(%location, cameras = config.cameras.len(), "Pulled");
        }

        Command::Push { remote, message } => {
            let store = ConfigStore::new(open_cache(&cli)?, FixedPathPicker::cancelling());
            let mut store = attach_remote(store, remote)?;
            let config = expect_done(store.load(ConfigSource::LocalCache).await?)?;
            let receipt = expect_done(
                store
                    .save(
                        &config,
                        ConfigDestination::Remote {
                            location: remote.location(),
                            message: message.clone(),
                        },
                    )
                    .await?,
            )?;
            let revision = receipt.revision.map(|r| r.0).unwrap_or_default();
            info!(target_name = %receipt.target, %revision, "Pushed");
            println!("{revision}");
        }

        Command::Template { name } => {
            let camera = cfg::camera_template(name)?;
            print!("{}", serde_yaml::to_string(&camera)?);
        }

        Command::PrintSchema => {
            let schema = cfg::generate_schema();
            let json = serde_json::to_string_pretty(&schema)?;
            println!("{json}");
        }
    }

    Ok(ExitCode::SUCCESS)
}
