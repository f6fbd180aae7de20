//! rpack: result package CLI
//!
//! Commands:
//!   gen-secret                 - generate a package secret (printed as base64)
//!   create <task> <files...>   - package task result files into the store
//!   create --data <path>       - package raw bytes as an inline payload
//!   extract <package> <secret> - extract a stored package into a fresh dir

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rpack_core::config::RpackConfig;
use rpack_core::{NodeIdentity, TaskResult};
use rpack_crypto::Secret;
use rpack_manager::ResultPackageManager;

#[derive(Parser, Debug)]
#[command(
    name = "rpack",
    version,
    about = "Encrypted, content-addressed task result packages",
    long_about = "rpack: package computed task results into encrypted, \
                  content-addressed blobs and extract them back"
)]
struct Cli {
    /// Path to rpack.toml configuration file
    #[arg(long, short = 'c', env = "RPACK_CONFIG", default_value = "rpack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a fresh package secret and print it as base64
    #[command(name = "gen-secret")]
    GenSecret,

    /// Package a task result and store it
    ///
    /// File paths are interpreted relative to the task's resource
    /// directory unless absolute. The secret must have been generated
    /// beforehand (see gen-secret); it is never stored anywhere.
    Create {
        /// Task identifier
        #[arg(long)]
        task: String,
        /// Subtask identifier (defaults to the task id)
        #[arg(long)]
        subtask: Option<String>,
        /// Owner key id recorded in the package manifest
        #[arg(long, default_value = "unknown")]
        owner_key: String,
        /// Package secret, base64
        #[arg(long, env = "RPACK_SECRET")]
        secret: String,
        /// Package the raw bytes of this file as an inline payload
        /// instead of a file list
        #[arg(long, conflicts_with = "files")]
        data: Option<PathBuf>,
        /// Result files to package
        files: Vec<PathBuf>,
    },

    /// Extract a stored package into a fresh directory
    Extract {
        /// Path of the stored package blob
        package: PathBuf,
        /// Package secret, base64
        #[arg(long, env = "RPACK_SECRET")]
        secret: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config.logging.level, &config.logging.format);

    let manager = ResultPackageManager::from_config(&config)
        .context("setting up the package manager")?;

    match cli.command {
        Commands::GenSecret => cmd_gen_secret(&manager),
        Commands::Create {
            task,
            subtask,
            owner_key,
            secret,
            data,
            files,
        } => cmd_create(
            &manager, &config, &task, subtask, &owner_key, &secret, data, files,
        ),
        Commands::Extract { package, secret } => cmd_extract(&manager, &package, &secret),
    }
}

fn load_config(path: &Path) -> Result<RpackConfig> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(RpackConfig::default())
    }
}

fn init_logging(level: &str, format: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

fn cmd_gen_secret(manager: &ResultPackageManager) -> Result<()> {
    let secret = manager.gen_secret()?;
    println!("{}", secret.to_base64());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_create(
    manager: &ResultPackageManager,
    config: &RpackConfig,
    task: &str,
    subtask: Option<String>,
    owner_key: &str,
    secret: &str,
    data: Option<PathBuf>,
    files: Vec<PathBuf>,
) -> Result<()> {
    let secret = Secret::from_base64(secret)?;
    let node = NodeIdentity::new(config.workspace.node_name.clone(), owner_key);
    let subtask = subtask.unwrap_or_else(|| task.to_string());

    let result = match data {
        Some(path) => {
            let bytes = fs::read(&path)
                .with_context(|| format!("reading inline payload: {}", path.display()))?;
            TaskResult::data(task, subtask, owner_key, bytes)
        }
        None => {
            if files.is_empty() {
                anyhow::bail!("create needs result files or --data");
            }
            TaskResult::files(task, subtask, owner_key, files)
        }
    };

    let blob = manager.create(&node, &result, &secret)?;
    println!("path:    {}", blob.path.display());
    println!("address: {}", blob.address);
    Ok(())
}

fn cmd_extract(manager: &ResultPackageManager, package: &Path, secret: &str) -> Result<()> {
    let secret = Secret::from_base64(secret)?;
    let extracted = manager.extract(package, &secret)?;

    println!("extracted to {}", extracted.files_dir.display());
    for f in &extracted.files {
        println!("  {}", f.display());
    }
    Ok(())
}
