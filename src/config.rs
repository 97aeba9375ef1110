use crate::store::S3Settings;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{env, path::PathBuf, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub drawing_bucket: Option<String>,
    pub session_bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub timeout: Option<Duration>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Drawings and sessions stored in an S3 bucket")]
pub struct Args {
    /// Bucket holding drawings (overrides DRAWING_STORE_BUCKET)
    #[arg(long, global = true)]
    pub drawing_bucket: Option<String>,

    /// Bucket holding sessions, credentials and client code (overrides SESSION_STORE_BUCKET)
    #[arg(long, global = true)]
    pub session_bucket: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// S3-compatible endpoint URL (overrides DRAWING_STORE_S3_ENDPOINT)
    #[arg(long, global = true)]
    pub endpoint_url: Option<String>,

    /// Use path-style bucket addressing (or DRAWING_STORE_FORCE_PATH_STYLE=true)
    #[arg(long, global = true)]
    pub force_path_style: bool,

    /// Abandon the operation after this many seconds (overrides DRAWING_STORE_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store, fetch and list drawings
    #[command(subcommand)]
    Drawings(DrawingCommand),
    /// Create and list sessions
    #[command(subcommand)]
    Sessions(SessionCommand),
    /// Print the allowed credentials blob
    Credentials,
    /// Print the client asset at PATH (e.g. /index.html)
    ClientCode { path: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DrawingCommand {
    /// Store a drawing, reading its content from --file or stdin
    Put {
        title: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = "cli")]
        modified_by: String,
    },
    /// Write a drawing's content to stdout
    Get { title: String },
    /// Print all titles as a JSON array
    List,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Replace any existing session with a new one and print its id
    Create,
    /// Print all session ids as a JSON array
    List,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        // Parse CLI once
        let args = Args::parse();
        Self::merge(args, |name| env::var(name))
    }

    /// Merge parsed arguments over values looked up through `var`.
    pub fn merge<F>(args: Args, var: F) -> Result<(Self, Command)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let optional = |name: &str| -> Result<Option<String>> {
            match var(name) {
                Ok(value) if value.is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        let env_drawing_bucket = optional("DRAWING_STORE_BUCKET")?;
        let env_session_bucket = optional("SESSION_STORE_BUCKET")?;
        let env_endpoint = optional("DRAWING_STORE_S3_ENDPOINT")?;
        let env_path_style = match optional("DRAWING_STORE_FORCE_PATH_STYLE")? {
            Some(value) => value.parse::<bool>().with_context(|| {
                format!("parsing DRAWING_STORE_FORCE_PATH_STYLE value `{}`", value)
            })?,
            None => false,
        };
        let env_timeout = match optional("DRAWING_STORE_TIMEOUT_SECS")? {
            Some(value) => Some(value.parse::<u64>().with_context(|| {
                format!("parsing DRAWING_STORE_TIMEOUT_SECS value `{}`", value)
            })?),
            None => None,
        };

        // --- Merge ---
        let cfg = Self {
            drawing_bucket: args.drawing_bucket.or(env_drawing_bucket),
            session_bucket: args.session_bucket.or(env_session_bucket),
            region: args.region,
            endpoint_url: args.endpoint_url.or(env_endpoint),
            force_path_style: args.force_path_style || env_path_style,
            timeout: args.timeout_secs.or(env_timeout).map(Duration::from_secs),
        };

        Ok((cfg, args.command))
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
        }
    }
}
