use anyhow::{Context, Result};
use bytes::Bytes;
use drawing_store::{
    DrawingRepository, ObjectStore, S3ObjectStore, SessionRepository,
    config::{AppConfig, Command, DrawingCommand, SessionCommand},
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup (stderr; stdout carries content) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;

    tracing::debug!("Starting drawing-store with config: {:?}", cfg);

    // --- Initialize the shared store handle ---
    let store: Arc<dyn ObjectStore> = Arc::new(
        S3ObjectStore::connect(&cfg.s3_settings())
            .await
            .context("initializing S3 client")?,
    );
    let drawings = DrawingRepository::new(store.clone(), cfg.drawing_bucket.as_deref());
    let sessions = SessionRepository::new(store, cfg.session_bucket.as_deref());

    // --- Run, abandoning the call on deadline or Ctrl-C ---
    let operation = run(command, &drawings, &sessions);
    let outcome = async {
        match cfg.timeout {
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("operation timed out after {:?}", limit)),
            },
            None => operation.await,
        }
    };

    tokio::select! {
        result = outcome => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; abandoning in-flight storage call");
            anyhow::bail!("interrupted")
        }
    }
}

async fn run(
    command: Command,
    drawings: &DrawingRepository,
    sessions: &SessionRepository,
) -> Result<()> {
    match command {
        Command::Drawings(DrawingCommand::Put {
            title,
            file,
            modified_by,
        }) => {
            let content = match file {
                Some(path) => tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = Vec::new();
                    tokio::io::stdin()
                        .read_to_end(&mut buf)
                        .await
                        .context("reading drawing content from stdin")?;
                    buf
                }
            };
            drawings
                .put(&title, Bytes::from(content), &modified_by)
                .await?;
            tracing::info!("Stored drawing `{}` in bucket {}", title, drawings.bucket());
        }
        Command::Drawings(DrawingCommand::Get { title }) => {
            write_stdout(&drawings.get(&title).await?).await?;
        }
        Command::Drawings(DrawingCommand::List) => {
            print_json(&drawings.list_titles().await?)?;
        }
        Command::Sessions(SessionCommand::Create) => {
            let id = sessions.create_session().await?;
            println!("{}", id);
        }
        Command::Sessions(SessionCommand::List) => {
            print_json(&sessions.list_sessions().await?)?;
        }
        Command::Credentials => {
            write_stdout(sessions.get_allowed_credentials().await?.as_bytes()).await?;
        }
        Command::ClientCode { path } => {
            write_stdout(&sessions.serve_client_code(&path).await?).await?;
        }
    }

    Ok(())
}

async fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(bytes).await?;
    stdout.flush().await?;
    Ok(())
}

fn print_json(values: &[String]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(values)?);
    Ok(())
}
