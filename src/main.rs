use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use claimcheck_blob::FsClaimStore;
use claimcheck_config::ClaimCheckConfig;
use claimcheck_coordinator::{TracingNotifier, WorkflowCoordinator};
use claimcheck_notify::LogNotificationSink;
use claimcheck_queue::InMemoryQueue;
use claimcheck_store::SqliteInstanceStore;
use claimcheck_trigger::{AwaitPolicy, QueueListener, router};
use claimcheck_workflow::{NotificationTemplate, ReceiveWorkflow, SendWorkflow};

/// Claimcheck - claim-check messaging over durable send and receive workflows
#[derive(Parser)]
#[command(name = "claimcheck")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.claimcheck)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to a JSON configuration file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Emit logs as JSON
  #[arg(long, global = true)]
  log_json: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the HTTP trigger and the queue listener
  Serve {
    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,
  },

  /// Send a payload through a running server, reading
  /// `{correlationId, fileName, content}` from stdin
  Send {
    /// Base URL of the server
    #[arg(long, default_value = "http://127.0.0.1:7071")]
    url: String,
  },

  /// Show the status of a workflow instance on a running server
  Status {
    instance_id: String,

    /// Base URL of the server
    #[arg(long, default_value = "http://127.0.0.1:7071")]
    url: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_json);

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".claimcheck"),
  };

  let config = match &cli.config {
    Some(path) => ClaimCheckConfig::load(path)
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => ClaimCheckConfig::default(),
  };

  let rt = tokio::runtime::Runtime::new()?;
  match cli.command {
    Some(Commands::Serve { listen }) => rt.block_on(serve(config, data_dir, listen)),
    Some(Commands::Send { url }) => rt.block_on(send(url)),
    Some(Commands::Status { instance_id, url }) => rt.block_on(status(url, instance_id)),
    None => {
      println!("claimcheck - use --help to see available commands");
      Ok(())
    }
  }
}

fn init_tracing(json: bool) {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  if json {
    tracing_subscriber::registry()
      .with(env_filter)
      .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
      .init();
  } else {
    tracing_subscriber::registry()
      .with(env_filter)
      .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
      .init();
  }
}

async fn serve(config: ClaimCheckConfig, data_dir: PathBuf, listen: Option<String>) -> Result<()> {
  tokio::fs::create_dir_all(&data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  // Collaborators
  let blobs = Arc::new(FsClaimStore::new(
    data_dir.join("blobs").join(&config.blob.container),
  ));
  let queue = Arc::new(InMemoryQueue::new(
    config.queue.name.clone(),
    config.queue.max_delivery_count,
  ));
  let sink = Arc::new(LogNotificationSink);

  let instances = open_instance_store(&data_dir.join("claimcheck.db")).await?;

  let send = SendWorkflow::new(blobs.clone(), queue.clone());
  let receive = ReceiveWorkflow::new(
    blobs,
    queue.clone(),
    sink,
    NotificationTemplate {
      to: config.notification.to.clone(),
      body: config.notification.body.clone(),
    },
  );
  let coordinator = WorkflowCoordinator::new(Arc::new(instances), send, receive)
    .with_notifier(Arc::new(TracingNotifier));

  let resumed = coordinator
    .resume_incomplete()
    .await
    .context("failed to resume unfinished instances")?;
  if !resumed.is_empty() {
    info!(count = resumed.len(), "resumed unfinished instances");
  }

  let policy = AwaitPolicy::from(&config.coordinator);
  let cancel = CancellationToken::new();

  let listener = QueueListener::new(queue, coordinator.clone(), policy)
    .with_batch_size(config.listener.batch_size)
    .with_idle_interval(config.listener.idle_interval());
  let listener_task = tokio::spawn(listener.run(cancel.child_token()));

  let shutdown = cancel.clone();
  tokio::spawn(async move {
    match tokio::signal::ctrl_c().await {
      Ok(()) => info!("shutdown requested"),
      Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
    }
    shutdown.cancel();
  });

  let addr = listen.unwrap_or(config.http.listen_addr);
  let tcp = tokio::net::TcpListener::bind(&addr)
    .await
    .with_context(|| format!("failed to bind {}", addr))?;
  info!(addr = %addr, "listening");

  let http_cancel = cancel.clone();
  axum::serve(tcp, router(coordinator, policy))
    .with_graceful_shutdown(async move { http_cancel.cancelled().await })
    .await
    .context("http server failed")?;

  cancel.cancel();
  listener_task.await.context("queue listener panicked")?;
  info!("stopped");
  Ok(())
}

async fn open_instance_store(path: &Path) -> Result<SqliteInstanceStore> {
  let options = SqliteConnectOptions::new()
    .filename(path)
    .create_if_missing(true);
  let pool = SqlitePoolOptions::new()
    .connect_with(options)
    .await
    .with_context(|| format!("failed to open database: {}", path.display()))?;

  let store = SqliteInstanceStore::new(pool);
  store
    .migrate()
    .await
    .context("failed to run database migrations")?;
  Ok(store)
}

async fn send(url: String) -> Result<()> {
  let payload = read_payload_from_stdin()?;

  let response = reqwest::Client::new()
    .post(format!("{}/claim-check", url.trim_end_matches('/')))
    .json(&payload)
    .send()
    .await
    .with_context(|| format!("failed to reach {}", url))?;

  let status = response.status();
  let body = response.text().await.context("failed to read response")?;
  if !status.is_success() {
    bail!("send failed ({}): {}", status, body);
  }

  let output: serde_json::Value =
    serde_json::from_str(&body).context("failed to parse response JSON")?;
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn status(url: String, instance_id: String) -> Result<()> {
  let response = reqwest::Client::new()
    .get(format!(
      "{}/instances/{}",
      url.trim_end_matches('/'),
      instance_id
    ))
    .send()
    .await
    .with_context(|| format!("failed to reach {}", url))?;

  let status = response.status();
  let body = response.text().await.context("failed to read response")?;
  if !status.is_success() {
    bail!("status lookup failed ({}): {}", status, body);
  }

  let report: serde_json::Value =
    serde_json::from_str(&body).context("failed to parse response JSON")?;
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    bail!("expected a JSON payload on stdin");
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;
  serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
}
