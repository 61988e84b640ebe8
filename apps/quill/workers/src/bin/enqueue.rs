//! Enqueue a task payload onto a worker's queue.
//!
//! Handy for local testing and operator one-offs:
//!
//! ```text
//! quill-enqueue --worker summaries --payload '{"post_id": 42}'
//! quill-enqueue --worker mail --file mail_task.json
//! ```
//!
//! Declares the worker's topology first, so enqueueing works even
//! before the worker has ever started.

use amqp_worker::{ChannelProvider, QueueTopology, TaskPublisher};
use clap::Parser;
use core_config::{broker::BrokerConfig, FromEnv};
use eyre::{bail, Result, WrapErr};
use quill_workers::WorkerKind;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Publish a task payload to a Quill worker queue"
)]
struct Args {
    /// Worker whose queue receives the payload
    #[arg(short, long, value_enum)]
    worker: WorkerKind,

    /// Inline JSON payload
    #[arg(short, long, conflicts_with = "file")]
    payload: Option<String>,

    /// File containing the JSON payload
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    core_config::tracing::install_color_eyre();

    let args = Args::parse();

    let raw = match (&args.payload, &args.file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read payload file {}", path.display()))?,
        (None, None) => bail!("Provide a payload with --payload or --file"),
    };

    // Reject malformed JSON here instead of letting the worker drop it.
    let payload: Value = serde_json::from_str(&raw).wrap_err("Payload is not valid JSON")?;

    let broker = BrokerConfig::from_env().wrap_err("Failed to load broker configuration")?;
    let provider = Arc::new(ChannelProvider::new(
        broker.url,
        format!("{}-enqueue", broker.connection_name),
        1,
    ));

    let topology = QueueTopology::for_domain(args.worker.domain());
    let channel = provider.acquire().await?;
    topology.ensure(&channel).await?;

    let publisher = TaskPublisher::new(Arc::clone(&provider));
    let message_id = publisher.publish(&topology, &payload).await?;

    println!(
        "Published to {} (exchange {}, message id {})",
        topology.queue, topology.exchange, message_id
    );

    provider.invalidate().await;
    Ok(())
}
