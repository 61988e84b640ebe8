//! Quill Workers - Entry Point
//!
//! Background worker fleet for the Quill publishing platform. One binary,
//! one worker kind per process, selected with `--worker`.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    quill_workers::run().await
}
