// ABOUTME: Renders progress events as an indicatif progress bar
// ABOUTME: Runs on the caller's task while the export or import runs on a spawned one

use crate::progress::{ProgressEvent, ProgressSink};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use tokio::sync::mpsc::UnboundedReceiver;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} tables  {msg}";

/// Run `job` on its own task and draw its progress until it finishes
///
/// The job receives the sending half of the progress channel. Its result is
/// returned once the job has completed and every event has been drawn.
pub async fn run_with_progress<F, Fut, T>(verb: &'static str, job: F) -> Result<T>
where
    F: FnOnce(ProgressSink) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let (sink, receiver) = ProgressSink::channel();
    let handle = tokio::spawn(job(sink));

    render(verb, receiver).await;

    handle.await.context("Background task panicked")?
}

async fn render(verb: &str, mut receiver: UnboundedReceiver<ProgressEvent>) {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
        bar.set_style(style.progress_chars("=> "));
    }

    // Ends when the job drops its sink, on success or failure.
    while let Some(event) = receiver.recv().await {
        match event {
            ProgressEvent::TableStarted { name, index, total } => {
                bar.set_length(total as u64);
                bar.set_position(index as u64);
                bar.set_message(format!("{} {}", verb, name));
            }
            ProgressEvent::BatchWritten {
                name,
                rows_done,
                rows_total,
            } => {
                bar.set_message(format!("{} {} ({}/{} rows)", verb, name, rows_done, rows_total));
            }
            ProgressEvent::TableFinished { .. } => bar.inc(1),
            ProgressEvent::TableSkipped { name, reason } => {
                bar.println(format!("  - skipped {} ({})", name, reason));
            }
            ProgressEvent::Finished { tables, rows } => {
                bar.finish_with_message(format!("done: {} table(s), {} rows", tables, rows));
            }
        }
    }

    if !bar.is_finished() {
        bar.abandon();
    }
}
