//! Batch processor.
//!
//! Scans a folder for image files, filters out the ones already in the
//! ledger, runs the copy generator for the rest and appends each result to
//! the dated output file. Images are processed strictly sequentially;
//! failures are isolated per image and never abort the run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use iced::futures::channel::mpsc;
use iced::futures::{SinkExt, Stream};
use tokio::sync::Mutex;

use crate::gemini::CopySource;
use crate::ledger::{Ledger, LEDGER_FILE};

/// Image extensions accepted by the folder scan (case-insensitive).
pub const VALID_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Directory holding the dated output files.
pub const OUTPUT_DIR: &str = "outputs";

const BLOCK_SEPARATOR_LEN: usize = 40;

/// Progress flowing from the batch worker to the UI.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Log(String),
    Finished,
}

/// One user-triggered run over a size-limited list of image files.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub folder: PathBuf,
    pub limit: usize,
    pub output_dir: PathBuf,
    pub ledger: Ledger,
}

impl BatchJob {
    pub fn new(folder: PathBuf, limit: usize) -> Self {
        BatchJob {
            folder,
            limit,
            output_dir: PathBuf::from(OUTPUT_DIR),
            ledger: Ledger::new(LEDGER_FILE),
        }
    }
}

/// Runs the job on the background executor, yielding progress events.
///
/// The returned stream is the only channel between the worker and the UI;
/// the final item is always [`BatchEvent::Finished`].
pub fn run<S>(job: BatchJob, source: Arc<Mutex<S>>) -> impl Stream<Item = BatchEvent>
where
    S: CopySource + Send + 'static,
{
    iced::stream::channel(64, move |mut tx| async move {
        execute(job, source, &mut tx).await;
        let _ = tx.send(BatchEvent::Finished).await;
    })
}

async fn execute<S>(job: BatchJob, source: Arc<Mutex<S>>, tx: &mut mpsc::Sender<BatchEvent>)
where
    S: CopySource + Send,
{
    let candidates = match list_candidates(&job.folder, job.limit) {
        Ok(names) => names,
        Err(err) => {
            log(tx, format!("❌ Could not read the folder: {err}")).await;
            return;
        }
    };

    if candidates.is_empty() {
        log(tx, "❌ No valid images found.").await;
        return;
    }

    if let Err(err) = fs::create_dir_all(&job.output_dir) {
        log(tx, format!("❌ Could not create the output directory: {err}")).await;
        return;
    }

    let date = Local::now().format("%Y-%m-%d");
    let output_path = job.output_dir.join(format!("{date}.txt"));

    log(tx, format!("📂 Images found: {}", candidates.len())).await;
    log(tx, format!("📝 Output file: {}", output_path.display())).await;
    log(tx, "-".repeat(50)).await;

    // Skip decisions use this run-start snapshot; mark_processed below
    // always works against the latest on-disk state.
    let processed = match job.ledger.load() {
        Ok(set) => set,
        Err(err) => {
            log(tx, format!("❌ Could not read the processed ledger: {err}")).await;
            return;
        }
    };

    let total = candidates.len();
    for (idx, name) in candidates.iter().enumerate() {
        if processed.contains(name) {
            log(tx, format!("⏭ Already processed, skipping: {name}")).await;
            continue;
        }

        log(tx, format!("[{}/{}] Processing: {}", idx + 1, total, name)).await;

        let image_path = job.folder.join(name);
        let result = source.lock().await.generate_copy(&image_path).await;

        match result.and_then(|copy| {
            append_copy_block(&output_path, name, &copy)?;
            job.ledger.mark_processed(name)
        }) {
            Ok(()) => log(tx, "✅ Copy generated").await,
            Err(err) => log(tx, format!("❌ Error: {err}")).await,
        }
    }

    log(tx, "=".repeat(50)).await;
    log(tx, "🎉 Batch finished").await;
}

async fn log(tx: &mut mpsc::Sender<BatchEvent>, line: impl Into<String>) {
    let _ = tx.send(BatchEvent::Log(line.into())).await;
}

/// Lists the first `limit` image files in `folder`, in enumeration order.
fn list_candidates(folder: &Path, limit: usize) -> std::io::Result<Vec<String>> {
    let names = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok());

    Ok(filter_candidates(names, limit))
}

fn filter_candidates(names: impl Iterator<Item = String>, limit: usize) -> Vec<String> {
    names
        .filter(|name| {
            let lower = name.to_lowercase();
            VALID_EXTENSIONS
                .iter()
                .any(|ext| lower.ends_with(&format!(".{ext}")))
        })
        .take(limit)
        .collect()
}

/// Appends one result block to the dated output file.
fn append_copy_block(output_path: &Path, filename: &str, copy: &str) -> crate::error::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_path)?;

    write!(
        file,
        "{filename}\n{copy}\n\n{}\n\n",
        "-".repeat(BLOCK_SEPARATOR_LEN)
    )?;

    Ok(())
}
