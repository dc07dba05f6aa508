//! Enqueues monitoring events into a directory-based message queue.

use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Seconds covered by one intermediate directory of the queue.
const BUCKET_SECS: u64 = 60;

static COUNTER: AtomicU32 = AtomicU32::new(0);

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to determine the host name: {0}")]
    Hostname(#[from] nix::Error),
}

#[derive(Serialize, Debug)]
struct Header<'a> {
    measurement_agent: String,
    destination: &'a str,
}

#[derive(Serialize, Debug)]
struct Message<'a> {
    header: Header<'a>,
    body: String,
    text: bool,
}

/// Adds `event` to the queue at `dir`, addressed to `destination`, and returns the path of the
/// new element.
///
/// A `timestamp` is added to the event when it has none. Elements are written under a
/// temporary name and renamed into place, so consumers never see partial messages.
pub fn enqueue(
    dir: &Path,
    destination: &str,
    mut event: Map<String, Value>,
) -> Result<PathBuf, QueueError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    if !event.contains_key("timestamp") {
        event.insert("timestamp".to_string(), Value::from(now.as_secs_f64()));
    }

    let message = Message {
        header: Header {
            measurement_agent: nix::unistd::gethostname()?
                .to_string_lossy()
                .into_owned(),
            destination,
        },
        body: serde_json::to_string(&event)?,
        text: true,
    };

    let bucket = dir.join(format!("{:08x}", now.as_secs() - now.as_secs() % BUCKET_SECS));
    fs::create_dir_all(&bucket)?;
    let name = format!(
        "{:08x}{:05x}{:01x}",
        now.as_secs(),
        now.subsec_micros(),
        COUNTER.fetch_add(1, Ordering::Relaxed) % 16
    );
    let temporary = bucket.join(format!("{}.tmp", name));
    let element = bucket.join(name);

    let mut file = fs::File::create(&temporary)?;
    file.write_all(serde_json::to_string(&message)?.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temporary, &element)?;

    debug!("Enqueued event for {} as {}", destination, element.display());
    Ok(element)
}
