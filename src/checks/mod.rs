mod file_check;

pub mod ordering;
pub mod plugin_manager;
pub mod timeout;

pub use file_check::FileCheck;

use crate::plugin_io::PluginIo;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::panic;
use std::sync::Arc;
use tokio::task;

/// Error returned by a failing check. Anything convertible with `?` will do.
pub type CheckError = Box<dyn std::error::Error + Send + Sync>;

/// One named unit of monitoring logic.
///
/// A check reports through the [`PluginIo`] it is handed: status, summary, performance samples
/// and free-form detail text. Returning an error, panicking or running past the timeout all
/// turn into an UNKNOWN result for this check only.
#[async_trait]
pub trait Check<A: Send + Sync>: Send + Sync {
    async fn run(&self, args: &A, io: &PluginIo) -> Result<(), CheckError>;

    /// Name used when the registration does not provide one.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Adapts a plain function or closure into a [`Check`].
///
/// The function runs on the blocking thread pool with its own copy of the arguments, so a
/// slow body never starves the runtime's timers. A timeout stops waiting for it but cannot
/// interrupt it; the thread finishes in the background.
pub struct FnCheck<F> {
    f: Arc<F>,
}

impl<F> FnCheck<F> {
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<A, F> Check<A> for FnCheck<F>
where
    A: Clone + Send + Sync + 'static,
    F: Fn(&A, &PluginIo) -> Result<(), CheckError> + Send + Sync + 'static,
{
    async fn run(&self, args: &A, io: &PluginIo) -> Result<(), CheckError> {
        let f = Arc::clone(&self.f);
        let args = args.clone();
        let io = io.clone();
        match task::spawn_blocking(move || f(&args, &io)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> String {
        short_type_name(std::any::type_name::<F>())
    }
}

/// Reduces `my_plugin::checks::load` or `my_plugin::LoadCheck<T>` to its last path segment.
fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// How a check is registered.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub name: Option<String>,
    /// 1-based position in the call sequence at registration time.
    pub seq: Option<usize>,
    pub passive: bool,
    pub depends_on: BTreeSet<String>,
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::default().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn seq(mut self, seq: usize) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.insert(name.into());
        self
    }
}

/// Handle returned by registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckId {
    pub(crate) serial: usize,
    pub(crate) name: String,
}

impl CheckId {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration ordinal, unique per manager.
    pub fn serial(&self) -> usize {
        self.serial
    }
}
