use crate::checks::ordering::{CyclicDependency, DependencyGraph};
use crate::checks::timeout::{run_with_timeout, TimedOut};
use crate::checks::{Check, CheckError, CheckId, CheckOptions, FnCheck};
use crate::cli::{OutputMode, PluginOptions};
use crate::config::RunConfig;
use crate::format;
use crate::logging;
use crate::passive::CommandPipe;
use crate::plugin_io::PluginIo;
use crate::status::Status;
use clap::Parser;
use log::{debug, error, warn};
use serde::Serialize;
use std::any::Any;
use std::io::{self, Write};
use std::process::exit;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    CyclicDependency(#[from] CyclicDependency),
    #[error("No active check was run, cannot determine the exit status")]
    NoActiveCheck,
    #[error("Failed to start the runtime: {0}")]
    Runtime(#[from] io::Error),
}

/// Outcome of one executed check.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub check_name: String,
    pub status: i32,
    pub summary: String,
    pub output_mode: OutputMode,
    /// The command line a passive check would have submitted, in dry-run mode.
    pub submission: Option<String>,
}

struct Registration<A> {
    serial: usize,
    check: Arc<dyn Check<A>>,
    name: String,
    passive: bool,
    depends_on: Vec<String>,
}

enum Outcome {
    Completed,
    Failed(String, String),
    TimedOut(TimedOut),
}

/// Registers checks, runs them one at a time and renders their results.
pub struct PluginManager<A: PluginOptions> {
    sequence: Vec<Registration<A>>,
    results: Vec<RunResult>,
    output: Box<dyn Write + Send>,
    next_serial: usize,
}

impl<A: PluginOptions> PluginManager<A> {
    pub fn new() -> Self {
        Self {
            sequence: Vec::new(),
            results: Vec::new(),
            output: Box::new(io::stdout()),
            next_serial: 0,
        }
    }

    /// Sends rendered output somewhere other than the process's standard output.
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Registers a check.
    ///
    /// Without an explicit position the check is appended; `seq` inserts it at that 1-based
    /// position of the sequence as it stands at registration time. Duplicate names are
    /// allowed and run independently.
    pub fn register(&mut self, check: impl Check<A> + 'static, options: CheckOptions) -> CheckId {
        let name = options.name.unwrap_or_else(|| check.name());
        let registration = Registration {
            serial: self.next_serial,
            check: Arc::new(check),
            name: name.clone(),
            passive: options.passive,
            depends_on: options.depends_on.into_iter().collect(),
        };
        self.next_serial += 1;

        match options.seq {
            Some(seq) if seq > 0 => {
                let index = (seq - 1).min(self.sequence.len());
                self.sequence.insert(index, registration);
            }
            _ => self.sequence.push(registration),
        }
        debug!("Registered check: {}", name);

        CheckId {
            serial: self.next_serial - 1,
            name,
        }
    }

    /// Registers a plain function or closure as a check.
    ///
    /// The function runs on the blocking pool with a clone of the arguments.
    pub fn register_fn<F>(&mut self, f: F, options: CheckOptions) -> CheckId
    where
        A: Clone,
        F: Fn(&A, &PluginIo) -> Result<(), CheckError> + Send + Sync + 'static,
    {
        self.register(FnCheck::new(f), options)
    }

    /// Results of the checks executed so far, in execution order.
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    /// Names of the registered checks in the order they will run.
    pub fn call_sequence(&self) -> Result<Vec<String>, CyclicDependency> {
        Ok(self
            .execution_order()?
            .into_iter()
            .map(|i| self.sequence[i].name.clone())
            .collect())
    }

    /// Indices into `sequence` in final execution order.
    fn execution_order(&self) -> Result<Vec<usize>, CyclicDependency> {
        if self.sequence.iter().all(|r| r.depends_on.is_empty()) {
            return Ok((0..self.sequence.len()).collect());
        }

        let mut graph = DependencyGraph::new();
        for registration in &self.sequence {
            graph.add(registration.name.clone(), registration.depends_on.clone());
        }

        Ok(graph
            .resolve()?
            .iter()
            .flat_map(|name| {
                self.sequence
                    .iter()
                    .enumerate()
                    .filter(move |(_, r)| r.name == *name)
                    .map(|(i, _)| i)
            })
            .collect())
    }

    /// Runs every registered check and returns the process exit code.
    ///
    /// The exit code is the status of the first check that did not submit passively. A
    /// dependency cycle aborts the run before any check executes.
    pub async fn run(&mut self, args: A) -> Result<i32, PluginError> {
        let order = self.execution_order()?;
        let config = RunConfig::new(args.common());
        debug!("Run configuration: {:?}", config);
        debug!(
            "Call sequence: {:?}",
            order
                .iter()
                .map(|i| self.sequence[*i].name.as_str())
                .collect::<Vec<_>>()
        );

        let args = Arc::new(args);
        let pipe = CommandPipe::new(&config.command_pipe, config.dry_run);
        for index in order {
            let result = self.run_check(index, &args, &config, &pipe).await;
            self.results.push(result);
        }

        exit_code(&self.results)
    }

    async fn run_check(
        &mut self,
        index: usize,
        args: &Arc<A>,
        config: &RunConfig,
        pipe: &CommandPipe,
    ) -> RunResult {
        let registration = &self.sequence[index];
        let check_name = config.check_name(&registration.name);
        let output_mode = config.output_for(registration.passive);
        let io = PluginIo::new(&check_name, &config.hostname);

        let capture = match io.capture() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("Running {} without output capture: {}", check_name, e);
                None
            }
        };
        debug!(
            "Calling check {} (#{})",
            registration.name, registration.serial
        );
        let outcome = execute(
            Arc::clone(&registration.check),
            Arc::clone(args),
            io.clone(),
            config,
        )
        .await;
        drop(capture);

        match outcome {
            Outcome::Completed => {}
            Outcome::Failed(message, report) => fail(&io, &message, &report),
            Outcome::TimedOut(timed_out) => {
                let message = timed_out.to_string();
                fail(&io, &message, &format!("Error: {}\n", message));
            }
        }

        let result = io.result();
        let submission = match output_mode {
            OutputMode::Nagios => {
                self.emit(&format::nagios(&result));
                None
            }
            OutputMode::CheckMk => {
                self.emit(&format::check_mk(&check_name, &result));
                None
            }
            OutputMode::Passive => pipe.submit(&config.hostname, &check_name, &result),
        };

        RunResult {
            check_name,
            status: result.code,
            summary: result.summary_text().to_string(),
            output_mode,
            submission,
        }
    }

    fn emit(&mut self, text: &str) {
        let written = self
            .output
            .write_all(text.as_bytes())
            .and_then(|_| self.output.flush());
        if let Err(e) = written {
            error!("Failed to write plugin output: {}", e);
        }
    }

    /// Terminates the process with `code`, unless this is a dry run.
    pub fn finish(&self, args: &A, code: i32) -> i32 {
        if !args.common().dry_run {
            exit(code);
        }
        code
    }

    /// Parses the command line, runs all checks on a multi-threaded runtime and exits.
    pub fn main(mut self) -> i32
    where
        A: Parser + Clone,
    {
        let args = A::parse();
        logging::init(args.common().debug);

        let code = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(PluginError::from)
            .and_then(|runtime| runtime.block_on(self.run(args.clone())))
            .unwrap_or_else(|e| {
                error!("{}", e);
                Status::Unknown.code()
            });
        self.finish(&args, code)
    }
}

impl<A: PluginOptions> Default for PluginManager<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// The status of the first result that was not submitted passively.
pub fn exit_code(results: &[RunResult]) -> Result<i32, PluginError> {
    results
        .iter()
        .find(|r| r.output_mode != OutputMode::Passive)
        .map(|r| r.status)
        .ok_or(PluginError::NoActiveCheck)
}

/// Runs one check as its own task, so a panic stays contained and a timeout can abort it at
/// its next await point.
async fn execute<A: PluginOptions>(
    check: Arc<dyn Check<A>>,
    args: Arc<A>,
    io: PluginIo,
    config: &RunConfig,
) -> Outcome {
    let task = tokio::spawn(async move { check.run(&args, &io).await });
    let abort = task.abort_handle();

    match run_with_timeout(task, config.timeout).await {
        Ok(Ok(Ok(()))) => Outcome::Completed,
        Ok(Ok(Err(e))) => Outcome::Failed(e.to_string(), error_report(e.as_ref())),
        Ok(Err(join_error)) if join_error.is_panic() => {
            let message = panic_message(join_error.into_panic());
            let report = format!("Panic: {}\n", message);
            Outcome::Failed(message, report)
        }
        Ok(Err(join_error)) => {
            let message = join_error.to_string();
            Outcome::Failed(message.clone(), format!("Error: {}\n", message))
        }
        Err(timed_out) => {
            abort.abort();
            Outcome::TimedOut(timed_out)
        }
    }
}

/// Downgrades a failed check to UNKNOWN and records the failure in its detail output.
fn fail(io: &PluginIo, message: &str, report: &str) {
    io.set_status(
        Status::Unknown,
        format!("Exception caught while executing plugin ({})", message),
    );
    io.write(report);
}

fn error_report(error: &(dyn std::error::Error + 'static)) -> String {
    let mut report = format!("Error: {}\n", error);
    let mut source = error.source();
    while let Some(cause) = source {
        report.push_str(&format!("Caused by: {}\n", cause));
        source = cause.source();
    }
    report
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "check panicked".to_string()
    }
}
