use async_trait::async_trait;
use clap::Parser;
use monplug::{
    Check, CheckError, CheckOptions, OutputMode, PerfData, PluginArgs, PluginError, PluginIo,
    PluginManager, Status,
};
use serial_test::serial;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn dry_run(argv: &[&str]) -> PluginArgs {
    let mut full = vec!["plugin", "--dry-run", "-C", "/nonexistent/nagios.cmd"];
    full.extend_from_slice(argv);
    PluginArgs::try_parse_from(full).unwrap()
}

fn manager() -> (PluginManager<PluginArgs>, SharedOutput) {
    let output = SharedOutput::default();
    (PluginManager::new().with_output(output.clone()), output)
}

fn ok_check(_args: &PluginArgs, io: &PluginIo) -> Result<(), CheckError> {
    io.set_status(Status::Ok, "no issues");
    Ok(())
}

struct SlowCheck;

#[async_trait]
impl Check<PluginArgs> for SlowCheck {
    async fn run(&self, _args: &PluginArgs, io: &PluginIo) -> Result<(), CheckError> {
        io.add_perf_data(PerfData::new("progress", 1));
        tokio::time::sleep(Duration::from_secs(60)).await;
        io.set_status(Status::Ok, "finished");
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_passive_and_interactive_in_dry_run() {
    let (mut manager, output) = manager();
    manager.register_fn(
        |_args: &PluginArgs, io: &PluginIo| {
            io.set_status(Status::Ok, "no issues");
            io.add_perf_data(PerfData::new("cpu", "0.24"));
            io.out("line one");
            io.out("line two");
            Ok(())
        },
        CheckOptions::named("cpu").passive(),
    );
    manager.register_fn(
        |_args: &PluginArgs, io: &PluginIo| {
            io.set_status(Status::Critical, "memory exhausted");
            Ok(())
        },
        CheckOptions::named("mem"),
    );

    let code = manager.run(dry_run(&[])).await.unwrap();
    assert_eq!(code, Status::Critical.code());

    let results = manager.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].output_mode, OutputMode::Passive);
    let submission = results[0].submission.as_deref().unwrap();
    assert!(submission.contains(
        "PROCESS_SERVICE_CHECK_RESULT;localhost;cpu;0;OK - no issues | cpu=0.24;;;; \\nline one\\nline two\\n"
    ));
    assert!(submission.ends_with('\n'));
    assert!(!std::path::Path::new("/nonexistent/nagios.cmd").exists());

    assert_eq!(results[1].output_mode, OutputMode::Nagios);
    assert_eq!(results[1].submission, None);
    // Only the interactive check reaches the output.
    let text = output.text();
    assert!(text.starts_with("CRITICAL - memory exhausted\n"));
    assert!(!text.contains("no issues"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_failing_check_is_isolated() {
    let (mut manager, output) = manager();
    manager.register_fn(
        |_args: &PluginArgs, _io: &PluginIo| Err("database unreachable".into()),
        CheckOptions::named("db"),
    );
    manager.register_fn(ok_check, CheckOptions::named("web"));

    let code = manager.run(dry_run(&[])).await.unwrap();
    assert_eq!(code, Status::Unknown.code());

    let results = manager.results();
    assert_eq!(results[0].status, Status::Unknown.code());
    assert_eq!(
        results[0].summary,
        "Exception caught while executing plugin (database unreachable)"
    );
    assert_eq!(results[1].status, Status::Ok.code());

    let text = output.text();
    assert!(text.starts_with(
        "UNKNOWN - Exception caught while executing plugin (database unreachable)\n"
    ));
    assert!(text.contains("Error: database unreachable\n"));
    assert!(text.contains("OK - no issues\n"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_panicking_check_is_isolated() {
    let (mut manager, _output) = manager();
    manager.register_fn(
        |_args: &PluginArgs, _io: &PluginIo| panic!("index out of range"),
        CheckOptions::named("broken"),
    );
    manager.register_fn(ok_check, CheckOptions::named("fine"));

    manager.run(dry_run(&[])).await.unwrap();
    let results = manager.results();
    assert_eq!(results[0].status, Status::Unknown.code());
    assert!(results[0]
        .summary
        .contains("Exception caught while executing plugin (index out of range)"));
    assert_eq!(results[1].status, Status::Ok.code());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_timed_out_check_becomes_unknown() {
    let (mut manager, output) = manager();
    manager.register(SlowCheck, CheckOptions::new());
    manager.register_fn(ok_check, CheckOptions::named("after"));

    let code = manager.run(dry_run(&["-t", "1"])).await.unwrap();
    assert_eq!(code, Status::Unknown.code());

    let results = manager.results();
    assert_eq!(results[0].check_name, "SlowCheck");
    assert_eq!(
        results[0].summary,
        "Exception caught while executing plugin (check timed out after 1s)"
    );
    assert_eq!(results[1].status, Status::Ok.code());
    // Samples recorded before the timeout are kept.
    assert!(output
        .text()
        .starts_with("UNKNOWN - Exception caught while executing plugin (check timed out after 1s) | progress=1;;;; \n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial]
async fn test_blocking_check_times_out_on_single_worker() {
    let (mut manager, _output) = manager();
    manager.register_fn(
        |_args: &PluginArgs, io: &PluginIo| {
            std::thread::sleep(Duration::from_secs(4));
            io.set_status(Status::Ok, "slow but fine");
            Ok(())
        },
        CheckOptions::named("sleeper"),
    );

    let started = Instant::now();
    let code = manager.run(dry_run(&["-t", "1"])).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(code, Status::Unknown.code());
    assert_eq!(
        manager.results()[0].summary,
        "Exception caught while executing plugin (check timed out after 1s)"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_stray_output_is_captured() {
    let (mut manager, output) = manager();
    manager.register_fn(
        |_args: &PluginArgs, plugin_io: &PluginIo| {
            plugin_io.set_status(Status::Ok, "printed");
            writeln!(io::stdout(), "stray stdout line")?;
            writeln!(io::stderr(), "stray stderr line")?;
            plugin_io.out("explicit line");
            Ok(())
        },
        CheckOptions::named("chatty"),
    );

    manager.run(dry_run(&[])).await.unwrap();
    let text = output.text();
    assert!(text.starts_with("OK - printed\n"));
    assert!(text.contains("stray stdout line\n"));
    assert!(text.contains("stray stderr line\n"));
    assert!(text.contains("explicit line\n"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_check_mk_output_and_names() {
    let (mut manager, output) = manager();
    manager.register_fn(ok_check, CheckOptions::named("disk usage"));

    manager
        .run(dry_run(&["-o", "check_mk", "-p", "site", "-s", "prod"]))
        .await
        .unwrap();
    assert_eq!(manager.results()[0].check_name, "site-disk usage-prod");
    assert_eq!(output.text(), "0 site-disk_usage-prod  no issues\n");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_passive_without_summary_is_not_submitted() {
    let (mut manager, _output) = manager();
    manager.register_fn(
        |_args: &PluginArgs, io: &PluginIo| {
            io.set_code(Status::Ok.code());
            Ok(())
        },
        CheckOptions::named("quiet").passive(),
    );
    manager.register_fn(ok_check, CheckOptions::named("active"));

    manager.run(dry_run(&[])).await.unwrap();
    assert_eq!(manager.results()[0].submission, None);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_only_passive_checks_is_an_error() {
    let (mut manager, _output) = manager();
    manager.register_fn(ok_check, CheckOptions::named("push").passive());

    let err = manager.run(dry_run(&[])).await.unwrap_err();
    assert!(matches!(err, PluginError::NoActiveCheck));
    // The check itself still ran.
    assert_eq!(manager.results().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_execution_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (mut manager, _output) = manager();
    for (name, options) in [
        ("test_metric", CheckOptions::named("test_metric")),
        ("test_metric2", CheckOptions::named("test_metric2")),
        ("test_metric3", CheckOptions::named("test_metric3").seq(1)),
    ] {
        let calls = Arc::clone(&calls);
        manager.register_fn(
            move |_args: &PluginArgs, io: &PluginIo| {
                calls.lock().unwrap().push(name);
                io.set_status(Status::Ok, "OK - no issues");
                Ok(())
            },
            options,
        );
    }

    manager.run(dry_run(&[])).await.unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        ["test_metric3", "test_metric", "test_metric2"]
    );
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_dependencies_run_first() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (mut manager, _output) = manager();
    for (name, options) in [
        ("summary", CheckOptions::named("summary").depends_on("fetch")),
        ("fetch", CheckOptions::named("fetch")),
    ] {
        let calls = Arc::clone(&calls);
        manager.register_fn(
            move |_args: &PluginArgs, io: &PluginIo| {
                calls.lock().unwrap().push(name);
                io.set_status(Status::Ok, name);
                Ok(())
            },
            options,
        );
    }

    manager.run(dry_run(&[])).await.unwrap();
    assert_eq!(*calls.lock().unwrap(), ["fetch", "summary"]);
}
