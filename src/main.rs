use clap::Parser;
use dotenv::dotenv;
use log::{debug, error};
use monplug::{
    logging, CheckError, CheckOptions, FileCheck, PerfData, PluginArgs, PluginIo, PluginManager,
    PluginOptions, Status,
};
use std::fs;

/// Reports the system load average, optionally checks that files are present and sends a
/// passive heartbeat.
#[derive(Parser, Debug, Clone)]
#[command(name = "monplug", author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: PluginArgs,

    /// File that must exist and be non-empty; may be repeated.
    #[arg(long = "file")]
    files: Vec<String>,

    /// Also submit a passive heartbeat through the command pipe.
    #[arg(long)]
    heartbeat: bool,
}

impl PluginOptions for Cli {
    fn common(&self) -> &PluginArgs {
        &self.common
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Parse the CLI arguments.
    let args = Cli::parse();
    logging::init(args.common.debug);
    debug!("Parsed args: {:?}", args);

    let mut manager = PluginManager::new();
    manager.register_fn(load, CheckOptions::new());

    let files = if args.files.is_empty() {
        FileCheck::from_env()
    } else {
        FileCheck::new(args.files.clone())
    };
    if !files.files().is_empty() {
        manager.register(files, CheckOptions::named("files"));
    }

    if args.heartbeat {
        manager.register_fn(heartbeat, CheckOptions::named("heartbeat").passive());
    }

    let code = match manager.run(args.clone()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            Status::Unknown.code()
        }
    };
    debug!("Exiting with {}", code);
    manager.finish(&args, code);
}

fn load(args: &Cli, io: &PluginIo) -> Result<(), CheckError> {
    let raw = fs::read_to_string("/proc/loadavg")?;
    let fields = raw
        .split_whitespace()
        .take(3)
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()?;
    let (load1, load5, load15) = match fields.as_slice() {
        [load1, load5, load15] => (*load1, *load5, *load15),
        _ => return Err(format!("Unexpected /proc/loadavg contents: {}", raw.trim()).into()),
    };

    let warning = args.common.warning;
    let critical = args.common.critical;
    let status = if critical.is_some_and(|c| load1 >= c as f64) {
        Status::Critical
    } else if warning.is_some_and(|w| load1 >= w as f64) {
        Status::Warning
    } else {
        Status::Ok
    };

    let threshold = |t: Option<i64>| t.map(|t| t.to_string()).unwrap_or_default();
    for (label, value) in [("load1", load1), ("load5", load5), ("load15", load15)] {
        io.add_perf_data(
            PerfData::new(label, value)
                .warn(threshold(warning))
                .crit(threshold(critical))
                .min(0),
        );
    }
    io.set_status(
        status,
        format!("load average {:.2}, {:.2}, {:.2}", load1, load5, load15),
    );
    io.out(raw.trim());
    Ok(())
}

fn heartbeat(_args: &Cli, io: &PluginIo) -> Result<(), CheckError> {
    let uptime: f64 = fs::read_to_string("/proc/uptime")?
        .split_whitespace()
        .next()
        .ok_or("Empty /proc/uptime")?
        .parse()?;
    io.add_perf_data(PerfData::new("uptime", uptime as u64).unit("s").min(0));
    io.set_status(Status::Ok, format!("{} is alive", io.hostname()));
    Ok(())
}
