use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::fs::File;
use std::io;
use std::os::fd::AsFd;

/// Initialises the process-wide logger.
///
/// Log lines go to a duplicate of the standard error stream as it is right now, so they keep
/// reaching the terminal while a check's output is being captured. `debug` forces debug
/// level, otherwise `RUST_LOG` applies with a default of `warn`. Calling this twice is a
/// no-op.
pub fn init(debug: bool) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    if let Ok(stderr) = io::stderr().as_fd().try_clone_to_owned() {
        builder.target(Target::Pipe(Box::new(File::from(stderr))));
    }
    let _ = builder.try_init();
}
