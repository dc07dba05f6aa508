use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

pub type Lines<T> = Arc<Mutex<tokio::io::Lines<BufReader<T>>>>;

/// Runs the plugin binary with the given arguments and environment.
#[allow(dead_code)] // Not dead code, used in tests.
pub async fn run_plugin(
    args: &[&str],
    env_vars: &[(&str, &str)],
) -> (
    tokio::process::Child,
    Lines<tokio::process::ChildStdout>,
    Lines<tokio::process::ChildStderr>,
) {
    let mut plugin = Command::new(env!("CARGO_BIN_EXE_monplug"))
        .args(args)
        .env_remove("MONPLUG_FILECHECK_FILES")
        .env_remove("MONPLUG_OUTPUT")
        .envs(env_vars.to_owned())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("The command should spawn a child process.");

    // Capture the plugin's output.
    let stdout = plugin
        .stdout
        .take()
        .expect("Stdout output should be captured.");
    let stdout_lines = Arc::new(Mutex::new(BufReader::new(stdout).lines()));

    let stderr = plugin
        .stderr
        .take()
        .expect("Stderr output should be captured.");
    let stderr_lines = Arc::new(Mutex::new(BufReader::new(stderr).lines()));

    (plugin, stdout_lines, stderr_lines)
}

/// Collects all remaining lines.
#[allow(dead_code)] // Not dead code, used in tests.
pub async fn collect_lines<T>(lines: Lines<T>) -> Vec<String>
where
    T: tokio::io::AsyncRead + Unpin,
{
    let mut captured_lines = Vec::new();
    while let Ok(Some(line)) = lines.lock().await.next_line().await {
        captured_lines.push(line);
    }
    captured_lines
}

#[allow(dead_code)] // Not dead code, used in tests.
pub async fn check_log_output_regex<T>(lines: Lines<T>, regex_expected_lines: Vec<&str>)
where
    T: tokio::io::AsyncRead + Unpin,
{
    let captured_lines = collect_lines(lines).await;

    for expected_line in regex_expected_lines {
        let re = regex::Regex::new(expected_line).expect("Failed to compile regex");
        let found = captured_lines.iter().any(|line| re.is_match(line.as_ref()));
        assert!(
            found,
            "The output contains the line '{}'. Captured: {:?}",
            expected_line, captured_lines
        );
    }
}

#[allow(dead_code)] // Not dead code, used in tests.
pub async fn assert_exit_code(mut child: tokio::process::Child, expected: i32) {
    let status = child.wait().await.expect("The command should exit.");
    assert_eq!(
        Some(expected),
        status.code(),
        "The command should exit with code {}.",
        expected
    );
}
