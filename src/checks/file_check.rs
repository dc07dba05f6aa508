use crate::checks::{Check, CheckError};
use crate::perfdata::PerfData;
use crate::plugin_io::PluginIo;
use crate::status::Status;
use async_trait::async_trait;
use log::debug;
use tokio::fs;

/// Verifies that a list of files exists and is not empty.
///
/// Each file's size is reported as a performance sample. A missing or empty file makes the
/// check CRITICAL.
pub struct FileCheck {
    files: Vec<String>,
}

impl FileCheck {
    pub fn new(files: Vec<String>) -> Self {
        Self { files }
    }

    /// Reads the comma separated file list from `MONPLUG_FILECHECK_FILES`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("MONPLUG_FILECHECK_FILES")
                .unwrap_or_else(|_| "".to_string())
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
                .collect(),
        )
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }
}

#[async_trait]
impl<A: Send + Sync> Check<A> for FileCheck {
    async fn run(&self, _args: &A, io: &PluginIo) -> Result<(), CheckError> {
        debug!("Checking {} files", self.files.len());

        let mut problems = Vec::new();
        for file in &self.files {
            match fs::metadata(file).await {
                Ok(metadata) => {
                    io.add_perf_data(PerfData::new(file.as_str(), metadata.len()).unit("B").min(0));
                    if metadata.len() == 0 {
                        problems.push(format!("File {} is empty", file));
                    }
                }
                Err(e) => problems.push(format!("Failed to access {}: {}", file, e)),
            }
        }

        for problem in &problems {
            io.out(problem);
        }
        if problems.is_empty() {
            io.set_status(
                Status::Ok,
                format!("{} files present and non-empty", self.files.len()),
            );
        } else {
            io.set_status(Status::Critical, problems.join(", "));
        }
        Ok(())
    }

    fn name(&self) -> String {
        "FileCheck".to_string()
    }
}
