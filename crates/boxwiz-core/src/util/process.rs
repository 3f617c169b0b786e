//! Process execution utilities.

use boxwiz_types::Result;

/// Captured result of a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Exit code, or -1 if the process was killed by a signal
    pub code: i32,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == 0
    }

    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Execute a command asynchronously.
pub async fn run_async(command: &str, args: &[&str]) -> Result<ProcessOutput> {
    let output = tokio::process::Command::new(command)
        .args(args)
        .output()
        .await?;
    Ok(ProcessOutput::from_output(output))
}
