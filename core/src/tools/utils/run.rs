//! Running external programs for tools

use crate::error::Result;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::{timeout, Duration, Instant};

/// Command execution options
#[derive(Debug, Clone)]
pub struct CommandOptions {
    pub timeout_seconds: u64,
    pub truncate_after: usize,
    pub working_directory: Option<PathBuf>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            truncate_after: 16000,
            working_directory: None,
        }
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

/// Run `program` with `args` directly (no shell), capturing both streams
pub async fn run_program(
    program: &str,
    args: &[String],
    options: CommandOptions,
) -> Result<CommandResult> {
    let start_time = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &options.working_directory {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn()?;

    let timeout_duration = Duration::from_secs(options.timeout_seconds);
    let result = timeout(timeout_duration, collect_output(&mut child)).await;
    let duration_ms = start_time.elapsed().as_millis() as u64;

    match result {
        Ok(Ok((exit_code, stdout, stderr))) => Ok(CommandResult {
            exit_code,
            stdout: super::maybe_truncate(&stdout, options.truncate_after),
            stderr: super::maybe_truncate(&stderr, options.truncate_after),
            duration_ms,
            timed_out: false,
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            let _ = child.kill().await;
            Ok(CommandResult {
                exit_code: -1,
                stdout: String::new(),
                stderr: format!(
                    "Command timed out after {} seconds",
                    timeout_duration.as_secs()
                ),
                duration_ms,
                timed_out: true,
            })
        }
    }
}

/// Read both streams to the end and wait for exit
async fn collect_output(child: &mut Child) -> Result<(i32, String, String)> {
    let mut stdout = child.stdout.take().ok_or("Failed to capture stdout")?;
    let mut stderr = child.stderr.take().ok_or("Failed to capture stderr")?;

    let mut stdout_bytes = Vec::new();
    let mut stderr_bytes = Vec::new();
    let (stdout_result, stderr_result) = tokio::join!(
        stdout.read_to_end(&mut stdout_bytes),
        stderr.read_to_end(&mut stderr_bytes)
    );
    stdout_result?;
    stderr_result?;

    let status = child.wait().await?;
    Ok((
        status.code().unwrap_or(-1),
        String::from_utf8_lossy(&stdout_bytes).into_owned(),
        String::from_utf8_lossy(&stderr_bytes).into_owned(),
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_both_streams_and_exit_code() {
        let args = vec![
            "-c".to_string(),
            "echo out; echo err >&2; exit 3".to_string(),
        ];
        let result = run_program("sh", &args, CommandOptions::default())
            .await
            .unwrap();

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_timeout_kills_the_process() {
        let options = CommandOptions {
            timeout_seconds: 1,
            ..Default::default()
        };
        let args = vec!["5".to_string()];
        let result = run_program("sleep", &args, options).await.unwrap();

        assert!(result.timed_out);
        assert_eq!(result.exit_code, -1);
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let result = run_program("no-such-program-here", &[], CommandOptions::default()).await;
        assert!(result.is_err());
    }
}
