//! Structured subprocess command construction and execution.
//!
//! Commands are built as ordered argument lists and handed to
//! `std::process::Command` directly - no shell, no string concatenation.
//! The rendered form quotes arguments containing whitespace, but that
//! rendering is for logs only and never re-parsed.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::logging::RunLogger;

/// Errors from spawning or running an external tool.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be started at all.
    #[error("failed to start {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The process ran but exited with a non-zero status.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    Failed {
        tool: String,
        exit_code: i32,
        message: String,
    },
}

/// Result type for command operations.
pub type CommandResult<T> = Result<T, CommandError>;

/// Captured output of a successful command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Ordered argument-list builder for an external command.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
}

impl CommandBuilder {
    /// Start building a command for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let rendered = path.as_ref().display().to_string();
        self.arg(rendered)
    }

    /// Append a bare flag.
    pub fn flag(self, flag: impl Into<String>) -> Self {
        self.arg(flag)
    }

    /// Append a flag followed by its value.
    pub fn flag_with(self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append a flag followed by a path value.
    pub fn flag_with_path(self, flag: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.arg(flag).path_arg(path)
    }

    /// The program name this builder targets.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument list in order, without the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build a ready-to-spawn `std::process::Command`.
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Render the full command line for logging.
    ///
    /// Arguments containing whitespace are wrapped in quotes so the line
    /// can be copy-pasted into a shell; the rendering is never executed.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(quote_if_needed(&self.program));
        for arg in &self.args {
            parts.push(quote_if_needed(arg));
        }
        parts.join(" ")
    }
}

fn quote_if_needed(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Run a built command, capturing stdout and stderr.
///
/// Non-zero exit becomes `CommandError::Failed` carrying the tool name,
/// exit code, and the captured stderr for diagnosis.
pub fn run_command(builder: &CommandBuilder) -> CommandResult<CommandOutput> {
    tracing::debug!("Running: {}", builder.display());

    let output = builder
        .build()
        .stdin(Stdio::null())
        .output()
        .map_err(|e| CommandError::SpawnFailed {
            tool: builder.program().to_string(),
            source: e,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(CommandError::Failed {
            tool: builder.program().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: tail_lines(&stderr, 10),
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Run a built command, mirroring it into a run log.
///
/// The rendered command line goes into the log as a `$ command` entry and
/// the tool's output feeds the log's tail buffer. On failure the tail is
/// replayed, so the log ends with the lines that explain the exit code.
pub fn run_command_logged(
    builder: &CommandBuilder,
    logger: &RunLogger,
) -> CommandResult<CommandOutput> {
    logger.command(&builder.display());
    // Each command gets its own tail, so a failure shows only its output.
    logger.clear_tail();

    match run_command(builder) {
        Ok(output) => {
            for line in output.stdout.lines() {
                logger.output_line(line, false);
            }
            for line in output.stderr.lines() {
                logger.output_line(line, true);
            }
            Ok(output)
        }
        Err(e) => {
            if let CommandError::Failed { message, .. } = &e {
                for line in message.lines() {
                    logger.output_line(line, true);
                }
            }
            logger.show_tail(&format!("{} output", builder.program()));
            Err(e)
        }
    }
}

/// Keep only the last `n` lines of tool output for error messages.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;

    #[test]
    fn builds_ordered_argument_list() {
        let builder = CommandBuilder::new("ffmpeg")
            .flag("-y")
            .flag_with("-ss", "3.000000")
            .flag_with("-i", "input.wav")
            .path_arg("out.wav");

        assert_eq!(builder.program(), "ffmpeg");
        assert_eq!(
            builder.args(),
            &["-y", "-ss", "3.000000", "-i", "input.wav", "out.wav"]
        );
    }

    #[test]
    fn display_quotes_whitespace_arguments() {
        let builder = CommandBuilder::new("ffmpeg")
            .flag_with("-i", "/media/My Videos/clip.mp4")
            .arg("out.wav");

        let rendered = builder.display();
        assert!(rendered.contains("\"/media/My Videos/clip.mp4\""));
        assert!(rendered.contains("out.wav"));
        assert!(!rendered.contains("\"out.wav\""));
    }

    #[test]
    fn argv_list_is_never_quoted() {
        let builder = CommandBuilder::new("tool").arg("has space");
        assert_eq!(builder.args(), &["has space"]);
    }

    #[test]
    fn spawn_failure_names_the_tool() {
        let builder = CommandBuilder::new("definitely-not-a-real-binary-xyz");
        let err = run_command(&builder).unwrap_err();
        assert!(matches!(err, CommandError::SpawnFailed { .. }));
        assert!(err.to_string().contains("definitely-not-a-real-binary-xyz"));
    }

    #[test]
    fn tail_keeps_last_lines_only() {
        let text = "a\nb\nc\nd";
        assert_eq!(tail_lines(text, 2), "c\nd");
        assert_eq!(tail_lines(text, 10), "a\nb\nc\nd");
    }

    #[test]
    fn logged_run_records_command_and_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RunLogger::new("cmd", dir.path(), LogConfig::default(), None).unwrap();

        let builder =
            CommandBuilder::new("sh").flag_with("-c", "echo to-stdout; echo to-stderr 1>&2");
        run_command_logged(&builder, &logger).unwrap();
        logger.flush();

        let content = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("$ sh -c \"echo to-stdout; echo to-stderr 1>&2\""));

        let tail = logger.get_tail();
        assert!(tail.contains(&"to-stdout".to_string()));
        assert!(tail.contains(&"to-stderr".to_string()));
    }

    #[test]
    fn failed_logged_run_replays_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RunLogger::new("fail", dir.path(), LogConfig::default(), None).unwrap();

        let builder = CommandBuilder::new("sh").flag_with("-c", "echo boom 1>&2; exit 3");
        let err = run_command_logged(&builder, &logger).unwrap_err();
        assert!(matches!(err, CommandError::Failed { exit_code: 3, .. }));
        logger.flush();

        let content = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("[sh output/tail]"));
        assert!(content.contains("boom"));
    }
}
