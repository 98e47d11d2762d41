//! Subprocess execution with bounded waits.
//!
//! Backends never spawn processes themselves. They describe an invocation
//! with [`CommandSpec`] and hand it to a [`CommandRunner`]. The system
//! implementation enforces a time budget and treats a non-zero exit as
//! data for the backend to interpret, never as an error. Runner errors are
//! reserved for the command not producing a result at all: spawn failure,
//! timeout, or a refused elevation.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

use crate::elevate::{Authorization, Elevation, SudoPrompt};

/// Default time budget for a single manager invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Privilege level a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Runs as the invoking user.
    User,
    /// Needs root; the runner consults its [`Elevation`] strategy.
    Root,
}

/// One external command to run.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments, not shell-interpreted.
    pub args: Vec<String>,
    /// Per-command budget override; `None` uses the runner default.
    pub timeout: Option<Duration>,
    /// Privilege the command needs.
    pub privilege: Privilege,
}

impl CommandSpec {
    /// A user-privilege command.
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(ToString::to_string).collect(),
            timeout: None,
            privilege: Privilege::User,
        }
    }

    /// A root-privilege command.
    pub fn root(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            privilege: Privilege::Root,
            ..Self::new(program, args)
        }
    }

    /// Override the time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The command as one line, without any elevation prefix.
    pub fn rendered(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Failure to produce a [`CommandOutput`] at all.
#[derive(Error, Debug)]
pub enum RunError {
    /// The command exceeded its time budget and was killed. Not retried.
    #[error("`{command}` timed out after {limit:?}")]
    Timeout {
        /// The command line that was killed.
        command: String,
        /// The exceeded budget.
        limit: Duration,
    },

    /// The elevation strategy refused a root-privileged command.
    #[error("elevation required, run manually: {command}")]
    ElevationDeclined {
        /// Exact command line to run manually.
        command: String,
    },

    /// The program could not be spawned, usually because it is not
    /// installed.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed.
    #[error("failed waiting on `{program}`: {source}")]
    Wait {
        /// Program being waited on.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Abstraction over process execution so backends can be exercised with
/// canned output instead of live package managers.
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError>;
}

// ============================================================================
// System runner
// ============================================================================

/// Real process execution with piped output and a bounded wait.
pub struct SystemRunner {
    elevation: Box<dyn Elevation>,
    timeout: Duration,
}

impl SystemRunner {
    /// Runner with the interactive sudo strategy and default budget.
    pub fn new() -> Self {
        Self::with_elevation(Box::new(SudoPrompt))
    }

    /// Runner with an explicit elevation strategy.
    pub fn with_elevation(elevation: Box<dyn Elevation>) -> Self {
        Self {
            elevation,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the default time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn argv(&self, spec: &CommandSpec) -> Result<Vec<String>, RunError> {
        match spec.privilege {
            Privilege::User => {
                let mut argv = Vec::with_capacity(spec.args.len() + 1);
                argv.push(spec.program.clone());
                argv.extend(spec.args.iter().cloned());
                Ok(argv)
            }
            Privilege::Root => match self.elevation.authorize(&spec.program, &spec.args) {
                Authorization::Proceed(argv) => Ok(argv),
                Authorization::Refuse { command } => {
                    Err(RunError::ElevationDeclined { command })
                }
            },
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        let argv = self.argv(spec)?;
        let limit = spec.timeout.unwrap_or(self.timeout);
        log::debug!("run: {} (budget {limit:?})", argv.join(" "));

        // Null stdin so managers that probe for a terminal cannot hang
        // waiting for input.
        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: argv[0].clone(),
                source,
            })?;

        // Drain pipes on their own threads; a full listing can exceed the
        // pipe buffer and would deadlock a wait-then-read sequence.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(limit) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RunError::Timeout {
                    command: spec.rendered(),
                    limit,
                });
            }
            Err(source) => {
                let _ = child.kill();
                return Err(RunError::Wait {
                    program: argv[0].clone(),
                    source,
                });
            }
        };

        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&stdout.join().unwrap_or_default()).into_owned(),
            stderr: String::from_utf8_lossy(&stderr.join().unwrap_or_default()).into_owned(),
            code: status.code(),
        };
        log::debug!("exit {:?}: {}", output.code, spec.rendered());
        Ok(output)
    }
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

// ============================================================================
// Fake runner
// ============================================================================

enum Canned {
    Output(CommandOutput),
    Timeout,
}

/// Scripted runner for exercising backends without live package managers.
///
/// Responses are keyed by the rendered command line (no elevation prefix).
/// Commands with no scripted response fail to spawn, which is exactly how
/// an absent manager presents. Every invocation is recorded in order.
#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<Vec<(String, Canned)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    /// Runner with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a zero-exit response with the given stdout.
    #[must_use]
    pub fn ok(self, command: &str, stdout: &str) -> Self {
        self.respond(
            command,
            CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                code: Some(0),
            },
        )
    }

    /// Script a non-zero response with the given stderr.
    #[must_use]
    pub fn fail(self, command: &str, code: i32, stderr: &str) -> Self {
        self.respond(
            command,
            CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                code: Some(code),
            },
        )
    }

    /// Script a full output.
    #[must_use]
    pub fn respond(self, command: &str, output: CommandOutput) -> Self {
        self.push(command, Canned::Output(output));
        self
    }

    /// Script a timeout.
    #[must_use]
    pub fn timeout(self, command: &str) -> Self {
        self.push(command, Canned::Timeout);
        self
    }

    /// Commands run so far, in order, rendered without elevation prefixes.
    pub fn calls(&self) -> Vec<String> {
        self.lock_calls().clone()
    }

    /// How many commands have been run.
    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    fn push(&self, command: &str, canned: Canned) {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((command.to_string(), canned));
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunError> {
        let key = spec.rendered();
        self.lock_calls().push(key.clone());

        let responses = self
            .responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match responses.iter().find(|(cmd, _)| *cmd == key) {
            Some((_, Canned::Output(output))) => Ok(output.clone()),
            Some((_, Canned::Timeout)) => Err(RunError::Timeout {
                command: key,
                limit: spec.timeout.unwrap_or(DEFAULT_TIMEOUT),
            }),
            None => Err(RunError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "command not found"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevate::Headless;

    #[test]
    fn rendered_joins_program_and_args() {
        let spec = CommandSpec::new("dpkg", &["-l", "firefox"]);
        assert_eq!(spec.rendered(), "dpkg -l firefox");
    }

    #[test]
    fn fake_runner_matches_rendered_command() {
        let runner = FakeRunner::new().ok("echo hi", "hi\n");
        let out = runner.run(&CommandSpec::new("echo", &["hi"])).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hi\n");
        assert_eq!(runner.calls(), vec!["echo hi".to_string()]);
    }

    #[test]
    fn fake_runner_unscripted_command_fails_to_spawn() {
        let runner = FakeRunner::new();
        let err = runner.run(&CommandSpec::new("brew", &["list"])).unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn fake_runner_scripted_timeout() {
        let runner = FakeRunner::new().timeout("dnf install -y firefox");
        let err = runner
            .run(&CommandSpec::new("dnf", &["install", "-y", "firefox"]))
            .unwrap_err();
        assert!(matches!(err, RunError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_nonzero_exit() {
        let runner = SystemRunner::new();
        let out = runner
            .run(&CommandSpec::new(
                "sh",
                &["-c", "echo out; echo err >&2; exit 3"],
            ))
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_missing_binary_is_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&CommandSpec::new("outfit-test-no-such-binary", &[]))
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_kills_on_timeout() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("sh", &["-c", "sleep 5"])
            .with_timeout(Duration::from_millis(50));
        let err = runner.run(&spec).unwrap_err();
        assert!(matches!(err, RunError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_refuses_root_when_headless() {
        let runner = SystemRunner::with_elevation(Box::new(Headless));
        let err = runner
            .run(&CommandSpec::root("apt-get", &["install", "-y", "firefox"]))
            .unwrap_err();
        match err {
            RunError::ElevationDeclined { command } => {
                assert_eq!(command, "sudo apt-get install -y firefox");
            }
            other => panic!("expected elevation refusal, got {other:?}"),
        }
    }
}
