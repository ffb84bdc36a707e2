use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{Output, Stdio};

use tracing::{debug, warn};

/// Exit code reported when the process could not be spawned at all.
pub const SPAWN_FAILED: i32 = -1;

pub type RunFuture = Pin<Box<dyn Future<Output = CommandOutput> + Send + 'static>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed stderr, else trimmed stdout, else a generic message.
    pub fn excerpt(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        "unknown error".to_string()
    }

    /// stdout followed by stderr, as git splits commit summaries across both.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    fn from_output(output: Output) -> Self {
        Self {
            // Killed by a signal: no code.
            exit_code: output.status.code().unwrap_or(SPAWN_FAILED),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    fn spawn_error(program: &str, err: &std::io::Error) -> Self {
        Self::failed(SPAWN_FAILED, format!("failed to run {}: {}", program, err))
    }
}

/// Runs git invocations. Failures come back inside [`CommandOutput`], never as errors.
pub trait GitRunner: Send + Sync {
    fn run(&self, args: &[String], cwd: &Path) -> CommandOutput;

    /// Resolves on completion without blocking the caller; invocations are independent.
    fn run_async(&self, args: Vec<String>, cwd: PathBuf) -> RunFuture;
}

pub fn argv<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

// Status must not take the index lock while stage/unstage run beside it,
// and push must never wait on a credential prompt.
const GIT_ENV: [(&str, &str); 2] = [("GIT_OPTIONAL_LOCKS", "0"), ("GIT_TERMINAL_PROMPT", "0")];

impl GitRunner for ProcessRunner {
    fn run(&self, args: &[String], cwd: &Path) -> CommandOutput {
        debug!(program = %self.program, args = ?args, cwd = %cwd.display(), "Running");
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(args)
            .current_dir(cwd)
            .envs(GIT_ENV)
            .stdin(Stdio::null());
        match cmd.output() {
            Ok(output) => CommandOutput::from_output(output),
            Err(e) => {
                warn!(program = %self.program, err = %e, "Failed to spawn");
                CommandOutput::spawn_error(&self.program, &e)
            }
        }
    }

    fn run_async(&self, args: Vec<String>, cwd: PathBuf) -> RunFuture {
        let program = self.program.clone();
        Box::pin(async move {
            debug!(program = %program, args = ?args, cwd = %cwd.display(), "Running async");
            let mut cmd = tokio::process::Command::new(&program);
            cmd.args(&args)
                .current_dir(&cwd)
                .envs(GIT_ENV)
                .stdin(Stdio::null());
            match cmd.output().await {
                Ok(output) => CommandOutput::from_output(output),
                Err(e) => {
                    warn!(program = %program, err = %e, "Failed to spawn");
                    CommandOutput::spawn_error(&program, &e)
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    type Handler = dyn Fn(&[String]) -> CommandOutput + Send + Sync;

    /// Answers invocations from a closure and records every argv it saw.
    #[derive(Clone)]
    pub struct ScriptedRunner {
        handler: Arc<Handler>,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl ScriptedRunner {
        pub fn new(handler: impl Fn(&[String]) -> CommandOutput + Send + Sync + 'static) -> Self {
            Self {
                handler: Arc::new(handler),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().clone()
        }

        pub fn called_with(&self, prefix: &[&str]) -> bool {
            self.calls().iter().any(|call| {
                call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b)
            })
        }
    }

    impl GitRunner for ScriptedRunner {
        fn run(&self, args: &[String], _cwd: &Path) -> CommandOutput {
            self.calls.lock().push(args.to_vec());
            (self.handler)(args)
        }

        fn run_async(&self, args: Vec<String>, _cwd: PathBuf) -> RunFuture {
            self.calls.lock().push(args.clone());
            let output = (self.handler)(&args);
            Box::pin(async move {
                tokio::task::yield_now().await;
                output
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_prefers_stderr_then_stdout() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: "  nothing to commit \n".into(),
            stderr: "\n fatal: bad \n".into(),
        };
        assert_eq!(out.excerpt(), "fatal: bad");

        let out = CommandOutput {
            exit_code: 1,
            stdout: "  nothing to commit \n".into(),
            stderr: "  ".into(),
        };
        assert_eq!(out.excerpt(), "nothing to commit");

        assert_eq!(CommandOutput::failed(1, "").excerpt(), "unknown error");
    }

    #[test]
    fn missing_binary_is_reported_not_raised() {
        let runner = ProcessRunner::new("definitely-not-a-real-binary-7f3a");
        let out = runner.run(&argv(["status"]), Path::new("."));
        assert_eq!(out.exit_code, SPAWN_FAILED);
        assert!(out.stdout.is_empty());
        assert!(out.stderr.contains("definitely-not-a-real-binary-7f3a"));
    }

    #[tokio::test]
    async fn missing_binary_async_is_reported_not_raised() {
        let runner = ProcessRunner::new("definitely-not-a-real-binary-7f3a");
        let out = runner
            .run_async(argv(["status"]), PathBuf::from("."))
            .await;
        assert!(!out.success());
        assert_eq!(out.exit_code, SPAWN_FAILED);
    }
}
