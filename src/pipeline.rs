use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;

/// Recorded result of a single pipeline stage.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl StageOutcome {
    fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// An ordered sequence of argument-vector command stages.
///
/// Stages run either as independently gated commands (`run_sequence`, a
/// failing stage skips the rest) or as one connected pipe (`run_streamed`,
/// stage n's stdout feeds stage n+1's stdin through the OS pipe buffer).
/// This is the only place in the crate where external processes are spawned.
#[derive(Debug, Default)]
pub struct CommandPipeline {
    stages: Vec<Vec<String>>,
    outcomes: Vec<StageOutcome>,
    captured_stdout: String,
}

impl CommandPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command stage given as program + arguments.
    pub fn add<I, S>(&mut self, stage: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = stage.into_iter().map(Into::into).collect();
        if !argv.is_empty() {
            self.stages.push(argv);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Run the stages one after another; a non-zero stage gates off the rest.
    pub async fn run_sequence(&mut self) {
        self.outcomes.clear();
        self.captured_stdout.clear();

        for argv in &self.stages {
            let rendered = argv.join(" ");
            debug!("Executing command: {}", rendered);

            let result = Command::new(&argv[0])
                .args(&argv[1..])
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await;

            match result {
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    let failed = !output.status.success();
                    self.outcomes.push(StageOutcome {
                        command: rendered,
                        exit_code: output.status.code(),
                        stderr: if stderr.is_empty() && failed { stdout } else { stderr },
                    });
                    if failed {
                        break;
                    }
                }
                Err(e) => {
                    self.outcomes.push(StageOutcome {
                        command: rendered,
                        exit_code: None,
                        stderr: format!("failed to spawn: {}", e),
                    });
                    break;
                }
            }
        }
    }

    /// Run all stages as one connected pipe.
    ///
    /// The final stage's stdout is written to `sink` when given and captured
    /// in memory otherwise. Every spawned child is waited on and stderr is
    /// drained from a task per stage, so no zombies or open descriptors
    /// remain whatever the outcome.
    pub async fn run_streamed(&mut self, sink: Option<&Path>) {
        self.outcomes.clear();
        self.captured_stdout.clear();

        let mut children: Vec<(String, tokio::process::Child, JoinHandle<String>)> = Vec::new();
        let mut pending_failure: Option<StageOutcome> = None;
        let mut upstream: Option<ChildStdout> = None;
        let last_index = self.stages.len().saturating_sub(1);

        for (index, argv) in self.stages.iter().enumerate() {
            let rendered = argv.join(" ");
            debug!("Spawning pipeline stage: {}", rendered);

            let mut command = Command::new(&argv[0]);
            command
                .args(&argv[1..])
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            match upstream.take() {
                Some(stdout) => match TryInto::<Stdio>::try_into(stdout) {
                    Ok(stdio) => {
                        command.stdin(stdio);
                    }
                    Err(e) => {
                        pending_failure = Some(StageOutcome {
                            command: rendered,
                            exit_code: None,
                            stderr: format!("failed to wire pipe: {}", e),
                        });
                        break;
                    }
                },
                None => {
                    command.stdin(Stdio::null());
                }
            }

            if index == last_index {
                match sink {
                    Some(path) => match std::fs::File::create(path) {
                        Ok(file) => {
                            command.stdout(Stdio::from(file));
                        }
                        Err(e) => {
                            pending_failure = Some(StageOutcome {
                                command: rendered,
                                exit_code: None,
                                stderr: format!("failed to open {}: {}", path.display(), e),
                            });
                            break;
                        }
                    },
                    None => {
                        command.stdout(Stdio::piped());
                    }
                }
            } else {
                command.stdout(Stdio::piped());
            }

            match command.spawn() {
                Ok(mut child) => {
                    if index != last_index {
                        upstream = child.stdout.take();
                    }
                    let stderr_task = drain_stderr(child.stderr.take());
                    children.push((rendered, child, stderr_task));
                }
                Err(e) => {
                    pending_failure = Some(StageOutcome {
                        command: rendered,
                        exit_code: None,
                        stderr: format!("failed to spawn: {}", e),
                    });
                    break;
                }
            }
        }

        // Closing the unused upstream pipe lets already-spawned stages see
        // EOF and exit instead of blocking forever.
        drop(upstream);

        let mut stdout_task: Option<JoinHandle<String>> = None;
        if sink.is_none() && pending_failure.is_none() {
            if let Some((_, child, _)) = children.last_mut() {
                stdout_task = child.stdout.take().map(|mut stdout| {
                    tokio::spawn(async move {
                        let mut buffer = String::new();
                        let _ = stdout.read_to_string(&mut buffer).await;
                        buffer
                    })
                });
            }
        }

        for (rendered, mut child, stderr_task) in children {
            let status = child.wait().await;
            let stderr = stderr_task.await.unwrap_or_default();
            match status {
                Ok(status) => self.outcomes.push(StageOutcome {
                    command: rendered,
                    exit_code: status.code(),
                    stderr: stderr.trim().to_string(),
                }),
                Err(e) => self.outcomes.push(StageOutcome {
                    command: rendered,
                    exit_code: None,
                    stderr: format!("failed to wait: {}", e),
                }),
            }
        }

        if let Some(failure) = pending_failure {
            self.outcomes.push(failure);
        }

        if let Some(task) = stdout_task {
            self.captured_stdout = task.await.unwrap_or_default();
        }
    }

    /// True only if every appended stage ran and exited zero.
    pub fn success(&self) -> bool {
        self.outcomes.len() == self.stages.len() && self.outcomes.iter().all(StageOutcome::succeeded)
    }

    /// Stdout captured by `run_streamed` when no sink file was given.
    pub fn stdout(&self) -> &str {
        &self.captured_stdout
    }

    /// One diagnostic line per failed or skipped stage.
    pub fn error_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded())
            .map(|outcome| match (outcome.exit_code, outcome.stderr.is_empty()) {
                (Some(code), false) => {
                    format!("`{}` exited with status {}: {}", outcome.command, code, outcome.stderr)
                }
                (Some(code), true) => format!("`{}` exited with status {}", outcome.command, code),
                (None, _) => format!("`{}` failed: {}", outcome.command, outcome.stderr),
            })
            .collect();

        if !messages.is_empty() {
            for argv in self.stages.iter().skip(self.outcomes.len()) {
                messages.push(format!("`{}` was not run", argv.join(" ")));
            }
        }

        messages
    }

    /// The full failure transcript, suitable for error context.
    pub fn transcript(&self) -> String {
        self.error_messages().join("; ")
    }
}

fn drain_stderr(stderr: Option<ChildStderr>) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut buffer = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut buffer).await;
        }
        buffer
    })
}
