//! Persistent Python REPL evaluator
//!
//! One `python3` child process per namespace. Host and runner exchange
//! line-delimited JSON over stdin/stdout. The protocol keeps its own copy of
//! the stdout pipe. While a fragment runs, descriptor 1 points at a capture
//! file, so child processes land in the turn's output too; between fragments
//! it points at stderr.

use crate::error::{ReplError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::evaluator::{Evaluation, Evaluator, EvaluatorFactory, NamespaceSeed, QueryHandler};

const RESTART_NOTICE: &str =
    "[Interpreter was restarted; variables from earlier fragments were lost]\n";

const RUNNER: &str = r#"
import contextlib
import io
import json
import os
import sys
import tempfile
import traceback

_PROTO_IN = open(sys.stdin.fileno(), "r", encoding="utf-8", closefd=False)
_PROTO_OUT = open(os.dup(1), "w", encoding="utf-8")
os.dup2(2, 1)
sys.stdin = io.StringIO("")


def _send(message):
    _PROTO_OUT.write(json.dumps(message) + "\n")
    _PROTO_OUT.flush()


def _receive():
    line = _PROTO_IN.readline()
    if not line:
        os._exit(0)
    return json.loads(line)


def _jsonable(value):
    try:
        json.dumps(value, allow_nan=False)
        return value
    except (TypeError, ValueError):
        return repr(value)


class _Termination:
    finished = False
    value = None


_state = _Termination()


def FINAL(value):
    if not _state.finished:
        _state.finished = True
        _state.value = _jsonable(value)


def FINAL_VAR(name):
    if name not in _bindings:
        raise NameError(f"name '{name}' is not defined")
    FINAL(_bindings[name])


def llm_query(query, context=""):
    _send({"type": "llm_query", "query": str(query), "context": str(context)})
    reply = _receive()
    if reply.get("type") != "llm_result":
        raise RuntimeError("unexpected reply from host: " + str(reply.get("type")))
    return reply.get("value")


class _FdWriter(io.TextIOBase):
    def writable(self):
        return True

    def write(self, text):
        data = text.encode("utf-8", "replace")
        while data:
            data = data[os.write(1, data):]
        return len(text)


def _run_captured(code):
    with tempfile.TemporaryFile() as capture:
        sys.__stdout__.flush()
        os.dup2(capture.fileno(), 1)
        error = None
        try:
            with contextlib.redirect_stdout(_FdWriter()):
                exec(compile(code, "<repl>", "exec"), _bindings)
        except BaseException as exc:
            error = _describe(exc)
        finally:
            try:
                sys.__stdout__.flush()
            except Exception:
                pass
            os.dup2(2, 1)
        capture.seek(0)
        return capture.read().decode("utf-8", "replace"), error


def _describe(exc):
    kind = type(exc).__name__
    if isinstance(exc, SyntaxError):
        message = exc.msg or ""
        line = exc.lineno if exc.filename == "<repl>" else None
    else:
        message = str(exc)
        line = None
        for frame in reversed(traceback.extract_tb(exc.__traceback__)):
            if frame.filename == "<repl>":
                line = frame.lineno
                break
    text = f"{kind}: {message}" if message else kind
    if line is not None:
        text += f" (line {line})"
    return text


_init = _receive()
os.environ.update(_init.get("env") or {})
_bindings = {
    "__name__": "__main__",
    "context": _init.get("context", ""),
    "llm_query": llm_query,
    "FINAL": FINAL,
    "FINAL_VAR": FINAL_VAR,
}
_send({"type": "ready"})

while True:
    _request = _receive()
    if _request.get("type") != "exec":
        continue
    _was_finished = _state.finished
    _stdout, _error = _run_captured(_request.get("code", ""))
    _finished_now = _state.finished and not _was_finished
    _send({
        "type": "exec_result",
        "stdout": _stdout,
        "error": _error,
        "finished": _finished_now,
        "value": _state.value if _finished_now else None,
    })
"#;

/// Messages sent from the host to the runner
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HostMessage<'a> {
    Init {
        context: &'a str,
        env: &'a HashMap<String, String>,
    },
    Exec {
        code: &'a str,
    },
    LlmResult {
        value: Value,
    },
}

/// Messages sent from the runner to the host
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RunnerMessage {
    Ready,
    LlmQuery {
        query: String,
        #[serde(default)]
        context: String,
    },
    ExecResult {
        #[serde(default)]
        stdout: String,
        error: Option<String>,
        #[serde(default)]
        finished: bool,
        #[serde(default)]
        value: Value,
    },
}

/// Creates [`PythonEvaluator`]s
#[derive(Debug, Clone)]
pub struct PythonEvaluatorFactory {
    python_command: String,
    exec_timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl PythonEvaluatorFactory {
    pub fn new<S: Into<String>>(python_command: S, exec_timeout: Duration) -> Self {
        Self {
            python_command: python_command.into(),
            exec_timeout,
            working_dir: None,
        }
    }

    /// Start interpreters in `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }
}

impl Default for PythonEvaluatorFactory {
    fn default() -> Self {
        Self::new("python3", Duration::from_secs(120))
    }
}

impl EvaluatorFactory for PythonEvaluatorFactory {
    fn create(&self, seed: NamespaceSeed) -> Box<dyn Evaluator> {
        Box::new(PythonEvaluator {
            factory: self.clone(),
            seed,
            session: None,
            bindings_lost: false,
        })
    }
}

/// A namespace backed by a Python child process.
///
/// The process is started on first use. After a timeout or an unexpected
/// exit it is discarded and the next fragment starts a fresh one seeded with
/// the same context and data.
pub struct PythonEvaluator {
    factory: PythonEvaluatorFactory,
    seed: NamespaceSeed,
    session: Option<ReplSession>,
    bindings_lost: bool,
}

enum Exchange {
    Done(Evaluation),
    TimedOut,
    Died(String),
}

impl PythonEvaluator {
    async fn exchange(
        session: &mut ReplSession,
        fragment: &str,
        queries: &dyn QueryHandler,
        exec_timeout: Duration,
    ) -> Exchange {
        if let Err(e) = session.send(&HostMessage::Exec { code: fragment }).await {
            return Exchange::Died(e.to_string());
        }

        loop {
            let message = match timeout(exec_timeout, session.receive()).await {
                Ok(Ok(message)) => message,
                Ok(Err(e)) => return Exchange::Died(e.to_string()),
                Err(_) => return Exchange::TimedOut,
            };

            match message {
                RunnerMessage::LlmQuery { query, context } => {
                    debug!(query_chars = query.len(), "Serving nested llm_query");
                    let value = queries.query(query, context).await;
                    if let Err(e) = session.send(&HostMessage::LlmResult { value }).await {
                        return Exchange::Died(e.to_string());
                    }
                }
                RunnerMessage::ExecResult {
                    stdout,
                    error,
                    finished,
                    value,
                } => {
                    let mut evaluation = Evaluation::output(stdout);
                    evaluation.fault = error;
                    if finished {
                        evaluation.finished = Some(value);
                    }
                    return Exchange::Done(evaluation);
                }
                RunnerMessage::Ready => {
                    warn!("Ignoring unexpected ready message from interpreter");
                }
            }
        }
    }
}

#[async_trait]
impl Evaluator for PythonEvaluator {
    async fn evaluate(
        &mut self,
        fragment: &str,
        queries: &dyn QueryHandler,
    ) -> Result<Evaluation> {
        let mut notice = String::new();
        if self.session.is_none() {
            if self.bindings_lost {
                notice.push_str(RESTART_NOTICE);
                self.bindings_lost = false;
            }
            let session = ReplSession::start(&self.factory, &self.seed).await?;
            self.session = Some(session);
        }
        let session = self.session.as_mut().ok_or_else(|| ReplError::Protocol {
            message: "interpreter session missing after start".to_string(),
        })?;

        let exec_timeout = self.factory.exec_timeout;
        let outcome = Self::exchange(session, fragment, queries, exec_timeout).await;

        match outcome {
            Exchange::Done(mut evaluation) => {
                evaluation.output.insert_str(0, &notice);
                Ok(evaluation)
            }
            Exchange::TimedOut => {
                warn!(
                    timeout_secs = exec_timeout.as_secs(),
                    "Fragment timed out, stopping interpreter"
                );
                self.discard_session().await;
                Ok(Evaluation::output(notice).with_fault(format!(
                    "TimeoutError: fragment did not finish within {}s; the interpreter was stopped",
                    exec_timeout.as_secs()
                )))
            }
            Exchange::Died(reason) => {
                warn!(%reason, "Interpreter exited unexpectedly");
                self.discard_session().await;
                Ok(Evaluation::output(notice)
                    .with_fault(format!("InterpreterExited: {}", reason)))
            }
        }
    }
}

impl PythonEvaluator {
    async fn discard_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown().await;
        }
        self.bindings_lost = true;
    }
}

/// A running interpreter and its protocol pipes
struct ReplSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<()>>,
}

impl ReplSession {
    async fn start(factory: &PythonEvaluatorFactory, seed: &NamespaceSeed) -> Result<Self> {
        let program =
            which::which(&factory.python_command).map_err(|_| ReplError::InterpreterNotFound {
                command: factory.python_command.clone(),
            })?;

        let mut command = Command::new(&program);
        command
            .arg("-u")
            .arg("-c")
            .arg(RUNNER)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &factory.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| ReplError::Spawn {
            command: factory.python_command.clone(),
            message: e.to_string(),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| ReplError::Spawn {
            command: factory.python_command.clone(),
            message: "failed to capture stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ReplError::Spawn {
            command: factory.python_command.clone(),
            message: "failed to capture stdout".to_string(),
        })?;
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "rlm::repl::stderr", "{}", line);
                }
            })
        });

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr_task,
        };

        session
            .send(&HostMessage::Init {
                context: &seed.context,
                env: seed.data.entries(),
            })
            .await?;

        match timeout(factory.exec_timeout, session.receive()).await {
            Ok(Ok(RunnerMessage::Ready)) => {}
            Ok(Ok(_)) => {
                return Err(ReplError::Protocol {
                    message: "expected ready message after init".to_string(),
                }
                .into())
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(ReplError::Spawn {
                    command: factory.python_command.clone(),
                    message: "interpreter did not become ready in time".to_string(),
                }
                .into())
            }
        }

        info!(
            interpreter = %program.display(),
            data_entries = seed.data.len(),
            "Started Python REPL"
        );
        Ok(session)
    }

    async fn send(&mut self, message: &HostMessage<'_>) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<RunnerMessage> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await?;
        if read == 0 {
            return Err(ReplError::Protocol {
                message: "interpreter closed its output".to_string(),
            }
            .into());
        }
        serde_json::from_str(line.trim_end()).map_err(|e| {
            ReplError::Protocol {
                message: format!("invalid message from interpreter: {}", e),
            }
            .into()
        })
    }

    async fn shutdown(&mut self) {
        let _ = self.stdin.shutdown().await;
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

impl Drop for ReplSession {
    fn drop(&mut self) {
        self.child.start_kill().ok();
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}
