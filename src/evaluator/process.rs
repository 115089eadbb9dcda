use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::ast::{wire, QuerySet};
use crate::error::CompileError;
use crate::evaluator::Evaluator;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Partial evaluation through the `opa` binary.
///
/// Policy sources and the input document are staged in a scratch directory
/// which is removed when the call returns, in every outcome. The binary is
/// invoked as `opa eval --partial --format json` with one `--unknowns` flag
/// per unknown root.
pub struct ProcessEvaluator {
    binary: PathBuf,
    policies: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl ProcessEvaluator {
    /// Evaluate with the given binary and named `.rego` policy sources.
    pub fn new(binary: impl Into<PathBuf>, policies: BTreeMap<String, String>) -> Self {
        ProcessEvaluator {
            binary: binary.into(),
            policies,
            timeout: None,
        }
    }

    /// Kill the subprocess if it outlives `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn stage(&self, input: &Value) -> Result<(tempfile::TempDir, PathBuf, PathBuf), CompileError> {
        let unavailable = |e: std::io::Error| CompileError::EvaluatorUnavailable(e.to_string());

        let scratch = tempfile::Builder::new()
            .prefix("opa2sql")
            .tempdir()
            .map_err(unavailable)?;
        let data_dir = scratch.path().join("data");
        std::fs::create_dir_all(&data_dir).map_err(unavailable)?;
        for (filename, source) in &self.policies {
            std::fs::write(data_dir.join(filename), source).map_err(unavailable)?;
        }
        let input_path = scratch.path().join("input.json");
        let input_json = serde_json::to_string(input)
            .map_err(|e| CompileError::EvaluatorUnavailable(e.to_string()))?;
        std::fs::write(&input_path, input_json).map_err(unavailable)?;
        Ok((scratch, data_dir, input_path))
    }

    fn wait(&self, mut child: std::process::Child) -> Result<std::process::Output, CompileError> {
        let Some(timeout) = self.timeout else {
            return child
                .wait_with_output()
                .map_err(|e| CompileError::EvaluatorUnavailable(e.to_string()));
        };

        // Drain both pipes on background threads while polling: a child
        // whose output exceeds the pipe buffer would otherwise block on
        // write, never exit, and hit the deadline despite succeeding.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_reader = std::thread::spawn(move || drain_pipe(stdout_pipe));
        let stderr_reader = std::thread::spawn(move || drain_pipe(stderr_pipe));

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    // Killing the child closes its pipe ends; the reader
                    // threads see EOF and finish on their own.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CompileError::EvaluatorUnavailable(format!(
                        "evaluation timed out after {}ms",
                        timeout.as_millis()
                    )));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(CompileError::EvaluatorUnavailable(e.to_string())),
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        Ok(std::process::Output {
            status,
            stdout,
            stderr,
        })
    }
}

fn drain_pipe<R: std::io::Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

impl Evaluator for ProcessEvaluator {
    fn partial_eval(
        &self,
        query: &str,
        input: &Value,
        unknowns: &[String],
    ) -> Result<QuerySet, CompileError> {
        // The TempDir guard removes the scratch location on every return
        // path, success or failure.
        let (_scratch, data_dir, input_path) = self.stage(input)?;

        let mut command = Command::new(&self.binary);
        command.args(["eval", "--partial", "--format", "json"]);
        for unknown in unknowns {
            command.arg("--unknowns").arg(unknown);
        }
        command.arg("--data").arg(&data_dir);
        command.arg("--input").arg(&input_path);
        command.arg(query);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = command
            .spawn()
            .map_err(|e| CompileError::EvaluatorUnavailable(e.to_string()))?;
        let output = self.wait(child)?;

        if !output.status.success() {
            return Err(CompileError::EvaluatorFailed {
                status: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let body: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| CompileError::MalformedEvaluatorOutput(e.to_string()))?;
        wire::parse_partial_output(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_binary_is_unavailable_not_failed() {
        let evaluator = ProcessEvaluator::new(
            "/nonexistent/opa-binary",
            BTreeMap::from([("test.rego".to_string(), "package test".to_string())]),
        );
        let err = evaluator
            .partial_eval("data.test.p == true", &json!({}), &["data.q".to_string()])
            .unwrap_err();
        assert!(matches!(err, CompileError::EvaluatorUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_carries_code_and_stderr() {
        let evaluator = ProcessEvaluator::new("false", BTreeMap::new());
        let err = evaluator
            .partial_eval("data.test.p == true", &json!({}), &[])
            .unwrap_err();
        assert!(matches!(err, CompileError::EvaluatorFailed { status: 1, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn output_larger_than_the_pipe_buffer_completes_under_a_timeout() {
        use std::os::unix::fs::PermissionsExt;

        // 512KB of padding around a valid envelope; well past the ~64KB
        // pipe buffer, so an undrained child would block on write.
        let dir = tempfile::tempdir().unwrap();
        let payload_path = dir.path().join("payload.json");
        let mut payload = String::from(r#"{"partial":{"queries":[]},"pad":""#);
        payload.push_str(&"x".repeat(512 * 1024));
        payload.push_str("\"}");
        std::fs::write(&payload_path, payload).unwrap();

        let script = dir.path().join("fake-opa");
        std::fs::write(
            &script,
            format!("#!/bin/sh\ncat {}\n", payload_path.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let evaluator = ProcessEvaluator::new(&script, BTreeMap::new())
            .with_timeout(Duration::from_secs(2));
        let query_set = evaluator
            .partial_eval("data.test.p == true", &json!({}), &[])
            .unwrap();
        assert!(query_set.queries.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_the_subprocess() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-opa");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let evaluator = ProcessEvaluator::new(&script, BTreeMap::new())
            .with_timeout(Duration::from_millis(100));
        let err = evaluator
            .partial_eval("data.test.p == true", &json!({}), &[])
            .unwrap_err();
        match err {
            CompileError::EvaluatorUnavailable(message) => {
                assert!(message.contains("timed out"), "unexpected message: {message}");
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}
