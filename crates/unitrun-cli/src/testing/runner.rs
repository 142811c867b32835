//! Test runner - execute discovered test files one at a time

use crate::testing::discovery::{TestFile, TestSuite};
use crate::testing::result::{tail_lines, ExitState, FileRun, Outcome, TestCase};
use crate::testing::tap;
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a child is polled while a timeout is active
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared buffer a pipe reader appends to
type Captured = Arc<Mutex<Vec<u8>>>;

/// Test runner with configuration
pub struct TestRunner {
    /// Working directory for test processes
    working_dir: PathBuf,
    /// Interpreter command per file extension
    interpreters: BTreeMap<String, String>,
    /// Timeout for individual files
    timeout: Option<Duration>,
    /// Stop after the first unsuccessful file
    fail_fast: bool,
}

impl TestRunner {
    /// Create a new test runner with default settings
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            interpreters: BTreeMap::new(),
            timeout: None,
            fail_fast: false,
        }
    }

    /// Set the interpreter table
    pub fn with_interpreters(mut self, interpreters: BTreeMap<String, String>) -> Self {
        self.interpreters = interpreters;
        self
    }

    /// Set the timeout for individual files
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop after the first file with a failing case
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run all files in the suite
    pub fn run(&self, suite: &TestSuite) -> Vec<FileRun> {
        self.run_with(suite, |_| {})
    }

    /// Run all files, calling `on_file` as each one finishes
    pub fn run_with<F>(&self, suite: &TestSuite, mut on_file: F) -> Vec<FileRun>
    where
        F: FnMut(&FileRun),
    {
        let mut runs = Vec::with_capacity(suite.len());

        for file in &suite.files {
            let run = self.run_file(file);
            on_file(&run);
            let stop = self.fail_fast && !run.is_success();
            runs.push(run);

            if stop {
                tracing::debug!("fail-fast: stopping after {}", file.name());
                break;
            }
        }

        runs
    }

    /// Run a single file
    pub fn run_file(&self, file: &TestFile) -> FileRun {
        let start = Instant::now();

        let mut command = self.command_for(file);
        command
            .current_dir(&self.working_dir)
            .env("UNITRUN", "1")
            .env("UNITRUN_TEST_FILE", &file.relative)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // A timed-out file is killed together with everything it spawned
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::debug!("launching {:?}", command);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let case = TestCase::new(1, file.name(), Outcome::Error)
                    .with_diagnostic(format!("Failed to load test file: {}", e));
                return FileRun {
                    file: file.clone(),
                    cases: vec![case],
                    exit: ExitState::NotStarted,
                    stderr: String::new(),
                    duration: start.elapsed(),
                };
            }
        };

        let (stdout_buf, stdout_reader) = capture(child.stdout.take());
        let (stderr_buf, stderr_reader) = capture(child.stderr.take());

        let exit = match self.wait(&mut child) {
            Ok(Some(status)) => exit_state(status),
            Ok(None) => ExitState::TimedOut,
            Err(e) => {
                tracing::warn!("failed waiting for {}: {}", file.name(), e);
                let _ = child.kill();
                ExitState::NotStarted
            }
        };

        // A killed child may leave descendants holding the pipes open; only
        // join the readers once the process has really finished.
        if exit != ExitState::TimedOut {
            for reader in [stdout_reader, stderr_reader].into_iter().flatten() {
                let _ = reader.join();
            }
        }

        let stdout = snapshot(&stdout_buf);
        let stderr = snapshot(&stderr_buf);
        let duration = start.elapsed();

        FileRun {
            file: file.clone(),
            cases: interpret(file, exit, &stdout, &stderr, self.timeout),
            exit,
            stderr,
            duration,
        }
    }

    /// Build the launch command for a file
    fn command_for(&self, file: &TestFile) -> Command {
        let interpreter = file
            .extension()
            .and_then(|ext| self.interpreters.get(ext))
            .map(|cmd| cmd.split_whitespace().collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());

        match interpreter {
            Some(parts) => {
                // Module loaders such as `python3 -m unittest` need a path
                // relative to the directory they import from
                let target = file
                    .path
                    .strip_prefix(&self.working_dir)
                    .unwrap_or(&file.path);
                let mut command = Command::new(parts[0]);
                command.args(&parts[1..]).arg(target);
                command
            }
            None => Command::new(&file.path),
        }
    }

    /// Wait for the child; `Ok(None)` means it was killed on timeout
    fn wait(&self, child: &mut Child) -> io::Result<Option<ExitStatus>> {
        let Some(limit) = self.timeout else {
            return child.wait().map(Some);
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= limit {
                kill_tree(child);
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Kill the child and every process left in its process group
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    // The child leads its own group, so its pid is the group id
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg only sends a signal; an invalid group just returns an error
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        tracing::debug!(
            "killpg({}) failed: {}",
            pgid,
            io::Error::last_os_error()
        );
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Drain a pipe on its own thread into a shared buffer
fn capture<R>(source: Option<R>) -> (Captured, Option<JoinHandle<()>>)
where
    R: Read + Send + 'static,
{
    let buffer: Captured = Arc::new(Mutex::new(Vec::new()));
    let handle = source.map(|mut pipe| {
        let sink = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
        })
    });
    (buffer, handle)
}

fn snapshot(buffer: &Captured) -> String {
    buffer
        .lock()
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

#[cfg(unix)]
fn exit_state(status: ExitStatus) -> ExitState {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => ExitState::Exited(code),
        (None, Some(signal)) => ExitState::Signaled(signal),
        (None, None) => ExitState::Exited(-1),
    }
}

#[cfg(not(unix))]
fn exit_state(status: ExitStatus) -> ExitState {
    ExitState::Exited(status.code().unwrap_or(-1))
}

/// Turn a finished process into test cases
pub(crate) fn interpret(
    file: &TestFile,
    exit: ExitState,
    stdout: &str,
    stderr: &str,
    timeout: Option<Duration>,
) -> Vec<TestCase> {
    let report = tap::parse(stdout);
    let is_tap = report.is_tap();
    let mut cases = report.cases;
    let ran = cases.len() as u32;

    if !is_tap {
        match exit {
            ExitState::Exited(0) => {
                cases.push(TestCase::new(1, file.name(), Outcome::Pass));
            }
            ExitState::Exited(code) => {
                cases.push(
                    TestCase::new(1, file.name(), Outcome::Fail)
                        .with_diagnostic(format!("exited with status {}", code)),
                );
            }
            ExitState::Signaled(signal) => {
                push_error(&mut cases, file, format!("terminated by signal {}", signal));
            }
            ExitState::TimedOut => {
                push_error(&mut cases, file, timed_out(timeout));
            }
            ExitState::NotStarted => {
                push_error(&mut cases, file, "process could not be waited on".to_string());
            }
        }
        return cases;
    }

    if let Some(reason) = report.bail_out {
        push_error(&mut cases, file, format!("Bail out! {}", reason));
        return cases;
    }

    match exit {
        ExitState::TimedOut => {
            push_error(&mut cases, file, timed_out(timeout));
            return cases;
        }
        ExitState::Signaled(signal) => {
            push_error(&mut cases, file, format!("terminated by signal {}", signal));
            return cases;
        }
        _ => {}
    }

    if let Some(plan) = &report.plan {
        if let (0, Some(reason)) = (plan.count, &plan.skip_all) {
            if cases.is_empty() {
                cases.push(TestCase::new(
                    1,
                    file.name(),
                    Outcome::Skip {
                        reason: reason.clone(),
                    },
                ));
            }
        } else if plan.count != ran {
            push_error(
                &mut cases,
                file,
                format!("planned {} tests but ran {}", plan.count, ran),
            );
        }
    }

    let already_failing = cases.iter().any(|c| c.outcome.is_problem());
    if let ExitState::Exited(code) = exit {
        if code != 0 && !already_failing {
            let mut message = format!("exited with status {}", code);
            if let Some(last) = tail_lines(stderr, 1).pop() {
                message.push_str(&format!(": {}", last));
            }
            push_error(&mut cases, file, message);
        }
    }

    cases
}

/// Append a synthesized error case for the file itself
fn push_error(cases: &mut Vec<TestCase>, file: &TestFile, message: String) {
    let number = cases.len() as u32 + 1;
    cases.push(TestCase::new(number, file.name(), Outcome::Error).with_diagnostic(message));
}

fn timed_out(timeout: Option<Duration>) -> String {
    match timeout {
        Some(limit) => format!("timed out after {:.2?}", limit),
        None => "timed out".to_string(),
    }
}
