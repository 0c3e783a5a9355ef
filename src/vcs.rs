//! Version-control command execution
//!
//! Shelling out to git is modeled as a narrow [`CommandRunner`] interface so
//! the storage and sync code can be exercised against [`MockRunner`] without
//! ever invoking the real binary.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Captured output of one git invocation
#[derive(Clone, Debug)]
pub struct CmdOutput {
    /// Combined stdout/stderr, split into lines
    pub lines: Vec<String>,
    /// Process exit code
    pub code: i32,
}

impl CmdOutput {
    /// A successful invocation with the given output lines
    pub fn success(lines: Vec<String>) -> Self {
        CmdOutput { lines, code: 0 }
    }

    /// A failed invocation with the given exit code and output lines
    pub fn failure(code: i32, lines: Vec<String>) -> Self {
        CmdOutput { lines, code }
    }

    pub fn ok(&self) -> bool {
        self.code == 0
    }

    /// All output as one line, for error messages
    pub fn joined(&self) -> String {
        self.lines.join(" ")
    }
}

/// Runs a version-control command inside a designated working tree.
pub trait CommandRunner {
    /// Run `git <args>` and capture its output. `Err` means the command
    /// could not be executed at all (spawn failure, timeout); a non-zero
    /// exit is returned as a normal [`CmdOutput`] for the caller to judge.
    fn run(&self, args: &[&str]) -> Result<CmdOutput>;
}

/// Default timeout for a single git invocation
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Real git CLI runner, bound to one working directory.
pub struct GitCli {
    workdir: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        GitCli {
            workdir: workdir.as_ref().to_path_buf(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    /// Override the per-command wall-clock bound
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl CommandRunner for GitCli {
    fn run(&self, args: &[&str]) -> Result<CmdOutput> {
        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::VcsCommand(format!("failed to spawn git: {}", e)))?;

        // Drain pipes on separate threads so a chatty command cannot block
        // against a full pipe buffer while we poll for exit.
        let mut stdout = child.stdout.take().expect("stdout piped");
        let mut stderr = child.stderr.take().expect("stderr piped");
        let out_thread = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf);
            buf
        });
        let err_thread = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::VcsCommand(format!(
                        "git {} timed out after {:?}",
                        args.join(" "),
                        self.timeout
                    )));
                }
                None => std::thread::sleep(Duration::from_millis(25)),
            }
        };

        let mut lines: Vec<String> = Vec::new();
        for buf in [out_thread, err_thread] {
            let text = buf.join().unwrap_or_default();
            lines.extend(text.lines().map(str::to_string));
        }

        Ok(CmdOutput {
            lines,
            code: status.code().unwrap_or(-1),
        })
    }
}

/// Scripted runner for tests.
///
/// Records every invocation and replays queued responses keyed by the git
/// subcommand (the first argument). Unscripted subcommands succeed with
/// empty output, which conveniently reads as "nothing to commit" for
/// `status --porcelain`.
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<Vec<String>>>,
    responses: Mutex<HashMap<String, VecDeque<CmdOutput>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Queue a response for the next invocation of `subcommand`.
    pub fn respond(&self, subcommand: &str, output: CmdOutput) {
        self.responses
            .lock()
            .entry(subcommand.to_string())
            .or_default()
            .push_back(output);
    }

    /// Every invocation seen so far, as argument vectors.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Subcommands seen so far, in order.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|args| args.first().cloned())
            .collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, args: &[&str]) -> Result<CmdOutput> {
        self.calls
            .lock()
            .push(args.iter().map(|s| s.to_string()).collect());

        let subcommand = args.first().copied().unwrap_or_default();
        let queued = self
            .responses
            .lock()
            .get_mut(subcommand)
            .and_then(|q| q.pop_front());

        Ok(queued.unwrap_or_else(|| CmdOutput::success(Vec::new())))
    }
}
