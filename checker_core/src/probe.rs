use std::{
    fs::File,
    io::{self, Read},
    os::unix::process::{CommandExt, ExitStatusExt},
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Where the child's standard input comes from.
pub enum Source {
    Empty,
    File(File),
}

/// Where the child's standard output goes.
pub enum Sink {
    Capture,
    File(File),
}

type Drain = JoinHandle<io::Result<Vec<u8>>>;

/// A launched child process, watched until it exits or its time runs out.
///
/// The child leads its own process group so a timeout kill also takes down
/// anything it forked. Captured pipes are drained on helper threads while the
/// probe waits.
pub struct ProcessProbe {
    child: Child,
    program: String,
    started: Instant,
    stdout: Option<Drain>,
    stderr: Option<Drain>,
}

impl ProcessProbe {
    pub fn launch(mut command: Command, stdin: Source, stdout: Sink) -> Result<Self> {
        let program = describe(&command);

        command.stdin(match stdin {
            Source::Empty => Stdio::null(),
            Source::File(file) => Stdio::from(file),
        });
        command.stdout(match stdout {
            Sink::Capture => Stdio::piped(),
            Sink::File(file) => Stdio::from(file),
        });
        command.stderr(Stdio::piped());
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| Error::Launch {
            program: program.clone(),
            source,
        })?;
        debug!("launched `{}` as pid {}", program, child.id());

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        Ok(Self {
            child,
            program,
            started: Instant::now(),
            stdout,
            stderr,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Wait for the process to stop, killing it once `limit` has elapsed.
    ///
    /// The limit covers the whole process group: anything the child forked
    /// that still holds its pipes keeps the clock running after the child
    /// itself exited. Whatever is left of the group is killed on return.
    pub fn watching(mut self, limit: Option<Duration>) -> Result<ProcessBio> {
        let deadline = limit.and_then(|limit| self.started.checked_add(limit));
        let expired = |now: Instant| deadline.map_or(false, |d| now >= d);
        let pid = self.pid();

        let (status, mut timed_out) = loop {
            if let Some(status) = self.child.try_wait()? {
                break (status, false);
            }
            if expired(Instant::now()) {
                self.kill_group();
                let status = self.child.wait()?;
                break (status, true);
            }
            thread::sleep(POLL_INTERVAL);
        };

        while !timed_out && !self.drains_finished() {
            if expired(Instant::now()) {
                debug!("`{}` left processes holding its pipes", self.program);
                timed_out = true;
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }
        if let Err(e) = self.signal_group() {
            warn!("failed to clean up process group {}: {}", pid, e);
        }
        let elapsed = self.started.elapsed();

        let stdout = collect(self.stdout.take())?;
        let stderr = collect(self.stderr.take())?;

        debug!(
            "`{}` (pid {}) finished in {:?}: {:?}{}",
            self.program,
            pid,
            elapsed,
            status,
            if timed_out { " (killed)" } else { "" }
        );

        Ok(ProcessBio {
            program: self.program,
            status,
            elapsed,
            limit,
            timed_out,
            stdout,
            stderr,
        })
    }

    fn drains_finished(&self) -> bool {
        [&self.stdout, &self.stderr].iter().all(|drain| match drain {
            Some(handle) => handle.is_finished(),
            None => true,
        })
    }

    fn signal_group(&self) -> io::Result<()> {
        let pgid = self.child.id() as libc::pid_t;
        match unsafe { libc::kill(-pgid, libc::SIGKILL) } {
            0 => Ok(()),
            _ => match io::Error::last_os_error() {
                // nobody left in the group
                e if e.raw_os_error() == Some(libc::ESRCH) => Ok(()),
                e => Err(e),
            },
        }
    }

    fn kill_group(&mut self) {
        if let Err(e) = self.signal_group() {
            warn!("failed to kill process group {}: {}", self.child.id(), e);
            // the child itself must still go
            let _ = self.child.kill();
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Drain {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<Drain>) -> Result<Vec<u8>> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(bytes) => Ok(bytes?),
            Err(_) => Ok(Vec::new()),
        },
        None => Ok(Vec::new()),
    }
}

fn describe(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().to_string()];
    parts.extend(command.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}

/// Everything known about a process after it stopped.
#[derive(Debug)]
pub struct ProcessBio {
    program: String,
    status: ExitStatus,
    elapsed: Duration,
    limit: Option<Duration>,
    timed_out: bool,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ProcessBio {
    /// Exit code, or `None` when the process died from a signal.
    pub fn get_status(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn get_signal(&self) -> Option<i32> {
        self.status.signal()
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// Get wall time usage(ms).
    pub fn get_time_usage(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// `Command '<cmd>' timed out after <n> seconds`, only for killed processes.
    pub fn timeout_message(&self) -> Option<String> {
        match (self.timed_out, self.limit) {
            (true, Some(limit)) => Some(format!(
                "Command '{}' timed out after {} seconds",
                self.program,
                limit.as_secs_f64()
            )),
            _ => None,
        }
    }
}
