//! External resource monitor supervision.
//!
//! The resource monitor is an external script that samples system resource
//! usage and prints one whitespace-separated line per sample. It is started
//! as
//!
//! ```text
//! <launcher> <pid_folder>/proc.pid "" <frequency>
//! ```
//!
//! and keeps sampling until the pid file contains `exit`. A worker task
//! forwards every non-empty output line (stdout and stderr) into a queue
//! that [`ResourceMonitor::get_measurements`] drains without blocking.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::MonitorSettings;
use crate::decode::Measurements;
use crate::error::{MonitorError, Result};
use crate::field::FieldSpec;

/// Name of the pid marker file inside the pid folder.
pub const PID_FILE_NAME: &str = "proc.pid";

/// Pid file content that asks the monitor script to terminate.
pub const EXIT_SENTINEL: &str = "exit";

/// Lifecycle state of a [`ResourceMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Created, not started.
    Idle,
    /// Monitor script running.
    Running,
    /// Stopped. A monitor cannot be restarted.
    Stopped,
}

/// Supervises one run of the external resource monitor script.
///
/// # Example
///
/// ```ignore
/// let mut monitor = ResourceMonitor::new(MonitorSettings::new("resource_monitor.sh", "/tmp"));
/// monitor.run()?;
/// // ... run the benchmark ...
/// monitor.stop().await?;
/// let series = monitor.get_measurements()?;
/// ```
pub struct ResourceMonitor {
    launcher: PathBuf,
    pid_file: PathBuf,
    frequency: f64,
    fields: FieldSpec,
    state: MonitorState,
    queue: Option<mpsc::UnboundedReceiver<String>>,
    worker: Option<JoinHandle<Result<ExitStatus>>>,
    series: Measurements,
}

impl ResourceMonitor {
    /// Create a monitor. Nothing is started until [`run`](Self::run).
    pub fn new(settings: MonitorSettings) -> Self {
        let series = settings.fields.empty_measurements();
        Self {
            launcher: settings.launcher,
            pid_file: settings.pid_folder.join(PID_FILE_NAME),
            frequency: settings.frequency,
            fields: settings.fields,
            state: MonitorState::Idle,
            queue: None,
            worker: None,
            series,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn fields(&self) -> &FieldSpec {
        &self.fields
    }

    /// Start the monitor script and the worker forwarding its output.
    ///
    /// The pid file is truncated rather than removed, since benchmarks may
    /// run in containers that share it with the host. Must be called from
    /// within a Tokio runtime.
    pub fn run(&mut self) -> Result<()> {
        if self.state != MonitorState::Idle {
            return Err(MonitorError::InvalidState {
                operation: "run",
                state: self.state,
            });
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(MonitorError::NoRuntime);
        }

        std::fs::File::create(&self.pid_file).map_err(|source| MonitorError::PidFile {
            path: self.pid_file.clone(),
            source,
        })?;

        let child = Command::new(&self.launcher)
            .arg(&self.pid_file)
            .arg("")
            .arg(format!("{:?}", self.frequency))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MonitorError::Spawn {
                launcher: self.launcher.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.queue = Some(rx);
        self.worker = Some(tokio::spawn(forward_output(child, tx)));
        self.state = MonitorState::Running;

        info!(
            launcher = %self.launcher.display(),
            pid_file = %self.pid_file.display(),
            frequency = self.frequency,
            "Resource monitor started"
        );

        Ok(())
    }

    /// Decode every sample queued so far and return all series.
    ///
    /// Never waits for new samples. Series accumulate across calls. A
    /// sample that does not fit the field spec is dropped and reported as
    /// an error; samples decoded before it are kept.
    pub fn get_measurements(&mut self) -> Result<Measurements> {
        if let Some(queue) = self.queue.as_mut() {
            loop {
                let line = match queue.try_recv() {
                    Ok(line) => line,
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                };

                for (name, entry) in self.fields.decode_line(&line)? {
                    self.series.entry(name.to_string()).or_default().push(entry);
                }
            }
        }

        Ok(self.series.clone())
    }

    /// Ask the monitor script to exit and wait for it.
    ///
    /// Writes the exit sentinel into the pid file, waits for the worker to
    /// read the remaining output and for the script to exit, then removes
    /// the pid file. Blocks for as long as the script ignores the sentinel.
    ///
    /// If the sentinel cannot be written the monitor stays running and
    /// `stop` may be called again. A worker failure is reported only after
    /// the pid file has been removed.
    pub async fn stop(&mut self) -> Result<ExitStatus> {
        if self.state != MonitorState::Running {
            return Err(MonitorError::InvalidState {
                operation: "stop",
                state: self.state,
            });
        }

        tokio::fs::write(&self.pid_file, EXIT_SENTINEL)
            .await
            .map_err(|source| MonitorError::PidFile {
                path: self.pid_file.clone(),
                source,
            })?;
        self.state = MonitorState::Stopped;

        let outcome = match self.worker.take() {
            Some(worker) => worker
                .await
                .map_err(|e| MonitorError::Worker(e.to_string()))
                .and_then(|result| result),
            None => Err(MonitorError::Worker("worker handle missing".to_string())),
        };

        self.remove_pid_file().await;

        let status = outcome?;
        info!(status = %status, "Resource monitor stopped");
        Ok(status)
    }

    async fn remove_pid_file(&self) {
        match tokio::fs::remove_file(&self.pid_file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                pid_file = %self.pid_file.display(),
                error = %e,
                "Failed to remove pid file"
            ),
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        if self.state == MonitorState::Running {
            warn!("Resource monitor dropped while running, requesting exit");
            if let Err(e) = std::fs::write(&self.pid_file, EXIT_SENTINEL) {
                warn!(error = %e, "Failed to write exit sentinel");
            }
        }
    }
}

/// Forward the child's output lines into `queue` until both streams end
/// and the child exits. The worker owns the only sender, so the queue is
/// closed once this returns.
async fn forward_output(
    mut child: Child,
    queue: mpsc::UnboundedSender<String>,
) -> Result<ExitStatus> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MonitorError::Worker("stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MonitorError::Worker("stderr not captured".to_string()))?;

    let mut stdout = BufReader::new(stdout);
    let mut stderr = BufReader::new(stderr);
    let (mut stdout_buf, mut stderr_buf) = (Vec::new(), Vec::new());
    let (mut stdout_open, mut stderr_open) = (true, true);
    let mut forwarded = 0usize;

    while stdout_open || stderr_open {
        let line = tokio::select! {
            line = next_line(&mut stdout, &mut stdout_buf), if stdout_open => {
                let line = line.map_err(MonitorError::Stream)?;
                stdout_open = line.is_some();
                line
            }
            line = next_line(&mut stderr, &mut stderr_buf), if stderr_open => {
                let line = line.map_err(MonitorError::Stream)?;
                stderr_open = line.is_some();
                line
            }
        };

        let Some(line) = line else { continue };
        let sample = line.trim();
        if sample.is_empty() {
            continue;
        }
        if queue.send(sample.to_string()).is_err() {
            debug!("Measurement queue closed, discarding sample");
        } else {
            forwarded += 1;
        }
    }

    let status = child.wait().await.map_err(MonitorError::Stream)?;
    debug!(status = %status, samples = forwarded, "Resource monitor exited");

    Ok(status)
}

/// Read one line, replacing invalid UTF-8. Bytes of a line interrupted by
/// the other stream stay in `buf` until the next call.
async fn next_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }

    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_monitor_is_idle() {
        let monitor = ResourceMonitor::new(MonitorSettings::new("monitor.sh", "/tmp/bench"));

        assert_eq!(monitor.state(), MonitorState::Idle);
        assert_eq!(monitor.pid_file(), Path::new("/tmp/bench/proc.pid"));
    }

    #[test]
    fn test_measurements_before_run_are_empty() {
        let fields = FieldSpec::parse("a:int:0,b:float:1").unwrap();
        let mut monitor =
            ResourceMonitor::new(MonitorSettings::new("monitor.sh", "/tmp").with_fields(fields));

        let measurements = monitor.get_measurements().unwrap();
        assert_eq!(measurements.len(), 2);
        assert!(measurements["a"].is_empty());
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let mut monitor = ResourceMonitor::new(MonitorSettings::new("monitor.sh", "/tmp"));
        assert!(matches!(
            monitor.stop().await,
            Err(MonitorError::InvalidState {
                operation: "stop",
                state: MonitorState::Idle
            })
        ));
    }

    #[test]
    fn test_run_outside_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = ResourceMonitor::new(MonitorSettings::new("monitor.sh", dir.path()));

        assert!(matches!(monitor.run(), Err(MonitorError::NoRuntime)));
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert!(!monitor.pid_file().exists());
    }

    #[tokio::test]
    async fn test_next_line_replaces_invalid_utf8() {
        let mut reader: &[u8] = b"1\n\xff\xfe bad\n2";
        let mut buf = Vec::new();

        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("1\n"));
        assert_eq!(
            next_line(&mut reader, &mut buf).await.unwrap().as_deref(),
            Some("\u{fffd}\u{fffd} bad\n")
        );
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("2"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = ResourceMonitor::new(MonitorSettings::new(
            dir.path().join("no_such_monitor.sh"),
            dir.path(),
        ));

        assert!(matches!(monitor.run(), Err(MonitorError::Spawn { .. })));
        assert_eq!(monitor.state(), MonitorState::Idle);
    }
}
