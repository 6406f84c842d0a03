//! Optional capability detection.
//!
//! Capabilities are probed once at startup and handed to whatever needs
//! them. A missing capability is logged and disables the dependent
//! functionality instead of failing the run.

use std::path::Path;

/// Optional capabilities available to this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The resource monitor launcher exists and can be executed.
    pub monitor: bool,
}

impl Capabilities {
    /// Probe the environment.
    ///
    /// `launcher` is the resource monitor script; `None` means monitoring
    /// was not requested and the capability is reported as absent without
    /// a warning.
    pub fn probe(launcher: Option<&Path>) -> Self {
        let monitor = match launcher {
            Some(path) => {
                let available = is_executable(path);
                if !available {
                    tracing::warn!(
                        launcher = %path.display(),
                        "Resource monitor launcher is not available, resource usage will not be recorded"
                    );
                }
                available
            }
            None => false,
        };

        Self { monitor }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_launcher() {
        assert!(!Capabilities::probe(None).monitor);
    }

    #[test]
    fn test_missing_launcher() {
        let caps = Capabilities::probe(Some(Path::new("/nonexistent/monitor.sh")));
        assert!(!caps.monitor);
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_launcher() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("monitor.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        assert!(!Capabilities::probe(Some(script.as_path())).monitor);

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(Capabilities::probe(Some(script.as_path())).monitor);
    }
}
