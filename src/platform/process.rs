//! Process enumeration, termination, and detached relaunch
//!
//! Used by the lock handler when a live browser holds a cookie store. All
//! operations go through the standard OS tools so no elevated privileges or
//! extra bindings are needed.

use std::process::{Command, Stdio};

use crate::error::{CrumbError, Result};

/// List PIDs whose executable name matches `name` exactly.
///
/// Enumeration failures are logged and yield an empty list; the caller
/// treats that as "nothing is holding the store".
pub fn list_matching(name: &str) -> Vec<u32> {
    #[cfg(unix)]
    {
        let output = match Command::new("pgrep").args(["-x", name]).output() {
            Ok(output) => output,
            Err(err) => {
                log::warn!("pgrep failed: {}", err);
                return Vec::new();
            }
        };
        // pgrep exits 1 when nothing matched.
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .collect()
    }

    #[cfg(windows)]
    {
        let filter = format!("IMAGENAME eq {}", name);
        let output = match Command::new("tasklist")
            .args(["/FO", "CSV", "/NH", "/FI", &filter])
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                log::warn!("tasklist failed: {}", err);
                return Vec::new();
            }
        };
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| {
                let mut fields = line.split("\",\"");
                let _image = fields.next()?;
                fields.next()?.trim_matches('"').parse::<u32>().ok()
            })
            .collect()
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = name;
        Vec::new()
    }
}

/// Terminate a process by PID.
pub fn kill(pid: u32) -> Result<()> {
    #[cfg(unix)]
    let status = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status();

    #[cfg(windows)]
    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status();

    #[cfg(not(any(unix, windows)))]
    let status: std::io::Result<std::process::ExitStatus> = Err(std::io::Error::other(
        "process control is unavailable on this platform",
    ));

    let status = status
        .map_err(|e| CrumbError::CookieExtraction(format!("Failed to signal pid {}: {}", pid, e)))?;
    if !status.success() {
        return Err(CrumbError::CookieExtraction(format!(
            "Kill of pid {} exited with status {}",
            pid,
            status.code().unwrap_or(-1)
        )));
    }
    Ok(())
}

/// Relaunch an application detached from this process.
pub fn spawn_detached(name: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let spawned = Command::new("open")
        .args(["-a", name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    #[cfg(all(unix, not(target_os = "macos")))]
    let spawned = Command::new(name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    #[cfg(windows)]
    let spawned = Command::new("cmd")
        .args(["/C", "start", "", name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    #[cfg(not(any(unix, windows)))]
    let spawned: std::io::Result<std::process::Child> = Err(std::io::Error::other(
        "process control is unavailable on this platform",
    ));

    spawned
        .map(|_child| ())
        .map_err(|e| CrumbError::CookieExtraction(format!("Failed to relaunch {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::list_matching;

    #[test]
    fn list_matching_handles_unknown_names() {
        assert!(list_matching("no-such-process-crumb").is_empty());
    }
}
