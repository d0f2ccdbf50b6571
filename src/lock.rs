//! Lock-conflict resolution
//!
//! A live browser holds its cookie store open; SQLite surfaces that as a
//! busy or locked error. When the caller opts in with `force`, the owning
//! processes are terminated, the read retries once, and the browser is
//! relaunched detached afterwards.

use std::time::Duration;

use crate::config::Browser;
use crate::platform::{process, Platform};

/// Grace period for the kernel to release file handles after a kill.
const HANDLE_RELEASE_DELAY: Duration = Duration::from_millis(300);

/// Decision reported back to the strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockResolution {
    /// The conflict was cleared; retry the read once.
    pub resolved: bool,
    /// Relaunch the browser after the retry completes.
    pub should_relaunch: bool,
}

impl LockResolution {
    pub const DECLINED: LockResolution = LockResolution {
        resolved: false,
        should_relaunch: false,
    };
}

/// Try to clear a lock conflict on a browser's store.
pub async fn resolve(browser: Browser, platform: Platform, force: bool) -> LockResolution {
    let Some(name) = browser.process_name(platform) else {
        return LockResolution::DECLINED;
    };

    let pids = process::list_matching(name);
    if pids.is_empty() {
        // Nothing of ours is running; the lock belongs to someone else
        // (backup tool, another extractor) and a plain retry may work.
        log::debug!("No {} process found despite the locked store", browser);
        return LockResolution {
            resolved: true,
            should_relaunch: false,
        };
    }

    if !force {
        log::warn!(
            "{} is running and holds its cookie store; re-run with force to close it",
            browser
        );
        return LockResolution::DECLINED;
    }

    let mut killed = 0usize;
    for pid in &pids {
        match process::kill(*pid) {
            Ok(()) => killed += 1,
            Err(err) => log::warn!("Failed to stop {} (pid {}): {}", browser, pid, err),
        }
    }
    if killed == 0 {
        return LockResolution::DECLINED;
    }

    log::info!("Stopped {} {} process(es) to release the store", killed, browser);
    tokio::time::sleep(HANDLE_RELEASE_DELAY).await;
    LockResolution {
        resolved: true,
        should_relaunch: true,
    }
}

/// Bring the browser back after a forced close.
pub fn relaunch(browser: Browser, platform: Platform) {
    let Some(name) = browser.process_name(platform) else {
        return;
    };
    match process::spawn_detached(name) {
        Ok(()) => log::info!("Relaunched {}", browser),
        Err(err) => log::warn!("Failed to relaunch {}: {}", browser, err),
    }
}
