//! macOS keychain access
//!
//! The master passphrase for a Chromium-family browser lives in the login
//! keychain under the service name "<Product> Safe Storage". The system
//! `security` tool is the sanctioned way to read it without linking against
//! the keychain ACL prompt machinery.

use std::process::Command;

use crate::error::{CrumbError, Result};

const CHROME_SERVICE: &str = "Chrome Safe Storage";

/// Read a generic password from the login keychain.
///
/// Derivative browsers occasionally reuse Chrome's entry instead of writing
/// their own, so a miss on any other service retries once against
/// `"Chrome Safe Storage"`.
pub fn read_keychain_secret(service: &str) -> Result<String> {
    match query_security_tool(service) {
        Ok(secret) => Ok(secret),
        Err(err) if service != CHROME_SERVICE => {
            log::debug!(
                "keychain miss for service {:?}, retrying with {:?}: {}",
                service,
                CHROME_SERVICE,
                err
            );
            query_security_tool(CHROME_SERVICE)
        }
        Err(err) => Err(err),
    }
}

fn query_security_tool(service: &str) -> Result<String> {
    let output = Command::new("security")
        .args(["find-generic-password", "-w", "-s", service])
        .output()
        .map_err(|e| {
            CrumbError::SecretUnavailable(format!("Failed to run security tool: {}", e))
        })?;

    if !output.status.success() {
        return Err(CrumbError::SecretUnavailable(format!(
            "Keychain has no entry for service {:?} (status {})",
            service,
            output.status.code().unwrap_or(-1)
        )));
    }

    let passphrase = String::from_utf8_lossy(&output.stdout)
        .trim_end_matches(['\r', '\n'])
        .to_string();
    if passphrase.is_empty() {
        return Err(CrumbError::SecretUnavailable(format!(
            "Keychain entry for service {:?} is empty",
            service
        )));
    }
    Ok(passphrase)
}
