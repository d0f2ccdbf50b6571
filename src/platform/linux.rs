//! Linux keyring access
//!
//! Chromium on Linux stores its master passphrase in the session secret
//! service when one is running, with KWallet as the desktop alternative.
//! Installations without either encrypt with the fixed passphrase
//! `"peanuts"`, which is kept here verbatim for compatibility.

use std::process::Command;

use secret_service::blocking::SecretService;
use secret_service::EncryptionType;

use crate::error::Result;

const FALLBACK_PASSPHRASE: &str = "peanuts";

/// Attribute values Chromium tags its secret-service item with.
const SECRET_SERVICE_APPLICATIONS: &[&str] = &["chrome", "chrome-libsecret-password-v2"];

/// Obtain the master passphrase for a Chromium-family product.
///
/// Lookup order: session secret service, `kwallet-query`, fixed fallback.
/// This never fails; the fallback passphrase is always available.
pub fn read_keyring_passphrase(label: &str) -> Result<String> {
    if let Some(secret) = secret_service_passphrase(label) {
        return Ok(secret);
    }
    if let Some(secret) = kwallet_passphrase(label) {
        return Ok(secret);
    }
    log::warn!(
        "No keyring entry for {:?}; falling back to the fixed passphrase",
        label
    );
    Ok(FALLBACK_PASSPHRASE.to_string())
}

fn secret_service_passphrase(label: &str) -> Option<String> {
    let service = match SecretService::connect(EncryptionType::Dh) {
        Ok(service) => service,
        Err(err) => {
            log::debug!("Failed to connect to secret service: {}", err);
            return None;
        }
    };

    let collection = service
        .get_default_collection()
        .or_else(|_| service.get_any_collection());
    let collection = match collection {
        Ok(collection) => collection,
        Err(err) => {
            log::debug!("Failed to open keyring collection: {}", err);
            return None;
        }
    };

    let items = match collection.get_all_items() {
        Ok(items) => items,
        Err(err) => {
            log::debug!("Failed to list keyring items: {}", err);
            return None;
        }
    };

    let wanted_label = format!("{} Safe Storage", label);
    for item in items {
        let attributes = item.get_attributes().unwrap_or_default();
        let application_matches = attributes
            .get("application")
            .map(|a| SECRET_SERVICE_APPLICATIONS.contains(&a.as_str()))
            .unwrap_or(false);
        let label_matches = item
            .get_label()
            .map(|l| l == wanted_label)
            .unwrap_or(false);
        if !application_matches && !label_matches {
            continue;
        }

        if item.is_locked().unwrap_or(false) {
            if let Err(err) = item.unlock() {
                log::debug!("Failed to unlock keyring item: {}", err);
                continue;
            }
        }
        match item.get_secret() {
            Ok(secret) if !secret.is_empty() => {
                return Some(String::from_utf8_lossy(&secret).into_owned());
            }
            Ok(_) => continue,
            Err(err) => {
                log::debug!("Failed to read keyring secret: {}", err);
            }
        }
    }
    None
}

fn kwallet_passphrase(label: &str) -> Option<String> {
    let output = Command::new("kwallet-query")
        .args([
            "--read-password",
            &format!("{} Safe Storage", label),
            "--folder",
            &format!("{} Keys", label),
            "kdewallet",
        ])
        .output();

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            log::debug!("kwallet-query not usable: {}", err);
            return None;
        }
    };
    if !output.status.success() {
        log::debug!(
            "kwallet-query failed with status {}",
            output.status.code().unwrap_or(-1)
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let secret = stdout.trim_end_matches('\n');
    if secret.is_empty() || secret.to_lowercase().starts_with("failed to read") {
        return None;
    }
    Some(secret.to_string())
}
