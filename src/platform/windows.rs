//! Windows DPAPI key retrieval
//!
//! Chromium on Windows wraps a random 32-byte AES key with the per-user
//! data-protection API and stores it base64-encoded in the profile's
//! `Local State` JSON under `os_crypt.encrypted_key`, prefixed with the
//! ASCII bytes `DPAPI`.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use winapi::um::dpapi::CryptUnprotectData;
use winapi::um::winbase::LocalFree;
use winapi::um::wincrypt::DATA_BLOB;

use crate::error::{CrumbError, Result};

const DPAPI_PREFIX: &[u8] = b"DPAPI";
const MASTER_KEY_LEN: usize = 32;

/// Read and unwrap the AES-256 master key from a product's `Local State`.
pub fn read_local_state_key(user_data_dir: &Path) -> Result<[u8; MASTER_KEY_LEN]> {
    let local_state_path = user_data_dir.join("Local State");
    let data = fs::read_to_string(&local_state_path).map_err(|e| {
        CrumbError::SecretUnavailable(format!(
            "Failed to read {:?}: {}",
            local_state_path, e
        ))
    })?;

    let json: serde_json::Value = serde_json::from_str(&data)?;
    let encrypted_key = json
        .get("os_crypt")
        .and_then(|v| v.get("encrypted_key"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            CrumbError::SecretUnavailable(format!(
                "{:?} has no os_crypt.encrypted_key",
                local_state_path
            ))
        })?;

    let wrapped = STANDARD.decode(encrypted_key).map_err(|e| {
        CrumbError::SecretUnavailable(format!("Invalid encrypted_key base64: {}", e))
    })?;
    let wrapped = wrapped.strip_prefix(DPAPI_PREFIX).ok_or_else(|| {
        CrumbError::SecretUnavailable("encrypted_key is missing the DPAPI prefix".to_string())
    })?;

    let key = dpapi_unprotect(wrapped)?;
    key.as_slice().try_into().map_err(|_| {
        CrumbError::SecretUnavailable(format!(
            "DPAPI unwrapped key has length {}, expected {}",
            key.len(),
            MASTER_KEY_LEN
        ))
    })
}

/// Unprotect a blob with the current user's DPAPI scope.
pub fn dpapi_unprotect(ciphertext: &[u8]) -> Result<Vec<u8>> {
    unsafe {
        let mut in_blob = DATA_BLOB {
            cbData: ciphertext.len() as u32,
            pbData: ciphertext.as_ptr() as *mut u8,
        };
        let mut out_blob = DATA_BLOB {
            cbData: 0,
            pbData: std::ptr::null_mut(),
        };

        let result = CryptUnprotectData(
            &mut in_blob,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
            &mut out_blob,
        );
        if result == 0 {
            return Err(CrumbError::SecretUnavailable(
                "CryptUnprotectData rejected the key blob".to_string(),
            ));
        }

        let data = std::slice::from_raw_parts(out_blob.pbData, out_blob.cbData as usize).to_vec();
        LocalFree(out_blob.pbData as *mut _);
        Ok(data)
    }
}
