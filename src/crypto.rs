//! Cookie value decryption
//!
//! Chromium writes cookie values with a 3-byte version prefix selecting the
//! scheme: `v10` is AES-128-CBC with a PBKDF2-derived key on macOS and
//! Linux but AES-256-GCM with the DPAPI-unwrapped key on Windows; `v11` is
//! the Linux keyring variant of the CBC scheme. macOS values without a
//! version prefix predate encryption and pass through as UTF-8.
//!
//! All primitives take the key material as arguments so they stay testable
//! on every platform; only key acquisition is platform-gated.

use aes::Aes128;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;

use crate::error::{CrumbError, Result};
use crate::platform::Platform;
use crate::secrets::MasterSecret;

const KDF_SALT: &[u8] = b"saltysalt";
const KDF_ITERATIONS: u32 = 1003;
const CBC_KEY_LEN: usize = 16;
const CBC_IV: [u8; 16] = [b' '; 16];
const CBC_BLOCK_LEN: usize = 16;

const VERSION_PREFIX_LEN: usize = 3;
const GCM_NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

/// Length of the SHA-256 host-key digest prepended to plaintext by newer
/// Chromium stores.
const HASH_PREFIX_LEN: usize = 32;

/// Outcome of value recovery for one record.
///
/// `decrypted` is true only when a cipher produced the value; plaintext
/// passthrough and the raw fallback after a failure both report false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedValue {
    pub value: String,
    pub decrypted: bool,
}

/// Derive the AES-128-CBC key from a keystore passphrase.
pub fn derive_cbc_key(passphrase: &[u8]) -> [u8; CBC_KEY_LEN] {
    let mut key = [0u8; CBC_KEY_LEN];
    pbkdf2_hmac::<Sha1>(passphrase, KDF_SALT, KDF_ITERATIONS, &mut key);
    key
}

/// AES-128-CBC decryption of a value body (version prefix already
/// stripped).
pub fn decrypt_cbc(ciphertext: &[u8], key: &[u8; CBC_KEY_LEN], hash_prefixed: bool) -> Result<String> {
    if ciphertext.is_empty() || ciphertext.len() % CBC_BLOCK_LEN != 0 {
        return Err(CrumbError::BadLength(ciphertext.len()));
    }

    let mut buffer = ciphertext.to_vec();
    let decryptor = cbc::Decryptor::<Aes128>::new_from_slices(key, &CBC_IV)
        .map_err(|e| CrumbError::DecryptionFailed(format!("CBC init failed: {}", e)))?;
    let plaintext = decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| CrumbError::DecryptionFailed("CBC decryption failed".to_string()))?;

    let unpadded = pkcs7_unpad(plaintext)?;
    decode_plaintext(unpadded, hash_prefixed)
}

/// AES-256-GCM decryption of a Windows value body laid out as
/// `nonce[12] || ciphertext || tag[16]`.
pub fn decrypt_gcm(payload: &[u8], key: &[u8; 32], hash_prefixed: bool) -> Result<String> {
    if payload.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
        return Err(CrumbError::DecryptionFailed(format!(
            "GCM payload of {} bytes is truncated",
            payload.len()
        )));
    }

    let (nonce_bytes, ciphertext) = payload.split_at(GCM_NONCE_LEN);
    let nonce_array: [u8; GCM_NONCE_LEN] = nonce_bytes.try_into().expect("nonce length checked");
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CrumbError::DecryptionFailed(format!("GCM init failed: {}", e)))?;
    let plaintext = cipher
        .decrypt(&Nonce::from(nonce_array), ciphertext)
        .map_err(|_| {
            CrumbError::DecryptionFailed("GCM authentication tag mismatch".to_string())
        })?;

    decode_plaintext(&plaintext, hash_prefixed)
}

/// Recover the value of one Chromium record, never failing outward: any
/// error degrades to the raw bytes rendered as UTF-8 with
/// `decrypted = false`.
pub fn decrypt_chromium_value(
    raw: &[u8],
    secret: Option<&MasterSecret>,
    platform: Platform,
    hash_prefixed: bool,
) -> DecryptedValue {
    if raw.is_empty() {
        return raw_fallback(raw);
    }

    match attempt(raw, secret, platform, hash_prefixed) {
        Ok(Some(value)) => DecryptedValue {
            value,
            decrypted: true,
        },
        // Pre-v10 plaintext: the raw bytes are the value.
        Ok(None) => raw_fallback(raw),
        Err(err) => {
            log::warn!("Failed to decrypt cookie value: {}", err);
            raw_fallback(raw)
        }
    }
}

fn attempt(
    raw: &[u8],
    secret: Option<&MasterSecret>,
    platform: Platform,
    hash_prefixed: bool,
) -> Result<Option<String>> {
    let prefix = raw.get(..VERSION_PREFIX_LEN).unwrap_or(raw);
    let body = raw.get(VERSION_PREFIX_LEN..).unwrap_or_default();

    if prefix == b"v10" {
        return match platform {
            Platform::Windows => match secret {
                Some(MasterSecret::Key(key)) => decrypt_gcm(body, key, hash_prefixed).map(Some),
                _ => Err(CrumbError::SecretUnavailable(
                    "No DPAPI master key for this store".to_string(),
                )),
            },
            Platform::MacOs | Platform::Linux => match secret {
                Some(MasterSecret::Passphrase(passphrase)) => {
                    let key = derive_cbc_key(passphrase.as_bytes());
                    decrypt_cbc(body, &key, hash_prefixed).map(Some)
                }
                _ => Err(CrumbError::SecretUnavailable(
                    "No keystore passphrase for this store".to_string(),
                )),
            },
            Platform::Unsupported => Err(CrumbError::Unsupported(
                "Cannot decrypt on this platform".to_string(),
            )),
        };
    }

    if prefix == b"v11" && platform == Platform::Linux {
        return match secret {
            Some(MasterSecret::Passphrase(passphrase)) => {
                let key = derive_cbc_key(passphrase.as_bytes());
                decrypt_cbc(body, &key, hash_prefixed).map(Some)
            }
            _ => Err(CrumbError::SecretUnavailable(
                "No keystore passphrase for this store".to_string(),
            )),
        };
    }

    if platform == Platform::MacOs && !is_version_prefix(prefix) {
        return Ok(None);
    }

    if platform == Platform::Windows {
        return dpapi_direct(raw, hash_prefixed).map(Some);
    }

    Err(CrumbError::DecryptionFailed(format!(
        "Unknown value version prefix {:?}",
        String::from_utf8_lossy(prefix)
    )))
}

/// Pre-v10 Windows records are whole-value DPAPI blobs.
#[cfg(windows)]
fn dpapi_direct(raw: &[u8], hash_prefixed: bool) -> Result<String> {
    let plaintext = crate::platform::windows::dpapi_unprotect(raw)?;
    decode_plaintext(&plaintext, hash_prefixed)
}

#[cfg(not(windows))]
fn dpapi_direct(_raw: &[u8], _hash_prefixed: bool) -> Result<String> {
    Err(CrumbError::DecryptionFailed(
        "DPAPI is unavailable on this platform".to_string(),
    ))
}

fn is_version_prefix(prefix: &[u8]) -> bool {
    prefix.len() == VERSION_PREFIX_LEN
        && prefix[0] == b'v'
        && prefix[1].is_ascii_digit()
        && prefix[2].is_ascii_digit()
}

fn pkcs7_unpad(data: &[u8]) -> Result<&[u8]> {
    let pad = *data.last().ok_or_else(|| {
        CrumbError::DecryptionFailed("Decrypted value is empty".to_string())
    })? as usize;
    if pad == 0 || pad > CBC_BLOCK_LEN || pad > data.len() {
        return Err(CrumbError::DecryptionFailed(
            "Invalid PKCS7 padding".to_string(),
        ));
    }
    let (body, padding) = data.split_at(data.len() - pad);
    if padding.iter().any(|byte| *byte as usize != pad) {
        return Err(CrumbError::DecryptionFailed(
            "Invalid PKCS7 padding".to_string(),
        ));
    }
    Ok(body)
}

fn decode_plaintext(plaintext: &[u8], hash_prefixed: bool) -> Result<String> {
    let body = if hash_prefixed && plaintext.len() >= HASH_PREFIX_LEN {
        &plaintext[HASH_PREFIX_LEN..]
    } else {
        plaintext
    };
    let text = std::str::from_utf8(body).map_err(|_| {
        CrumbError::DecryptionFailed("Decrypted value is not valid UTF-8".to_string())
    })?;
    Ok(strip_framing(text).to_string())
}

/// A leading run of control bytes is transport framing, not value content.
/// Anything past it is preserved verbatim.
fn strip_framing(text: &str) -> &str {
    text.trim_start_matches(|c: char| (c as u32) < 0x20)
}

fn raw_fallback(raw: &[u8]) -> DecryptedValue {
    DecryptedValue {
        value: String::from_utf8_lossy(raw).into_owned(),
        decrypted: false,
    }
}

#[cfg(test)]
mod tests {
    use aes_gcm::aead::{Aead, KeyInit};
    use aes_gcm::{Aes256Gcm, Nonce};

    use super::{
        decrypt_cbc, decrypt_chromium_value, decrypt_gcm, derive_cbc_key, is_version_prefix,
        pkcs7_unpad,
    };
    use crate::error::CrumbError;
    use crate::platform::Platform;
    use crate::secrets::MasterSecret;

    const PASSPHRASE: &str = "lQd+BkD+nBhODek1xUUxXw==";
    const VALUE_YES_HEX: &str = "7631306F9A47D779AC548BFB0BCE013AE5D4232058813A58C91CC1D16A143FBA05721D0321E47244333D584128B2DFF4857467";
    const VALUE_XLG_HEX: &str = "7631306F9A47D779AC548BFB0BCE013AE5D4232058813A58C91CC1D16A143FBA05721DAB789B157290AE3D877BFDA7A9870E9D";

    fn unhex(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("hex"))
            .collect()
    }

    fn seal_gcm(key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8]) -> Vec<u8> {
        let cipher = Aes256Gcm::new_from_slice(key).expect("cipher");
        let mut payload = nonce.to_vec();
        payload.extend(cipher.encrypt(&Nonce::from(*nonce), plaintext).expect("seal"));
        payload
    }

    #[test]
    fn cbc_vectors_decrypt_with_derived_key() {
        let key = derive_cbc_key(PASSPHRASE.as_bytes());
        let value = unhex(VALUE_YES_HEX);
        assert_eq!(&value[..3], b"v10");
        assert_eq!(decrypt_cbc(&value[3..], &key, true).expect("decrypt"), "yes");

        let value = unhex(VALUE_XLG_HEX);
        assert_eq!(decrypt_cbc(&value[3..], &key, true).expect("decrypt"), "xlg");
    }

    #[test]
    fn cbc_rejects_non_block_multiple_ciphertext() {
        let key = derive_cbc_key(PASSPHRASE.as_bytes());
        let err = decrypt_cbc(&[0u8; 14], &key, false).expect_err("bad length");
        assert!(matches!(err, CrumbError::BadLength(14)));

        let err = decrypt_cbc(&[], &key, false).expect_err("empty");
        assert!(matches!(err, CrumbError::BadLength(0)));
    }

    #[test]
    fn gcm_round_trips_utf8_payloads() {
        let key = [0x42u8; 32];
        let nonce = [7u8; 12];
        let long = "x".repeat(4096 + 17);
        for plaintext in ["session_123456", "", long.as_str(), "währung-€-日本語"] {
            let payload = seal_gcm(&key, &nonce, plaintext.as_bytes());
            assert_eq!(
                decrypt_gcm(&payload, &key, false).expect("round trip"),
                plaintext
            );
        }
    }

    #[test]
    fn gcm_rejects_tampered_tag_and_truncation() {
        let key = [0x42u8; 32];
        let nonce = [9u8; 12];
        let mut payload = seal_gcm(&key, &nonce, b"session_123456");
        let last = payload.len() - 1;
        payload[last] ^= 0x01;
        assert!(matches!(
            decrypt_gcm(&payload, &key, false),
            Err(CrumbError::DecryptionFailed(_))
        ));

        assert!(matches!(
            decrypt_gcm(&[0u8; 20], &key, false),
            Err(CrumbError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn gcm_strips_hash_prefix_when_flagged() {
        let key = [0x11u8; 32];
        let nonce = [3u8; 12];
        let mut plaintext = vec![0xAB; 32];
        plaintext.extend_from_slice(b"tail");
        let payload = seal_gcm(&key, &nonce, &plaintext);
        assert_eq!(decrypt_gcm(&payload, &key, true).expect("decrypt"), "tail");
    }

    #[test]
    fn v10_value_decrypts_through_the_record_path() {
        let secret = MasterSecret::Passphrase(PASSPHRASE.to_string());
        let raw = unhex(VALUE_YES_HEX);
        for platform in [Platform::MacOs, Platform::Linux] {
            let out = decrypt_chromium_value(&raw, Some(&secret), platform, true);
            assert!(out.decrypted);
            assert_eq!(out.value, "yes");
        }
    }

    #[test]
    fn missing_secret_degrades_to_raw_fallback() {
        let raw = unhex(VALUE_YES_HEX);
        let out = decrypt_chromium_value(&raw, None, Platform::Linux, true);
        assert!(!out.decrypted);
        assert_eq!(out.value.as_bytes()[..3], *b"v10");
    }

    #[test]
    fn wrong_passphrase_degrades_to_raw_fallback() {
        let secret = MasterSecret::Passphrase("not the passphrase".to_string());
        let raw = unhex(VALUE_YES_HEX);
        let out = decrypt_chromium_value(&raw, Some(&secret), Platform::MacOs, true);
        assert!(!out.decrypted);
    }

    #[test]
    fn mac_plaintext_passthrough_keeps_bytes() {
        let out = decrypt_chromium_value(b"plain-session", None, Platform::MacOs, false);
        assert!(!out.decrypted);
        assert_eq!(out.value, "plain-session");
    }

    #[test]
    fn unknown_prefix_off_mac_is_a_fallback() {
        let out = decrypt_chromium_value(b"v99something", None, Platform::Linux, false);
        assert!(!out.decrypted);
        assert_eq!(out.value, "v99something");
    }

    #[test]
    fn version_prefix_detection() {
        assert!(is_version_prefix(b"v10"));
        assert!(is_version_prefix(b"v42"));
        assert!(!is_version_prefix(b"vXY"));
        assert!(!is_version_prefix(b"x10"));
        assert!(!is_version_prefix(b"v1"));
    }

    #[test]
    fn pkcs7_unpad_is_strict() {
        assert_eq!(pkcs7_unpad(&[b'a', b'b', 2, 2]).expect("unpad"), b"ab");
        assert!(pkcs7_unpad(&[b'a', b'b', 3, 2]).is_err());
        assert!(pkcs7_unpad(&[0u8; 4]).is_err());
    }

    #[test]
    fn framing_control_run_is_stripped() {
        let key = [0x21u8; 32];
        let nonce = [1u8; 12];
        let payload = seal_gcm(&key, &nonce, b"\x01\x02value");
        assert_eq!(decrypt_gcm(&payload, &key, false).expect("decrypt"), "value");

        let payload = seal_gcm(&key, &nonce, b"clean\x01middle");
        assert_eq!(
            decrypt_gcm(&payload, &key, false).expect("decrypt"),
            "clean\x01middle"
        );
    }
}
