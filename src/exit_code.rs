use crate::error::CrumbError;

/// Process exit status: 0 means at least one record was found, 1 means the
/// query ran but matched nothing, 2 is a usage error, anything above is a
/// fatal failure.
pub const FOUND: i32 = 0;
pub const NO_RECORDS: i32 = 1;
pub const USAGE: i32 = 2;

pub fn exit_code_for_error(err: &CrumbError) -> i32 {
    match err {
        CrumbError::Config(_) | CrumbError::InvalidUrl(_) => USAGE,
        CrumbError::Unsupported(_) => 3,
        CrumbError::SecretUnavailable(_) => 4,
        CrumbError::StoreLocked(_) => 5,
        CrumbError::CookieExtraction(_) => 6,
        CrumbError::DecryptionFailed(_) | CrumbError::BadLength(_) => 7,
        CrumbError::InvalidTimestamp(_) => 8,
        CrumbError::BinaryParsing { .. } => 9,
        CrumbError::FileNotFound(_) => 10,
        CrumbError::Io(_) => 11,
        CrumbError::Sqlite(_) => 12,
        CrumbError::Json(_) => 13,
    }
}
