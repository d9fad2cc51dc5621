use anyhow::Error;
use paperless_search::prelude::PaperlessError;

/// Exit status for a failed command: 2 for rejected credentials or bad
/// settings, 1 for everything else.
pub fn exit_code(err: &Error) -> i32 {
    match err.downcast_ref::<PaperlessError>() {
        Some(PaperlessError::Config { .. }) => 2,
        Some(e) if e.is_auth_failure() => 2,
        _ => 1,
    }
}
