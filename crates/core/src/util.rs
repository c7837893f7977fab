use std::path::PathBuf;

/// Home directory of the current user, from `$HOME`.
///
/// Falls back to the current directory when `$HOME` is unset or empty.
pub fn home_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(h) if !h.is_empty() => PathBuf::from(h),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Default snapshot root, `<home>/mgosd/`.
pub fn default_output_dir() -> PathBuf {
    home_dir().join("mgosd")
}
