/*
 * Error type shared by the portable dialog logic and the Win32 backend.
 * Only wiring failures travel through this type: unresolvable dialog
 * controls, a hook that cannot be installed, a native dialog that refuses to
 * be created. Per-item selection problems never become `PlatformError`s; the
 * validation policy folds them into its verdict instead.
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// Required dialog controls that could not be located. Resolution is
    /// all-or-nothing, so every missing control is listed at once.
    #[error("could not find the dialog child controls: {}", .0.join(", "))]
    ControlsNotFound(Vec<&'static str>),

    #[error("message hook installation failed: {0}")]
    HookInstallFailed(String),

    #[error("no validated selection is available")]
    NoSelectionAvailable,

    #[cfg(target_os = "windows")]
    #[error(transparent)]
    Win32(#[from] windows::core::Error),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
