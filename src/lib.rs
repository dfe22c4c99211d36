/*
 * An open dialog that lets the user pick files and folders in one
 * multi-selection. The stock Win32 common open dialog only returns one kind
 * at a time; this crate patches the live dialog instead: it hides the
 * filename row and the native ok button, adds a custom validation button in
 * the ok button's place, keeps it there through resizes with a message hook,
 * and validates every accept attempt against a pluggable policy.
 *
 * The coordination logic (control lookup, layout patching, hook lifetime,
 * selection validation, dialog sessions) is portable and runs against the
 * `WindowManager`/`NativeFileDialog` seams, so it builds and tests on every
 * platform. The Win32 implementation of those seams lives in `win32` and is
 * only compiled on Windows.
 */
pub mod dialog;
pub mod error;
pub mod layout_patcher;
pub mod message_hook;
pub mod selection;
pub mod types;
pub mod validator;
#[cfg(target_os = "windows")]
pub mod win32;
pub mod window_enumerator;
pub mod window_manager;

#[cfg(test)]
pub(crate) mod test_support;

pub use dialog::{DialogEvents, DialogFactory, NativeFileDialog, OpenFileOrFolderDialog};
pub use error::{PlatformError, Result as PlatformResult};
pub use layout_patcher::{ControlLabeler, DialogLayoutPatcher, LayoutState};
pub use message_hook::{HookRegistry, InstalledHook, MessageHookController};
pub use selection::{
    DefaultSelectionPolicy, LinkDereferencePolicy, SelectionItem, SelectionItemRef,
    SelectionValidationHandler, SelectionVerdict, ShortcutDereference, ValidationOutcome,
};
pub use types::{
    DialogConfig, DialogLabel, DialogOutcome, MessageRecord, Point, Rect, RepaintPolicy,
    Visibility, WindowHandle, WindowMessage,
};
pub use validator::{AcceptContext, AcceptDecision, SelectionValidator};
#[cfg(target_os = "windows")]
pub use win32::{
    ShellItem, Win32DialogFactory, Win32FileDialog, Win32WindowManager,
    open_file_or_folder_dialog,
};
pub use window_enumerator::{ChildWindowQuery, ChildWindows};
pub use window_manager::{HookCallback, HookToken, WindowManager};
