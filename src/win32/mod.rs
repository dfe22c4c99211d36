/*
 * Win32 backend. Implements the crate's seams (`WindowManager`,
 * `NativeFileDialog`, `DialogFactory`, `SelectionItem`) on top of the real
 * shell dialog, user32 window APIs and shell items. Everything here is
 * thread-affine: the dialog, its hook and its items belong to the STA thread
 * that created them.
 */

mod file_dialog;
mod shell_item;
mod window_manager;

pub use file_dialog::{Win32DialogFactory, Win32FileDialog};
pub use shell_item::ShellItem;
pub use window_manager::Win32WindowManager;

use crate::dialog::OpenFileOrFolderDialog;
use crate::types::{DialogConfig, WindowHandle};

use std::ffi::c_void;
use std::rc::Rc;
use windows::Win32::Foundation::HWND;
use windows::core::{HSTRING, PCWSTR};

pub(crate) fn hwnd_from_handle(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

pub(crate) fn handle_from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

/// Borrows `text` as a wide string pointer; `None` becomes a null pointer.
pub(crate) fn optional_pcwstr(text: &Option<HSTRING>) -> PCWSTR {
    text.as_ref()
        .map_or(PCWSTR::null(), |text| PCWSTR(text.as_ptr()))
}

/// Builds a dialog wired to the native shell dialog and window manager.
/// COM must already be initialized (apartment-threaded) on this thread.
pub fn open_file_or_folder_dialog(
    config: DialogConfig,
) -> OpenFileOrFolderDialog<Win32DialogFactory> {
    OpenFileOrFolderDialog::new(
        config,
        Win32DialogFactory::new(),
        Rc::new(Win32WindowManager::new()),
    )
}
