/*
 * The window-manager seam. Everything the layout patcher needs from the OS
 * (child lookup, geometry query and mapping, repositioning, message hooks)
 * goes through `WindowManager`, so the patcher itself is plain Rust that can
 * be driven by a scripted fake in tests and by `win32::Win32WindowManager`
 * in production. All calls are synchronous and thread-affine.
 */

use crate::error::Result as PlatformResult;
use crate::types::{MessageRecord, Point, Rect, Visibility, WindowHandle};

use std::rc::Rc;

/// Callback invoked for every message seen by a message hook.
pub type HookCallback = Rc<dyn Fn(&MessageRecord)>;

/// Identifies one installed message hook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookToken(pub u64);

pub trait WindowManager {
    /*
     * Returns the next direct child of `parent` after `after` (or the first
     * child when `after` is `None`) whose class name and title match the
     * given filters. A `None` filter matches anything.
     */
    fn find_child(
        &self,
        parent: WindowHandle,
        after: Option<WindowHandle>,
        class_name: Option<&str>,
        title: Option<&str>,
    ) -> Option<WindowHandle>;

    /// Window rectangle in screen coordinates.
    fn window_rect(&self, hwnd: WindowHandle) -> PlatformResult<Rect>;

    /// Maps a screen-coordinate rectangle into the client coordinates of `to`.
    fn map_rect_from_screen(&self, to: WindowHandle, rect: Rect) -> PlatformResult<Rect>;

    /// Moves `hwnd` without resizing it or changing its Z-order.
    fn set_window_position(
        &self,
        hwnd: WindowHandle,
        position: Point,
        visibility: Visibility,
    ) -> PlatformResult<()>;

    fn current_thread_id(&self) -> u32;

    /*
     * Registers `callback` on the post-processing message stream of
     * `thread_id`. The implementation must keep forwarding every message to
     * the next hook in the native chain regardless of what the callback does.
     */
    fn install_message_hook(&self, thread_id: u32, callback: HookCallback)
    -> PlatformResult<HookToken>;

    fn uninstall_message_hook(&self, token: HookToken) -> PlatformResult<()>;
}
