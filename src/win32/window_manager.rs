/*
 * `WindowManager` over user32. Message hooks share one native
 * WH_CALLWNDPROCRET hook per thread: the first registration installs it, the
 * last unregistration removes it, and the hook procedure fans every message
 * out through `HookRegistry::dispatch`. The native chain
 * is always continued with `CallNextHookEx`, whatever the callbacks do.
 */

use super::{handle_from_hwnd, hwnd_from_handle, optional_pcwstr};
use crate::error::{PlatformError, Result as PlatformResult};
use crate::message_hook::HookRegistry;
use crate::types::{MessageRecord, Point, Rect, Visibility, WindowHandle, WindowMessage};
use crate::window_manager::{HookCallback, HookToken, WindowManager};

use std::cell::{Cell, RefCell};
use windows::Win32::{
    Foundation::{LPARAM, LRESULT, POINT, RECT, WPARAM},
    Graphics::Gdi::MapWindowPoints,
    System::Threading::GetCurrentThreadId,
    UI::WindowsAndMessaging::{
        CWPRETSTRUCT, CallNextHookEx, FindWindowExW, GetWindowRect, HC_ACTION, HHOOK,
        SWP_HIDEWINDOW, SWP_NOACTIVATE, SWP_NOSIZE, SWP_NOZORDER, SetWindowPos,
        SetWindowsHookExW, UnhookWindowsHookEx, WH_CALLWNDPROCRET,
    },
};
use windows::core::HSTRING;

thread_local! {
    static HOOK_REGISTRY: RefCell<HookRegistry> = RefCell::new(HookRegistry::new());
    static NATIVE_HOOK: Cell<Option<HHOOK>> = const { Cell::new(None) };
}

unsafe extern "system" fn call_wnd_ret_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 && lparam.0 != 0 {
        let info = unsafe { &*(lparam.0 as *const CWPRETSTRUCT) };
        let record = MessageRecord {
            hwnd: handle_from_hwnd(info.hwnd),
            message: WindowMessage::from_raw(info.message),
            wparam: info.wParam.0,
            lparam: info.lParam.0,
            lresult: info.lResult.0,
        };
        HOOK_REGISTRY.with(|registry| HookRegistry::dispatch(registry, &record));
    }
    unsafe { CallNextHookEx(None, code, wparam, lparam) }
}

fn filter(text: Option<&str>) -> Option<HSTRING> {
    text.map(HSTRING::from)
}

#[derive(Debug, Default)]
pub struct Win32WindowManager;

impl Win32WindowManager {
    pub fn new() -> Self {
        Self
    }

    fn remove_native_hook_if_unused(&self) -> PlatformResult<()> {
        let unused = HOOK_REGISTRY.with(|registry| registry.borrow().is_empty());
        if !unused {
            return Ok(());
        }
        if let Some(hook) = NATIVE_HOOK.with(|native| native.take()) {
            unsafe { UnhookWindowsHookEx(hook)? };
            log::debug!("Win32WindowManager: Native message hook removed");
        }
        Ok(())
    }
}

impl WindowManager for Win32WindowManager {
    fn find_child(
        &self,
        parent: WindowHandle,
        after: Option<WindowHandle>,
        class_name: Option<&str>,
        title: Option<&str>,
    ) -> Option<WindowHandle> {
        let class_name = filter(class_name);
        let title = filter(title);
        let found = unsafe {
            FindWindowExW(
                Some(hwnd_from_handle(parent)),
                after.map(hwnd_from_handle),
                optional_pcwstr(&class_name),
                optional_pcwstr(&title),
            )
        };
        found
            .ok()
            .map(handle_from_hwnd)
            .filter(|handle| !handle.is_null())
    }

    fn window_rect(&self, hwnd: WindowHandle) -> PlatformResult<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd_from_handle(hwnd), &mut rect)? };
        Ok(Rect::new(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn map_rect_from_screen(&self, to: WindowHandle, rect: Rect) -> PlatformResult<Rect> {
        if to.is_null() {
            return Err(PlatformError::InvalidHandle(
                "cannot map into a null window".to_string(),
            ));
        }
        let mut points = [
            POINT {
                x: rect.left,
                y: rect.top,
            },
            POINT {
                x: rect.right,
                y: rect.bottom,
            },
        ];
        unsafe { MapWindowPoints(None, Some(hwnd_from_handle(to)), &mut points) };
        Ok(Rect::new(points[0].x, points[0].y, points[1].x, points[1].y))
    }

    fn set_window_position(
        &self,
        hwnd: WindowHandle,
        position: Point,
        visibility: Visibility,
    ) -> PlatformResult<()> {
        let mut flags = SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE;
        if visibility == Visibility::Hide {
            flags |= SWP_HIDEWINDOW;
        }
        unsafe {
            SetWindowPos(
                hwnd_from_handle(hwnd),
                None,
                position.x,
                position.y,
                0,
                0,
                flags,
            )?
        };
        Ok(())
    }

    fn current_thread_id(&self) -> u32 {
        unsafe { GetCurrentThreadId() }
    }

    fn install_message_hook(
        &self,
        thread_id: u32,
        callback: HookCallback,
    ) -> PlatformResult<HookToken> {
        if thread_id != self.current_thread_id() {
            return Err(PlatformError::HookInstallFailed(format!(
                "hooks can only be installed for the calling thread, not {thread_id}"
            )));
        }
        let token = HOOK_REGISTRY.with(|registry| registry.borrow_mut().register(callback));
        if NATIVE_HOOK.with(|native| native.get()).is_some() {
            return Ok(token);
        }

        match unsafe { SetWindowsHookExW(WH_CALLWNDPROCRET, Some(call_wnd_ret_proc), None, thread_id) } {
            Ok(hook) => {
                NATIVE_HOOK.with(|native| native.set(Some(hook)));
                log::debug!("Win32WindowManager: Native message hook installed on thread {thread_id}");
                Ok(token)
            }
            Err(err) => {
                HOOK_REGISTRY.with(|registry| registry.borrow_mut().unregister(token));
                Err(PlatformError::HookInstallFailed(err.to_string()))
            }
        }
    }

    fn uninstall_message_hook(&self, token: HookToken) -> PlatformResult<()> {
        let removed = HOOK_REGISTRY.with(|registry| registry.borrow_mut().unregister(token));
        if !removed {
            return Err(PlatformError::InvalidHandle(format!("unknown hook {token:?}")));
        }
        self.remove_native_hook_if_unused()
    }
}
