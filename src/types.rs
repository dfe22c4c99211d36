/*
 * Platform-agnostic value types used across the crate: opaque window handles,
 * screen/dialog geometry, the subset of window messages the layout patcher
 * reacts to, and the user-facing dialog configuration. Nothing in here
 * touches Win32, so the logic built on these types is testable everywhere.
 */

use std::fmt;

/// Opaque native window handle. The crate never owns the window behind it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowHandle({:#x})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Edge-based rectangle, same layout as a Win32 `RECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

// Raw message identifiers, identical to the WM_* values in winuser.h.
pub const WM_DESTROY: u32 = 0x0002;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_PAINT: u32 = 0x000F;
pub const WM_SHOWWINDOW: u32 = 0x0018;
pub const WM_NCPAINT: u32 = 0x0085;

/// Window messages the layout patcher distinguishes. Everything else is
/// carried as `Other` and only passed along the hook chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMessage {
    Destroy,
    Size,
    ShowWindow,
    Paint,
    NcPaint,
    Other(u32),
}

impl WindowMessage {
    pub fn from_raw(msg: u32) -> Self {
        match msg {
            WM_DESTROY => WindowMessage::Destroy,
            WM_SIZE => WindowMessage::Size,
            WM_SHOWWINDOW => WindowMessage::ShowWindow,
            WM_PAINT => WindowMessage::Paint,
            WM_NCPAINT => WindowMessage::NcPaint,
            other => WindowMessage::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            WindowMessage::Destroy => WM_DESTROY,
            WindowMessage::Size => WM_SIZE,
            WindowMessage::ShowWindow => WM_SHOWWINDOW,
            WindowMessage::Paint => WM_PAINT,
            WindowMessage::NcPaint => WM_NCPAINT,
            WindowMessage::Other(raw) => raw,
        }
    }
}

/// One message observed by a message hook after the target window
/// procedure has processed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRecord {
    pub hwnd: WindowHandle,
    pub message: WindowMessage,
    pub wparam: usize,
    pub lparam: isize,
    pub lresult: isize,
}

impl MessageRecord {
    pub fn new(hwnd: WindowHandle, message: WindowMessage) -> Self {
        Self {
            hwnd,
            message,
            wparam: 0,
            lparam: 0,
            lresult: 0,
        }
    }
}

/// Visibility change applied together with a reposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Unchanged,
    Hide,
}

/// Labels of the native dialog that can be overridden through its host API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogLabel {
    OkButton,
    CancelButton,
    FileNameLabel,
    CustomValidationButton,
}

/// Controls when the custom validation button is pushed back into place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepaintPolicy {
    /// Reposition on every paint and non-client paint, even without a
    /// preceding resize. Survives layout passes that never send WM_SIZE.
    #[default]
    EveryPaint,
    /// Reposition only on the first paint after a size/show recomputation.
    AfterResize,
}

pub const DEFAULT_OK_BUTTON_TEXT: &str = "Open";
pub const DEFAULT_INVALID_SELECTION_MESSAGE: &str = "Invalid selection!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogConfig {
    pub title: Option<String>,
    /// Text of the custom validation button that stands in for the ok button.
    pub ok_button_text: String,
    /// `None` keeps the native cancel label.
    pub cancel_button_text: Option<String>,
    pub invalid_selection_message: Option<String>,
    /// Register `DefaultSelectionPolicy` as the validation handler.
    pub use_default_validation: bool,
    pub repaint_policy: RepaintPolicy,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            title: None,
            ok_button_text: DEFAULT_OK_BUTTON_TEXT.to_string(),
            cancel_button_text: None,
            invalid_selection_message: None,
            use_default_validation: true,
            repaint_policy: RepaintPolicy::default(),
        }
    }
}

impl DialogConfig {
    pub fn invalid_selection_message(&self) -> &str {
        self.invalid_selection_message
            .as_deref()
            .unwrap_or(DEFAULT_INVALID_SELECTION_MESSAGE)
    }
}

/// How a `show` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Accepted,
    Cancelled,
}
