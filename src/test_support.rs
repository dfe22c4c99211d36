/*
 * In-memory stand-ins for the native collaborators, used by the unit tests
 * of every module: a scripted window manager with a child-window tree and
 * hook bookkeeping, selection items with configurable capabilities, and a
 * native dialog that records what the session asks of it.
 */

use crate::dialog::{DialogEvents, DialogFactory, NativeFileDialog};
use crate::error::{PlatformError, Result as PlatformResult};
use crate::layout_patcher::{
    BUTTON_CLASS, CANCEL_BUTTON_SENTINEL, CUSTOM_BUTTON_SENTINEL, ControlLabeler,
    EXPLORER_VIEW_CLASS, FILE_NAME_COMBO_CLASS, FILE_NAME_LABEL_SENTINEL, OK_BUTTON_SENTINEL,
    RequiredControls, STATIC_CLASS,
};
use crate::message_hook::HookRegistry;
use crate::selection::{SelectionItem, SelectionItemRef};
use crate::types::{
    DialogLabel, DialogOutcome, MessageRecord, Point, Rect, Visibility, WindowHandle,
    WindowMessage,
};
use crate::validator::AcceptContext;
use crate::window_manager::{HookCallback, HookToken, WindowManager};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

const FAKE_THREAD_ID: u32 = 1;

fn offset_rect(rect: Rect, dx: i32, dy: i32) -> Rect {
    Rect::new(rect.left + dx, rect.top + dy, rect.right + dx, rect.bottom + dy)
}

#[derive(Debug, Clone)]
struct FakeWindow {
    hwnd: WindowHandle,
    parent: Option<WindowHandle>,
    class_name: String,
    title: String,
    rect: Rect,
}

#[derive(Default)]
pub(crate) struct FakeWindowManager {
    windows: RefCell<Vec<FakeWindow>>,
    positions: RefCell<Vec<(WindowHandle, Point, Visibility)>>,
    hooks: RefCell<HookRegistry>,
    hook_installs: Cell<usize>,
    hook_uninstalls: Cell<usize>,
    fail_hook_install: Cell<bool>,
    runaway_enumeration: Cell<bool>,
    find_child_calls: Cell<usize>,
    destroy_messages: Cell<usize>,
}

impl FakeWindowManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn add_window(&self, parent: Option<WindowHandle>, class_name: &str, title: &str, rect: Rect) -> WindowHandle {
        let mut windows = self.windows.borrow_mut();
        let hwnd = WindowHandle(windows.len() as isize + 1);
        windows.push(FakeWindow {
            hwnd,
            parent,
            class_name: class_name.to_string(),
            title: title.to_string(),
            rect,
        });
        hwnd
    }

    /// Adds a top-level window; `rect` is in screen coordinates.
    pub(crate) fn add_top_level(&self, rect: Rect) -> WindowHandle {
        self.add_window(None, "#32770", "Open", rect)
    }

    /// Adds a child window; `rect` is in screen coordinates.
    pub(crate) fn add_child(&self, parent: WindowHandle, class_name: &str, title: &str, rect: Rect) -> WindowHandle {
        self.add_window(Some(parent), class_name, title, rect)
    }

    pub(crate) fn set_rect(&self, hwnd: WindowHandle, rect: Rect) {
        if let Some(window) = self.windows.borrow_mut().iter_mut().find(|w| w.hwnd == hwnd) {
            window.rect = rect;
        }
    }

    pub(crate) fn fail_hook_install(&self, fail: bool) {
        self.fail_hook_install.set(fail);
    }

    pub(crate) fn set_runaway_enumeration(&self, runaway: bool) {
        self.runaway_enumeration.set(runaway);
    }

    pub(crate) fn positions(&self) -> Vec<(WindowHandle, Point, Visibility)> {
        self.positions.borrow().clone()
    }

    pub(crate) fn clear_positions(&self) {
        self.positions.borrow_mut().clear();
    }

    pub(crate) fn hook_installs(&self) -> usize {
        self.hook_installs.get()
    }

    pub(crate) fn hook_uninstalls(&self) -> usize {
        self.hook_uninstalls.get()
    }

    pub(crate) fn active_hooks(&self) -> usize {
        self.hooks.borrow().len()
    }

    pub(crate) fn find_child_calls(&self) -> usize {
        self.find_child_calls.get()
    }

    pub(crate) fn destroy_messages(&self) -> usize {
        self.destroy_messages.get()
    }

    /// Dispatches `record` to every installed hook, in installation order.
    pub(crate) fn deliver(&self, record: MessageRecord) {
        if record.message == WindowMessage::Destroy {
            self.destroy_messages.set(self.destroy_messages.get() + 1);
        }
        HookRegistry::dispatch(&self.hooks, &record);
    }

    fn origin_of(&self, hwnd: WindowHandle) -> Option<Point> {
        self.windows
            .borrow()
            .iter()
            .find(|w| w.hwnd == hwnd)
            .map(|w| Point::new(w.rect.left, w.rect.top))
    }
}

impl WindowManager for FakeWindowManager {
    fn find_child(
        &self,
        parent: WindowHandle,
        after: Option<WindowHandle>,
        class_name: Option<&str>,
        title: Option<&str>,
    ) -> Option<WindowHandle> {
        self.find_child_calls.set(self.find_child_calls.get() + 1);
        if self.runaway_enumeration.get() {
            return Some(WindowHandle(42));
        }
        let windows = self.windows.borrow();
        let mut children = windows.iter().filter(|w| w.parent == Some(parent));
        if let Some(after) = after {
            children.by_ref().find(|w| w.hwnd == after)?;
        }
        children
            .find(|w| {
                class_name.is_none_or(|c| w.class_name.eq_ignore_ascii_case(c))
                    && title.is_none_or(|t| w.title.eq_ignore_ascii_case(t))
            })
            .map(|w| w.hwnd)
    }

    fn window_rect(&self, hwnd: WindowHandle) -> PlatformResult<Rect> {
        self.windows
            .borrow()
            .iter()
            .find(|w| w.hwnd == hwnd)
            .map(|w| w.rect)
            .ok_or_else(|| PlatformError::InvalidHandle(format!("{hwnd:?}")))
    }

    fn map_rect_from_screen(&self, to: WindowHandle, rect: Rect) -> PlatformResult<Rect> {
        let origin = self
            .origin_of(to)
            .ok_or_else(|| PlatformError::InvalidHandle(format!("{to:?}")))?;
        Ok(offset_rect(rect, -origin.x, -origin.y))
    }

    fn set_window_position(
        &self,
        hwnd: WindowHandle,
        position: Point,
        visibility: Visibility,
    ) -> PlatformResult<()> {
        self.positions.borrow_mut().push((hwnd, position, visibility));
        let parent = self
            .windows
            .borrow()
            .iter()
            .find(|w| w.hwnd == hwnd)
            .and_then(|w| w.parent);
        let origin = parent.and_then(|p| self.origin_of(p)).unwrap_or_default();
        if let Some(window) = self.windows.borrow_mut().iter_mut().find(|w| w.hwnd == hwnd) {
            let (width, height) = (window.rect.width(), window.rect.height());
            let left = origin.x + position.x;
            let top = origin.y + position.y;
            window.rect = Rect::new(left, top, left + width, top + height);
        }
        Ok(())
    }

    fn current_thread_id(&self) -> u32 {
        FAKE_THREAD_ID
    }

    fn install_message_hook(&self, thread_id: u32, callback: HookCallback) -> PlatformResult<HookToken> {
        if self.fail_hook_install.get() || thread_id != FAKE_THREAD_ID {
            return Err(PlatformError::HookInstallFailed("scripted failure".to_string()));
        }
        self.hook_installs.set(self.hook_installs.get() + 1);
        Ok(self.hooks.borrow_mut().register(callback))
    }

    fn uninstall_message_hook(&self, token: HookToken) -> PlatformResult<()> {
        if self.hooks.borrow_mut().unregister(token) {
            self.hook_uninstalls.set(self.hook_uninstalls.get() + 1);
            Ok(())
        } else {
            Err(PlatformError::InvalidHandle(format!("unknown hook {token:?}")))
        }
    }
}

/// A dialog window laid out like the stock open dialog, with sentinel titles
/// already applied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StandardDialog {
    pub dialog: WindowHandle,
    pub file_name_label: WindowHandle,
    pub file_name_combo: WindowHandle,
    pub explorer_view: WindowHandle,
    pub ok_button: WindowHandle,
    pub cancel_button: WindowHandle,
    pub custom_button: WindowHandle,
}

impl StandardDialog {
    /*
     * Dialog at screen (100, 100). Dialog-local rectangles:
     *   filename label (10, 500)-(80, 516), combo (90, 498)-(700, 520),
     *   ok (500, 540)-(575, 563), cancel (585, 540)-(660, 563),
     *   custom button (10, 10)-(100, 33).
     */
    pub(crate) fn build(wm: &FakeWindowManager) -> Self {
        let dialog = wm.add_top_level(Rect::new(100, 100, 900, 700));
        let at = |left, top, right, bottom| offset_rect(Rect::new(left, top, right, bottom), 100, 100);

        let file_name_label = wm.add_child(dialog, STATIC_CLASS, FILE_NAME_LABEL_SENTINEL, at(10, 500, 80, 516));
        let file_name_combo = wm.add_child(dialog, FILE_NAME_COMBO_CLASS, "", at(90, 498, 700, 520));
        let explorer_view = wm.add_child(dialog, EXPLORER_VIEW_CLASS, "", at(0, 0, 800, 480));
        wm.add_child(dialog, BUTTON_CLASS, "&Help", at(670, 540, 745, 563));
        let ok_button = wm.add_child(dialog, BUTTON_CLASS, OK_BUTTON_SENTINEL, at(500, 540, 575, 563));
        let cancel_button = wm.add_child(dialog, BUTTON_CLASS, CANCEL_BUTTON_SENTINEL, at(585, 540, 660, 563));
        let custom_button = wm.add_child(dialog, BUTTON_CLASS, CUSTOM_BUTTON_SENTINEL, at(10, 10, 100, 33));

        Self {
            dialog,
            file_name_label,
            file_name_combo,
            explorer_view,
            ok_button,
            cancel_button,
            custom_button,
        }
    }

    pub(crate) fn controls(&self) -> RequiredControls {
        RequiredControls {
            ok_button: self.ok_button,
            cancel_button: self.cancel_button,
            custom_button: self.custom_button,
            file_name_combo: self.file_name_combo,
            file_name_label: self.file_name_label,
            explorer_view: self.explorer_view,
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingLabeler {
    labels: RefCell<Vec<(DialogLabel, Option<String>)>>,
}

impl RecordingLabeler {
    pub(crate) fn labels(&self) -> Vec<(DialogLabel, Option<String>)> {
        self.labels.borrow().clone()
    }
}

impl ControlLabeler for RecordingLabeler {
    fn set_label(&self, label: DialogLabel, text: Option<&str>) -> PlatformResult<()> {
        self.labels.borrow_mut().push((label, text.map(str::to_string)));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeItem {
    name: String,
    file_system: bool,
    stream: bool,
    extension: Option<String>,
    extension_fails: bool,
    link_target: Option<SelectionItemRef>,
    link_fails: bool,
}

impl FakeItem {
    fn into_ref(self) -> SelectionItemRef {
        Rc::new(self)
    }

    pub(crate) fn file(name: &str) -> SelectionItemRef {
        let extension = name
            .rsplit(['\\', '/'])
            .next()
            .and_then(|leaf| leaf.rfind('.').map(|dot| leaf[dot..].to_string()));
        FakeItem {
            name: name.to_string(),
            file_system: true,
            extension,
            ..FakeItem::default()
        }
        .into_ref()
    }

    pub(crate) fn folder(name: &str) -> SelectionItemRef {
        FakeItem {
            name: name.to_string(),
            file_system: true,
            ..FakeItem::default()
        }
        .into_ref()
    }

    pub(crate) fn stream(name: &str) -> SelectionItemRef {
        FakeItem {
            name: name.to_string(),
            stream: true,
            ..FakeItem::default()
        }
        .into_ref()
    }

    pub(crate) fn stream_with_extension(name: &str, extension: &str) -> SelectionItemRef {
        FakeItem {
            name: name.to_string(),
            stream: true,
            extension: Some(extension.to_string()),
            ..FakeItem::default()
        }
        .into_ref()
    }

    /// Neither a filesystem object nor a stream (control panel, network...).
    pub(crate) fn virtual_item(name: &str) -> SelectionItemRef {
        FakeItem {
            name: name.to_string(),
            ..FakeItem::default()
        }
        .into_ref()
    }

    pub(crate) fn shortcut(name: &str, target: Option<SelectionItemRef>) -> SelectionItemRef {
        Self::with_extension(name, ".lnk", target)
    }

    pub(crate) fn with_extension(
        name: &str,
        extension: &str,
        target: Option<SelectionItemRef>,
    ) -> SelectionItemRef {
        FakeItem {
            name: name.to_string(),
            file_system: true,
            extension: Some(extension.to_string()),
            link_target: target,
            ..FakeItem::default()
        }
        .into_ref()
    }

    pub(crate) fn failing_extension(name: &str) -> SelectionItemRef {
        FakeItem {
            name: name.to_string(),
            file_system: true,
            extension_fails: true,
            ..FakeItem::default()
        }
        .into_ref()
    }

    pub(crate) fn failing_link(name: &str) -> SelectionItemRef {
        FakeItem {
            name: name.to_string(),
            file_system: true,
            extension: Some(".lnk".to_string()),
            link_fails: true,
            ..FakeItem::default()
        }
        .into_ref()
    }
}

impl SelectionItem for FakeItem {
    fn parsing_name(&self) -> PlatformResult<String> {
        Ok(self.name.clone())
    }

    fn is_file_system(&self) -> bool {
        self.file_system
    }

    fn is_stream(&self) -> bool {
        self.stream
    }

    fn file_extension(&self) -> PlatformResult<Option<String>> {
        if self.extension_fails {
            return Err(PlatformError::OperationFailed("property store unavailable".into()));
        }
        Ok(self.extension.clone())
    }

    fn link_target(&self) -> PlatformResult<Option<SelectionItemRef>> {
        if self.link_fails {
            return Err(PlatformError::OperationFailed("link target unreadable".into()));
        }
        Ok(self.link_target.clone())
    }
}

type ShowScript = Box<dyn FnOnce(&dyn DialogEvents) -> PlatformResult<DialogOutcome>>;

/// Everything a `FakeDialog` was asked to do, shared with the test.
#[derive(Default)]
pub(crate) struct FakeDialogState {
    pub title: RefCell<Option<String>>,
    pub labels: RefCell<Vec<(DialogLabel, Option<String>)>>,
    pub custom_buttons: RefCell<Vec<String>>,
    pub prompts: RefCell<Vec<String>>,
    pub closes: Cell<usize>,
    pub selection: RefCell<Vec<SelectionItemRef>>,
    script: RefCell<Option<ShowScript>>,
}

impl FakeDialogState {
    pub(crate) fn labels(&self) -> Vec<(DialogLabel, Option<String>)> {
        self.labels.borrow().clone()
    }

    pub(crate) fn set_selection(&self, selection: Vec<SelectionItemRef>) {
        *self.selection.borrow_mut() = selection;
    }
}

#[derive(Clone)]
pub(crate) struct FakeDialogFactory {
    wm: Rc<FakeWindowManager>,
    window: WindowHandle,
    state: Rc<FakeDialogState>,
    created: Rc<Cell<usize>>,
    alive: Rc<Cell<usize>>,
}

impl FakeDialogFactory {
    pub(crate) fn new(wm: Rc<FakeWindowManager>, window: WindowHandle) -> Self {
        Self {
            wm,
            window,
            state: Rc::new(FakeDialogState::default()),
            created: Rc::new(Cell::new(0)),
            alive: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn state(&self) -> Rc<FakeDialogState> {
        Rc::clone(&self.state)
    }

    pub(crate) fn created(&self) -> usize {
        self.created.get()
    }

    pub(crate) fn alive(&self) -> usize {
        self.alive.get()
    }

    /// What happens between the opening notification and the end of the
    /// modal loop on the next `show`.
    pub(crate) fn script(
        &self,
        script: impl FnOnce(&dyn DialogEvents) -> PlatformResult<DialogOutcome> + 'static,
    ) {
        *self.state.script.borrow_mut() = Some(Box::new(script));
    }
}

impl DialogFactory for FakeDialogFactory {
    type Dialog = FakeDialog;

    fn create(&self) -> PlatformResult<FakeDialog> {
        self.created.set(self.created.get() + 1);
        self.alive.set(self.alive.get() + 1);
        Ok(FakeDialog {
            wm: Rc::clone(&self.wm),
            window: self.window,
            state: Rc::clone(&self.state),
            alive: Rc::clone(&self.alive),
        })
    }
}

pub(crate) struct FakeDialog {
    wm: Rc<FakeWindowManager>,
    window: WindowHandle,
    state: Rc<FakeDialogState>,
    alive: Rc<Cell<usize>>,
}

impl Drop for FakeDialog {
    fn drop(&mut self) {
        self.alive.set(self.alive.get() - 1);
    }
}

impl ControlLabeler for FakeDialog {
    fn set_label(&self, label: DialogLabel, text: Option<&str>) -> PlatformResult<()> {
        self.state
            .labels
            .borrow_mut()
            .push((label, text.map(str::to_string)));
        Ok(())
    }
}

impl AcceptContext for FakeDialog {
    fn current_selection(&self) -> PlatformResult<Vec<SelectionItemRef>> {
        Ok(self.state.selection.borrow().clone())
    }

    fn show_invalid_selection(&self, message: &str) {
        self.state.prompts.borrow_mut().push(message.to_string());
    }
}

impl NativeFileDialog for FakeDialog {
    fn set_title(&self, title: &str) -> PlatformResult<()> {
        *self.state.title.borrow_mut() = Some(title.to_string());
        Ok(())
    }

    fn add_custom_button(&self, label: &str) -> PlatformResult<()> {
        self.state.custom_buttons.borrow_mut().push(label.to_string());
        Ok(())
    }

    fn dialog_window(&self) -> PlatformResult<WindowHandle> {
        Ok(self.window)
    }

    /// Closing destroys the dialog window, like the real thing.
    fn close(&self) -> PlatformResult<()> {
        self.state.closes.set(self.state.closes.get() + 1);
        self.wm
            .deliver(MessageRecord::new(self.window, WindowMessage::Destroy));
        Ok(())
    }

    fn show(
        &self,
        _owner: Option<WindowHandle>,
        events: Rc<dyn DialogEvents>,
    ) -> PlatformResult<DialogOutcome> {
        events.on_opening()?;
        let script = self.state.script.borrow_mut().take();
        match script {
            Some(script) => script(&*events),
            None => Ok(DialogOutcome::Cancelled),
        }
    }
}
