/*
 * Runtime layout patching of the OS-owned open dialog.
 *
 * The stock dialog has a filename combo box and an ok button that only make
 * sense for single-type selection. When the dialog opens, the patcher finds
 * the relevant child controls (tagged beforehand with sentinel titles so the
 * lookup is unambiguous), restores their user-facing labels, hides the
 * filename row and the native ok button, and installs a message hook that
 * keeps the custom validation button sitting where the ok button used to be.
 *
 * States: Uninitialized -> ControlsResolved -> HookInstalled -> Active -> TornDown.
 * All mutable state lives in `Cell`s because the hook callback re-enters
 * the patcher from inside the native message dispatch, possibly while a
 * previous call into the patcher is still on the stack.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::message_hook::{InstalledHook, MessageHookController};
use crate::types::{
    DialogLabel, MessageRecord, Point, Rect, RepaintPolicy, Visibility, WindowHandle,
    WindowMessage,
};
use crate::window_enumerator::ChildWindowQuery;
use crate::window_manager::{HookCallback, WindowManager};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

// Sentinel titles assigned before the dialog is shown. They only need to be
// unique among the dialog's children.
pub const OK_BUTTON_SENTINEL: &str = "FFD_SENTINEL_OK_BUTTON";
pub const CANCEL_BUTTON_SENTINEL: &str = "FFD_SENTINEL_CANCEL_BUTTON";
pub const CUSTOM_BUTTON_SENTINEL: &str = "FFD_SENTINEL_CUSTOM_VALIDATION_BUTTON";
pub const FILE_NAME_LABEL_SENTINEL: &str = "FFD_SENTINEL_FILE_NAME_LABEL";

pub const BUTTON_CLASS: &str = "Button";
pub const STATIC_CLASS: &str = "Static";
pub const FILE_NAME_COMBO_CLASS: &str = "ComboBoxEx32";
pub const EXPLORER_VIEW_CLASS: &str = "DUIViewWndClassName";

/// Relabels native dialog controls through the dialog's own API.
pub trait ControlLabeler {
    /// `None` restores the native default text.
    fn set_label(&self, label: DialogLabel, text: Option<&str>) -> PlatformResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    Uninitialized,
    ControlsResolved,
    HookInstalled,
    Active,
    TornDown,
}

/// Handles of the dialog children the patcher works with. Looked up once,
/// never owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredControls {
    pub ok_button: WindowHandle,
    pub cancel_button: WindowHandle,
    pub custom_button: WindowHandle,
    pub file_name_combo: WindowHandle,
    pub file_name_label: WindowHandle,
    pub explorer_view: WindowHandle,
}

impl RequiredControls {
    /*
     * Resolves every required child of `dialog`, or none of them: if any
     * lookup comes back empty the error names all missing controls.
     */
    pub fn resolve(window_manager: &dyn WindowManager, dialog: WindowHandle) -> PlatformResult<Self> {
        let lookup = |class_name: &str, title: Option<&str>| {
            let query = ChildWindowQuery::new(dialog).class_name(class_name);
            let query = match title {
                Some(title) => query.title(title),
                None => query,
            };
            query.first(window_manager)
        };

        let ok_button = lookup(BUTTON_CLASS, Some(OK_BUTTON_SENTINEL));
        let cancel_button = lookup(BUTTON_CLASS, Some(CANCEL_BUTTON_SENTINEL));
        let custom_button = lookup(BUTTON_CLASS, Some(CUSTOM_BUTTON_SENTINEL));
        let file_name_combo = lookup(FILE_NAME_COMBO_CLASS, None);
        let file_name_label = lookup(STATIC_CLASS, Some(FILE_NAME_LABEL_SENTINEL));
        let explorer_view = lookup(EXPLORER_VIEW_CLASS, None);

        match (
            ok_button,
            cancel_button,
            custom_button,
            file_name_combo,
            file_name_label,
            explorer_view,
        ) {
            (
                Some(ok_button),
                Some(cancel_button),
                Some(custom_button),
                Some(file_name_combo),
                Some(file_name_label),
                Some(explorer_view),
            ) => Ok(Self {
                ok_button,
                cancel_button,
                custom_button,
                file_name_combo,
                file_name_label,
                explorer_view,
            }),
            _ => {
                let missing: Vec<&'static str> = [
                    ("ok_button", ok_button),
                    ("cancel_button", cancel_button),
                    ("custom_button", custom_button),
                    ("file_name_combo", file_name_combo),
                    ("file_name_label", file_name_label),
                    ("explorer_view", explorer_view),
                ]
                .into_iter()
                .filter(|(_, hwnd)| hwnd.is_none())
                .map(|(name, _)| name)
                .collect();
                log::error!("LayoutPatcher: Missing dialog controls: {missing:?}");
                Err(PlatformError::ControlsNotFound(missing))
            }
        }
    }
}

/// Geometry derived from the current control rectangles, in dialog-local
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutMeasurements {
    pub ok_button: Rect,
    /// Height of the hidden filename row (max of combo and label).
    pub file_name_band_height: i32,
    pub custom_button_target: Point,
}

/*
 * Places the custom button where the ok button sits: left of cancel by the
 * native ok/cancel gap, top-aligned with cancel.
 */
pub fn custom_button_target(ok_button: Rect, cancel_button: Rect, custom_button: Rect) -> Point {
    let ok_cancel_margin = cancel_button.left - ok_button.right;
    Point::new(
        cancel_button.left - ok_cancel_margin - custom_button.width(),
        cancel_button.top,
    )
}

pub fn measure(
    window_manager: &dyn WindowManager,
    dialog: WindowHandle,
    controls: &RequiredControls,
) -> PlatformResult<LayoutMeasurements> {
    let local = |hwnd: WindowHandle| -> PlatformResult<Rect> {
        let screen = window_manager.window_rect(hwnd)?;
        window_manager.map_rect_from_screen(dialog, screen)
    };

    let ok_button = local(controls.ok_button)?;
    let cancel_button = local(controls.cancel_button)?;
    let custom_button = local(controls.custom_button)?;
    let file_name_combo = local(controls.file_name_combo)?;
    let file_name_label = local(controls.file_name_label)?;

    Ok(LayoutMeasurements {
        ok_button,
        file_name_band_height: file_name_combo.height().max(file_name_label.height()),
        custom_button_target: custom_button_target(ok_button, cancel_button, custom_button),
    })
}

pub struct DialogLayoutPatcher {
    window_manager: Rc<dyn WindowManager>,
    hooks: MessageHookController,
    dialog: WindowHandle,
    repaint_policy: RepaintPolicy,
    state: Cell<LayoutState>,
    controls: Cell<Option<RequiredControls>>,
    measurements: Cell<LayoutMeasurements>,
    reposition_pending: Cell<bool>,
    hook: RefCell<Option<InstalledHook>>,
}

impl DialogLayoutPatcher {
    pub fn new(
        window_manager: Rc<dyn WindowManager>,
        dialog: WindowHandle,
        repaint_policy: RepaintPolicy,
    ) -> Rc<Self> {
        Rc::new(Self {
            hooks: MessageHookController::new(Rc::clone(&window_manager)),
            window_manager,
            dialog,
            repaint_policy,
            state: Cell::new(LayoutState::Uninitialized),
            controls: Cell::new(None),
            measurements: Cell::new(LayoutMeasurements::default()),
            reposition_pending: Cell::new(false),
            hook: RefCell::new(None),
        })
    }

    pub fn state(&self) -> LayoutState {
        self.state.get()
    }

    pub fn dialog(&self) -> WindowHandle {
        self.dialog
    }

    pub fn controls(&self) -> Option<RequiredControls> {
        self.controls.get()
    }

    pub fn measurements(&self) -> LayoutMeasurements {
        self.measurements.get()
    }

    pub fn is_hook_installed(&self) -> bool {
        self.hook
            .borrow()
            .as_ref()
            .is_some_and(InstalledHook::is_installed)
    }

    /// Full dialog-open sequence: resolve controls, then relabel, lay out
    /// and hook.
    pub fn open(
        self: &Rc<Self>,
        labeler: &dyn ControlLabeler,
        ok_button_text: &str,
        cancel_button_text: Option<&str>,
    ) -> PlatformResult<()> {
        self.resolve_controls()?;
        self.install(labeler, ok_button_text, cancel_button_text)
    }

    /// Uninitialized -> ControlsResolved.
    pub fn resolve_controls(&self) -> PlatformResult<RequiredControls> {
        if self.state.get() != LayoutState::Uninitialized {
            return Err(PlatformError::OperationFailed(format!(
                "controls can only be resolved once (state {:?})",
                self.state.get()
            )));
        }
        let controls = RequiredControls::resolve(self.window_manager.as_ref(), self.dialog)?;
        log::debug!("LayoutPatcher: Resolved controls for dialog {:?}: {controls:?}", self.dialog);
        self.controls.set(Some(controls));
        self.state.set(LayoutState::ControlsResolved);
        Ok(controls)
    }

    /*
     * ControlsResolved -> HookInstalled. Labels are restored only now, since
     * the sentinel titles were the lookup keys. The ok button is moved up by
     * the height of the hidden filename row, which lets the explorer view
     * grow into the freed space and follow later resizes.
     */
    pub fn install(
        self: &Rc<Self>,
        labeler: &dyn ControlLabeler,
        ok_button_text: &str,
        cancel_button_text: Option<&str>,
    ) -> PlatformResult<()> {
        let controls = match (self.state.get(), self.controls.get()) {
            (LayoutState::ControlsResolved, Some(controls)) => controls,
            (state, _) => {
                return Err(PlatformError::OperationFailed(format!(
                    "cannot install layout hook in state {state:?}"
                )));
            }
        };

        labeler.set_label(DialogLabel::CancelButton, cancel_button_text)?;
        labeler.set_label(DialogLabel::CustomValidationButton, Some(ok_button_text))?;

        let measurements = self.refresh_measurements()?;

        let wm = self.window_manager.as_ref();
        wm.set_window_position(controls.file_name_combo, Point::default(), Visibility::Hide)?;
        wm.set_window_position(controls.file_name_label, Point::default(), Visibility::Hide)?;
        wm.set_window_position(
            controls.ok_button,
            Point::new(
                measurements.ok_button.left,
                measurements.ok_button.top - measurements.file_name_band_height,
            ),
            Visibility::Hide,
        )?;

        let thread_id = wm.current_thread_id();
        let hook = self.hooks.install(thread_id, self.hook_callback())?;
        *self.hook.borrow_mut() = Some(hook);
        self.state.set(LayoutState::HookInstalled);
        log::debug!(
            "LayoutPatcher: Hook installed for dialog {:?}, custom button target {:?}",
            self.dialog,
            measurements.custom_button_target
        );
        Ok(())
    }

    fn hook_callback(self: &Rc<Self>) -> HookCallback {
        let patcher = Rc::downgrade(self);
        Rc::new(move |record: &MessageRecord| {
            if let Some(patcher) = patcher.upgrade() {
                patcher.handle_message(record);
            }
        })
    }

    pub fn refresh_measurements(&self) -> PlatformResult<LayoutMeasurements> {
        let controls = self.controls.get().ok_or_else(|| {
            PlatformError::OperationFailed("controls have not been resolved".to_string())
        })?;
        let measurements = measure(self.window_manager.as_ref(), self.dialog, &controls)?;
        self.measurements.set(measurements);
        Ok(measurements)
    }

    /*
     * Hook entry point. Observes only; forwarding to the next hook in the
     * chain is the window manager's job.
     */
    pub fn handle_message(&self, record: &MessageRecord) {
        let state = self.state.get();
        if !matches!(state, LayoutState::HookInstalled | LayoutState::Active) {
            return;
        }

        match record.message {
            WindowMessage::Destroy => {
                if record.hwnd == self.dialog {
                    self.tear_down();
                }
            }
            WindowMessage::Size | WindowMessage::ShowWindow => {
                if let Err(err) = self.refresh_measurements() {
                    log::warn!("LayoutPatcher: Keeping previous geometry, measuring failed: {err}");
                }
                self.state.set(LayoutState::Active);
                self.reposition_pending.set(true);
                self.reposition_custom_button();
            }
            WindowMessage::Paint | WindowMessage::NcPaint => {
                self.state.set(LayoutState::Active);
                let reposition = match self.repaint_policy {
                    RepaintPolicy::EveryPaint => true,
                    RepaintPolicy::AfterResize => self.reposition_pending.replace(false),
                };
                if reposition {
                    self.reposition_custom_button();
                }
            }
            WindowMessage::Other(_) => {}
        }
    }

    fn reposition_custom_button(&self) {
        let Some(controls) = self.controls.get() else {
            return;
        };
        let target = self.measurements.get().custom_button_target;
        if let Err(err) = self.window_manager.set_window_position(
            controls.custom_button,
            target,
            Visibility::Unchanged,
        ) {
            log::warn!("LayoutPatcher: Repositioning custom button failed: {err}");
        }
    }

    /// Removes the hook and enters the terminal state. Safe to call more
    /// than once and from any state.
    pub fn tear_down(&self) {
        if self.state.replace(LayoutState::TornDown) == LayoutState::TornDown {
            return;
        }
        let hook = self.hook.borrow_mut().take();
        if let Some(hook) = hook {
            if let Err(err) = hook.uninstall() {
                log::warn!("LayoutPatcher: Failed to uninstall hook for dialog {:?}: {err}", self.dialog);
            }
        }
        log::debug!("LayoutPatcher: Torn down for dialog {:?}", self.dialog);
    }
}

impl Drop for DialogLayoutPatcher {
    fn drop(&mut self) {
        self.tear_down();
    }
}
