/*
 * The open-file-or-folder dialog façade.
 *
 * `OpenFileOrFolderDialog` owns the native dialog object for the duration of
 * a session and coordinates the pieces around it: sentinel labels before
 * the dialog is shown, the layout patcher when it opens, the selection
 * validator on every accept attempt, and cleanup on every exit path. The
 * native side is reached only through `NativeFileDialog`/`DialogFactory`,
 * so the whole flow runs against in-memory fakes in tests; the Win32
 * implementation lives in `crate::win32`.
 *
 * Native callbacks re-enter the session while `show` is still on the stack,
 * so the session state is shared (`Rc`) and uses interior mutability.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::layout_patcher::{
    CANCEL_BUTTON_SENTINEL, CUSTOM_BUTTON_SENTINEL, ControlLabeler, DialogLayoutPatcher,
    FILE_NAME_LABEL_SENTINEL, LayoutState, OK_BUTTON_SENTINEL,
};
use crate::selection::{SelectionItemRef, SelectionValidationHandler, parsing_names};
use crate::types::{DialogConfig, DialogLabel, DialogOutcome, WindowHandle};
use crate::validator::{AcceptContext, AcceptDecision, SelectionValidator};
use crate::window_manager::WindowManager;

use std::cell::RefCell;
use std::rc::Rc;

/// Notifications the native dialog delivers into the session.
pub trait DialogEvents {
    /// The dialog window exists and is about to be shown.
    fn on_opening(&self) -> PlatformResult<()>;

    /// Native accept (double-click, Enter). `false` vetoes closing.
    fn on_file_ok(&self) -> bool;

    fn on_custom_button_clicked(&self) -> PlatformResult<()>;
}

/// One native open dialog object.
pub trait NativeFileDialog: ControlLabeler + AcceptContext {
    fn set_title(&self, title: &str) -> PlatformResult<()>;

    /// Adds the prominent push button that replaces the native ok button.
    fn add_custom_button(&self, label: &str) -> PlatformResult<()>;

    fn dialog_window(&self) -> PlatformResult<WindowHandle>;

    /// Closes the dialog with an accepted result.
    fn close(&self) -> PlatformResult<()>;

    /// Runs the modal loop, delivering notifications to `events`.
    fn show(
        &self,
        owner: Option<WindowHandle>,
        events: Rc<dyn DialogEvents>,
    ) -> PlatformResult<DialogOutcome>;
}

pub trait DialogFactory {
    type Dialog: NativeFileDialog + 'static;

    fn create(&self) -> PlatformResult<Self::Dialog>;
}

pub(crate) struct DialogSession<D> {
    config: DialogConfig,
    window_manager: Rc<dyn WindowManager>,
    validator: SelectionValidator,
    native: RefCell<Option<Rc<D>>>,
    patcher: RefCell<Option<Rc<DialogLayoutPatcher>>>,
    filtered_selection: RefCell<Option<Vec<SelectionItemRef>>>,
}

impl<D: NativeFileDialog> DialogSession<D> {
    fn new(config: DialogConfig, window_manager: Rc<dyn WindowManager>) -> Self {
        let validator = if config.use_default_validation {
            SelectionValidator::with_default_policy()
        } else {
            SelectionValidator::new()
        };
        Self {
            config,
            window_manager,
            validator,
            native: RefCell::new(None),
            patcher: RefCell::new(None),
            filtered_selection: RefCell::new(None),
        }
    }

    fn native(&self) -> Option<Rc<D>> {
        self.native.borrow().clone()
    }

    /*
     * Creates the native dialog if needed and tags the controls the layout
     * patcher will look for. The sentinels stay in place until the dialog
     * opens and the controls have been found.
     */
    fn initialize(&self, factory: &impl DialogFactory<Dialog = D>) -> PlatformResult<Rc<D>> {
        if let Some(native) = self.native() {
            return Ok(native);
        }
        let native = Rc::new(factory.create()?);
        if let Some(title) = &self.config.title {
            native.set_title(title)?;
        }
        native.set_label(DialogLabel::FileNameLabel, Some(FILE_NAME_LABEL_SENTINEL))?;
        native.set_label(DialogLabel::OkButton, Some(OK_BUTTON_SENTINEL))?;
        native.set_label(DialogLabel::CancelButton, Some(CANCEL_BUTTON_SENTINEL))?;
        native.add_custom_button(CUSTOM_BUTTON_SENTINEL)?;
        *self.native.borrow_mut() = Some(Rc::clone(&native));
        log::debug!("DialogSession: Native dialog initialized");
        Ok(native)
    }

    /// Releases the native dialog and everything tied to it.
    fn cleanup(&self) {
        let patcher = self.patcher.borrow_mut().take();
        if let Some(patcher) = patcher {
            patcher.tear_down();
        }
        let released = self.native.borrow_mut().take().is_some();
        self.filtered_selection.borrow_mut().take();
        if released {
            log::debug!("DialogSession: Native dialog released");
        }
    }

    fn take_filtered_selection(&self) -> Option<Vec<SelectionItemRef>> {
        self.filtered_selection.borrow_mut().take()
    }
}

impl<D: NativeFileDialog> DialogEvents for DialogSession<D> {
    fn on_opening(&self) -> PlatformResult<()> {
        if self.patcher.borrow().is_some() {
            log::debug!("DialogSession: Ignoring repeated opening notification");
            return Ok(());
        }
        let native = self.native().ok_or_else(|| {
            PlatformError::InvalidHandle("dialog opened without a native dialog".to_string())
        })?;
        let dialog_window = native.dialog_window()?;
        if dialog_window.is_null() {
            return Err(PlatformError::InvalidHandle(
                "native dialog has no window".to_string(),
            ));
        }

        let patcher = DialogLayoutPatcher::new(
            Rc::clone(&self.window_manager),
            dialog_window,
            self.config.repaint_policy,
        );
        patcher.open(
            &*native,
            &self.config.ok_button_text,
            self.config.cancel_button_text.as_deref(),
        )?;
        *self.patcher.borrow_mut() = Some(patcher);
        log::debug!("DialogSession: Dialog {dialog_window:?} patched");
        Ok(())
    }

    /*
     * Validation runs before any native accept processing; the stored
     * result is always the outcome of the latest attempt that succeeded.
     */
    fn on_file_ok(&self) -> bool {
        let Some(native) = self.native() else {
            log::warn!("DialogSession: Accept attempt without a native dialog");
            return false;
        };
        let decision = self
            .validator
            .on_accept(&*native, self.config.invalid_selection_message());
        match decision {
            AcceptDecision::Allow(items) => {
                log::debug!("DialogSession: Accepting {} items", items.len());
                *self.filtered_selection.borrow_mut() = Some(items);
                true
            }
            AcceptDecision::Reject => {
                self.filtered_selection.borrow_mut().take();
                false
            }
        }
    }

    fn on_custom_button_clicked(&self) -> PlatformResult<()> {
        if !self.on_file_ok() {
            return Ok(());
        }
        match self.native() {
            Some(native) => native.close(),
            None => Ok(()),
        }
    }
}

/*
 * Runs `DialogSession::cleanup` when dropped, so the native dialog and the
 * message hook are released whether `show` returns normally, with an error,
 * or unwinds.
 */
struct SessionCleanupGuard<'a, D: NativeFileDialog> {
    session: &'a DialogSession<D>,
}

impl<D: NativeFileDialog> Drop for SessionCleanupGuard<'_, D> {
    fn drop(&mut self) {
        self.session.cleanup();
    }
}

pub struct OpenFileOrFolderDialog<F: DialogFactory> {
    factory: F,
    session: Rc<DialogSession<F::Dialog>>,
    results: RefCell<Option<Vec<SelectionItemRef>>>,
}

impl<F: DialogFactory> OpenFileOrFolderDialog<F> {
    pub fn new(config: DialogConfig, factory: F, window_manager: Rc<dyn WindowManager>) -> Self {
        Self {
            factory,
            session: Rc::new(DialogSession::new(config, window_manager)),
            results: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &DialogConfig {
        &self.session.config
    }

    /// Registers the handler deciding accept attempts, replacing the
    /// default policy or any previous handler.
    pub fn set_validation_handler(&self, handler: impl SelectionValidationHandler + 'static) {
        self.session.validator.set_handler(handler);
    }

    /// Accept every non-empty selection as-is.
    pub fn clear_validation_handler(&self) {
        self.session.validator.clear_handler();
    }

    pub fn initialize(&self) -> PlatformResult<()> {
        self.session.initialize(&self.factory).map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.session.native.borrow().is_some()
    }

    pub fn layout_state(&self) -> Option<LayoutState> {
        self.session.patcher.borrow().as_ref().map(|p| p.state())
    }

    /// Notification entry points, for native backends and tests that drive
    /// the session directly.
    pub fn events(&self) -> Rc<dyn DialogEvents> {
        Rc::clone(&self.session) as Rc<dyn DialogEvents>
    }

    /*
     * Shows the dialog modally. On acceptance the validated selection
     * becomes available through `file_names`/`items`; on cancellation or
     * failure the previous results are discarded.
     */
    pub fn show(&self, owner: Option<WindowHandle>) -> PlatformResult<DialogOutcome> {
        self.results.borrow_mut().take();
        let guard = SessionCleanupGuard {
            session: self.session.as_ref(),
        };
        let outcome = {
            let native = self.session.initialize(&self.factory)?;
            native.show(owner, self.events())?
        };

        if outcome == DialogOutcome::Accepted {
            let selection = self.session.take_filtered_selection();
            if selection.is_none() {
                log::warn!("OpenFileOrFolderDialog: Dialog accepted without a validated selection");
            }
            *self.results.borrow_mut() = selection;
        }
        drop(guard);
        log::debug!("OpenFileOrFolderDialog: Dialog closed with {outcome:?}");
        Ok(outcome)
    }

    /// Parsing names of the accepted selection.
    pub fn file_names(&self) -> PlatformResult<Vec<String>> {
        self.results
            .borrow()
            .as_deref()
            .map(parsing_names)
            .ok_or(PlatformError::NoSelectionAvailable)
    }

    /// The accepted selection as items.
    pub fn items(&self) -> PlatformResult<Vec<SelectionItemRef>> {
        self.results
            .borrow()
            .clone()
            .ok_or(PlatformError::NoSelectionAvailable)
    }
}
