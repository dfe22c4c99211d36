/*
 * `NativeFileDialog` over the shell's `IFileOpenDialog`.
 *
 * The dialog is created with multi-selection and without item validation,
 * carries one prominent custom push button, and reports its notifications
 * through a COM event sink that forwards into the session's `DialogEvents`.
 * The first folder-changing notification is the earliest point where the
 * dialog window exists, so it doubles as the "opening" notification.
 */

use super::{ShellItem, handle_from_hwnd, hwnd_from_handle, optional_pcwstr};
use crate::dialog::{DialogEvents, DialogFactory, NativeFileDialog};
use crate::error::{PlatformError, Result as PlatformResult};
use crate::layout_patcher::ControlLabeler;
use crate::selection::SelectionItemRef;
use crate::types::{DEFAULT_OK_BUTTON_TEXT, DialogLabel, DialogOutcome, WindowHandle};
use crate::validator::AcceptContext;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use windows::Win32::{
    Foundation::{E_FAIL, ERROR_CANCELLED, S_FALSE, S_OK},
    System::Com::{CLSCTX_INPROC_SERVER, CoCreateInstance, IServiceProvider},
    System::Ole::IOleWindow,
    UI::Shell::{
        FDE_OVERWRITE_RESPONSE, FDE_SHAREVIOLATION_RESPONSE, FOS_ALLOWMULTISELECT,
        FOS_NOVALIDATE, FileOpenDialog, IFileDialog, IFileDialog2, IFileDialogControlEvents,
        IFileDialogControlEvents_Impl, IFileDialogCustomize, IFileDialogEvents,
        IFileDialogEvents_Impl, IFileOpenDialog, IFolderView2, IShellItem, SID_SFolderView,
    },
    UI::WindowsAndMessaging::{MB_ICONINFORMATION, MB_OK, MessageBoxW},
};
use windows::core::{BOOL, HSTRING, Interface, Ref, implement};

/// Control id of the custom validation button.
const CUSTOM_BUTTON_ID: u32 = 0x1000;

pub struct Win32FileDialog {
    dialog: IFileOpenDialog,
    customize: IFileDialogCustomize,
    title: RefCell<Option<HSTRING>>,
}

impl Win32FileDialog {
    pub fn new() -> PlatformResult<Self> {
        let dialog: IFileOpenDialog =
            unsafe { CoCreateInstance(&FileOpenDialog, None, CLSCTX_INPROC_SERVER) }.map_err(
                |err| {
                    log::error!("Win32FileDialog: CoCreateInstance failed: {err:?}");
                    PlatformError::InitializationFailed(format!(
                        "could not create the open dialog: {err}"
                    ))
                },
            )?;
        unsafe {
            let options = dialog.GetOptions()?;
            dialog.SetOptions(options | FOS_ALLOWMULTISELECT | FOS_NOVALIDATE)?;
        }
        let customize: IFileDialogCustomize = dialog.cast()?;
        Ok(Self {
            dialog,
            customize,
            title: RefCell::new(None),
        })
    }

    fn message_box_owner(&self) -> Option<WindowHandle> {
        self.dialog_window().ok().filter(|hwnd| !hwnd.is_null())
    }
}

impl ControlLabeler for Win32FileDialog {
    /*
     * `None` hands a null string to the dialog, which puts back its own
     * localized text. The custom button has no native text, so it falls
     * back to the default ok text instead.
     */
    fn set_label(&self, label: DialogLabel, text: Option<&str>) -> PlatformResult<()> {
        let text = match label {
            DialogLabel::CustomValidationButton => Some(text.unwrap_or(DEFAULT_OK_BUTTON_TEXT)),
            _ => text,
        }
        .map(HSTRING::from);
        let text = optional_pcwstr(&text);
        unsafe {
            match label {
                DialogLabel::OkButton => self.dialog.SetOkButtonLabel(text)?,
                DialogLabel::FileNameLabel => self.dialog.SetFileNameLabel(text)?,
                DialogLabel::CancelButton => {
                    let dialog: IFileDialog2 = self.dialog.cast()?;
                    dialog.SetCancelButtonLabel(text)?;
                }
                DialogLabel::CustomValidationButton => {
                    self.customize.SetControlLabel(CUSTOM_BUTTON_ID, text)?
                }
            }
        }
        Ok(())
    }
}

impl AcceptContext for Win32FileDialog {
    /*
     * Reads the selection from the dialog's folder view. The view is only
     * reachable while the dialog is open, which is why selections are
     * captured during the accept attempt and not after `Show` returns.
     */
    fn current_selection(&self) -> PlatformResult<Vec<SelectionItemRef>> {
        let provider: IServiceProvider = self.dialog.cast()?;
        let view: IFolderView2 = unsafe { provider.QueryService(&SID_SFolderView)? };
        let items = unsafe { view.GetSelection(true.into())? };
        let count = unsafe { items.GetCount()? };
        let mut selection = Vec::with_capacity(count as usize);
        for index in 0..count {
            let item = unsafe { items.GetItemAt(index)? };
            selection.push(Rc::new(ShellItem::new(item)) as SelectionItemRef);
        }
        Ok(selection)
    }

    fn show_invalid_selection(&self, message: &str) {
        let owner = self.message_box_owner().map(hwnd_from_handle);
        // A null caption gives the system's default one.
        let title = self.title.borrow().clone();
        unsafe {
            MessageBoxW(
                owner,
                &HSTRING::from(message),
                optional_pcwstr(&title),
                MB_OK | MB_ICONINFORMATION,
            );
        }
    }
}

impl NativeFileDialog for Win32FileDialog {
    fn set_title(&self, title: &str) -> PlatformResult<()> {
        let title = HSTRING::from(title);
        unsafe { self.dialog.SetTitle(&title)? };
        *self.title.borrow_mut() = Some(title);
        Ok(())
    }

    fn add_custom_button(&self, label: &str) -> PlatformResult<()> {
        unsafe {
            self.customize
                .AddPushButton(CUSTOM_BUTTON_ID, &HSTRING::from(label))?;
            self.customize.MakeProminent(CUSTOM_BUTTON_ID)?;
        }
        Ok(())
    }

    fn dialog_window(&self) -> PlatformResult<WindowHandle> {
        let window: IOleWindow = self.dialog.cast()?;
        let hwnd = unsafe { window.GetWindow()? };
        Ok(handle_from_hwnd(hwnd))
    }

    fn close(&self) -> PlatformResult<()> {
        unsafe { self.dialog.Close(S_OK)? };
        Ok(())
    }

    fn show(
        &self,
        owner: Option<WindowHandle>,
        events: Rc<dyn DialogEvents>,
    ) -> PlatformResult<DialogOutcome> {
        let sink = DialogEventSink {
            events,
            dialog: self.dialog.clone(),
            opened: Cell::new(false),
            opening_error: RefCell::new(None),
        };
        let sink = windows::core::ComObject::new(sink);
        let file_events: IFileDialogEvents = sink.to_interface();
        let cookie = unsafe { self.dialog.Advise(&file_events)? };

        let shown = unsafe { self.dialog.Show(owner.map(hwnd_from_handle)) };

        if let Err(err) = unsafe { self.dialog.Unadvise(cookie) } {
            log::warn!("Win32FileDialog: Unadvise failed: {err:?}");
        }
        if let Some(err) = sink.opening_error.borrow_mut().take() {
            return Err(err);
        }
        match shown {
            Ok(()) => Ok(DialogOutcome::Accepted),
            Err(err) if err.code() == ERROR_CANCELLED.to_hresult() => Ok(DialogOutcome::Cancelled),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Win32DialogFactory;

impl Win32DialogFactory {
    pub fn new() -> Self {
        Self
    }
}

impl DialogFactory for Win32DialogFactory {
    type Dialog = Win32FileDialog;

    fn create(&self) -> PlatformResult<Win32FileDialog> {
        Win32FileDialog::new()
    }
}

/*
 * COM event sink. Returning an error HRESULT from `OnFileOk` keeps the
 * dialog open; `S_FALSE` does so without the dialog reporting a failure.
 * A failed opening closes the dialog and the error is reported from `show`.
 */
#[implement(IFileDialogEvents, IFileDialogControlEvents)]
struct DialogEventSink {
    events: Rc<dyn DialogEvents>,
    dialog: IFileOpenDialog,
    opened: Cell<bool>,
    opening_error: RefCell<Option<PlatformError>>,
}

impl DialogEventSink {
    fn abort(&self, err: PlatformError) {
        log::error!("DialogEventSink: Aborting dialog: {err}");
        *self.opening_error.borrow_mut() = Some(err);
        if let Err(close_err) = unsafe { self.dialog.Close(E_FAIL) } {
            log::error!("DialogEventSink: Close failed: {close_err:?}");
        }
    }
}

impl IFileDialogEvents_Impl for DialogEventSink_Impl {
    fn OnFileOk(&self, _pfd: Ref<IFileDialog>) -> windows::core::Result<()> {
        if self.events.on_file_ok() {
            Ok(())
        } else {
            Err(windows::core::Error::from_hresult(S_FALSE))
        }
    }

    fn OnFolderChanging(
        &self,
        _pfd: Ref<IFileDialog>,
        _psifolder: Ref<IShellItem>,
    ) -> windows::core::Result<()> {
        if !self.opened.replace(true) {
            if let Err(err) = self.events.on_opening() {
                self.abort(err);
            }
        }
        Ok(())
    }

    fn OnFolderChange(&self, _pfd: Ref<IFileDialog>) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnSelectionChange(&self, _pfd: Ref<IFileDialog>) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnShareViolation(
        &self,
        _pfd: Ref<IFileDialog>,
        _psi: Ref<IShellItem>,
        _presponse: *mut FDE_SHAREVIOLATION_RESPONSE,
    ) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnTypeChange(&self, _pfd: Ref<IFileDialog>) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnOverwrite(
        &self,
        _pfd: Ref<IFileDialog>,
        _psi: Ref<IShellItem>,
        _presponse: *mut FDE_OVERWRITE_RESPONSE,
    ) -> windows::core::Result<()> {
        Ok(())
    }
}

impl IFileDialogControlEvents_Impl for DialogEventSink_Impl {
    fn OnItemSelected(
        &self,
        _pfdc: Ref<IFileDialogCustomize>,
        _dwidctl: u32,
        _dwiditem: u32,
    ) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnButtonClicked(
        &self,
        _pfdc: Ref<IFileDialogCustomize>,
        dwidctl: u32,
    ) -> windows::core::Result<()> {
        if dwidctl != CUSTOM_BUTTON_ID {
            return Ok(());
        }
        if let Err(err) = self.events.on_custom_button_clicked() {
            log::error!("DialogEventSink: Custom button handling failed: {err}");
        }
        Ok(())
    }

    fn OnCheckButtonToggled(
        &self,
        _pfdc: Ref<IFileDialogCustomize>,
        _dwidctl: u32,
        _bchecked: BOOL,
    ) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnControlActivating(
        &self,
        _pfdc: Ref<IFileDialogCustomize>,
        _dwidctl: u32,
    ) -> windows::core::Result<()> {
        Ok(())
    }
}
