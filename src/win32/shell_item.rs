/*
 * `SelectionItem` over a shell item. Attributes are queried live on each
 * call; property strings returned by the shell are copied out and freed
 * with `CoTaskMemFree` right away.
 */

use crate::error::Result as PlatformResult;
use crate::selection::{SelectionItem, SelectionItemRef};

use std::ffi::c_void;
use std::fmt;
use std::rc::Rc;
use windows::Win32::{
    Storage::EnhancedStorage::{PKEY_FileExtension, PKEY_Link_TargetParsingPath},
    System::Com::CoTaskMemFree,
    System::SystemServices::{SFGAO_FILESYSTEM, SFGAO_FLAGS, SFGAO_STREAM},
    UI::Shell::{
        IShellItem, IShellItem2, SHCreateItemFromParsingName, SIGDN_DESKTOPABSOLUTEPARSING,
    },
};
use windows::core::{HSTRING, Interface, PWSTR};

/// Copies a shell-allocated string and releases the allocation.
fn take_shell_string(value: PWSTR) -> String {
    if value.is_null() {
        return String::new();
    }
    let text = unsafe { value.to_string() };
    unsafe { CoTaskMemFree(Some(value.as_ptr() as *const c_void)) };
    text.unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|value| !value.is_empty())
}

#[derive(Clone)]
pub struct ShellItem {
    item: IShellItem,
}

impl ShellItem {
    pub fn new(item: IShellItem) -> Self {
        Self { item }
    }

    pub fn from_parsing_name(name: &str) -> PlatformResult<Self> {
        let item: IShellItem =
            unsafe { SHCreateItemFromParsingName(&HSTRING::from(name), None)? };
        Ok(Self::new(item))
    }

    fn has_attribute(&self, mask: SFGAO_FLAGS) -> bool {
        match unsafe { self.item.GetAttributes(mask) } {
            Ok(attributes) => (attributes & mask) == mask,
            Err(err) => {
                log::debug!("ShellItem: GetAttributes failed: {err:?}");
                false
            }
        }
    }

    fn properties(&self) -> PlatformResult<IShellItem2> {
        Ok(self.item.cast()?)
    }
}

impl fmt::Debug for ShellItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parsing_name() {
            Ok(name) => write!(f, "ShellItem({name})"),
            Err(_) => write!(f, "ShellItem(<unnamed>)"),
        }
    }
}

impl SelectionItem for ShellItem {
    fn parsing_name(&self) -> PlatformResult<String> {
        let value = unsafe { self.item.GetDisplayName(SIGDN_DESKTOPABSOLUTEPARSING)? };
        Ok(take_shell_string(value))
    }

    fn is_file_system(&self) -> bool {
        self.has_attribute(SFGAO_FILESYSTEM)
    }

    fn is_stream(&self) -> bool {
        self.has_attribute(SFGAO_STREAM)
    }

    fn file_extension(&self) -> PlatformResult<Option<String>> {
        let value = unsafe { self.properties()?.GetString(&PKEY_FileExtension)? };
        Ok(non_empty(take_shell_string(value)))
    }

    fn link_target(&self) -> PlatformResult<Option<SelectionItemRef>> {
        let value = unsafe { self.properties()?.GetString(&PKEY_Link_TargetParsingPath)? };
        let Some(target) = non_empty(take_shell_string(value)) else {
            return Ok(None);
        };
        let item = Self::from_parsing_name(&target)?;
        Ok(Some(Rc::new(item) as SelectionItemRef))
    }
}
