/*
 * Message hook control. `MessageHookController::install` registers a
 * callback on the owning thread's window-message stream and hands back an
 * `InstalledHook`: an explicit token holder that removes the registration
 * exactly once, either when asked to or when dropped. The caller stores that
 * value; nothing relies on a callback being kept alive by convention.
 *
 * `HookRegistry` is the per-thread callback table a native backend uses to
 * multiplex several registrations over a single OS hook.
 */

use crate::error::{PlatformError, Result as PlatformResult};
use crate::types::MessageRecord;
use crate::window_manager::{HookCallback, HookToken, WindowManager};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub struct MessageHookController {
    window_manager: Rc<dyn WindowManager>,
}

impl MessageHookController {
    pub fn new(window_manager: Rc<dyn WindowManager>) -> Self {
        Self { window_manager }
    }

    /*
     * Installs `callback` on the message stream of `thread_id`. Failure is
     * reported as `HookInstallFailed`; a dialog session cannot keep its
     * layout correct without the hook, so callers treat it as fatal.
     */
    pub fn install(&self, thread_id: u32, callback: HookCallback) -> PlatformResult<InstalledHook> {
        let token = self
            .window_manager
            .install_message_hook(thread_id, callback)
            .map_err(|err| {
                log::error!("MessageHook: Installing hook on thread {thread_id} failed: {err}");
                match err {
                    PlatformError::HookInstallFailed(_) => err,
                    other => PlatformError::HookInstallFailed(other.to_string()),
                }
            })?;
        log::debug!("MessageHook: Installed hook {token:?} on thread {thread_id}");
        Ok(InstalledHook {
            token,
            window_manager: Rc::clone(&self.window_manager),
            installed: Cell::new(true),
        })
    }
}

pub struct InstalledHook {
    token: HookToken,
    window_manager: Rc<dyn WindowManager>,
    installed: Cell<bool>,
}

impl InstalledHook {
    pub fn token(&self) -> HookToken {
        self.token
    }

    pub fn is_installed(&self) -> bool {
        self.installed.get()
    }

    /// Removes the hook. Calls after the first are no-ops.
    pub fn uninstall(&self) -> PlatformResult<()> {
        if !self.installed.replace(false) {
            return Ok(());
        }
        log::debug!("MessageHook: Uninstalling hook {:?}", self.token);
        self.window_manager.uninstall_message_hook(self.token)
    }
}

impl fmt::Debug for InstalledHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstalledHook")
            .field("token", &self.token)
            .field("installed", &self.installed.get())
            .finish()
    }
}

impl Drop for InstalledHook {
    fn drop(&mut self) {
        if self.installed.get() {
            if let Err(err) = self.uninstall() {
                log::warn!("MessageHook: Failed to release hook {:?} on drop: {err}", self.token);
            }
        }
    }
}

/// Callback table for all hook registrations of one thread.
#[derive(Default)]
pub struct HookRegistry {
    next_token: u64,
    entries: Vec<(HookToken, HookCallback)>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback and returns its token.
    pub fn register(&mut self, callback: HookCallback) -> HookToken {
        self.next_token += 1;
        let token = HookToken(self.next_token);
        self.entries.push((token, callback));
        token
    }

    /// Removes a registration. Returns `false` if the token was unknown.
    pub fn unregister(&mut self, token: HookToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(t, _)| *t != token);
        self.entries.len() != before
    }

    pub fn contains(&self, token: HookToken) -> bool {
        self.entries.iter().any(|(t, _)| *t == token)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /*
     * Clones the current registrations so they can be invoked without
     * holding a borrow on the registry; callbacks are free to unregister
     * themselves (or others) while a message is being dispatched.
     */
    pub fn snapshot(&self) -> Vec<(HookToken, HookCallback)> {
        self.entries
            .iter()
            .map(|(token, callback)| (*token, Rc::clone(callback)))
            .collect()
    }

    /*
     * Delivers `record` to every registration of `registry`. Dispatch runs
     * over a snapshot with no borrow held, and a callback unregistered by an
     * earlier one during the same dispatch is skipped.
     */
    pub fn dispatch(registry: &RefCell<Self>, record: &MessageRecord) {
        let snapshot = registry.borrow().snapshot();
        for (token, callback) in snapshot {
            let still_registered = registry.borrow().contains(token);
            if still_registered {
                callback(record);
            }
        }
    }
}
