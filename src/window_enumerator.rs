/*
 * Lazy enumeration of a window's direct children filtered by class name and
 * title. Each step asks the window manager for the next match after the
 * previous one, in native Z-order, so nothing is collected up front. A query
 * can be iterated any number of times; every `iter()` starts over from the
 * first child. The sequence is capped at `MAX_CHILD_WINDOWS` matches so a
 * misbehaving native enumeration cannot loop forever.
 */

use crate::types::WindowHandle;
use crate::window_manager::WindowManager;

pub const MAX_CHILD_WINDOWS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildWindowQuery {
    parent: WindowHandle,
    class_name: Option<String>,
    title: Option<String>,
    max_count: usize,
}

impl ChildWindowQuery {
    pub fn new(parent: WindowHandle) -> Self {
        Self {
            parent,
            class_name: None,
            title: None,
            max_count: MAX_CHILD_WINDOWS,
        }
    }

    pub fn class_name(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn iter<'a>(&'a self, window_manager: &'a dyn WindowManager) -> ChildWindows<'a> {
        ChildWindows {
            query: self,
            window_manager,
            previous: None,
            yielded: 0,
            exhausted: false,
        }
    }

    pub fn first(&self, window_manager: &dyn WindowManager) -> Option<WindowHandle> {
        self.iter(window_manager).next()
    }
}

#[derive(Clone)]
pub struct ChildWindows<'a> {
    query: &'a ChildWindowQuery,
    window_manager: &'a dyn WindowManager,
    previous: Option<WindowHandle>,
    yielded: usize,
    exhausted: bool,
}

impl ChildWindows<'_> {
    /// Rewinds to the first child.
    pub fn restart(&mut self) {
        self.previous = None;
        self.yielded = 0;
        self.exhausted = false;
    }
}

impl Iterator for ChildWindows<'_> {
    type Item = WindowHandle;

    fn next(&mut self) -> Option<WindowHandle> {
        if self.exhausted || self.yielded >= self.query.max_count {
            return None;
        }
        let found = self.window_manager.find_child(
            self.query.parent,
            self.previous,
            self.query.class_name.as_deref(),
            self.query.title.as_deref(),
        );
        match found {
            Some(hwnd) if !hwnd.is_null() => {
                self.previous = Some(hwnd);
                self.yielded += 1;
                Some(hwnd)
            }
            _ => {
                self.exhausted = true;
                None
            }
        }
    }
}
