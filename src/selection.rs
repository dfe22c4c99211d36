/*
 * Selection items and the validation contract.
 *
 * A `SelectionItem` is one entry the user picked in the dialog: a file, a
 * folder, or a non-filesystem stream object. A single registered
 * `SelectionValidationHandler` inspects the candidate selection on each
 * accept attempt and answers with a `SelectionVerdict`. `DefaultSelectionPolicy`
 * is the stock handler: it drops items that are neither filesystem objects
 * nor streams and dereferences shortcut files through a replaceable
 * `LinkDereferencePolicy`.
 */

use crate::error::Result as PlatformResult;

use std::fmt;
use std::rc::Rc;

pub trait SelectionItem: fmt::Debug {
    /// Parsing identity of the item (a path for filesystem items).
    fn parsing_name(&self) -> PlatformResult<String>;

    fn is_file_system(&self) -> bool;

    fn is_stream(&self) -> bool;

    /// Value of the file-extension property, including the leading dot.
    fn file_extension(&self) -> PlatformResult<Option<String>>;

    /// Item the link-target property points to, if any.
    fn link_target(&self) -> PlatformResult<Option<SelectionItemRef>>;
}

pub type SelectionItemRef = Rc<dyn SelectionItem>;

/// Parsing names of `items`; items whose name cannot be read are skipped.
pub fn parsing_names(items: &[SelectionItemRef]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item.parsing_name() {
            Ok(name) => Some(name),
            Err(err) => {
                log::warn!("Selection: Skipping item without parsing name {item:?}: {err}");
                None
            }
        })
        .collect()
}

/// Answer of a validation handler for one accept attempt.
#[derive(Debug, Clone)]
pub struct SelectionVerdict {
    pub is_valid: bool,
    /// Replaces the candidate selection when present.
    pub replacement: Option<Vec<SelectionItemRef>>,
}

impl SelectionVerdict {
    pub fn accept() -> Self {
        Self {
            is_valid: true,
            replacement: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            is_valid: false,
            replacement: None,
        }
    }

    pub fn with_replacement(mut self, replacement: Vec<SelectionItemRef>) -> Self {
        self.replacement = Some(replacement);
        self
    }
}

/// Result of validating one accept attempt. Not kept across attempts.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub filtered_selection: Vec<SelectionItemRef>,
}

impl ValidationOutcome {
    /// An attempt succeeds only if valid and something is left to return.
    pub fn allows_close(&self) -> bool {
        self.is_valid && !self.filtered_selection.is_empty()
    }

    pub fn filtered_names(&self) -> Vec<String> {
        parsing_names(&self.filtered_selection)
    }
}

/*
 * The single policy deciding an accept attempt. Implementations must not
 * panic; failures in their own lookups should turn into an invalid verdict.
 */
pub trait SelectionValidationHandler {
    fn validate(&self, selection: &[SelectionItemRef]) -> SelectionVerdict;
}

impl<F> SelectionValidationHandler for F
where
    F: Fn(&[SelectionItemRef]) -> SelectionVerdict,
{
    fn validate(&self, selection: &[SelectionItemRef]) -> SelectionVerdict {
        self(selection)
    }
}

/// Strategy deciding which items are links and how to follow them.
pub trait LinkDereferencePolicy {
    fn should_dereference(&self, item: &dyn SelectionItem) -> bool;

    /// Target of `item`, or `None` if it cannot be resolved.
    fn dereference(&self, item: &dyn SelectionItem) -> Option<SelectionItemRef>;
}

pub const SHORTCUT_EXTENSION: &str = ".lnk";

/*
 * Follows shortcut files (`.lnk`) only. Symbolic links and junctions are
 * left alone: opening a symlink already yields the target's content, while
 * opening a shortcut yields the shortcut's own metadata.
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutDereference;

impl LinkDereferencePolicy for ShortcutDereference {
    fn should_dereference(&self, item: &dyn SelectionItem) -> bool {
        if !item.is_file_system() {
            return false;
        }
        match item.file_extension() {
            Ok(Some(extension)) => extension.eq_ignore_ascii_case(SHORTCUT_EXTENSION),
            Ok(None) => false,
            Err(err) => {
                log::debug!("ShortcutDereference: Extension lookup failed for {item:?}: {err}");
                false
            }
        }
    }

    fn dereference(&self, item: &dyn SelectionItem) -> Option<SelectionItemRef> {
        match item.link_target() {
            Ok(target) => target,
            Err(err) => {
                log::debug!("ShortcutDereference: Link target lookup failed for {item:?}: {err}");
                None
            }
        }
    }
}

/*
 * Default validation policy. Every item must be a filesystem object or a
 * stream, which is what the dialog itself accepts by default. Shortcuts are
 * replaced by their targets, and a shortcut to a missing or invalid target
 * voids the whole selection. Invalid entries never stop the scan, so the
 * verdict always carries the full filtered subset.
 */
#[derive(Debug, Clone, Default)]
pub struct DefaultSelectionPolicy<L = ShortcutDereference> {
    links: L,
}

impl DefaultSelectionPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: LinkDereferencePolicy> DefaultSelectionPolicy<L> {
    pub fn with_link_policy(links: L) -> Self {
        Self { links }
    }

    fn is_acceptable(item: &dyn SelectionItem) -> bool {
        item.is_file_system() || item.is_stream()
    }

    /// Returns the filtered selection and whether any entry was invalid.
    pub fn filter(&self, selection: &[SelectionItemRef]) -> (Vec<SelectionItemRef>, bool) {
        let mut filtered = Vec::with_capacity(selection.len());
        let mut has_invalid_items = false;

        for item in selection {
            if !Self::is_acceptable(item.as_ref()) {
                log::debug!("DefaultSelectionPolicy: Rejecting non-storage item {item:?}");
                has_invalid_items = true;
                continue;
            }

            let resolved = if self.links.should_dereference(item.as_ref()) {
                self.links.dereference(item.as_ref())
            } else {
                Some(Rc::clone(item))
            };

            match resolved {
                Some(resolved) if Self::is_acceptable(resolved.as_ref()) => filtered.push(resolved),
                _ => {
                    log::debug!("DefaultSelectionPolicy: Link {item:?} has no valid target");
                    has_invalid_items = true;
                }
            }
        }

        (filtered, has_invalid_items)
    }
}

impl<L: LinkDereferencePolicy> SelectionValidationHandler for DefaultSelectionPolicy<L> {
    fn validate(&self, selection: &[SelectionItemRef]) -> SelectionVerdict {
        let (filtered, has_invalid_items) = self.filter(selection);
        SelectionVerdict {
            is_valid: !has_invalid_items,
            replacement: Some(filtered),
        }
    }
}
