//! B-tree cursor navigation.
//!
//! A [`Cursor`] marks one entry of the ID0 B-tree and supports stepping to
//! the neighboring entries in key order. It keeps the decoded pages of the
//! root-to-leaf path it traveled; stepping off the end of a leaf climbs the
//! path, re-searching each ancestor for the current key, and stepping from a
//! branch entry descends into the adjacent subtree.
//!
//! Cursors are created by [`Id0::find`], [`Id0::find_prefix`], [`Id0::min`],
//! and [`Id0::max`].

use crate::idb::constants::MAX_TREE_DEPTH;
use crate::idb::id0::{not_present, Id0, Page};
use crate::IdbError;

/// A position on one entry of the B-tree.
pub struct Cursor<'a> {
    id0: &'a Id0,
    /// Pages traversed from the root to the current page, in order.
    path: Vec<Page>,
    /// Index of the current entry on the last page of the path.
    entry_number: usize,
}

fn cycle_error() -> IdbError {
    IdbError::Format(format!("ID0: b-tree deeper than {} levels", MAX_TREE_DEPTH))
}

fn empty_page_error(number: u32) -> IdbError {
    IdbError::Format(format!("ID0: page {}: no entries", number))
}

impl<'a> Cursor<'a> {
    pub(crate) fn find(id0: &'a Id0, key: &[u8]) -> Result<Self, IdbError> {
        let mut path = Vec::new();
        let mut page_number = id0.root_page;
        loop {
            let page = id0.page(page_number)?;
            if page.entries().is_empty() {
                return Err(not_present(key));
            }
            match page.find_index(key) {
                Some(i) if page.entries()[i].key() == key => {
                    path.push(page);
                    return Ok(Cursor {
                        id0,
                        path,
                        entry_number: i,
                    });
                }
                _ if page.is_leaf() => return Err(not_present(key)),
                None => {
                    page_number = page.child(page.entries().len() - 1)?;
                    path.push(page);
                }
                Some(0) => {
                    page_number = page.ppointer;
                    path.push(page);
                }
                Some(i) => {
                    page_number = page.child(i - 1)?;
                    path.push(page);
                }
            }
            if path.len() > MAX_TREE_DEPTH {
                return Err(cycle_error());
            }
        }
    }

    pub(crate) fn find_prefix(id0: &'a Id0, prefix: &[u8]) -> Result<Self, IdbError> {
        let mut path = Vec::new();
        let mut page_number = id0.root_page;
        loop {
            let page = id0.page(page_number)?;
            if page.entries().is_empty() {
                return Err(not_present(prefix));
            }
            if page.is_leaf() {
                // first key at or above the prefix, within this leaf or,
                // failing that, on an ancestor
                let lower_bound = page.entries().iter().position(|e| e.key() >= prefix);
                let cursor = match lower_bound {
                    Some(i) => {
                        path.push(page);
                        Cursor {
                            id0,
                            path,
                            entry_number: i,
                        }
                    }
                    None => {
                        let last = page.entries().len() - 1;
                        path.push(page);
                        let mut cursor = Cursor {
                            id0,
                            path,
                            entry_number: last,
                        };
                        match cursor.next() {
                            Ok(()) => {}
                            Err(IdbError::OutOfBounds(_)) => return Err(not_present(prefix)),
                            Err(other) => return Err(other),
                        }
                        cursor
                    }
                };
                if cursor.key().starts_with(prefix) {
                    return Ok(cursor);
                }
                return Err(not_present(prefix));
            }
            match page.find_index(prefix) {
                Some(i) if page.entries()[i].key() == prefix => {
                    path.push(page);
                    return Ok(Cursor {
                        id0,
                        path,
                        entry_number: i,
                    });
                }
                None => {
                    page_number = page.child(page.entries().len() - 1)?;
                    path.push(page);
                }
                Some(0) => {
                    page_number = page.ppointer;
                    path.push(page);
                }
                Some(i) => {
                    page_number = page.child(i - 1)?;
                    path.push(page);
                }
            }
            if path.len() > MAX_TREE_DEPTH {
                return Err(cycle_error());
            }
        }
    }

    pub(crate) fn min(id0: &'a Id0) -> Result<Self, IdbError> {
        Self::check_not_empty(id0)?;
        let mut cursor = Cursor {
            id0,
            path: Vec::new(),
            entry_number: 0,
        };
        cursor.descend_min(id0.root_page)?;
        Ok(cursor)
    }

    pub(crate) fn max(id0: &'a Id0) -> Result<Self, IdbError> {
        Self::check_not_empty(id0)?;
        let mut cursor = Cursor {
            id0,
            path: Vec::new(),
            entry_number: 0,
        };
        cursor.descend_max(id0.root_page)?;
        Ok(cursor)
    }

    fn check_not_empty(id0: &Id0) -> Result<(), IdbError> {
        let root = id0.page(id0.root_page)?;
        if root.is_leaf() && root.entries().is_empty() {
            return Err(IdbError::OutOfBounds(
                "ID0: b-tree has no entries".to_string(),
            ));
        }
        Ok(())
    }

    fn current_page(&self) -> &Page {
        &self.path[self.path.len() - 1]
    }

    /// The key of the current entry.
    pub fn key(&self) -> &[u8] {
        self.current_page().entries()[self.entry_number].key()
    }

    /// The value of the current entry.
    pub fn value(&self) -> &[u8] {
        self.current_page().entries()[self.entry_number].value()
    }

    /// Step to the entry with the next larger key.
    ///
    /// Fails with [`IdbError::OutOfBounds`] on the last entry; the cursor
    /// state is unspecified after a failed step.
    pub fn next(&mut self) -> Result<(), IdbError> {
        if self.current_page().is_leaf() {
            if self.entry_number + 1 < self.current_page().entries().len() {
                self.entry_number += 1;
                return Ok(());
            }
            // end of this leaf: climb until an ancestor still has an entry
            // at or above the current key
            let start_key = self.key().to_vec();
            while self.path.len() > 1 {
                self.path.pop();
                let parent = &self.path[self.path.len() - 1];
                if let Some(i) = parent.find_index(&start_key) {
                    self.entry_number = i;
                    return Ok(());
                }
            }
            Err(IdbError::OutOfBounds(
                "cursor is at the last entry".to_string(),
            ))
        } else {
            // the subtree right of a branch entry holds its successors
            let child = self.current_page().child(self.entry_number)?;
            self.descend_min(child)
        }
    }

    /// Step to the entry with the next smaller key.
    ///
    /// Fails with [`IdbError::OutOfBounds`] on the first entry; the cursor
    /// state is unspecified after a failed step.
    pub fn prev(&mut self) -> Result<(), IdbError> {
        if self.current_page().is_leaf() {
            if self.entry_number > 0 {
                self.entry_number -= 1;
                return Ok(());
            }
            // start of this leaf: climb until an ancestor has an entry
            // strictly below the current key
            let start_key = self.key().to_vec();
            while self.path.len() > 1 {
                self.path.pop();
                let parent = &self.path[self.path.len() - 1];
                let index = parent
                    .find_index(&start_key)
                    .unwrap_or(parent.entries().len());
                if index == 0 {
                    continue;
                }
                self.entry_number = index - 1;
                return Ok(());
            }
            Err(IdbError::OutOfBounds(
                "cursor is at the first entry".to_string(),
            ))
        } else {
            let page = self.current_page();
            let child = if self.entry_number == 0 {
                page.ppointer
            } else {
                page.child(self.entry_number - 1)?
            };
            self.descend_max(child)
        }
    }

    fn descend_min(&mut self, mut page_number: u32) -> Result<(), IdbError> {
        loop {
            let page = self.id0.page(page_number)?;
            if page.is_leaf() {
                if page.entries().is_empty() {
                    return Err(empty_page_error(page.number));
                }
                self.path.push(page);
                self.entry_number = 0;
                return Ok(());
            }
            page_number = page.ppointer;
            self.path.push(page);
            if self.path.len() > MAX_TREE_DEPTH {
                return Err(cycle_error());
            }
        }
    }

    fn descend_max(&mut self, mut page_number: u32) -> Result<(), IdbError> {
        loop {
            let page = self.id0.page(page_number)?;
            if page.entries().is_empty() {
                return Err(empty_page_error(page.number));
            }
            if page.is_leaf() {
                self.entry_number = page.entries().len() - 1;
                self.path.push(page);
                return Ok(());
            }
            page_number = page.child(page.entries().len() - 1)?;
            self.path.push(page);
            if self.path.len() > MAX_TREE_DEPTH {
                return Err(cycle_error());
            }
        }
    }
}
