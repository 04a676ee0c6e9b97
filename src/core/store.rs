//! Append-only storage for the entries of one session.

use crate::core::entry::{Entry, EntryOverrides};
use chrono::NaiveDateTime;
use std::convert::Infallible;

/// A loosely-typed reading handed over by producers that do not build
/// [`Entry`] values themselves (serial lines, ad-hoc scripts).
///
/// Converting it into an entry is where malformed input is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub movement_value: i64,
    pub timestamp: Option<NaiveDateTime>,
}

impl TryFrom<RawEntry> for Entry {
    type Error = StoreError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let movement_value = u32::try_from(raw.movement_value).map_err(|_| {
            StoreError::InvalidEntryType(format!(
                "movement value {} is outside 0..={}",
                raw.movement_value,
                u32::MAX
            ))
        })?;

        Ok(match raw.timestamp {
            Some(timestamp) => Entry::at(movement_value, timestamp),
            None => Entry::new(movement_value),
        })
    }
}

/// Errors raised by [`EntryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The value handed to `append` is not a well-formed entry
    InvalidEntryType(String),
    /// No entry exists at the requested position
    IndexOutOfRange { index: usize, len: usize },
    /// The store holds no entries yet
    EmptyStore,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidEntryType(e) => write!(f, "Invalid entry: {e}"),
            StoreError::IndexOutOfRange { index, len } => {
                write!(f, "Index {index} out of range for store of length {len}")
            }
            StoreError::EmptyStore => write!(f, "Entry store is empty"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<Infallible> for StoreError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Ordered, append-only collection of entries.
///
/// Invariant: `at(i).index() == i` for every stored entry.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning it the next index.
    ///
    /// Any index already set on the entry is overwritten. A value that cannot
    /// be converted into an entry is rejected and the store is left unchanged.
    pub fn append<E>(&mut self, entry: E) -> Result<(), StoreError>
    where
        E: TryInto<Entry>,
        StoreError: From<E::Error>,
    {
        let entry: Entry = entry.try_into()?;
        let index = self.entries.len() as u64;
        self.entries.push(entry.copy_with(EntryOverrides {
            index: Some(index),
            ..Default::default()
        }));
        Ok(())
    }

    /// Get the entry at position `index`.
    pub fn at(&self, index: usize) -> Result<&Entry, StoreError> {
        self.entries.get(index).ok_or(StoreError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the most recently appended entry.
    pub fn last_index(&self) -> Result<usize, StoreError> {
        self.entries
            .len()
            .checked_sub(1)
            .ok_or(StoreError::EmptyStore)
    }

    pub fn first(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Movement values in append order.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(Entry::movement_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_indices() {
        let mut store = EntryStore::new();
        for value in [3, 1, 4, 1, 5] {
            let entry = Entry::new(value).copy_with(EntryOverrides {
                index: Some(99),
                ..Default::default()
            });
            store.append(entry).unwrap();
        }

        assert_eq!(store.len(), 5);
        for (i, entry) in store.iter().enumerate() {
            assert_eq!(entry.index(), i as u64);
        }
        assert_eq!(store.values().collect::<Vec<_>>(), vec![3, 1, 4, 1, 5]);
        assert_eq!(store.last_index(), Ok(4));
    }

    #[test]
    fn test_invalid_entry_is_rejected() {
        let mut store = EntryStore::new();
        store.append(Entry::new(1)).unwrap();

        let result = store.append(RawEntry {
            movement_value: -3,
            timestamp: None,
        });
        assert!(matches!(result, Err(StoreError::InvalidEntryType(_))));
        assert_eq!(store.len(), 1);

        store
            .append(RawEntry {
                movement_value: 8,
                timestamp: None,
            })
            .unwrap();
        assert_eq!(store.at(1).unwrap().movement_value(), 8);
        assert_eq!(store.at(1).unwrap().index(), 1);
    }

    #[test]
    fn test_out_of_range_and_empty() {
        let mut store = EntryStore::new();
        assert_eq!(store.last_index(), Err(StoreError::EmptyStore));
        assert_eq!(
            store.at(0),
            Err(StoreError::IndexOutOfRange { index: 0, len: 0 })
        );

        store.append(Entry::new(0)).unwrap();
        assert!(store.at(0).is_ok());
        assert_eq!(
            store.at(1),
            Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
        );
    }
}
