//! Fixed-capacity slot array for the files attached in one form session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::attachment::{AttachedFile, AttachmentId};

/// Prefix of the remove-button identifier rendered for each slot.
pub const REMOVE_ACTION_PREFIX: &str = "removeFile_";

/// Remove-button identifier for the slot at `index`.
pub fn remove_action_id(index: usize) -> String {
    format!("{}{}", REMOVE_ACTION_PREFIX, index)
}

/// Errors raised when rebuilding a store from serialized slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotStoreError {
    #[error("slot {0} holds a file without a name")]
    EmptyName(usize),

    #[error("file {id} occupies both slot {first} and slot {second}")]
    DuplicateId {
        id: AttachmentId,
        first: usize,
        second: usize,
    },

    #[error("expected {expected} slot(s), found {found}")]
    CapacityMismatch { expected: usize, found: usize },
}

/// Ordered sequence of exactly `max_files` slots.
///
/// A slot is either empty or holds an `(id, name)` pair with a non-empty name. No two
/// occupied slots share an id. The capacity is fixed when the store is created and
/// serialization preserves it (an empty slot serializes as `null`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<AttachedFile>>", into = "Vec<Option<AttachedFile>>")]
pub struct SlotStore {
    slots: Vec<Option<AttachedFile>>,
}

impl SlotStore {
    /// Allocate `max_files` empty slots.
    pub fn new(max_files: usize) -> Self {
        Self {
            slots: vec![None; max_files],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// File held at `index`, if the index is in range and the slot is occupied.
    pub fn file_at(&self, index: usize) -> Option<&AttachedFile> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Occupied slots in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &AttachedFile)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|file| (index, file)))
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn free_count(&self) -> usize {
        self.capacity() - self.occupied_count()
    }

    /// Lowest unoccupied index.
    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn free_slot_exists(&self) -> bool {
        self.find_free_slot().is_some()
    }

    pub fn contains(&self, id: AttachmentId) -> bool {
        self.position(id).is_some()
    }

    /// Index of the slot holding `id`.
    pub fn position(&self, id: AttachmentId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|file| file.id == id))
    }

    /// Place a file in the lowest free slot.
    ///
    /// Does nothing when the id is already held by any slot, when the name is empty,
    /// or when every slot is occupied. Returns the slot written, if any.
    pub fn add(&mut self, id: AttachmentId, name: impl Into<String>) -> Option<usize> {
        let name = name.into();
        if name.is_empty() || self.contains(id) {
            return None;
        }
        let index = self.find_free_slot()?;
        self.slots[index] = Some(AttachedFile { id, name });
        Some(index)
    }

    /// Clear every slot holding `id`. Returns how many slots were cleared.
    pub fn remove_by_id(&mut self, id: AttachmentId) -> usize {
        let mut cleared = 0;
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|file| file.id == id) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Add each file in iteration order; files beyond the free capacity are dropped.
    pub fn populate_from<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = AttachedFile>,
    {
        for file in files {
            if !self.free_slot_exists() {
                break;
            }
            self.add(file.id, file.name);
        }
    }

    /// Ids of the occupied slots in index order.
    pub fn file_ids(&self) -> Vec<AttachmentId> {
        self.occupied().map(|(_, file)| file.id).collect()
    }

    pub fn slots(&self) -> &[Option<AttachedFile>] {
        &self.slots
    }

    /// Rebuild a store from serialized slots, requiring a specific capacity.
    pub fn restore(
        slots: Vec<Option<AttachedFile>>,
        max_files: usize,
    ) -> Result<Self, SlotStoreError> {
        if slots.len() != max_files {
            return Err(SlotStoreError::CapacityMismatch {
                expected: max_files,
                found: slots.len(),
            });
        }
        Self::try_from(slots)
    }
}

impl TryFrom<Vec<Option<AttachedFile>>> for SlotStore {
    type Error = SlotStoreError;

    fn try_from(slots: Vec<Option<AttachedFile>>) -> Result<Self, Self::Error> {
        let mut seen: HashMap<AttachmentId, usize> = HashMap::new();
        for (index, slot) in slots.iter().enumerate() {
            let Some(file) = slot else { continue };
            if file.name.is_empty() {
                return Err(SlotStoreError::EmptyName(index));
            }
            if let Some(&first) = seen.get(&file.id) {
                return Err(SlotStoreError::DuplicateId {
                    id: file.id,
                    first,
                    second: index,
                });
            }
            seen.insert(file.id, index);
        }
        Ok(Self { slots })
    }
}

impl From<SlotStore> for Vec<Option<AttachedFile>> {
    fn from(store: SlotStore) -> Self {
        store.slots
    }
}
