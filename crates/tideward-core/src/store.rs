use tideward_protocol::EntityId;

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Deterministic, generational storage for ships and depots.
///
/// - Stable iteration order: ascending slot index.
/// - Safe handles: `EntityId { index, generation }`.
/// - Freed slots are reused lowest-index-first so entity ids assigned after
///   a destruction are independent of destruction order.
#[derive(Clone, Debug)]
pub struct EntityStore<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> EntityStore<T> {
    pub fn insert(&mut self, value: T) -> EntityId {
        if let Some(pos) = self
            .free
            .iter()
            .enumerate()
            .min_by_key(|(_, index)| **index)
            .map(|(pos, _)| pos)
        {
            let index = self.free.swap_remove(pos);
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            EntityId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            EntityId::new(index, 0)
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation == id.generation {
            slot.value.as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation == id.generation {
            slot.value.as_mut()
        } else {
            None
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_ordered(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let value = slot.value.as_ref()?;
            Some((EntityId::new(index as u32, slot.generation), value))
        })
    }

    pub fn iter_ordered_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let value = slot.value.as_mut()?;
                Some((EntityId::new(index as u32, slot.generation), value))
            })
    }

    pub fn ids_ordered(&self) -> Vec<EntityId> {
        self.iter_ordered().map(|(id, _)| id).collect()
    }

    /// Generation counter of every slot in index order, freed slots included.
    /// Recorded into snapshots so `from_entries` can rebuild the store
    /// exactly and post-resume insertions reuse slots at the same generation
    /// as the original run.
    pub fn slot_generations(&self) -> Vec<u32> {
        self.slots.iter().map(|slot| slot.generation).collect()
    }

    /// Rebuild a store from snapshot entries, preserving index and generation
    /// for every live entity. `generations` carries the counter of every
    /// slot (from `slot_generations`), so freed slots come back at the
    /// generation they had when the snapshot was taken.
    pub fn from_entries(entries: Vec<(EntityId, T)>, generations: &[u32]) -> Self {
        let capacity = entries
            .iter()
            .map(|(id, _)| id.index as usize + 1)
            .max()
            .unwrap_or(0)
            .max(generations.len());

        let mut slots: Vec<Slot<T>> = Vec::with_capacity(capacity);
        for index in 0..capacity {
            slots.push(Slot {
                generation: generations.get(index).copied().unwrap_or(0),
                value: None,
            });
        }

        for (id, value) in entries {
            let slot = &mut slots[id.index as usize];
            slot.generation = id.generation;
            slot.value = Some(value);
        }

        let free = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_none())
            .map(|(index, _)| index as u32)
            .collect();

        Self { slots, free }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_miss_after_removal() {
        let mut store = EntityStore::default();
        let id = store.insert("a");
        assert_eq!(store.remove(id), Some("a"));
        assert!(store.get(id).is_none());

        let reused = store.insert("b");
        assert_eq!(reused.index, id.index);
        assert_ne!(reused.generation, id.generation);
        assert!(store.get(id).is_none());
        assert_eq!(store.get(reused), Some(&"b"));
    }

    #[test]
    fn freed_slots_reuse_lowest_index_first() {
        let mut store = EntityStore::default();
        let a = store.insert(0);
        let b = store.insert(1);
        let _c = store.insert(2);
        store.remove(b);
        store.remove(a);

        let next = store.insert(3);
        assert_eq!(next.index, a.index);
    }

    #[test]
    fn iteration_is_ascending_by_index() {
        let mut store = EntityStore::default();
        store.insert("x");
        store.insert("y");
        store.insert("z");
        let indices: Vec<u32> = store.iter_ordered().map(|(id, _)| id.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn from_entries_reconstructs_ids_exactly() {
        let mut store = EntityStore::default();
        let a = store.insert("a");
        let b = store.insert("b");
        store.remove(a);
        let c = store.insert("c"); // reuses a's slot at generation 1

        let entries: Vec<_> = store
            .iter_ordered()
            .map(|(id, v)| (id, v.to_string()))
            .collect();
        let rebuilt = EntityStore::from_entries(entries, &store.slot_generations());

        assert_eq!(rebuilt.get(c).map(String::as_str), Some("c"));
        assert_eq!(rebuilt.get(b).map(String::as_str), Some("b"));
        assert!(rebuilt.get(a).is_none());
    }

    #[test]
    fn rebuilt_store_reuses_freed_slots_at_the_same_generation() {
        let mut store = EntityStore::default();
        let a = store.insert("a");
        store.insert("b");
        store.remove(a);

        let entries: Vec<_> = store.iter_ordered().map(|(id, v)| (id, *v)).collect();
        let mut rebuilt = EntityStore::from_entries(entries, &store.slot_generations());

        let next_original = store.insert("c");
        let next_rebuilt = rebuilt.insert("c");
        assert_eq!(next_rebuilt, next_original);
        assert_eq!(next_rebuilt.index, a.index);
        assert_eq!(next_rebuilt.generation, a.generation + 1);
    }
}
