use crate::resource::ResourceDesc;

/// Generation-checked index of a logical resource in a [`ResourceTable`].
///
/// Ids stay cheap to copy and to key maps with; a stale id (its slot was
/// freed and reused) fails lookup instead of dereferencing freed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    index: u32,
    generation: u32,
}

impl ResourceId {
    pub fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct TableEntry {
    generation: u32,
    desc: Option<ResourceDesc>,
}

/// Arena of logical resources addressed by generation-checked ids.
///
/// Replaces refcounted native wrappers: ownership lives here, everything else
/// holds ids. Freed slots are recycled with a bumped generation.
#[derive(Debug, Default)]
pub struct ResourceTable {
    entries: Vec<TableEntry>,
    free: Vec<u32>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, desc: ResourceDesc) -> ResourceId {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            debug_assert!(entry.desc.is_none());
            entry.desc = Some(desc);
            return ResourceId {
                index,
                generation: entry.generation,
            };
        }

        let index = self.entries.len() as u32;
        self.entries.push(TableEntry {
            generation: 1,
            desc: Some(desc),
        });
        ResourceId {
            index,
            generation: 1,
        }
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceDesc> {
        let entry = self.entries.get(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.desc.as_ref()
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut ResourceDesc> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.desc.as_mut()
    }

    /// Free the slot and bump its generation so outstanding ids go stale.
    pub fn remove(&mut self, id: ResourceId) -> Option<ResourceDesc> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        let desc = entry.desc.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(desc)
    }

    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{BufferHandle, SrvHandle};
    use crate::resource::{BufferDesc, ResourceDesc};

    fn buffer(size: u32) -> ResourceDesc {
        ResourceDesc::Buffer(BufferDesc {
            size,
            native: BufferHandle(size),
            srv: Some(SrvHandle(size)),
            uav: None,
        })
    }

    #[test]
    fn insert_get_remove_roundtrip() {
        let mut table = ResourceTable::new();
        let id = table.insert(buffer(64));
        assert!(table.get(id).is_some());
        assert_eq!(table.len(), 1);

        assert!(table.remove(id).is_some());
        assert!(table.get(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn stale_id_fails_after_slot_reuse() {
        let mut table = ResourceTable::new();
        let first = table.insert(buffer(16));
        table.remove(first);

        let second = table.insert(buffer(32));
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());

        assert!(table.get(first).is_none());
        assert!(table.remove(first).is_none());
        assert!(table.get(second).is_some());
    }
}
