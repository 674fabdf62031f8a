//! Open-addressed hash map with tombstone deletion, generalized from
//! `map.c`'s `map_t` (capacity-50 open addressing, doubling resize,
//! `TOMBSTONE`/`SET_VALUE` sentinel slots). The localizer's call and φ-removal
//! passes (`localize::call::localize_calls`, `localize::phi::remove_phis`)
//! use this for their vreg-keyed bookkeeping; [`crate::support::graph::Graph`]
//! builds its adjacency sets on top of it too.

use std::hash::Hash;

const INITIAL_CAPACITY: usize = 50;

#[derive(Clone)]
enum Slot<K, V> {
    Empty,
    Tombstone,
    Occupied(K, V),
}

/// A hash map open-addressed with linear probing; deletions leave a
/// tombstone behind so later probes don't stop short (`map_remove` in the
/// source). Capacity doubles once the map is more than half full.
pub struct Map<K, V> {
    slots: Vec<Slot<K, V>>,
    len: usize,
}

impl<K: Hash + Eq + Clone, V> Map<K, V> {
    pub fn new() -> Self {
        Self { slots: (0..INITIAL_CAPACITY).map(|_| Slot::Empty).collect(), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn hash_of(key: &K) -> usize {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher;
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as usize
    }

    fn probe(&self, key: &K) -> usize {
        let cap = self.slots.len();
        let mut i = Self::hash_of(key) % cap;
        let mut first_tombstone = None;
        loop {
            match &self.slots[i] {
                Slot::Empty => return first_tombstone.unwrap_or(i),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(i);
                    }
                }
                Slot::Occupied(k, _) if k == key => return i,
                Slot::Occupied(..) => {}
            }
            i = (i + 1) % cap;
        }
    }

    fn find(&self, key: &K) -> Option<usize> {
        let cap = self.slots.len();
        let mut i = Self::hash_of(key) % cap;
        for _ in 0..cap {
            match &self.slots[i] {
                Slot::Empty => return None,
                Slot::Occupied(k, _) if k == key => return Some(i),
                _ => {}
            }
            i = (i + 1) % cap;
        }
        None
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if (self.len + 1) * 2 > self.slots.len() {
            self.resize();
        }
        let i = self.probe(&key);
        match std::mem::replace(&mut self.slots[i], Slot::Occupied(key, value)) {
            Slot::Occupied(_, old) => Some(old),
            _ => {
                self.len += 1;
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).and_then(|i| match &self.slots[i] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let i = self.find(key)?;
        match &mut self.slots[i] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let i = self.find(key)?;
        match std::mem::replace(&mut self.slots[i], Slot::Tombstone) {
            Slot::Occupied(_, v) => {
                self.len -= 1;
                Some(v)
            }
            _ => unreachable!(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().filter_map(|s| match s {
            Slot::Occupied(k, v) => Some((k, v)),
            _ => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    fn resize(&mut self) {
        let new_capacity = self.slots.len() * 2;
        let old = std::mem::replace(&mut self.slots, (0..new_capacity).map(|_| Slot::Empty).collect());
        self.len = 0;
        for slot in old {
            if let Slot::Occupied(k, v) = slot {
                self.insert(k, v);
            }
        }
    }
}

impl<K: Hash + Eq + Clone, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let mut m = Map::new();
        m.insert("a", 1);
        m.insert("b", 2);
        assert_eq!(m.get(&"a"), Some(&1));
        assert_eq!(m.get(&"b"), Some(&2));
        assert_eq!(m.get(&"c"), None);
    }

    #[test]
    fn remove_leaves_a_tombstone_that_later_probes_skip_past() {
        let mut m = Map::new();
        m.insert(1, "one");
        m.insert(2, "two");
        m.remove(&1);
        assert_eq!(m.get(&1), None);
        assert_eq!(m.get(&2), Some(&"two"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn resizes_past_half_full() {
        let mut m = Map::new();
        for i in 0..40 {
            m.insert(i, i * 10);
        }
        assert!(m.slots.len() > INITIAL_CAPACITY);
        for i in 0..40 {
            assert_eq!(m.get(&i), Some(&(i * 10)));
        }
    }
}
