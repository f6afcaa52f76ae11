//! A bounded map which forgets its least recently used entry when full.
//!
//! Recency is tracked with a monotonically increasing tick, each entry records
//! the tick it was last touched at and an ordered map from tick back to key
//! gives the oldest entry in `O(log n)`.
//!

use std::{
	collections::{BTreeMap, HashMap},
	hash::Hash,
};

#[derive(Clone, Debug)]
pub struct Lru<K, V> {
	/// Maximum number of entries
	capacity: usize,
	/// Entries with the tick they were last used
	entries: HashMap<K, (V, u64)>,
	/// Keys ordered by when they were last used
	recency: BTreeMap<u64, K>,
	/// Next tick to hand out
	tick: u64,
}

impl<K: Clone + Eq + Hash, V> Lru<K, V> {
	/// Create an empty cache, `capacity` must be greater than zero
	pub fn new(capacity: usize) -> Self {
		if capacity == 0 {
			panic!("An Lru must be able to hold at least one entry");
		}
		Lru {
			capacity,
			entries: HashMap::new(),
			recency: BTreeMap::new(),
			tick: 0,
		}
	}
	pub fn get_capacity(&self) -> usize {
		self.capacity
	}
	pub fn len(&self) -> usize {
		self.entries.len()
	}
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
	pub fn contains(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}
	/// Look up an entry and mark it as the most recently used
	pub fn get(&mut self, key: &K) -> Option<&V> {
		let tick = self.next_tick();
		let (_, last_used) = self.entries.get_mut(key)?;
		self.recency.remove(last_used);
		*last_used = tick;
		self.recency.insert(tick, key.clone());
		self.entries.get(key).map(|(value, _)| value)
	}
	/// Look up an entry without affecting its recency
	pub fn peek(&self, key: &K) -> Option<&V> {
		self.entries.get(key).map(|(value, _)| value)
	}
	/// Mutably look up an entry without affecting its recency
	pub fn peek_mut(&mut self, key: &K) -> Option<&mut V> {
		self.entries.get_mut(key).map(|(value, _)| value)
	}
	/// Insert or replace an entry making it the most recently used. When a new
	/// key is added to a full cache the least recently used entry is evicted
	/// and returned
	pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
		let tick = self.next_tick();
		if let Some((_, last_used)) = self.entries.get(&key) {
			self.recency.remove(last_used);
		} else if self.entries.len() >= self.capacity {
			if let Some((_, oldest)) = self.recency.pop_first() {
				if let Some((evicted, _)) = self.entries.remove(&oldest) {
					self.recency.insert(tick, key.clone());
					self.entries.insert(key, (value, tick));
					return Some((oldest, evicted));
				}
			}
		}
		self.recency.insert(tick, key.clone());
		self.entries.insert(key, (value, tick));
		None
	}
	pub fn remove(&mut self, key: &K) -> Option<V> {
		let (value, last_used) = self.entries.remove(key)?;
		self.recency.remove(&last_used);
		Some(value)
	}
	/// Keep only the entries matching `keep`, returning the keys removed
	pub fn retain<F: FnMut(&K, &V) -> bool>(&mut self, mut keep: F) -> Vec<K> {
		let removed: Vec<K> = self
			.entries
			.iter()
			.filter(|(k, (v, _))| !keep(k, v))
			.map(|(k, _)| k.clone())
			.collect();
		for key in removed.iter() {
			self.remove(key);
		}
		removed
	}
	pub fn keys(&self) -> impl Iterator<Item = &K> {
		self.entries.keys()
	}
	pub fn clear(&mut self) {
		self.entries.clear();
		self.recency.clear();
	}
	fn next_tick(&mut self) -> u64 {
		self.tick += 1;
		self.tick
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn evicts_least_recently_used() {
		let mut lru = Lru::new(2);
		lru.put(1, "a");
		lru.put(2, "b");
		// touching 1 leaves 2 as the oldest
		assert_eq!(Some(&"a"), lru.get(&1));
		let evicted = lru.put(3, "c");
		assert_eq!(Some((2, "b")), evicted);
		assert!(lru.contains(&1));
		assert!(lru.contains(&3));
		assert_eq!(2, lru.len());
	}
	#[test]
	fn peek_keeps_recency() {
		let mut lru = Lru::new(2);
		lru.put(1, "a");
		lru.put(2, "b");
		assert_eq!(Some(&"a"), lru.peek(&1));
		let evicted = lru.put(3, "c");
		assert_eq!(Some((1, "a")), evicted);
	}
	#[test]
	fn replace_does_not_evict() {
		let mut lru = Lru::new(2);
		lru.put(1, "a");
		lru.put(2, "b");
		assert_eq!(None, lru.put(1, "z"));
		assert_eq!(Some(&"z"), lru.peek(&1));
		assert_eq!(2, lru.len());
	}
	#[test]
	fn retain_and_remove() {
		let mut lru = Lru::new(8);
		for i in 0..6 {
			lru.put(i, i * 10);
		}
		let mut removed = lru.retain(|k, _| k % 2 == 0);
		removed.sort();
		assert_eq!(vec![1, 3, 5], removed);
		assert_eq!(Some(20), lru.remove(&2));
		assert_eq!(2, lru.len());
		lru.clear();
		assert!(lru.is_empty());
	}
}
