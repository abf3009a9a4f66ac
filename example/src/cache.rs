//! Cache lookups, timed with an explicit start/end pair.

use std::collections::HashMap;

pub const SECTION: &str = "cache.lookup";

pub struct DataCache {
    entries: HashMap<String, CacheEntry>,
    max_size: usize,
}

struct CacheEntry {
    data: Vec<u8>,
    hits: u32,
}

impl DataCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            max_size: 512,
        }
    }

    pub fn get(&mut self, key: &str) -> iprof::Result<Option<Vec<u8>>> {
        let timer = iprof::global::start(SECTION)?;
        let found = self.entries.get_mut(key).map(|entry| {
            entry.hits += 1;
            entry.data.clone()
        });
        timer.end()?;
        Ok(found)
    }

    pub fn put(&mut self, key: String, data: Vec<u8>) {
        if self.entries.len() >= self.max_size {
            self.evict_one();
        }
        self.entries.insert(key, CacheEntry { data, hits: 0 });
    }

    fn evict_one(&mut self) {
        if let Some(evict_key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.hits)
            .map(|(k, _)| k.clone())
        {
            self.entries.remove(&evict_key);
        }
    }
}
