//! String Interning Pool
//!
//! Deduplicated storage for names, text and namespace URIs. Documents own
//! their pool, so a document never borrows from the bytes it was parsed
//! from and can be mutated or promoted freely.
//!
//! ID 0 is reserved for the empty string.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// (offset, length) into the pool buffer
#[derive(Debug, Clone, Copy)]
struct Entry {
    offset: u32,
    len: u32,
}

/// String interning pool
#[derive(Debug, Clone)]
pub struct StringPool {
    entries: Vec<Entry>,
    data: String,
    /// Content hash -> IDs with that hash (collisions are rare)
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(256);
        entries.push(Entry { offset: 0, len: 0 });
        StringPool {
            entries,
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            if let Some(&id) = ids.iter().find(|&&id| self.get(id) == s) {
                return id;
            }
        }

        let id = self.entries.len() as u32;
        self.entries.push(Entry {
            offset: self.data.len() as u32,
            len: s.len() as u32,
        });
        self.data.push_str(s);
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Intern raw bytes, replacing invalid UTF-8
    pub fn intern_bytes(&mut self, bytes: &[u8]) -> u32 {
        self.intern(&String::from_utf8_lossy(bytes))
    }

    /// ID of an already interned string
    pub fn lookup(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.hash_index
            .get(&Self::compute_hash(s))?
            .iter()
            .copied()
            .find(|&id| self.get(id) == s)
    }

    /// String for an ID, empty for unknown IDs
    pub fn get(&self, id: u32) -> &str {
        self.entries
            .get(id as usize)
            .and_then(|e| {
                let start = e.offset as usize;
                self.data.get(start..start + e.len as usize)
            })
            .unwrap_or("")
    }

    /// Number of distinct strings, the empty string included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}
