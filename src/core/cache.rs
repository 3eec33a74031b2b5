//! Back-reference caches for the Writer and the Reader.
//!
//! Index 0 on the wire means null and is never stored; stored values are
//! numbered from 1 in the order they were first written or read.
//!
//! In tree mode both caches grow for the whole session. In stream mode only
//! text and binary values no longer than `max_item_size` are cached, and the
//! oldest entry is evicted (FIFO) once more than `max_cache_entries` are held.
//! Eviction shifts the reader's indices down by one; the writer mirrors this
//! by numbering entries with absolute sequence numbers and subtracting the
//! eviction count.

use crate::config::StreamCacheConfig;
use crate::error::{CodecError, Result};
use crate::types::{Binder, Value};
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

/// Caching policy of a codec session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Unbounded cache, full shared-structure fidelity
    Tree,
    /// Bounded cache for long-lived connections
    Stream(StreamCacheConfig),
}

impl CacheMode {
    /// Whether a value of the given kind and size is stored under this policy.
    #[inline]
    fn admits(&self, scalar: bool, size: usize) -> bool {
        match self {
            CacheMode::Tree => true,
            CacheMode::Stream(limits) => scalar && size <= limits.max_item_size,
        }
    }

    #[inline]
    fn max_entries(&self) -> Option<usize> {
        match self {
            CacheMode::Tree => None,
            CacheMode::Stream(limits) => Some(limits.max_cache_entries),
        }
    }
}

/// Writer-side cache key. Text and binary compare by content, lists and
/// dictionaries by allocation identity.
#[derive(Debug, Clone)]
pub enum CacheKey {
    Text(Arc<str>),
    Bin(Bytes),
    List(Arc<Vec<Value>>),
    Dict(Arc<Binder>),
}

impl CacheKey {
    fn is_scalar(&self) -> bool {
        matches!(self, CacheKey::Text(_) | CacheKey::Bin(_))
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CacheKey::Text(a), CacheKey::Text(b)) => a == b,
            (CacheKey::Bin(a), CacheKey::Bin(b)) => a == b,
            (CacheKey::List(a), CacheKey::List(b)) => Arc::ptr_eq(a, b),
            (CacheKey::Dict(a), CacheKey::Dict(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CacheKey::Text(s) => s.hash(state),
            CacheKey::Bin(b) => b.hash(state),
            CacheKey::List(l) => (Arc::as_ptr(l) as usize).hash(state),
            CacheKey::Dict(d) => (Arc::as_ptr(d) as usize).hash(state),
        }
    }
}

/// Statistics about a codec cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries
    pub entries: usize,
    /// Maximum allowed entries, `None` in tree mode
    pub max_entries: Option<usize>,
    /// Back-references emitted or resolved
    pub hits: u64,
    /// Entries dropped by FIFO eviction
    pub evictions: u64,
    /// Whether the session is in stream mode
    pub stream_mode: bool,
}

/// Encode-side `value -> index` table
#[derive(Debug)]
pub struct WriteCache {
    mode: CacheMode,
    /// Key to absolute sequence number
    index: HashMap<CacheKey, u64>,
    /// Insertion order for FIFO eviction in stream mode
    insertion_order: VecDeque<CacheKey>,
    next_seq: u64,
    evicted: u64,
    hits: u64,
}

impl WriteCache {
    pub fn new() -> Self {
        Self {
            mode: CacheMode::Tree,
            index: HashMap::new(),
            insertion_order: VecDeque::new(),
            next_seq: 0,
            evicted: 0,
            hits: 0,
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Drop every entry and switch to the bounded policy.
    pub fn enter_stream_mode(&mut self, limits: StreamCacheConfig) {
        self.index.clear();
        self.insertion_order.clear();
        self.next_seq = 0;
        self.evicted = 0;
        self.mode = CacheMode::Stream(limits);
    }

    /// Wire index (1-based) of a cached value.
    pub fn lookup(&mut self, key: &CacheKey) -> Option<u64> {
        let seq = *self.index.get(key)?;
        self.hits += 1;
        Some(seq - self.evicted + 1)
    }

    /// Record a value that is about to be written in full.
    pub fn insert(&mut self, key: CacheKey, size: usize) {
        if !self.mode.admits(key.is_scalar(), size) {
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(max) = self.mode.max_entries() {
            self.insertion_order.push_back(key.clone());
            self.index.insert(key, seq);
            while self.insertion_order.len() > max {
                if let Some(oldest) = self.insertion_order.pop_front() {
                    self.index.remove(&oldest);
                    self.evicted += 1;
                    trace!(evicted = self.evicted, "Writer cache evicted oldest entry");
                }
            }
        } else {
            self.index.insert(key, seq);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.index.len(),
            max_entries: self.mode.max_entries(),
            hits: self.hits,
            evictions: self.evicted,
            stream_mode: matches!(self.mode, CacheMode::Stream(_)),
        }
    }
}

impl Default for WriteCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a slot reserved for a container whose contents are still being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(usize);

/// Decode-side `index -> value` sequence
#[derive(Debug)]
pub struct ReadCache {
    mode: CacheMode,
    /// `None` marks a container that is still being decoded
    entries: VecDeque<Option<Value>>,
    hits: u64,
    evictions: u64,
}

impl ReadCache {
    pub fn new() -> Self {
        Self {
            mode: CacheMode::Tree,
            entries: VecDeque::new(),
            hits: 0,
            evictions: 0,
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn enter_stream_mode(&mut self, limits: StreamCacheConfig) {
        self.entries.clear();
        self.mode = CacheMode::Stream(limits);
    }

    /// Append a decoded text or binary value.
    pub fn push_scalar(&mut self, value: &Value, size: usize) {
        if !self.mode.admits(true, size) {
            return;
        }
        self.entries.push_back(Some(value.clone()));
        if let Some(max) = self.mode.max_entries() {
            while self.entries.len() > max {
                self.entries.pop_front();
                self.evictions += 1;
            }
        }
    }

    /// Reserve the next index for a list or dictionary before reading its contents.
    ///
    /// Containers are never cached in stream mode, so no eviction can move a
    /// reserved slot.
    pub fn reserve_container(&mut self) -> Option<Slot> {
        if !self.mode.admits(false, 0) {
            return None;
        }
        self.entries.push_back(None);
        Some(Slot(self.entries.len() - 1))
    }

    pub fn fill(&mut self, slot: Slot, value: &Value) {
        if let Some(entry) = self.entries.get_mut(slot.0) {
            *entry = Some(value.clone());
        }
    }

    /// Resolve a non-zero wire index.
    pub fn get(&mut self, index: u64) -> Result<Value> {
        let position = usize::try_from(index - 1).ok();
        match position.and_then(|p| self.entries.get(p)) {
            Some(Some(value)) => {
                self.hits += 1;
                Ok(value.clone())
            }
            _ => Err(CodecError::InvalidCacheReference {
                index,
                available: self.entries.len(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            max_entries: self.mode.max_entries(),
            hits: self.hits,
            evictions: self.evictions,
            stream_mode: matches!(self.mode, CacheMode::Stream(_)),
        }
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new()
    }
}
