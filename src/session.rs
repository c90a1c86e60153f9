//! Session-scoped cache for the currently loaded table.
//!
//! A session holds at most one table. It is keyed by a hash of the uploaded
//! bytes together with the ingest options, so re-submitting the same file is
//! free while a new file (or a policy change) replaces the entry.

use crate::ingest::{read_games_from_bytes, GameTable, IngestOptions};
use anyhow::Result;
use std::sync::Arc;

/// 64-bit FNV-1a hash.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    content: u64,
    policy: crate::record::AvgEloPolicy,
    aliases: u64,
}

impl CacheKey {
    fn new(bytes: &[u8], options: &IngestOptions) -> Self {
        CacheKey {
            content: fnv1a(bytes),
            policy: options.policy,
            aliases: options.aliases.fingerprint(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    cached: Option<(CacheKey, Arc<GameTable>)>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Return the table for `bytes`, ingesting only when the cache misses.
    ///
    /// A failed ingest leaves the session empty: the previous table belongs to
    /// a different upload and must not be shown for this one.
    pub fn load(&mut self, bytes: &[u8], options: &IngestOptions) -> Result<Arc<GameTable>> {
        let key = CacheKey::new(bytes, options);
        if let Some((cached_key, table)) = &self.cached {
            if *cached_key == key {
                log::debug!("Session cache hit ({:016x})", key.content);
                return Ok(Arc::clone(table));
            }
        }

        log::debug!("Session cache miss ({:016x}); ingesting", key.content);
        self.cached = None;
        let table = Arc::new(read_games_from_bytes(bytes, options)?);
        self.cached = Some((key, Arc::clone(&table)));
        Ok(table)
    }

    pub fn current(&self) -> Option<Arc<GameTable>> {
        self.cached.as_ref().map(|(_, t)| Arc::clone(t))
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
