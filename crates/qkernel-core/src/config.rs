//! Defaults shared by kernel configurations.
//!
//! Per-kernel configs (sort/agg/join) live next to their kernels in
//! `qkernel-operators`; they fall back to these values for unset limits.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelDefaults {
    /// Max distinct group keys per aggregator.
    pub group_key_limit: usize,

    /// Fail (true) or drop rows (false) once `group_key_limit` is reached.
    pub stop_exceed_limit: bool,

    /// Hard cap (bytes) on an aggregator's accumulator arena.
    pub memory_limit: usize,

    /// Accumulator slots reserved per arena chunk.
    pub arena_chunk_slots: usize,
}

impl Default for KernelDefaults {
    fn default() -> Self {
        Self {
            group_key_limit: 1_000_000,
            stop_exceed_limit: false,
            memory_limit: 256 * 1024 * 1024, // 256 MiB
            arena_chunk_slots: 1024,
        }
    }
}

impl KernelDefaults {
    /// Create defaults from environment variables, falling back to `Default`.
    ///
    /// Environment variables:
    /// - `QKERNEL_GROUP_KEY_LIMIT`: max distinct groups
    /// - `QKERNEL_STOP_EXCEED_LIMIT`: `true`/`false`
    /// - `QKERNEL_MEMORY_LIMIT`: accumulator arena cap in bytes
    /// - `QKERNEL_ARENA_CHUNK_SLOTS`: slots per arena chunk
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("QKERNEL_GROUP_KEY_LIMIT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.group_key_limit = v;
            }
        }

        if let Ok(s) = std::env::var("QKERNEL_STOP_EXCEED_LIMIT") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.stop_exceed_limit = v;
            }
        }

        if let Ok(s) = std::env::var("QKERNEL_MEMORY_LIMIT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.memory_limit = v;
            }
        }

        if let Ok(s) = std::env::var("QKERNEL_ARENA_CHUNK_SLOTS") {
            if let Ok(v) = s.parse::<usize>() {
                if v > 0 {
                    cfg.arena_chunk_slots = v;
                }
            }
        }

        cfg
    }
}
