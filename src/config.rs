//! Engine configuration
//!
//! Options are plain data resolved once at engine construction. The
//! default cache budget honours an environment override, read exactly
//! once per process; there is no mutable global configuration.

use lazy_static::lazy_static;

/// Default cache budget when no override is present: 256 MiB
const DEFAULT_CACHE_BYTES: u64 = 256 * 1024 * 1024;

/// Environment variable overriding the default cache budget, in bytes
pub const CACHE_BUDGET_ENV: &str = "TIFFGRID_MAX_CACHING_MEMORY";

lazy_static! {
    static ref RESOLVED_CACHE_BUDGET: u64 = std::env::var(CACHE_BUDGET_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_CACHE_BYTES);
}

/// The process-wide default cache budget in bytes
pub fn default_cache_budget() -> u64 {
    *RESOLVED_CACHE_BUDGET
}

/// Options recognized by the engine
#[derive(Debug, Clone)]
pub struct TiffOptions {
    /// Cache budget in bytes; 0 disables caching
    pub max_caching_memory: u64,
    /// Writer only: emit BigTIFF (64-bit offsets and lengths)
    pub big_tiff: bool,
    /// Writer only: emit little-endian files
    pub little_endian: bool,
    /// Reader strictness: fail on structures a lenient reader would
    /// log and skip
    pub require_valid_tiff: bool,
    /// Copier: stream encoded bytes without transcoding when possible
    pub direct_copy: bool,
}

impl Default for TiffOptions {
    fn default() -> Self {
        TiffOptions {
            max_caching_memory: default_cache_budget(),
            big_tiff: false,
            little_endian: true,
            require_valid_tiff: true,
            direct_copy: false,
        }
    }
}
