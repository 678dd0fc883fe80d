//! Layer cache entry entity (spec §3, §4.2) — content-addressed dependency
//! image layers keyed by `(pythonVersion, sorted packages)`.

use crate::id::define_uuid_id;
use crate::program::PackageSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

define_uuid_id! {
    /// Unique identifier for a [`LayerCacheEntry`].
    pub struct LayerCacheEntryId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerCacheEntry {
    pub id: LayerCacheEntryId,
    pub cache_key: String,
    pub image_tag: String,
    pub python_version: String,
    pub packages_hash: String,
    pub package_count: usize,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub use_count: u64,
}

/// `cacheKey = H(pythonVersion ‖ "\n".join(sort(pkg.name.lower()+"=="+pkg.version+"["+sort(extras)+"]")))`
///
/// Package names are lowercased before sorting so that case differences in
/// user input never produce distinct cache entries for the same dependency
/// set (spec §4.2).
pub fn compute_cache_key(python_version: &str, packages: &[PackageSpec]) -> String {
    let mut lines: Vec<String> = packages
        .iter()
        .map(|p| {
            let mut extras = p.extras.clone();
            extras.sort();
            format!("{}=={}[{}]", p.name.to_lowercase(), p.version, extras.join(","))
        })
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    hasher.update(python_version.as_bytes());
    hasher.update(b"\n");
    hasher.update(lines.join("\n").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `H` applied directly to the already-canonicalised packages hash component,
/// used by the build engine to detect whether two package lists collapse to
/// the same dependency layer independent of python version.
pub fn compute_packages_hash(packages: &[PackageSpec]) -> String {
    let mut lines: Vec<String> = packages
        .iter()
        .map(|p| {
            let mut extras = p.extras.clone();
            extras.sort();
            format!("{}=={}[{}]", p.name.to_lowercase(), p.version, extras.join(","))
        })
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    hasher.update(lines.join("\n").as_bytes());
    format!("{:x}", hasher.finalize())
}

impl LayerCacheEntry {
    pub fn record_use(&mut self, now: DateTime<Utc>) {
        self.use_count += 1;
        self.last_used_at = now;
    }
}

crate::builder! {
    pub struct LayerCacheEntryBuilder => LayerCacheEntry {
        into {
            cache_key: String = "cachekey",
            image_tag: String = "deps-cachekey",
            python_version: String = "3.12",
            packages_hash: String = "packageshash",
        }
        set {
            package_count: usize = 0,
            use_count: u64 = 0,
        }
        option {
            size_bytes: u64 = None,
        }
        computed {
            id: LayerCacheEntryId = LayerCacheEntryId::new(),
            created_at: DateTime<Utc> = Utc::now(),
            last_used_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "layer_cache_tests.rs"]
mod tests;
