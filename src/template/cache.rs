//! Per-compilation spec cache.
//!
//! A cache lives for exactly one compilation. It is created by the caller,
//! handed to the compiler by `&mut`, and dropped with the compiled graph, so
//! template lookups from one request can never leak into (or go stale for)
//! another.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::spec::TemplateSpec;
use crate::error::Result;

/// Cache key: the `(template_name, entrypoint)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecKey {
    pub template_name: String,
    pub entrypoint: String,
}

impl SpecKey {
    pub fn new(template_name: impl Into<String>, entrypoint: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            entrypoint: entrypoint.into(),
        }
    }
}

impl fmt::Display for SpecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.template_name, self.entrypoint)
    }
}

/// Resolved specs for one compilation run.
#[derive(Debug, Default)]
pub struct SpecCache {
    specs: HashMap<SpecKey, Arc<TemplateSpec>>,
    hits: u64,
    misses: u64,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a resolved spec from the cache, or resolve and cache it.
    ///
    /// Failed resolutions are not cached.
    pub fn get_or_resolve<F>(&mut self, key: &SpecKey, resolver: F) -> Result<Arc<TemplateSpec>>
    where
        F: FnOnce(&SpecKey) -> Result<TemplateSpec>,
    {
        if let Some(spec) = self.specs.get(key) {
            self.hits += 1;
            tracing::debug!(key = %key, "spec cache hit");
            return Ok(spec.clone());
        }

        self.misses += 1;
        let spec = Arc::new(resolver(key)?);
        self.specs.insert(key.clone(), spec.clone());
        Ok(spec)
    }

    pub fn get(&self, key: &SpecKey) -> Option<&Arc<TemplateSpec>> {
        self.specs.get(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.specs.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of resolved specs held
    pub entry_count: usize,
    pub hits: u64,
    pub misses: u64,
}
