//! Per-call options for writes and warmup batches

use std::time::Duration;

use super::value::CacheValue;

/// Options accepted by `set`
///
/// Defaults: fastest tier, no TTL, priority 1, no tags or dependencies, and the
/// system-wide compression threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOptions {
    /// Target tier index; `None` writes to the fastest tier
    pub level: Option<usize>,
    /// Time to live measured from the write
    pub ttl: Option<Duration>,
    /// Caller weight, clamped to at least 1
    pub priority: u32,
    pub tags: Vec<String>,
    /// Keys this entry derives from; tracked, never cascaded
    pub dependencies: Vec<String>,
    /// Override for the compression threshold in bytes
    pub compression_threshold: Option<u64>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            level: None,
            ttl: None,
            priority: 1,
            tags: Vec::new(),
            dependencies: Vec::new(),
            compression_threshold: None,
        }
    }
}

impl SetOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: usize) -> Self {
        self.level = Some(level);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority.max(1);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.dependencies.push(key.into());
        self
    }

    pub fn compression_threshold(mut self, bytes: u64) -> Self {
        self.compression_threshold = Some(bytes);
        self
    }
}

/// One entry of a warmup batch
#[derive(Debug, Clone)]
pub struct WarmupItem {
    pub key: String,
    pub value: CacheValue,
    pub options: SetOptions,
}

impl WarmupItem {
    pub fn new(key: impl Into<String>, value: impl Into<CacheValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            options: SetOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SetOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_builders() {
        let opts = SetOptions::new()
            .level(1)
            .ttl(Duration::from_secs(5))
            .priority(0)
            .tag("frames")
            .depends_on("source.mp4");
        assert_eq!(opts.level, Some(1));
        assert_eq!(opts.priority, 1);
        assert_eq!(opts.tags, vec!["frames".to_string()]);
        assert_eq!(opts.dependencies, vec!["source.mp4".to_string()]);
    }
}
