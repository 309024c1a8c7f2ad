use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn to_u8(self) -> u8 {
        match self {
            HealthStatus::Unknown => 0,
            HealthStatus::Healthy => 1,
            HealthStatus::Unhealthy => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => HealthStatus::Healthy,
            2 => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }

    /// Status code a health endpoint should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            HealthStatus::Healthy => 200,
            _ => 503,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Unknown => "Unknown",
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Unhealthy => "Unhealthy",
        };
        f.write_str(label)
    }
}

/// Last-write-wins health flag shared between the claim worker and whatever
/// serves the health endpoint. Clones share the same cell.
#[derive(Clone, Debug)]
pub struct HealthCache {
    inner: Arc<AtomicU8>,
}

impl HealthCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(HealthStatus::Unknown.to_u8())),
        }
    }

    pub fn get(&self) -> HealthStatus {
        HealthStatus::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, status: HealthStatus) {
        self.inner.store(status.to_u8(), Ordering::Release);
    }

    pub fn is_healthy(&self) -> bool {
        self.get() == HealthStatus::Healthy
    }
}

impl Default for HealthCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unknown() {
        let cache = HealthCache::new();
        assert_eq!(cache.get(), HealthStatus::Unknown);
        assert_eq!(cache.get().http_status(), 503);
    }

    #[test]
    fn test_last_write_wins_across_clones() {
        let cache = HealthCache::new();
        let reader = cache.clone();
        cache.set(HealthStatus::Unhealthy);
        cache.set(HealthStatus::Healthy);
        assert!(reader.is_healthy());
        assert_eq!(reader.get().http_status(), 200);
        cache.set(HealthStatus::Unhealthy);
        assert_eq!(reader.get(), HealthStatus::Unhealthy);
        assert_eq!(reader.get().to_string(), "Unhealthy");
    }
}
