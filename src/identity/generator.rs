//! Substitutable sources of UUIDs and time

use uuid::Uuid;

/// Produces identifiers for entities created without one
pub trait UuidGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (version 4) UUIDs
#[derive(Debug, Clone, Default)]
pub struct RandomUuidGenerator {
    strip_hyphens: bool,
}

impl RandomUuidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the 32-digit simple form, e.g. `67e5504410b1426f9247bb680e5fe0c8`
    pub fn without_hyphens() -> Self {
        Self { strip_hyphens: true }
    }
}

impl UuidGenerator for RandomUuidGenerator {
    fn generate(&self) -> String {
        let id = Uuid::new_v4();
        if self.strip_hyphens {
            id.simple().to_string()
        } else {
            id.hyphenated().to_string()
        }
    }
}

/// Wall clock in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_uuids_are_unique_and_parse() {
        let generator = RandomUuidGenerator::new();
        let ids: HashSet<String> = (0..100).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 100);
        for id in &ids {
            assert_eq!(id.len(), 36);
            assert_eq!(Uuid::parse_str(id).unwrap().get_version_num(), 4);
        }
    }

    #[test]
    fn test_without_hyphens() {
        let id = RandomUuidGenerator::without_hyphens().generate();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_system_clock_is_current() {
        let now = SystemClock.now_millis();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800_000);
    }
}
