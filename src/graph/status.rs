use serde::Serialize;

/// Transient change status attached to a rendered node or edge.
///
/// Timestamps are wall-clock milliseconds. Expiry is a pure function of the
/// status and the caller's `now`; nothing in the pipeline ages statuses on
/// its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Stable,
    New {
        at: i64,
    },
    Changed {
        at: i64,
        old_cost: Option<u32>,
    },
    Removed {
        at: i64,
    },
}

impl Status {
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Status::Stable => None,
            Status::New { at } | Status::Changed { at, .. } | Status::Removed { at } => Some(*at),
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Status::Removed { .. })
    }

    fn elapsed(&self, now: i64, ttl_ms: i64) -> bool {
        self.timestamp().is_some_and(|at| now - at >= ttl_ms)
    }

    /// A tombstone whose fade-out window has passed.
    pub fn is_expired(&self, now: i64, ttl_ms: i64) -> bool {
        self.is_removed() && self.elapsed(now, ttl_ms)
    }

    /// Decay New/Changed back to Stable once the highlight window has passed.
    /// Tombstones are left alone; callers drop them via `is_expired`.
    pub fn settle(self, now: i64, ttl_ms: i64) -> Status {
        match self {
            Status::New { .. } | Status::Changed { .. } if self.elapsed(now, ttl_ms) => {
                Status::Stable
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn settle_and_expire() {
        let ttl = 1_000;

        assert_eq!(Status::New { at: 0 }.settle(999, ttl), Status::New { at: 0 });
        assert_eq!(Status::New { at: 0 }.settle(1_000, ttl), Status::Stable);
        assert_eq!(
            Status::Changed { at: 0, old_cost: Some(5) }.settle(5_000, ttl),
            Status::Stable
        );
        assert_eq!(Status::Removed { at: 0 }.settle(5_000, ttl), Status::Removed { at: 0 });

        assert!(!Status::Removed { at: 0 }.is_expired(500, ttl));
        assert!(Status::Removed { at: 0 }.is_expired(1_500, ttl));
        assert!(!Status::New { at: 0 }.is_expired(1_500, ttl));
        assert!(!Status::Stable.is_expired(i64::MAX, ttl));
    }

    #[test]
    fn serializes_as_tagged_union() {
        let json = serde_json::to_value(Status::Changed { at: 7, old_cost: Some(10) }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "changed", "at": 7, "old_cost": 10 })
        );
        assert_eq!(
            serde_json::to_value(Status::Stable).unwrap(),
            serde_json::json!({ "status": "stable" })
        );
    }
}
