use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed rotation interval: a new log partition begins every hour.
pub const ROTATION_INTERVAL_SECS: i64 = 60 * 60;

/// Directory-name format for a session's hour bucket. The minutes field is
/// pinned to `00` so the name doubles as the bucket's start instant.
const SESSION_ID_FORMAT: &str = "%Y-%m-%d-%H-%M";

/// Descriptor of one time-bounded log partition. The `id` names the
/// directory under the log root; `created_at` drives the staleness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Mint the session covering `now`. Ids are filesystem-safe, unique per
/// hour bucket and ordered lexicographically by creation time.
pub fn mint(now: DateTime<Utc>) -> Session {
    Session {
        id: now.format("%Y-%m-%d-%H-00").to_string(),
        created_at: now,
    }
}

/// A session goes stale once a full rotation interval has elapsed since it
/// was minted. Only primary-role instances act on this; satellites wait for
/// the broadcast.
pub fn is_stale(session: &Session, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(session.created_at).num_seconds() >= ROTATION_INTERVAL_SECS
}

/// Recover the hour-bucket instant encoded in a partition directory name.
/// Returns `None` for directories that are not session-named.
pub fn parse_id_time(id: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(id, SESSION_ID_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_mint_id_is_hour_bucket() {
        let session = mint(at(2026, 3, 9, 14, 37));
        assert_eq!(session.id, "2026-03-09-14-00");
    }

    #[test]
    fn test_mint_created_at_increases() {
        let first = mint(at(2026, 3, 9, 14, 0));
        let second = mint(at(2026, 3, 9, 15, 0));
        assert!(second.created_at > first.created_at);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_staleness_boundary() {
        let session = mint(at(2026, 3, 9, 14, 30));
        let fresh = session.created_at + Duration::seconds(ROTATION_INTERVAL_SECS - 1);
        let stale = session.created_at + Duration::seconds(ROTATION_INTERVAL_SECS);
        assert!(!is_stale(&session, fresh));
        assert!(is_stale(&session, stale));
    }

    #[test]
    fn test_parse_id_time_round_trip() {
        let minted = mint(at(2026, 3, 9, 14, 0));
        assert_eq!(parse_id_time(&minted.id), Some(minted.created_at));
    }

    #[test]
    fn test_parse_id_time_rejects_foreign_names() {
        assert_eq!(parse_id_time("logs-1710000000000"), None);
        assert_eq!(parse_id_time("not-a-session"), None);
        assert_eq!(parse_id_time(""), None);
    }
}
