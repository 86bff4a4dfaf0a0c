use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can be raised while polling the presence service.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Presence API error: {0}")]
    Api(String),
}

/// Status reported for one external identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Offline,
    Online,
    InGame,
    InStudio,
    Invisible,
    Unknown(i64),
}

impl PresenceStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => PresenceStatus::Offline,
            1 => PresenceStatus::Online,
            2 => PresenceStatus::InGame,
            3 => PresenceStatus::InStudio,
            4 => PresenceStatus::Invisible,
            other => PresenceStatus::Unknown(other),
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceStatus::Offline => write!(f, "Offline"),
            PresenceStatus::Online => write!(f, "Online"),
            PresenceStatus::InGame => write!(f, "In game"),
            PresenceStatus::InStudio => write!(f, "In studio"),
            PresenceStatus::Invisible => write!(f, "Invisible"),
            PresenceStatus::Unknown(code) => write!(f, "Unknown ({code})"),
        }
    }
}

/// An external account we watch, with a label for announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedIdentity {
    pub external_id: u64,
    pub label: String,
}

impl TrackedIdentity {
    /// Parse `id:label,id:label`. Entries without a label use the id.
    /// Malformed entries are skipped.
    pub fn parse_list(raw: &str) -> Vec<TrackedIdentity> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let (id, label) = match entry.split_once(':') {
                    Some((id, label)) => (id.trim(), label.trim()),
                    None => (entry, ""),
                };
                let external_id = id.parse::<u64>().ok()?;
                let label = if label.is_empty() {
                    id.to_string()
                } else {
                    label.to_string()
                };
                Some(TrackedIdentity { external_id, label })
            })
            .collect()
    }
}

/// Emitted when a tracked identity's status changes between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub identity: TrackedIdentity,
    pub previous: PresenceStatus,
    pub current: PresenceStatus,
}

/// Port for whatever answers "what is the status of these ids".
#[async_trait]
pub trait PresenceSource: Send + Sync {
    async fn fetch_statuses(
        &self,
        external_ids: &[u64],
    ) -> Result<HashMap<u64, PresenceStatus>, PresenceError>;
}

/// Remembers the last status per identity and reports the differences.
pub struct PresenceTracker<P: PresenceSource> {
    source: P,
    tracked: Vec<TrackedIdentity>,
    last_seen: RwLock<HashMap<u64, PresenceStatus>>,
}

impl<P: PresenceSource> PresenceTracker<P> {
    pub fn new(source: P, tracked: Vec<TrackedIdentity>) -> Self {
        Self {
            source,
            tracked,
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    pub fn tracked(&self) -> &[TrackedIdentity] {
        &self.tracked
    }

    /// Fetch current statuses and return what changed since the last poll.
    ///
    /// The first sighting of an identity is recorded silently. Identities
    /// missing from the response keep their previous status.
    pub async fn poll(&self) -> Result<Vec<PresenceChange>, PresenceError> {
        if self.tracked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = self.tracked.iter().map(|t| t.external_id).collect();
        let statuses = self.source.fetch_statuses(&ids).await?;

        let mut last_seen = self.last_seen.write().await;
        let mut changes = Vec::new();

        for identity in &self.tracked {
            let Some(&current) = statuses.get(&identity.external_id) else {
                continue;
            };

            match last_seen.insert(identity.external_id, current) {
                Some(previous) if previous != current => changes.push(PresenceChange {
                    identity: identity.clone(),
                    previous,
                    current,
                }),
                _ => {}
            }
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Source that replays canned responses, one per poll.
    struct ScriptedSource {
        responses: Mutex<Vec<Result<HashMap<u64, PresenceStatus>, PresenceError>>>,
    }

    impl ScriptedSource {
        fn new(mut responses: Vec<Result<HashMap<u64, PresenceStatus>, PresenceError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl PresenceSource for ScriptedSource {
        async fn fetch_statuses(
            &self,
            _external_ids: &[u64],
        ) -> Result<HashMap<u64, PresenceStatus>, PresenceError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(HashMap::new()))
        }
    }

    fn tracked() -> Vec<TrackedIdentity> {
        TrackedIdentity::parse_list("1:alpha,2:beta")
    }

    fn statuses(entries: &[(u64, i64)]) -> HashMap<u64, PresenceStatus> {
        entries
            .iter()
            .map(|(id, code)| (*id, PresenceStatus::from_code(*code)))
            .collect()
    }

    #[test]
    fn test_parse_tracked_list() {
        let parsed = TrackedIdentity::parse_list(" 1:alpha , 2 ,bad:x, ,3: ");
        assert_eq!(
            parsed,
            vec![
                TrackedIdentity {
                    external_id: 1,
                    label: "alpha".to_string()
                },
                TrackedIdentity {
                    external_id: 2,
                    label: "2".to_string()
                },
                TrackedIdentity {
                    external_id: 3,
                    label: "3".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PresenceStatus::from_code(0), PresenceStatus::Offline);
        assert_eq!(PresenceStatus::from_code(2), PresenceStatus::InGame);
        assert_eq!(PresenceStatus::from_code(9), PresenceStatus::Unknown(9));
        assert_eq!(PresenceStatus::Unknown(9).to_string(), "Unknown (9)");
    }

    #[tokio::test]
    async fn test_first_poll_only_seeds() {
        let source = ScriptedSource::new(vec![Ok(statuses(&[(1, 0), (2, 1)]))]);
        let tracker = PresenceTracker::new(source, tracked());

        assert!(tracker.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reports_only_changes() {
        let source = ScriptedSource::new(vec![
            Ok(statuses(&[(1, 0), (2, 1)])),
            Ok(statuses(&[(1, 2), (2, 1)])),
            Ok(statuses(&[(1, 2), (2, 1)])),
        ]);
        let tracker = PresenceTracker::new(source, tracked());

        tracker.poll().await.unwrap();

        let changes = tracker.poll().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].identity.label, "alpha");
        assert_eq!(changes[0].previous, PresenceStatus::Offline);
        assert_eq!(changes[0].current, PresenceStatus::InGame);

        assert!(tracker.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_identity_keeps_state() {
        let source = ScriptedSource::new(vec![
            Ok(statuses(&[(1, 0), (2, 1)])),
            Ok(statuses(&[(1, 0)])),
            Ok(statuses(&[(1, 0), (2, 0)])),
        ]);
        let tracker = PresenceTracker::new(source, tracked());

        tracker.poll().await.unwrap();
        assert!(tracker.poll().await.unwrap().is_empty());

        let changes = tracker.poll().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].identity.external_id, 2);
        assert_eq!(changes[0].previous, PresenceStatus::Online);
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_state() {
        let source = ScriptedSource::new(vec![
            Ok(statuses(&[(1, 0)])),
            Err(PresenceError::Api("boom".to_string())),
            Ok(statuses(&[(1, 1)])),
        ]);
        let tracker = PresenceTracker::new(source, tracked());

        tracker.poll().await.unwrap();
        assert!(tracker.poll().await.is_err());

        let changes = tracker.poll().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].current, PresenceStatus::Online);
    }
}
