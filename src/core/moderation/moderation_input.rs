// Parsing for moderator-typed input from modals and slash options.
//
// Pure functions over strings; the Discord layer resolves the parsed query
// against the guild's members.

use std::time::Duration;
use thiserror::Error;

/// Discord refuses timeouts longer than 28 days.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(28 * 24 * 60 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("No user given")]
    EmptyQuery,

    #[error("`{0}` is not a whole number")]
    NotANumber(String),

    #[error("Timeout duration must be longer than zero")]
    ZeroDuration,

    #[error("Timeout duration cannot exceed 28 days")]
    DurationTooLong,
}

/// How a moderator referred to the target member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberQuery {
    /// A mention or a raw snowflake.
    Id(u64),
    /// Legacy `name#1234` tag.
    Tag { name: String, discriminator: String },
    /// Anything else: matched against usernames and display names.
    Name(String),
}

impl MemberQuery {
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let mut s = input.trim();

        if let Some(inner) = s.strip_prefix("<@").and_then(|r| r.strip_suffix('>')) {
            s = inner.strip_prefix('!').unwrap_or(inner);
        }
        let s = s.trim_start_matches('@').trim();

        if s.is_empty() {
            return Err(InputError::EmptyQuery);
        }

        if s.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(id) = s.parse::<u64>() {
                return Ok(MemberQuery::Id(id));
            }
        }

        if let Some((name, discriminator)) = s.rsplit_once('#') {
            if !name.is_empty()
                && discriminator.len() == 4
                && discriminator.chars().all(|c| c.is_ascii_digit())
            {
                return Ok(MemberQuery::Tag {
                    name: name.to_string(),
                    discriminator: discriminator.to_string(),
                });
            }
        }

        Ok(MemberQuery::Name(s.to_string()))
    }

    /// Case-insensitive match against a member's names. Name queries match
    /// as substrings, like the moderator typing part of a nickname.
    pub fn matches(
        &self,
        user_id: u64,
        username: &str,
        discriminator: Option<u16>,
        display_name: Option<&str>,
    ) -> bool {
        match self {
            MemberQuery::Id(id) => *id == user_id,
            MemberQuery::Tag {
                name,
                discriminator: wanted,
            } => {
                username.eq_ignore_ascii_case(name)
                    && discriminator.map(|d| format!("{:04}", d)).as_deref() == Some(wanted.as_str())
            }
            MemberQuery::Name(needle) => {
                let needle = needle.to_lowercase();
                username.to_lowercase().contains(&needle)
                    || display_name
                        .map(|d| d.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            }
        }
    }

    /// Text to hand to a member search, if the query is not an id.
    pub fn search_term(&self) -> Option<&str> {
        match self {
            MemberQuery::Id(_) => None,
            MemberQuery::Tag { name, .. } => Some(name),
            MemberQuery::Name(name) => Some(name),
        }
    }
}

fn parse_field(value: Option<&str>) -> Result<u64, InputError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<u64>()
        .map_err(|_| InputError::NotANumber(value.to_string()))
}

/// Combine the seconds/minutes/hours fields of the timeout form.
/// Blank fields count as zero.
pub fn timeout_duration(
    seconds: Option<&str>,
    minutes: Option<&str>,
    hours: Option<&str>,
) -> Result<Duration, InputError> {
    let (seconds, minutes, hours) = (
        parse_field(seconds)?,
        parse_field(minutes)?,
        parse_field(hours)?,
    );
    timeout_from_parts(seconds, minutes, hours)
}

/// Validate a timeout given as numbers.
pub fn timeout_from_parts(seconds: u64, minutes: u64, hours: u64) -> Result<Duration, InputError> {
    let total = seconds
        .checked_add(minutes.saturating_mul(60))
        .and_then(|t| t.checked_add(hours.saturating_mul(3600)))
        .ok_or(InputError::DurationTooLong)?;

    let duration = Duration::from_secs(total);
    if duration.is_zero() {
        Err(InputError::ZeroDuration)
    } else if duration > MAX_TIMEOUT {
        Err(InputError::DurationTooLong)
    } else {
        Ok(duration)
    }
}

/// Human-readable "1h 5m 3s" form.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        (total % 86_400) / 3600,
        (total % 3600) / 60,
        total % 60,
    );

    let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m"), (seconds, "s")]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mentions_and_ids() {
        assert_eq!(MemberQuery::parse("<@123>"), Ok(MemberQuery::Id(123)));
        assert_eq!(MemberQuery::parse("<@!456>"), Ok(MemberQuery::Id(456)));
        assert_eq!(MemberQuery::parse("  789  "), Ok(MemberQuery::Id(789)));
        assert_eq!(MemberQuery::parse("@789"), Ok(MemberQuery::Id(789)));
    }

    #[test]
    fn parses_tags_and_names() {
        assert_eq!(
            MemberQuery::parse("Ferris#0042"),
            Ok(MemberQuery::Tag {
                name: "Ferris".to_string(),
                discriminator: "0042".to_string()
            })
        );
        assert_eq!(
            MemberQuery::parse("@ferris"),
            Ok(MemberQuery::Name("ferris".to_string()))
        );
        // Not a valid discriminator, so it stays a name.
        assert_eq!(
            MemberQuery::parse("c#sharp"),
            Ok(MemberQuery::Name("c#sharp".to_string()))
        );
    }

    #[test]
    fn rejects_empty_queries() {
        assert_eq!(MemberQuery::parse("   "), Err(InputError::EmptyQuery));
        assert_eq!(MemberQuery::parse("<@>"), Err(InputError::EmptyQuery));
        assert_eq!(MemberQuery::parse("@"), Err(InputError::EmptyQuery));
    }

    #[test]
    fn name_query_matches_substrings_case_insensitively() {
        let query = MemberQuery::parse("ferr").unwrap();
        assert!(query.matches(1, "Ferris", None, None));
        assert!(query.matches(1, "crab", None, Some("Big Ferris")));
        assert!(!query.matches(1, "crab", None, Some("Corro")));
    }

    #[test]
    fn tag_query_needs_matching_discriminator() {
        let query = MemberQuery::parse("ferris#0042").unwrap();
        assert!(query.matches(1, "Ferris", Some(42), None));
        assert!(!query.matches(1, "Ferris", Some(43), None));
        assert!(!query.matches(1, "Ferris", None, None));
    }

    #[test]
    fn duration_sums_fields() {
        assert_eq!(
            timeout_duration(Some("30"), Some("2"), Some("1")),
            Ok(Duration::from_secs(30 + 120 + 3600))
        );
        assert_eq!(
            timeout_duration(None, Some(" 5 "), Some("")),
            Ok(Duration::from_secs(300))
        );
    }

    #[test]
    fn duration_rejects_bad_input() {
        assert_eq!(
            timeout_duration(Some("0"), None, None),
            Err(InputError::ZeroDuration)
        );
        assert_eq!(timeout_duration(None, None, None), Err(InputError::ZeroDuration));
        assert_eq!(
            timeout_duration(Some("ten"), None, None),
            Err(InputError::NotANumber("ten".to_string()))
        );
        assert_eq!(
            timeout_duration(None, None, Some("673")),
            Err(InputError::DurationTooLong)
        );
        assert_eq!(
            timeout_duration(Some(&u64::MAX.to_string()), Some("1"), None),
            Err(InputError::DurationTooLong)
        );
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 2m 3s");
        assert_eq!(format_duration(Duration::from_secs(86_400)), "1d");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
