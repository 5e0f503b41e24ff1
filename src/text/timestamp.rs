use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Renders a post timestamp the way the feed displays it: "Today 3:41 PM",
/// "Yesterday 9:12 AM", or "9/8 7:05 PM".
///
/// Parsing is two-stage: full RFC 3339 first, then the WordPress `date`
/// shape `YYYY-MM-DDTHH:mm:ss` (no zone designator) interpreted in `tz`.
/// If both fail the raw input is returned unchanged; this never errors.
pub fn display_timestamp(iso: &str, tz: Tz) -> String {
    display_timestamp_at(iso, tz, Utc::now())
}

/// Same as [`display_timestamp`] but with an injected "now", so the
/// Today/Yesterday boundaries can be pinned in tests.
///
/// Day comparison happens in `tz`, not UTC: a post from 11 PM Eastern is
/// still "Today" for an Eastern reader even once UTC has rolled over.
pub fn display_timestamp_at(iso: &str, tz: Tz, now: DateTime<Utc>) -> String {
    let instant = match parse(iso, tz) {
        Some(instant) => instant,
        None => return iso.to_string(),
    };

    let local = instant.with_timezone(&tz);
    let now_local = now.with_timezone(&tz);
    let clock = local.format("%-I:%M %p");

    let day = local.date_naive();
    let today = now_local.date_naive();
    if day == today {
        return format!("Today {clock}");
    }
    if Some(day) == today.pred_opt() {
        return format!("Yesterday {clock}");
    }
    local.format("%-m/%-d %-I:%M %p").to_string()
}

fn parse(iso: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(iso) {
        return Some(parsed.with_timezone(&Utc));
    }

    // WordPress `date` usually carries no zone designator; it is wall-clock
    // time in the site's zone. Ambiguous local times (DST fall-back) take
    // the earlier offset; nonexistent ones (spring-forward gap) give None.
    let naive = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S").ok()?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
