use time::format_description::well_known::{Iso8601, Rfc3339};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Fixed-width UTC layout used in the `note` table. Text order equals
/// chronological order, which the list sorts rely on.
const STORAGE_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
);

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Fails when the UTC instant falls outside the representable year range.
pub fn to_storage(value: OffsetDateTime) -> Result<String, time::error::Format> {
    to_utc(value)
        .ok_or(time::error::Format::InvalidComponent("offset"))?
        .format(STORAGE_FORMAT)
}

/// `None` when shifting to UTC leaves the supported year range.
pub fn to_utc(value: OffsetDateTime) -> Option<OffsetDateTime> {
    value.checked_to_offset(UtcOffset::UTC)
}

pub fn from_storage(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(raw, STORAGE_FORMAT).map(PrimitiveDateTime::assume_utc)
}

/// Parses an ISO-8601 timestamp from an export file. Values without an
/// offset are taken as UTC.
pub fn parse_iso8601(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }
    if let Ok(value) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(value);
    }
    PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
    use super::{from_storage, parse_iso8601, to_storage, to_utc};
    use time::macros::datetime;

    #[test]
    fn storage_format_is_fixed_width_and_reversible() {
        let value = datetime!(2026-03-04 05:06:07.5 UTC);
        let stored = to_storage(value).expect("timestamp should format");
        assert_eq!(stored, "2026-03-04T05:06:07.500000Z");
        assert_eq!(from_storage(&stored).expect("stored value parses"), value);
    }

    #[test]
    fn storage_format_normalizes_offsets_to_utc() {
        let value = datetime!(2026-03-04 07:00:00 +02:00);
        assert_eq!(
            to_storage(value).expect("timestamp should format"),
            "2026-03-04T05:00:00.000000Z"
        );
    }

    #[test]
    fn storage_text_order_matches_time_order() {
        let earlier = to_storage(datetime!(2026-03-04 05:06:07.9 UTC)).expect("formats");
        let later = to_storage(datetime!(2026-03-04 05:06:08 UTC)).expect("formats");
        assert!(earlier < later);
    }

    #[test]
    fn parses_rfc3339_and_naive_iso_timestamps() {
        assert_eq!(
            parse_iso8601("2025-01-02T03:04:05Z"),
            Some(datetime!(2025-01-02 03:04:05 UTC))
        );
        assert_eq!(
            parse_iso8601("2025-01-02T03:04:05.250000"),
            Some(datetime!(2025-01-02 03:04:05.25 UTC))
        );
        assert_eq!(
            parse_iso8601("2025-01-02T05:04:05+02:00"),
            Some(datetime!(2025-01-02 03:04:05 UTC))
        );
        assert_eq!(parse_iso8601("  "), None);
        assert_eq!(parse_iso8601("yesterday"), None);
    }

    #[test]
    fn offsets_past_the_last_representable_year_are_refused() {
        let edge = parse_iso8601("9999-12-31T23:30:00-01:00").expect("valid RFC 3339");
        assert_eq!(to_utc(edge), None);
        assert!(to_storage(edge).is_err());
        assert_eq!(
            to_utc(datetime!(9999-12-31 22:30 -01:00)),
            Some(datetime!(9999-12-31 23:30 UTC))
        );
    }
}
