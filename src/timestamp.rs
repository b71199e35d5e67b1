use time::OffsetDateTime;

/// Serde format for stored timestamps. Fixed width and always UTC, so they
/// order correctly as text.
pub mod fixed_utc {
    use serde::{de, ser, Deserialize, Deserializer, Serializer};
    use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, UtcOffset};

    const FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9][offset_hour sign:mandatory]:[offset_minute]"
    );

    pub fn serialize<S: Serializer>(at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = at.to_offset(UtcOffset::UTC).format(FORMAT).map_err(ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&text, FORMAT).map_err(de::Error::custom)
    }
}

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
