use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Local wall-clock time without an offset.
///
/// Deadlines are stored as naive local date/time pairs, so every comparison
/// against them happens in this frame. Falls back to UTC when the local offset
/// cannot be determined (e.g. multi-threaded processes on some Unix targets).
pub fn local_now() -> PrimitiveDateTime {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let now = OffsetDateTime::now_utc().to_offset(offset);
    PrimitiveDateTime::new(now.date(), now.time())
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
