use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod action;
pub mod duel;
pub mod health;
pub mod validation;

pub(crate) fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
