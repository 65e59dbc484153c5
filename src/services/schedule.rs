//! Resolution of a spacetime's effective meeting and of its occurrence dates.
//!
//! Everything here is a pure function of stored rows and the supplied date, so
//! callers must resolve again on every read instead of caching results.

use chrono::{Days, NaiveDate};

use crate::models::{DayOfWeek, Meeting, Override, Spacetime, SpacetimeView};

/// Meeting information that applies to `spacetime` as of `as_of`.
///
/// An attached override wins until its date is strictly in the past; after
/// that the base fields apply again without any cleanup.
pub fn effective(
    spacetime: &Spacetime,
    schedule_override: Option<&Override>,
    as_of: NaiveDate,
) -> Meeting {
    match schedule_override {
        Some(o) if o.spacetime_id == spacetime.id && !o.is_expired(as_of) => o.meeting(),
        _ => spacetime.base(),
    }
}

pub fn view(
    spacetime: Spacetime,
    schedule_override: Option<Override>,
    as_of: NaiveDate,
) -> SpacetimeView {
    let effective = effective(&spacetime, schedule_override.as_ref(), as_of);
    SpacetimeView {
        spacetime,
        schedule_override,
        effective,
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(DayOfWeek::of(date).offset() as u64)
}

/// Every recurring meeting date from the week of `section_start` through
/// `valid_until`, ascending and without duplicates.
pub fn occurrence_dates(
    section_start: NaiveDate,
    valid_until: NaiveDate,
    days: &[DayOfWeek],
) -> Vec<NaiveDate> {
    let mut days = days.to_vec();
    days.sort();
    days.dedup();

    let mut dates = Vec::new();
    let mut week = week_start(section_start);
    while week < valid_until {
        for day in &days {
            let date = week + Days::new(day.offset() as u64);
            if date <= valid_until {
                dates.push(date);
            }
        }
        week = week + Days::new(7);
    }
    dates
}
