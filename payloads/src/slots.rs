//! Slot availability engine.
//!
//! Pure functions over (existing intervals, proposed booking, reference
//! now). The booking screen calls [`day_availability`] to enable/disable
//! entries in the fixed start-time menu, and the store calls
//! [`is_start_enabled`] again at submission time because the snapshot the
//! menu was computed from may be stale by the time the user submits.
//!
//! Durations and amounts are fixed by game type: Snooker is billed per
//! 30-minute game, 8 Ball Pool as a flat one-hour block.

use jiff::civil::{Date, Time, time};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::GameType;

/// First bookable start time of the day.
pub const FIRST_START: Time = time(10, 0, 0, 0);

/// Last bookable start time of the day.
pub const LAST_START: Time = time(21, 30, 0, 0);

/// Spacing of the start-time menu, in minutes.
pub const SLOT_STEP_MINUTES: i32 = 30;

const SNOOKER_MINUTES_PER_GAME: i32 = 30;
const POOL_BLOCK_MINUTES: i32 = 60;

const SNOOKER_RATE_INR: i64 = 80;
const POOL_RATE_INR: i64 = 120;

/// A half-open `[start, end)` wall-clock interval within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: Time,
    pub end: Time,
}

impl Interval {
    /// Half-open overlap: `[s1,e1)` conflicts with `[s2,e2)` iff
    /// `s1 < e2 && e1 > s2`. Back-to-back intervals do not conflict.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Availability of one entry in the start-time menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub start: Time,
    pub end: Time,
    pub available: bool,
}

/// Snooker is booked as a number of games; a missing count means one game.
/// Counts below one are treated as one rather than rejected, matching the
/// form's free-text count field which falls back to a single game.
pub fn unit_count_or_default(raw: Option<i32>) -> i32 {
    raw.unwrap_or(1).max(1)
}

pub fn duration_minutes(game: GameType, unit_count: i32) -> i32 {
    match game {
        GameType::Snooker => SNOOKER_MINUTES_PER_GAME * unit_count.max(1),
        // the count input is ignored for pool; it is always one hour
        GameType::EightBallPool => POOL_BLOCK_MINUTES,
    }
}

/// Price in rupees: Snooker ₹80 per game, pool ₹120 flat.
pub fn amount_inr(game: GameType, unit_count: i32) -> Decimal {
    match game {
        GameType::Snooker => {
            Decimal::from(SNOOKER_RATE_INR * i64::from(unit_count.max(1)))
        }
        GameType::EightBallPool => Decimal::from(POOL_RATE_INR),
    }
}

fn minutes_of_day(t: Time) -> i32 {
    i32::from(t.hour()) * 60 + i32::from(t.minute())
}

fn time_from_minutes(m: i32) -> Time {
    time((m / 60) as i8, (m % 60) as i8, 0, 0)
}

/// The interval a booking would occupy, or `None` if it would run past
/// midnight and so cannot fit on the booking's calendar day.
pub fn booked_interval(
    game: GameType,
    start: Time,
    unit_count: i32,
) -> Option<Interval> {
    let end_minutes =
        minutes_of_day(start) + duration_minutes(game, unit_count);
    if end_minutes > 24 * 60 {
        return None;
    }
    let end = if end_minutes == 24 * 60 {
        // wall-clock times top out just short of midnight; a booking ending
        // exactly then is represented by the last second of the day
        time(23, 59, 59, 0)
    } else {
        time_from_minutes(end_minutes)
    };
    Some(Interval { start, end })
}

/// The fixed menu of candidate start times, every half hour from
/// [`FIRST_START`] through [`LAST_START`].
pub fn start_menu() -> Vec<Time> {
    let mut starts = Vec::new();
    let mut m = minutes_of_day(FIRST_START);
    while m <= minutes_of_day(LAST_START) {
        starts.push(time_from_minutes(m));
        m += SLOT_STEP_MINUTES;
    }
    starts
}

/// Whether a candidate interval may be booked.
///
/// A candidate is disabled iff it conflicts with an existing holding
/// interval, or the booking date is today and the start has already
/// passed. Nothing else disables a slot; in particular the advertised
/// daily play limits are not enforced here.
pub fn is_start_enabled(
    existing: &[Interval],
    candidate: &Interval,
    date: Date,
    today: Date,
    now: Time,
) -> bool {
    if date < today {
        return false;
    }
    if date == today && candidate.start < now {
        return false;
    }
    !existing.iter().any(|held| held.overlaps(candidate))
}

/// Availability for every entry in the start-time menu on the given date.
/// Menu entries whose interval cannot be constructed (the duration would
/// cross midnight) are omitted.
pub fn day_availability(
    existing: &[Interval],
    game: GameType,
    unit_count: i32,
    date: Date,
    today: Date,
    now: Time,
) -> Vec<SlotAvailability> {
    start_menu()
        .into_iter()
        .filter_map(|start| booked_interval(game, start, unit_count))
        .map(|candidate| SlotAvailability {
            start: candidate.start,
            end: candidate.end,
            available: is_start_enabled(existing, &candidate, date, today, now),
        })
        .collect()
}
