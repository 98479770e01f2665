// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

const MS_PER_SECOND: i128 = 1_000;
const MS_PER_MINUTE: i128 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i128 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i128 = 24 * MS_PER_HOUR;

/// Remaining time split into calendar-free components. Field order gives the
/// derived ordering days > hours > minutes > seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeLeft {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeLeft {
    pub const ZERO: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn from_millis(diff: i128) -> Self {
        if diff <= 0 {
            return Self::ZERO;
        }
        let component = |value: i128| u64::try_from(value).unwrap_or(u64::MAX);
        Self {
            days: component(diff / MS_PER_DAY),
            hours: component((diff % MS_PER_DAY) / MS_PER_HOUR),
            minutes: component((diff % MS_PER_HOUR) / MS_PER_MINUTE),
            seconds: component((diff % MS_PER_MINUTE) / MS_PER_SECOND),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// `1d 2h 3m 4s`, omitting zero components.
    pub fn compact(&self) -> String {
        [
            (self.days, 'd'),
            (self.hours, 'h'),
            (self.minutes, 'm'),
            (self.seconds, 's'),
        ]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running(TimeLeft),
    /// The tick on which the target was first seen in the past.
    Expired,
    /// Already expired; the tick did no work.
    Stopped,
}

/// Countdown toward a single target instant.
///
/// Once expired for a target the countdown stays expired and stops ticking
/// until [`Countdown::retarget`] supplies a different instant. A missing or
/// unparseable target counts as already expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    target: Option<OffsetDateTime>,
    time_left: TimeLeft,
    expired: bool,
    expiry_pending: bool,
}

impl Countdown {
    pub fn new(target: Option<OffsetDateTime>, now: OffsetDateTime) -> Self {
        let mut countdown = Self {
            target,
            time_left: TimeLeft::ZERO,
            expired: false,
            expiry_pending: false,
        };
        countdown.recompute(now);
        countdown
    }

    pub fn from_raw(raw: Option<&str>, now: OffsetDateTime) -> Self {
        Self::new(raw.and_then(crate::parse_instant), now)
    }

    pub fn target(&self) -> Option<OffsetDateTime> {
        self.target
    }

    pub fn time_left(&self) -> TimeLeft {
        self.time_left
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn is_ticking(&self) -> bool {
        !self.expired
    }

    pub fn tick(&mut self, now: OffsetDateTime) -> TickOutcome {
        if self.expired {
            return TickOutcome::Stopped;
        }
        self.recompute(now);
        if self.expired {
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.time_left)
        }
    }

    /// One-shot expiry signal: `true` exactly once per target after expiry
    /// has been observed.
    pub fn take_expiry(&mut self) -> bool {
        std::mem::take(&mut self.expiry_pending)
    }

    /// Returns `false` and keeps the current state when the target is
    /// unchanged.
    pub fn retarget(&mut self, target: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
        if target == self.target {
            return false;
        }
        self.target = target;
        self.time_left = TimeLeft::ZERO;
        self.expired = false;
        self.expiry_pending = false;
        self.recompute(now);
        true
    }

    fn recompute(&mut self, now: OffsetDateTime) {
        let diff = match self.target {
            Some(target) => (target - now).whole_milliseconds(),
            None => 0,
        };
        if diff <= 0 {
            self.time_left = TimeLeft::ZERO;
            self.expired = true;
            self.expiry_pending = true;
        } else {
            self.time_left = TimeLeft::from_millis(diff);
        }
    }
}
