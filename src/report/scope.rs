//! Calendar scope identifiers and their navigation.
//!
//! A scope is one of four calendar-aligned reporting windows:
//! `YYYY-MM-DD` (day), `YYYY-Www` (ISO week), `YYYY-MM` (month) or
//! `YYYY` (year). Week math follows ISO-8601: week 1 is the week
//! containing the first Thursday of the year, so January 4th always
//! lies in week 1.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::PosError;

/// First day of a report week. ISO weeks anchor on Monday; some shops
/// prefer Sunday-first displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monday" => Some(WeekStart::Monday),
            "sunday" => Some(WeekStart::Sunday),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Day(NaiveDate),
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Year(i32),
}

/// Representative scope identifiers of every granularity, derived from a
/// scope's anchor day. Supports breadcrumb-style drill-down/up without
/// re-deriving context from scratch.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeLinks {
    pub day: String,
    pub week: String,
    pub month: String,
    pub year: String,
}

impl Scope {
    /// Parse a scope identifier. Out-of-range fields (month 13, week 60)
    /// are rejected just like malformed shapes.
    pub fn parse(s: &str) -> Result<Self, PosError> {
        let invalid = || PosError::InvalidScope(s.to_string());

        // The year field is exactly four digits; this also keeps
        // sign-prefixed years like "-123" or "+123" out, whose labels
        // would not round-trip the identifier.
        if s.len() < 4 || !s.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }

        match s.len() {
            10 => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Scope::Day)
                .map_err(|_| invalid()),
            8 if s.as_bytes()[4] == b'-' && s.as_bytes()[5] == b'W' => {
                let year: i32 = s[..4].parse().map_err(|_| invalid())?;
                let week: u32 = s[6..].parse().map_err(|_| invalid())?;
                // from_isoywd rejects week numbers the ISO year does not have
                NaiveDate::from_isoywd_opt(year, week, Weekday::Thu)
                    .map(|_| Scope::Week { year, week })
                    .ok_or_else(invalid)
            }
            7 if s.as_bytes()[4] == b'-' => {
                let year: i32 = s[..4].parse().map_err(|_| invalid())?;
                let month: u32 = s[5..].parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, month, 1)
                    .map(|_| Scope::Month { year, month })
                    .ok_or_else(invalid)
            }
            4 => s
                .parse::<i32>()
                .ok()
                .filter(|y| *y >= 1)
                .map(Scope::Year)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }

    pub fn granularity(&self) -> &'static str {
        match self {
            Scope::Day(_) => "day",
            Scope::Week { .. } => "week",
            Scope::Month { .. } => "month",
            Scope::Year(_) => "year",
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::Day(d) => d.format("%Y-%m-%d").to_string(),
            Scope::Week { year, week } => format!("{:04}-W{:02}", year, week),
            Scope::Month { year, month } => format!("{:04}-{:02}", year, month),
            Scope::Year(year) => format!("{:04}", year),
        }
    }

    /// Representative day used for cross-granularity links: a week is
    /// represented by its Thursday, a month by its 15th, a year by July 1st.
    pub fn anchor(&self) -> NaiveDate {
        match *self {
            Scope::Day(d) => d,
            Scope::Week { year, week } => iso_week_day(year, week, Weekday::Thu),
            Scope::Month { year, month } => {
                NaiveDate::from_ymd_opt(year, month, 15).unwrap_or_default()
            }
            Scope::Year(year) => NaiveDate::from_ymd_opt(year, 7, 1).unwrap_or_default(),
        }
    }

    /// The ordered member days of this scope. A week always yields exactly
    /// 7 consecutive days starting at the configured week start.
    pub fn days(&self, week_start: WeekStart) -> Vec<NaiveDate> {
        match *self {
            Scope::Day(d) => vec![d],
            Scope::Week { year, week } => {
                let monday = iso_week_day(year, week, Weekday::Mon);
                let start = match week_start {
                    WeekStart::Monday => monday,
                    WeekStart::Sunday => monday.pred_opt().unwrap_or(monday),
                };
                (0..7)
                    .filter_map(|i| start.checked_add_days(Days::new(i)))
                    .collect()
            }
            Scope::Month { year, month } => {
                let mut days = Vec::new();
                let mut day = NaiveDate::from_ymd_opt(year, month, 1);
                while let Some(d) = day {
                    if d.month() != month {
                        break;
                    }
                    days.push(d);
                    day = d.succ_opt();
                }
                days
            }
            Scope::Year(year) => {
                let mut days = Vec::new();
                let mut day = NaiveDate::from_ymd_opt(year, 1, 1);
                while let Some(d) = day {
                    if d.year() != year {
                        break;
                    }
                    days.push(d);
                    day = d.succ_opt();
                }
                days
            }
        }
    }

    /// The next scope of the same granularity. Weeks shift by 7 days and
    /// re-derive their ISO label, which handles week 52/53 year rollovers.
    pub fn next(&self) -> Option<Scope> {
        match *self {
            Scope::Day(d) => d.succ_opt().map(Scope::Day),
            Scope::Week { year, week } => iso_week_day(year, week, Weekday::Thu)
                .checked_add_days(Days::new(7))
                .map(|d| {
                    let iw = d.iso_week();
                    Scope::Week {
                        year: iw.year(),
                        week: iw.week(),
                    }
                }),
            Scope::Month { year, month } => Some(if month == 12 {
                Scope::Month {
                    year: year + 1,
                    month: 1,
                }
            } else {
                Scope::Month {
                    year,
                    month: month + 1,
                }
            }),
            Scope::Year(year) => Some(Scope::Year(year + 1)),
        }
    }

    /// The previous scope of the same granularity.
    pub fn prev(&self) -> Option<Scope> {
        match *self {
            Scope::Day(d) => d.pred_opt().map(Scope::Day),
            Scope::Week { year, week } => iso_week_day(year, week, Weekday::Thu)
                .checked_sub_days(Days::new(7))
                .map(|d| {
                    let iw = d.iso_week();
                    Scope::Week {
                        year: iw.year(),
                        week: iw.week(),
                    }
                }),
            Scope::Month { year, month } => Some(if month == 1 {
                Scope::Month {
                    year: year - 1,
                    month: 12,
                }
            } else {
                Scope::Month {
                    year,
                    month: month - 1,
                }
            }),
            Scope::Year(year) if year > 1 => Some(Scope::Year(year - 1)),
            Scope::Year(_) => None,
        }
    }

    /// Scope identifiers of every granularity containing (or contained by)
    /// this scope's anchor day.
    pub fn links(&self) -> ScopeLinks {
        let anchor = self.anchor();
        let iw = anchor.iso_week();
        ScopeLinks {
            day: Scope::Day(anchor).label(),
            week: Scope::Week {
                year: iw.year(),
                week: iw.week(),
            }
            .label(),
            month: Scope::Month {
                year: anchor.year(),
                month: anchor.month(),
            }
            .label(),
            year: Scope::Year(anchor.year()).label(),
        }
    }
}

/// Resolve a day of an ISO week. Week numbers are validated at parse time,
/// so resolution cannot fail for scopes built through [`Scope::parse`].
fn iso_week_day(year: i32, week: u32, weekday: Weekday) -> NaiveDate {
    NaiveDate::from_isoywd_opt(year, week, weekday).unwrap_or_default()
}
