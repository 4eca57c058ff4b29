use crate::models::AttendanceEvent;
use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

pub const MAX_MONTHS: usize = 6;
pub const GRID_DAYS: usize = 42;

/// A calendar month, stored as its first day so ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// 1-based month number.
    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub_months(Months::new(1)).map(Self)
    }

    pub fn label(self) -> String {
        self.0.format("%B %Y").to_string()
    }
}

/// The three numeric parts of an `M/D/YYYY` attendance date, before any
/// calendar validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub month: i64,
    pub day: i64,
    pub year: i64,
}

impl DateParts {
    /// Splits `M/D/YYYY` (zero padding optional). Anything that is not three
    /// numeric slash-separated parts is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('/');
        let (month, day, year) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            month: month.trim().parse().ok()?,
            day: day.trim().parse().ok()?,
            year: year.trim().parse().ok()?,
        })
    }

    /// Month the date is filed under. An out-of-range month carries into the
    /// neighbouring year (`13/1/2024` is January 2025). The day is ignored.
    pub fn month_key(self) -> Option<MonthKey> {
        let index = self.year.checked_mul(12)?.checked_add(self.month.checked_sub(1)?)?;
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        let month = u32::try_from(index.rem_euclid(12) + 1).ok()?;
        NaiveDate::from_ymd_opt(year, month, 1).map(MonthKey)
    }

    /// Calendar day the date names. Out-of-range days roll over into the
    /// neighbouring month (`2/30/2024` is March 1).
    pub fn calendar_day(self) -> Option<NaiveDate> {
        let first = self.month_key()?.first_day();
        let offset = self.day.checked_sub(1)?;
        if offset >= 0 {
            first.checked_add_days(Days::new(offset.unsigned_abs()))
        } else {
            first.checked_sub_days(Days::new(offset.unsigned_abs()))
        }
    }
}

pub fn parse_attendance_date(raw: &str) -> Option<NaiveDate> {
    DateParts::parse(raw)?.calendar_day()
}

/// Attendance events keyed by calendar day. Later duplicates replace earlier
/// ones.
#[derive(Debug, Default)]
pub struct AttendanceMap<'a> {
    days: HashMap<NaiveDate, &'a AttendanceEvent>,
}

impl<'a> AttendanceMap<'a> {
    pub fn build(events: &'a [AttendanceEvent]) -> Self {
        let mut days = HashMap::with_capacity(events.len());
        for event in events {
            let Some(date) = event.date.as_deref().and_then(parse_attendance_date) else {
                continue;
            };
            if days.insert(date, event).is_some() {
                warn!(%date, "duplicate attendance record; keeping the later one");
            }
        }
        Self { days }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&'a AttendanceEvent> {
        self.days.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Months to display, most recent first, at most [`MAX_MONTHS`]. With no
/// usable dated and typed events this is the current and previous month.
pub fn attendance_months_at(today: NaiveDate, events: &[AttendanceEvent]) -> Vec<MonthKey> {
    let months: BTreeSet<MonthKey> = events
        .iter()
        .filter(|event| event.kind.is_some())
        .filter_map(|event| event.date.as_deref().and_then(DateParts::parse))
        .filter_map(DateParts::month_key)
        .collect();

    if months.is_empty() {
        let current = MonthKey::of(today);
        return std::iter::once(current).chain(current.previous()).collect();
    }

    months.into_iter().rev().take(MAX_MONTHS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub token: String,
    pub badge: &'static str,
    pub excused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DayStatus {
    /// `None` when the event has no type.
    pub fn from_event(event: &AttendanceEvent) -> Option<Self> {
        let token = type_token(event.kind.as_deref()?);
        Some(Self {
            badge: badge_for(&token),
            token,
            excused: event.is_excused(),
            note: event.note.clone(),
        })
    }
}

/// Lowercases and turns each whitespace run into a single hyphen.
pub fn type_token(kind: &str) -> String {
    let mut token = String::with_capacity(kind.len());
    let mut in_space = false;
    for ch in kind.chars() {
        if ch.is_whitespace() {
            if !in_space {
                token.push('-');
            }
            in_space = true;
        } else {
            token.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    token
}

pub fn badge_for(token: &str) -> &'static str {
    match token {
        "present" => "P",
        "late" => "L",
        "left-early" => "LE",
        "absent" => "A",
        "ncns" => "NC",
        _ => "?",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day_number: u32,
    pub in_month: bool,
    pub is_today: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DayStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    #[serde(skip)]
    pub key: MonthKey,
    pub year: i32,
    /// 1-based.
    pub month: u32,
    pub label: String,
    pub days: Vec<CalendarDay>,
}

/// Six Sunday-first weeks covering `month`.
pub fn month_grid(month: MonthKey, today: NaiveDate, attendance: &AttendanceMap<'_>) -> MonthGrid {
    let first = month.first_day();
    let lead = u64::from(first.weekday().num_days_from_sunday());
    let start = first.checked_sub_days(Days::new(lead)).unwrap_or(first);

    let days = start
        .iter_days()
        .take(GRID_DAYS)
        .map(|date| {
            let event = attendance.get(date);
            CalendarDay {
                date,
                day_number: date.day(),
                in_month: date.month() == first.month() && date.year() == first.year(),
                is_today: date == today,
                attendance: event.cloned(),
                status: event.and_then(DayStatus::from_event),
            }
        })
        .collect();

    MonthGrid {
        key: month,
        year: month.year(),
        month: month.month(),
        label: month.label(),
        days,
    }
}

pub fn build_calendar(events: &[AttendanceEvent]) -> Vec<MonthGrid> {
    build_calendar_at(Local::now().date_naive(), events)
}

pub fn build_calendar_at(today: NaiveDate, events: &[AttendanceEvent]) -> Vec<MonthGrid> {
    let attendance = AttendanceMap::build(events);
    attendance_months_at(today, events)
        .into_iter()
        .map(|month| month_grid(month, today, &attendance))
        .collect()
}
