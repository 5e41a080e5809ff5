use crate::types::Slot;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;

pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Sunday-first, like the grid header.
pub const DAY_NAMES_SHORT: [&str; 7] = ["Dom", "Lun", "Mar", "Mié", "Jue", "Vie", "Sáb"];

pub const DAY_NAMES_LONG: [&str; 7] = [
    "Domingo",
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
];

/// Unique `YYYY-MM-DD` key for a date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Date keys of the days having at least one loaded slot.
pub fn days_with_slots(slots: &[Slot]) -> HashSet<String> {
    slots
        .iter()
        .map(|slot| date_key(slot.datetime.date_naive()))
        .collect()
}

/// Slots falling on the selected day, for the step-2 chip list.
pub fn slots_for_date(slots: &[Slot], date: NaiveDate) -> Vec<Slot> {
    slots
        .iter()
        .filter(|slot| slot.datetime.date_naive() == date)
        .cloned()
        .collect()
}

/// E.g. `Lunes 15 de Octubre de 2025`.
pub fn format_long_date(datetime: DateTime<Utc>) -> String {
    let date = datetime.date_naive();
    let weekday = DAY_NAMES_LONG[date.weekday().num_days_from_sunday() as usize];
    let month = MONTH_NAMES[date.month0() as usize];
    format!("{} {} de {} de {}", weekday, date.day(), month, date.year())
}

/// E.g. `15/10/2025`.
pub fn format_short_date(datetime: DateTime<Utc>) -> String {
    datetime.format("%d/%m/%Y").to_string()
}

/// E.g. `10:00`.
pub fn format_time(datetime: DateTime<Utc>) -> String {
    datetime.format("%H:%M").to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCell {
    pub day: u32,
    pub date_key: String,
    pub is_past: bool,
    pub is_today: bool,
    pub has_slots: bool,
}

/// One month of the booking calendar: day cells plus the leading blanks
/// that align day 1 under its weekday column.
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub day_labels: [&'static str; 7],
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
    pub can_go_prev: bool,
}

impl MonthGrid {
    /// `month` is 1-based. Returns `None` for an invalid year/month pair.
    pub fn build(
        year: i32,
        month: u32,
        today: NaiveDate,
        days_with_slots: &HashSet<String>,
    ) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let days_in_month = days_in_month(year, month)?;
        let leading_blanks = first.weekday().num_days_from_sunday();

        let days = (1..=days_in_month)
            .map(|day| {
                let date = NaiveDate::from_ymd_opt(year, month, day).expect("day within month");
                let key = date_key(date);
                let is_past = date < today;
                DayCell {
                    day,
                    is_past,
                    is_today: date == today,
                    has_slots: !is_past && days_with_slots.contains(&key),
                    date_key: key,
                }
            })
            .collect();

        Some(MonthGrid {
            year,
            month,
            month_name: MONTH_NAMES[(month - 1) as usize],
            day_labels: DAY_NAMES_SHORT,
            leading_blanks,
            days,
            can_go_prev: can_go_prev(year, month, today),
        })
    }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Navigation never goes back past the current month.
pub fn can_go_prev(year: i32, month: u32, today: NaiveDate) -> bool {
    year > today.year() || (year == today.year() && month > today.month())
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}
