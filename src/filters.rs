use crate::calendar::DAY_NAMES_SHORT;
use crate::types::{Appointment, AppointmentStatus};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

pub const ITEMS_PER_PAGE: usize = 10;

/// Composable AND-filter over an appointment snapshot. Filters are pure and
/// order-independent, so re-applying or reordering them never changes the
/// result for a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    /// Case-insensitive substring match on name, email or phone.
    pub search: Option<String>,
    /// Inclusive lower bound on the slot date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the slot date (extended to end of day).
    pub to: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            if !term.is_empty()
                && !appointment.name.to_lowercase().contains(&term)
                && !appointment.email.to_lowercase().contains(&term)
                && !appointment.phone.contains(&term)
            {
                return false;
            }
        }

        if let Some(from) = self.from {
            let bound = from.and_time(NaiveTime::MIN).and_utc();
            if appointment.slot_datetime < bound {
                return false;
            }
        }

        if let Some(to) = self.to {
            // End of day, like the panel's date-to control.
            let bound = to
                .checked_add_days(Days::new(1))
                .map(|next| next.and_time(NaiveTime::MIN).and_utc());
            if let Some(bound) = bound {
                if appointment.slot_datetime >= bound {
                    return false;
                }
            }
        }

        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }

        true
    }

    pub fn apply(&self, appointments: &[Appointment]) -> Vec<Appointment> {
        appointments
            .iter()
            .filter(|appointment| self.matches(appointment))
            .cloned()
            .collect()
    }
}

/// One page of results plus the metadata the list footer renders.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// 1-based index of the first item shown, 0 when empty.
    pub start: usize,
    /// 1-based index of the last item shown, 0 when empty.
    pub end: usize,
}

/// Fixed-size pagination. An out-of-range request clamps to the last valid
/// page, which keeps the cursor sane when filters shrink the result set.
pub fn paginate<T: Clone>(items: &[T], requested_page: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = std::cmp::max(1, total_items.div_ceil(ITEMS_PER_PAGE));
    let page = requested_page.clamp(1, total_pages);

    let start_index = (page - 1) * ITEMS_PER_PAGE;
    let end_index = std::cmp::min(start_index + ITEMS_PER_PAGE, total_items);
    let items_on_page = if start_index < total_items {
        items[start_index..end_index].to_vec()
    } else {
        Vec::new()
    };

    Page {
        start: if items_on_page.is_empty() { 0 } else { start_index + 1 },
        end: end_index,
        items: items_on_page,
        page,
        total_pages,
        total_items,
    }
}

/// The checked-appointment set behind the bulk-action bar.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: HashSet<Uuid>,
}

impl SelectionSet {
    pub fn toggle(&mut self, id: Uuid) {
        if !self.ids.insert(id) {
            self.ids.remove(&id);
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.ids.iter().copied().collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCount {
    pub label: &'static str,
    pub date: NaiveDate,
    pub count: usize,
}

/// Everything the dashboard tab shows: counters, the last-seven-days bar
/// data and the next five upcoming accepted appointments.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub accepted_today: usize,
    pub last_week: Vec<DayCount>,
    pub upcoming: Vec<Appointment>,
}

pub fn dashboard_stats(appointments: &[Appointment], now: DateTime<Utc>) -> DashboardStats {
    let today = now.date_naive();

    let count_status = |status: AppointmentStatus| {
        appointments
            .iter()
            .filter(|appointment| appointment.status == status)
            .count()
    };

    let accepted_today = appointments
        .iter()
        .filter(|appointment| {
            appointment.status == AppointmentStatus::Accepted
                && appointment
                    .updated_at
                    .map(|updated| updated.date_naive() == today)
                    .unwrap_or(false)
        })
        .count();

    let last_week = (0u64..7)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| DayCount {
            label: DAY_NAMES_SHORT[date.weekday().num_days_from_sunday() as usize],
            date,
            count: appointments
                .iter()
                .filter(|appointment| appointment.slot_datetime.date_naive() == date)
                .count(),
        })
        .collect();

    let mut upcoming: Vec<Appointment> = appointments
        .iter()
        .filter(|appointment| {
            appointment.status == AppointmentStatus::Accepted && appointment.slot_datetime > now
        })
        .cloned()
        .collect();
    upcoming.sort_by_key(|appointment| appointment.slot_datetime);
    upcoming.truncate(5);

    DashboardStats {
        total: appointments.len(),
        pending: count_status(AppointmentStatus::Pending),
        accepted: count_status(AppointmentStatus::Accepted),
        rejected: count_status(AppointmentStatus::Rejected),
        accepted_today,
        last_week,
        upcoming,
    }
}
