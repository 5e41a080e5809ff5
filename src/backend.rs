use crate::error::BookingError;
use crate::types::{Appointment, NewAppointment, Slot};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Storage seam over the `slots` and `appointments` collections.
///
/// Implementations must make `accept_appointment` atomic: the availability
/// re-check, the conflict re-query and the two writes happen under one
/// guard, so a losing concurrent accept fails without mutating anything.
pub trait BookingBackend: Clone + Send + Sync + 'static {
    /// Available future slots, ordered by datetime ascending. Listing also
    /// drops slots past the retention window.
    fn available_slots(&self) -> Result<Vec<Slot>, BookingError>;

    fn find_slot(&self, id: Uuid) -> Result<Option<Slot>, BookingError>;

    fn add_slot(&self, datetime: DateTime<Utc>) -> Result<Slot, BookingError>;

    fn remove_slot(&self, id: Uuid) -> Result<(), BookingError>;

    /// All appointments, ordered by creation time descending.
    fn appointments(&self) -> Result<Vec<Appointment>, BookingError>;

    fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, BookingError>;

    /// Accept an appointment: its slot must still exist, be available and
    /// have no other accepted appointment. On success the appointment is
    /// accepted, the slot flips to unavailable and `updated_at` is stamped.
    fn accept_appointment(&self, id: Uuid) -> Result<Appointment, BookingError>;

    /// Reject an appointment. The slot is left untouched so it stays
    /// bookable by others.
    fn reject_appointment(&self, id: Uuid) -> Result<Appointment, BookingError>;
}
