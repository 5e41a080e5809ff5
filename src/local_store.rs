use crate::backend::BookingBackend;
use crate::error::BookingError;
use crate::types::{Appointment, AppointmentStatus, NewAppointment, Slot};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Default)]
struct StoreInner {
    slots: HashMap<Uuid, Slot>,
    appointments: HashMap<Uuid, Appointment>,
}

/// In-memory backend used when no database is configured. One mutex guards
/// both collections, which is what makes the accept pre-checks and the
/// commit a single atomic step here.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl LocalStore {
    /// Seeds one 10:00 slot per day for the next few days.
    pub fn insert_example_slots(&self) {
        const NUMBER_OF_EXAMPLES: i64 = 5;
        for i in 1..=NUMBER_OF_EXAMPLES {
            let datetime = (Utc::now() + Duration::days(i))
                .date_naive()
                .and_hms_opt(10, 0, 0)
                .expect("valid time")
                .and_utc();
            let _ = self.add_slot(datetime);
        }
    }

    fn cleanup_outdated_slots(inner: &mut StoreInner, max_age: Duration) {
        let cutoff = Utc::now() - max_age;
        inner.slots.retain(|_, slot| slot.datetime >= cutoff);
    }

    #[cfg(test)]
    fn force_slot_available(&self, id: Uuid, available: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .slots
            .get_mut(&id)
            .expect("slot exists")
            .available = available;
    }

    #[cfg(test)]
    fn slot_snapshot(&self, id: Uuid) -> Slot {
        self.inner.lock().unwrap().slots[&id].clone()
    }
}

impl BookingBackend for LocalStore {
    fn available_slots(&self) -> Result<Vec<Slot>, BookingError> {
        let mut inner = self.inner.lock().unwrap();
        Self::cleanup_outdated_slots(&mut inner, Duration::days(1));

        let now = Utc::now();
        let mut slots: Vec<Slot> = inner
            .slots
            .values()
            .filter(|slot| slot.available && slot.datetime > now)
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.datetime);
        Ok(slots)
    }

    fn find_slot(&self, id: Uuid) -> Result<Option<Slot>, BookingError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.slots.get(&id).cloned())
    }

    fn add_slot(&self, datetime: DateTime<Utc>) -> Result<Slot, BookingError> {
        let slot = Slot::new(datetime, Utc::now());
        let mut inner = self.inner.lock().unwrap();
        inner.slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    fn remove_slot(&self, id: Uuid) -> Result<(), BookingError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.slots.remove(&id).is_none() {
            return Err(BookingError::NotFound);
        }
        Ok(())
    }

    fn appointments(&self) -> Result<Vec<Appointment>, BookingError> {
        let inner = self.inner.lock().unwrap();
        let mut appointments: Vec<Appointment> = inner.appointments.values().cloned().collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, BookingError> {
        let appointment = new.into_appointment(Utc::now());
        let mut inner = self.inner.lock().unwrap();
        inner
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    fn accept_appointment(&self, id: Uuid) -> Result<Appointment, BookingError> {
        let mut inner = self.inner.lock().unwrap();

        let appointment = inner
            .appointments
            .get(&id)
            .cloned()
            .ok_or(BookingError::NotFound)?;

        // Re-check the slot before committing anything.
        match inner.slots.get(&appointment.slot_id) {
            Some(slot) if slot.available => {}
            _ => return Err(BookingError::SlotUnavailable),
        }
        let conflicting = inner.appointments.values().any(|other| {
            other.slot_id == appointment.slot_id && other.status == AppointmentStatus::Accepted
        });
        if conflicting {
            return Err(BookingError::SlotConflict);
        }

        let slot = inner
            .slots
            .get_mut(&appointment.slot_id)
            .expect("slot checked above");
        slot.available = false;

        let stored = inner
            .appointments
            .get_mut(&id)
            .expect("appointment checked above");
        stored.status = AppointmentStatus::Accepted;
        stored.updated_at = Some(Utc::now());
        Ok(stored.clone())
    }

    fn reject_appointment(&self, id: Uuid) -> Result<Appointment, BookingError> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .appointments
            .get_mut(&id)
            .ok_or(BookingError::NotFound)?;
        stored.status = AppointmentStatus::Rejected;
        stored.updated_at = Some(Utc::now());
        Ok(stored.clone())
    }
}
