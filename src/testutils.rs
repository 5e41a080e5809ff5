use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use crate::backend::BookingBackend;
use crate::configuration::{Configuration, EmailApiSettings};
use crate::email::{EmailMessage, Mailer};
use crate::error::BookingError;
use crate::types::{Appointment, AppointmentStatus, NewAppointment, Slot};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct MockBookingBackendInner {
    pub success: AtomicBool,
    pub calls_to_available_slots: AtomicU64,
    pub calls_to_add_slot: AtomicU64,
    pub calls_to_remove_slot: AtomicU64,
    pub calls_to_appointments: AtomicU64,
    pub calls_to_create_appointment: AtomicU64,
    pub calls_to_accept_appointment: AtomicU64,
    pub calls_to_reject_appointment: AtomicU64,
    pub slots: Mutex<HashMap<Uuid, Slot>>,
    pub appointments: Mutex<HashMap<Uuid, Appointment>>,
}

/// Counting mock over injectable state, for driving the HTTP layer.
#[derive(Clone)]
pub struct MockBookingBackend(pub Arc<MockBookingBackendInner>);

impl MockBookingBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockBookingBackendInner {
            success: AtomicBool::new(true),
            calls_to_available_slots: AtomicU64::default(),
            calls_to_add_slot: AtomicU64::default(),
            calls_to_remove_slot: AtomicU64::default(),
            calls_to_appointments: AtomicU64::default(),
            calls_to_create_appointment: AtomicU64::default(),
            calls_to_accept_appointment: AtomicU64::default(),
            calls_to_reject_appointment: AtomicU64::default(),
            slots: Mutex::default(),
            appointments: Mutex::default(),
        }))
    }

    fn check_success(&self) -> Result<(), BookingError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(BookingError::Database("Supposed to fail".into())),
        }
    }

    pub fn inject_slot(&self, slot: Slot) {
        self.0.slots.lock().unwrap().insert(slot.id, slot);
    }

    pub fn inject_appointment(&self, appointment: Appointment) {
        self.0
            .appointments
            .lock()
            .unwrap()
            .insert(appointment.id, appointment);
    }
}

impl BookingBackend for MockBookingBackend {
    fn available_slots(&self) -> Result<Vec<Slot>, BookingError> {
        self.0
            .calls_to_available_slots
            .fetch_add(1, Ordering::SeqCst);
        self.check_success()?;
        let mut slots: Vec<Slot> = self.0.slots.lock().unwrap().values().cloned().collect();
        slots.sort_by_key(|slot| slot.datetime);
        Ok(slots)
    }

    fn find_slot(&self, id: Uuid) -> Result<Option<Slot>, BookingError> {
        self.check_success()?;
        Ok(self.0.slots.lock().unwrap().get(&id).cloned())
    }

    fn add_slot(&self, datetime: DateTime<Utc>) -> Result<Slot, BookingError> {
        self.0.calls_to_add_slot.fetch_add(1, Ordering::SeqCst);
        self.check_success()?;
        let slot = Slot::new(datetime, Utc::now());
        self.inject_slot(slot.clone());
        Ok(slot)
    }

    fn remove_slot(&self, id: Uuid) -> Result<(), BookingError> {
        self.0.calls_to_remove_slot.fetch_add(1, Ordering::SeqCst);
        self.check_success()?;
        match self.0.slots.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(BookingError::NotFound),
        }
    }

    fn appointments(&self) -> Result<Vec<Appointment>, BookingError> {
        self.0.calls_to_appointments.fetch_add(1, Ordering::SeqCst);
        self.check_success()?;
        let mut appointments: Vec<Appointment> = self
            .0
            .appointments
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, BookingError> {
        self.0
            .calls_to_create_appointment
            .fetch_add(1, Ordering::SeqCst);
        self.check_success()?;
        let appointment = new.into_appointment(Utc::now());
        self.inject_appointment(appointment.clone());
        Ok(appointment)
    }

    fn accept_appointment(&self, id: Uuid) -> Result<Appointment, BookingError> {
        self.0
            .calls_to_accept_appointment
            .fetch_add(1, Ordering::SeqCst);
        self.check_success()?;
        let mut appointments = self.0.appointments.lock().unwrap();
        let appointment = appointments.get_mut(&id).ok_or(BookingError::NotFound)?;
        appointment.status = AppointmentStatus::Accepted;
        appointment.updated_at = Some(Utc::now());
        Ok(appointment.clone())
    }

    fn reject_appointment(&self, id: Uuid) -> Result<Appointment, BookingError> {
        self.0
            .calls_to_reject_appointment
            .fetch_add(1, Ordering::SeqCst);
        self.check_success()?;
        let mut appointments = self.0.appointments.lock().unwrap();
        let appointment = appointments.get_mut(&id).ok_or(BookingError::NotFound)?;
        appointment.status = AppointmentStatus::Rejected;
        appointment.updated_at = Some(Utc::now());
        Ok(appointment.clone())
    }
}

/// Mailer that records every send instead of talking to the API.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<EmailMessage>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingMailer {
    pub fn sent_subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|message| message.subject.clone())
            .collect()
    }
}

impl Mailer for RecordingMailer {
    fn send(
        &self,
        message: EmailMessage,
    ) -> impl std::future::Future<Output = Result<(), BookingError>> + Send {
        let mailer = self.clone();
        async move {
            if mailer.fail.load(Ordering::SeqCst) {
                return Err(BookingError::Email("Supposed to fail".into()));
            }
            mailer.sent.lock().unwrap().push(message);
            Ok(())
        }
    }
}

#[derive(Clone)]
pub struct TestConfiguration {
    pub upload_dir: PathBuf,
    pub admin_email: Option<String>,
}

impl Configuration for TestConfiguration {
    fn website_title(&self) -> String {
        "Ciao Ciao Joyería".into()
    }

    fn password(&self) -> String {
        "123".into()
    }

    fn port(&self) -> String {
        "0".into()
    }

    fn database_url(&self) -> Option<String> {
        None
    }

    fn upload_dir(&self) -> PathBuf {
        self.upload_dir.clone()
    }

    fn public_base_url(&self) -> String {
        "http://localhost:3000".into()
    }

    fn admin_email(&self) -> Option<String> {
        self.admin_email.clone()
    }

    fn email_api(&self) -> Option<EmailApiSettings> {
        None
    }
}
