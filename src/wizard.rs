use crate::calendar::slots_for_date;
use crate::error::BookingError;
use crate::types::{NewAppointment, Slot};
use crate::validation::{
    self, capitalize_words, first_message, format_phone, sanitize_text, ContactForm, FileMeta,
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    DateSelection,
    SlotSelection,
    ContactDetails,
    Review,
}

/// Everything a confirmed wizard run hands to the side-effect pipeline.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub contact: ContactForm,
    pub slot: Slot,
    pub file: FileMeta,
}

impl BookingDraft {
    pub fn into_new_appointment(self, identification_url: String) -> NewAppointment {
        NewAppointment {
            name: self.contact.name,
            email: self.contact.email,
            phone: self.contact.phone,
            notes: self.contact.notes,
            slot_id: self.slot.id,
            slot_datetime: self.slot.datetime,
            identification_url,
        }
    }
}

/// The four-step booking flow: date, slot, contact details, review.
/// Linear and back-navigable; each forward transition is guarded, so a
/// submission that skips a step or carries stale data fails here before any
/// side effect runs.
#[derive(Debug, Clone)]
pub struct BookingWizard {
    step: Step,
    now: DateTime<Utc>,
    slots: Vec<Slot>,
    selected_date: Option<NaiveDate>,
    selected_slot: Option<Slot>,
    contact: Option<ContactForm>,
    file: Option<FileMeta>,
}

impl BookingWizard {
    /// Starts at step 1 with the loaded slot snapshot. Only available
    /// future slots are selectable, whatever the caller passed in.
    pub fn new(slots: Vec<Slot>, now: DateTime<Utc>) -> Self {
        let slots = slots
            .into_iter()
            .filter(|slot| slot.available && slot.datetime > now)
            .collect();
        Self {
            step: Step::DateSelection,
            now,
            slots,
            selected_date: None,
            selected_slot: None,
            contact: None,
            file: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn selected_slot(&self) -> Option<&Slot> {
        self.selected_slot.as_ref()
    }

    /// Slots offered for the selected day (the step-2 chip list).
    pub fn slots_for_selected_date(&self) -> Vec<Slot> {
        match self.selected_date {
            Some(date) => slots_for_date(&self.slots, date),
            None => Vec::new(),
        }
    }

    fn expect_step(&self, step: Step) -> Result<(), BookingError> {
        if self.step == step {
            Ok(())
        } else {
            Err(BookingError::Validation(
                "Completa los pasos en orden".to_string(),
            ))
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), BookingError> {
        self.expect_step(Step::DateSelection)?;
        if date < self.now.date_naive() {
            return Err(BookingError::Validation(
                "No puedes seleccionar una fecha pasada".to_string(),
            ));
        }
        self.selected_date = Some(date);
        self.step = Step::SlotSelection;
        Ok(())
    }

    pub fn select_slot(&mut self, id: Uuid) -> Result<(), BookingError> {
        self.expect_step(Step::SlotSelection)?;
        let date = self.selected_date.expect("date chosen before step 2");
        let slot = self
            .slots
            .iter()
            .find(|slot| slot.id == id)
            .ok_or(BookingError::SlotUnavailable)?
            .clone();
        if slot.datetime.date_naive() != date {
            return Err(BookingError::Validation(
                "El horario no corresponde a la fecha seleccionada".to_string(),
            ));
        }
        self.selected_slot = Some(slot);
        self.step = Step::ContactDetails;
        Ok(())
    }

    /// Validates the raw form and file, then stores the sanitized snapshot
    /// that will end up on the appointment record.
    pub fn submit_contact(
        &mut self,
        form: ContactForm,
        file: FileMeta,
    ) -> Result<(), BookingError> {
        self.expect_step(Step::ContactDetails)?;

        form.validate()
            .map_err(|errors| BookingError::Validation(first_message(&errors)))?;
        validation::validate_file(&file).map_err(|err| {
            BookingError::Validation(
                err.message
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| "Identificación inválida".to_string()),
            )
        })?;

        self.contact = Some(ContactForm {
            name: capitalize_words(&sanitize_text(&form.name)),
            email: form.email.trim().to_lowercase(),
            phone: format_phone(form.phone.trim()),
            notes: sanitize_text(&form.notes),
        });
        self.file = Some(file);
        self.step = Step::Review;
        Ok(())
    }

    /// Moves one step back, keeping earlier selections. A no-op on step 1.
    pub fn back(&mut self) {
        self.step = match self.step {
            Step::DateSelection | Step::SlotSelection => Step::DateSelection,
            Step::ContactDetails => Step::SlotSelection,
            Step::Review => Step::ContactDetails,
        };
    }

    /// Terminal transition: only reachable once every guard has passed.
    pub fn confirm(self) -> Result<BookingDraft, BookingError> {
        self.expect_step(Step::Review)?;
        Ok(BookingDraft {
            contact: self.contact.expect("contact stored before review"),
            slot: self.selected_slot.expect("slot stored before review"),
            file: self.file.expect("file stored before review"),
        })
    }
}
