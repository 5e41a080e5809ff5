use crate::calendar::{format_short_date, format_time};
use crate::error::BookingError;
use crate::types::{Appointment, AppointmentStatus};
use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use std::str::FromStr;

pub const CSV_HEADER: [&str; 7] = [
    "Nombre",
    "Email",
    "Teléfono",
    "Fecha",
    "Hora",
    "Estado",
    "Notas",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    Pending,
    Confirmed,
    All,
}

impl ExportScope {
    /// File name stem, matching the panel's download names.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ExportScope::Pending => "citas-pendientes",
            ExportScope::Confirmed => "citas-confirmadas",
            ExportScope::All => "todas-las-citas",
        }
    }

    pub fn filter(&self, appointments: &[Appointment]) -> Vec<Appointment> {
        appointments
            .iter()
            .filter(|appointment| match self {
                ExportScope::Pending => appointment.status == AppointmentStatus::Pending,
                ExportScope::Confirmed => appointment.status != AppointmentStatus::Pending,
                ExportScope::All => true,
            })
            .cloned()
            .collect()
    }
}

impl FromStr for ExportScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ExportScope::Pending),
            "confirmed" => Ok(ExportScope::Confirmed),
            "all" => Ok(ExportScope::All),
            other => Err(format!("unknown export scope: {other}")),
        }
    }
}

/// `citas-pendientes-2025-10-15.csv` style download name.
pub fn export_filename(scope: ExportScope, date: NaiveDate) -> String {
    format!("{}-{}.csv", scope.file_stem(), date.format("%Y-%m-%d"))
}

/// Serializes appointments with every field quoted, so notes containing
/// commas or quotes survive a round trip through any CSV reader.
pub fn appointments_to_csv(appointments: &[Appointment]) -> Result<String, BookingError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|err| BookingError::Internal(err.to_string()))?;

    for appointment in appointments {
        writer
            .write_record([
                appointment.name.as_str(),
                appointment.email.as_str(),
                appointment.phone.as_str(),
                &format_short_date(appointment.slot_datetime),
                &format_time(appointment.slot_datetime),
                appointment.status.label_es(),
                appointment.notes.as_str(),
            ])
            .map_err(|err| BookingError::Internal(err.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| BookingError::Internal(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| BookingError::Internal(err.to_string()))
}
