use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use uuid::Uuid;

/// A bookable date-time unit offered by the showroom.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, diesel::Queryable, diesel::Insertable,
)]
#[diesel(table_name = crate::schema::slots)]
pub struct Slot {
    pub id: Uuid,
    pub datetime: DateTime<Utc>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn new(datetime: DateTime<Utc>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            datetime,
            available: true,
            created_at,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Rejected,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Rejected => "rejected",
        }
    }

    /// Label shown in the panel and in CSV exports.
    pub fn label_es(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pendiente",
            AppointmentStatus::Accepted => "Aceptada",
            AppointmentStatus::Rejected => "Rechazada",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(AppointmentStatus::Pending),
            "accepted" => Ok(AppointmentStatus::Accepted),
            "rejected" => Ok(AppointmentStatus::Rejected),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

impl ToSql<Text, Pg> for AppointmentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for AppointmentStatus {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(value.as_bytes())?;
        AppointmentStatus::from_str(raw).map_err(Into::into)
    }
}

/// A client's request to use a slot. Created pending, resolved by the admin.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, diesel::Queryable, diesel::Insertable,
)]
#[diesel(table_name = crate::schema::appointments)]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
    pub slot_id: Uuid,
    pub slot_datetime: DateTime<Utc>,
    pub identification_url: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for a new booking, assembled by the wizard after all guards pass.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
    pub slot_id: Uuid,
    pub slot_datetime: DateTime<Utc>,
    pub identification_url: String,
}

impl NewAppointment {
    pub fn into_appointment(self, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            notes: self.notes,
            slot_id: self.slot_id,
            slot_datetime: self.slot_datetime,
            identification_url: self.identification_url,
            status: AppointmentStatus::Pending,
            created_at,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_appointments_start_pending() {
        let new = NewAppointment {
            name: "Ana López".into(),
            email: "ana@example.com".into(),
            phone: "551 234 5678".into(),
            notes: String::new(),
            slot_id: Uuid::new_v4(),
            slot_datetime: Utc::now(),
            identification_url: "http://localhost:3000/identifications/1_id.jpg".into(),
        };
        let appointment = new.into_appointment(Utc::now());
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert!(appointment.updated_at.is_none());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Accepted,
            AppointmentStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn status_labels_are_spanish() {
        assert_eq!(AppointmentStatus::Pending.label_es(), "Pendiente");
        assert_eq!(AppointmentStatus::Accepted.label_es(), "Aceptada");
        assert_eq!(AppointmentStatus::Rejected.label_es(), "Rechazada");
    }
}
