use crate::calendar::{format_long_date, format_time};
use crate::configuration::EmailApiSettings;
use crate::error::BookingError;
use crate::types::Appointment;
use lazy_static::lazy_static;
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use tracing::{error, warn};

lazy_static! {
    // One client reused for every dispatch call.
    static ref HTTP_CLIENT: Client = Client::new();
}

/// One templated send: recipient, subject and a freeform body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub message: String,
}

/// Notification seam. Sends are fire-and-forget from the caller's point of
/// view: the primary operation never fails because of email.
pub trait Mailer: Clone + Send + Sync + 'static {
    fn send(
        &self,
        message: EmailMessage,
    ) -> impl Future<Output = Result<(), BookingError>> + Send;
}

/// Logs the failure and moves on; no retry at any layer.
pub async fn send_best_effort<M: Mailer>(mailer: &M, message: EmailMessage) {
    let recipient = message.to_email.clone();
    if let Err(err) = mailer.send(message).await {
        error!(%err, to = %recipient, "error al enviar correo");
    }
}

#[derive(Serialize)]
struct SendPayload<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a EmailMessage,
}

/// Client for the templated email-dispatch API.
#[derive(Debug, Clone)]
pub struct ApiMailer {
    settings: EmailApiSettings,
}

impl ApiMailer {
    pub fn new(settings: EmailApiSettings) -> Self {
        Self { settings }
    }

    async fn dispatch(&self, message: EmailMessage) -> Result<(), BookingError> {
        let payload = SendPayload {
            service_id: &self.settings.service_id,
            template_id: &self.settings.template_id,
            user_id: &self.settings.public_key,
            template_params: &message,
        };

        let response = HTTP_CLIENT
            .post(&self.settings.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| BookingError::Email(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BookingError::Email(format!(
                "la API respondió {status}: {body}"
            )));
        }
        Ok(())
    }
}

/// Runtime mailer: the configured API client, or a no-op when the email
/// settings are absent (sends are skipped with a warning).
#[derive(Debug, Clone)]
pub enum NotificationMailer {
    Api(ApiMailer),
    Disabled,
}

impl NotificationMailer {
    pub fn from_settings(settings: Option<EmailApiSettings>) -> Self {
        match settings {
            Some(settings) => NotificationMailer::Api(ApiMailer::new(settings)),
            None => {
                warn!("API de email no configurada. Se omitirán las notificaciones por correo.");
                NotificationMailer::Disabled
            }
        }
    }
}

impl Mailer for NotificationMailer {
    fn send(
        &self,
        message: EmailMessage,
    ) -> impl Future<Output = Result<(), BookingError>> + Send {
        let mailer = self.clone();
        async move {
            match &mailer {
                NotificationMailer::Api(api) => api.dispatch(message).await,
                NotificationMailer::Disabled => {
                    warn!(to = %message.to_email, "correo omitido: API de email no configurada");
                    Ok(())
                }
            }
        }
    }
}

/// Acknowledgement sent to the client right after booking.
pub fn booking_received(appointment: &Appointment, shop_name: &str) -> EmailMessage {
    let date = format_long_date(appointment.slot_datetime);
    let time = format_time(appointment.slot_datetime);
    EmailMessage {
        to_email: appointment.email.clone(),
        to_name: appointment.name.clone(),
        subject: format!("Solicitud de Cita Recibida - {shop_name}"),
        message: format!(
            "Hola {},\n\nHemos recibido tu solicitud de cita para el {} a las {}.\n\n\
             Revisaremos tu solicitud y te enviaremos una confirmación pronto.\n\n\
             Gracias por elegir {}.",
            appointment.name, date, time, shop_name
        ),
    }
}

/// Alert sent to the showroom inbox for every new request.
pub fn admin_alert(appointment: &Appointment, admin_email: &str, shop_name: &str) -> EmailMessage {
    let date = format_long_date(appointment.slot_datetime);
    let time = format_time(appointment.slot_datetime);
    let notes = if appointment.notes.is_empty() {
        "N/A"
    } else {
        appointment.notes.as_str()
    };
    EmailMessage {
        to_email: admin_email.to_string(),
        to_name: "Admin".to_string(),
        subject: format!("Nueva Solicitud de Cita - {shop_name}"),
        message: format!(
            "Nueva solicitud:\n\nCliente: {}\nEmail: {}\nTeléfono: {}\nFecha: {}\nHora: {}\nNotas: {}\n\nID: {}",
            appointment.name,
            appointment.email,
            appointment.phone,
            date,
            time,
            notes,
            appointment.id
        ),
    }
}

pub fn acceptance_confirmation(appointment: &Appointment, shop_name: &str) -> EmailMessage {
    let date = format_long_date(appointment.slot_datetime);
    let time = format_time(appointment.slot_datetime);
    EmailMessage {
        to_email: appointment.email.clone(),
        to_name: appointment.name.clone(),
        subject: format!("Cita Confirmada - {shop_name}"),
        message: format!(
            "Hola {},\n\n¡Tu cita ha sido confirmada!\n\nFecha: {}\nHora: {}\n\n\
             Te esperamos en nuestro showroom.\n\n{}",
            appointment.name, date, time, shop_name
        ),
    }
}

pub fn rejection_notice(appointment: &Appointment, shop_name: &str) -> EmailMessage {
    EmailMessage {
        to_email: appointment.email.clone(),
        to_name: appointment.name.clone(),
        subject: format!("Solicitud de Cita - {shop_name}"),
        message: format!(
            "Hola {},\n\nLamentamos informarte que no podemos confirmar tu cita en el \
             horario solicitado.\n\nPor favor, visita nuestra página para seleccionar \
             otro horario disponible.\n\n{}",
            appointment.name, shop_name
        ),
    }
}
