use crate::backend::BookingBackend;
use crate::configuration::Configuration;
use crate::csv_export::{appointments_to_csv, export_filename, ExportScope};
use crate::email::{self, Mailer};
use crate::error::BookingError;
use crate::filters::{dashboard_stats, paginate, AppointmentFilter, DashboardStats};
use crate::http::error_response;
use crate::types::{Appointment, AppointmentStatus};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub fn router<T, M, C>() -> Router<AppState<T, M, C>>
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    Router::new()
        .route("/admin/dashboard", get(get_dashboard))
        .route("/admin/slots", get(get_admin_slots).post(add_slot))
        .route("/admin/slots/bulk", post(add_slots_bulk))
        .route("/admin/slots/week", post(add_week_slots))
        .route("/admin/slots/:id", delete(remove_slot))
        .route("/admin/appointments", get(list_appointments))
        .route("/admin/appointments/bulk", post(bulk_action))
        .route("/admin/appointments/:id/accept", post(accept_appointment))
        .route("/admin/appointments/:id/reject", post(reject_appointment))
        .route("/admin/export", get(export_csv))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AddSlotRequest {
    datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BulkSlotsRequest {
    date: NaiveDate,
    /// `HH:MM` entries, like the quick-add time chips.
    times: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotsCreatedResponse {
    created: usize,
    skipped: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BulkActionKind {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BulkActionRequest {
    action: BulkActionKind,
    ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BulkFailure {
    id: Uuid,
    error: String,
}

/// Per-item outcome of a bulk run; failures never roll back the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BulkOutcome {
    succeeded: Vec<Uuid>,
    failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListQuery {
    view: Option<String>,
    search: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    status: Option<String>,
    page: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportQuery {
    scope: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct DashboardResponse {
    available_slots: usize,
    #[serde(flatten)]
    stats: DashboardStats,
}

async fn get_admin_slots<T, M, C>(State(state): State<AppState<T, M, C>>) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    match state.backend.available_slots() {
        Ok(slots) => Json(slots).into_response(),
        Err(err) => error_response(err),
    }
}

async fn add_slot<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Json(request): Json<AddSlotRequest>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    if request.datetime <= Utc::now() {
        return error_response(BookingError::Validation(
            "La fecha y hora deben ser en el futuro".to_string(),
        ));
    }
    match state.backend.add_slot(request.datetime) {
        Ok(slot) => (StatusCode::CREATED, Json(slot)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn add_slots_bulk<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Json(request): Json<BulkSlotsRequest>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    if request.times.is_empty() {
        return error_response(BookingError::Validation(
            "Selecciona al menos una fecha y hora".to_string(),
        ));
    }

    let now = Utc::now();
    let mut created = 0;
    let mut skipped = 0;
    for raw in &request.times {
        let time = match NaiveTime::parse_from_str(raw, "%H:%M") {
            Ok(time) => time,
            Err(_) => {
                return error_response(BookingError::Validation(format!(
                    "Hora inválida: {raw}"
                )))
            }
        };
        let datetime = request.date.and_time(time).and_utc();
        // Past datetimes are quietly skipped, like the quick-add modal.
        if datetime <= now {
            skipped += 1;
            continue;
        }
        if let Err(err) = state.backend.add_slot(datetime) {
            return error_response(err);
        }
        created += 1;
    }

    info!(created, skipped, "horarios agregados en lote");
    Json(SlotsCreatedResponse { created, skipped }).into_response()
}

async fn add_week_slots<T, M, C>(State(state): State<AppState<T, M, C>>) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    let mut created = 0;
    for datetime in week_template(Utc::now().date_naive()) {
        if let Err(err) = state.backend.add_slot(datetime) {
            return error_response(err);
        }
        created += 1;
    }
    Json(SlotsCreatedResponse {
        created,
        skipped: 0,
    })
    .into_response()
}

/// Next Monday through Friday, 09:00 to 17:00 hourly.
fn week_template(today: NaiveDate) -> Vec<DateTime<Utc>> {
    let days_until_monday = match today.weekday().num_days_from_sunday() {
        0 => 1,
        weekday => 8 - weekday as i64,
    };
    let monday = today + chrono::Duration::days(days_until_monday);

    let mut slots = Vec::new();
    for day in 0..5 {
        let date = monday + chrono::Duration::days(day);
        for hour in 9..=17 {
            let datetime = date
                .and_hms_opt(hour, 0, 0)
                .expect("valid business hour")
                .and_utc();
            slots.push(datetime);
        }
    }
    slots
}

async fn remove_slot<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Path(id): Path<Uuid>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    match state.backend.remove_slot(id) {
        Ok(()) => (StatusCode::OK, "Horario eliminado exitosamente".to_string()).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_appointments<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    let appointments = match state.backend.appointments() {
        Ok(appointments) => appointments,
        Err(err) => return error_response(err),
    };

    let view = query.view.as_deref().unwrap_or("pending");
    let subset: Vec<Appointment> = match view {
        "pending" => appointments
            .into_iter()
            .filter(|appointment| appointment.status == AppointmentStatus::Pending)
            .collect(),
        "confirmed" => appointments
            .into_iter()
            .filter(|appointment| appointment.status != AppointmentStatus::Pending)
            .collect(),
        "all" => appointments,
        other => {
            return error_response(BookingError::Validation(format!("Vista inválida: {other}")))
        }
    };

    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<AppointmentStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return error_response(BookingError::Validation(format!(
                    "Estado inválido: {raw}"
                )))
            }
        },
    };

    let filter = AppointmentFilter {
        search: query.search,
        from: query.from,
        to: query.to,
        status,
    };
    let filtered = filter.apply(&subset);
    Json(paginate(&filtered, query.page.unwrap_or(1))).into_response()
}

async fn accept_appointment<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Path(id): Path<Uuid>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    match state.backend.accept_appointment(id) {
        Ok(appointment) => {
            let shop = state.configuration.website_title();
            email::send_best_effort(
                &state.mailer,
                email::acceptance_confirmation(&appointment, &shop),
            )
            .await;
            info!(appointment = %appointment.id, "cita aceptada");
            Json(appointment).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn reject_appointment<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Path(id): Path<Uuid>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    match state.backend.reject_appointment(id) {
        Ok(appointment) => {
            let shop = state.configuration.website_title();
            email::send_best_effort(
                &state.mailer,
                email::rejection_notice(&appointment, &shop),
            )
            .await;
            info!(appointment = %appointment.id, "cita rechazada");
            Json(appointment).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn bulk_action<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Json(request): Json<BulkActionRequest>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    let shop = state.configuration.website_title();
    let BulkActionRequest { action, ids } = request;

    // One independent operation per selected id, joined at the end. A
    // failed item reports its error and leaves the others committed.
    let tasks = ids.into_iter().map(|id| {
        let state = state.clone();
        let shop = shop.clone();
        async move {
            let result = match action {
                BulkActionKind::Accept => state.backend.accept_appointment(id),
                BulkActionKind::Reject => state.backend.reject_appointment(id),
            };
            match result {
                Ok(appointment) => {
                    let message = match action {
                        BulkActionKind::Accept => {
                            email::acceptance_confirmation(&appointment, &shop)
                        }
                        BulkActionKind::Reject => email::rejection_notice(&appointment, &shop),
                    };
                    email::send_best_effort(&state.mailer, message).await;
                    (id, Ok(()))
                }
                Err(err) => (id, Err(err.to_string())),
            }
        }
    });

    let mut outcome = BulkOutcome {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (id, result) in join_all(tasks).await {
        match result {
            Ok(()) => outcome.succeeded.push(id),
            Err(error) => outcome.failed.push(BulkFailure { id, error }),
        }
    }

    info!(
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "acción en lote terminada"
    );
    Json(outcome).into_response()
}

async fn export_csv<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Query(query): Query<ExportQuery>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    let scope: ExportScope = match query.scope.as_deref().unwrap_or("all").parse() {
        Ok(scope) => scope,
        Err(_) => {
            return error_response(BookingError::Validation("Alcance inválido".to_string()))
        }
    };

    let appointments = match state.backend.appointments() {
        Ok(appointments) => appointments,
        Err(err) => return error_response(err),
    };

    match appointments_to_csv(&scope.filter(&appointments)) {
        Ok(csv) => {
            let filename = export_filename(scope, Utc::now().date_naive());
            (
                [
                    ("content-type", "text/csv; charset=utf-8".to_string()),
                    (
                        "content-disposition",
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                csv,
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn get_dashboard<T, M, C>(State(state): State<AppState<T, M, C>>) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    // Both listings are issued together and joined before deriving stats.
    let slots_backend = state.backend.clone();
    let appointments_backend = state.backend.clone();
    let (slots, appointments) = tokio::join!(
        async move { slots_backend.available_slots() },
        async move { appointments_backend.appointments() },
    );

    let slots = match slots {
        Ok(slots) => slots,
        Err(err) => return error_response(err),
    };
    let appointments = match appointments {
        Ok(appointments) => appointments,
        Err(err) => return error_response(err),
    };

    Json(DashboardResponse {
        available_slots: slots.len(),
        stats: dashboard_stats(&appointments, Utc::now()),
    })
    .into_response()
}
