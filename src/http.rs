use crate::admin_http;
use crate::backend::BookingBackend;
use crate::calendar::{self, MonthGrid};
use crate::configuration::Configuration;
use crate::email::{self, Mailer};
use crate::error::BookingError;
use crate::types::Appointment;
use crate::validation::{ContactForm, FileMeta};
use crate::wizard::BookingWizard;
use crate::AppState;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

// Uploads are validated at 5 MB; the body cap just leaves headroom for the
// multipart framing and the text fields.
const MAX_UPLOAD_BODY: usize = 8 * 1024 * 1024;

pub fn create_app<T, M, C>(state: AppState<T, M, C>) -> Router
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/slots", get(get_slots))
        .route("/calendar/:year/:month", get(get_calendar))
        .route("/book", post(book_appointment))
        .route("/identifications/:file", get(download_identification));

    let password = state.configuration.password();
    let admin = admin_http::router().route_layer(middleware::from_fn(
        move |request: Request, next: Next| {
            let password = password.clone();
            async move { admin_auth(password, request, next).await }
        },
    ));

    Router::new()
        .merge(public)
        .merge(admin)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY))
        .with_state(state)
        .layer(cors)
}

async fn admin_auth(
    password: String,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    match request.headers().get("x-admin-password") {
        Some(header) if header.to_str().unwrap_or("") == password => Ok(next.run(request).await),
        Some(_) => Err((StatusCode::UNAUTHORIZED, "Contraseña incorrecta".to_string())),
        None => Err((
            StatusCode::UNAUTHORIZED,
            "Falta la contraseña de administrador".to_string(),
        )),
    }
}

pub(crate) fn error_response(err: BookingError) -> Response {
    (err.status_code(), err.to_string()).into_response()
}

async fn get_slots<T, M, C>(State(state): State<AppState<T, M, C>>) -> Response
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

async fn get_calendar<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Path((year, month)): Path<(i32, u32)>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    let slots = match state.backend.available_slots() {
        Ok(slots) => slots,
        Err(err) => return error_response(err),
    };
    let today = Utc::now().date_naive();
    match MonthGrid::build(year, month, today, &calendar::days_with_slots(&slots)) {
        Some(grid) => Json(grid).into_response(),
        None => (StatusCode::BAD_REQUEST, "Mes inválido".to_string()).into_response(),
    }
}

async fn book_appointment<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    multipart: Multipart,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    match handle_booking(&state, multipart).await {
        Ok(appointment) => (StatusCode::CREATED, Json(appointment)).into_response(),
        Err(err) => error_response(err),
    }
}

/// The whole step-4 confirm pipeline: wizard guards, then upload, then the
/// appointment write, then best-effort notifications.
async fn handle_booking<T, M, C>(
    state: &AppState<T, M, C>,
    mut multipart: Multipart,
) -> Result<Appointment, BookingError>
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    let mut form = ContactForm::default();
    let mut slot_id: Option<Uuid> = None;
    let mut file: Option<(FileMeta, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| BookingError::Validation(err.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "name" => form.name = text(field).await?,
            "email" => form.email = text(field).await?,
            "phone" => form.phone = text(field).await?,
            "notes" => form.notes = text(field).await?,
            "slot_id" => {
                slot_id = Some(text(field).await?.parse().map_err(|_| {
                    BookingError::Validation("Identificador de horario inválido".to_string())
                })?);
            }
            "identification" => {
                let filename = field.file_name().unwrap_or("identificacion").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| BookingError::Validation(err.to_string()))?;
                file = Some((
                    FileMeta {
                        filename,
                        content_type,
                        size: bytes.len(),
                    },
                    bytes.to_vec(),
                ));
            }
            _ => {}
        }
    }

    let slot_id =
        slot_id.ok_or_else(|| BookingError::Validation("Selecciona un horario".to_string()))?;
    let (file_meta, file_bytes) = file.ok_or_else(|| {
        BookingError::Validation("Debes adjuntar tu identificación".to_string())
    })?;

    let now = Utc::now();
    let slots = state.backend.available_slots()?;
    let slot = slots
        .iter()
        .find(|slot| slot.id == slot_id)
        .cloned()
        .ok_or(BookingError::SlotUnavailable)?;

    // Drive the wizard start to finish; its guards are the validation
    // pipeline, so nothing below runs on bad input.
    let mut wizard = BookingWizard::new(slots, now);
    wizard.select_date(slot.datetime.date_naive())?;
    wizard.select_slot(slot.id)?;
    wizard.submit_contact(form, file_meta)?;
    let draft = wizard.confirm()?;

    // Upload first; a failure here leaves no partial appointment record.
    let identification_url = state.uploads.store(&draft.file, &file_bytes, now).await?;
    let appointment = state
        .backend
        .create_appointment(draft.into_new_appointment(identification_url))?;

    let shop = state.configuration.website_title();
    email::send_best_effort(&state.mailer, email::booking_received(&appointment, &shop)).await;
    if let Some(admin_email) = state.configuration.admin_email() {
        email::send_best_effort(
            &state.mailer,
            email::admin_alert(&appointment, &admin_email, &shop),
        )
        .await;
    }

    info!(appointment = %appointment.id, "nueva cita registrada");
    Ok(appointment)
}

async fn text(field: Field<'_>) -> Result<String, BookingError> {
    field
        .text()
        .await
        .map_err(|err| BookingError::Validation(err.to_string()))
}

async fn download_identification<T, M, C>(
    State(state): State<AppState<T, M, C>>,
    Path(file): Path<String>,
) -> Response
where
    T: BookingBackend,
    M: Mailer,
    C: Configuration,
{
    match state.uploads.read(&file).await {
        Ok((bytes, content_type)) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutils::{MockBookingBackend, RecordingMailer, TestConfiguration};
    use crate::types::{AppointmentStatus, Slot};
    use crate::uploads::IdentificationStore;
    use chrono::Duration;
    use reqwest::multipart::{Form, Part};
    use reqwest::Client;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;
    use tokio::task::JoinHandle;

    struct TestServer {
        base_url: String,
        backend: MockBookingBackend,
        mailer: RecordingMailer,
        _upload_dir: TempDir,
        handle: JoinHandle<()>,
    }

    async fn init() -> TestServer {
        let backend = MockBookingBackend::new();
        let mailer = RecordingMailer::default();
        let upload_dir = tempfile::tempdir().unwrap();
        let state = AppState {
            backend: backend.clone(),
            mailer: mailer.clone(),
            uploads: IdentificationStore::new(
                upload_dir.path().to_path_buf(),
                "http://localhost:3000",
            ),
            configuration: TestConfiguration {
                upload_dir: upload_dir.path().to_path_buf(),
                admin_email: Some("citas@ciaociao.mx".into()),
            },
        };
        let app = create_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            base_url,
            backend,
            mailer,
            _upload_dir: upload_dir,
            handle,
        }
    }

    fn future_slot(hours: i64) -> Slot {
        let datetime = Utc::now() + Duration::hours(hours);
        Slot {
            id: Uuid::new_v4(),
            datetime,
            available: true,
            created_at: Utc::now(),
        }
    }

    fn booking_form(slot_id: Uuid) -> Form {
        Form::new()
            .text("name", "ana lópez")
            .text("email", "Ana@Example.com")
            .text("phone", "+525512345678")
            .text("notes", "Quiero ver anillos")
            .text("slot_id", slot_id.to_string())
            .part(
                "identification",
                Part::bytes(vec![0xFF; 1024])
                    .file_name("ine.jpg")
                    .mime_str("image/jpeg")
                    .unwrap(),
            )
    }

    #[tokio::test]
    async fn booking_creates_a_pending_appointment_and_sends_two_emails() {
        let server = init().await;
        let slot = future_slot(24);
        server.backend.inject_slot(slot.clone());

        let response = Client::new()
            .post(format!("{}/book", server.base_url))
            .multipart(booking_form(slot.id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED.as_u16());

        let appointment: Appointment = response.json().await.unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.name, "Ana López");
        assert_eq!(appointment.phone, "551 234 5678");
        assert!(appointment
            .identification_url
            .contains("/identifications/"));

        assert_eq!(
            server
                .backend
                .0
                .calls_to_create_appointment
                .load(Ordering::SeqCst),
            1
        );
        assert_eq!(
            server.mailer.sent_subjects(),
            vec![
                "Solicitud de Cita Recibida - Ciao Ciao Joyería".to_string(),
                "Nueva Solicitud de Cita - Ciao Ciao Joyería".to_string(),
            ]
        );

        server.handle.abort();
    }

    #[tokio::test]
    async fn booking_with_a_bad_phone_never_reaches_the_backend() {
        let server = init().await;
        let slot = future_slot(24);
        server.backend.inject_slot(slot.clone());

        let form = Form::new()
            .text("name", "Ana López")
            .text("email", "ana@example.com")
            .text("phone", "12345")
            .text("slot_id", slot.id.to_string())
            .part(
                "identification",
                Part::bytes(vec![0xFF; 16])
                    .file_name("ine.jpg")
                    .mime_str("image/jpeg")
                    .unwrap(),
            );

        let response = Client::new()
            .post(format!("{}/book", server.base_url))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY.as_u16());
        assert_eq!(
            response.text().await.unwrap(),
            "Formato válido: +52 XXX XXX XXXX o 10 dígitos"
        );

        assert_eq!(
            server
                .backend
                .0
                .calls_to_create_appointment
                .load(Ordering::SeqCst),
            0
        );
        assert!(server.mailer.sent_subjects().is_empty());

        server.handle.abort();
    }

    #[tokio::test]
    async fn booking_an_unknown_slot_conflicts() {
        let server = init().await;

        let response = Client::new()
            .post(format!("{}/book", server.base_url))
            .multipart(booking_form(Uuid::new_v4()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT.as_u16());

        server.handle.abort();
    }

    #[tokio::test]
    async fn email_failures_do_not_fail_the_booking() {
        let server = init().await;
        let slot = future_slot(24);
        server.backend.inject_slot(slot.clone());
        server.mailer.fail.store(true, Ordering::SeqCst);

        let response = Client::new()
            .post(format!("{}/book", server.base_url))
            .multipart(booking_form(slot.id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED.as_u16());
        assert_eq!(
            server
                .backend
                .0
                .calls_to_create_appointment
                .load(Ordering::SeqCst),
            1
        );

        server.handle.abort();
    }

    #[tokio::test]
    async fn slots_endpoint_lists_the_backend_snapshot() {
        let server = init().await;
        server.backend.inject_slot(future_slot(24));
        server.backend.inject_slot(future_slot(48));

        let response = Client::new()
            .get(format!("{}/slots", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());
        let slots: Vec<Slot> = response.json().await.unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots[0].datetime <= slots[1].datetime);
        assert_eq!(
            server
                .backend
                .0
                .calls_to_available_slots
                .load(Ordering::SeqCst),
            1
        );

        server.handle.abort();
    }

    #[tokio::test]
    async fn calendar_marks_days_with_slots() {
        let server = init().await;
        let slot = future_slot(48);
        server.backend.inject_slot(slot.clone());

        let date = slot.datetime.date_naive();
        let response = Client::new()
            .get(format!(
                "{}/calendar/{}/{}",
                server.base_url,
                date.format("%Y"),
                date.format("%m")
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());

        let grid: serde_json::Value = response.json().await.unwrap();
        let key = date.format("%Y-%m-%d").to_string();
        let marked = grid["days"]
            .as_array()
            .unwrap()
            .iter()
            .any(|day| day["date_key"] == key.as_str() && day["has_slots"] == true);
        assert!(marked);

        let bad_month = Client::new()
            .get(format!("{}/calendar/2025/13", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_month.status(), StatusCode::BAD_REQUEST.as_u16());

        server.handle.abort();
    }

    #[tokio::test]
    async fn uploaded_identifications_can_be_downloaded() {
        let server = init().await;
        let slot = future_slot(24);
        server.backend.inject_slot(slot.clone());

        let client = Client::new();
        let response = client
            .post(format!("{}/book", server.base_url))
            .multipart(booking_form(slot.id))
            .send()
            .await
            .unwrap();
        let appointment: Appointment = response.json().await.unwrap();

        let object_name = appointment
            .identification_url
            .rsplit('/')
            .next()
            .unwrap()
            .to_string();
        let download = client
            .get(format!(
                "{}/identifications/{}",
                server.base_url, object_name
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(download.status(), StatusCode::OK.as_u16());
        assert_eq!(
            download.headers().get("content-type").unwrap(),
            "image/jpeg"
        );
        assert_eq!(download.bytes().await.unwrap().len(), 1024);

        server.handle.abort();
    }

    #[test_case::test_case("get", "admin/appointments")]
    #[test_case::test_case("get", "admin/dashboard")]
    #[test_case::test_case("get", "admin/export")]
    #[test_case::test_case("get", "admin/slots")]
    #[test_case::test_case("post", "admin/slots/week")]
    #[tokio::test]
    async fn admin_routes_require_the_password(method: &str, path: &str) {
        let server = init().await;
        let client = Client::new();
        let url = format!("{}/{}", server.base_url, path);

        let request = match method {
            "get" => client.get(&url),
            "post" => client.post(&url),
            other => panic!("unsupported HTTP method: {other}"),
        };
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED.as_u16());

        let request = match method {
            "get" => client.get(&url),
            "post" => client.post(&url),
            other => panic!("unsupported HTTP method: {other}"),
        };
        let response = request
            .header("x-admin-password", "wrong")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED.as_u16());
        assert_eq!(response.text().await.unwrap(), "Contraseña incorrecta");

        server.handle.abort();
    }

    #[tokio::test]
    async fn public_routes_need_no_password() {
        let server = init().await;
        let response = Client::new()
            .get(format!("{}/slots", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());
        server.handle.abort();
    }
}
