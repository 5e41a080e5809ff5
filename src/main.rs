use std::time::Duration;

use crate::backend::BookingBackend;
use crate::configuration::Configuration;
use crate::configuration_handler::ConfigurationHandler;
use crate::database_store::DatabaseStore;
use crate::email::{Mailer, NotificationMailer};
use crate::http::create_app;
use crate::local_store::LocalStore;
use crate::uploads::IdentificationStore;
use tokio::time::sleep;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod admin_http;
mod backend;
mod calendar;
mod configuration;
mod configuration_handler;
mod csv_export;
mod database_store;
mod email;
mod error;
mod filters;
mod http;
mod local_store;
mod schema;
#[cfg(test)]
mod testutils;
mod types;
mod uploads;
mod validation;
mod wizard;

#[derive(Clone)]
pub struct AppState<T: BookingBackend, M: Mailer, C: Configuration> {
    pub backend: T,
    pub mailer: M,
    pub uploads: IdentificationStore,
    pub configuration: C,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("################");
    println!("# Cita Manager #");
    println!("################");

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    println!("Accessable at:\n{}", address.clone());
    let listener = tokio::net::TcpListener::bind(address).await.unwrap();

    let mailer = NotificationMailer::from_settings(configuration.email_api());
    let uploads = IdentificationStore::new(
        configuration.upload_dir(),
        &configuration.public_base_url(),
    );

    let app = if let Some(database_url) = configuration.database_url() {
        let backend = loop {
            match DatabaseStore::new(&database_url) {
                Ok(backend) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Err(err) => {
                    error!(?err, "Failed to establish database connection: {database_url}. Retry in 1 sec. You may want to restart it with database disabled (impersistent slots).");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        create_app(AppState {
            backend,
            mailer,
            uploads,
            configuration,
        })
    } else {
        let backend = LocalStore::default();
        backend.insert_example_slots();
        create_app(AppState {
            backend,
            mailer,
            uploads,
            configuration,
        })
    };

    axum::serve(listener, app).await.unwrap();
}
