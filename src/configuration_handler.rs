use crate::configuration::{Configuration, EmailApiSettings};
use clap::Parser;
use std::env;
use std::path::PathBuf;

const DEFAULT_EMAIL_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Parser, Debug, Clone)]
#[command(name = "cita_manager", about = "Servicio de citas para el showroom")]
struct Arguments {
    /// Port the HTTP server listens on.
    #[arg(long, default_value = "3000")]
    port: String,

    /// PostgreSQL connection URL. Without it slots and appointments are
    /// impersistent (in-memory backend).
    #[arg(long)]
    database_url: Option<String>,

    /// Shared admin password for the panel.
    #[arg(long)]
    password: Option<String>,

    /// Directory for uploaded identification files.
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Base URL under which this server is reachable, used in download links.
    #[arg(long)]
    public_base_url: Option<String>,

    /// Inbox for new-request alerts.
    #[arg(long)]
    admin_email: Option<String>,

    #[arg(long, default_value = "Ciao Ciao Joyería")]
    website_title: String,
}

#[derive(Debug, Clone)]
pub struct ConfigurationHandler {
    website_title: String,
    password: String,
    port: String,
    database_url: Option<String>,
    upload_dir: PathBuf,
    public_base_url: String,
    admin_email: Option<String>,
    email_api: Option<EmailApiSettings>,
}

impl ConfigurationHandler {
    /// CLI flags first, then `.env`/environment, then defaults.
    pub fn parse_arguments() -> Self {
        dotenvy::dotenv().ok();
        let arguments = Arguments::parse();

        let port = arguments.port;
        let public_base_url = arguments
            .public_base_url
            .or_else(|| env::var("PUBLIC_BASE_URL").ok())
            .unwrap_or_else(|| default_public_base_url(&port));

        Self {
            website_title: arguments.website_title,
            password: arguments
                .password
                .or_else(|| env::var("ADMIN_PASSWORD").ok())
                .unwrap_or_else(|| "123".to_string()),
            database_url: arguments
                .database_url
                .or_else(|| env::var("DATABASE_URL").ok()),
            upload_dir: arguments.upload_dir,
            public_base_url,
            admin_email: arguments
                .admin_email
                .or_else(|| env::var("ADMIN_EMAIL").ok()),
            email_api: email_settings(
                env::var("EMAIL_API_ENDPOINT").ok(),
                env::var("EMAIL_SERVICE_ID").ok(),
                env::var("EMAIL_TEMPLATE_ID").ok(),
                env::var("EMAIL_PUBLIC_KEY").ok(),
            ),
            port,
        }
    }
}

fn default_public_base_url(port: &str) -> String {
    format!("http://localhost:{port}")
}

/// The dispatch API needs service, template and key; the endpoint has a
/// well-known default.
fn email_settings(
    endpoint: Option<String>,
    service_id: Option<String>,
    template_id: Option<String>,
    public_key: Option<String>,
) -> Option<EmailApiSettings> {
    Some(EmailApiSettings {
        endpoint: endpoint.unwrap_or_else(|| DEFAULT_EMAIL_ENDPOINT.to_string()),
        service_id: service_id?,
        template_id: template_id?,
        public_key: public_key?,
    })
}

impl Configuration for ConfigurationHandler {
    fn website_title(&self) -> String {
        self.website_title.clone()
    }

    fn password(&self) -> String {
        self.password.clone()
    }

    fn port(&self) -> String {
        self.port.clone()
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone()
    }

    fn upload_dir(&self) -> PathBuf {
        self.upload_dir.clone()
    }

    fn public_base_url(&self) -> String {
        self.public_base_url.clone()
    }

    fn admin_email(&self) -> Option<String> {
        self.admin_email.clone()
    }

    fn email_api(&self) -> Option<EmailApiSettings> {
        self.email_api.clone()
    }
}
