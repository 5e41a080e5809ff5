use std::path::PathBuf;

/// Settings for the templated email-dispatch API. Absent settings disable
/// email sends entirely.
#[derive(Debug, Clone)]
pub struct EmailApiSettings {
    pub endpoint: String,
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

pub trait Configuration: Clone + Send + Sync + 'static {
    /// Shop name used in email subjects and signatures.
    fn website_title(&self) -> String;
    /// Shared admin password checked on every admin request.
    fn password(&self) -> String;
    fn port(&self) -> String;
    /// When absent, the impersistent in-memory backend is used.
    fn database_url(&self) -> Option<String>;
    /// Directory holding the uploaded identification files.
    fn upload_dir(&self) -> PathBuf;
    /// Base URL under which stored files are publicly reachable.
    fn public_base_url(&self) -> String;
    /// Inbox for new-request alerts. Absent means no admin alert is sent.
    fn admin_email(&self) -> Option<String>;
    fn email_api(&self) -> Option<EmailApiSettings>;
}
