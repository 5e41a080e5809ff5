use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

lazy_static! {
    // Letters, spaces, accents and hyphens only.
    static ref NAME_RE: Regex = Regex::new(r"(?i)^[a-záéíóúñü\s\-]+$").unwrap();
    // RFC 5322 simplified.
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~\-]+@[a-zA-Z0-9](?:[a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .unwrap();
    // +52XXXXXXXXXX or 10 digits, after stripping spaces, dashes and parens.
    static ref PHONE_RE: Regex = Regex::new(r"^(\+?52)?\d{10}$").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "application/pdf"];
const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".pdf"];

/// Contact details entered on step 3 of the wizard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(custom(function = validate_name))]
    pub name: String,
    #[validate(custom(function = validate_email))]
    pub email: String,
    #[validate(custom(function = validate_phone))]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

/// Metadata of the identification file attached on step 3.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMeta {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

fn fail(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(fail("name", "El nombre es requerido"));
    }
    if trimmed.chars().count() < 3 {
        return Err(fail("name", "El nombre debe tener al menos 3 caracteres"));
    }
    if !NAME_RE.is_match(trimmed) {
        return Err(fail("name", "El nombre solo puede contener letras"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(fail("email", "El email es requerido"));
    }
    if !EMAIL_RE.is_match(trimmed) {
        return Err(fail(
            "email",
            "Ingresa un email válido (ej: nombre@ejemplo.com)",
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(fail("phone", "El teléfono es requerido"));
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    if !PHONE_RE.is_match(&cleaned) {
        return Err(fail(
            "phone",
            "Formato válido: +52 XXX XXX XXXX o 10 dígitos",
        ));
    }
    Ok(())
}

pub fn validate_file(file: &FileMeta) -> Result<(), ValidationError> {
    if file.size > MAX_FILE_SIZE {
        return Err(fail(
            "identification",
            "El archivo es muy grande. Máximo 5MB",
        ));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
        return Err(fail(
            "identification",
            "Formato no permitido. Usa JPG, PNG o PDF",
        ));
    }
    let lowered = file.filename.to_lowercase();
    if !ALLOWED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
        return Err(fail(
            "identification",
            "Extensión no permitida. Usa .jpg, .png o .pdf",
        ));
    }
    Ok(())
}

/// First message of a failed `ContactForm::validate`, in field order.
pub fn first_message(errors: &ValidationErrors) -> String {
    let by_field = errors.field_errors();
    for field in ["name", "email", "phone"] {
        if let Some(list) = by_field.get(field) {
            if let Some(err) = list.first() {
                if let Some(message) = &err.message {
                    return message.to_string();
                }
            }
        }
    }
    "Datos inválidos".to_string()
}

/// Progressive `XXX XXX XXXX` grouping, discarding a leading +52/52 prefix.
pub fn format_phone(raw: &str) -> String {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if let Some(rest) = cleaned.strip_prefix("+52") {
        cleaned = rest.to_string();
    } else if let Some(rest) = cleaned.strip_prefix("52") {
        cleaned = rest.to_string();
    }

    let digits: String = cleaned
        .chars()
        .filter(char::is_ascii_digit)
        .take(10)
        .collect();

    match digits.len() {
        0..=3 => digits,
        4..=6 => format!("{} {}", &digits[..3], &digits[3..]),
        _ => format!("{} {} {}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}

/// Trims, collapses whitespace runs and strips HTML tags.
pub fn sanitize_text(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, "");
    WHITESPACE_RE
        .replace_all(without_tags.trim(), " ")
        .to_string()
}

/// Lower-cases the text, then upper-cases the first letter of each word.
pub fn capitalize_words(text: &str) -> String {
    text.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable file size, e.g. `2.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}
