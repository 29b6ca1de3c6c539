use thiserror::Error;

use crate::models::{CreateStudentRequest, UpdateStudentRequest};

/// Width of every descriptive column in the `siswa` table.
pub const MAX_FIELD_LEN: usize = 255;

/// ValidationError
///
/// The first constraint a request payload violated. `field` is the JSON key the
/// client sent, so the rendered message points at something the client recognises.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate
///
/// Declared field constraints for an inbound payload. Runs before the service
/// opens a transaction, so it must not touch persistence.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for CreateStudentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_fields(&[
            Field::required("name", &self.name),
            Field::optional("alamat", &self.address),
            Field::optional("tanggal_lahir", &self.birth_date),
            Field::optional("tempat_lahir", &self.birth_place),
            Field::optional("jenis_kelamin", &self.sex),
            Field::optional("agama", &self.religion),
            Field::optional("golongan_darah", &self.blood_type),
            Field::optional("no_telepon", &self.phone_number),
        ])
    }
}

impl Validate for UpdateStudentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_fields(&[
            Field::required("name", &self.name),
            Field::optional("alamat", &self.address),
            Field::optional("tanggal_lahir", &self.birth_date),
            Field::optional("tempat_lahir", &self.birth_place),
            Field::optional("jenis_kelamin", &self.sex),
            Field::optional("agama", &self.religion),
            Field::optional("golongan_darah", &self.blood_type),
            Field::optional("no_telepon", &self.phone_number),
        ])
    }
}

/// One payload field as seen by the validator: its JSON key, its value, and
/// whether it must contain something other than whitespace.
struct Field<'a> {
    key: &'static str,
    value: &'a str,
    required: bool,
}

impl<'a> Field<'a> {
    fn required(key: &'static str, value: &'a str) -> Self {
        Self {
            key,
            value,
            required: true,
        }
    }

    fn optional(key: &'static str, value: &'a str) -> Self {
        Self {
            key,
            value,
            required: false,
        }
    }
}

// Fields are checked in order and the first violation wins.
fn check_fields(fields: &[Field<'_>]) -> Result<(), ValidationError> {
    for field in fields {
        if field.required && field.value.trim().is_empty() {
            return Err(ValidationError::new(field.key, "is required"));
        }
        if field.value.chars().count() > MAX_FIELD_LEN {
            return Err(ValidationError::new(
                field.key,
                format!("must be at most {MAX_FIELD_LEN} characters"),
            ));
        }
    }
    Ok(())
}
