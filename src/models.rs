use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// Student
///
/// The persisted student record from the `siswa` table.
/// Column names follow the legacy schema, so every descriptive field is renamed
/// for sqlx. The struct never crosses the wire directly; handlers always answer
/// with a `StudentResponse`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Default)]
pub struct Student {
    // Store-assigned. Zero until the row has been inserted.
    pub id: i64,
    #[sqlx(rename = "nama")]
    pub name: String,
    #[sqlx(rename = "alamat")]
    pub address: String,
    #[sqlx(rename = "tanggal_lahir")]
    pub birth_date: String,
    #[sqlx(rename = "tempat_lahir")]
    pub birth_place: String,
    #[sqlx(rename = "jenis_kelamin")]
    pub sex: String,
    #[sqlx(rename = "agama")]
    pub religion: String,
    #[sqlx(rename = "golongan_darah")]
    pub blood_type: String,
    #[sqlx(rename = "no_telepon")]
    pub phone_number: String,
}

impl Student {
    /// Overwrites every descriptive field with the values from an update payload.
    /// The identifier is left alone.
    pub fn apply(&mut self, req: UpdateStudentRequest) {
        self.name = req.name;
        self.address = req.address;
        self.birth_date = req.birth_date;
        self.birth_place = req.birth_place;
        self.sex = req.sex;
        self.religion = req.religion;
        self.blood_type = req.blood_type;
        self.phone_number = req.phone_number;
    }
}

impl From<CreateStudentRequest> for Student {
    fn from(req: CreateStudentRequest) -> Self {
        Self {
            id: 0,
            name: req.name,
            address: req.address,
            birth_date: req.birth_date,
            birth_place: req.birth_place,
            sex: req.sex,
            religion: req.religion,
            blood_type: req.blood_type,
            phone_number: req.phone_number,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateStudentRequest
///
/// Input payload for POST /api/siswas.
/// Missing keys deserialize to empty strings so that an absent `name` reaches the
/// validator (400) instead of being rejected by the JSON extractor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct CreateStudentRequest {
    #[schema(example = "Gadget")]
    pub name: String,
    #[serde(rename = "alamat")]
    pub address: String,
    #[serde(rename = "tanggal_lahir")]
    pub birth_date: String,
    #[serde(rename = "tempat_lahir")]
    pub birth_place: String,
    #[serde(rename = "jenis_kelamin")]
    pub sex: String,
    #[serde(rename = "agama")]
    pub religion: String,
    #[serde(rename = "golongan_darah")]
    pub blood_type: String,
    #[serde(rename = "no_telepon")]
    pub phone_number: String,
}

/// UpdateStudentRequest
///
/// Full-replacement payload for PUT /api/siswas/{id}.
///
/// `id` is never read from the body: whatever the client sends under that key,
/// well-formed or not, is skipped. The service fills it from the request path
/// before touching the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct UpdateStudentRequest {
    #[serde(skip_deserializing)]
    #[ts(type = "number")]
    #[schema(read_only)]
    pub id: i64,
    #[schema(example = "Gadget")]
    pub name: String,
    #[serde(rename = "alamat")]
    pub address: String,
    #[serde(rename = "tanggal_lahir")]
    pub birth_date: String,
    #[serde(rename = "tempat_lahir")]
    pub birth_place: String,
    #[serde(rename = "jenis_kelamin")]
    pub sex: String,
    #[serde(rename = "agama")]
    pub religion: String,
    #[serde(rename = "golongan_darah")]
    pub blood_type: String,
    #[serde(rename = "no_telepon")]
    pub phone_number: String,
}

// --- Response Schemas (Output) ---

/// StudentResponse
///
/// The wire shape of a student. Keys are kept byte-for-byte compatible with the
/// existing clients of this API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StudentResponse {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    #[serde(rename = "alamat")]
    pub address: String,
    #[serde(rename = "tanggal_lahir")]
    pub birth_date: String,
    #[serde(rename = "tempat_lahir")]
    pub birth_place: String,
    #[serde(rename = "jenis_kelamin")]
    pub sex: String,
    #[serde(rename = "agama")]
    pub religion: String,
    #[serde(rename = "golongan_darah")]
    pub blood_type: String,
    #[serde(rename = "no_telepon")]
    pub phone_number: String,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            address: student.address,
            birth_date: student.birth_date,
            birth_place: student.birth_place,
            sex: student.sex,
            religion: student.religion,
            blood_type: student.blood_type,
            phone_number: student.phone_number,
        }
    }
}

/// WebResponse
///
/// The uniform envelope wrapped around every response body, success or failure.
/// `code` mirrors the HTTP status and `status` is its short upper-case label.
/// `data` is omitted from the JSON entirely when there is nothing to carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebResponse<T> {
    pub code: u16,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> WebResponse<T> {
    /// 200 envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self::with_status(StatusCode::OK, Some(data))
    }

    /// Envelope for an arbitrary status.
    pub fn with_status(status: StatusCode, data: Option<T>) -> Self {
        Self {
            code: status.as_u16(),
            status: status_text(status).to_string(),
            data,
        }
    }
}

impl WebResponse<()> {
    /// 200 envelope with no `data` key, used by DELETE.
    pub fn ok_empty() -> Self {
        Self::with_status(StatusCode::OK, None)
    }
}

/// status_text
///
/// Maps a status code to the label used in the envelope's `status` field.
/// Codes outside the API's vocabulary collapse to "ERROR".
pub fn status_text(status: StatusCode) -> &'static str {
    match status {
        StatusCode::OK => "OK",
        StatusCode::BAD_REQUEST => "BAD REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::NOT_FOUND => "NOT FOUND",
        StatusCode::INTERNAL_SERVER_ERROR => "INTERNAL SERVER ERROR",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD NOT ALLOWED",
        _ => "ERROR",
    }
}
