use serde::Deserialize;

/// One row of the `students` table, minus the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub branch: String,
    pub college: String,
    pub year: String,
    pub address: String,
}

/// Validated student ready for insertion. Empty profile fields are stored as NULL.
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub branch: Option<String>,
    pub college: Option<String>,
    pub year: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentUpdate {
    pub branch: String,
    pub college: String,
    pub year: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub phone: Option<String>,
    pub password_hash: String,
}

/// Stored id and hash for a login lookup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: i64,
    pub password_hash: String,
}

// Form payloads. Missing fields deserialize as empty strings and are
// rejected during validation.

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub phone: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginForm {
    pub phone: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AdminRegisterForm {
    pub username: String,
    pub phone: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AdminLoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AddStudentForm {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub branch: String,
    pub college: String,
    pub year: String,
    pub address: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct EditStudentForm {
    pub id: String,
    pub branch: String,
    pub college: String,
    pub year: String,
    pub address: String,
}
