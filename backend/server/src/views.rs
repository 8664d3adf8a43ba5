//! # Pages
//!
//! Server-rendered HTML. Every value that came from a user goes through
//! [`escape`] before it is written into markup.
use std::fmt::Write;

use axum::response::Html;

use crate::models::Student;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_ADMIN_CREDENTIALS: &str = "Invalid Admin credentials";

pub fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }

    escaped
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
</head>
<body>
    <h1>{title}</h1>
{body}
</body>
</html>
"#
    ))
}

fn error_banner(error: Option<&str>) -> String {
    error
        .map(|message| format!(r#"    <p class="error">{}</p>"#, escape(message)))
        .unwrap_or_default()
}

fn input(label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        r#"        <label>{label} <input type="{kind}" name="{name}" value="{}"></label><br>"#,
        escape(value)
    )
}

fn form(action: &str, fields: &[String], submit: &str) -> String {
    let fields = fields.join("\n");

    format!(
        r#"    <form method="post" action="{action}">
{fields}
        <button type="submit">{submit}</button>
    </form>"#
    )
}

pub fn register_page() -> Html<String> {
    let body = form(
        "/register",
        &[
            input("Name", "name", "text", ""),
            input("Phone", "phone", "tel", ""),
            input("Password", "password", "password", ""),
        ],
        "Register",
    );

    page(
        "Student Registration",
        &format!("{body}\n    <p><a href=\"/login\">Already registered? Log in</a></p>"),
    )
}

pub fn login_page(error: Option<&str>) -> Html<String> {
    let body = form(
        "/login",
        &[
            input("Phone", "phone", "tel", ""),
            input("Password", "password", "password", ""),
        ],
        "Log in",
    );

    page(
        "Student Login",
        &format!(
            "{}\n{body}\n    <p><a href=\"/register\">Register</a></p>",
            error_banner(error)
        ),
    )
}

pub fn profile_page(student: &Student) -> Html<String> {
    let rows = [
        ("Name", &student.name),
        ("Phone", &student.phone),
        ("Branch", &student.branch),
        ("College", &student.college),
        ("Year", &student.year),
        ("Address", &student.address),
    ]
    .iter()
    .map(|(label, value)| format!("        <dt>{label}</dt><dd>{}</dd>", escape(value)))
    .collect::<Vec<_>>()
    .join("\n");

    page("Student Profile", &format!("    <dl>\n{rows}\n    </dl>"))
}

pub fn admin_register_page() -> Html<String> {
    let body = form(
        "/admin/register",
        &[
            input("Username", "username", "text", ""),
            input("Phone", "phone", "tel", ""),
            input("Password", "password", "password", ""),
        ],
        "Register",
    );

    page(
        "Admin Registration",
        &format!("{body}\n    <p><a href=\"/admin/login\">Admin login</a></p>"),
    )
}

pub fn admin_login_page(error: Option<&str>) -> Html<String> {
    let body = form(
        "/admin/login",
        &[
            input("Username", "username", "text", ""),
            input("Password", "password", "password", ""),
        ],
        "Log in",
    );

    page("Admin Login", &format!("{}\n{body}", error_banner(error)))
}

pub fn dashboard_page(students: &[Student]) -> Html<String> {
    let mut rows = String::new();

    for student in students {
        let _ = writeln!(
            rows,
            "        <tr><td>{id}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/admin/edit/{id}\">Edit</a> \
             <a href=\"/admin/delete/{id}\">Delete</a></td></tr>",
            escape(&student.name),
            escape(&student.phone),
            escape(&student.branch),
            escape(&student.college),
            escape(&student.year),
            escape(&student.address),
            id = student.id,
        );
    }

    if students.is_empty() {
        rows.push_str("        <tr><td colspan=\"8\">No students yet</td></tr>\n");
    }

    page(
        "Admin Dashboard",
        &format!(
            "    <p><a href=\"/admin/add\">Add student</a></p>\n    <table>\n        \
             <tr><th>ID</th><th>Name</th><th>Phone</th><th>Branch</th>\
             <th>College</th><th>Year</th><th>Address</th><th></th></tr>\n\
             {rows}    </table>"
        ),
    )
}

pub fn add_student_page() -> Html<String> {
    let body = form(
        "/admin/add",
        &[
            input("Name", "name", "text", ""),
            input("Phone", "phone", "tel", ""),
            input("Password", "password", "password", ""),
            input("Branch", "branch", "text", ""),
            input("College", "college", "text", ""),
            input("Year", "year", "text", ""),
            input("Address", "address", "text", ""),
        ],
        "Add",
    );

    page("Add Student", &body)
}

pub fn edit_student_page(student: &Student) -> Html<String> {
    let id = student.id;
    let body = form(
        &format!("/admin/edit/{id}"),
        &[
            format!(r#"        <input type="hidden" name="id" value="{id}">"#),
            input("Branch", "branch", "text", &student.branch),
            input("College", "college", "text", &student.college),
            input("Year", "year", "text", &student.year),
            input("Address", "address", "text", &student.address),
        ],
        "Save",
    );

    page(&format!("Edit {}", escape(&student.name)), &body)
}
