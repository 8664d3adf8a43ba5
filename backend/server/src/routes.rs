use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, DatabaseError},
    models::{
        AddStudentForm, AdminLoginForm, AdminRegisterForm, Credentials, EditStudentForm,
        LoginForm, NewAdmin, NewStudent, RegisterForm, StudentUpdate,
    },
    password::{hash_password, verify_password},
    state::AppState,
    utils::{
        ADDRESS_LIMIT, NAME_LIMIT, YEAR_LIMIT, bounded, form_id, normalize_phone, optional,
        password, path_id, required,
    },
    views,
};

type AppStateRef = State<Arc<AppState>>;

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Students

pub async fn register_page() -> Html<String> {
    views::register_page()
}

pub async fn register_handler(
    State(state): AppStateRef,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    let name = required(&form.name, NAME_LIMIT)?;
    let phone = normalize_phone(&form.phone)?;
    let password_hash = hash_password(password(&form.password)?, state.config.bcrypt_cost).await?;

    let id = state
        .database
        .insert_student(NewStudent {
            name,
            phone,
            password_hash,
            ..NewStudent::default()
        })
        .await
        .map_err(AppError::database("Error registering student"))?;

    info!("Registered student {id}");

    Ok(Redirect::to("/login"))
}

pub async fn login_page() -> Html<String> {
    views::login_page(None)
}

pub async fn login_handler(
    State(state): AppStateRef,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Ok(phone) = normalize_phone(&form.phone) else {
        debug!("Rejected login with malformed phone");
        return Ok(views::login_page(Some(views::INVALID_CREDENTIALS)).into_response());
    };

    let credentials = state
        .database
        .student_credentials(phone)
        .await
        .map_err(AppError::database("Error logging in"))?;

    if let Some(id) = authenticate(&state, &form.password, credentials).await? {
        return Ok(Redirect::to(&format!("/student/{id}")).into_response());
    }

    warn!("Failed student login");

    Ok(views::login_page(Some(views::INVALID_CREDENTIALS)).into_response())
}

pub async fn profile_handler(
    State(state): AppStateRef,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let student = state
        .database
        .get_student(path_id(&id))
        .await
        .map_err(not_found_or("Error fetching student"))?;

    Ok(views::profile_page(&student))
}

// Admins

pub async fn admin_register_page() -> Html<String> {
    views::admin_register_page()
}

pub async fn admin_register_handler(
    State(state): AppStateRef,
    Form(form): Form<AdminRegisterForm>,
) -> Result<Redirect, AppError> {
    let username = required(&form.username, NAME_LIMIT)?;
    let phone = match form.phone.trim() {
        "" => None,
        raw => Some(normalize_phone(raw)?),
    };
    let password_hash = hash_password(password(&form.password)?, state.config.bcrypt_cost).await?;

    let id = state
        .database
        .insert_admin(NewAdmin {
            username,
            phone,
            password_hash,
        })
        .await
        .map_err(AppError::database("Error registering admin"))?;

    info!("Registered admin {id}");

    Ok(Redirect::to("/admin/login"))
}

pub async fn admin_login_page() -> Html<String> {
    views::admin_login_page(None)
}

pub async fn admin_login_handler(
    State(state): AppStateRef,
    Form(form): Form<AdminLoginForm>,
) -> Result<Response, AppError> {
    let credentials = state
        .database
        .admin_credentials(form.username.trim().to_string())
        .await
        .map_err(AppError::database("Error logging in"))?;

    if let Some(id) = authenticate(&state, &form.password, credentials).await? {
        info!("Admin {id} logged in");
        return Ok(Redirect::to("/admin/dashboard").into_response());
    }

    warn!("Failed admin login");

    Ok(views::admin_login_page(Some(views::INVALID_ADMIN_CREDENTIALS)).into_response())
}

pub async fn dashboard_handler(State(state): AppStateRef) -> Result<Html<String>, AppError> {
    let _permit = state
        .streams
        .acquire()
        .await
        .map_err(|e| AppError::InternalError(Box::new(e)))?;

    let students = state
        .database
        .list_students(state.config.stream_timeout)
        .await
        .into_result()?;

    debug!("Dashboard listing {} students", students.len());

    Ok(views::dashboard_page(&students))
}

pub async fn add_student_page() -> Html<String> {
    views::add_student_page()
}

pub async fn add_student_handler(
    State(state): AppStateRef,
    Form(form): Form<AddStudentForm>,
) -> Result<Redirect, AppError> {
    let name = required(&form.name, NAME_LIMIT)?;
    let phone = normalize_phone(&form.phone)?;
    let branch = optional(&form.branch, NAME_LIMIT)?;
    let college = optional(&form.college, NAME_LIMIT)?;
    let year = optional(&form.year, YEAR_LIMIT)?;
    let address = optional(&form.address, ADDRESS_LIMIT)?;
    let password_hash = hash_password(password(&form.password)?, state.config.bcrypt_cost).await?;

    let id = state
        .database
        .insert_student(NewStudent {
            name,
            phone,
            password_hash,
            branch,
            college,
            year,
            address,
        })
        .await
        .map_err(AppError::database("Error adding student"))?;

    info!("Admin added student {id}");

    Ok(Redirect::to("/admin/dashboard"))
}

pub async fn edit_student_page(
    State(state): AppStateRef,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let student = state
        .database
        .get_student(path_id(&id))
        .await
        .map_err(not_found_or("Error fetching student"))?;

    Ok(views::edit_student_page(&student))
}

/// The id comes from the submitted form, not the path.
pub async fn edit_student_handler(
    State(state): AppStateRef,
    Form(form): Form<EditStudentForm>,
) -> Result<Redirect, AppError> {
    let id = form_id(&form.id)?;

    let update = StudentUpdate {
        branch: bounded(&form.branch, NAME_LIMIT)?,
        college: bounded(&form.college, NAME_LIMIT)?,
        year: bounded(&form.year, YEAR_LIMIT)?,
        address: bounded(&form.address, ADDRESS_LIMIT)?,
    };

    if state
        .database
        .update_student(id, update)
        .await
        .map_err(AppError::database("Error updating student"))?
    {
        info!("Updated student {id}");
    }

    Ok(Redirect::to("/admin/dashboard"))
}

pub async fn delete_student_handler(
    State(state): AppStateRef,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id = path_id(&id);

    if state
        .database
        .delete_student(id)
        .await
        .map_err(AppError::database("Error deleting student"))?
    {
        info!("Deleted student {id}");
    }

    Ok(Redirect::to("/admin/dashboard"))
}

/// Id of the account when `password` matches. Unknown accounts are still run
/// through one bcrypt check against the decoy hash.
async fn authenticate(
    state: &AppState,
    password: &str,
    credentials: Option<Credentials>,
) -> Result<Option<i64>, AppError> {
    let Some(credentials) = credentials else {
        verify_password(password, &state.decoy_hash).await?;
        return Ok(None);
    };

    let verified = verify_password(password, &credentials.password_hash).await?;

    Ok(verified.then_some(credentials.id))
}

fn not_found_or(context: &'static str) -> impl FnOnce(DatabaseError) -> AppError {
    move |error| match error {
        DatabaseError::NotFound => AppError::NotFound("Student not found"),
        error => AppError::database(context)(error),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{
            Request,
            header::{CONTENT_TYPE, LOCATION},
        },
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        router,
        state::{DECOY_PASSWORD, testing},
    };

    const FORM: &str = "application/x-www-form-urlencoded";

    async fn app() -> Router {
        router(testing::state().await)
    }

    async fn get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post(app: &Router, uri: &str, body: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;

        let response = get(&app, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_form_pages_render() {
        let app = app().await;

        for uri in ["/register", "/login", "/admin/register", "/admin/login", "/admin/add"] {
            let response = get(&app, uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert!(text(response).await.contains("<form"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_register_login_profile() {
        let app = app().await;

        let registered = post(
            &app,
            "/register",
            "name=Asha+Rao&phone=9123456780&password=secret1",
        )
        .await;
        assert_eq!(registered.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&registered), "/login");

        let logged_in = post(&app, "/login", "phone=9123456780&password=secret1").await;
        assert_eq!(logged_in.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&logged_in), "/student/1");

        let profile = get(&app, "/student/1").await;
        assert_eq!(profile.status(), StatusCode::OK);
        let html = text(profile).await;
        assert!(html.contains("Asha Rao"));
        assert!(!html.contains("secret1"));
    }

    #[tokio::test]
    async fn test_wrong_password_rerenders_form() {
        let app = app().await;
        post(
            &app,
            "/register",
            "name=Asha&phone=9123456780&password=secret1",
        )
        .await;

        let response = post(&app, "/login", "phone=9123456780&password=wrong").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains(views::INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_unknown_phone_rerenders_form() {
        let app = app().await;

        let response = post(&app, "/login", "phone=not-a-phone&password=x").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains(views::INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let app = app().await;
        post(
            &app,
            "/register",
            "name=Asha&phone=9123456780&password=secret1",
        )
        .await;

        let response = post(
            &app,
            "/register",
            "name=Ravi&phone=9123456780&password=secret2",
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(text(response).await, "Error registering student");
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields() {
        let app = app().await;

        let response = post(&app, "/register", "phone=9123456780&password=secret1").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "Malformed payload");
    }

    #[tokio::test]
    async fn test_missing_profile() {
        let app = app().await;

        for uri in ["/student/42", "/student/abc"] {
            let response = get(&app, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(text(response).await, "Student not found");
        }
    }

    #[tokio::test]
    async fn test_seeded_admin_login() {
        let app = app().await;

        let response = post(&app, "/admin/login", "username=admin&password=admin123").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin/dashboard");
    }

    #[tokio::test]
    async fn test_admin_register_and_login() {
        let app = app().await;

        let registered = post(
            &app,
            "/admin/register",
            "username=dean&phone=&password=hunter22",
        )
        .await;
        assert_eq!(registered.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&registered), "/admin/login");

        let duplicate = post(&app, "/admin/register", "username=dean&password=other").await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
        assert_eq!(text(duplicate).await, "Error registering admin");

        let wrong = post(&app, "/admin/login", "username=dean&password=nope").await;
        assert_eq!(wrong.status(), StatusCode::OK);
        assert!(text(wrong).await.contains(views::INVALID_ADMIN_CREDENTIALS));

        let right = post(&app, "/admin/login", "username=dean&password=hunter22").await;
        assert_eq!(right.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_unknown_accounts_checked_against_decoy() {
        let state = testing::state().await;
        let app = router(state.clone());

        assert!(state.decoy_hash.starts_with("$2b$04$"));
        assert!(
            verify_password(DECOY_PASSWORD, &state.decoy_hash)
                .await
                .unwrap()
        );

        let body = format!("phone=9000000009&password={DECOY_PASSWORD}");
        let student = post(&app, "/login", &body).await;
        assert_eq!(student.status(), StatusCode::OK);
        assert!(text(student).await.contains(views::INVALID_CREDENTIALS));

        let body = format!("username=nobody&password={DECOY_PASSWORD}");
        let admin = post(&app, "/admin/login", &body).await;
        assert_eq!(admin.status(), StatusCode::OK);
        assert!(text(admin).await.contains(views::INVALID_ADMIN_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_dashboard_lists_in_order() {
        let app = app().await;
        for (name, phone) in [
            ("Zara", "9000000001"),
            ("Amit", "9000000002"),
            ("Lena", "9000000003"),
        ] {
            let body = format!(
                "name={name}&phone={phone}&password=pw&branch=CSE&college=NIT&year=1&address=Hostel"
            );
            let response = post(&app, "/admin/add", &body).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/admin/dashboard");
        }

        let response = get(&app, "/admin/dashboard").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = text(response).await;

        let zara = html.find("Zara").unwrap();
        let amit = html.find("Amit").unwrap();
        let lena = html.find("Lena").unwrap();
        assert!(zara < amit && amit < lena);
    }

    #[tokio::test]
    async fn test_concurrent_dashboards_share_permits() {
        let app = app().await;
        post(&app, "/admin/add", "name=Asha&phone=9000000001&password=pw").await;

        let (a, b, c, d) = tokio::join!(
            get(&app, "/admin/dashboard"),
            get(&app, "/admin/dashboard"),
            get(&app, "/admin/dashboard"),
            get(&app, "/admin/dashboard"),
        );

        for response in [a, b, c, d] {
            assert_eq!(response.status(), StatusCode::OK);
            assert!(text(response).await.contains("Asha"));
        }
    }

    #[tokio::test]
    async fn test_empty_dashboard() {
        let app = app().await;

        let response = get(&app, "/admin/dashboard").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains("No students yet"));
    }

    #[tokio::test]
    async fn test_dashboard_surfaces_scan_errors() {
        let state = testing::state().await;
        let app = router(state.clone());
        post(&app, "/admin/add", "name=Asha&phone=9000000001&password=pw").await;
        post(&app, "/admin/add", "name=Ravi&phone=9000000002&password=pw").await;

        state
            .database
            .execute_for_tests("UPDATE students SET name = X'00' WHERE id = 2")
            .await;

        let response = get(&app, "/admin/dashboard").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = text(response).await;
        assert_eq!(body, "Error scanning student: column 1: expected text, found blob");
        assert!(!body.contains("Asha"));
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let app = app().await;
        post(&app, "/admin/add", "name=Asha&phone=9000000001&password=pw").await;

        let form = get(&app, "/admin/edit/1").await;
        assert_eq!(form.status(), StatusCode::OK);
        assert!(text(form).await.contains(r#"name="id" value="1""#));

        let edited = post(
            &app,
            "/admin/edit/1",
            "id=1&branch=ECE&college=IIT&year=4&address=Block+C",
        )
        .await;
        assert_eq!(edited.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&edited), "/admin/dashboard");

        let html = text(get(&app, "/student/1").await).await;
        assert!(html.contains("ECE"));
        assert!(html.contains("Block C"));

        let deleted = get(&app, "/admin/delete/1").await;
        assert_eq!(deleted.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&deleted), "/admin/dashboard");

        assert_eq!(get(&app, "/student/1").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_rejects_bad_id() {
        let app = app().await;

        let response = post(&app, "/admin/edit/1", "id=one&branch=ECE").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "Invalid student ID");
    }

    #[tokio::test]
    async fn test_edit_missing_student() {
        let app = app().await;

        assert_eq!(get(&app, "/admin/edit/9").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_missing_student_redirects() {
        let app = app().await;

        let response = get(&app, "/admin/delete/abc").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
