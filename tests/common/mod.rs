#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use biblio_app::Application;
use biblio_kernel::settings::Settings;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(|_| {}).await
    }

    pub async fn with_settings(customize: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::default();
        settings.database.url = "sqlite::memory:".to_string();
        customize(&mut settings);

        let app = Application::bootstrap(settings)
            .await
            .expect("Failed to bootstrap test app");
        app.migrate().await.expect("Failed to migrate test db");

        Self {
            router: app.router(),
            pool: app.pool().clone(),
        }
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = session {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, form: &str, session: Option<&str>) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = session {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(form.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Register an account and return its session as a `Cookie` header value.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let form = format!("email={email}&password={password}&password_confirm={password}");
        let response = self.post_form("/register", &form, None).await;
        if response.status() != StatusCode::SEE_OTHER {
            panic!("Registration failed in test helper: status {}", response.status());
        }
        session_cookie(&response).expect("No session cookie returned")
    }

    pub async fn login(&self, email: &str, password: &str) -> Response<Body> {
        self.post_form("/login", &format!("email={email}&password={password}"), None)
            .await
    }

    pub async fn book_count(&self) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM book")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        count
    }

    /// Every stored book id, read straight from the table.
    pub async fn book_ids(&self) -> Vec<i64> {
        sqlx::query_as::<_, (i64,)>("SELECT id FROM book ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .unwrap()
            .into_iter()
            .map(|(id,)| id)
            .collect()
    }

    pub async fn is_read(&self, id: i64) -> Option<bool> {
        sqlx::query_as::<_, (bool,)>("SELECT read FROM book WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap()
            .map(|(read,)| read)
    }
}

/// `name=value` of the session cookie set by `response`, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
