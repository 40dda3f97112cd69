use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after logging in; only local paths are honoured.
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl RegisterForm {
    /// Checks that only the form itself can make; email and password rules
    /// are enforced at registration.
    pub fn mismatch(&self) -> Option<String> {
        (self.password != self.password_confirm).then(|| "Passwords do not match".to_string())
    }
}
