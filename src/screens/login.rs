use std::sync::Arc;

use crate::adapters::api::{ApiError, AuthService};
use crate::screens::{Alerter, Navigator, Route, is_valid_email};

pub struct LoginScreen {
    auth: Arc<AuthService>,
    alerts: Arc<dyn Alerter>,
    navigator: Arc<dyn Navigator>,
    pub email: String,
    pub password: String,
    busy: bool,
}

impl LoginScreen {
    pub fn new(
        auth: Arc<AuthService>,
        alerts: Arc<dyn Alerter>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            auth,
            alerts,
            navigator,
            email: String::new(),
            password: String::new(),
            busy: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn login(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.try_login().await;
        self.busy = false;
    }

    async fn try_login(&mut self) {
        let email = self.email.trim().to_string();

        if email.is_empty() {
            self.alerts
                .alert("Email Required", "Please enter your email address.");
            return;
        }
        if self.password.is_empty() {
            self.alerts
                .alert("Password Required", "Please enter your password.");
            return;
        }
        if !is_valid_email(&email) {
            self.alerts
                .alert("Invalid Email", "Please enter a valid email address.");
            return;
        }

        match self.auth.login(&email, &self.password).await {
            Ok(_) => {
                self.password.clear();
                self.navigator.goto(Route::Home);
            }
            Err(ApiError::AuthenticationFailed { status: 401, .. }) => {
                self.alerts.alert(
                    "Invalid Credentials",
                    "The email or password you entered is incorrect.",
                );
            }
            Err(ApiError::Network(_)) => {
                self.alerts.alert(
                    "Connection Error",
                    "Unable to reach the server. Please check your connection and try again.",
                );
            }
            Err(error) => {
                self.alerts
                    .alert("Login Error", &format!("Unable to login: {error}"));
            }
        }
    }
}
