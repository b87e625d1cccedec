use std::sync::Arc;

use crate::adapters::api::{ApiError, BillingApi};
use crate::domain::deep_link::{ResetPasswordLink, decode_reset_token};
use crate::domain::models::ResetPassword;
use crate::screens::{Alerter, Navigator, Route};

/// Entered from the reset-password deep link. The token stays in its
/// transport encoding until the moment the reset is submitted.
pub struct ResetPasswordScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    navigator: Arc<dyn Navigator>,
    token: String,
    email: String,
    pub new_password: String,
    pub confirm_password: String,
    busy: bool,
}

impl ResetPasswordScreen {
    pub fn from_link(
        api: Arc<dyn BillingApi>,
        alerts: Arc<dyn Alerter>,
        navigator: Arc<dyn Navigator>,
        link: ResetPasswordLink,
    ) -> Self {
        Self {
            api,
            alerts,
            navigator,
            token: link.token,
            email: link.email,
            new_password: String::new(),
            confirm_password: String::new(),
            busy: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn reset_password(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.try_reset().await;
        self.busy = false;
    }

    async fn try_reset(&mut self) {
        if self.token.trim().is_empty() {
            self.alerts
                .alert("Invalid Link", "This reset link is invalid. Please request a new one.");
            return;
        }
        if self.new_password.is_empty() {
            self.alerts
                .alert("Password Required", "Please enter a new password.");
            return;
        }
        if self.new_password.len() < 6 {
            self.alerts.alert(
                "Password Too Short",
                "Password must be at least 6 characters long.",
            );
            return;
        }
        if self.new_password != self.confirm_password {
            self.alerts
                .alert("Passwords Do Not Match", "Both password fields must match.");
            return;
        }

        let token = match decode_reset_token(&self.token) {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!(error = %error, "reset token failed to decode");
                self.alerts.alert(
                    "Invalid Link",
                    "This reset link is invalid. Please request a new one.",
                );
                return;
            }
        };

        let request = ResetPassword {
            email: self.email.clone(),
            token,
            new_password: self.new_password.clone(),
        };

        match self.api.reset_password(&request).await {
            Ok(()) => {
                self.alerts.alert(
                    "Password Reset",
                    "Your password was reset. You can now login with the new one.",
                );
                self.new_password.clear();
                self.confirm_password.clear();
                self.navigator.goto(Route::Login);
            }
            Err(ApiError::Rejected { message, .. }) => {
                self.alerts.alert("Error", &message);
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to reset password: {error}"));
            }
        }
    }
}
