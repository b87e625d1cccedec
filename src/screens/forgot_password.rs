use std::sync::Arc;

use crate::adapters::api::{ApiError, BillingApi};
use crate::screens::{Alerter, Navigator, is_valid_email};

pub struct ForgotPasswordScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    navigator: Arc<dyn Navigator>,
    pub email: String,
    busy: bool,
}

impl ForgotPasswordScreen {
    pub fn new(
        api: Arc<dyn BillingApi>,
        alerts: Arc<dyn Alerter>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            alerts,
            navigator,
            email: String::new(),
            busy: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn send_recovery_email(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.try_send().await;
        self.busy = false;
    }

    async fn try_send(&mut self) {
        let email = self.email.trim().to_string();

        if email.is_empty() {
            self.alerts
                .alert("Email Required", "Please enter your email address.");
            return;
        }
        if !is_valid_email(&email) {
            self.alerts
                .alert("Invalid Email", "Please enter a valid email address.");
            return;
        }

        match self.api.forgot_password(&email).await {
            Ok(()) => {
                self.alerts.alert(
                    "Email Sent",
                    "If an account exists for that address, recovery instructions are on their way.",
                );
                self.email.clear();
                self.navigator.back();
            }
            Err(ApiError::Rejected { message, .. }) => {
                self.alerts.alert("Error", &message);
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to send recovery email: {error}"));
            }
        }
    }
}
