use std::sync::Arc;

use crate::adapters::api::{ApiError, BillingApi};
use crate::domain::models::AnonymousMeterRequest;
use crate::screens::{Alerter, Navigator, is_valid_email};

/// New-meter request for people without an account, reachable from the
/// login screen. Also shows the public tariff table.
pub struct AnonymousRequestScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    navigator: Arc<dyn Navigator>,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub installation_address: String,
    pub nif: String,
    pub tariffs: Vec<crate::domain::models::TariffBracket>,
    busy: bool,
}

impl AnonymousRequestScreen {
    pub async fn init(
        api: Arc<dyn BillingApi>,
        alerts: Arc<dyn Alerter>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let mut screen = Self {
            api,
            alerts,
            navigator,
            full_name: String::new(),
            email: String::new(),
            phone_number: String::new(),
            installation_address: String::new(),
            nif: String::new(),
            tariffs: Vec::new(),
            busy: false,
        };
        screen.load_tariffs().await;
        screen
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    async fn load_tariffs(&mut self) {
        match self.api.tariff_brackets().await {
            Ok(tariffs) => self.tariffs = tariffs,
            Err(error) => {
                // Pricing is informational here; the form still works.
                tracing::debug!(error = %error, "tariff load for anonymous request failed");
            }
        }
    }

    pub async fn submit(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.try_submit().await;
        self.busy = false;
    }

    async fn try_submit(&mut self) {
        let email = self.email.trim().to_string();

        if self.full_name.trim().is_empty() {
            self.alerts
                .alert("Name Required", "Please enter your full name.");
            return;
        }
        if email.is_empty() || !is_valid_email(&email) {
            self.alerts
                .alert("Invalid Email", "Please enter a valid email address.");
            return;
        }
        if self.phone_number.trim().is_empty() {
            self.alerts
                .alert("Phone Required", "Please enter your phone number.");
            return;
        }
        if self.installation_address.trim().is_empty() {
            self.alerts
                .alert("Address Required", "Please enter the installation address.");
            return;
        }
        if self.nif.trim().is_empty() {
            self.alerts
                .alert("NIF Required", "Please enter your tax number.");
            return;
        }

        let request = AnonymousMeterRequest {
            name: self.full_name.trim().to_string(),
            email,
            address: self.installation_address.trim().to_string(),
            nif: self.nif.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
        };

        match self.api.submit_anonymous_meter_request(&request).await {
            Ok(()) => {
                self.alerts.alert(
                    "Request Submitted",
                    "Your meter request was received. We will contact you soon.",
                );
                self.navigator.back();
            }
            Err(ApiError::Rejected { message, .. }) => {
                self.alerts.alert("Error", &message);
            }
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to submit request: {error}"));
            }
        }
    }
}
