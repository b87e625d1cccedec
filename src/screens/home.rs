use std::sync::Arc;

use crate::adapters::api::{AuthService, BillingApi};
use crate::screens::{Alerter, Navigator, Route};

pub struct HomeScreen {
    api: Arc<dyn BillingApi>,
    auth: Arc<AuthService>,
    alerts: Arc<dyn Alerter>,
    navigator: Arc<dyn Navigator>,
    pub unread_invoice_count: usize,
    busy: bool,
}

impl HomeScreen {
    pub async fn init(
        api: Arc<dyn BillingApi>,
        auth: Arc<AuthService>,
        alerts: Arc<dyn Alerter>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let mut screen = Self {
            api,
            auth,
            alerts,
            navigator,
            unread_invoice_count: 0,
            busy: false,
        };
        screen.refresh_unread().await;
        screen
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn has_unread_invoices(&self) -> bool {
        self.unread_invoice_count > 0
    }

    /// The badge is decorative; a failed refresh leaves the last value and
    /// stays silent.
    pub async fn refresh_unread(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        match self.api.unread_invoices().await {
            Ok(unread) => self.unread_invoice_count = unread.len(),
            Err(error) => {
                tracing::debug!(error = %error, "unread invoice refresh failed");
            }
        }
        self.busy = false;
    }

    pub fn logout(&mut self) {
        match self.auth.logout() {
            Ok(()) => self.navigator.goto(Route::Login),
            Err(error) => {
                tracing::warn!(error = %error, "logout failed");
                self.alerts
                    .alert("Error", "Unable to logout. Please try again.");
            }
        }
    }
}
