use std::sync::Arc;

use crate::adapters::api::BillingApi;
use crate::domain::models::Invoice;
use crate::screens::Alerter;

pub struct InvoicesScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    pub invoices: Vec<Invoice>,
    busy: bool,
}

impl InvoicesScreen {
    pub async fn init(api: Arc<dyn BillingApi>, alerts: Arc<dyn Alerter>) -> Self {
        let mut screen = Self {
            api,
            alerts,
            invoices: Vec::new(),
            busy: false,
        };
        screen.load().await;
        screen
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn load(&mut self) {
        if self.busy {
            return;
        }
        self.busy = true;
        match self.api.invoices().await {
            Ok(invoices) => self.invoices = invoices,
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to load invoices: {error}"));
            }
        }
        self.busy = false;
    }
}
