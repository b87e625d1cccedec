use std::sync::Arc;

use crate::adapters::api::BillingApi;
use crate::domain::models::Invoice;
use crate::domain::tariff::{BreakdownLine, bill_breakdown};
use crate::screens::Alerter;

pub struct InvoiceDetailScreen {
    api: Arc<dyn BillingApi>,
    alerts: Arc<dyn Alerter>,
    pub invoice: Invoice,
    pub breakdown: Vec<BreakdownLine>,
    busy: bool,
}

impl InvoiceDetailScreen {
    pub fn new(api: Arc<dyn BillingApi>, alerts: Arc<dyn Alerter>, invoice: Invoice) -> Self {
        Self {
            api,
            alerts,
            invoice,
            breakdown: Vec::new(),
            busy: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Prices the billed volume against the public brackets so the detail
    /// page can show how the total was composed.
    pub async fn load_breakdown(&mut self, billed_volume: f64) {
        if self.busy {
            return;
        }
        self.busy = true;
        match self.api.tariff_brackets().await {
            Ok(brackets) => self.breakdown = bill_breakdown(billed_volume, &brackets),
            Err(error) => {
                self.alerts
                    .alert("Error", &format!("Unable to load tariff rates: {error}"));
            }
        }
        self.busy = false;
    }

    /// Plain-text summary handed to the platform share sheet.
    pub fn share_text(&self) -> String {
        format!(
            "Invoice #{}\nIssued: {}\nTotal: {:.2} EUR\nStatus: {}",
            self.invoice.id,
            self.invoice.issue_date.format("%Y-%m-%d"),
            self.invoice.total_amount,
            self.invoice.status.label(),
        )
    }
}
