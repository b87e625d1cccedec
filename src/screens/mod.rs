pub mod anonymous_request;
pub mod consumption_history;
pub mod forgot_password;
pub mod home;
pub mod invoice_detail;
pub mod invoices;
pub mod login;
pub mod profile;
pub mod rates_status;
pub mod reset_password;
pub mod submit_reading;

/// Surfaces a message to the user. The mobile shell maps this onto the
/// platform alert dialog; tests record the calls.
pub trait Alerter: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
}

/// Navigation seam. Screens decide where to go; the shell owns how.
pub trait Navigator: Send + Sync {
    fn goto(&self, route: Route);
    fn back(&self);
}

/// Minimal shape check applied before any credentialed request: one `@`,
/// something on both sides, a dot in the domain, no whitespace.
pub(crate) fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
