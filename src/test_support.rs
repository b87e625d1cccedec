use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::adapters::api::{ApiError, AuthService, BillingApi, ClientConfig};
use crate::adapters::db::{open_connection, run_migrations};
use crate::adapters::preferences::{Checkpoint, PreferenceStore, PrefsError};
use crate::adapters::token_vault::{TokenVault, VaultError};
use crate::app::runtime::{Clock, NotificationSink};
use crate::domain::models::{
    AnonymousMeterRequest, Consumption, Invoice, Meter, MeterStatus, NewReading, Profile,
    ResetPassword, TariffBracket, UpdateEmail, UpdatePassword, UpdateProfile, UpdateProfileImage,
};
use crate::screens::{Alerter, Navigator, Route};

pub(crate) fn temp_store_path(name: &str) -> PathBuf {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join(name);
    std::mem::forget(dir);
    path
}

pub(crate) fn open_test_store(name: &str) -> Arc<Mutex<Connection>> {
    let path = temp_store_path(name);
    let mut connection =
        open_connection(path.to_string_lossy().as_ref()).expect("test store should open");
    run_migrations(&mut connection).expect("test migrations should succeed");
    Arc::new(Mutex::new(connection))
}

/// AuthService wired to in-memory stores and an unreachable base URL, for
/// tests that never let a request leave the process.
pub(crate) fn offline_auth(
    vault: Arc<MemoryTokenVault>,
    preferences: Arc<MemoryPreferences>,
) -> Arc<AuthService> {
    Arc::new(AuthService::new(
        ClientConfig::new("http://127.0.0.1:9"),
        vault as Arc<dyn TokenVault>,
        preferences as Arc<dyn PreferenceStore>,
    ))
}

#[derive(Default)]
pub(crate) struct MemoryTokenVault {
    token: Mutex<Option<String>>,
}

impl TokenVault for MemoryTokenVault {
    fn set(&self, token: &str) -> Result<(), VaultError> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn get(&self) -> Result<Option<String>, VaultError> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn remove(&self) -> Result<(), VaultError> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryPreferences {
    checkpoint: Mutex<Option<Checkpoint>>,
}

impl PreferenceStore for MemoryPreferences {
    fn checkpoint(&self) -> Result<Option<Checkpoint>, PrefsError> {
        Ok(*self.checkpoint.lock().unwrap())
    }

    fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), PrefsError> {
        *self.checkpoint.lock().unwrap() = Some(*checkpoint);
        Ok(())
    }

    fn clear_checkpoint(&self) -> Result<(), PrefsError> {
        *self.checkpoint.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingAlerter {
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingAlerter {
    pub(crate) fn titles(&self) -> Vec<String> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }
}

impl Alerter for RecordingAlerter {
    fn alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
    backs: AtomicUsize,
}

impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub(crate) fn back_count(&self) -> usize {
        self.backs.load(Ordering::Relaxed)
    }
}

impl Navigator for RecordingNavigator {
    fn goto(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }

    fn back(&self) {
        self.backs.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    counts: Arc<Mutex<Vec<usize>>>,
}

impl RecordingSink {
    pub(crate) fn counts(&self) -> Vec<usize> {
        self.counts.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn new_invoices(&self, count: usize) {
        self.counts.lock().unwrap().push(count);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedClock(pub(crate) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default)]
struct StubState {
    invoices: Vec<Invoice>,
    unread: Vec<Invoice>,
    history: Vec<Consumption>,
    meters: Vec<Meter>,
    meter_status: Vec<MeterStatus>,
    tariffs: Vec<TariffBracket>,
    profile: Option<Profile>,
    password_update_accepted: Option<bool>,
    meter_status_rejection: Option<(u16, String)>,
    fail_all: bool,
    calls: Vec<&'static str>,
    forgot_requests: Vec<String>,
    reset_requests: Vec<ResetPassword>,
    submitted_readings: Vec<NewReading>,
    profile_updates: Vec<UpdateProfile>,
    password_updates: Vec<UpdatePassword>,
    anonymous_requests: Vec<AnonymousMeterRequest>,
}

/// Scripted in-process stand-in for the billing backend. Records every call
/// so tests can assert exactly which requests a screen issued.
#[derive(Clone, Default)]
pub(crate) struct StubApi {
    state: Arc<Mutex<StubState>>,
}

impl StubApi {
    pub(crate) fn as_port(&self) -> Arc<dyn BillingApi> {
        Arc::new(self.clone())
    }

    pub(crate) fn set_invoices(&self, invoices: Vec<Invoice>) {
        self.state.lock().unwrap().invoices = invoices;
    }

    pub(crate) fn set_unread(&self, unread: Vec<Invoice>) {
        self.state.lock().unwrap().unread = unread;
    }

    pub(crate) fn set_history(&self, history: Vec<Consumption>) {
        self.state.lock().unwrap().history = history;
    }

    pub(crate) fn set_meters(&self, meters: Vec<Meter>) {
        self.state.lock().unwrap().meters = meters;
    }

    pub(crate) fn set_meter_status(&self, meter_status: Vec<MeterStatus>) {
        self.state.lock().unwrap().meter_status = meter_status;
    }

    pub(crate) fn set_tariffs(&self, tariffs: Vec<TariffBracket>) {
        self.state.lock().unwrap().tariffs = tariffs;
    }

    pub(crate) fn set_profile(&self, profile: Profile) {
        self.state.lock().unwrap().profile = Some(profile);
    }

    pub(crate) fn set_password_update_accepted(&self, accepted: bool) {
        self.state.lock().unwrap().password_update_accepted = Some(accepted);
    }

    pub(crate) fn reject_meter_status(&self, status: u16, message: &str) {
        self.state.lock().unwrap().meter_status_rejection = Some((status, message.to_string()));
    }

    pub(crate) fn fail_all(&self) {
        self.state.lock().unwrap().fail_all = true;
    }

    pub(crate) fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub(crate) fn forgot_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().forgot_requests.clone()
    }

    pub(crate) fn reset_requests(&self) -> Vec<ResetPassword> {
        self.state.lock().unwrap().reset_requests.clone()
    }

    pub(crate) fn submitted_readings(&self) -> Vec<NewReading> {
        self.state.lock().unwrap().submitted_readings.clone()
    }

    pub(crate) fn profile_updates(&self) -> Vec<UpdateProfile> {
        self.state.lock().unwrap().profile_updates.clone()
    }

    pub(crate) fn password_updates(&self) -> Vec<UpdatePassword> {
        self.state.lock().unwrap().password_updates.clone()
    }

    pub(crate) fn anonymous_requests(&self) -> Vec<AnonymousMeterRequest> {
        self.state.lock().unwrap().anonymous_requests.clone()
    }

    fn record(&self, operation: &'static str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation);
        if state.fail_all {
            return Err(ApiError::Rejected {
                status: 500,
                message: "stub failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BillingApi for StubApi {
    async fn invoices(&self) -> Result<Vec<Invoice>, ApiError> {
        self.record("invoices")?;
        Ok(self.state.lock().unwrap().invoices.clone())
    }

    async fn unread_invoices(&self) -> Result<Vec<Invoice>, ApiError> {
        self.record("unread_invoices")?;
        Ok(self.state.lock().unwrap().unread.clone())
    }

    async fn consumption_history(&self) -> Result<Vec<Consumption>, ApiError> {
        self.record("consumption_history")?;
        Ok(self.state.lock().unwrap().history.clone())
    }

    async fn submit_reading(&self, reading: &NewReading) -> Result<(), ApiError> {
        self.record("submit_reading")?;
        self.state
            .lock()
            .unwrap()
            .submitted_readings
            .push(reading.clone());
        Ok(())
    }

    async fn my_meters(&self) -> Result<Vec<Meter>, ApiError> {
        self.record("my_meters")?;
        Ok(self.state.lock().unwrap().meters.clone())
    }

    async fn meter_status(&self) -> Result<Vec<MeterStatus>, ApiError> {
        self.record("meter_status")?;
        let state = self.state.lock().unwrap();
        if let Some((status, message)) = &state.meter_status_rejection {
            return Err(ApiError::Rejected {
                status: *status,
                message: message.clone(),
            });
        }
        Ok(state.meter_status.clone())
    }

    async fn tariff_brackets(&self) -> Result<Vec<TariffBracket>, ApiError> {
        self.record("tariff_brackets")?;
        Ok(self.state.lock().unwrap().tariffs.clone())
    }

    async fn profile(&self) -> Result<Profile, ApiError> {
        self.record("profile")?;
        self.state
            .lock()
            .unwrap()
            .profile
            .clone()
            .ok_or(ApiError::Rejected {
                status: 404,
                message: "no profile".to_string(),
            })
    }

    async fn update_profile(&self, update: &UpdateProfile) -> Result<(), ApiError> {
        self.record("update_profile")?;
        self.state
            .lock()
            .unwrap()
            .profile_updates
            .push(update.clone());
        Ok(())
    }

    async fn update_email(&self, _update: &UpdateEmail) -> Result<(), ApiError> {
        self.record("update_email")?;
        Ok(())
    }

    async fn update_password(&self, update: &UpdatePassword) -> Result<bool, ApiError> {
        self.record("update_password")?;
        let mut state = self.state.lock().unwrap();
        state.password_updates.push(update.clone());
        Ok(state.password_update_accepted.unwrap_or(true))
    }

    async fn update_profile_image(&self, _update: &UpdateProfileImage) -> Result<(), ApiError> {
        self.record("update_profile_image")?;
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        self.record("forgot_password")?;
        self.state
            .lock()
            .unwrap()
            .forgot_requests
            .push(email.to_string());
        Ok(())
    }

    async fn reset_password(&self, reset: &ResetPassword) -> Result<(), ApiError> {
        self.record("reset_password")?;
        self.state.lock().unwrap().reset_requests.push(reset.clone());
        Ok(())
    }

    async fn submit_anonymous_meter_request(
        &self,
        request: &AnonymousMeterRequest,
    ) -> Result<(), ApiError> {
        self.record("submit_anonymous_meter_request")?;
        self.state
            .lock()
            .unwrap()
            .anonymous_requests
            .push(request.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    headers: Vec<(String, String)>,
    pub(crate) body: String,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}

/// Minimal scripted HTTP/1.1 responder on a loopback port. Routes are
/// matched on the exact request path; unknown paths get a 404.
pub(crate) struct MockApiServer {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockApiServer {
    pub(crate) fn start(routes: Vec<(&'static str, u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("responder socket should bind");
        listener
            .set_nonblocking(true)
            .expect("nonblocking accept should be configurable");
        let port = listener
            .local_addr()
            .expect("addr should be available")
            .port();

        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_requests = Arc::clone(&requests);
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        Self::handle_connection(stream, &routes, &thread_requests);
                    }
                    Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            port,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    fn handle_connection(
        mut stream: std::net::TcpStream,
        routes: &[(&'static str, u16, &'static str)],
        requests: &Arc<Mutex<Vec<RecordedRequest>>>,
    ) {
        stream
            .set_read_timeout(Some(Duration::from_secs(1)))
            .expect("read timeout should be configurable");

        let mut raw = Vec::new();
        let mut buffer = [0_u8; 1024];
        let header_end = loop {
            match stream.read(&mut buffer) {
                Ok(0) => return,
                Ok(size) => {
                    raw.extend_from_slice(&buffer[..size]);
                    if let Some(position) =
                        raw.windows(4).position(|window| window == b"\r\n\r\n")
                    {
                        break position + 4;
                    }
                }
                Err(_) => return,
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let mut lines = head.lines();
        let request_line = lines.next().unwrap_or_default();
        let mut request_parts = request_line.split_whitespace();
        let method = request_parts.next().unwrap_or_default().to_string();
        let target = request_parts.next().unwrap_or_default().to_string();
        let path = target
            .split_once('?')
            .map_or(target.as_str(), |(path, _)| path)
            .to_string();

        let headers: Vec<(String, String)> = lines
            .filter_map(|line| {
                line.split_once(':')
                    .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        let content_length = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body_bytes = raw[header_end..].to_vec();
        while body_bytes.len() < content_length {
            match stream.read(&mut buffer) {
                Ok(0) => break,
                Ok(size) => body_bytes.extend_from_slice(&buffer[..size]),
                Err(_) => break,
            }
        }
        let body = String::from_utf8_lossy(&body_bytes).to_string();

        requests.lock().unwrap().push(RecordedRequest {
            method,
            path: path.clone(),
            headers,
            body,
        });

        let (status, response_body) = routes
            .iter()
            .find(|(route_path, _, _)| *route_path == path)
            .map(|(_, status, response_body)| (*status, *response_body))
            .unwrap_or((404, ""));

        let reason = match status {
            200 => "OK",
            400 => "Bad Request",
            401 => "Unauthorized",
            404 => "Not Found",
            _ => "Status",
        };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response_body}",
            response_body.len(),
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.shutdown(std::net::Shutdown::Both);
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockApiServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
