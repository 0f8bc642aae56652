//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use disentangler_engine::{
    App, BUILTIN_ENGINE_SOURCE, DispatchOutcome, DisentanglerConfig, FormField,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SOURCE_PATH: &str = "/law_discovery.py";

/// Start a mock server that serves the engine source
pub async fn start_source_mock() -> MockServer {
    MockServer::start().await
}

/// Serve `body` as the engine source
pub async fn mount_engine_source(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serve the builtin engine source
pub async fn mount_builtin_source(server: &MockServer) {
    mount_engine_source(server, BUILTIN_ENGINE_SOURCE).await;
}

pub fn source_url(server: &MockServer) -> String {
    format!("{}{SOURCE_PATH}", server.uri())
}

pub fn parse_config(toml_str: &str) -> DisentanglerConfig {
    toml::from_str(toml_str).expect("valid test config")
}

/// App whose engine source is fetched from `url`
pub fn app_for_url(url: &str, extra: &str) -> App {
    let config = parse_config(&format!("[engine]\nsource = \"{url}\"\n{extra}"));
    App::from_config(Some(&config))
}

/// Replace the text of a form field
pub fn fill(app: &mut App, field: FormField, text: &str) {
    if let Some(draft) = app.form_mut().draft_mut(field) {
        draft.set_text(text);
    }
}

/// Press the trigger and wait for the outcome
pub async fn discover(app: &App) -> DispatchOutcome {
    app.submit()
        .expect("trigger is idle")
        .await
        .expect("dispatch task completes")
}
