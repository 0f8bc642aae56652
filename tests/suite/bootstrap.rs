//! Engine bootstrap through the real source loader and echo runtime.

use disentangler_engine::{
    App, BootstrapStage, DispatchOutcome, FormField, GateStatus, Output, READY_STATUS, Status,
    StatusLevel,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    SOURCE_PATH, app_for_url, discover, fill, mount_builtin_source, mount_engine_source,
    parse_config, source_url, start_source_mock,
};

#[tokio::test]
async fn url_source_is_fetched_once_with_cache_busting() {
    let server = start_source_mock().await;
    mount_builtin_source(&server).await;

    let app = app_for_url(&source_url(&server), "");
    app.boot();
    let (first, second) = tokio::join!(app.ready(), app.ready());
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(app.gate_status(), GateStatus::Ready);
    assert_eq!(app.output(), Output::Status(Status::ready(READY_STATUS)));

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let nonce = requests[0]
        .url
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned());
    assert!(nonce.is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn cache_busting_can_be_disabled() {
    let server = start_source_mock().await;
    mount_builtin_source(&server).await;

    let app = app_for_url(&source_url(&server), "cache_bust = false\n");
    assert!(app.ready().await.is_ok());

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn missing_source_fails_fetch_stage_and_blocks_discovery() {
    let server = start_source_mock().await;
    Mock::given(method("GET"))
        .and(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut app = app_for_url(&source_url(&server), "");
    let failure = app.ready().await.expect_err("fetch fails");
    assert_eq!(failure.stage, BootstrapStage::FetchSource);
    assert!(failure.cause.contains("404"));
    assert_eq!(
        app.gate_status(),
        GateStatus::Failed(BootstrapStage::FetchSource)
    );
    match app.output() {
        Output::Status(status) => {
            assert_eq!(status.level, StatusLevel::Error);
            assert!(status.text.starts_with("CRITICAL ERROR during initialization:"));
            assert!(status.text.contains("stage 3 (fetch engine source)"));
        }
        other => panic!("expected error status, got {other:?}"),
    }

    fill(&mut app, FormField::Output, "energy");
    fill(&mut app, FormField::Inputs, "mass");
    assert!(matches!(
        discover(&app).await,
        DispatchOutcome::InitializationFailed
    ));
    assert_eq!(app.output(), Output::InitializationFailed);

    // Sticky: no second fetch.
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn source_importing_an_unloaded_package_fails_install() {
    let server = start_source_mock().await;
    mount_engine_source(
        &server,
        "import numpy as np\nimport sympy\n\nclass EnhancedPhysicsDisentangler:\n    pass\n",
    )
    .await;

    let app = app_for_url(&source_url(&server), "packages = [\"numpy\"]\n");
    let failure = app.ready().await.expect_err("sympy was not loaded");
    assert_eq!(failure.stage, BootstrapStage::InstallSource);
    assert!(failure.cause.contains("No module named 'sympy'"));
}

#[tokio::test]
async fn wrong_class_name_fails_instantiation() {
    let server = start_source_mock().await;
    mount_builtin_source(&server).await;

    let app = app_for_url(&source_url(&server), "class_name = \"Disentangler\"\n");
    let failure = app.ready().await.expect_err("class is not declared");
    assert_eq!(failure.stage, BootstrapStage::Instantiate);
    assert!(failure.cause.contains("name 'Disentangler' is not defined"));
}

#[tokio::test]
async fn local_source_file_is_installed() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("law_discovery.py");
    std::fs::write(&source, disentangler_engine::BUILTIN_ENGINE_SOURCE).unwrap();

    let config = parse_config(&format!("[engine]\nsource = '{}'\n", source.display()));
    let app = App::from_config(Some(&config));
    assert!(app.ready().await.is_ok());
}

#[tokio::test]
async fn unreadable_local_source_fails_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.py");

    let config = parse_config(&format!("[engine]\nsource = '{}'\n", missing.display()));
    let app = App::from_config(Some(&config));
    let failure = app.ready().await.expect_err("file is missing");
    assert_eq!(failure.stage, BootstrapStage::FetchSource);
}
