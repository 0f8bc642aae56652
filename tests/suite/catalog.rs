//! The quantity catalog modal.

use disentangler_engine::App;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{SOURCE_PATH, app_for_url, source_url, start_source_mock};

#[tokio::test]
async fn catalog_loads_once_and_filters_locally() {
    let app = App::from_config(None);

    let load = app.open_catalog().expect("first open loads");
    load.await.unwrap();
    let view = app.catalog().view();
    assert!(!view.loading);
    assert!(view.total > 0);
    assert_eq!(view.names.len(), view.total);
    let mut sorted = view.names.clone();
    sorted.sort();
    assert_eq!(view.names, sorted);

    app.catalog().set_filter("MASS");
    let names = app.catalog().view().names;
    assert!(names.contains(&"mass".to_string()));
    assert!(names.contains(&"electron_mass".to_string()));
    assert!(names.iter().all(|name| name.contains("mass")));

    app.close_catalog();
    assert!(app.open_catalog().is_none(), "listing is cached");
    assert_eq!(app.catalog().filter(), "");
    assert_eq!(app.catalog().view().names.len(), view.total);
}

#[tokio::test]
async fn catalog_is_empty_when_bootstrap_failed() {
    let server = start_source_mock().await;
    Mock::given(method("GET"))
        .and(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = app_for_url(&source_url(&server), "");
    app.open_catalog().expect("first open loads").await.unwrap();
    let view = app.catalog().view();
    assert!(!view.loading);
    assert_eq!(view.total, 0);
    assert!(view.names.is_empty());
}
