//! Discovery requests from the form to the rendered output.

use disentangler_engine::{
    App, DispatchOutcome, ECHO_MESSAGE, ECHO_WARNING, FormField, Output, READY_STATUS, Status,
};
use disentangler_types::{ValidationError, render_output};

use crate::common::{discover, fill, parse_config};

fn builtin_app(extra: &str) -> App {
    let config = parse_config(&format!("[engine]\nsource = \"builtin\"\n{extra}"));
    App::from_config(Some(&config))
}

#[tokio::test]
async fn echo_discovery_renders_formula_and_validation() {
    let mut app = builtin_app("");
    fill(&mut app, FormField::Output, "energy");
    fill(&mut app, FormField::Inputs, " mass, , speed_of_light ");
    app.form_mut().set_auto_search(true);

    let DispatchOutcome::Discovered(result) = discover(&app).await else {
        panic!("expected a discovery result");
    };
    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some(ECHO_MESSAGE));
    assert_eq!(
        result.formula.as_deref(),
        Some(
            "ECHO SUCCESS:\n  - Output: 'energy'\n  - Inputs: [mass, speed_of_light]\n  - Constants: [None]\n  - Auto-Search: True"
        )
    );

    let lines = render_output(&app.output()).plain_lines();
    assert_eq!(lines[0], "Discovery Successful");
    assert!(lines.contains(&"Confidence Score: 100%".to_string()));
    assert!(lines.contains(&format!("- {ECHO_WARNING}")));
}

#[tokio::test]
async fn accessor_and_plain_shapes_render_identically() {
    let mut accessor = builtin_app("result_shape = \"accessor\"\n");
    let mut plain = builtin_app("result_shape = \"plain\"\n");
    for app in [&mut accessor, &mut plain] {
        fill(app, FormField::Output, "force");
        fill(app, FormField::Inputs, "mass, acceleration");
        fill(app, FormField::Constants, "gravitational_constant");
    }

    let (a, b) = tokio::join!(discover(&accessor), discover(&plain));
    let (DispatchOutcome::Discovered(a), DispatchOutcome::Discovered(b)) = (a, b) else {
        panic!("both shapes should decode");
    };
    assert_eq!(a, b);
    assert_eq!(accessor.output(), plain.output());
}

#[tokio::test]
async fn empty_output_is_rejected_after_bootstrap() {
    let mut app = builtin_app("");
    fill(&mut app, FormField::Inputs, "mass");

    let outcome = discover(&app).await;
    assert!(matches!(
        outcome,
        DispatchOutcome::Invalid(ValidationError::MissingOutput)
    ));
    assert_eq!(
        app.output(),
        Output::Invalid(ValidationError::MissingOutput)
    );
    assert!(!app.is_busy());
}

#[tokio::test]
async fn unknown_quantity_is_a_structured_failure() {
    let mut app = builtin_app("");
    fill(&mut app, FormField::Output, "flux_capacitance");
    fill(&mut app, FormField::Inputs, "mass");

    let DispatchOutcome::Discovered(result) = discover(&app).await else {
        panic!("expected a structured failure");
    };
    assert!(!result.success);
    let lines = render_output(&app.output()).plain_lines();
    assert_eq!(lines[0], "Discovery Failed");
    assert!(lines[1].contains("Unknown quantity: 'flux_capacitance'"));
}

#[tokio::test]
async fn trigger_ignores_presses_while_busy() {
    let mut app = builtin_app("");
    fill(&mut app, FormField::Output, "energy");
    fill(&mut app, FormField::Inputs, "mass");

    let first = app.submit().expect("idle");
    assert!(app.is_busy());
    assert!(app.submit().is_none());
    assert!(matches!(
        first.await.unwrap(),
        DispatchOutcome::Discovered(_)
    ));
    assert!(!app.is_busy());
}

#[tokio::test]
async fn ready_status_precedes_the_first_discovery() {
    let app = builtin_app("");
    assert!(app.ready().await.is_ok());
    assert_eq!(app.output(), Output::Status(Status::ready(READY_STATUS)));
}
