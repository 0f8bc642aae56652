//! Full frames drawn into ratatui's test backend.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use disentangler_engine::App;
use disentangler_tui::{apply_event, draw};
use ratatui::{Terminal, backend::TestBackend};

fn render(app: &App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 48)).unwrap();
    terminal.draw(|frame| draw(frame, app)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

fn press(app: &mut App, code: KeyCode) {
    apply_event(app, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

#[tokio::test]
async fn keyboard_session_draws_discovery_result() {
    let mut app = App::from_config(None);
    app.boot();
    assert!(app.ready().await.is_ok());

    type_text(&mut app, "energy");
    press(&mut app, KeyCode::Tab);
    type_text(&mut app, "mass, speed_of_light");
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char(' '));
    assert!(app.form().auto_search());

    let outcome = app.submit().expect("idle").await.unwrap();
    assert!(matches!(
        outcome,
        disentangler_engine::DispatchOutcome::Discovered(ref result) if result.success
    ));

    let screen = render(&app);
    assert!(screen.contains("Discovery Successful"));
    assert!(screen.contains("Auto-Search: True"));
    assert!(screen.contains("Validation Report"));
    assert!(screen.contains("Engine ready"));
}

#[tokio::test]
async fn ascii_config_draws_without_unicode_glyphs() {
    let config: disentangler_engine::DisentanglerConfig =
        toml::from_str("[app]\nascii_only = true\n").unwrap();
    let app = App::from_config(Some(&config));
    assert!(app.ready().await.is_ok());

    let screen = render(&app);
    assert!(screen.contains("OK Engine ready"));
    assert!(screen.contains("[ ] Auto-search"));
}
