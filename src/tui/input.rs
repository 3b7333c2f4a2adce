use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use super::app::{Action, App, Focus, Screen};

pub fn handle_events(app: &mut App) -> std::io::Result<bool> {
    if event::poll(Duration::from_millis(100))? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                handle_key_event(app, key);
            }
        }
    }
    Ok(app.should_quit)
}

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // Handle Ctrl+C globally
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Login | Screen::SignUp => handle_auth_screen(app, key),
        Screen::Main => match app.focus {
            Focus::Sidebar => handle_sidebar(app, key),
            Focus::Content => handle_content(app, key),
        },
    }
}

fn handle_auth_screen(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::F(2) => app.toggle_auth_screen(),
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => app.toggle_auth_field(),
        KeyCode::Enter => app.submit_auth(),
        KeyCode::Backspace => {
            app.auth_input_mut().pop();
        }
        KeyCode::Char(c) => app.auth_input_mut().push(c),
        _ => {}
    }
}

fn handle_sidebar(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('L') => app.logout(),
        KeyCode::Char('r') => app.reload_schema(),
        KeyCode::Tab | KeyCode::Enter => app.toggle_focus(),
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('k') | KeyCode::Up => {
            app.next_sidebar_control()
        }
        KeyCode::Char('h') | KeyCode::Left => app.cycle_sidebar(false),
        KeyCode::Char('l') | KeyCode::Right => app.cycle_sidebar(true),
        _ => {}
    }
}

fn handle_content(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Esc | KeyCode::Tab) {
        app.toggle_focus();
        return;
    }

    match app.action {
        Action::Read => handle_read(app, key),
        Action::Create | Action::Update => handle_form(app, key),
        Action::Delete => match key.code {
            KeyCode::Left | KeyCode::Up => app.cycle_key(false),
            KeyCode::Right | KeyCode::Down => app.cycle_key(true),
            KeyCode::Enter => app.delete_selected(),
            _ => {}
        },
        Action::Visualize => match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.move_viz_control(false),
            KeyCode::Down | KeyCode::Char('j') => app.move_viz_control(true),
            KeyCode::Left | KeyCode::Char('h') => app.cycle_viz_value(false),
            KeyCode::Right | KeyCode::Char('l') => app.cycle_viz_value(true),
            _ => {}
        },
    }
}

fn handle_read(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => app.scroll_results_left(),
        KeyCode::Char('l') | KeyCode::Right => app.scroll_results_right(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_results_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_results_up(),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_down(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Char('q') => app.should_quit = true,
        _ => {}
    }
}

fn handle_form(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up => app.move_field(false),
        KeyCode::Down => app.move_field(true),
        KeyCode::Left => app.step_field(false),
        KeyCode::Right => app.step_field(true),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Console;
    use crate::registry::{TableEntry, TableRegistry};
    use crate::storage::Store;
    use std::sync::Arc;

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app() -> App {
        let store = Store::open_in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TABLE employee (employee_id INTEGER PRIMARY KEY, first_name TEXT, salary INTEGER);
                 INSERT INTO employee VALUES (1, 'Ana', 100);",
            )
            .unwrap();
        let registry = TableRegistry::new(vec![TableEntry::new("employee", ["employee_id"])]);
        App::new(Console::open(Arc::new(store), registry).unwrap())
    }

    #[test]
    fn test_sign_up_then_log_in_with_keys() {
        let mut app = app();

        press(&mut app, KeyCode::F(2));
        assert_eq!(app.screen, Screen::SignUp);
        type_text(&mut app, "ana");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "pw");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Login);

        type_text(&mut app, "pw");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Main);
        assert_eq!(app.console.session().username(), Some("ana"));
    }

    #[test]
    fn test_create_record_with_keys() {
        let mut app = app();
        app.console.sign_up("ana", "pw").unwrap();
        app.username = "ana".to_string();
        app.password = "pw".to_string();
        app.submit_auth();

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.action, Action::Create);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Content);

        type_text(&mut app, "Bo");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "250");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.table.as_ref().unwrap().row_count(), 2);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Focus::Sidebar);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = app();
        handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }
}
