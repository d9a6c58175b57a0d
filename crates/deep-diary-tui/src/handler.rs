use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{expand_path, App, InputMode, TextInput};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_answer_editing(app, key),
        InputMode::PhotoPath => handle_photo_path(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Diary actions
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('p') => {
            if !app.is_busy() {
                app.input_mode = InputMode::PhotoPath;
            }
        }
        KeyCode::Char('s') => app.start_diary(),
        KeyCode::Char('f') => app.finish_diary(),
        KeyCode::Char('r') => app.recommend_song(),

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::PageDown => app.scroll_down(app.chat_height),
        KeyCode::PageUp => app.scroll_up(app.chat_height),
        KeyCode::Char('g') => app.scroll_top(),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        KeyCode::Esc => app.dismiss_notice(),
        _ => {}
    }
}

/// Shared cursor editing. Returns false for keys it doesn't handle.
fn edit_text(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) => input.insert(c),
        _ => return false,
    }
    true
}

fn handle_answer_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            app.submit_answer();
            app.input_mode = InputMode::Normal;
        }
        _ => {
            edit_text(&mut app.answer_input, key);
        }
    }
}

fn handle_photo_path(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.photo_path_input.take();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let raw = app.photo_path_input.take();
            app.input_mode = InputMode::Normal;
            if !raw.trim().is_empty() {
                app.upload_photo(expand_path(&raw));
            }
        }
        _ => {
            edit_text(&mut app.photo_path_input, key);
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deep_diary_core::DiaryClient;

    fn app() -> App {
        App::new(DiaryClient::new("http://localhost:8031"))
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_ctrl_c_quits_from_any_mode() {
        let mut app = app();
        app.input_mode = InputMode::Editing;
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_editing_keys_do_not_trigger_actions() {
        let mut app = app();
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.input_mode, InputMode::Editing);

        type_str(&mut app, "sfrq");
        assert_eq!(app.answer_input.value, "sfrq");
        assert!(!app.should_quit);
        assert!(!app.is_busy());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.answer_input.value, "sfrq");
    }

    #[test]
    fn test_photo_prompt_escape_clears_input() {
        let mut app = app();
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.input_mode, InputMode::PhotoPath);

        type_str(&mut app, "/tmp/x.png");
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.photo_path_input.value.is_empty());
        assert!(!app.is_busy());
    }

    #[test]
    fn test_empty_photo_path_does_nothing() {
        let mut app = app();
        press(&mut app, KeyCode::Char('p'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(!app.is_busy());
    }

    #[test]
    fn test_escape_dismisses_notice() {
        let mut app = app();
        app.notice = Some(deep_diary_core::Notice("boom".to_string()));
        press(&mut app, KeyCode::Esc);
        assert!(app.notice.is_none());
    }
}
