use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use yojana_core::View;

use crate::app::{App, InputMode, Pane, Prompt, CATEGORY_FIELD};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
            app.poll_tasks().await;
        }
    }
    app.drain_store_events();
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any view
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('l') if app.session.is_some() => {
                app.logout();
                return;
            }
            _ => {}
        }
    }

    match app.view() {
        View::Unauthenticated => handle_auth_form(app, key),
        View::ProfileIncomplete => handle_profile_form(app, key),
        View::Main => {
            if app.prompt.is_some() {
                handle_prompt(app, key).await;
            } else {
                match app.input_mode {
                    InputMode::Normal => handle_main_normal(app, key),
                    InputMode::Editing => handle_chat_editing(app, key),
                }
            }
        }
    }
}

fn handle_auth_form(app: &mut App, key: KeyEvent) {
    if app.is_auth_busy() {
        return;
    }
    let form = &mut app.auth_form;
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            form.on_password = !form.on_password;
        }
        KeyCode::F(2) => form.toggle_mode(),
        KeyCode::Enter => {
            if form.on_password || !form.password.is_empty() {
                app.submit_auth();
            } else {
                form.on_password = true;
            }
        }
        KeyCode::Backspace => {
            form.focused_text().pop();
        }
        KeyCode::Char(c) => form.focused_text().push(c),
        _ => {}
    }
}

fn handle_profile_form(app: &mut App, key: KeyEvent) {
    if app.is_profile_busy() {
        return;
    }
    let form = &mut app.profile_form;
    match key.code {
        KeyCode::Esc => {
            if app.editing_profile {
                app.cancel_profile_edit();
            }
        }
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Enter => app.submit_profile(),
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if form.focus == CATEGORY_FIELD => {
            form.cycle_category(key.code != KeyCode::Left);
        }
        KeyCode::Backspace => {
            if let Some(text) = form.focused_text() {
                text.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(text) = form.focused_text() {
                text.push(c);
            }
        }
        _ => {}
    }
}

fn handle_main_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => {
            app.focus = match app.focus {
                Pane::Sources => Pane::Chat,
                Pane::Chat => Pane::Sources,
            };
        }
        KeyCode::Char('e') => app.toggle_chat_mode(),

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            Pane::Sources => app.select_next_source(),
            Pane::Chat => app.scroll_chat_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            Pane::Sources => app.select_prev_source(),
            Pane::Chat => app.scroll_chat_up(1),
        },
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(2) / 2),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(2) / 2),
        KeyCode::Char('G') | KeyCode::End => app.follow_chat = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.focus = Pane::Chat;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('u') => open_prompt(app, Prompt::UploadPath),
        KeyCode::Char('t') => open_prompt(app, Prompt::AddText),
        KeyCode::Char('w') => open_prompt(app, Prompt::AddUrl),
        KeyCode::Char('r') => app.start_refresh(),
        KeyCode::Char('h') => app.start_history_load(),
        KeyCode::Char('c') => app.clear_active_conversation(),
        KeyCode::Char('p') => app.begin_profile_edit(),
        _ => {}
    }
}

fn open_prompt(app: &mut App, prompt: Prompt) {
    if prompt == Prompt::UploadPath && app.sources.is_uploading() {
        return;
    }
    app.prompt_input.clear();
    app.prompt = Some(prompt);
}

async fn handle_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.prompt = None,
        KeyCode::Enter => {
            let input = std::mem::take(&mut app.prompt_input);
            match app.prompt.take() {
                Some(Prompt::UploadPath) => app.start_upload(&input).await,
                Some(Prompt::AddText) => app.add_text_source(&input),
                Some(Prompt::AddUrl) => app.add_url_source(&input),
                None => {}
            }
        }
        KeyCode::Backspace => {
            app.prompt_input.pop();
        }
        KeyCode::Char(c) => app.prompt_input.push(c),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_question(),
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.chat_cursor < app.chat_input.chars().count() {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => app.chat_cursor = app.chat_cursor.saturating_sub(1),
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.chat_cursor = 0,
        KeyCode::End => app.chat_cursor = app.chat_input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.view() != View::Main {
        return;
    }
    let over = |area: Option<Rect>| {
        area.is_some_and(|r| {
            mouse.column >= r.x
                && mouse.column < r.x + r.width
                && mouse.row >= r.y
                && mouse.row < r.y + r.height
        })
    };

    match mouse.kind {
        MouseEventKind::ScrollDown if over(app.chat_area) => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp if over(app.chat_area) => app.scroll_chat_up(3),
        MouseEventKind::ScrollDown if over(app.sources_area) => app.select_next_source(),
        MouseEventKind::ScrollUp if over(app.sources_area) => app.select_prev_source(),
        MouseEventKind::Down(_) if over(app.sources_area) => app.focus = Pane::Sources,
        MouseEventKind::Down(_) if over(app.chat_area) => app.focus = Pane::Chat,
        _ => {}
    }
}
