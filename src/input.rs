use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Focus, Page};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Single-line text field. `cursor` counts chars, `scroll` display columns.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormInput {
  pub text: String,
  pub cursor: usize,
  pub scroll: usize,
}

impl FormInput {
  /// Trimmed content, as submitted.
  pub fn value(&self) -> &str {
    self.text.trim()
  }

  pub fn insert(&mut self, c: char) {
    let byte_idx = char_to_byte_index(&self.text, self.cursor);
    self.text.insert(byte_idx, c);
    self.cursor += 1;
  }

  pub fn backspace(&mut self) -> bool {
    if self.cursor == 0 {
      return false;
    }
    self.cursor -= 1;
    let byte_idx = char_to_byte_index(&self.text, self.cursor);
    self.text.remove(byte_idx);
    true
  }

  pub fn delete(&mut self) -> bool {
    if self.cursor >= self.text.chars().count() {
      return false;
    }
    let byte_idx = char_to_byte_index(&self.text, self.cursor);
    self.text.remove(byte_idx);
    true
  }

  pub fn left(&mut self) {
    self.cursor = self.cursor.saturating_sub(1);
  }

  pub fn right(&mut self) {
    if self.cursor < self.text.chars().count() {
      self.cursor += 1;
    }
  }

  pub fn home(&mut self) {
    self.cursor = 0;
  }

  pub fn end(&mut self) {
    self.cursor = self.text.chars().count();
  }

  pub fn clear(&mut self) -> bool {
    if self.text.is_empty() {
      return false;
    }
    self.text.clear();
    self.cursor = 0;
    self.scroll = 0;
    true
  }
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

  if ctrl && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if ctrl && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  if ctrl && key.code == KeyCode::Char('n') {
    if app.page == Page::Search {
      app.cycle_instance();
    }
    return;
  }

  match key.code {
    KeyCode::Tab => {
      app.set_page(app.page.next());
      return;
    }
    KeyCode::BackTab => {
      app.set_page(app.page.prev());
      return;
    }
    _ => {}
  }

  if app.modal.is_some() {
    handle_modal_key(app, key);
    return;
  }

  match app.focus {
    Focus::Input => handle_input_key(app, key),
    Focus::Results => match app.page {
      Page::AutoDownload => app.focus = Focus::Input,
      Page::Extract => handle_extract_key(app, key),
      Page::Search => handle_search_key(app, key),
      Page::Wakame => handle_wakame_key(app, key),
    },
  }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
  let changed = match key.code {
    KeyCode::Enter => {
      app.submit();
      false
    }
    KeyCode::Char(c) => {
      app.input_mut().insert(c);
      true
    }
    KeyCode::Backspace => app.input_mut().backspace(),
    KeyCode::Delete => app.input_mut().delete(),
    KeyCode::Left => {
      app.input_mut().left();
      false
    }
    KeyCode::Right => {
      app.input_mut().right();
      false
    }
    KeyCode::Home => {
      app.input_mut().home();
      false
    }
    KeyCode::End => {
      app.input_mut().end();
      false
    }
    KeyCode::Esc => {
      if app.input_mut().clear() {
        true
      } else {
        if app.result_count() > 0 {
          app.focus = Focus::Results;
        } else {
          app.should_quit = true;
        }
        false
      }
    }
    KeyCode::Down => {
      if app.result_count() > 0 {
        app.focus = Focus::Results;
      }
      false
    }
    _ => false,
  };
  if changed {
    app.clear_error();
    app.input_changed();
  }
}

/// Keys shared by every results list. Returns true when handled.
fn handle_list_key(app: &mut App, key: KeyEvent, step: isize) -> bool {
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.move_selection(step),
    KeyCode::Up | KeyCode::Char('k') => app.move_selection(-step),
    KeyCode::Esc | KeyCode::Char('/') | KeyCode::Char('i') => app.focus = Focus::Input,
    _ => return false,
  }
  true
}

fn handle_extract_key(app: &mut App, key: KeyEvent) {
  if handle_list_key(app, key, 1) {
    return;
  }
  match key.code {
    KeyCode::Enter | KeyCode::Char('p') => app.play_selected_format(),
    KeyCode::Char('d') => app.download_selected_format(),
    KeyCode::Char('c') => app.copy_selected_format(),
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
  if handle_list_key(app, key, 1) {
    return;
  }
  match key.code {
    KeyCode::Enter | KeyCode::Char('x') => app.search_extract_selected(),
    KeyCode::Char('c') => app.search_copy_selected(),
    _ => {}
  }
}

fn handle_wakame_key(app: &mut App, key: KeyEvent) {
  // Up/down jump a whole grid row.
  let columns = app.wakame.columns.max(1) as isize;
  if handle_list_key(app, key, columns) {
    return;
  }
  match key.code {
    KeyCode::Right | KeyCode::Char('l') => app.move_selection(1),
    KeyCode::Left | KeyCode::Char('h') => app.move_selection(-1),
    KeyCode::Enter | KeyCode::Char('x') => app.wakame_extract_selected(),
    KeyCode::Char('p') => app.wakame_open_selected(),
    KeyCode::Char('c') => app.wakame_copy_selected(),
    _ => {}
  }
}

fn handle_modal_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.modal_step(true),
    KeyCode::Up | KeyCode::Char('k') => app.modal_step(false),
    KeyCode::Char('p') => app.play_selected_format(),
    KeyCode::Enter | KeyCode::Char('d') => app.download_selected_format(),
    KeyCode::Char('c') => app.copy_selected_format(),
    KeyCode::Esc | KeyCode::Char('q') => app.modal = None,
    _ => {}
  }
}
