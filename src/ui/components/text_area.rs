use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph};

/// Multi-line editor. Cursor is (row, column in chars).
#[derive(Debug, Clone)]
pub struct TextArea {
  lines: Vec<String>,
  row: usize,
  col: usize,
  scroll: usize,
}

impl Default for TextArea {
  fn default() -> Self {
    Self {
      lines: vec![String::new()],
      row: 0,
      col: 0,
      scroll: 0,
    }
  }
}

fn byte_at(line: &str, col: usize) -> usize {
  line
    .char_indices()
    .nth(col)
    .map(|(i, _)| i)
    .unwrap_or(line.len())
}

fn char_len(line: &str) -> usize {
  line.chars().count()
}

impl TextArea {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the whole content and move the cursor to the start
  pub fn set_text(&mut self, text: &str) {
    self.lines = text.split('\n').map(str::to_string).collect();
    self.row = 0;
    self.col = 0;
    self.scroll = 0;
  }

  pub fn text(&self) -> String {
    self.lines.join("\n")
  }

  #[cfg(test)]
  pub fn cursor(&self) -> (usize, usize) {
    (self.row, self.col)
  }

  fn line_len(&self) -> usize {
    char_len(&self.lines[self.row])
  }

  /// Editing keys; anything else (including Ctrl chords) is left to the parent.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char(c) => {
        let line = &mut self.lines[self.row];
        let at = byte_at(line, self.col);
        line.insert(at, c);
        self.col += 1;
      }
      KeyCode::Tab => {
        let line = &mut self.lines[self.row];
        let at = byte_at(line, self.col);
        line.insert_str(at, "  ");
        self.col += 2;
      }
      KeyCode::Enter => {
        let line = &mut self.lines[self.row];
        let at = byte_at(line, self.col);
        let rest = line.split_off(at);
        self.row += 1;
        self.lines.insert(self.row, rest);
        self.col = 0;
      }
      KeyCode::Backspace => {
        if self.col > 0 {
          self.col -= 1;
          let line = &mut self.lines[self.row];
          let at = byte_at(line, self.col);
          line.remove(at);
        } else if self.row > 0 {
          let current = self.lines.remove(self.row);
          self.row -= 1;
          self.col = self.line_len();
          self.lines[self.row].push_str(&current);
        }
      }
      KeyCode::Delete => {
        if self.col < self.line_len() {
          let line = &mut self.lines[self.row];
          let at = byte_at(line, self.col);
          line.remove(at);
        } else if self.row + 1 < self.lines.len() {
          let next = self.lines.remove(self.row + 1);
          self.lines[self.row].push_str(&next);
        }
      }
      KeyCode::Left => {
        if self.col > 0 {
          self.col -= 1;
        } else if self.row > 0 {
          self.row -= 1;
          self.col = self.line_len();
        }
      }
      KeyCode::Right => {
        if self.col < self.line_len() {
          self.col += 1;
        } else if self.row + 1 < self.lines.len() {
          self.row += 1;
          self.col = 0;
        }
      }
      KeyCode::Up => {
        self.row = self.row.saturating_sub(1);
        self.col = self.col.min(self.line_len());
      }
      KeyCode::Down => {
        self.row = (self.row + 1).min(self.lines.len() - 1);
        self.col = self.col.min(self.line_len());
      }
      KeyCode::Home => self.col = 0,
      KeyCode::End => self.col = self.line_len(),
      _ => return KeyResult::NotHandled,
    }
    KeyResult::Handled
  }

  /// Draw inside `block`, scrolled to keep the cursor visible
  pub fn render(&mut self, frame: &mut Frame, area: Rect, block: Block) {
    let inner = block.inner(area);
    let height = inner.height.max(1) as usize;
    if self.row < self.scroll {
      self.scroll = self.row;
    } else if self.row >= self.scroll + height {
      self.scroll = self.row + 1 - height;
    }

    let lines: Vec<Line> = self.lines.iter().map(|l| Line::raw(l.as_str())).collect();
    let paragraph = Paragraph::new(lines)
      .block(block)
      .scroll((self.scroll as u16, 0));
    frame.render_widget(paragraph, area);

    let prefix = &self.lines[self.row][..byte_at(&self.lines[self.row], self.col)];
    let x = inner.x + (Span::raw(prefix).width() as u16).min(inner.width.saturating_sub(1));
    let y = inner.y + (self.row - self.scroll) as u16;
    frame.set_cursor_position((x, y));
  }
}
