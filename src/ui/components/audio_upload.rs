use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::api::{queries, ApiClient};
use crate::query::{Mutation, MutationState, QueryClient};
use crate::ui::view::ShortcutInfo;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::path::PathBuf;

/// "Upload Audio" panel: a file path input bound to the upload mutation.
///
/// `u` focuses the path input, Enter submits, Esc leaves the input.
pub struct AudioUpload {
  input: TextInput,
  focused: bool,
  upload: Mutation<Option<PathBuf>, ()>,
}

impl AudioUpload {
  pub fn new(queries: &QueryClient, api: &ApiClient, project_id: &str) -> Self {
    Self {
      input: TextInput::new(),
      focused: false,
      upload: queries::upload_audio(queries, api, project_id),
    }
  }

  pub fn is_focused(&self) -> bool {
    self.focused
  }

  fn submit(&mut self) {
    let path = self.input.value().trim();
    let selected = (!path.is_empty()).then(|| PathBuf::from(path));
    self.upload.mutate(selected);
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult {
    if !self.focused {
      if key.code == KeyCode::Char('u') {
        self.focused = true;
        // Drop the previous outcome unless a call is still running
        if !self.upload.is_pending() {
          self.upload.reset();
        }
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.focused = false;
        self.submit();
      }
      InputResult::Cancelled => self.focused = false,
      InputResult::Consumed | InputResult::NotHandled => {}
    }
    // Focused input swallows everything
    KeyResult::Handled
  }

  pub fn tick(&mut self) {
    // Selection is cleared once the file is on the server
    if self.upload.poll() && self.upload.is_success() {
      self.input.clear();
    }
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.focused {
      vec![
        ShortcutInfo::new("enter", "upload").with_priority(10),
        ShortcutInfo::new("esc", "cancel").with_priority(20),
      ]
    } else {
      vec![ShortcutInfo::new("u", "upload audio").with_priority(20)]
    }
  }

  fn status_line(&self) -> Option<Line<'_>> {
    match self.upload.state() {
      MutationState::Idle => None,
      MutationState::Pending => Some(Line::styled("Uploading...", Style::default().fg(Color::Yellow))),
      MutationState::Error(e) => Some(Line::styled(e.to_string(), Style::default().fg(Color::Red))),
      MutationState::Success(()) => Some(Line::styled(
        "Audio uploaded successfully!",
        Style::default().fg(Color::Green),
      )),
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let border = if self.focused { Color::Yellow } else { Color::Blue };
    let block = Block::default()
      .title(" Upload Audio ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let path_line = if self.input.is_empty() && !self.focused {
      Line::from(vec![
        Span::styled("File: ", Style::default().fg(Color::DarkGray)),
        Span::styled("press u to enter a path", Style::default().fg(Color::DarkGray).italic()),
      ])
    } else {
      Line::from(vec![
        Span::styled("File: ", Style::default().fg(Color::DarkGray)),
        Span::raw(self.input.value()),
      ])
    };

    let mut lines = vec![
      Line::styled(
        "Attach a new audio track to this project.",
        Style::default().fg(Color::White),
      ),
      path_line,
    ];
    lines.extend(self.status_line());

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

    if self.focused && inner.height > 1 {
      let prefix: String = self.input.value().chars().take(self.input.cursor_position()).collect();
      let x = inner.x + 6 + Span::raw(prefix).width() as u16;
      frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y + 1));
    }
  }
}
