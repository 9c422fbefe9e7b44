use super::KeyResult;
use crate::api::types::SourceClip;
use crate::api::{queries, ApiClient};
use crate::query::{Query, QueryClient, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_duration, truncate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// A project's source clips, one card per clip
pub struct ClipGrid {
  query: Query<Vec<SourceClip>>,
  list_state: ListState,
}

impl ClipGrid {
  pub fn new(queries: &QueryClient, api: &ApiClient, project_id: &str) -> Self {
    let mut query = queries::source_clips(queries, api, project_id);
    query.fetch();

    Self {
      query,
      list_state: ListState::default(),
    }
  }

  fn clips(&self) -> &[SourceClip] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  pub fn refetch(&mut self) {
    self.query.refetch();
  }

  pub fn tick(&mut self) {
    self.query.poll();
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      _ => return KeyResult::NotHandled,
    }
    KeyResult::Handled
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Success(clips) => format!(" Source Clips ({}) ", clips.len()),
      _ => " Source Clips ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let placeholder = match self.query.state() {
      QueryState::Idle | QueryState::Loading => Some(Line::styled(
        "Loading source clips...",
        Style::default().fg(Color::DarkGray),
      )),
      QueryState::Error(e) => Some(Line::styled(e.to_string(), Style::default().fg(Color::Red))),
      QueryState::Success(clips) if clips.is_empty() => Some(Line::styled(
        "No source clips found yet.",
        Style::default().fg(Color::DarkGray),
      )),
      QueryState::Success(_) => None,
    };
    if let Some(line) = placeholder {
      let paragraph = Paragraph::new(line).block(block).wrap(Wrap { trim: true });
      frame.render_widget(paragraph, area);
      return;
    }

    let len = self.clips().len();
    ensure_valid_selection(&mut self.list_state, len);

    let width = area.width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = self
      .clips()
      .iter()
      .map(|clip| {
        let mut lines = vec![Line::styled(
          truncate(&clip.name, width),
          Style::default().fg(Color::White).bold(),
        )];
        if let Some(duration) = clip.duration {
          lines.push(Line::from(vec![
            Span::styled("Duration: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format_duration(duration)),
          ]));
        }
        if let Some(url) = clip.waveform_url.as_deref().filter(|u| !u.is_empty()) {
          lines.push(Line::from(vec![
            Span::styled("Waveform: ", Style::default().fg(Color::DarkGray)),
            Span::styled(truncate(url, width.saturating_sub(10)), Style::default().fg(Color::Cyan)),
          ]));
        }
        lines.push(Line::raw(""));
        ListItem::new(lines)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}
