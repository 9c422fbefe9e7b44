use crate::api::types::{Lyrics, Project};
use crate::api::{keys, queries, ApiClient};
use crate::query::{Mutation, MutationState, Query, QueryClient, QueryState};
use crate::ui::components::TextArea;
use crate::ui::renderfns::format_timestamp;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Edit a project's lyrics. Ctrl-S saves the whole draft.
pub struct LyricsEditorView {
  queries: QueryClient,
  project_id: String,
  /// Read from the project entry the detail view loaded
  project_name: Option<String>,
  query: Query<Lyrics>,
  save: Mutation<String, Option<Lyrics>>,
  draft: TextArea,
  /// Data revision the draft was last seeded from
  seeded_revision: Option<u64>,
}

impl LyricsEditorView {
  pub fn new(queries: &QueryClient, api: &ApiClient, project_id: &str) -> Self {
    let mut query = queries::lyrics(queries, api, project_id);
    query.fetch();

    let mut view = Self {
      queries: queries.clone(),
      project_id: project_id.to_string(),
      project_name: None,
      query,
      save: queries::save_lyrics(queries, api, project_id),
      draft: TextArea::new(),
      seeded_revision: None,
    };
    view.seed_draft();
    view.refresh_project_name();
    view
  }

  fn refresh_project_name(&mut self) {
    self.project_name = self
      .queries
      .get_query_data::<Project>(&keys::project(&self.project_id))
      .map(|project| project.name.clone());
  }

  /// Copy server text into the draft once per data revision
  fn seed_draft(&mut self) {
    let revision = self.query.data_revision();
    if self.seeded_revision == Some(revision) {
      return;
    }
    if let Some(lyrics) = self.query.data() {
      self.draft.set_text(&lyrics.raw_text);
      self.seeded_revision = Some(revision);
    }
  }

  fn is_editing(&self) -> bool {
    self.query.is_success()
  }

  fn submit(&mut self) {
    // One save at a time from this editor
    if self.save.is_pending() {
      return;
    }
    self.save.mutate(self.draft.text());
  }

  fn status_line(&self) -> Line<'_> {
    match self.save.state() {
      MutationState::Idle => Line::styled("Ctrl-S to save", Style::default().fg(Color::DarkGray)),
      MutationState::Pending => Line::styled("Saving...", Style::default().fg(Color::Yellow)),
      MutationState::Error(e) => Line::styled(e.to_string(), Style::default().fg(Color::Red)),
      MutationState::Success(_) => Line::styled("Lyrics saved.", Style::default().fg(Color::Green)),
    }
  }

  fn meta_line(lyrics: &Lyrics) -> Line<'static> {
    let mut spans = Vec::new();
    if let Some(source) = &lyrics.source {
      spans.push(Span::styled("Source: ", Style::default().fg(Color::DarkGray)));
      spans.push(Span::raw(source.clone()));
      spans.push(Span::raw("  "));
    }
    if let Some(updated) = &lyrics.updated_at {
      spans.push(Span::styled("Updated: ", Style::default().fg(Color::DarkGray)));
      spans.push(Span::raw(format_timestamp(updated)));
    }
    Line::from(spans)
  }
}

impl View for LyricsEditorView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if !self.is_editing() {
      return match key.code {
        KeyCode::Char('r') => {
          self.query.refetch();
          ViewAction::None
        }
        KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
        _ => ViewAction::None,
      };
    }

    match key.code {
      KeyCode::Char('s') if ctrl => self.submit(),
      KeyCode::Esc => return ViewAction::Pop,
      _ => {
        self.draft.handle_key(key);
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Lyrics ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let placeholder = match self.query.state() {
      QueryState::Idle | QueryState::Loading => {
        Some(Line::styled("Loading lyrics...", Style::default().fg(Color::DarkGray)))
      }
      QueryState::Error(e) => Some(Line::styled(e.to_string(), Style::default().fg(Color::Red))),
      QueryState::Success(_) => None,
    };
    if let Some(line) = placeholder {
      frame.render_widget(
        Paragraph::new(line).block(block).wrap(Wrap { trim: true }),
        area,
      );
      return;
    }

    let meta = self.query.data().map(Self::meta_line).unwrap_or_default();
    let [intro, editor, status] = Layout::vertical([
      Constraint::Length(2),
      Constraint::Min(3),
      Constraint::Length(1),
    ])
    .areas(area);

    let intro_lines = vec![
      Line::styled(
        "Review and edit the current lyrics.",
        Style::default().fg(Color::White),
      ),
      meta,
    ];
    frame.render_widget(Paragraph::new(intro_lines), intro);
    self.draft.render(frame, editor, block);
    frame.render_widget(Paragraph::new(self.status_line()), status);
  }

  fn breadcrumb_label(&self) -> String {
    "Lyrics".to_string()
  }

  fn project(&self) -> Option<&str> {
    self.project_name.as_deref()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      self.seed_draft();
    }
    self.save.poll();
    self.refresh_project_name();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.is_editing() {
      vec![
        ShortcutInfo::new("ctrl-s", "save").with_priority(10),
        ShortcutInfo::new("esc", "back").with_priority(90),
      ]
    } else if self.query.is_loading() {
      vec![ShortcutInfo::new("q", "back").with_priority(90)]
    } else {
      vec![
        ShortcutInfo::new("r", "refresh").with_priority(10),
        ShortcutInfo::new("q", "back").with_priority(90),
      ]
    }
  }
}
