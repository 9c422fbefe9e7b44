use crate::api::types::Project;
use crate::api::{queries, ApiClient};
use crate::query::{Query, QueryClient};
use crate::ui::components::{AudioUpload, ClipGrid, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::LyricsEditorView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub const MISSING_ID: &str = "Project ID is missing.";

/// One project: its header, the upload panel and the clip grid.
///
/// The panels mount once the project itself has loaded, so their queries
/// start only for a project that exists.
pub struct ProjectDetailView {
  api: ApiClient,
  queries: QueryClient,
  project_id: String,
  query: Query<Project>,
  upload: Option<AudioUpload>,
  clips: Option<ClipGrid>,
}

impl ProjectDetailView {
  pub fn new(queries: &QueryClient, api: &ApiClient, project_id: &str) -> Self {
    let mut query = queries::project(queries, api, project_id);
    query.fetch();

    let mut view = Self {
      api: api.clone(),
      queries: queries.clone(),
      project_id: project_id.to_string(),
      query,
      upload: None,
      clips: None,
    };
    view.mount_panels();
    view
  }

  fn mount_panels(&mut self) {
    if self.clips.is_none() && self.query.data().is_some() {
      self.upload = Some(AudioUpload::new(&self.queries, &self.api, &self.project_id));
      self.clips = Some(ClipGrid::new(&self.queries, &self.api, &self.project_id));
    }
  }

  fn render_header(&self, frame: &mut Frame, area: Rect, project: &Project) {
    let mut lines = vec![Line::styled(
      project.name.clone(),
      Style::default().fg(Color::White).bold(),
    )];
    if let Some(description) = project.description.as_deref().filter(|d| !d.is_empty()) {
      lines.push(Line::styled(
        description.to_string(),
        Style::default().fg(Color::Gray),
      ));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
  }

  fn render_message(&self, frame: &mut Frame, area: Rect, message: String, color: Color) {
    let block = Block::default()
      .title(format!(" {} ", self.breadcrumb_label()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let paragraph = Paragraph::new(message)
      .block(block)
      .style(Style::default().fg(color))
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }
}

impl View for ProjectDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(upload) = self.upload.as_mut() {
      if upload.handle_key(key) == KeyResult::Handled {
        return ViewAction::None;
      }
    }
    if let Some(clips) = self.clips.as_mut() {
      if clips.handle_key(key) == KeyResult::Handled {
        return ViewAction::None;
      }
    }

    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        if let Some(clips) = self.clips.as_mut() {
          clips.refetch();
        }
      }
      KeyCode::Char('l') if self.query.data().is_some() => {
        return ViewAction::Push(Box::new(LyricsEditorView::new(
          &self.queries,
          &self.api,
          &self.project_id,
        )));
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    if self.project_id.is_empty() {
      self.render_message(frame, area, MISSING_ID.to_string(), Color::Red);
      return;
    }

    let Some(project) = self.query.data().cloned() else {
      let (message, color) = match self.query.error() {
        Some(e) => (e.to_string(), Color::Red),
        None => ("Loading project...".to_string(), Color::DarkGray),
      };
      self.render_message(frame, area, message, color);
      return;
    };

    // A failed refetch keeps the last project on screen under its error
    let error_height = if self.query.is_error() { 1 } else { 0 };
    let [error, header, upload, clips] = Layout::vertical([
      Constraint::Length(error_height),
      Constraint::Length(3),
      Constraint::Length(5),
      Constraint::Min(3),
    ])
    .areas(area);

    if let Some(e) = self.query.error() {
      frame.render_widget(
        Paragraph::new(e.to_string()).style(Style::default().fg(Color::Red)),
        error,
      );
    }
    self.render_header(frame, header, &project);
    if let Some(panel) = self.upload.as_ref() {
      panel.render(frame, upload);
    }
    if let Some(grid) = self.clips.as_mut() {
      grid.render(frame, clips);
    }
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(project) => project.name.clone(),
      None => self.project_id.clone(),
    }
  }

  fn project(&self) -> Option<&str> {
    self.query.data().map(|p| p.name.as_str())
  }

  fn tick(&mut self) {
    if self.query.poll() {
      self.mount_panels();
    }
    if let Some(upload) = self.upload.as_mut() {
      upload.tick();
    }
    if let Some(clips) = self.clips.as_mut() {
      clips.tick();
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if let Some(upload) = self.upload.as_ref().filter(|u| u.is_focused()) {
      return upload.shortcuts();
    }

    let mut shortcuts = vec![
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    if let Some(upload) = self.upload.as_ref() {
      shortcuts.extend(upload.shortcuts());
      shortcuts.push(ShortcutInfo::new("l", "lyrics").with_priority(10));
    }
    shortcuts
  }
}
