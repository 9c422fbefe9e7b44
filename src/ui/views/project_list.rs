use crate::api::types::Project;
use crate::api::{queries, ApiClient};
use crate::query::{Query, QueryClient, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_date, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProjectDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

const WELCOME: &str = "Manage your audio projects, organize source clips, and fine-tune lyrics.";
const SUBTITLE: &str = "Browse and open your existing audio projects.";
const EMPTY: &str = "No projects yet. Create one from the backend or CLI.";

/// Root view: every project on the backend
pub struct ProjectListView {
  api: ApiClient,
  queries: QueryClient,
  query: Query<Vec<Project>>,
  list_state: ListState,
}

impl ProjectListView {
  pub fn new(queries: &QueryClient, api: &ApiClient) -> Self {
    let mut query = queries::projects(queries, api);
    query.fetch();

    Self {
      api: api.clone(),
      queries: queries.clone(),
      query,
      list_state: ListState::default(),
    }
  }

  fn projects(&self) -> &[Project] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn render_intro(&self, frame: &mut Frame, area: Rect) {
    let lines = vec![
      Line::styled(WELCOME, Style::default().fg(Color::White)),
      Line::styled(SUBTITLE, Style::default().fg(Color::DarkGray)),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Success(projects) => format!(" Projects ({}) ", projects.len()),
      _ => " Projects ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let placeholder = match self.query.state() {
      QueryState::Idle | QueryState::Loading => {
        Some(Line::styled("Loading projects...", Style::default().fg(Color::DarkGray)))
      }
      QueryState::Error(e) => Some(Line::styled(e.to_string(), Style::default().fg(Color::Red))),
      QueryState::Success(projects) if projects.is_empty() => {
        Some(Line::styled(EMPTY, Style::default().fg(Color::DarkGray)))
      }
      QueryState::Success(_) => None,
    };
    if let Some(line) = placeholder {
      let paragraph = Paragraph::new(line).block(block).wrap(Wrap { trim: true });
      frame.render_widget(paragraph, area);
      return;
    }

    let len = self.projects().len();
    ensure_valid_selection(&mut self.list_state, len);

    let width = area.width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = self
      .projects()
      .iter()
      .map(|project| {
        let mut lines = vec![Line::styled(
          truncate(&project.name, width),
          Style::default().fg(Color::White).bold(),
        )];
        if let Some(description) = project.description.as_deref().filter(|d| !d.is_empty()) {
          lines.push(Line::styled(
            truncate(description, width),
            Style::default().fg(Color::Gray),
          ));
        }
        if let Some(created) = &project.created_at {
          lines.push(Line::styled(
            format!("Created {}", format_date(created)),
            Style::default().fg(Color::DarkGray),
          ));
        }
        ListItem::new(lines)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for ProjectListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|idx| self.projects().get(idx));
        if let Some(project) = selected {
          return ViewAction::Push(Box::new(ProjectDetailView::new(
            &self.queries,
            &self.api,
            &project.id,
          )));
        }
      }
      KeyCode::Char('q') => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [intro, list] =
      Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).areas(area);
    self.render_intro(frame, intro);
    self.render_list(frame, list);
  }

  fn breadcrumb_label(&self) -> String {
    "Projects".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "open").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
