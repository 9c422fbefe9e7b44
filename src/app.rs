use crate::api::ApiClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryClient;
use crate::ui;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{ProjectDetailView, ProjectListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Navigation stack - the project list is always at index 0
  views: Vec<Box<dyn View>>,

  api: ApiClient,

  /// The one query cache, shared by every view
  queries: QueryClient,

  tick_rate: Duration,

  should_quit: bool,
}

impl App {
  /// Build the view stack: project list, plus `project`'s detail view if given
  pub fn new(config: &Config, project: Option<&str>) -> Result<Self> {
    let api = ApiClient::new(&config.api)?;
    let queries = QueryClient::new();

    let mut views: Vec<Box<dyn View>> = vec![Box::new(ProjectListView::new(&queries, &api))];
    if let Some(project_id) = project {
      views.push(Box::new(ProjectDetailView::new(&queries, &api, project_id)));
    }

    Ok(Self {
      views,
      api,
      queries,
      tick_rate: Duration::from_millis(config.ui.tick_rate_ms.max(10)),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    info!(api = %self.api.base_url(), "starting beatmatchr");

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = self.event_loop().await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(self.tick_rate);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    info!(cache = ?self.queries, "quitting");
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {}
    }
  }

  /// Ctrl-C always quits; every other key goes to the current view
  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.views.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Quit,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.views.push(view),
      ViewAction::Pop => {
        // The root view stays
        if self.views.len() > 1 {
          self.views.pop();
        }
      }
      ViewAction::Quit => self.should_quit = true,
    }
  }

  /// Poll every view on the stack so covered views stay current too
  fn tick(&mut self) {
    for view in self.views.iter_mut() {
      view.tick();
    }
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.views.last_mut()
  }

  pub fn api_url(&self) -> &url::Url {
    self.api.base_url()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .views
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }
}
