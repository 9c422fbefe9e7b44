pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Keep a list selection inside `len` items (none when empty)
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
  } else {
    match state.selected() {
      Some(i) if i >= len => state.select(Some(len - 1)),
      None => state.select(Some(0)),
      _ => {}
    }
  }
}

/// Main draw function: header, current view, breadcrumb footer
pub fn draw(frame: &mut Frame, app: &mut App) {
  let [header, content, footer] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  let breadcrumb = app.breadcrumb();
  let api_url = app.api_url().clone();
  let shortcuts = app.shortcuts();

  if let Some(view) = app.current_view_mut() {
    renderfns::draw_header(frame, header, &api_url, view.project(), &shortcuts);
    view.render(frame, content);
  }
  renderfns::draw_footer(frame, footer, &breadcrumb);
}
