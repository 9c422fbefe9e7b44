use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const QUIT_HINT: &str = "Ctrl-C quit ";

/// Draw the footer bar: view breadcrumb on the left, quit hint on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String]) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i + 1 == breadcrumb.len() {
      Style::default().fg(Color::Magenta).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let [left, right] = Layout::horizontal([
    Constraint::Min(1),
    Constraint::Length(QUIT_HINT.len() as u16),
  ])
  .areas(area);

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), left);
  frame.render_widget(
    Paragraph::new(QUIT_HINT)
      .style(background.fg(Color::DarkGray))
      .alignment(Alignment::Right),
    right,
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::buffer_text;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;

  #[test]
  fn test_breadcrumb_joined() {
    let mut terminal = Terminal::new(TestBackend::new(60, 1)).unwrap();
    let crumbs = vec!["Projects".to_string(), "Demo".to_string(), "Lyrics".to_string()];
    terminal.draw(|f| draw_footer(f, f.area(), &crumbs)).unwrap();

    let text = buffer_text(&terminal);
    assert!(text.contains("Projects > Demo > Lyrics"));
    assert!(text.contains("Ctrl-C quit"));
  }
}
