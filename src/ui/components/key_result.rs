/// Outcome of offering a key to a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
  /// Key was consumed
  Handled,
  /// Key was not consumed, parent should try the next handler
  NotHandled,
}
