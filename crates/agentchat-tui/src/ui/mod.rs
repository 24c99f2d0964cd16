pub mod app;
pub mod terminal;
pub mod views;

pub use app::{App, InputMode, View};
pub use terminal::{init as init_terminal, restore as restore_terminal, Tui};
