pub mod settings;

pub use settings::{ApiSettings, ContextSettings, Settings, TaskSettings};
