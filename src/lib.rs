pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::AppState;
pub use domain::agenda::{build_agenda, AgendaItem, DayAgenda};
pub use domain::models::{Priority, Recurrence, Settings, Task, TaskDraft, TaskKind};
pub use domain::recurrence::next_occurrence;
pub use domain::statistics::{aggregate, Statistics};
pub use domain::validation::{validate, ValidationError};
pub use infrastructure::error::InfraError;
