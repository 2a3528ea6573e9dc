pub mod analytics;
pub mod board;

pub use analytics::AnalyticsService;
pub use board::KanbanBoard;
