pub mod activity_log;
pub mod comment;
pub mod label;
pub mod project;
pub mod task;
pub mod user;
pub mod user_behavior;

pub use activity_log::ActivityLog;
pub use comment::Comment;
pub use label::Label;
pub use project::Project;
pub use task::Task;
pub use user::User;
pub use user_behavior::UserBehavior;
