// Database models for aula-quiz

pub mod course;
pub mod quiz;
pub mod segment;
pub mod topic;
pub mod user;

pub use course::*;
pub use quiz::*;
pub use segment::*;
pub use topic::*;
pub use user::*;
