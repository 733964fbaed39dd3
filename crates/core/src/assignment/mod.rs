//! Assignee resolution for triaged tickets.

mod resolver;

pub use resolver::{skill_match_score, AssignmentError, AssignmentResolver};
