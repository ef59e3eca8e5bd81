//! Domain models for the course advisor.
//!
//! # Core Concepts
//!
//! - [`Rule`]: Declarative predicate-plus-output record. The rule set is loaded
//!   once and never changes while the process runs.
//! - [`ProfileSubmission`] / [`AcademicProfile`]: A student's stream, subjects,
//!   results, GPA and interest, before and after vocabulary validation.
//! - [`StoredProfile`]: The single persisted profile per student, carrying the
//!   last computed recommendation.
//! - [`FeedbackEntry`]: Append-only advisor feedback on a student.
//! - [`User`]: Account identity; a student's user id is their `student_id`.

mod feedback;
mod profile;
mod rule;
mod user;
mod vocabulary;

pub use feedback::*;
pub use profile::*;
pub use rule::*;
pub use user::*;
pub use vocabulary::*;
