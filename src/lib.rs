//! Course advisor: matches a student's academic profile against a static
//! rule base and keeps one current recommendation per student, plus an
//! append-only trail of advisor feedback.

pub mod advisor;
pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod rules;
