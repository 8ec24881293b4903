//! Progress analytics for the EduSpark learning games: formative assessment
//! tracking, age-normalized benchmark comparison, trend detection, and
//! report composition.

pub mod benchmark;
pub mod db;
pub mod error;
pub mod models;
pub mod recorder;
pub mod report;
pub mod stats;
pub mod store;
