//! Exam scheduling and admission scoring for private-school entrance exams.

pub mod calculator;
pub mod config;
pub mod error;
pub mod schedule;
pub mod telemetry;
