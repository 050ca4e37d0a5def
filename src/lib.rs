//! Trip planner: a conversational bot that collects trip details step by
//! step and answers with a consolidated summary.

pub mod bot;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod providers;
pub mod session;
pub mod summary;
