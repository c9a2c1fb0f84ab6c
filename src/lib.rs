//! ReliefMate: a disaster-relief assistant that answers from the first
//! responsive LLM provider and falls back to keyword-matched guidance when
//! none respond.

pub mod comms;
pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod reports;
pub mod router;
pub mod runtime;
pub mod session;
