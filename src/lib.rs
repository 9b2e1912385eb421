//! Agent onboarding: wizard core, verification and submission gateways.

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod onboarding;
