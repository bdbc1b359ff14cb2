//! AI Selfie Generation Flow Client
//!
//! This library drives the asynchronous part of the selfie activation: it
//! submits one user's photo + questionnaire bundle to the Make.com scenario
//! and polls the status webhook until the generated image is ready, the
//! deadline expires, or the user gives up. Capture, questionnaire, and
//! result pages are external collaborators that talk to this crate through
//! the [`orchestrator::FlowHandle`] and the session store.

pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
