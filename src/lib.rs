#![forbid(unsafe_code)]

//! taskdock core: window-state reconciliation for a bottom-of-screen taskbar.
//!
//! The library owns everything between the OS and the bar UI: polling the
//! window list into per-cycle snapshots ([`provider`]), deciding what the bar
//! displays and in what order ([`filter`]), translating user intents into OS
//! effects ([`actions`]), and the refresh/constraint orchestration
//! ([`service`]). The bar's rendering layer is an external collaborator that
//! consumes [`service::DockService`] and reports hover and action events
//! back into it.

pub mod actions;
pub mod config;
pub mod constants;
pub mod filter;
pub mod provider;
pub mod service;
pub mod types;
pub mod window_system;
