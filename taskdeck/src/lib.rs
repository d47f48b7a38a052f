//! `TaskDeck`: personal task manager over a managed document store.
//!
//! The [`store::TaskStore`] mirrors the signed-in user's tasks and writes
//! every change through to a [`backend::DocumentStore`]. Auth flows run
//! against a [`backend::IdentityProvider`]; [`session::SessionTracker`]
//! follows its auth-state channel so the store reloads on every sign-in and
//! clears on sign-out. The terminal front end lives in [`app`] and [`ui`].

pub mod analytics;
pub mod app;
pub mod auth;
pub mod backend;
pub mod command;
pub mod config;
pub mod filter;
pub mod notice;
pub mod session;
pub mod store;
pub mod theme;
pub mod ui;
