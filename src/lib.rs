//! Chat intent routing, capability invocation and response normalization.
//!
//! A user message goes through the [`router::IntentRouter`], which asks a
//! language model whether to answer directly or call one of three
//! capabilities (mail, calendar, web search). Capability calls go through the
//! [`adapter::CapabilityAdapter`] to an external handler, and the handler's
//! raw JSON is turned into display text by [`normalize::normalize`]. The
//! [`orchestrator::TurnOrchestrator`] drives one turn at a time per session.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![warn(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy pour stricte discipline
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées
#![deny(clippy::unwrap_in_result)] // Interdit unwrap() sur Result
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing))]

/// Handler invocation through an interchangeable port.
pub mod adapter;
/// The three capabilities.
pub mod capability;
/// Environment-driven configuration.
pub mod config;
/// Messages and per-session state.
pub mod conversation;
/// Decision layer clients.
pub mod llm;
/// Raw handler output to display text.
pub mod normalize;
/// Turn state machine.
pub mod orchestrator;
/// HTTP relay in front of the handler programs.
pub mod relay;
/// Per-turn routing decision.
pub mod router;
/// Chat HTTP API.
#[allow(clippy::unused_async)]
pub mod server;
/// Entry helpers for the binaries.
pub mod start_synapse;
