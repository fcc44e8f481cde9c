//! # Pagedit Architecture
//!
//! Pagedit edits template-driven pages of a content repository without ever
//! touching the published originals until the user saves. Every editing
//! episode works on scratch copies that live in a separate project, invisible
//! to everybody else.
//!
//! Like any UI-agnostic core, it is a library that happens to have a CLI
//! client, not the other way round.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, prints, owns stdout/exit codes         │
//! │  - Persists session state between invocations               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API (api.rs)                                               │
//! │  - Facade: seed resources, run round trips, inspect         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session engine (session/) + allocator                      │
//! │  - The editing protocol, pure logic over traits             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Documents (document/) over Storage (store/)                │
//! │  - DataStore trait, FileStore (production),                 │
//! │    InMemoryStore (testing)                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes Rust arguments and returns Rust types.
//! Rendering and redirects go through the [`session::Presenter`] and
//! [`session::Redirector`] traits, so the same core can sit behind an HTTP
//! handler or the bundled CLI.
//!
//! ## Projects
//!
//! Every store call carries a [`model::RequestContext`]. Work on scratch
//! copies happens inside [`model::RequestContext::switch_to`] blocks whose
//! guard restores the caller's project on every way out.
//!
//! ## Module Overview
//!
//! - [`api`]: the facade
//! - [`session`]: request parsing, session state, change diffing, commit, engine
//! - [`allocator`]: collision-free temporary file names
//! - [`document`]: control descriptors, body sections, layouts
//! - [`store`]: storage abstraction and implementations
//! - [`model`]: projects, request context, resources, editor modes
//! - [`config`]: configuration management
//! - [`error`]: error types

pub mod allocator;
pub mod api;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
