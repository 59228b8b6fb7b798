//! PowerScale Core
//!
//! Core library for declarative management of PowerScale (OneFS) clusters:
//! configuration parsing, attribute schemas, diffing, planning and applying.

pub mod diagnostics;
pub mod differ;
pub mod effect;
pub mod graph;
pub mod interpreter;
pub mod parser;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
