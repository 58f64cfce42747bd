//! # docpack core
//!
//! Domain types and error definitions for the docpack prioritization engine.
//! This crate has **no engine logic**. It defines the project facts model
//! and the tagged kinds that every other crate matches on.
//!
//! ## Design Philosophy
//!
//! - The facts model is plain data, deserialized once from the extractor and
//!   read-only afterwards.
//! - Cross references are names, resolved through [`FactsIndex`].
//! - Item and content kinds are closed enums, so stages match exhaustively.

pub mod error;
pub mod facts;
pub mod index;
pub mod kind;

// Re-export key types at crate root for ergonomics
pub use error::{ConfigurationError, Error, Result, TokenCountError};
pub use facts::{
    Class, CodeExample, Configuration, Constant, Dependencies, Documentation, EntryPoint,
    FactsSummary, Function, Import, Module, ProjectFacts, ProjectKind, ProjectMetadata, Structure,
    TestSuite,
};
pub use index::FactsIndex;
pub use kind::{Category, ContentKind, ItemType};
