//! Support prelude for generated matcher programs
//!
//! Generated code is a flat module of matcher structs plus registration
//! functions; prepending [`SUPPORT`] turns the code generator's output
//! into a compilable source file against this crate.

/// Prelude text prepended to generated matcher source.
pub const SUPPORT: &str = r#"#![allow(non_camel_case_types, non_snake_case)]

use rlmeta::{Expr, Match, MatchResult, RuleTable, Stream};

"#;
