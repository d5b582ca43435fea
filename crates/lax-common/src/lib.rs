//! Common utilities for the lax HTML parser.
//!
//! This crate provides shared infrastructure used by all lax components:
//! - **Warning System** - deduplicated, colored terminal output for conditions
//!   that are tolerated but worth surfacing (unknown charsets, unsupported
//!   query functions, encoding mismatches)

pub mod warning;
