// Licensed under the Apache-2.0 license

//! Register file compiler.
//!
//! This crate compiles a JSON description of a memory-mapped register file
//! into a self-contained intermediate representation: logical registers
//! with their bus-word blocks, fully resolved field behaviors, internal
//! signals, interrupts, decode conditions and defer tags. The IR serializes
//! to JSON for downstream generators, renders a human-readable address map,
//! and drives the cycle-level reference simulator in the `regfile-sim`
//! crate.
//!
//! ## Usage
//!
//! ```
//! use regfile_compiler::{compile, RegFileConfig};
//!
//! let cfg = RegFileConfig::from_json(
//!     r#"{
//!         "metadata": { "name": "demo" },
//!         "fields": [
//!             { "address": "0x0:7..0", "metadata": { "name": "ctrl" },
//!               "behavior": { "kind": "control" } }
//!         ]
//!     }"#,
//! )
//! .unwrap();
//! let ir = compile(&cfg).unwrap();
//! print!("{}", ir.address_map());
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Serde records mirroring the JSON configuration format
//! - [`compile`]: The pipeline turning a configuration into [`RegFileIr`]
//! - [`ir`]: The compiled output and its address decoder
//! - [`behavior`]: Field behavior presets and resolution
//! - [`field`], [`register`]: Field expansion and register assembly
//! - [`internals`], [`interrupt`]: Internal signal and interrupt bookkeeping
//! - [`address`], [`bitrange`]: Masked addresses and bit range arithmetic
//! - [`access`]: Bus capability and `prot` matching primitives
//! - [`defer`]: Defer tag assignment and the outstanding-access FIFO
//! - [`metadata`], [`util`]: Naming, namespaces and text helpers

pub mod access;
pub mod address;
pub mod behavior;
pub mod bitrange;
pub mod compile;
pub mod config;
pub mod defer;
pub mod error;
pub mod field;
pub mod internals;
pub mod interrupt;
pub mod ir;
pub mod metadata;
pub mod register;
pub mod util;

// Re-export the main entry points.
pub use compile::compile;
pub use config::RegFileConfig;
pub use error::{Error, Result};
pub use ir::{BlockHit, Decoded, RegFileIr};
