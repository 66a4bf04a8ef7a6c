//! Core data structures representing periodic crystals.
//!
//! This module provides the foundational types that flow through
//! `moiety-forge`:
//!
//! - [`species`] – Species labels with the R-group mask flag.
//! - [`atom`] – Minimal atom representation with species and fractional coordinates.
//! - [`cell`] – Unit cell with fractional ↔ Cartesian maps, wrapping, and nearest-image arithmetic.
//! - [`graph`] – Undirected bond graph with per-edge geometric properties.
//! - [`crystal`] – Complete crystals: atoms, bonds, cell, and optional charges.
//!
//! The data model intentionally keeps crystals as plain data; the search and
//! replace engines transform them without mutating their inputs.

pub mod atom;
pub mod cell;
pub mod crystal;
pub mod graph;
pub mod species;
