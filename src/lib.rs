//! Plan and build MinHash sketches for genome and proteome collections.
//!
//! The pipeline has two stages. [`registry`] turns a pile of `.fna`/`.faa`
//! files into a source list with one row per entity. [`planner`] crosses that
//! list with the requested [`domain::SketchSpec`]s, drops every pair already
//! recorded in prior manifests ([`reconcile`]), and [`accumulate`] sketches the
//! remainder with one pass per source file.

pub mod accumulate;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod manifest;
pub mod output;
pub mod params;
pub mod planner;
pub mod reconcile;
pub mod registry;
pub mod sequence;
pub mod sink;
pub mod sketch;
