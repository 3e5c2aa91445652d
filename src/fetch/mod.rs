//! NeoWs data retrieval.
//!
//! This module provides the paginated browse client used to pull raw
//! near-earth-object records into memory.

pub mod client;

pub use client::{FetchOptions, NeoClient};
