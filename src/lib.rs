// src/lib.rs — Library root for glitchscan

pub mod cli;
pub mod core;
pub mod infra;
pub mod integrations;
pub mod predicate;
pub mod provider;
pub mod stages;
pub mod vocab;
