//! whereabouts - Locate yourself, reverse-geocode the fix and list nearby
//! points of interest from OpenStreetMap services

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod locate;
pub mod orchestrator;
pub mod proxy;
pub mod surface;
