//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the flowchart pipeline, export rendering, and
//! persistence so route handlers can stay focused on request/response
//! translation.

pub mod export;
pub mod flowchart;
pub mod persistence;
