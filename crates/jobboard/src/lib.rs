//! Application lifecycle and relational integrity core for the job marketplace.
//!
//! The [`marketplace`] module owns the domain: seekers applying to postings,
//! employers reviewing applications, and the chat threads bound to them. The
//! remaining modules carry the service plumbing shared with the API binary.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
