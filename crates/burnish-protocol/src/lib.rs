//! Shared record, message, and error shapes for the burnish job protocol.
//!
//! Everything that crosses the store or the view↔coordinator message
//! exchange is defined here so both processes agree on one schema.

pub mod clock;
pub mod error;
pub mod message;
pub mod records;
