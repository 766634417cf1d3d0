//! Operator commands for the folio CMS database.

pub mod cli;
pub mod commands;
