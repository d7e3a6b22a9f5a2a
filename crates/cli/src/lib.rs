//! pagectl CLI
//!
//! Runs the CMS page administration suite, lists and shows scenarios, and
//! manages the configuration file.

pub mod commands;
pub mod output;
