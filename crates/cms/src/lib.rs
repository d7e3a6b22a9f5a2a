//! CMS page administration suite
//!
//! Fixtures and scenarios for the toolbar page menu of the CMS frontend,
//! built from `pagectl-runner` steps:
//! - `fixtures`: login, logout, add and remove pages through the admin
//! - `page_control`: settings modal, advanced settings and deletion
//! - `selectors`: toolbar, modal and admin selectors

pub mod fixtures;
pub mod page_control;
pub mod selectors;
pub mod token;

pub use fixtures::{add_page, login, logout, page_url, remove_page, PageAttributes};
pub use page_control::{build_suite, PageControlOptions};
pub use token::random_token;
