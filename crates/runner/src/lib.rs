//! pagectl scenario runner
//!
//! Drives a single browser session through ordered, declarative scenarios:
//! - Steps are data (`Step` enum), loadable from YAML or built in code
//! - One execution loop interprets them; waits are awaited polls
//! - Embedded frames are entered and always left again
//! - Assertions are recorded, other step errors abort the scenario
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Suite (Rust)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  setup ─▶ scenario 1 ─▶ scenario 2 ─▶ … ─▶ teardown         │
//! │              │                                              │
//! │              ▼                                              │
//! │  Executor: navigate | reload | wait_for | interact          │
//! │            enter_frame { … } | assert | group { … }         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session ── frame stack ── Box<dyn BrowserDriver>           │
//! │                               └── PlaywrightSession         │
//! │                                     └── node bridge.js      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod server;
pub mod session;
pub mod spec;

pub use config::SuiteConfig;
pub use driver::BrowserDriver;
pub use error::{DriverError, DriverResult, E2eError, E2eResult, ErrorKind, StepError};
pub use playwright::PlaywrightSession;
pub use report::{ScenarioReport, ScenarioStatus, SuiteReport};
pub use runner::{Suite, SuiteEvent};
pub use session::Session;
pub use spec::{Action, Check, Condition, Scenario, Step, Target};
