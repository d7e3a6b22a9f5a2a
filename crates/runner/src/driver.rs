//! Browser driver interface consumed by the runner

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverResult;
use crate::spec::Target;

/// Primitive browser operations.
///
/// Every call acts on the current frame context. Lookups of absent elements
/// return [`crate::error::DriverError::NotFound`]; `is_visible` and
/// `is_present` return `Ok(false)` instead.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Load `url` and wait for the network to go idle
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Reload the current document
    async fn reload(&mut self, timeout: Duration) -> DriverResult<()>;

    async fn is_visible(&mut self, target: &Target) -> DriverResult<bool>;

    async fn is_present(&mut self, target: &Target) -> DriverResult<bool>;

    async fn click(&mut self, target: &Target) -> DriverResult<()>;

    /// Set form fields by `name`, optionally submitting the form afterwards
    async fn fill_form(
        &mut self,
        form: &Target,
        fields: &BTreeMap<String, String>,
        submit: bool,
    ) -> DriverResult<()>;

    /// Switch into the child frame at `index` of the current context
    async fn enter_frame(&mut self, index: usize) -> DriverResult<()>;

    /// Return to the parent of the current frame
    async fn exit_frame(&mut self) -> DriverResult<()>;

    /// Return to the top-level document
    async fn reset_frames(&mut self) -> DriverResult<()>;

    async fn current_url(&mut self) -> DriverResult<String>;

    async fn current_title(&mut self) -> DriverResult<String>;

    /// Text content of the first element matching `target`
    async fn text_of(&mut self, target: &Target) -> DriverResult<String>;

    /// Value of the form field named `name`
    async fn field_value(&mut self, name: &str) -> DriverResult<String>;

    async fn close(&mut self) -> DriverResult<()>;
}
