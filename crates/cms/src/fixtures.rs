//! Reusable step sequences for preparing and cleaning up CMS state
//!
//! Every fixture is a named [`Step::Group`] so it shows up as one label in
//! logs and failure reports.

use serde::{Deserialize, Serialize};

use pagectl_runner::config::SuiteConfig;
use pagectl_runner::{E2eError, E2eResult, Step};

use crate::selectors::{self, css};

/// Attributes of a page created or removed through the admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAttributes {
    pub title: String,
    /// Explicit slug; the admin derives one from the title when unset
    #[serde(default)]
    pub slug: Option<String>,
}

impl PageAttributes {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Log into the admin with the configured credentials
pub fn login(config: &SuiteConfig) -> E2eResult<Step> {
    let credentials = &config.credentials;
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(E2eError::Configuration(
            "the login fixture needs credentials.username and credentials.password".to_string(),
        ));
    }

    Ok(Step::group(
        "login",
        vec![
            Step::navigate(config.admin_url("login/")),
            Step::wait_visible(css(selectors::LOGIN_FORM)),
            Step::fill(
                css(selectors::LOGIN_FORM),
                [
                    ("username", credentials.username.as_str()),
                    ("password", credentials.password.as_str()),
                ],
                true,
            ),
            Step::wait_visible(css(selectors::ADMIN_USER_TOOLS)),
        ],
    ))
}

pub fn logout(config: &SuiteConfig) -> Step {
    Step::group(
        "logout",
        vec![
            Step::navigate(config.admin_url("logout/")),
            Step::wait_present(css(selectors::ADMIN_CONTENT)),
        ],
    )
}

/// Create a page through the admin add form
pub fn add_page(config: &SuiteConfig, page: &PageAttributes) -> Step {
    let mut fields = vec![("title", page.title.clone())];
    if let Some(slug) = &page.slug {
        fields.push(("slug", slug.clone()));
    }

    Step::group(
        format!("add_page:{}", page.title),
        vec![
            Step::navigate(config.admin_url("cms/page/add/")),
            Step::wait_visible(css(selectors::PAGE_FORM)),
            Step::fill(css(selectors::PAGE_FORM), fields, false),
            Step::click(css(selectors::ADMIN_SAVE)),
            Step::wait_visible(css(selectors::ADMIN_SUCCESS)),
        ],
    )
}

/// Delete a page from the admin page tree, confirming the deletion
pub fn remove_page(config: &SuiteConfig, page: &PageAttributes) -> Step {
    let delete_link = selectors::tree_delete_link(&page.title);

    Step::group(
        format!("remove_page:{}", page.title),
        vec![
            Step::navigate(config.admin_url("cms/page/")),
            Step::wait_visible(delete_link.clone()),
            Step::click(delete_link),
            Step::wait_visible(css(selectors::ADMIN_CONFIRM_DELETE)),
            Step::click(css(selectors::ADMIN_CONFIRM_DELETE)),
            Step::wait_visible(css(selectors::ADMIN_SUCCESS)),
        ],
    )
}

/// Public URL of a page whose slug is its lowercased title
pub fn page_url(config: &SuiteConfig, title: &str) -> String {
    format!("{}{}/", config.base(), title).to_lowercase()
}
