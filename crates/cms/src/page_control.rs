//! Page administration scenarios: settings modal, advanced settings, deletion

use pagectl_runner::config::SuiteConfig;
use pagectl_runner::{Check, E2eResult, Scenario, Step, Suite};
use tracing::debug;

use crate::fixtures::{self, PageAttributes};
use crate::selectors::{self, css};
use crate::token::random_token;

pub const FIRST_PAGE_TITLE: &str = "First page";
pub const SECOND_PAGE_TITLE: &str = "Second";
/// Must not match the second page title
pub const UPDATED_TITLE: &str = "updated";

pub const SETTINGS_SCENARIO: &str = "Page settings are accessible and can be edited from modal";
pub const ADVANCED_SCENARIO: &str =
    "Page advanced settings are accessible from modal and can be edited";
pub const DELETE_SCENARIO: &str = "Page can be deleted";

const DISABLED_REASON: &str = "disabled: modal markup changed, pending rewrite";

/// Options for building the page-control suite
#[derive(Debug, Clone, Default)]
pub struct PageControlOptions {
    /// Run scenarios that are disabled by default
    pub include_disabled: bool,
    /// Token used for the overwritten URL; random when unset
    pub token: Option<String>,
}

/// Build the suite: login and two pages in setup, both pages removed and a
/// logout in teardown.
pub fn build_suite(config: &SuiteConfig, options: &PageControlOptions) -> E2eResult<Suite> {
    let first = PageAttributes::new(FIRST_PAGE_TITLE);
    let second = PageAttributes::new(SECOND_PAGE_TITLE);

    let mut suite = Suite::new(config.clone());

    // the second page exists because the first one is published by default
    suite.register_setup(vec![
        fixtures::login(config)?,
        fixtures::add_page(config, &first),
        fixtures::add_page(config, &second),
    ])?;
    suite.register_teardown(vec![
        fixtures::remove_page(config, &second),
        fixtures::remove_page(config, &first),
        fixtures::logout(config),
    ])?;

    let token = options.token.clone().unwrap_or_else(random_token);

    suite.register(
        edit_settings_scenario(config)
            .with_tags(&["modal", "settings"])
            .skipped(DISABLED_REASON),
    )?;
    suite.register(
        advanced_settings_scenario(config, &token)
            .with_tags(&["modal", "advanced"])
            .skipped(DISABLED_REASON),
    )?;
    suite.register(delete_page_scenario(config).with_tags(&["smoke", "delete"]))?;

    suite.include_skipped(options.include_disabled);
    debug!(
        "Built page-control suite ({} scenario(s), disabled ones {})",
        suite.scenarios().len(),
        if options.include_disabled { "included" } else { "skipped" }
    );
    Ok(suite)
}

/// Rename the second page through the page settings modal
pub fn edit_settings_scenario(config: &SuiteConfig) -> Scenario {
    let mut steps = open_page(config);
    steps.push(Step::assert(
        Check::TitleMatches(SECOND_PAGE_TITLE.to_string()),
        "Current page is the correct one",
    ));
    steps.extend(open_page_menu_entry("Page settings"));
    steps.push(wait_modal_frame());
    steps.push(Step::in_frame(
        0,
        vec![
            Step::wait_visible(css(selectors::PAGE_FORM)),
            field_equals("title", SECOND_PAGE_TITLE, "Page settings modal available"),
            Step::fill(css(selectors::PAGE_FORM), [("title", UPDATED_TITLE)], false),
        ],
    ));
    // submit without closing the modal
    steps.push(Step::click(selectors::modal_button("Save and continue editing")));
    steps.push(Step::wait_visible(css(selectors::MESSAGES)));
    steps.push(Step::assert(
        Check::HasText {
            target: css(selectors::MESSAGES),
            text: format!(
                "The page \"{}\" was changed successfully. You may edit it again below.",
                SECOND_PAGE_TITLE
            ),
        },
        "Page settings can be edited through modal",
    ));
    steps.push(Step::in_frame(
        0,
        vec![
            Step::wait_visible(css(selectors::PAGE_FORM)),
            field_equals("title", UPDATED_TITLE, "Title was updated"),
        ],
    ));
    steps.push(Step::reload());
    steps.push(Step::assert(
        Check::TitleMatches(UPDATED_TITLE.to_string()),
        "Current page has correct title",
    ));
    steps.push(restore_title(SECOND_PAGE_TITLE));

    Scenario::new(SETTINGS_SCENARIO, steps)
        .with_description("Rename a page from the toolbar page settings modal")
}

/// Overwrite the URL of the second page and clear it again
pub fn advanced_settings_scenario(config: &SuiteConfig, token: &str) -> Scenario {
    let overwritten = format!("overwritten-url-{}", token);

    let mut steps = open_page(config);
    steps.extend(open_page_menu_entry("Page settings"));
    steps.push(wait_modal_frame());
    steps.push(Step::in_frame(
        0,
        vec![
            Step::wait_visible(css(selectors::PAGE_FORM)),
            field_equals("title", SECOND_PAGE_TITLE, "Page settings modal available"),
        ],
    ));
    steps.push(Step::click(selectors::modal_button("Advanced Settings")));
    steps.push(wait_modal_frame());
    steps.push(Step::in_frame(
        0,
        vec![
            Step::wait_visible(css(selectors::PAGE_FORM)),
            field_equals("overwrite_url", "", "Advanced settings are available from modal"),
            Step::fill(
                css(selectors::PAGE_FORM),
                [("overwrite_url", format!("/{}", overwritten))],
                false,
            ),
        ],
    ));
    steps.push(Step::click(css(selectors::MODAL_SUBMIT)));
    steps.push(Step::wait_url("overwritten-url"));
    steps.push(Step::assert(
        Check::UrlMatches("overwritten-url".to_string()),
        "Url has been overwritten",
    ));
    steps.push(title_unchanged());

    steps.extend(open_page_menu_entry("Advanced settings"));
    steps.push(wait_modal_frame());
    steps.push(Step::in_frame(
        0,
        vec![
            Step::wait_visible(css(selectors::PAGE_FORM)),
            field_equals(
                "overwrite_url",
                &overwritten,
                "Overwritten url is shown in advanced settings",
            ),
            Step::fill(css(selectors::PAGE_FORM), [("overwrite_url", "")], false),
        ],
    ));
    steps.push(Step::click(css(selectors::MODAL_SUBMIT)));

    let slug = SECOND_PAGE_TITLE.to_lowercase();
    steps.push(Step::wait_url(slug.clone()));
    steps.push(Step::assert(
        Check::UrlMatches(slug),
        "Url is derived from the title again",
    ));
    steps.push(title_unchanged());

    Scenario::new(ADVANCED_SCENARIO, steps)
        .with_description("Overwrite the page URL from the advanced settings modal and restore it")
}

/// Delete the second page from the toolbar, then add it back for teardown
pub fn delete_page_scenario(config: &SuiteConfig) -> Scenario {
    let language = regex::escape(&config.language);

    let mut steps = open_page(config);
    steps.extend(open_page_menu_entry("Delete page"));
    steps.push(Step::wait_visible(css(selectors::MODAL_OPEN)));
    steps.push(Step::assert(
        Check::Visible(css(selectors::MODAL_OPEN)),
        "Delete confirmation modal is open",
    ));
    steps.push(Step::click(css(selectors::MODAL_DELETE)));
    // redirected to the language root, optionally still in edit mode
    steps.push(Step::wait_url(format!("/{}/(\\?.*)?$", language)));
    steps.push(Step::assert(
        Check::UrlMatches(format!("{}/", language)),
        "Page was removed and user was redirected",
    ));
    steps.push(Step::assert(
        Check::TitleMatches(FIRST_PAGE_TITLE.to_string()),
        "Title is still the same",
    ));
    steps.push(Step::navigate(fixtures::page_url(config, SECOND_PAGE_TITLE)));
    steps.push(Step::assert(
        Check::TitleMatches("Page not found".to_string()),
        "The page is not available",
    ));
    steps.push(fixtures::add_page(config, &PageAttributes::new(SECOND_PAGE_TITLE)));

    Scenario::new(DELETE_SCENARIO, steps)
        .with_description("Delete a page from the toolbar and check it is gone")
}

/// Edit mode on, then the second page
fn open_page(config: &SuiteConfig) -> Vec<Step> {
    vec![
        Step::navigate(config.edit_url()),
        Step::wait_visible(css(selectors::TOOLBAR_EXPANDED)),
        Step::navigate(fixtures::page_url(config, SECOND_PAGE_TITLE)),
    ]
}

/// Open the toolbar "Page" menu and pick one of its entries
fn open_page_menu_entry(label: &str) -> Vec<Step> {
    vec![
        Step::click(css(selectors::PAGE_MENU)),
        Step::wait_present(css(selectors::MENU_HOVER)),
        Step::click(selectors::menu_entry(label)),
    ]
}

fn wait_modal_frame() -> Step {
    Step::wait_present(css(selectors::MODAL_FRAME))
}

fn field_equals(name: &str, value: &str, description: &str) -> Step {
    Step::assert(
        Check::FieldEquals {
            name: name.to_string(),
            value: value.to_string(),
        },
        description,
    )
}

fn title_unchanged() -> Step {
    Step::assert(
        Check::TitleMatches(SECOND_PAGE_TITLE.to_string()),
        "Title is still the same",
    )
}

/// Put the original title back so teardown finds the page
fn restore_title(title: &str) -> Step {
    let mut steps = open_page_menu_entry("Page settings");
    steps.push(wait_modal_frame());
    steps.push(Step::in_frame(
        0,
        vec![
            Step::wait_visible(css(selectors::PAGE_FORM)),
            Step::fill(css(selectors::PAGE_FORM), [("title", title)], false),
        ],
    ));
    steps.push(Step::click(selectors::modal_button("Save and continue editing")));
    steps.push(Step::wait_visible(css(selectors::MESSAGES)));
    Step::group("restore_title", steps)
}
