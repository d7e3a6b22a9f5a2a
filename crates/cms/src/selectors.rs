//! Toolbar, modal and admin selectors of the CMS frontend

use pagectl_runner::Target;

/// Toolbar once edit mode is active
pub const TOOLBAR_EXPANDED: &str = ".cms-toolbar-expanded";

/// The "Page" entry of the toolbar navigation
pub const PAGE_MENU: &str = ".cms-toolbar-item-navigation > li:nth-child(2) > a";

/// Present while a toolbar dropdown is open
pub const MENU_HOVER: &str = ".cms-toolbar-item-navigation-hover";

pub const MODAL_OPEN: &str = ".cms-modal-open";
pub const MODAL_FRAME: &str = ".cms-modal-frame iframe";
pub const MODAL_SUBMIT: &str = ".cms-modal-item-buttons .cms-btn-action";
pub const MODAL_DELETE: &str = ".cms-modal-buttons .deletelink";
pub const MESSAGES: &str = ".cms-messages-inner";

/// Page settings form rendered inside the modal frame and on admin pages
pub const PAGE_FORM: &str = "#page_form";

pub const LOGIN_FORM: &str = "#login-form";
pub const ADMIN_USER_TOOLS: &str = "#user-tools";
pub const ADMIN_CONTENT: &str = "#content";
pub const ADMIN_SUCCESS: &str = ".messagelist .success";
pub const ADMIN_SAVE: &str = "input[name='_save']";
pub const ADMIN_CONFIRM_DELETE: &str = "#content form input[type='submit']";

pub fn css(selector: &str) -> Target {
    Target::css(selector)
}

/// Quote a string for use inside an XPath expression
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{}\"", value)
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let parts: Vec<String> = value.split('"').map(|p| format!("\"{}\"", p)).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Toolbar dropdown entry by its label
pub fn menu_entry(label: &str) -> Target {
    Target::xpath(format!(
        "//a[.//span[text()[contains(.,{})]]]",
        xpath_literal(label)
    ))
}

/// Modal footer button by its label
pub fn modal_button(label: &str) -> Target {
    Target::xpath(format!(
        "//a[contains(@class, \"cms-btn\")][text()[contains(.,{})]]",
        xpath_literal(label)
    ))
}

/// Delete link of the page tree row showing `title`
pub fn tree_delete_link(title: &str) -> Target {
    Target::xpath(format!(
        "//*[contains(@class, \"cms-tree-item\")][.//*[normalize-space(text())={}]]//a[contains(@href, \"/delete/\")]",
        xpath_literal(title)
    ))
}
