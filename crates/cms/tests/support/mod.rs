//! In-memory CMS frontend and admin that answers the page-control selectors

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use pagectl_cms::selectors::{self, css};
use pagectl_runner::{BrowserDriver, DriverError, DriverResult, Target};

pub const BASE: &str = "http://cms.test/en/";
const USERNAME: &str = "admin";
const PASSWORD: &str = "admin";

#[derive(Debug, Clone)]
pub struct Page {
    pub id: usize,
    pub title: String,
    pub overwrite_url: String,
}

impl Page {
    fn url(&self) -> String {
        if self.overwrite_url.is_empty() {
            format!("{}{}/", BASE, self.title.to_lowercase())
        } else {
            format!("{}{}/", BASE, self.overwrite_url.trim_matches('/'))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum View {
    Blank,
    Login,
    AdminIndex,
    AddForm,
    Changelist,
    DeleteConfirm(String),
    LoggedOut,
    /// Frontend page, `None` when nothing is published at the URL
    Frontend(Option<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modal {
    Settings,
    Advanced,
    Delete,
}

#[derive(Default)]
pub struct State {
    pub calls: Vec<String>,
    pub pages: Vec<Page>,
    pub logged_in: bool,
    pub edit_mode: bool,
    pub url: String,
    view: Option<View>,
    menu_open: bool,
    modal: Option<Modal>,
    /// values shown by the form of the open modal or the admin add form
    form: BTreeMap<String, String>,
    frame_depth: usize,
    admin_message: Option<String>,
    cms_message: Option<String>,
    next_id: usize,
}

impl State {
    fn view(&self) -> View {
        self.view.clone().unwrap_or(View::Blank)
    }

    fn page(&self, id: usize) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    fn page_mut(&mut self, id: usize) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    fn current_page(&self) -> Option<usize> {
        match self.view() {
            View::Frontend(Some(id)) if self.page(id).is_some() => Some(id),
            _ => None,
        }
    }

    fn admin_view(&self) -> bool {
        matches!(
            self.view(),
            View::AdminIndex | View::AddForm | View::Changelist | View::DeleteConfirm(_)
        )
    }

    fn settings_modal(&self) -> bool {
        matches!(self.modal, Some(Modal::Settings) | Some(Modal::Advanced))
    }

    fn title(&self) -> String {
        match self.view() {
            View::Frontend(Some(id)) => self
                .page(id)
                .map(|p| p.title.clone())
                .unwrap_or_else(|| "Page not found".to_string()),
            View::Frontend(None) => "Page not found".to_string(),
            View::Login => "Log in | Django site admin".to_string(),
            View::Blank => String::new(),
            _ => "Site administration | Django site admin".to_string(),
        }
    }

    fn load(&mut self, url: &str) {
        self.url = url.to_string();
        self.menu_open = false;
        self.modal = None;
        self.frame_depth = 0;
        self.admin_message = None;
        self.cms_message = None;
        self.form.clear();

        let admin = format!("{}admin/", BASE);
        let view = if let Some(path) = url.strip_prefix(&admin) {
            match path {
                "login/" => View::Login,
                "logout/" => {
                    self.logged_in = false;
                    self.edit_mode = false;
                    View::LoggedOut
                }
                _ if !self.logged_in => View::Login,
                "cms/page/add/" => View::AddForm,
                "cms/page/" => View::Changelist,
                _ => View::AdminIndex,
            }
        } else if let Some(rest) = url.strip_prefix(BASE) {
            let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
            if query == "edit" && self.logged_in {
                self.edit_mode = true;
            }
            if path.is_empty() {
                View::Frontend(self.pages.first().map(|p| p.id))
            } else {
                let wanted = format!("{}{}", BASE, path);
                View::Frontend(self.pages.iter().find(|p| p.url() == wanted).map(|p| p.id))
            }
        } else {
            View::Blank
        };
        self.view = Some(view);
    }

    fn is_shown(&self, target: &Target) -> bool {
        let view = self.view();
        let top = self.frame_depth == 0;
        let frontend = matches!(view, View::Frontend(_));

        if *target == css(selectors::LOGIN_FORM) {
            top && view == View::Login
        } else if *target == css(selectors::ADMIN_USER_TOOLS) {
            self.logged_in && self.admin_view()
        } else if *target == css(selectors::ADMIN_CONTENT) {
            self.admin_view() || matches!(view, View::Login | View::LoggedOut)
        } else if *target == css(selectors::PAGE_FORM) {
            (top && view == View::AddForm) || (!top && self.settings_modal())
        } else if *target == css(selectors::ADMIN_SAVE) {
            top && view == View::AddForm
        } else if *target == css(selectors::ADMIN_SUCCESS) {
            top && self.admin_message.is_some()
        } else if *target == css(selectors::ADMIN_CONFIRM_DELETE) {
            top && matches!(view, View::DeleteConfirm(_))
        } else if *target == css(selectors::TOOLBAR_EXPANDED) || *target == css(selectors::PAGE_MENU)
        {
            top && frontend && self.edit_mode
        } else if *target == css(selectors::MENU_HOVER) {
            top && self.menu_open
        } else if *target == css(selectors::MODAL_FRAME) || *target == css(selectors::MODAL_SUBMIT) {
            top && self.settings_modal()
        } else if *target == css(selectors::MODAL_OPEN) {
            top && self.modal.is_some()
        } else if *target == css(selectors::MODAL_DELETE) {
            top && self.modal == Some(Modal::Delete)
        } else if *target == css(selectors::MESSAGES) {
            top && self.cms_message.is_some()
        } else if *target == selectors::modal_button("Save and continue editing")
            || *target == selectors::modal_button("Advanced Settings")
        {
            top && self.modal == Some(Modal::Settings)
        } else if ["Page settings", "Advanced settings", "Delete page"]
            .iter()
            .any(|label| *target == selectors::menu_entry(label))
        {
            top && self.menu_open
        } else if view == View::Changelist && top {
            self.pages
                .iter()
                .any(|p| *target == selectors::tree_delete_link(&p.title))
        } else {
            false
        }
    }

    fn open_modal(&mut self, modal: Modal) -> DriverResult<()> {
        let id = self
            .current_page()
            .ok_or_else(|| DriverError::Failed("no page to edit".to_string()))?;
        let page = self.page(id).cloned().ok_or(DriverError::Closed)?;
        self.menu_open = false;
        self.modal = Some(modal);
        self.form.clear();
        match modal {
            Modal::Settings => {
                self.form.insert("title".to_string(), page.title);
            }
            Modal::Advanced => {
                self.form.insert("overwrite_url".to_string(), page.overwrite_url);
            }
            Modal::Delete => {}
        }
        Ok(())
    }

    fn save_settings(&mut self) -> DriverResult<()> {
        let id = self
            .current_page()
            .ok_or_else(|| DriverError::Failed("no page to save".to_string()))?;
        let form = self.form.clone();
        let page = self.page_mut(id).ok_or(DriverError::Closed)?;
        let old_title = page.title.clone();
        if let Some(title) = form.get("title") {
            page.title = title.clone();
        }
        if let Some(url) = form.get("overwrite_url") {
            page.overwrite_url = url.trim_start_matches('/').to_string();
        }
        self.cms_message = Some(format!(
            "The page \"{}\" was changed successfully. You may edit it again below.",
            old_title
        ));
        Ok(())
    }

    fn click(&mut self, target: &Target) -> DriverResult<()> {
        if !self.is_shown(target) {
            return Err(DriverError::NotFound(target.to_string()));
        }

        if *target == css(selectors::ADMIN_SAVE) {
            let title = self.form.get("title").cloned().unwrap_or_default();
            self.next_id += 1;
            self.pages.push(Page {
                id: self.next_id,
                title: title.clone(),
                overwrite_url: String::new(),
            });
            self.view = Some(View::AdminIndex);
            self.admin_message = Some(format!("The page \"{}\" was added successfully.", title));
        } else if *target == css(selectors::ADMIN_CONFIRM_DELETE) {
            if let View::DeleteConfirm(title) = self.view() {
                self.pages.retain(|p| p.title != title);
                self.view = Some(View::Changelist);
                self.admin_message = Some(format!("The page \"{}\" was deleted successfully.", title));
            }
        } else if *target == css(selectors::PAGE_MENU) {
            self.menu_open = true;
        } else if *target == selectors::menu_entry("Page settings") {
            self.open_modal(Modal::Settings)?;
        } else if *target == selectors::menu_entry("Advanced settings")
            || *target == selectors::modal_button("Advanced Settings")
        {
            self.open_modal(Modal::Advanced)?;
        } else if *target == selectors::menu_entry("Delete page") {
            self.open_modal(Modal::Delete)?;
        } else if *target == selectors::modal_button("Save and continue editing") {
            self.save_settings()?;
            let renamed = self.current_page().and_then(|id| self.page(id)).cloned();
            if let Some(page) = renamed {
                self.form.insert("title".to_string(), page.title);
            }
        } else if *target == css(selectors::MODAL_SUBMIT) {
            self.save_settings()?;
            let url = self
                .current_page()
                .and_then(|id| self.page(id))
                .map(Page::url)
                .unwrap_or_else(|| BASE.to_string());
            self.load(&url);
        } else if *target == css(selectors::MODAL_DELETE) {
            if let Some(id) = self.current_page() {
                self.pages.retain(|p| p.id != id);
            }
            self.load(BASE);
        } else if self.view() == View::Changelist {
            let title = self
                .pages
                .iter()
                .find(|p| *target == selectors::tree_delete_link(&p.title))
                .map(|p| p.title.clone())
                .ok_or_else(|| DriverError::NotFound(target.to_string()))?;
            self.view = Some(View::DeleteConfirm(title));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct SimulatedCms {
    state: Arc<Mutex<State>>,
}

impl SimulatedCms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, State> {
        self.state.lock()
    }

    pub fn page_titles(&self) -> Vec<String> {
        self.state.lock().pages.iter().map(|p| p.title.clone()).collect()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl BrowserDriver for SimulatedCms {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> DriverResult<()> {
        self.record(format!("navigate {}", url));
        self.state.lock().load(url);
        Ok(())
    }

    async fn reload(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.record("reload".to_string());
        let mut state = self.state.lock();
        let url = state.current_page().and_then(|id| state.page(id)).map(Page::url);
        let url = url.unwrap_or_else(|| state.url.clone());
        state.load(&url);
        Ok(())
    }

    async fn is_visible(&mut self, target: &Target) -> DriverResult<bool> {
        Ok(self.state.lock().is_shown(target))
    }

    async fn is_present(&mut self, target: &Target) -> DriverResult<bool> {
        Ok(self.state.lock().is_shown(target))
    }

    async fn click(&mut self, target: &Target) -> DriverResult<()> {
        self.record(format!("click {}", target));
        self.state.lock().click(target)
    }

    async fn fill_form(
        &mut self,
        form: &Target,
        fields: &BTreeMap<String, String>,
        submit: bool,
    ) -> DriverResult<()> {
        self.record(format!("fill {}", form));
        let mut state = self.state.lock();
        if !state.is_shown(form) {
            return Err(DriverError::NotFound(form.to_string()));
        }

        if *form == css(selectors::LOGIN_FORM) {
            let ok = fields.get("username").map(String::as_str) == Some(USERNAME)
                && fields.get("password").map(String::as_str) == Some(PASSWORD);
            if submit && ok {
                state.logged_in = true;
                state.view = Some(View::AdminIndex);
            }
            return Ok(());
        }

        for (name, value) in fields {
            state.form.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn enter_frame(&mut self, index: usize) -> DriverResult<()> {
        self.record(format!("enter_frame {}", index));
        let mut state = self.state.lock();
        if index != 0 || state.frame_depth > 0 || !state.settings_modal() {
            return Err(DriverError::NotFound(format!("frame {}", index)));
        }
        state.frame_depth = 1;
        Ok(())
    }

    async fn exit_frame(&mut self) -> DriverResult<()> {
        self.record("exit_frame".to_string());
        let mut state = self.state.lock();
        state.frame_depth = state.frame_depth.saturating_sub(1);
        Ok(())
    }

    async fn reset_frames(&mut self) -> DriverResult<()> {
        self.state.lock().frame_depth = 0;
        Ok(())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn current_title(&mut self) -> DriverResult<String> {
        Ok(self.state.lock().title())
    }

    async fn text_of(&mut self, target: &Target) -> DriverResult<String> {
        let state = self.state.lock();
        if *target == css(selectors::MESSAGES) {
            if let Some(message) = &state.cms_message {
                return Ok(message.clone());
            }
        }
        Err(DriverError::NotFound(target.to_string()))
    }

    async fn field_value(&mut self, name: &str) -> DriverResult<String> {
        let state = self.state.lock();
        let form_shown = state.frame_depth > 0 || state.view() == View::AddForm;
        state
            .form
            .get(name)
            .filter(|_| form_shown)
            .cloned()
            .ok_or_else(|| DriverError::NotFound(name.to_string()))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.record("close".to_string());
        Ok(())
    }
}
