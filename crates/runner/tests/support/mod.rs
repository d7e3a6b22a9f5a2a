//! Scripted in-memory browser used to exercise the runner

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use pagectl_runner::{BrowserDriver, DriverError, DriverResult, Target};

#[derive(Default)]
pub struct State {
    pub calls: Vec<String>,
    pub url: String,
    pub title: String,
    /// url -> title shown after navigating there
    pub pages: HashMap<String, String>,
    /// urls whose navigation never finishes
    pub hanging: HashSet<String>,
    /// targets (display form) that exist and are visible
    pub visible: HashSet<String>,
    /// targets that become visible after this many polls
    pub visible_after: HashMap<String, usize>,
    pub texts: HashMap<String, String>,
    pub fields: HashMap<String, String>,
    /// targets whose click fails with this error
    pub broken: HashMap<String, DriverError>,
    /// number of child frames in every context
    pub child_frames: usize,
    pub frame_stack: Vec<usize>,
    pub max_frame_depth: usize,
    pub resets: usize,
    /// frame depth at the time of every click
    pub click_depths: Vec<usize>,
    pub title_error: Option<DriverError>,
    pub exit_error: Option<DriverError>,
    pub filled: Vec<BTreeMap<String, String>>,
}

#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    state: Arc<Mutex<State>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, State> {
        self.state.lock()
    }

    pub fn page(self, url: &str, title: &str) -> Self {
        self.state.lock().pages.insert(url.to_string(), title.to_string());
        self
    }

    pub fn hanging(self, url: &str) -> Self {
        self.state.lock().hanging.insert(url.to_string());
        self
    }

    pub fn visible(self, target: &Target) -> Self {
        self.state.lock().visible.insert(target.to_string());
        self
    }

    pub fn visible_after(self, target: &Target, polls: usize) -> Self {
        self.state.lock().visible_after.insert(target.to_string(), polls);
        self
    }

    pub fn text(self, target: &Target, text: &str) -> Self {
        self.state.lock().texts.insert(target.to_string(), text.to_string());
        self
    }

    pub fn field(self, name: &str, value: &str) -> Self {
        self.state.lock().fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn broken(self, target: &Target, error: DriverError) -> Self {
        self.state.lock().broken.insert(target.to_string(), error);
        self
    }

    pub fn frames(self, count: usize) -> Self {
        self.state.lock().child_frames = count;
        self
    }

    pub fn title_fails(self, error: DriverError) -> Self {
        self.state.lock().title_error = Some(error);
        self
    }

    pub fn exit_fails(self, error: DriverError) -> Self {
        self.state.lock().exit_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl BrowserDriver for ScriptedBrowser {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> DriverResult<()> {
        self.record(format!("navigate {}", url));
        let hangs = self.state.lock().hanging.contains(url);
        if hangs {
            std::future::pending::<()>().await;
        }
        let mut state = self.state.lock();
        state.url = url.to_string();
        state.title = state.pages.get(url).cloned().unwrap_or_default();
        state.frame_stack.clear();
        Ok(())
    }

    async fn reload(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.record("reload".to_string());
        self.state.lock().frame_stack.clear();
        Ok(())
    }

    async fn is_visible(&mut self, target: &Target) -> DriverResult<bool> {
        let key = target.to_string();
        self.record(format!("is_visible {}", key));
        let mut state = self.state.lock();
        if let Some(remaining) = state.visible_after.get_mut(&key) {
            if *remaining == 0 {
                return Ok(true);
            }
            *remaining -= 1;
            return Ok(false);
        }
        Ok(state.visible.contains(&key))
    }

    async fn is_present(&mut self, target: &Target) -> DriverResult<bool> {
        let key = target.to_string();
        self.record(format!("is_present {}", key));
        let state = self.state.lock();
        Ok(state.visible.contains(&key) || state.texts.contains_key(&key))
    }

    async fn click(&mut self, target: &Target) -> DriverResult<()> {
        let key = target.to_string();
        self.record(format!("click {}", key));
        let mut state = self.state.lock();
        let depth = state.frame_stack.len();
        state.click_depths.push(depth);
        if let Some(error) = state.broken.get(&key) {
            return Err(error.clone());
        }
        if !state.visible.contains(&key) {
            return Err(DriverError::NotFound(key));
        }
        Ok(())
    }

    async fn fill_form(
        &mut self,
        form: &Target,
        fields: &BTreeMap<String, String>,
        _submit: bool,
    ) -> DriverResult<()> {
        self.record(format!("fill {}", form));
        let mut state = self.state.lock();
        if !state.visible.contains(&form.to_string()) {
            return Err(DriverError::NotFound(form.to_string()));
        }
        for (name, value) in fields {
            state.fields.insert(name.clone(), value.clone());
        }
        state.filled.push(fields.clone());
        Ok(())
    }

    async fn enter_frame(&mut self, index: usize) -> DriverResult<()> {
        self.record(format!("enter_frame {}", index));
        let mut state = self.state.lock();
        if index >= state.child_frames {
            return Err(DriverError::NotFound(format!("frame {}", index)));
        }
        state.frame_stack.push(index);
        state.max_frame_depth = state.max_frame_depth.max(state.frame_stack.len());
        Ok(())
    }

    async fn exit_frame(&mut self) -> DriverResult<()> {
        self.record("exit_frame".to_string());
        let mut state = self.state.lock();
        if let Some(error) = &state.exit_error {
            return Err(error.clone());
        }
        state.frame_stack.pop();
        Ok(())
    }

    async fn reset_frames(&mut self) -> DriverResult<()> {
        self.record("reset_frames".to_string());
        let mut state = self.state.lock();
        state.frame_stack.clear();
        state.resets += 1;
        Ok(())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn current_title(&mut self) -> DriverResult<String> {
        let state = self.state.lock();
        match &state.title_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.title.clone()),
        }
    }

    async fn text_of(&mut self, target: &Target) -> DriverResult<String> {
        self.state
            .lock()
            .texts
            .get(&target.to_string())
            .cloned()
            .ok_or_else(|| DriverError::NotFound(target.to_string()))
    }

    async fn field_value(&mut self, name: &str) -> DriverResult<String> {
        self.state
            .lock()
            .fields
            .get(name)
            .cloned()
            .ok_or_else(|| DriverError::NotFound(name.to_string()))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.record("close".to_string());
        Ok(())
    }
}
