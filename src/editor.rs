use tracing::debug;

use crate::error::SessionError;
use crate::ids::{IdGenerator, RandomIds};
use crate::types::{
    ActionPatch, ActionType, AutomationConfig, BrowserbaseConfig, ExecuteRequest,
    ExecutionResult, FormAction, SelectorType,
};

/// Everything one editing session owns: the run definition, credentials,
/// the selected action and the state of the single outstanding execution.
pub struct Session {
    pub config: AutomationConfig,
    pub browserbase: BrowserbaseConfig,
    selected: Option<String>,
    executing: bool,
    last_result: Option<ExecutionResult>,
    ids: Box<dyn IdGenerator>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_ids(Box::new(RandomIds::new()))
    }

    pub fn with_ids(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            config: AutomationConfig::default(),
            browserbase: BrowserbaseConfig::default(),
            selected: None,
            executing: false,
            last_result: None,
            ids,
        }
    }

    pub fn actions(&self) -> &[FormAction] {
        &self.config.actions
    }

    /// The selected action as it currently sits in the list.
    pub fn selected(&self) -> Option<&FormAction> {
        let id = self.selected.as_deref()?;
        self.config.actions.iter().find(|a| a.id == id)
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.config.actions.iter().any(|a| a.id == id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Append a fresh action of `action_type` and select it.
    pub fn add(&mut self, action_type: ActionType) -> &FormAction {
        let id = self.fresh_id("action");
        let action = FormAction {
            id: id.clone(),
            action_type,
            selector_type: Some(SelectorType::Id),
            selector_value: Some(String::new()),
            input_value: Some(String::new()),
            wait_time: (action_type == ActionType::Wait).then_some(3),
            description: Some(String::new()),
            retry_count: Some(3),
            timeout: Some(30),
        };
        debug!(id = %id, action_type = %action_type, "action added");
        self.config.actions.push(action);
        self.selected = Some(id);
        let last = self.config.actions.len() - 1;
        &self.config.actions[last]
    }

    /// Merge `patch` into the action with `id`. Returns false when no action matches.
    pub fn update(&mut self, id: &str, patch: &ActionPatch) -> bool {
        match self.config.actions.iter_mut().find(|a| a.id == id) {
            Some(action) => {
                patch.apply(action);
                debug!(id, "action updated");
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> Option<FormAction> {
        let index = self.config.actions.iter().position(|a| a.id == id)?;
        let removed = self.config.actions.remove(index);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        debug!(id, "action deleted");
        Some(removed)
    }

    /// Drag-and-drop move. A drop with no destination changes nothing.
    pub fn reorder(&mut self, from: usize, to: Option<usize>) {
        let Some(to) = to else { return };
        let actions = std::mem::take(&mut self.config.actions);
        self.config.actions = reorder(actions, from, to);
    }

    /// Append a generated batch, optionally retargeting the run's URL.
    /// Actions whose ids already exist in the list get new ones.
    pub fn append_actions(&mut self, batch: Vec<FormAction>, url: Option<&str>) {
        for mut action in batch {
            if self.contains(&action.id) {
                action.id = self.fresh_id(action.action_type.as_str());
            }
            self.config.actions.push(action);
        }
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.config.url = url.to_string();
        }
    }

    /// Replace the run definition wholesale, e.g. from a template.
    pub fn apply_template(&mut self, config: AutomationConfig) {
        self.config = config;
        self.selected = None;
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    /// Validate and snapshot the request, marking the session as executing.
    pub fn begin_execution(&mut self) -> Result<ExecuteRequest, SessionError> {
        if self.executing {
            return Err(SessionError::AlreadyExecuting);
        }
        let request = self.request();
        request.validate()?;
        self.executing = true;
        self.last_result = None;
        Ok(request)
    }

    pub fn finish_execution(&mut self, result: ExecutionResult) {
        self.executing = false;
        self.last_result = Some(result);
    }

    pub fn request(&self) -> ExecuteRequest {
        ExecuteRequest {
            browserbase_config: self.browserbase.clone(),
            automation_config: self.config.clone(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.config.actions.iter().any(|a| a.id == id)
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        loop {
            let id = self.ids.next_id(prefix);
            if !self.contains(&id) {
                return id;
            }
        }
    }
}

/// Remove the element at `from` and reinsert it at `to`.
/// Out-of-range indices leave the list as it was.
pub fn reorder<T>(mut items: Vec<T>, from: usize, to: usize) -> Vec<T> {
    if from >= items.len() || to >= items.len() {
        return items;
    }
    let item = items.remove(from);
    items.insert(to, item);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use std::collections::HashSet;

    fn session() -> Session {
        Session::with_ids(Box::new(SequentialIds::new()))
    }

    fn ids(session: &Session) -> Vec<String> {
        session.actions().iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn add_sets_defaults_and_selects() {
        let mut s = session();
        let id = s.add(ActionType::Wait).id.clone();
        let action = s.selected().unwrap();
        assert_eq!(action.id, id);
        assert_eq!(action.wait_time, Some(3));
        assert_eq!(action.retry_count, Some(3));
        assert_eq!(action.timeout, Some(30));

        s.add(ActionType::ClickButton);
        let click = s.selected().unwrap();
        assert_eq!(click.wait_time, None);
        assert_eq!(click.selector_type, Some(SelectorType::Id));
    }

    #[test]
    fn ids_stay_unique_across_adds_and_deletes() {
        let mut s = session();
        for round in 0..20 {
            s.add(ActionType::FillInput);
            s.add(ActionType::Hover);
            if round % 3 == 0 {
                let first = s.actions()[0].id.clone();
                s.delete(&first);
            }
        }
        let all = ids(&s);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn update_touches_only_description() {
        let mut s = session();
        s.add(ActionType::FillInput);
        let target = s.add(ActionType::ClickButton).id.clone();
        s.add(ActionType::Screenshot);
        let before = s.actions().to_vec();

        assert!(s.update(&target, &ActionPatch::description("x")));

        for (old, new) in before.iter().zip(s.actions()) {
            if old.id == target {
                let mut expected = old.clone();
                expected.description = Some("x".into());
                assert_eq!(*new, expected);
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn update_missing_id_is_noop() {
        let mut s = session();
        s.add(ActionType::Scroll);
        let before = s.actions().to_vec();
        assert!(!s.update("nope", &ActionPatch::description("x")));
        assert_eq!(s.actions(), before.as_slice());
    }

    #[test]
    fn selection_reflects_updates() {
        let mut s = session();
        let id = s.add(ActionType::FillInput).id.clone();
        let patch = ActionPatch {
            input_value: Some(Some("hello".into())),
            ..Default::default()
        };
        s.update(&id, &patch);
        assert_eq!(s.selected().unwrap().input_value.as_deref(), Some("hello"));
    }

    #[test]
    fn delete_clears_selection_only_when_selected() {
        let mut s = session();
        let first = s.add(ActionType::FillInput).id.clone();
        let second = s.add(ActionType::ClickButton).id.clone();
        assert_eq!(s.selected().unwrap().id, second);

        s.delete(&first);
        assert_eq!(s.selected().unwrap().id, second);

        s.delete(&second);
        assert!(s.selected().is_none());
    }

    #[test]
    fn delete_preserves_order() {
        let mut s = session();
        for _ in 0..4 {
            s.add(ActionType::Hover);
        }
        let mut expected = ids(&s);
        let removed = expected.remove(1);
        s.delete(&removed);
        assert_eq!(ids(&s), expected);
    }

    #[test]
    fn reorder_round_trips() {
        let original = vec!['a', 'b', 'c', 'd', 'e'];
        for i in 0..original.len() {
            for j in 0..original.len() {
                let moved = reorder(original.clone(), i, j);
                assert_eq!(reorder(moved, j, i), original);
            }
        }
    }

    #[test]
    fn reorder_moves_element() {
        assert_eq!(reorder(vec![1, 2, 3, 4], 0, 2), vec![2, 3, 1, 4]);
        assert_eq!(reorder(vec![1, 2, 3, 4], 3, 0), vec![4, 1, 2, 3]);
        assert_eq!(reorder(vec![1, 2, 3], 5, 0), vec![1, 2, 3]);
    }

    #[test]
    fn session_reorder_without_destination_is_noop() {
        let mut s = session();
        s.add(ActionType::FillInput);
        s.add(ActionType::ClickButton);
        let before = ids(&s);
        s.reorder(0, None);
        assert_eq!(ids(&s), before);

        s.reorder(0, Some(1));
        s.reorder(0, Some(1));
        assert_eq!(ids(&s), before);
    }

    #[test]
    fn append_reassigns_colliding_ids() {
        let mut s = session();
        let existing = s.add(ActionType::FillInput).id.clone();
        let batch = vec![
            FormAction::new(existing.clone(), ActionType::ClickButton),
            FormAction::new("other", ActionType::Screenshot),
        ];
        s.append_actions(batch, Some("https://example.com/login"));

        let all = ids(&s);
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().filter(|id| **id == existing).count(), 1);
        assert_eq!(all[2], "other");
        assert_eq!(s.config.url, "https://example.com/login");
    }

    #[test]
    fn execution_flag_blocks_resubmission() {
        let mut s = session();
        s.config.url = "https://example.com".into();
        s.browserbase = BrowserbaseConfig {
            api_key: "key".into(),
            project_id: "proj".into(),
        };
        assert!(s.begin_execution().is_ok());
        assert_eq!(s.begin_execution(), Err(SessionError::AlreadyExecuting));

        s.finish_execution(ExecutionResult::failure("boom"));
        assert!(!s.is_executing());
        assert_eq!(s.last_result().unwrap().error.as_deref(), Some("boom"));
        assert!(s.begin_execution().is_ok());
        assert!(s.last_result().is_none());
    }

    #[test]
    fn begin_execution_rejects_missing_credentials() {
        let mut s = session();
        s.config.url = "https://example.com".into();
        assert!(matches!(
            s.begin_execution(),
            Err(SessionError::Validation(_))
        ));
        assert!(!s.is_executing());
    }
}
