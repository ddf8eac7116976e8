use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The closed vocabulary of browser steps an action list can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    FillInput,
    ClickButton,
    SelectOption,
    UploadFile,
    Navigate,
    Wait,
    Screenshot,
    Scroll,
    Hover,
    SubmitForm,
}

impl ActionType {
    pub const ALL: [ActionType; 10] = [
        ActionType::FillInput,
        ActionType::ClickButton,
        ActionType::SelectOption,
        ActionType::UploadFile,
        ActionType::Navigate,
        ActionType::Wait,
        ActionType::Screenshot,
        ActionType::Scroll,
        ActionType::Hover,
        ActionType::SubmitForm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::FillInput => "fill_input",
            ActionType::ClickButton => "click_button",
            ActionType::SelectOption => "select_option",
            ActionType::UploadFile => "upload_file",
            ActionType::Navigate => "navigate",
            ActionType::Wait => "wait",
            ActionType::Screenshot => "screenshot",
            ActionType::Scroll => "scroll",
            ActionType::Hover => "hover",
            ActionType::SubmitForm => "submit_form",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ActionType::FillInput => "填写输入框",
            ActionType::ClickButton => "点击按钮",
            ActionType::SelectOption => "选择选项",
            ActionType::UploadFile => "上传文件",
            ActionType::Navigate => "页面导航",
            ActionType::Wait => "等待",
            ActionType::Screenshot => "截图",
            ActionType::Scroll => "滚动",
            ActionType::Hover => "悬停",
            ActionType::SubmitForm => "提交表单",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ActionType::FillInput => "📝",
            ActionType::ClickButton => "👆",
            ActionType::SelectOption => "📋",
            ActionType::UploadFile => "📁",
            ActionType::Navigate => "🧭",
            ActionType::Wait => "⏱️",
            ActionType::Screenshot => "📸",
            ActionType::Scroll => "📜",
            ActionType::Hover => "👋",
            ActionType::SubmitForm => "✅",
        }
    }

    /// Whether the step locates a page element through a selector.
    pub fn targets_element(self) -> bool {
        !matches!(
            self,
            ActionType::Navigate | ActionType::Wait | ActionType::Screenshot
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown action type '{}'", s))
    }
}

/// Locator strategy used to interpret `selector_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorType {
    Id,
    Name,
    Class,
    Css,
    Xpath,
    Tag,
    LinkText,
    PartialLinkText,
}

impl SelectorType {
    pub const ALL: [SelectorType; 8] = [
        SelectorType::Id,
        SelectorType::Name,
        SelectorType::Class,
        SelectorType::Css,
        SelectorType::Xpath,
        SelectorType::Tag,
        SelectorType::LinkText,
        SelectorType::PartialLinkText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SelectorType::Id => "id",
            SelectorType::Name => "name",
            SelectorType::Class => "class",
            SelectorType::Css => "css",
            SelectorType::Xpath => "xpath",
            SelectorType::Tag => "tag",
            SelectorType::LinkText => "link_text",
            SelectorType::PartialLinkText => "partial_link_text",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SelectorType::Id => "ID选择器",
            SelectorType::Name => "Name属性",
            SelectorType::Class => "Class选择器",
            SelectorType::Css => "CSS选择器",
            SelectorType::Xpath => "XPath选择器",
            SelectorType::Tag => "标签选择器",
            SelectorType::LinkText => "链接文本",
            SelectorType::PartialLinkText => "部分链接文本",
        }
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SelectorType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown selector type '{}'", s))
    }
}

/// One browser-automation step.
///
/// `retry_count` and `timeout` are carried to the execution backend untouched;
/// nothing in this crate interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAction {
    pub id: String,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_type: Option<SelectorType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

impl FormAction {
    /// A bare action with only an id and a type set.
    pub fn new(id: impl Into<String>, action_type: ActionType) -> Self {
        Self {
            id: id.into(),
            action_type,
            selector_type: None,
            selector_value: None,
            input_value: None,
            wait_time: None,
            description: None,
            retry_count: None,
            timeout: None,
        }
    }

    /// Problems that would make the backend reject this step.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.action_type.targets_element() {
            let selector = self.selector_value.as_deref().unwrap_or("").trim();
            if selector.is_empty() {
                problems.push(format!(
                    "{} ({}) is missing a selector",
                    self.id, self.action_type
                ));
            }
        }
        if self.action_type == ActionType::Navigate
            && self.input_value.as_deref().unwrap_or("").trim().is_empty()
        {
            problems.push(format!("{} (navigate) is missing a target URL", self.id));
        }
        problems
    }
}

/// A partial update merged into an existing action.
///
/// Outer `None` leaves a field as is. For optional fields `Some(None)` clears
/// it; in JSON that is an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub selector_type: Option<Option<SelectorType>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub selector_value: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub input_value: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<Option<u32>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<Option<u32>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Option<u32>>,
}

/// A key that appears in the input, even as `null`, becomes `Some(_)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn merge<T: Clone>(field: &mut Option<T>, patch: &Option<Option<T>>) {
    if let Some(value) = patch {
        *field = value.clone();
    }
}

impl ActionPatch {
    pub fn description(text: impl Into<String>) -> Self {
        Self {
            description: Some(Some(text.into())),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ActionPatch::default()
    }

    pub fn apply(&self, action: &mut FormAction) {
        if let Some(t) = self.action_type {
            action.action_type = t;
        }
        merge(&mut action.selector_type, &self.selector_type);
        merge(&mut action.selector_value, &self.selector_value);
        merge(&mut action.input_value, &self.input_value);
        merge(&mut action.wait_time, &self.wait_time);
        merge(&mut action.description, &self.description);
        merge(&mut action.retry_count, &self.retry_count);
        merge(&mut action.timeout, &self.timeout);
    }
}

/// One automation run definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub url: String,
    #[serde(default)]
    pub actions: Vec<FormAction>,
    #[serde(default = "default_global_timeout")]
    pub global_timeout: u32,
    #[serde(default = "default_true")]
    pub screenshot_on_error: bool,
    #[serde(default = "default_true")]
    pub headless: bool,
}

fn default_global_timeout() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            actions: Vec::new(),
            global_timeout: default_global_timeout(),
            screenshot_on_error: true,
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserbaseConfig {
    pub api_key: String,
    pub project_id: String,
}

/// Body sent to the execution backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub browserbase_config: BrowserbaseConfig,
    pub automation_config: AutomationConfig,
}

impl ExecuteRequest {
    /// Presence checks done before anything leaves the process.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.browserbase_config.api_key.trim().is_empty() {
            missing.push("api_key");
        }
        if self.browserbase_config.project_id.trim().is_empty() {
            missing.push("project_id");
        }
        if self.automation_config.url.trim().is_empty() {
            missing.push("url");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }
}

/// Outcome of one execution request. Fields the backend adds beyond the
/// known ones are kept in `extra` so the result can be echoed unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
