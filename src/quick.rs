//! Quick actions: small parameterized forms that expand into action batches.

use std::collections::HashMap;

use crate::ids::IdGenerator;
use crate::types::{ActionType, FormAction, SelectorType};

pub type FieldValues = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Url,
    Email,
    Password,
    Textarea,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub placeholder: &'static str,
    pub required: bool,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    placeholder: &'static str,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        placeholder,
        required,
    }
}

pub struct QuickAction {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub fields: &'static [FieldSpec],
    generate: fn(&FieldValues, &mut dyn IdGenerator) -> Vec<FormAction>,
}

impl QuickAction {
    /// Labels of required fields that are absent or blank.
    pub fn missing_fields(&self, values: &FieldValues) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required && value(values, f.name).is_none())
            .map(|f| f.label)
            .collect()
    }

    /// Expand `values` into actions. Required fields are assumed checked by the caller.
    pub fn generate(&self, values: &FieldValues, ids: &mut dyn IdGenerator) -> Vec<FormAction> {
        (self.generate)(values, ids)
    }
}

pub fn all() -> &'static [QuickAction] {
    &QUICK_ACTIONS
}

pub fn find(id: &str) -> Option<&'static QuickAction> {
    QUICK_ACTIONS.iter().find(|q| q.id == id)
}

static QUICK_ACTIONS: [QuickAction; 4] = [
    QuickAction {
        id: "quick_login",
        name: "快速登录",
        description: "快速创建登录表单自动化",
        category: "表单操作",
        fields: &[
            field("url", "登录页面URL", FieldKind::Url, "https://example.com/login", true),
            field("username", "用户名", FieldKind::Text, "输入用户名", true),
            field("password", "密码", FieldKind::Password, "输入密码", true),
            field("username_selector", "用户名选择器", FieldKind::Text, "input[name=\"username\"]", false),
            field("password_selector", "密码选择器", FieldKind::Text, "input[name=\"password\"]", false),
            field("submit_selector", "提交按钮选择器", FieldKind::Text, "button[type=\"submit\"]", false),
        ],
        generate: login,
    },
    QuickAction {
        id: "quick_contact",
        name: "联系表单",
        description: "快速创建联系表单自动化",
        category: "表单操作",
        fields: &[
            field("url", "表单页面URL", FieldKind::Url, "https://example.com/contact", true),
            field("name", "姓名", FieldKind::Text, "输入姓名", true),
            field("email", "邮箱", FieldKind::Email, "example@email.com", true),
            field("phone", "电话", FieldKind::Text, "输入电话号码", false),
            field("message", "留言", FieldKind::Textarea, "输入留言内容", true),
        ],
        generate: contact,
    },
    QuickAction {
        id: "quick_search",
        name: "搜索操作",
        description: "在网站上执行搜索操作",
        category: "页面操作",
        fields: &[
            field("url", "搜索页面URL", FieldKind::Url, "https://example.com", true),
            field("search_term", "搜索关键词", FieldKind::Text, "输入搜索内容", true),
            field("search_selector", "搜索框选择器", FieldKind::Text, "input[name=\"search\"]", false),
            field("submit_selector", "搜索按钮选择器", FieldKind::Text, "button[type=\"submit\"]", false),
        ],
        generate: search,
    },
    QuickAction {
        id: "quick_navigate",
        name: "页面导航",
        description: "导航到指定页面并截图",
        category: "页面操作",
        fields: &[
            field("url", "目标页面URL", FieldKind::Url, "https://example.com", true),
            field("wait_time", "等待时间(秒)", FieldKind::Text, "3", false),
            field("screenshot_name", "截图文件名", FieldKind::Text, "page_screenshot.png", false),
        ],
        generate: navigate,
    },
];

fn value<'a>(values: &'a FieldValues, name: &str) -> Option<&'a str> {
    values
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn or<'a>(values: &'a FieldValues, name: &str, fallback: &'a str) -> &'a str {
    value(values, name).unwrap_or(fallback)
}

struct Step {
    prefix: &'static str,
    action_type: ActionType,
    selector: Option<String>,
    input: Option<String>,
    description: &'static str,
    wait_time: u32,
    retry_count: u32,
    timeout: u32,
}

impl Step {
    fn build(self, ids: &mut dyn IdGenerator) -> FormAction {
        FormAction {
            id: ids.next_id(self.prefix),
            action_type: self.action_type,
            selector_type: self.selector.as_ref().map(|_| SelectorType::Css),
            selector_value: self.selector,
            input_value: self.input,
            wait_time: Some(self.wait_time),
            description: Some(self.description.to_string()),
            retry_count: Some(self.retry_count),
            timeout: Some(self.timeout),
        }
    }
}

fn fill(prefix: &'static str, selector: &str, input: &str, description: &'static str) -> Step {
    Step {
        prefix,
        action_type: ActionType::FillInput,
        selector: Some(selector.to_string()),
        input: Some(input.to_string()),
        description,
        wait_time: 1,
        retry_count: 3,
        timeout: 10,
    }
}

fn screenshot(prefix: &'static str, file: &str, description: &'static str) -> Step {
    Step {
        prefix,
        action_type: ActionType::Screenshot,
        selector: None,
        input: Some(file.to_string()),
        description,
        wait_time: 1,
        retry_count: 1,
        timeout: 5,
    }
}

fn login(values: &FieldValues, ids: &mut dyn IdGenerator) -> Vec<FormAction> {
    let steps = [
        fill(
            "fill_username",
            or(values, "username_selector", r#"input[name="username"]"#),
            or(values, "username", ""),
            "填写用户名",
        ),
        fill(
            "fill_password",
            or(values, "password_selector", r#"input[name="password"]"#),
            or(values, "password", ""),
            "填写密码",
        ),
        Step {
            prefix: "click_submit",
            action_type: ActionType::ClickButton,
            selector: Some(or(values, "submit_selector", r#"button[type="submit"]"#).to_string()),
            input: None,
            description: "点击登录按钮",
            wait_time: 3,
            retry_count: 3,
            timeout: 10,
        },
    ];
    steps.into_iter().map(|s| s.build(ids)).collect()
}

fn contact(values: &FieldValues, ids: &mut dyn IdGenerator) -> Vec<FormAction> {
    let mut steps = vec![
        fill("fill_name", r#"input[name="name"]"#, or(values, "name", ""), "填写姓名"),
        fill("fill_email", r#"input[name="email"]"#, or(values, "email", ""), "填写邮箱"),
    ];
    if let Some(phone) = value(values, "phone") {
        steps.push(fill("fill_phone", r#"input[name="phone"]"#, phone, "填写电话"));
    }
    steps.push(fill(
        "fill_message",
        r#"textarea[name="message"]"#,
        or(values, "message", ""),
        "填写留言",
    ));
    steps.push(Step {
        prefix: "submit_form",
        action_type: ActionType::SubmitForm,
        selector: Some("form".to_string()),
        input: None,
        description: "提交表单",
        wait_time: 3,
        retry_count: 3,
        timeout: 15,
    });
    steps.into_iter().map(|s| s.build(ids)).collect()
}

fn search(values: &FieldValues, ids: &mut dyn IdGenerator) -> Vec<FormAction> {
    let steps = [
        fill(
            "fill_search",
            or(values, "search_selector", r#"input[name="search"]"#),
            or(values, "search_term", ""),
            "填写搜索关键词",
        ),
        Step {
            prefix: "click_search",
            action_type: ActionType::ClickButton,
            selector: Some(or(values, "submit_selector", r#"button[type="submit"]"#).to_string()),
            input: None,
            description: "点击搜索按钮",
            wait_time: 3,
            retry_count: 3,
            timeout: 10,
        },
        screenshot("screenshot_results", "search_results.png", "截图保存搜索结果"),
    ];
    steps.into_iter().map(|s| s.build(ids)).collect()
}

fn navigate(values: &FieldValues, ids: &mut dyn IdGenerator) -> Vec<FormAction> {
    let wait_time = value(values, "wait_time")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(3);
    let mut steps = vec![Step {
        prefix: "navigate",
        action_type: ActionType::Navigate,
        selector: None,
        input: Some(or(values, "url", "").to_string()),
        description: "导航到目标页面",
        wait_time,
        retry_count: 3,
        timeout: 15,
    }];
    if let Some(name) = value(values, "screenshot_name") {
        steps.push(screenshot("screenshot", name, "截图保存页面"));
    }
    steps.into_iter().map(|s| s.build(ids)).collect()
}
