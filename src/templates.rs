//! Preset automation configs with `{{variable}}` placeholders.

use std::collections::{BTreeSet, HashMap};

use crate::types::{ActionType, AutomationConfig, FormAction, SelectorType};

pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    build: fn() -> AutomationConfig,
}

impl Template {
    /// The config with placeholders left in place.
    pub fn config(&self) -> AutomationConfig {
        (self.build)()
    }

    /// Variable names referenced by the template's input values, sorted.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for action in self.config().actions {
            if let Some(input) = action.input_value {
                names.extend(placeholder_names(&input));
            }
        }
        names.into_iter().collect()
    }

    /// Substitute `values` into every placeholder. Unknown placeholders stay as written.
    pub fn instantiate(&self, values: &HashMap<String, String>) -> AutomationConfig {
        let mut config = self.config();
        for action in &mut config.actions {
            if let Some(input) = action.input_value.as_mut() {
                *input = substitute(input, values);
            }
        }
        config
    }
}

pub fn all() -> &'static [Template] {
    &TEMPLATES
}

pub fn find(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Distinct categories in listing order.
pub fn categories() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for t in &TEMPLATES {
        if !seen.contains(&t.category) {
            seen.push(t.category);
        }
    }
    seen
}

static TEMPLATES: [Template; 5] = [
    Template {
        id: "login_form",
        name: "登录表单",
        description: "自动填写用户名密码并登录",
        category: "表单操作",
        build: login_form,
    },
    Template {
        id: "contact_form",
        name: "联系表单",
        description: "填写联系表单并提交",
        category: "表单操作",
        build: contact_form,
    },
    Template {
        id: "search_and_extract",
        name: "搜索并提取",
        description: "在网站上搜索内容并提取结果",
        category: "数据提取",
        build: search_and_extract,
    },
    Template {
        id: "file_upload",
        name: "文件上传",
        description: "上传文件到指定网站",
        category: "文件操作",
        build: file_upload,
    },
    Template {
        id: "multi_page_navigation",
        name: "多页面导航",
        description: "在多个页面间导航并执行操作",
        category: "页面导航",
        build: multi_page_navigation,
    },
];

fn placeholder_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if !name.is_empty() {
                    names.push(name.to_string());
                }
                rest = &after[end + 2..];
            }
            None => break,
        }
    }
    names
}

fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let raw = &rest[start..start + 2 + end + 2];
        match values.get(after[..end].trim()) {
            Some(value) => out.push_str(value),
            None => out.push_str(raw),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

#[allow(clippy::too_many_arguments)]
fn step(
    id: &str,
    action_type: ActionType,
    selector: Option<&str>,
    input: Option<&str>,
    description: &str,
    wait_time: u32,
    retry_count: u32,
    timeout: u32,
) -> FormAction {
    FormAction {
        id: id.to_string(),
        action_type,
        selector_type: selector.map(|_| SelectorType::Css),
        selector_value: selector.map(str::to_string),
        input_value: input.map(str::to_string),
        wait_time: Some(wait_time),
        description: Some(description.to_string()),
        retry_count: Some(retry_count),
        timeout: Some(timeout),
    }
}

fn config(url: &str, global_timeout: u32, actions: Vec<FormAction>) -> AutomationConfig {
    AutomationConfig {
        url: url.to_string(),
        actions,
        global_timeout,
        screenshot_on_error: true,
        headless: true,
    }
}

const SUBMIT: &str = r#"button[type="submit"]"#;

fn login_form() -> AutomationConfig {
    use ActionType::*;
    config(
        "https://example.com/login",
        60,
        vec![
            step("fill_username", FillInput, Some(r#"input[name="username"]"#), Some("{{username}}"), "填写用户名", 1, 3, 10),
            step("fill_password", FillInput, Some(r#"input[name="password"]"#), Some("{{password}}"), "填写密码", 1, 3, 10),
            step("click_login", ClickButton, Some(SUBMIT), None, "点击登录按钮", 3, 3, 10),
            step("screenshot_result", Screenshot, None, Some("login_result.png"), "截图保存登录结果", 1, 1, 5),
        ],
    )
}

fn contact_form() -> AutomationConfig {
    use ActionType::*;
    config(
        "https://example.com/contact",
        60,
        vec![
            step("fill_name", FillInput, Some(r#"input[name="name"]"#), Some("{{name}}"), "填写姓名", 1, 3, 10),
            step("fill_email", FillInput, Some(r#"input[name="email"]"#), Some("{{email}}"), "填写邮箱", 1, 3, 10),
            step("fill_phone", FillInput, Some(r#"input[name="phone"]"#), Some("{{phone}}"), "填写电话", 1, 3, 10),
            step("fill_message", FillInput, Some(r#"textarea[name="message"]"#), Some("{{message}}"), "填写留言", 1, 3, 10),
            step("submit_form", SubmitForm, Some("form"), None, "提交表单", 3, 3, 15),
        ],
    )
}

fn search_and_extract() -> AutomationConfig {
    use ActionType::*;
    config(
        "https://example.com",
        60,
        vec![
            step("fill_search", FillInput, Some(r#"input[name="search"]"#), Some("{{search_term}}"), "填写搜索关键词", 1, 3, 10),
            step("click_search", ClickButton, Some(SUBMIT), None, "点击搜索按钮", 3, 3, 10),
            step("wait_results", Wait, None, None, "等待搜索结果加载", 3, 1, 5),
            step("screenshot_results", Screenshot, None, Some("search_results.png"), "截图保存搜索结果", 1, 1, 5),
        ],
    )
}

fn file_upload() -> AutomationConfig {
    use ActionType::*;
    config(
        "https://example.com/upload",
        120,
        vec![
            step("select_file", UploadFile, Some(r#"input[type="file"]"#), Some("{{file_path}}"), "选择要上传的文件", 2, 3, 15),
            step("wait_upload", Wait, None, None, "等待文件上传完成", 5, 1, 10),
            step("click_upload", ClickButton, Some(SUBMIT), None, "点击上传按钮", 3, 3, 20),
            step("screenshot_result", Screenshot, None, Some("upload_result.png"), "截图保存上传结果", 1, 1, 5),
        ],
    )
}

fn multi_page_navigation() -> AutomationConfig {
    use ActionType::*;
    config(
        "https://example.com/page1",
        120,
        vec![
            step("screenshot_page1", Screenshot, None, Some("page1.png"), "截图第一页", 2, 1, 5),
            step("navigate_page2", Navigate, None, Some("https://example.com/page2"), "导航到第二页", 3, 3, 15),
            step("fill_form_page2", FillInput, Some(r#"input[name="data"]"#), Some("{{form_data}}"), "在第二页填写表单", 1, 3, 10),
            step("submit_page2", ClickButton, Some(SUBMIT), None, "提交第二页表单", 3, 3, 15),
            step("screenshot_final", Screenshot, None, Some("final_result.png"), "截图最终结果", 1, 1, 5),
        ],
    )
}
