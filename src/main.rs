use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use formflow::config_file::{self, DEFAULT_FILE};
use formflow::ids::RandomIds;
use formflow::quick::{self, FieldValues};
use formflow::{ActionPatch, ActionType, ExecutionResult, Proxy, SelectorType, Session, Settings, templates};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "formflow", version, about = "Build browser-automation action lists")]
struct Cli {
    /// Configuration file to edit
    #[arg(short, long, global = true, default_value = DEFAULT_FILE)]
    file: PathBuf,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new, empty configuration
    Init {
        #[arg(long, default_value = "")]
        url: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration and its actions
    Show,
    /// List action types, selector types, quick actions and templates
    Catalog,
    /// Append a new action
    Add {
        action_type: ActionType,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Change fields of an existing action
    Set {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete an action
    Remove { id: String },
    /// Move the action at position FROM to position TO (1-based)
    Move { from: usize, to: usize },
    /// Append the actions a quick action generates, e.g. `quick quick_login url=... username=...`
    Quick { name: String, values: Vec<String> },
    /// Replace the configuration with a template, filling `{{placeholders}}`
    Template { name: String, values: Vec<String> },
    /// Set the run's target URL and flags
    Target {
        url: Option<String>,
        #[arg(long)]
        global_timeout: Option<u32>,
        #[arg(long)]
        headless: Option<bool>,
        #[arg(long)]
        screenshot_on_error: Option<bool>,
    },
    /// Store execution credentials
    Credentials {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Write a copy of the configuration (defaults to the download directory)
    Export { out: Option<PathBuf> },
    /// Send the configuration to the execution backend
    Run {
        /// Override BACKEND_URL
        #[arg(long)]
        backend_url: Option<String>,
    },
}

#[derive(clap::Args)]
struct FieldArgs {
    #[arg(long)]
    selector_type: Option<SelectorType>,
    #[arg(long)]
    selector: Option<String>,
    #[arg(long)]
    input: Option<String>,
    #[arg(long)]
    wait: Option<u32>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    retry_count: Option<u32>,
    #[arg(long)]
    timeout: Option<u32>,
    /// Unset optional fields, e.g. `--clear wait_time,description`
    #[arg(long, value_delimiter = ',')]
    clear: Vec<String>,
}

impl FieldArgs {
    fn patch(self) -> Result<ActionPatch> {
        let mut patch = ActionPatch {
            action_type: None,
            selector_type: self.selector_type.map(Some),
            selector_value: self.selector.map(Some),
            input_value: self.input.map(Some),
            wait_time: self.wait.map(Some),
            description: self.description.map(Some),
            retry_count: self.retry_count.map(Some),
            timeout: self.timeout.map(Some),
        };
        for field in &self.clear {
            match field.as_str() {
                "selector_type" => patch.selector_type = Some(None),
                "selector_value" | "selector" => patch.selector_value = Some(None),
                "input_value" | "input" => patch.input_value = Some(None),
                "wait_time" | "wait" => patch.wait_time = Some(None),
                "description" => patch.description = Some(None),
                "retry_count" => patch.retry_count = Some(None),
                "timeout" => patch.timeout = Some(None),
                other => bail!("Field '{}' cannot be cleared", other),
            }
        }
        Ok(patch)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut session = if matches!(cli.command, Command::Init { .. }) {
        Session::new()
    } else {
        open(&cli.file)?
    };
    let mut dirty = true;

    match cli.command {
        Command::Init { url, force } => {
            if cli.file.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", cli.file.display());
            }
            session.config.url = url;
            println!("Created {}", cli.file.display());
        }
        Command::Show => {
            print_session(&session);
            dirty = false;
        }
        Command::Catalog => {
            print_catalog();
            dirty = false;
        }
        Command::Add {
            action_type,
            fields,
        } => {
            let patch = fields.patch()?;
            let id = session.add(action_type).id.clone();
            if !patch.is_empty() {
                session.update(&id, &patch);
            }
            println!("Added {}", id);
        }
        Command::Set { id, fields } => {
            if !session.update(&id, &fields.patch()?) {
                bail!("No action with id '{}'", id);
            }
            println!("Updated {}", id);
        }
        Command::Remove { id } => {
            session
                .delete(&id)
                .ok_or_else(|| anyhow!("No action with id '{}'", id))?;
            println!("Removed {}", id);
        }
        Command::Move { from, to } => {
            let len = session.actions().len();
            if from == 0 || to == 0 || from > len || to > len {
                bail!("Positions must be between 1 and {}", len);
            }
            session.reorder(from - 1, Some(to - 1));
        }
        Command::Quick { name, values } => {
            let quick =
                quick::find(&name).ok_or_else(|| anyhow!("Unknown quick action '{}'", name))?;
            let values = parse_pairs(&values)?;
            let missing = quick.missing_fields(&values);
            if !missing.is_empty() {
                bail!("请填写以下必填字段: {}", missing.join(", "));
            }
            let actions = quick.generate(&values, &mut RandomIds::new());
            println!("Added {} actions from {}", actions.len(), quick.name);
            session.append_actions(actions, values.get("url").map(String::as_str));
        }
        Command::Template { name, values } => {
            let template =
                templates::find(&name).ok_or_else(|| anyhow!("Unknown template '{}'", name))?;
            let values = parse_pairs(&values)?;
            session.apply_template(template.instantiate(&values));
            let unfilled: Vec<String> = template
                .placeholders()
                .into_iter()
                .filter(|p| !values.contains_key(p))
                .collect();
            if !unfilled.is_empty() {
                println!("Placeholders left to fill: {}", unfilled.join(", "));
            }
            println!("Applied template {}", template.name);
        }
        Command::Target {
            url,
            global_timeout,
            headless,
            screenshot_on_error,
        } => {
            if let Some(url) = url {
                session.config.url = url;
            }
            if let Some(t) = global_timeout {
                session.config.global_timeout = t;
            }
            if let Some(h) = headless {
                session.config.headless = h;
            }
            if let Some(s) = screenshot_on_error {
                session.config.screenshot_on_error = s;
            }
        }
        Command::Credentials {
            api_key,
            project_id,
        } => {
            if let Some(key) = api_key {
                session.browserbase.api_key = key;
            }
            if let Some(project) = project_id {
                session.browserbase.project_id = project;
            }
        }
        Command::Export { out } => {
            let out = out.unwrap_or_else(config_file::default_export_path);
            config_file::save(&session, &out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Exported to {}", out.display());
            dirty = false;
        }
        Command::Run { backend_url } => {
            let mut settings = Settings::from_env();
            if let Some(url) = backend_url {
                settings.backend_url = url.trim_end_matches('/').to_string();
            }
            let proxy = Proxy::new(&settings);
            debug!("Executing against {}", proxy.endpoint());
            println!("执行中...");
            let result = formflow::proxy::execute_session(&mut session, &proxy).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            ensure_success(&result)?;
            dirty = false;
        }
    }

    if dirty {
        config_file::save(&session, &cli.file)
            .with_context(|| format!("Failed to save {}", cli.file.display()))?;
    }
    Ok(())
}

/// Turn a failed run into an error so the process exits non-zero.
fn ensure_success(result: &ExecutionResult) -> Result<()> {
    if !result.success {
        bail!(
            "Automation failed: {}",
            result.error.as_deref().unwrap_or(formflow::proxy::UNKNOWN_ERROR)
        );
    }
    Ok(())
}

fn open(path: &Path) -> Result<Session> {
    let mut session = Session::new();
    if path.exists() {
        config_file::load(&mut session, path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }
    Ok(session)
}

fn parse_pairs(pairs: &[String]) -> Result<FieldValues> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("Expected key=value, got '{}'", pair))
        })
        .collect()
}

fn print_session(session: &Session) {
    let config = &session.config;
    println!("URL:            {}", if config.url.is_empty() { "(unset)" } else { config.url.as_str() });
    println!("Global timeout: {}s", config.global_timeout);
    println!("Headless:       {}", config.headless);
    println!("Screenshot on error: {}", config.screenshot_on_error);
    println!(
        "Credentials:    {}",
        if session.browserbase.api_key.is_empty() { "missing" } else { "set" }
    );
    println!();

    if config.actions.is_empty() {
        println!("No actions yet. Add one with `formflow add <type>`.");
        return;
    }
    for (i, action) in config.actions.iter().enumerate() {
        let t = action.action_type;
        print!("{:>3}. {} {} [{}]", i + 1, t.icon(), t.display_name(), action.id);
        if let (Some(kind), Some(value)) = (action.selector_type, action.selector_value.as_deref())
        {
            if !value.is_empty() {
                print!("  {}: {}", kind, value);
            }
        }
        if let Some(desc) = action.description.as_deref().filter(|d| !d.is_empty()) {
            print!("  ({})", desc);
        }
        println!();
    }
}

fn print_catalog() {
    println!("Action types:");
    for t in ActionType::ALL {
        println!("  {} {:<14} {}", t.icon(), t.as_str(), t.display_name());
    }
    println!("\nSelector types:");
    for s in SelectorType::ALL {
        println!("  {:<18} {}", s.as_str(), s.label());
    }
    println!("\nQuick actions:");
    for q in quick::all() {
        let fields: Vec<String> = q
            .fields
            .iter()
            .map(|f| if f.required { format!("{}*", f.name) } else { f.name.to_string() })
            .collect();
        println!("  {:<15} {} [{}]", q.id, q.name, fields.join(" "));
    }
    println!("\nTemplates:");
    for category in templates::categories() {
        println!("  {}", category);
        for t in templates::all().iter().filter(|t| t.category == category) {
            println!("    {:<22} {} ({})", t.id, t.name, t.placeholders().join(", "));
        }
    }
}
