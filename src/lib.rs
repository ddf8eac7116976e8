//! Browser-automation action lists: the data model, an editing session,
//! generators that expand forms into actions, JSON save/load, and the proxy
//! that hands a finished config to the execution backend.

pub mod config_file;
pub mod editor;
pub mod error;
pub mod ids;
pub mod proxy;
pub mod quick;
pub mod server;
pub mod settings;
pub mod templates;
pub mod types;

pub use editor::Session;
pub use error::{ConfigFileError, SessionError, ValidationError};
pub use proxy::{Proxy, ProxyResponse};
pub use settings::Settings;
pub use types::{
    ActionPatch, ActionType, AutomationConfig, BrowserbaseConfig, ExecuteRequest,
    ExecutionResult, FormAction, SelectorType,
};
