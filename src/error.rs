use thiserror::Error;

/// Rejected before any request is sent.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("请填写完整的配置信息 (missing: {})", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("配置文件格式错误: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("配置文件格式错误: duplicate action id '{0}'")]
    DuplicateId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("an execution request is already in flight")]
    AlreadyExecuting,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
