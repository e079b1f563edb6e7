use thiserror::Error;

/// Top-level server errors surfaced from `Server::run`
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

/// 服务器启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
