//! 命令层统一错误定义
//!
//! 仅覆盖框架自身可能产生的故障（工作单元 panic、后台调度失败）。
//! 业务工作单元返回的任意错误以 `anyhow::Error` 承载，统一封装为 [`Fault`]。
//!
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// 框架内部错误
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unit of work panicked: command={command}, message={message}")]
    Panicked { command: String, message: String },

    #[error("no async runtime available for background dispatch: command={command}")]
    NoRuntime { command: String },

    #[error("background task aborted: command={command}, reason={reason}")]
    BackgroundAborted { command: String, reason: String },

    #[error("execution interrupted before completion: command={command}")]
    Interrupted { command: String },
}

/// 统一 Result 类型别名
pub type CommandResult<T> = Result<T, CommandError>;

/// 被捕获的执行故障
///
/// 以 `Arc` 共享，便于同时交给 `last_error` 读取方与观察者；
/// 通过 `downcast_ref` 还原具体错误类型。
pub type Fault = Arc<anyhow::Error>;

/// 从 panic 负载中提取可读消息
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
