//! 执行结果与否决信号
//!
use crate::command::CommandId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// 一次执行尝试的终态分类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    Failure,
    Cancelled,
}

impl ExecutionOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// 否决信号：由“即将执行”观察者设置，命令在全部观察者返回后检查一次
#[derive(Debug, Default)]
pub struct CancelSignal {
    vetoed: AtomicBool,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn veto(&self) {
        self.vetoed.store(true, Ordering::SeqCst);
    }

    pub fn is_vetoed(&self) -> bool {
        self.vetoed.load(Ordering::SeqCst)
    }
}

/// “即将执行”事件
#[derive(Debug)]
pub struct ExecutingEvent {
    pub command: CommandId,
    pub signal: CancelSignal,
}

impl ExecutingEvent {
    pub(crate) fn new(command: CommandId) -> Self {
        Self {
            command,
            signal: CancelSignal::new(),
        }
    }

    /// 否决本次执行
    pub fn veto(&self) {
        self.signal.veto();
    }
}

/// “已完成”事件
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutedEvent {
    pub command: CommandId,
    pub outcome: ExecutionOutcome,
}
