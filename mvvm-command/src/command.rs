//! 命令能力（Command）
//!
//! 输入端（按钮、菜单项、手势）所需的完整接口：
//! - `can_execute` / `execute`：以类型擦除参数探测与触发；
//! - `is_executing` / `last_error`：执行状态；
//! - `events`：即将执行（可否决）、已完成（携带结果分类）、可执行性变更、属性变更四个通道。
//!
//! 输入端无需知道命令是同步、异步还是后台执行。
//!
use crate::error::Fault;
use crate::event::EventChannel;
use crate::notify::PropertyChanged;
use crate::outcome::{ExecutedEvent, ExecutingEvent};
use crate::param::RawParam;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 命令标识（进程内唯一），作为注册表的身份键
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

/// 命令的通知通道集合
#[derive(Debug, Default)]
pub struct CommandEvents {
    /// 即将执行；观察者可通过 `ExecutingEvent::veto` 否决
    pub executing: EventChannel<ExecutingEvent>,
    /// 已完成
    pub executed: EventChannel<ExecutedEvent>,
    pub can_execute_changed: EventChannel<CommandId>,
    pub property_changed: EventChannel<PropertyChanged>,
}

/// 命令能力
#[async_trait]
pub trait Command: Send + Sync {
    fn id(&self) -> CommandId;

    /// 诊断名称（日志、追踪）
    fn name(&self) -> &str;

    /// 声明的参数类型名
    fn parameter_type(&self) -> &'static str;

    /// 参数不满足类型约定、正在执行或业务谓词不通过时返回 false
    fn can_execute(&self, param: RawParam<'_>) -> bool;

    /// 执行一次；`can_execute` 为 false 时静默忽略。
    ///
    /// 返回的 future 在本次尝试结束（已完成事件发出）后才就绪，
    /// 同步命令立即就绪。工作单元的故障不会从这里抛出。
    async fn execute(&self, param: RawParam<'_>);

    fn is_executing(&self) -> bool;

    fn last_error(&self) -> Option<Fault>;

    fn events(&self) -> &CommandEvents;

    /// 重新广播可执行性（外部条件变化时由持有方调用）
    fn evaluate_can_execute(&self) {
        let id = self.id();
        self.events().can_execute_changed.emit(&id);
    }
}
