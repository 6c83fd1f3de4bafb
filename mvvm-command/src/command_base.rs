//! 类型化命令基座（CommandBase）
//!
//! 承载所有命令共享的状态机与事件时序，不关心工作单元如何运行：
//!
//! ```text
//! Idle --begin--> Executing --finish(outcome)--> Idle
//! ```
//!
//! 一次被接受的执行尝试严格按以下顺序发出通知：
//! 1. 清空 `last_error`，进入 Executing，发出可执行性变更；
//! 2. 发出“即将执行”（携带新的否决信号）；
//! 3. 由具体命令运行（或因否决跳过）工作单元；
//! 4. 回到 Idle，发出可执行性变更，发出“已完成”。
//!
//! 进入 Executing 是状态锁下的原子 test-and-set，同一实例的并发/重入调用会被拒绝而不是排队。
//!
use crate::command::{CommandEvents, CommandId};
use crate::error::{CommandError, Fault};
use crate::notify::{PropertyChanged, property};
use crate::outcome::{ExecutedEvent, ExecutingEvent, ExecutionOutcome};
use crate::param::{self, RawParam};
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const TARGET: &str = "mvvm::command";

#[derive(Default)]
struct ExecutionState {
    executing: bool,
    last_error: Option<Fault>,
}

pub struct CommandBase<P> {
    id: CommandId,
    name: String,
    state: Mutex<ExecutionState>,
    events: CommandEvents,
    _param: PhantomData<fn(P)>,
}

impl<P> fmt::Debug for CommandBase<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CommandBase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parameter_type", &type_name::<P>())
            .field("executing", &state.executing)
            .field("has_error", &state.last_error.is_some())
            .finish()
    }
}

impl<P> CommandBase<P> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CommandId::next(),
            name: name.into(),
            state: Mutex::new(ExecutionState::default()),
            events: CommandEvents::default(),
            _param: PhantomData,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> &'static str {
        type_name::<P>()
    }

    pub fn events(&self) -> &CommandEvents {
        &self.events
    }

    pub fn is_executing(&self) -> bool {
        self.state.lock().executing
    }

    pub fn last_error(&self) -> Option<Fault> {
        self.state.lock().last_error.clone()
    }

    fn notify(&self, property: &'static str) {
        self.events
            .property_changed
            .emit(&PropertyChanged { property });
    }
}

impl<P: Any + Clone> CommandBase<P> {
    /// 参数类型约定 + 重入保护；通过时返回类型化参数
    pub fn accept(&self, raw: RawParam<'_>) -> Option<P> {
        let Some(param) = param::accept::<P>(raw) else {
            trace!(
                target: TARGET,
                command = %self.name,
                expected = type_name::<P>(),
                "parameter rejected"
            );
            return None;
        };

        if self.is_executing() {
            trace!(target: TARGET, command = %self.name, "re-entrant call rejected");
            return None;
        }

        Some(param)
    }

    /// 进入 Executing 并发出前置通知；已在执行时返回 `None`（无事件、无状态变化）
    pub fn begin(&self) -> Option<Attempt<'_, P>> {
        let cleared = {
            let mut state = self.state.lock();
            if state.executing {
                return None;
            }
            state.executing = true;
            state.last_error.take().is_some()
        };

        // 先建立守卫：观察者 panic 时仍能回到 Idle
        let mut attempt = Attempt {
            base: self,
            vetoed: false,
            finished: false,
        };

        debug!(target: TARGET, command = %self.name, id = %self.id, "execution started");

        if cleared {
            self.notify(property::LAST_ERROR);
        }
        self.notify(property::IS_EXECUTING);
        self.events.can_execute_changed.emit(&self.id);

        let event = ExecutingEvent::new(self.id);
        self.events.executing.emit(&event);
        attempt.vetoed = event.signal.is_vetoed();

        Some(attempt)
    }

    /// 取回一次已交出的执行尝试
    ///
    /// 仅用于 [`Attempt::hand_off`] 之后：命令仍处于 Executing，由调用方负责结束。
    pub(crate) fn resume(&self) -> Attempt<'_, P> {
        Attempt {
            base: self,
            vetoed: false,
            finished: false,
        }
    }
}

/// 一次进行中的执行尝试
///
/// 由 [`CommandBase::begin`] 产生，必须以 [`Attempt::finish`] 结束。
/// 若提前被丢弃（调用方放弃等待、观察者 panic 展开），按 Failure 结束：
/// 记录 `Interrupted`，回到 Idle 并照常发出后置通知，但不再重抛观察者的 panic。
pub struct Attempt<'a, P> {
    base: &'a CommandBase<P>,
    vetoed: bool,
    finished: bool,
}

impl<P> Attempt<'_, P> {
    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }

    /// 记录工作单元故障
    pub fn fail(&self, fault: Fault) {
        warn!(
            target: TARGET,
            command = %self.base.name,
            id = %self.base.id,
            error = %fault,
            "execution failed"
        );
        self.base.state.lock().last_error = Some(fault);
        self.base.notify(property::LAST_ERROR);
    }

    /// 回到 Idle 并发出后置通知
    pub fn finish(mut self, outcome: ExecutionOutcome) {
        self.finished = true;
        let base = self.base;
        base.state.lock().executing = false;

        if outcome == ExecutionOutcome::Cancelled {
            debug!(target: TARGET, command = %base.name, id = %base.id, "execution vetoed");
        }
        debug!(
            target: TARGET,
            command = %base.name,
            id = %base.id,
            outcome = ?outcome,
            "execution finished"
        );

        base.notify(property::IS_EXECUTING);
        base.events.can_execute_changed.emit(&base.id);
        base.events.executed.emit(&ExecutedEvent {
            command: base.id,
            outcome,
        });
    }

    /// 交出收尾责任：命令保持 Executing，由 [`CommandBase::resume`] 取回后再结束
    pub(crate) fn hand_off(mut self) {
        self.finished = true;
        debug!(target: TARGET, command = %self.base.name, id = %self.base.id, "execution handed off");
    }

    fn interrupt(&mut self) {
        self.finished = true;
        let base = self.base;
        let fault: Fault = Arc::new(
            CommandError::Interrupted {
                command: base.name.clone(),
            }
            .into(),
        );
        warn!(target: TARGET, command = %base.name, id = %base.id, "execution interrupted");

        {
            let mut state = base.state.lock();
            state.executing = false;
            state.last_error = Some(fault);
        }

        let property_changed = &base.events.property_changed;
        property_changed.emit_contained(&PropertyChanged {
            property: property::LAST_ERROR,
        });
        property_changed.emit_contained(&PropertyChanged {
            property: property::IS_EXECUTING,
        });
        base.events.can_execute_changed.emit_contained(&base.id);
        base.events.executed.emit_contained(&ExecutedEvent {
            command: base.id,
            outcome: ExecutionOutcome::Failure,
        });
    }
}

impl<P> Drop for Attempt<'_, P> {
    fn drop(&mut self) {
        if !self.finished {
            self.interrupt();
        }
    }
}
