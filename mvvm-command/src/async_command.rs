//! 异步命令（AsyncCommand）
//!
//! 工作单元可挂起；配置 `execute_in_background` 后工作单元被提交到 tokio 运行时，
//! 命令等待其 `JoinHandle` 完成后才回到 Idle。
//! 状态迁移与全部事件在调用方的任务上发出，跨越后台边界的只有工作单元本身与其完成信号。
//!
//! 调用方中途丢弃 `execute` 的 future 时：
//! - 内联执行：工作单元随之被丢弃，本次尝试以 Failure（`Interrupted`）结束；
//! - 后台执行：工作单元继续运行，命令保持 Executing，
//!   由运行时上的收尾任务在工作单元结束后照常完成本次尝试，同一实例不会出现两个并行的工作单元。
//!
use crate::command::{Command, CommandEvents, CommandId};
use crate::command_base::{Attempt, CommandBase};
use crate::error::{CommandError, CommandResult, Fault, panic_message};
use crate::notify::{PropertyChanged, property};
use crate::outcome::ExecutionOutcome;
use crate::param::RawParam;
use crate::work::AsyncWork;
use async_trait::async_trait;
use bon::Builder;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

const TARGET: &str = "mvvm::command";

/// 异步命令配置
#[derive(Builder, Clone, Debug, Default)]
pub struct AsyncCommandConfig {
    /// 是否把工作单元派发到后台运行时
    #[builder(default)]
    pub execute_in_background: bool,
    /// 后台派发使用的运行时；缺省为调用方当前所在的运行时
    pub runtime: Option<Handle>,
}

/// 调用方与后台收尾任务共享的状态
struct Shared<W: AsyncWork> {
    base: CommandBase<W::Param>,
    result: Mutex<Option<W::Output>>,
}

impl<W: AsyncWork> Shared<W> {
    fn settle(&self, attempt: Attempt<'_, W::Param>, result: Result<W::Output, Fault>) {
        match result {
            Ok(output) => {
                *self.result.lock() = Some(output);
                self.base.events().property_changed.emit(&PropertyChanged {
                    property: property::RESULT,
                });
                attempt.finish(ExecutionOutcome::Success);
            }
            Err(fault) => {
                attempt.fail(fault);
                attempt.finish(ExecutionOutcome::Failure);
            }
        }
    }

    fn panicked(&self, payload: &(dyn Any + Send)) -> anyhow::Error {
        CommandError::Panicked {
            command: self.base.name().to_string(),
            message: panic_message(payload),
        }
        .into()
    }

    fn joined(
        &self,
        joined: Result<anyhow::Result<W::Output>, JoinError>,
    ) -> Result<W::Output, Fault> {
        let result = match joined {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(self.panicked(&*err.into_panic())),
            Err(err) => Err(CommandError::BackgroundAborted {
                command: self.base.name().to_string(),
                reason: err.to_string(),
            }
            .into()),
        };
        result.map_err(Arc::new)
    }
}

/// 已派发到后台的工作单元
///
/// 被丢弃时若工作单元仍在运行，把等待与收尾转交给运行时上的任务。
struct Offload<W: AsyncWork> {
    shared: Arc<Shared<W>>,
    runtime: Handle,
    task: Option<JoinHandle<anyhow::Result<W::Output>>>,
    detached: bool,
}

impl<W: AsyncWork> Offload<W> {
    async fn join(&mut self) {
        let Some(task) = self.task.as_mut() else {
            return;
        };
        let joined = task.await;
        self.task = None;

        let attempt = self.shared.base.resume();
        let result = self.shared.joined(joined);
        self.shared.settle(attempt, result);
    }
}

impl<W: AsyncWork> Drop for Offload<W> {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        if self.detached {
            // 收尾任务未能跑完（运行时关闭），工作单元不能再无人看管
            task.abort();
            drop(self.shared.base.resume());
            return;
        }

        debug!(
            target: TARGET,
            command = self.shared.base.name(),
            id = %self.shared.base.id(),
            "caller went away, finishing in background"
        );
        let mut rest = Offload {
            shared: Arc::clone(&self.shared),
            runtime: self.runtime.clone(),
            task: Some(task),
            detached: true,
        };
        self.runtime.spawn(async move { rest.join().await });
    }
}

pub struct AsyncCommand<W: AsyncWork> {
    shared: Arc<Shared<W>>,
    work: Arc<W>,
    background: AtomicBool,
    runtime: Option<Handle>,
}

impl<W: AsyncWork> fmt::Debug for AsyncCommand<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCommand")
            .field("base", &self.shared.base)
            .field("background", &self.execute_in_background())
            .field("has_result", &self.shared.result.lock().is_some())
            .finish()
    }
}

impl<W: AsyncWork> AsyncCommand<W> {
    pub fn new(name: impl Into<String>, work: W) -> Self {
        Self::with_config(name, work, AsyncCommandConfig::default())
    }

    pub fn with_config(name: impl Into<String>, work: W, config: AsyncCommandConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                base: CommandBase::new(name),
                result: Mutex::new(None),
            }),
            work: Arc::new(work),
            background: AtomicBool::new(config.execute_in_background),
            runtime: config.runtime,
        }
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    pub fn execute_in_background(&self) -> bool {
        self.background.load(Ordering::SeqCst)
    }

    pub fn set_execute_in_background(&self, enabled: bool) {
        self.background.store(enabled, Ordering::SeqCst);
    }

    pub fn result(&self) -> Option<W::Output>
    where
        W::Output: Clone,
    {
        self.shared.result.lock().clone()
    }

    pub fn can_execute_with(&self, param: &W::Param) -> bool {
        !self.shared.base.is_executing() && self.work.can_execute(param)
    }

    /// 以类型化参数执行，返回时本次尝试已结束
    pub async fn execute_with(&self, param: W::Param) {
        if self.can_execute_with(&param) {
            self.run_attempt(param).await;
        }
    }

    async fn run_attempt(&self, param: W::Param) {
        let shared = &self.shared;
        let Some(attempt) = shared.base.begin() else {
            return;
        };

        if attempt.is_vetoed() {
            attempt.finish(ExecutionOutcome::Cancelled);
            return;
        }

        if !self.execute_in_background() {
            let result = match AssertUnwindSafe(self.work.run(param)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(shared.panicked(&*payload)),
            };
            shared.settle(attempt, result.map_err(Arc::new));
            return;
        }

        let runtime = match self.background_runtime() {
            Ok(runtime) => runtime,
            Err(err) => {
                shared.settle(attempt, Err(Arc::new(err.into())));
                return;
            }
        };

        let work = Arc::clone(&self.work);
        let task = runtime.spawn(async move { work.run(param).await });
        attempt.hand_off();

        let mut offload = Offload {
            shared: Arc::clone(shared),
            runtime,
            task: Some(task),
            detached: false,
        };
        offload.join().await;
    }

    fn background_runtime(&self) -> CommandResult<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|_| CommandError::NoRuntime {
                command: self.shared.base.name().to_string(),
            }),
        }
    }
}

#[async_trait]
impl<W: AsyncWork> Command for AsyncCommand<W> {
    fn id(&self) -> CommandId {
        self.shared.base.id()
    }

    fn name(&self) -> &str {
        self.shared.base.name()
    }

    fn parameter_type(&self) -> &'static str {
        self.shared.base.parameter_type()
    }

    fn can_execute(&self, param: RawParam<'_>) -> bool {
        self.shared
            .base
            .accept(param)
            .is_some_and(|param| self.work.can_execute(&param))
    }

    async fn execute(&self, param: RawParam<'_>) {
        let Some(param) = self.shared.base.accept(param) else {
            return;
        };
        if self.work.can_execute(&param) {
            self.run_attempt(param).await;
        }
    }

    fn is_executing(&self) -> bool {
        self.shared.base.is_executing()
    }

    fn last_error(&self) -> Option<Fault> {
        self.shared.base.last_error()
    }

    fn events(&self) -> &CommandEvents {
        self.shared.base.events()
    }
}
