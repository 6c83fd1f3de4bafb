//! 同步命令（SyncCommand）
//!
//! 工作单元在调用方上下文内联运行；工作单元返回的错误与 panic 都被捕获为 Failure。
//! 当 `W::Output` 不为 `()` 时即“带结果命令”：结果只在 Success 后写入，
//! Failure / Cancelled 保留之前的值。
//!
use crate::command::{Command, CommandEvents, CommandId};
use crate::command_base::CommandBase;
use crate::error::{CommandError, Fault, panic_message};
use crate::notify::{PropertyChanged, property};
use crate::outcome::ExecutionOutcome;
use crate::param::RawParam;
use crate::work::SyncWork;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub struct SyncCommand<W: SyncWork> {
    base: CommandBase<W::Param>,
    work: W,
    result: Mutex<Option<W::Output>>,
}

impl<W: SyncWork> fmt::Debug for SyncCommand<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCommand")
            .field("base", &self.base)
            .field("has_result", &self.result.lock().is_some())
            .finish()
    }
}

impl<W: SyncWork> SyncCommand<W> {
    pub fn new(name: impl Into<String>, work: W) -> Self {
        Self {
            base: CommandBase::new(name),
            work,
            result: Mutex::new(None),
        }
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    /// 最近一次成功执行产生的结果
    pub fn result(&self) -> Option<W::Output>
    where
        W::Output: Clone,
    {
        self.result.lock().clone()
    }

    /// 以类型化参数判断可执行性
    pub fn can_execute_with(&self, param: &W::Param) -> bool {
        !self.base.is_executing() && self.work.can_execute(param)
    }

    /// 以类型化参数执行
    pub fn execute_with(&self, param: W::Param) {
        if self.can_execute_with(&param) {
            self.run_attempt(param);
        }
    }

    /// 以原始参数同步执行（无需异步运行时）
    pub fn invoke(&self, param: RawParam<'_>) {
        if let Some(param) = self.base.accept(param) {
            if self.work.can_execute(&param) {
                self.run_attempt(param);
            }
        }
    }

    fn run_attempt(&self, param: W::Param) {
        let Some(attempt) = self.base.begin() else {
            return;
        };

        let outcome = if attempt.is_vetoed() {
            ExecutionOutcome::Cancelled
        } else {
            match self.run_work(param) {
                Ok(output) => {
                    self.store_result(output);
                    ExecutionOutcome::Success
                }
                Err(fault) => {
                    attempt.fail(fault);
                    ExecutionOutcome::Failure
                }
            }
        };

        attempt.finish(outcome);
    }

    fn run_work(&self, param: W::Param) -> Result<W::Output, Fault> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.work.run(param))) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(Arc::new(err)),
            Err(payload) => Err(Arc::new(anyhow::Error::new(CommandError::Panicked {
                command: self.base.name().to_string(),
                message: panic_message(&*payload),
            }))),
        }
    }

    fn store_result(&self, output: W::Output) {
        *self.result.lock() = Some(output);
        self.base.events().property_changed.emit(&PropertyChanged {
            property: property::RESULT,
        });
    }
}

#[async_trait]
impl<W: SyncWork> Command for SyncCommand<W> {
    fn id(&self) -> CommandId {
        self.base.id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn parameter_type(&self) -> &'static str {
        self.base.parameter_type()
    }

    fn can_execute(&self, param: RawParam<'_>) -> bool {
        self.base
            .accept(param)
            .is_some_and(|param| self.work.can_execute(&param))
    }

    async fn execute(&self, param: RawParam<'_>) {
        self.invoke(param);
    }

    fn is_executing(&self) -> bool {
        self.base.is_executing()
    }

    fn last_error(&self) -> Option<Fault> {
        self.base.last_error()
    }

    fn events(&self) -> &CommandEvents {
        self.base.events()
    }
}
