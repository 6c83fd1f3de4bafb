//! 动作持有者（ActionOwner）
//!
//! 展示层对象通过它持有多个命令，对外呈现一个聚合的“忙碌”信号，并为每个命令挂接完成回调：
//! - `register`：订阅命令的“即将执行”与“已完成”通道并保存回调；重复注册为空操作；
//! - `deregister`：退订并移除；未注册时为空操作；
//! - 任一已注册命令即将执行 → `is_busy = true`；
//! - 任一已注册命令完成 → `is_busy = false`，随后调用该命令的回调；
//!   回调返回的错误或 panic 被收进持有者自身的 `error`，不会打断通知链路。
//!
//! 注意：忙碌标志是简单的布尔量而非计数。两个命令重叠执行时，
//! 先完成的一方就会把 `is_busy` 置回 false，调用方依赖这一行为。
//!
//! 只依赖 [`Command`] 能力，不依赖具体命令类型。命令通道中的订阅只持有持有者的弱引用，
//! 持有者被释放后不会再收到回调，也不会延长命令的生命周期。
//!
use crate::error::{ViewModelError, ViewModelResult};
use crate::property;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mvvm_command::error::panic_message;
use mvvm_command::notify::set_property;
use mvvm_command::{
    Command, CommandId, ExecutedEvent, Fault, PropertyChannel, PropertyChanged, SubscriptionId,
};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

const TARGET: &str = "mvvm::viewmodel";

/// 命令完成回调
pub type CompletionCallback = Arc<dyn Fn(&ExecutedEvent) -> anyhow::Result<()> + Send + Sync>;

/// 由闭包构造完成回调
pub fn on_completed<F>(callback: F) -> CompletionCallback
where
    F: Fn(&ExecutedEvent) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(callback)
}

struct Registration {
    command: Arc<dyn Command>,
    callback: CompletionCallback,
    executing: SubscriptionId,
    executed: SubscriptionId,
}

impl Registration {
    fn unsubscribe(&self) {
        let events = self.command.events();
        events.executing.unsubscribe(self.executing);
        events.executed.unsubscribe(self.executed);
    }
}

struct OwnerState {
    name: String,
    registry: DashMap<CommandId, Registration>,
    busy: Mutex<bool>,
    error: Mutex<Option<Fault>>,
    property_changed: PropertyChannel,
}

impl OwnerState {
    fn set_busy(&self, busy: bool) {
        set_property(&self.busy, busy, property::IS_BUSY, &self.property_changed);
    }

    fn set_error(&self, error: Option<Fault>) {
        let changed = {
            let mut slot = self.error.lock();
            let changed = slot.is_some() || error.is_some();
            *slot = error;
            changed
        };
        if changed {
            self.property_changed.emit(&PropertyChanged {
                property: property::ERROR,
            });
        }
    }

    fn on_executing(&self) {
        self.set_busy(true);
    }

    fn on_executed(&self, event: &ExecutedEvent) {
        self.set_busy(false);

        // 先克隆回调并释放分片锁，回调内部可以安全地注册/退订
        let Some(callback) = self
            .registry
            .get(&event.command)
            .map(|r| Arc::clone(&r.callback))
        else {
            return;
        };

        let fault = match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => anyhow::Error::new(ViewModelError::Panicked {
                owner: self.name.clone(),
                message: panic_message(&*payload),
            }),
        };

        warn!(
            target: TARGET,
            owner = %self.name,
            command = %event.command,
            error = %fault,
            "completion callback failed"
        );
        self.set_error(Some(Arc::new(fault)));
    }
}

impl Drop for OwnerState {
    fn drop(&mut self) {
        for entry in self.registry.iter() {
            entry.value().unsubscribe();
        }
    }
}

#[derive(Clone)]
pub struct ActionOwner {
    state: Arc<OwnerState>,
}

impl fmt::Debug for ActionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionOwner")
            .field("name", &self.state.name)
            .field("registered", &self.registered_count())
            .field("busy", &self.is_busy())
            .field("has_error", &self.error().is_some())
            .finish()
    }
}

impl ActionOwner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(OwnerState {
                name: name.into(),
                registry: DashMap::new(),
                busy: Mutex::new(false),
                error: Mutex::new(None),
                property_changed: PropertyChannel::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// 注册命令及其完成回调
    ///
    /// 任一参数缺失时返回 `InvalidRegistration`；命令已注册时为空操作。
    pub fn register(
        &self,
        command: Option<Arc<dyn Command>>,
        on_completed: Option<CompletionCallback>,
    ) -> ViewModelResult<()> {
        let (Some(command), Some(callback)) = (command, on_completed) else {
            return Err(ViewModelError::InvalidRegistration {
                reason: "command and completion callback are both required",
            });
        };

        let Entry::Vacant(slot) = self.state.registry.entry(command.id()) else {
            return Ok(());
        };

        let events = command.events();
        let executing = {
            let owner = Arc::downgrade(&self.state);
            events.executing.subscribe(move |_| {
                if let Some(owner) = owner.upgrade() {
                    owner.on_executing();
                }
            })
        };
        let executed = {
            let owner = Arc::downgrade(&self.state);
            events.executed.subscribe(move |event| {
                if let Some(owner) = owner.upgrade() {
                    owner.on_executed(event);
                }
            })
        };

        debug!(
            target: TARGET,
            owner = %self.state.name,
            command = command.name(),
            id = %command.id(),
            "command registered"
        );

        slot.insert(Registration {
            command,
            callback,
            executing,
            executed,
        });
        Ok(())
    }

    /// `register` 的便捷形式：命令与回调都必然存在
    pub fn register_command<C, F>(&self, command: &Arc<C>, on_completed: F) -> ViewModelResult<()>
    where
        C: Command + 'static,
        F: Fn(&ExecutedEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let command: Arc<dyn Command> = command.clone();
        let callback: CompletionCallback = Arc::new(on_completed);
        self.register(Some(command), Some(callback))
    }

    /// 注销命令；返回是否确有注销
    pub fn deregister(&self, command: &dyn Command) -> bool {
        let Some((_, registration)) = self.state.registry.remove(&command.id()) else {
            return false;
        };
        registration.unsubscribe();
        debug!(
            target: TARGET,
            owner = %self.state.name,
            command = command.name(),
            id = %command.id(),
            "command deregistered"
        );
        true
    }

    pub fn is_registered(&self, command: &dyn Command) -> bool {
        self.state.registry.contains_key(&command.id())
    }

    pub fn registered_count(&self) -> usize {
        self.state.registry.len()
    }

    /// 聚合忙碌标志（非计数，见模块文档）
    pub fn is_busy(&self) -> bool {
        *self.state.busy.lock()
    }

    /// 完成回调或加载过程中被收纳的故障
    pub fn error(&self) -> Option<Fault> {
        self.state.error.lock().clone()
    }

    pub fn clear_error(&self) {
        self.state.set_error(None);
    }

    pub fn property_changed(&self) -> &PropertyChannel {
        &self.state.property_changed
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.state.set_busy(busy);
    }

    pub(crate) fn set_error(&self, error: Option<Fault>) {
        self.state.set_error(error);
    }
}
