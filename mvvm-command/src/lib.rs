//! 命令执行框架（mvvm-command）
//!
//! 把“用户可触发的动作”与“动作如何、在哪里运行”解耦，并为同步与异步动作提供一致的
//! 状态（执行中、最近错误、否决）：
//! - `command`：输入端面对的命令能力（`Command`）与通知通道；
//! - `command_base`：类型化基座，负责状态机、重入保护与事件时序；
//! - `sync_command` / `async_command`：内联运行、可挂起/可后台运行的两种命令；
//! - `work`：以值持有的工作单元策略及闭包适配器；
//! - `param`：类型擦除参数与“无参数”标记；
//! - `event` / `notify`：观察者通道与属性变更通知；
//! - `outcome`：执行结果分类与否决信号。
//!
//! 典型用法：
//! ```rust
//! use mvvm_command::{Command, NoParam, SyncCommand, sync_fn};
//!
//! let cmd = SyncCommand::new("greet", sync_fn(|_: NoParam| Ok("hello")));
//! assert!(cmd.can_execute(None));
//! cmd.invoke(None);
//! assert_eq!(cmd.result(), Some("hello"));
//! assert!(cmd.last_error().is_none());
//! ```
//!
pub mod async_command;
pub mod command;
pub mod command_base;
pub mod error;
pub mod event;
pub mod notify;
pub mod outcome;
pub mod param;
pub mod sync_command;
pub mod work;

pub use async_command::{AsyncCommand, AsyncCommandConfig};
pub use command::{Command, CommandEvents, CommandId};
pub use command_base::{Attempt, CommandBase};
pub use error::{CommandError, CommandResult, Fault};
pub use event::{EventChannel, SubscriptionId};
pub use notify::{PropertyChannel, PropertyChanged};
pub use outcome::{CancelSignal, ExecutedEvent, ExecutingEvent, ExecutionOutcome};
pub use param::{NoParam, RawParam};
pub use sync_command::SyncCommand;
pub use work::{AsyncFnWork, AsyncWork, FnWork, SyncWork, async_fn, sync_fn};
