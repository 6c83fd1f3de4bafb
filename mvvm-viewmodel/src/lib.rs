//! 视图模型层（mvvm-viewmodel）
//!
//! 在命令能力之上提供“持有者”角色：
//! - `action_owner`：注册命令、聚合忙碌信号、收纳完成回调中的故障；
//! - `data_view_model`：以类型化参数加载数据的视图模型；
//! - `item_view_model`：可选中的列表项包装；
//! - `property_setters`：按名称设置属性的显式设置器表。
//!
//! 只依赖 `mvvm_command::Command` 能力，不依赖具体命令类型。
//!
pub mod action_owner;
pub mod data_view_model;
pub mod error;
pub mod item_view_model;
pub mod property;
pub mod property_setters;

pub use action_owner::{ActionOwner, CompletionCallback, on_completed};
pub use data_view_model::{DataLoader, DataViewModel};
pub use error::{ViewModelError, ViewModelResult};
pub use item_view_model::ItemViewModel;
pub use property_setters::PropertySetters;
