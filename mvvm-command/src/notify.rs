//! 属性变更通知
//!
//! 所有可观察字段（执行中、最近错误、结果、聚合忙碌等）变更时，
//! 通过 `PropertyChanged` 通知观察者变更字段的名称。
//!
use crate::event::EventChannel;
use parking_lot::Mutex;

/// 属性变更事件
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyChanged {
    pub property: &'static str,
}

pub type PropertyChannel = EventChannel<PropertyChanged>;

/// 命令上的可观察属性名
pub mod property {
    pub const IS_EXECUTING: &str = "is_executing";
    pub const LAST_ERROR: &str = "last_error";
    pub const RESULT: &str = "result";
}

/// 值发生变化时写入并通知；返回是否发生了变化
///
/// 通知在释放锁之后发出，观察者可以安全地回读该字段。
pub fn set_property<T: PartialEq>(
    slot: &Mutex<T>,
    value: T,
    property: &'static str,
    channel: &PropertyChannel,
) -> bool {
    {
        let mut current = slot.lock();
        if *current == value {
            return false;
        }
        *current = value;
    }
    channel.emit(&PropertyChanged { property });
    true
}
