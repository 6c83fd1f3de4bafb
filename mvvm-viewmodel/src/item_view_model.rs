//! 列表项视图模型：包装单个条目，附带选中与加载中状态
//!
use crate::property;
use mvvm_command::notify::set_property;
use mvvm_command::{EventChannel, PropertyChannel};
use parking_lot::Mutex;

#[derive(Debug)]
pub struct ItemViewModel<T> {
    item: T,
    is_selected: Mutex<bool>,
    is_loading: Mutex<bool>,
    property_changed: PropertyChannel,
    selection_changed: EventChannel<bool>,
}

impl<T> ItemViewModel<T> {
    pub fn new(item: T) -> Self {
        Self {
            item,
            is_selected: Mutex::new(false),
            is_loading: Mutex::new(false),
            property_changed: PropertyChannel::new(),
            selection_changed: EventChannel::new(),
        }
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn into_item(self) -> T {
        self.item
    }

    pub fn is_selected(&self) -> bool {
        *self.is_selected.lock()
    }

    /// 设置选中状态；仅在值确有变化时通知属性变更与选中变更观察者
    pub fn set_selected(&self, selected: bool) {
        if set_property(
            &self.is_selected,
            selected,
            property::IS_SELECTED,
            &self.property_changed,
        ) {
            self.selection_changed.emit(&selected);
        }
    }

    pub fn is_loading(&self) -> bool {
        *self.is_loading.lock()
    }

    pub fn set_loading(&self, loading: bool) {
        set_property(
            &self.is_loading,
            loading,
            property::IS_LOADING,
            &self.property_changed,
        );
    }

    pub fn property_changed(&self) -> &PropertyChannel {
        &self.property_changed
    }

    /// 选中状态变化时收到新值
    pub fn selection_changed(&self) -> &EventChannel<bool> {
        &self.selection_changed
    }
}
