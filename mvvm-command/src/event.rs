//! 观察者通道（EventChannel）
//!
//! 多播通知的显式建模：
//! - 观察者按订阅顺序被调用；
//! - 发布时对观察者列表做快照，调用期间不持有任何锁，观察者可在回调中订阅/退订；
//! - 观察者之间相互隔离：某个观察者 panic 不会阻止后续观察者收到事件，
//!   全部投递完成后再把第一个 panic 抛回发布方。
//!
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 订阅标识，用于退订
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub struct EventChannel<E> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionId, Observer<E>)>>,
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
        }
    }
}

impl<E> fmt::Debug for EventChannel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("observers", &self.len())
            .finish()
    }
}

impl<E> EventChannel<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件，返回退订所需的标识
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// 退订；未知标识返回 false
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按订阅顺序投递事件
    pub fn emit(&self, event: &E) {
        if let Some(payload) = self.deliver(event) {
            panic::resume_unwind(payload);
        }
    }

    /// 投递事件但不重抛观察者的 panic；返回是否有观察者 panic
    ///
    /// 供析构等不允许再展开的路径使用。
    pub fn emit_contained(&self, event: &E) -> bool {
        self.deliver(event).is_some()
    }

    fn deliver(&self, event: &E) -> Option<Box<dyn Any + Send>> {
        let snapshot: Vec<Observer<E>> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        let mut first_panic = None;
        for observer in snapshot {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(event))) {
                first_panic.get_or_insert(payload);
            }
        }
        first_panic
    }
}
