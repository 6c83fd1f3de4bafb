//! 数据视图模型（DataViewModel）
//!
//! 以一个类型化参数从模型加载数据的视图模型。它本身就是一个 [`ActionOwner`]，
//! 加载逻辑由 [`DataLoader`] 提供。
//!
//! `load` 与命令的参数策略不同：参数缺失或类型不符不会静默忽略，
//! 而是记录为 `InvalidParameter` 错误；加载器的错误同样记录在持有者的 `error` 中。
//!
use crate::action_owner::ActionOwner;
use crate::error::{ViewModelError, ViewModelResult};
use crate::property;
use async_trait::async_trait;
use futures_util::FutureExt;
use mvvm_command::error::panic_message;
use mvvm_command::notify::set_property;
use mvvm_command::{EventChannel, NoParam, PropertyChanged, RawParam};
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

const TARGET: &str = "mvvm::viewmodel";

/// 数据加载器
#[async_trait]
pub trait DataLoader: Send + Sync + 'static {
    /// 输入参数类型；使用 [`NoParam`] 表示无需参数
    type Param: Any + Clone + Send + Sync;

    async fn load(&self, owner: &ActionOwner, param: Self::Param) -> anyhow::Result<()>;
}

pub struct DataViewModel<L: DataLoader> {
    owner: ActionOwner,
    loader: L,
    parameter: Mutex<Option<L::Param>>,
    is_loaded: Mutex<bool>,
    done: EventChannel<()>,
}

impl<L: DataLoader> DataViewModel<L> {
    pub fn new(name: impl Into<String>, loader: L) -> Self {
        Self {
            owner: ActionOwner::new(name),
            loader,
            parameter: Mutex::new(None),
            is_loaded: Mutex::new(false),
            done: EventChannel::new(),
        }
    }

    pub fn owner(&self) -> &ActionOwner {
        &self.owner
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// 最近一次被接受的加载参数
    pub fn parameter(&self) -> Option<L::Param> {
        self.parameter.lock().clone()
    }

    pub fn is_loaded(&self) -> bool {
        *self.is_loaded.lock()
    }

    /// 加载成功后触发
    pub fn done(&self) -> &EventChannel<()> {
        &self.done
    }

    /// 校验参数、复位状态并运行加载器
    pub async fn load(&self, param: RawParam<'_>) {
        let param = match Self::validate(param) {
            Ok(param) => param,
            Err(err) => {
                warn!(target: TARGET, owner = self.owner.name(), error = %err, "load rejected");
                self.owner.set_error(Some(Arc::new(err.into())));
                return;
            }
        };

        *self.parameter.lock() = Some(param.clone());
        self.owner.property_changed().emit(&PropertyChanged {
            property: property::PARAMETER,
        });

        self.reset();

        let result = match AssertUnwindSafe(self.loader.load(&self.owner, param))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(ViewModelError::Panicked {
                owner: self.owner.name().to_string(),
                message: panic_message(&*payload),
            }
            .into()),
        };

        match result {
            Ok(()) => {
                debug!(target: TARGET, owner = self.owner.name(), "load finished");
                set_property(
                    &self.is_loaded,
                    true,
                    property::IS_LOADED,
                    self.owner.property_changed(),
                );
                self.done.emit(&());
            }
            Err(err) => {
                warn!(target: TARGET, owner = self.owner.name(), error = %err, "load failed");
                self.owner.set_error(Some(Arc::new(err)));
            }
        }
    }

    /// 清空错误、已加载与忙碌标志
    pub fn reset(&self) {
        self.owner.clear_error();
        set_property(
            &self.is_loaded,
            false,
            property::IS_LOADED,
            self.owner.property_changed(),
        );
        self.owner.set_busy(false);
    }

    fn validate(param: RawParam<'_>) -> ViewModelResult<L::Param> {
        // 无参数视图模型忽略传入值
        if let Some(marker) = (&NoParam as &dyn Any).downcast_ref::<L::Param>() {
            return Ok(marker.clone());
        }

        let expected = type_name::<L::Param>();
        match param {
            None => Err(ViewModelError::InvalidParameter {
                expected,
                found: "none",
            }),
            Some(value) => value.downcast_ref::<L::Param>().cloned().ok_or(
                ViewModelError::InvalidParameter {
                    expected,
                    found: "mismatched type",
                },
            ),
        }
    }
}
