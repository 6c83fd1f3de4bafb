//! 参数类型约定
//!
//! 输入端以类型擦除的方式传参（`RawParam`），命令在内部恢复为声明的参数类型：
//! - 声明类型为 [`NoParam`] 时，缺省参数（`None`）视为有效；
//! - 其余类型下，缺省或类型不匹配的参数一律拒绝（`can_execute` 为 false，`execute` 静默忽略）。
//!
use std::any::Any;

/// 类型擦除的原始参数；`None` 表示“无参数”
pub type RawParam<'a> = Option<&'a (dyn Any + Send + Sync)>;

/// “无参数”标记类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoParam;

/// 将具体值包装为原始参数
pub fn raw<T: Any + Send + Sync>(value: &T) -> RawParam<'_> {
    Some(value)
}

/// 按类型约定恢复参数
pub fn accept<P: Any + Clone>(raw: RawParam<'_>) -> Option<P> {
    match raw {
        Some(value) => value.downcast_ref::<P>().cloned(),
        None => (&NoParam as &dyn Any).downcast_ref::<P>().cloned(),
    }
}
