//! 工作单元（Work）
//!
//! 命令把“做什么”委托给按值持有的工作策略：
//! - [`SyncWork`]：在调用方上下文内联运行；
//! - [`AsyncWork`]：可挂起，可选地派发到后台运行时。
//!
//! `Output` 为 `()` 时即“无结果”命令；否则成功后结果保留在命令上。
//! 闭包适配器 [`sync_fn`] / [`async_fn`] 便于直接用闭包构造命令。
//!
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;

/// 同步工作单元
pub trait SyncWork: Send + Sync + 'static {
    type Param: Any + Clone + Send + Sync;
    type Output: Send + 'static;

    /// 类型化的业务谓词
    fn can_execute(&self, _param: &Self::Param) -> bool {
        true
    }

    fn run(&self, param: Self::Param) -> anyhow::Result<Self::Output>;
}

/// 异步工作单元
#[async_trait]
pub trait AsyncWork: Send + Sync + 'static {
    type Param: Any + Clone + Send + Sync;
    type Output: Send + 'static;

    fn can_execute(&self, _param: &Self::Param) -> bool {
        true
    }

    /// 挂起只发生在这里，状态机的簿记本身从不挂起
    async fn run(&self, param: Self::Param) -> anyhow::Result<Self::Output>;
}

fn always<P>(_: &P) -> bool {
    true
}

/// 同步闭包工作单元
pub struct FnWork<P, O, C, R> {
    can: C,
    run: R,
    _marker: PhantomData<fn(P) -> O>,
}

pub fn sync_fn<P, O, R>(run: R) -> FnWork<P, O, fn(&P) -> bool, R>
where
    R: Fn(P) -> anyhow::Result<O>,
{
    FnWork {
        can: always::<P>,
        run,
        _marker: PhantomData,
    }
}

impl<P, O, C, R> FnWork<P, O, C, R> {
    /// 替换业务谓词
    pub fn with_predicate<C2>(self, can: C2) -> FnWork<P, O, C2, R>
    where
        C2: Fn(&P) -> bool,
    {
        FnWork {
            can,
            run: self.run,
            _marker: PhantomData,
        }
    }
}

impl<P, O, C, R> SyncWork for FnWork<P, O, C, R>
where
    P: Any + Clone + Send + Sync,
    O: Send + 'static,
    C: Fn(&P) -> bool + Send + Sync + 'static,
    R: Fn(P) -> anyhow::Result<O> + Send + Sync + 'static,
{
    type Param = P;
    type Output = O;

    fn can_execute(&self, param: &P) -> bool {
        (self.can)(param)
    }

    fn run(&self, param: P) -> anyhow::Result<O> {
        (self.run)(param)
    }
}

/// 异步闭包工作单元
pub struct AsyncFnWork<P, O, C, R> {
    can: C,
    run: R,
    _marker: PhantomData<fn(P) -> O>,
}

pub fn async_fn<P, O, R, Fut>(run: R) -> AsyncFnWork<P, O, fn(&P) -> bool, R>
where
    R: Fn(P) -> Fut,
    Fut: Future<Output = anyhow::Result<O>>,
{
    AsyncFnWork {
        can: always::<P>,
        run,
        _marker: PhantomData,
    }
}

impl<P, O, C, R> AsyncFnWork<P, O, C, R> {
    pub fn with_predicate<C2>(self, can: C2) -> AsyncFnWork<P, O, C2, R>
    where
        C2: Fn(&P) -> bool,
    {
        AsyncFnWork {
            can,
            run: self.run,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<P, O, C, R, Fut> AsyncWork for AsyncFnWork<P, O, C, R>
where
    P: Any + Clone + Send + Sync,
    O: Send + 'static,
    C: Fn(&P) -> bool + Send + Sync + 'static,
    R: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
{
    type Param = P;
    type Output = O;

    fn can_execute(&self, param: &P) -> bool {
        (self.can)(param)
    }

    async fn run(&self, param: P) -> anyhow::Result<O> {
        (self.run)(param).await
    }
}
