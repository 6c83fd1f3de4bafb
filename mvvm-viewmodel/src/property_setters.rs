//! 按名称设置属性
//!
//! 以显式的“属性名 → 类型化设置器”表代替运行时反射：
//! 设置器在构造时注册，`set_value` 按名称查表并对值做类型检查。
//!
use crate::error::{ViewModelError, ViewModelResult};
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;

type Setter<T> = Box<dyn Fn(&T, &(dyn Any + Send + Sync)) -> bool + Send + Sync>;

struct Entry<T> {
    value_type: &'static str,
    setter: Setter<T>,
}

pub struct PropertySetters<T> {
    entries: HashMap<&'static str, Entry<T>>,
}

impl<T> Default for PropertySetters<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: 'static> fmt::Debug for PropertySetters<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("PropertySetters")
            .field("properties", &names)
            .finish()
    }
}

impl<T: 'static> PropertySetters<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册名为 `name`、值类型为 `V` 的设置器；同名时覆盖
    pub fn with<V, F>(mut self, name: &'static str, setter: F) -> Self
    where
        V: Any + Clone + Send + Sync,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        let setter: Setter<T> = Box::new(move |target, value| {
            let Some(value) = value.downcast_ref::<V>() else {
                return false;
            };
            setter(target, value.clone());
            true
        });
        self.entries.insert(
            name,
            Entry {
                value_type: type_name::<V>(),
                setter,
            },
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// 按名称设置属性值
    pub fn set_value(
        &self,
        target: &T,
        name: &str,
        value: &(dyn Any + Send + Sync),
    ) -> ViewModelResult<()> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ViewModelError::UnknownProperty(name.to_string()))?;

        if (entry.setter)(target, value) {
            Ok(())
        } else {
            Err(ViewModelError::PropertyType {
                property: name.to_string(),
                expected: entry.value_type,
            })
        }
    }
}
