//! 视图模型上的可观察属性名
pub const IS_BUSY: &str = "is_busy";
pub const ERROR: &str = "error";
pub const IS_LOADED: &str = "is_loaded";
pub const PARAMETER: &str = "parameter";
pub const IS_SELECTED: &str = "is_selected";
pub const IS_LOADING: &str = "is_loading";
