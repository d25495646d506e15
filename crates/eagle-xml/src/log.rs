// crates/eagle-xml/src/log.rs

use crate::node::Document;

/// Trait for values that prefix log lines with their context.
pub(crate) trait LogMetadata {
    fn meta(&self) -> String;
}

impl LogMetadata for Document<'_> {
    fn meta(&self) -> String {
        format!("file={}, kind={}", self.label(), self.kind())
    }
}

impl<T: LogMetadata + ?Sized> LogMetadata for &T {
    fn meta(&self) -> String {
        (**self).meta()
    }
}

impl<T: LogMetadata + ?Sized> LogMetadata for &mut T {
    fn meta(&self) -> String {
        (**self).meta()
    }
}

// =============================================
// Logging Macros (namespaced under crate::log)
// =============================================

// ===== doc_info! =====
macro_rules! doc_info {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::info!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== doc_warn! =====
macro_rules! doc_warn {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::warn!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== doc_debug! =====
macro_rules! doc_debug {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::debug!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// Re-export macros for use in other files
pub(crate) use doc_debug;
pub(crate) use doc_info;
pub(crate) use doc_warn;
