//! Structured logging system with visual formatting.
//!
//! This module provides a logging system designed for sunshade's visual output
//! style. It includes different log levels and special formatting functions for
//! creating visually appealing, structured output with Unicode box drawing
//! characters.
//!
//! The logger supports runtime enable/disable functionality for quiet operation
//! during automated processes or testing, plus a separate debug toggle wired to
//! the `debug` configuration key so per-tick tracing can be switched on for a
//! single device without recompiling.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

// Use AtomicBools instead of thread_local for thread safety
static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Main logging interface providing structured output formatting.
///
/// ## Logging Conventions
///
/// To maintain a consistent and readable log output, adhere to the following
/// conventions when using the visual formatting macros:
///
/// - **`log_block_start!`**:
///   - **Purpose**: Always use this to initiate a new, distinct conceptual block of log
///     information, especially for major state changes or significant events (e.g.
///     "Loaded configuration", "Controller initialized", "External lock raised").
///   - **Output**: Prepends an empty pipe `┃` for spacing from any previous log, then
///     prints `┣ message`.
///
/// - **`log_decorated!`**:
///   - **Purpose**: For messages that are part of an existing block started by
///     `log_block_start!`, or for simple single-line status messages.
///   - **Output**: Prints `┣ message`.
///
/// - **`log_indented!`**:
///   - **Purpose**: For nested data or detailed sub-items that belong to a parent
///     message. Useful for listing configuration items, multi-part details, etc.
///   - **Output**: Prints `┃   message` (pipe, three spaces, then message).
///
/// - **`log_pipe!`**:
///   - **Purpose**: Inserts a single, empty, prefixed line (`┃`) for vertical spacing,
///     typically before `log_warning!`, `log_error!` or an `anyhow` error message.
///
/// - **`log_version!`**:
///   - **Purpose**: Prints the application startup header. Typically called once.
///   - **Output**: `┏ sunshade vX.Y.Z ━━╸`.
///
/// - **`log_end!`**:
///   - **Purpose**: Prints the final log termination marker. Called once at shutdown.
///   - **Output**: `╹`.
///
/// - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**:
///   - **Purpose**: Standard semantic logging macros with a `[LEVEL]` prefix.
///     `log_debug!` additionally requires the debug toggle to be on.
pub struct Log;

impl Log {
    /// Enable or disable logging temporarily.
    ///
    /// This is useful for quiet operation during automated processes
    /// or testing where log output would interfere with results.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable or disable per-tick debug tracing.
    ///
    /// Set from the `debug` configuration key during bootstrap.
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if debug tracing is enabled.
    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }
}

// Public function that routes output (needed by macros)
pub fn write_output(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

// # Logging Macros

/// Log a decorated message, typically as part of an existing block or for standalone emphasis.
#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┣ {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┣ {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┃   {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┃   {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            $crate::logger::write_output("┃\n");
        }
    }};
}

/// Log a block start message, initiating a new conceptual block of information.
#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┃\n┣ {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┃\n┣ {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let version = env!("CARGO_PKG_VERSION");
            let formatted = format!("┏ sunshade v{version} ━━╸\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            $crate::logger::write_output("╹\n");
        }
    }};
}

/// Log a warning message with pipe prefix and yellow-colored text.
#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┣[\x1b[33mWARNING\x1b[0m] {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┣[\x1b[33mWARNING\x1b[0m] {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log an error message with pipe prefix and red-colored text.
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┣[\x1b[31mERROR\x1b[0m] {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┣[\x1b[31mERROR\x1b[0m] {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log an error message with a pipe prefix and terminal corner (standalone).
/// This adds a pipe before the error, similar to log_block_start!, to indicate flow termination.
#[macro_export]
macro_rules! log_error_exit {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┃\n┗[\x1b[31mERROR\x1b[0m] {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┃\n┗[\x1b[31mERROR\x1b[0m] {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log an informational message with pipe prefix and green-colored text.
#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┣[\x1b[32mINFO\x1b[0m] {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┣[\x1b[32mINFO\x1b[0m] {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log a debug/operational message with pipe prefix and green-colored text.
///
/// Only emitted when both logging and the debug toggle are enabled.
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() && Log::is_debug() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┣[\x1b[32mDEBUG\x1b[0m] {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() && Log::is_debug() {
            let expr = $expr;
            let formatted = format!("┣[\x1b[32mDEBUG\x1b[0m] {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log a critical message with pipe prefix and red-colored text.
#[macro_export]
macro_rules! log_critical {
    ($fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let message = format!($fmt $($arg)*);
            let formatted = format!("┣[\x1b[31mCRITICAL\x1b[0m] {message}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
    ($expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let expr = $expr;
            let formatted = format!("┣[\x1b[31mCRITICAL\x1b[0m] {expr}\n");
            $crate::logger::write_output(&formatted);
        }
    }};
}
