//! Stderr logging gated on an explicit verbosity level.
//!
//! The level travels with [`crate::config::SchedulingConfig`]; there is no
//! global logger. At level 0 every macro compiles down to a single integer
//! comparison and formats nothing.
//!
//! | level | macro             | what gets printed                              |
//! |-------|-------------------|------------------------------------------------|
//! | 0     | -                 | nothing                                        |
//! | 1     | `log_stages!`     | chosen mode, validation result, asset summary  |
//! | 2     | `log_placements!` | each task's dates, every push by a predecessor |
//! | 3     | `log_trace!`      | CPM timings, anchor offsets                    |
//!
//! Deeper levels are indented so a trace reads as an outline.

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_STAGES: u8 = 1;
pub const VERBOSITY_PLACEMENTS: u8 = 2;
pub const VERBOSITY_TRACE: u8 = 3;

/// Pipeline milestones, one line per stage per asset.
///
/// Used for: which path ran (sequential or dependency-aware), how many edges
/// survived validation, the date span of each asset, floor warnings.
#[macro_export]
macro_rules! log_stages {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_STAGES {
            eprintln!("[backplan] {}", format_args!($($arg)*));
        }
    };
}

/// Per-task placement.
///
/// Used for: the start/end each task lands on and the predecessor edge that
/// pushed it, if any.
#[macro_export]
macro_rules! log_placements {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_PLACEMENTS {
            eprintln!("[backplan]   {}", format_args!($($arg)*));
        }
    };
}

/// Used for: ES/EF/LS/LF/TF of every node and the offset the calendar
/// mapping is anchored on.
#[macro_export]
macro_rules! log_trace {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_TRACE {
            eprintln!("[backplan]     {}", format_args!($($arg)*));
        }
    };
}
