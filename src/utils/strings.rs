//! Naming helpers.

use heck::ToSnakeCase;

/// `snake_case` form of a name, e.g. `"Bot Core"` -> `"bot_core"`.
pub fn snake_case(name: &str) -> String {
    name.to_snake_case()
}

/// Identifier of a command path, e.g. `["jojo", "module", "list"]` -> `"jojo_module_list"`.
pub fn command_id<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|segment| segment.as_ref().to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Human readable form of a duration in seconds, e.g. `"2d 3h"`.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}
