//! Page navigation targets

/// Where a navigation request goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavTarget {
    First,
    Prev,
    Next,
    Last,
}

impl std::str::FromStr for NavTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "home" => Ok(Self::First),
            "prev" | "previous" => Ok(Self::Prev),
            "next" => Ok(Self::Next),
            "last" | "end" => Ok(Self::Last),
            other => Err(format!("unknown navigation target '{other}'")),
        }
    }
}

/// Index reached from `current` in a document of `page_count` pages.
///
/// Next and previous clamp at the ends.
pub fn resolve_nav_target(current: usize, page_count: usize, target: NavTarget) -> usize {
    if page_count == 0 {
        return 0;
    }

    let max_index = page_count - 1;
    match target {
        NavTarget::First => 0,
        NavTarget::Prev => current.saturating_sub(1).min(max_index),
        NavTarget::Next => current.saturating_add(1).min(max_index),
        NavTarget::Last => max_index,
    }
}
