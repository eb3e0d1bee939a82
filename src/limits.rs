//! Free/premium entitlement checks.

/// Per-tier caps. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_recurring_tasks: Option<usize>,
    pub max_tags: Option<usize>,
    pub max_monthly_days: Option<usize>,
}

impl Limits {
    pub const FREE: Limits = Limits {
        max_recurring_tasks: Some(1),
        max_tags: Some(3),
        max_monthly_days: Some(1),
    };

    pub const PREMIUM: Limits = Limits {
        max_recurring_tasks: None,
        max_tags: None,
        max_monthly_days: None,
    };

    pub fn for_tier(is_premium: bool) -> Limits {
        if is_premium { Limits::PREMIUM } else { Limits::FREE }
    }
}

/// A new recurring task may be added while under the limit.
pub fn can_add_recurring_task(is_premium: bool, current_recurring: usize, limit: usize) -> bool {
    is_premium || current_recurring < limit
}

/// A new tag may be added while under the limit.
pub fn can_add_tag(is_premium: bool, current_tags: usize, limit: usize) -> bool {
    is_premium || current_tags < limit
}

/// A monthly task may carry at most `limit` day numbers on the free tier.
pub fn can_select_monthly_days(is_premium: bool, selected: usize, limit: usize) -> bool {
    is_premium || selected <= limit
}
