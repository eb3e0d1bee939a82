use crate::calendar::CalendarDay;
use crate::models::Task;

/// Flips the completion state of `task` on `day`.
///
/// # Returns
/// - `true` if the occurrence is now marked complete.
/// - `false` if the mark was removed.
pub fn toggle(task: &mut Task, day: CalendarDay) -> bool {
    if task.completed_days.remove(&day) {
        false
    } else {
        task.completed_days.insert(day);
        true
    }
}

/// Whether the occurrence of `task` on `day` was marked complete.
pub fn is_completed(task: &Task, day: CalendarDay) -> bool {
    task.completed_days.contains(&day)
}
