use std::collections::BTreeMap;

use crate::domain::{Context, Task};

const UNKNOWN_CONTEXT: &str = "Unknown";

/// One-line summary of tasks grouped by context id:
/// `private: Call mom, Pay rent; work: Review PR`.
pub fn format_tasks(contexts: &[Context], tasks: &[Task]) -> String {
    let mut by_context: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for task in tasks {
        by_context
            .entry(task.context)
            .or_default()
            .push(task.name.as_str());
    }

    by_context
        .into_iter()
        .map(|(context_id, names)| {
            let context_name = contexts
                .iter()
                .find(|context| context.id == context_id)
                .map(|context| context.name.as_str())
                .unwrap_or(UNKNOWN_CONTEXT);
            format!("{context_name}: {}", names.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let mut clipboard = arboard::Clipboard::new().map_err(|err| format!("clipboard unavailable: {err}"))?;
    clipboard
        .set_text(text)
        .map_err(|err| format!("failed to copy to clipboard: {err}"))
}

#[cfg(test)]
mod tests {
    use crate::domain::{Context, MONDAY, Task};

    use super::format_tasks;

    #[test]
    fn groups_by_context_in_id_order() {
        let contexts = vec![
            Context::none(),
            Context::new(2, "private"),
            Context::new(3, "work"),
        ];
        let tasks = vec![
            Task::new("a", "Review PR", 3, MONDAY),
            Task::new("b", "Call mom", 2, MONDAY),
            Task::new("c", "Pay rent", 2, MONDAY),
            Task::new("d", "Stretch", 1, MONDAY),
        ];

        assert_eq!(
            format_tasks(&contexts, &tasks),
            "all: Stretch; private: Call mom, Pay rent; work: Review PR"
        );
    }

    #[test]
    fn names_missing_contexts_unknown() {
        let tasks = vec![Task::new("a", "Orphan", 9, MONDAY)];
        assert_eq!(format_tasks(&[Context::none()], &tasks), "Unknown: Orphan");
        assert_eq!(format_tasks(&[Context::none()], &[]), "");
    }
}
