use crate::domain::{Context, Task};

/// Whether a context filter hides part of the list.
///
/// While filtered, `shadow` is the complete ordering for the day and the
/// visible items are exactly the shadow entries whose context matches.
#[derive(Debug, Clone)]
enum FilterState {
    Unfiltered,
    Filtered { context: Context, shadow: Vec<Task> },
}

/// Ordered tasks of one day-bucket with a selection cursor.
#[derive(Debug, Clone)]
pub struct FilteredList {
    day: usize,
    items: Vec<Task>,
    cursor: Option<usize>,
    saved_cursor: usize,
    filter: FilterState,
}

impl FilteredList {
    pub fn new(day: usize) -> Self {
        Self::with_tasks(day, Vec::new())
    }

    pub fn with_tasks(day: usize, tasks: Vec<Task>) -> Self {
        Self {
            day,
            items: tasks,
            cursor: None,
            saved_cursor: 0,
            filter: FilterState::Unfiltered,
        }
    }

    pub fn day(&self) -> usize {
        self.day
    }

    pub fn items(&self) -> &[Task] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn selected(&self) -> Option<&Task> {
        self.cursor.and_then(|index| self.items.get(index))
    }

    pub fn shadow(&self) -> Option<&[Task]> {
        match &self.filter {
            FilterState::Unfiltered => None,
            FilterState::Filtered { shadow, .. } => Some(shadow.as_slice()),
        }
    }

    pub fn active_filter(&self) -> Option<&Context> {
        match &self.filter {
            FilterState::Unfiltered => None,
            FilterState::Filtered { context, .. } => Some(context),
        }
    }

    /// The authoritative ordering: the shadow while filtered, else the items.
    pub fn all_tasks(&self) -> &[Task] {
        self.shadow().unwrap_or(&self.items)
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.cursor = Some(index);
        true
    }

    pub fn select_next(&mut self) -> bool {
        match self.cursor {
            None if !self.items.is_empty() => self.select(0),
            Some(index) => self.select(index + 1),
            None => false,
        }
    }

    pub fn select_prev(&mut self) -> bool {
        match self.cursor {
            None if !self.items.is_empty() => self.select(0),
            Some(index) if index > 0 => self.select(index - 1),
            _ => false,
        }
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = self.cursor.unwrap_or(0);
    }

    /// Restores the saved cursor, clamped to the last item. An empty list
    /// ends up without a selection.
    pub fn restore_cursor(&mut self) {
        self.cursor = if self.is_empty() {
            None
        } else {
            Some(self.saved_cursor.min(self.len() - 1))
        };
    }

    pub fn deselect(&mut self) {
        self.cursor = None;
    }

    pub fn move_up(&mut self) -> bool {
        let Some(index) = self.cursor else {
            return false;
        };
        if index == 0 || index >= self.items.len() {
            return false;
        }
        self.swap_items(index - 1, index);
        self.cursor = Some(index - 1);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let Some(index) = self.cursor else {
            return false;
        };
        if index + 1 >= self.items.len() {
            return false;
        }
        self.swap_items(index, index + 1);
        self.cursor = Some(index + 1);
        true
    }

    pub fn toggle_done(&mut self) -> bool {
        let Some(task) = self.cursor.and_then(|index| self.items.get_mut(index)) else {
            return false;
        };
        task.done = !task.done;
        let updated = task.clone();
        self.sync_shadow_entry(&updated);
        true
    }

    pub fn set_filter(&mut self, context: &Context) {
        let previous = std::mem::replace(&mut self.filter, FilterState::Unfiltered);
        match (previous, context.is_none()) {
            (FilterState::Unfiltered, true) => {}
            (FilterState::Unfiltered, false) => self.apply_filter(context),
            (FilterState::Filtered { shadow, .. }, true) => {
                self.items = shadow;
            }
            (FilterState::Filtered { shadow, .. }, false) => {
                self.items = shadow;
                self.apply_filter(context);
            }
        }
        self.clamp_cursor();
    }

    /// Appends a task at the end of the day. While filtered, a task outside
    /// the active context only lands in the shadow. Returns whether the task
    /// is visible.
    pub(crate) fn push(&mut self, task: Task) -> bool {
        match &mut self.filter {
            FilterState::Unfiltered => {
                self.items.push(task);
                true
            }
            FilterState::Filtered { context, shadow } => {
                let visible = task.context == context.id;
                shadow.push(task.clone());
                if visible {
                    self.items.push(task);
                }
                visible
            }
        }
    }

    /// Removes the selected task from the items and the shadow.
    pub(crate) fn take_selected(&mut self) -> Option<Task> {
        let index = self.cursor.filter(|index| *index < self.items.len())?;
        let task = self.items.remove(index);
        if let FilterState::Filtered { shadow, .. } = &mut self.filter {
            shadow.retain(|entry| entry.id != task.id);
        }
        self.clamp_cursor();
        Some(task)
    }

    /// Renames and re-tags the selected task. A task that no longer matches
    /// the active filter is hidden right away.
    pub(crate) fn update_selected(&mut self, name: &str, context: u32) -> bool {
        let Some(index) = self.cursor.filter(|index| *index < self.items.len()) else {
            return false;
        };
        let task = &mut self.items[index];
        task.name = name.to_string();
        task.context = context;
        let updated = task.clone();
        self.sync_shadow_entry(&updated);

        let hidden = self
            .active_filter()
            .is_some_and(|filter| filter.id != context);
        if hidden {
            self.items.remove(index);
            self.clamp_cursor();
        }
        true
    }

    pub(crate) fn contains_id(&self, id: &str) -> bool {
        self.all_tasks().iter().any(|task| task.id == id)
    }

    fn apply_filter(&mut self, context: &Context) {
        let shadow = self.items.clone();
        self.items.retain(|task| task.context == context.id);
        self.filter = FilterState::Filtered {
            context: context.clone(),
            shadow,
        };
    }

    fn swap_items(&mut self, upper: usize, lower: usize) {
        let upper_id = self.items[upper].id.clone();
        let lower_id = self.items[lower].id.clone();
        self.items.swap(upper, lower);

        if let FilterState::Filtered { shadow, .. } = &mut self.filter {
            let upper_slot = shadow.iter().position(|task| task.id == upper_id);
            let lower_slot = shadow.iter().position(|task| task.id == lower_id);
            if let (Some(upper_slot), Some(lower_slot)) = (upper_slot, lower_slot) {
                shadow.swap(upper_slot, lower_slot);
            }
        }
    }

    fn sync_shadow_entry(&mut self, updated: &Task) {
        if let FilterState::Filtered { shadow, .. } = &mut self.filter {
            if let Some(entry) = shadow.iter_mut().find(|entry| entry.id == updated.id) {
                *entry = updated.clone();
            }
        }
    }

    fn clamp_cursor(&mut self) {
        if let Some(index) = self.cursor {
            self.cursor = if self.items.is_empty() {
                None
            } else {
                Some(index.min(self.items.len() - 1))
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{Context, MONDAY, Task};

    use super::FilteredList;

    fn list_with(tasks: &[(&str, u32)]) -> FilteredList {
        let tasks = tasks
            .iter()
            .map(|(id, context)| Task::new(*id, format!("Task {id}"), *context, MONDAY))
            .collect();
        FilteredList::with_tasks(MONDAY, tasks)
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    fn assert_shadow_consistent(list: &FilteredList) {
        let Some(shadow) = list.shadow() else {
            return;
        };
        let filter = list.active_filter().expect("filtered list has a context");
        let expected = shadow
            .iter()
            .filter(|task| task.context == filter.id)
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(list.items(), expected.as_slice());
    }

    #[test]
    fn moves_selected_item_up_and_down() {
        let mut list = list_with(&[("a", 1), ("b", 1), ("c", 1)]);
        list.select(1);

        assert!(list.move_up());
        assert_eq!(ids(list.items()), vec!["b", "a", "c"]);
        assert_eq!(list.cursor(), Some(0));

        assert!(list.move_down());
        assert!(list.move_down());
        assert_eq!(ids(list.items()), vec!["a", "c", "b"]);
        assert_eq!(list.cursor(), Some(2));
    }

    #[test]
    fn refuses_moves_past_boundaries() {
        let mut list = list_with(&[("a", 1), ("b", 1), ("c", 1)]);
        list.select(0);
        assert!(!list.move_up());
        assert_eq!(list.cursor(), Some(0));

        list.select(2);
        assert!(!list.move_down());
        assert_eq!(ids(list.items()), vec!["a", "b", "c"]);
        assert_eq!(list.cursor(), Some(2));
    }

    #[test]
    fn refuses_operations_without_selection() {
        let mut list = list_with(&[("a", 1), ("b", 1)]);
        assert!(!list.move_up());
        assert!(!list.move_down());
        assert!(!list.toggle_done());
        assert!(list.take_selected().is_none());
        assert!(!list.update_selected("x", 1));
    }

    #[test]
    fn toggling_twice_restores_done_and_order() {
        let mut list = list_with(&[("a", 1), ("b", 1)]);
        list.select(0);

        assert!(list.toggle_done());
        assert!(list.items()[0].done);
        assert!(list.toggle_done());
        assert!(!list.items()[0].done);
        assert_eq!(ids(list.items()), vec!["a", "b"]);
        assert_eq!(list.cursor(), Some(0));
    }

    #[test]
    fn toggling_twice_while_filtered_keeps_pos_and_shadow() {
        let tasks = [("a", 2), ("b", 3), ("c", 2)]
            .iter()
            .enumerate()
            .map(|(pos, (id, context))| {
                let mut task = Task::new(*id, format!("Task {id}"), *context, MONDAY);
                task.pos = pos;
                task
            })
            .collect();
        let mut list = FilteredList::with_tasks(MONDAY, tasks);
        let before = list.all_tasks().to_vec();

        list.set_filter(&Context::new(2, "private"));
        list.select(1);
        assert!(list.toggle_done());
        assert!(list.toggle_done());

        assert_eq!(list.items()[1].pos, 2);
        assert_eq!(list.shadow().map(|shadow| shadow.to_vec()), Some(before.clone()));
        assert_shadow_consistent(&list);

        list.set_filter(&Context::none());
        assert_eq!(list.items(), before.as_slice());
    }

    #[test]
    fn filtering_then_clearing_restores_exact_order() {
        let mut list = list_with(&[("a", 2), ("b", 3), ("c", 2), ("d", 3), ("e", 1)]);
        let before = list.items().to_vec();

        list.set_filter(&Context::new(2, "private"));
        assert_eq!(ids(list.items()), vec!["a", "c"]);
        assert_eq!(list.shadow().map(|shadow| shadow.len()), Some(5));
        assert_shadow_consistent(&list);

        list.set_filter(&Context::none());
        assert_eq!(list.items(), before.as_slice());
        assert!(list.shadow().is_none());
        assert!(list.active_filter().is_none());
    }

    #[test]
    fn switching_filters_undoes_the_previous_one() {
        let mut list = list_with(&[("a", 2), ("b", 3), ("c", 2)]);
        list.set_filter(&Context::new(2, "private"));
        list.set_filter(&Context::new(3, "work"));

        assert_eq!(ids(list.items()), vec!["b"]);
        assert_eq!(list.shadow().map(ids), Some(vec!["a", "b", "c"]));
        assert_shadow_consistent(&list);
    }

    #[test]
    fn clearing_an_unfiltered_list_is_a_no_op() {
        let mut list = list_with(&[("a", 2)]);
        list.select(0);
        list.set_filter(&Context::none());
        assert_eq!(ids(list.items()), vec!["a"]);
        assert_eq!(list.cursor(), Some(0));
        assert!(list.shadow().is_none());
    }

    #[test]
    fn toggle_while_filtered_reaches_the_shadow() {
        let mut list = list_with(&[("a", 1), ("b", 2), ("c", 1)]);
        list.set_filter(&Context::new(1, "context one"));
        assert_eq!(ids(list.items()), vec!["a", "c"]);

        list.select(0);
        assert!(list.toggle_done());
        list.set_filter(&Context::none());

        assert_eq!(ids(list.items()), vec!["a", "b", "c"]);
        assert!(list.items()[0].done);
        assert!(!list.items()[1].done);
        assert!(!list.items()[2].done);
    }

    #[test]
    fn reordering_while_filtered_survives_filter_clear() {
        let mut list = list_with(&[("a", 2), ("b", 3), ("c", 2)]);
        list.set_filter(&Context::new(2, "private"));
        list.select(1);

        assert!(list.move_up());
        assert_eq!(ids(list.items()), vec!["c", "a"]);
        assert_shadow_consistent(&list);

        list.set_filter(&Context::none());
        assert_eq!(ids(list.items()), vec!["c", "b", "a"]);
    }

    #[test]
    fn push_while_filtered_hides_other_contexts() {
        let mut list = list_with(&[("a", 2)]);
        list.set_filter(&Context::new(2, "private"));

        assert!(list.push(Task::new("b", "visible", 2, MONDAY)));
        assert!(!list.push(Task::new("c", "hidden", 3, MONDAY)));
        assert_eq!(ids(list.items()), vec!["a", "b"]);
        assert_eq!(list.shadow().map(ids), Some(vec!["a", "b", "c"]));
        assert_shadow_consistent(&list);
    }

    #[test]
    fn take_selected_removes_from_shadow() {
        let mut list = list_with(&[("a", 2), ("b", 3), ("c", 2)]);
        list.set_filter(&Context::new(2, "private"));
        list.select(1);

        let taken = list.take_selected().expect("selected task");
        assert_eq!(taken.id, "c");
        assert_eq!(list.cursor(), Some(0));
        assert_eq!(list.shadow().map(ids), Some(vec!["a", "b"]));

        list.set_filter(&Context::none());
        assert_eq!(ids(list.items()), vec!["a", "b"]);
    }

    #[test]
    fn update_away_from_filter_hides_task_immediately() {
        let mut list = list_with(&[("a", 2), ("b", 2)]);
        list.set_filter(&Context::new(2, "private"));
        list.select(1);

        assert!(list.update_selected("renamed", 3));
        assert_eq!(ids(list.items()), vec!["a"]);
        assert_eq!(list.cursor(), Some(0));
        assert_shadow_consistent(&list);

        list.set_filter(&Context::none());
        assert_eq!(list.items()[1].name, "renamed");
        assert_eq!(list.items()[1].context, 3);
    }

    #[test]
    fn restores_saved_cursor() {
        let mut list = list_with(&[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1)]);
        list.select(3);
        list.save_cursor();
        list.select(0);

        list.restore_cursor();
        assert_eq!(list.cursor(), Some(3));
    }

    #[test]
    fn restore_clamps_to_last_item() {
        let mut list = list_with(&[("a", 2), ("b", 3), ("c", 3)]);
        list.select(2);
        list.save_cursor();
        list.deselect();
        list.set_filter(&Context::new(2, "private"));

        list.restore_cursor();
        assert_eq!(list.cursor(), Some(0));

        let mut empty = FilteredList::new(MONDAY);
        empty.restore_cursor();
        assert_eq!(empty.cursor(), None);
    }

    #[test]
    fn filtering_keeps_a_deselected_list_deselected() {
        let mut list = list_with(&[("a", 2), ("b", 3)]);
        list.set_filter(&Context::new(3, "work"));
        assert_eq!(list.cursor(), None);
    }

    #[test]
    fn navigates_within_bounds() {
        let mut list = list_with(&[("a", 1), ("b", 1)]);
        assert!(list.select_next());
        assert_eq!(list.cursor(), Some(0));
        assert!(list.select_next());
        assert!(!list.select_next());
        assert_eq!(list.cursor(), Some(1));
        assert!(list.select_prev());
        assert!(!list.select_prev());
        assert_eq!(list.cursor(), Some(0));
    }
}
