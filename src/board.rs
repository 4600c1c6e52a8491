use std::collections::HashSet;

use log::{debug, info, warn};

use crate::domain::{
    Context, DAY_COUNT, INBOX, Task, current_iso_year, current_week, day_title, generate_id,
    is_valid_day, wrap_week,
};
use crate::list::FilteredList;
use crate::storage::{StorageError, TaskStore};

/// Eight day-buckets plus the week and context filter shown on top of them.
///
/// Only the focused list carries a cursor; every other list is deselected
/// and remembers its cursor for the next time it gains focus.
#[derive(Debug, Clone)]
pub struct Board {
    lists: [FilteredList; DAY_COUNT],
    last_focus: usize,
    week: i32,
    selected_context: Context,
}

impl Board {
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut by_day: [Vec<Task>; DAY_COUNT] = std::array::from_fn(|_| Vec::new());
        let mut seen_ids = HashSet::new();

        for mut task in tasks {
            if task.id.is_empty() || seen_ids.contains(&task.id) {
                let previous = std::mem::take(&mut task.id);
                task.id = unique_id(&seen_ids);
                info!(
                    "assigned id {} to task '{}' (previous id '{}')",
                    task.id, task.name, previous
                );
            }
            if !is_valid_day(task.day) {
                warn!(
                    "task {} had day {}, moving it to the inbox",
                    task.id, task.day
                );
                task.day = INBOX;
            }
            seen_ids.insert(task.id.clone());
            by_day[task.day].push(task);
        }

        let mut lists: [FilteredList; DAY_COUNT] = std::array::from_fn(FilteredList::new);
        for (list, mut tasks) in lists.iter_mut().zip(by_day) {
            tasks.sort_by_key(|task| task.pos);
            *list = FilteredList::with_tasks(list.day(), tasks);
        }

        let mut board = Self {
            lists,
            last_focus: INBOX,
            week: current_week(),
            selected_context: Context::none(),
        };
        board.lists[INBOX].restore_cursor();
        board
    }

    pub fn load<S: TaskStore + ?Sized>(store: &S) -> Result<Self, StorageError> {
        let board = Self::new(store.load_tasks()?);
        info!("loaded {} tasks", board.task_count());
        Ok(board)
    }

    pub fn save<S: TaskStore + ?Sized>(&self, store: &S) -> Result<(), StorageError> {
        let tasks = self.flatten_for_save();
        store.save_tasks(&tasks)?;
        debug!("saved {} tasks", tasks.len());
        Ok(())
    }

    pub fn week(&self) -> i32 {
        self.week
    }

    pub fn focus(&self) -> usize {
        self.last_focus
    }

    pub fn selected_context(&self) -> &Context {
        &self.selected_context
    }

    pub fn list(&self, day: usize) -> Option<&FilteredList> {
        self.lists.get(day)
    }

    /// Visible tasks of a day, in display order.
    pub fn tasks(&self, day: usize) -> &[Task] {
        self.lists.get(day).map(FilteredList::items).unwrap_or(&[])
    }

    pub fn selected_task(&self, day: usize) -> Option<&Task> {
        self.lists.get(day).and_then(FilteredList::selected)
    }

    pub fn task_count(&self) -> usize {
        self.lists.iter().map(|list| list.all_tasks().len()).sum()
    }

    pub fn is_context_used(&self, context_id: u32) -> bool {
        self.lists
            .iter()
            .flat_map(|list| list.all_tasks())
            .any(|task| task.context == context_id)
    }

    pub fn title(&self, day: usize) -> String {
        day_title(day, self.week, current_iso_year(), &self.selected_context)
    }

    /// Appends a new task to the focused day and returns its id.
    pub fn create_task(&mut self, name: impl Into<String>, context: u32) -> String {
        let id = self.fresh_id();
        let task = Task::new(id.clone(), name, context, self.last_focus);
        let list = &mut self.lists[self.last_focus];
        let visible = list.push(task);
        if visible && list.cursor().is_none() {
            list.select(list.len() - 1);
        }
        debug!(
            "created task {id} in day {} (visible: {visible})",
            self.last_focus
        );
        id
    }

    pub fn update_task(&mut self, name: &str, context: u32) -> bool {
        let updated = self.lists[self.last_focus].update_selected(name, context);
        if !updated {
            debug!("update rejected: no task selected in day {}", self.last_focus);
        }
        updated
    }

    pub fn move_up(&mut self, day: usize) -> bool {
        self.lists.get_mut(day).is_some_and(FilteredList::move_up)
    }

    pub fn move_down(&mut self, day: usize) -> bool {
        self.lists.get_mut(day).is_some_and(FilteredList::move_down)
    }

    pub fn toggle_done(&mut self, day: usize) -> bool {
        self.lists.get_mut(day).is_some_and(FilteredList::toggle_done)
    }

    /// Cursor movement is limited to the focused day; other days stay
    /// deselected until they gain focus.
    pub fn select_next(&mut self, day: usize) -> bool {
        day == self.last_focus && self.lists[day].select_next()
    }

    pub fn select_prev(&mut self, day: usize) -> bool {
        day == self.last_focus && self.lists[day].select_prev()
    }

    /// Deletes the selected task of a day, but only once it is done.
    pub fn delete_task(&mut self, day: usize) -> bool {
        let Some(list) = self.lists.get_mut(day) else {
            return false;
        };
        if !list.selected().is_some_and(|task| task.done) {
            debug!("delete rejected in day {day}: no done task selected");
            return false;
        }
        list.take_selected().is_some()
    }

    pub fn move_task(&mut self, from: usize, to: usize) -> bool {
        if !is_valid_day(from) || !is_valid_day(to) || from == to {
            return false;
        }
        let Some(mut task) = self.lists[from].take_selected() else {
            return false;
        };
        task.day = to;
        debug!("moved task {} from day {from} to day {to}", task.id);
        self.lists[to].push(task);
        true
    }

    pub fn set_context(&mut self, context: Context) {
        debug!("context filter set to '{}' ({})", context.name, context.id);
        for list in &mut self.lists {
            list.set_filter(&context);
        }
        self.selected_context = context;

        let focused = &mut self.lists[self.last_focus];
        if focused.cursor().is_none() {
            focused.restore_cursor();
        }
    }

    /// Moves the live cursor to `day`, remembering where it was on the list
    /// that loses focus.
    pub fn deselect_and_restore_focus(&mut self, day: usize) -> bool {
        if !is_valid_day(day) {
            return false;
        }
        let previous = &mut self.lists[self.last_focus];
        previous.save_cursor();
        previous.deselect();

        self.last_focus = day;
        self.lists[day].restore_cursor();
        true
    }

    pub fn set_week(&mut self, week: i32) {
        self.week = wrap_week(week);
    }

    pub fn inc_week(&mut self) {
        self.set_week(self.week + 1);
    }

    pub fn dec_week(&mut self) {
        self.set_week(self.week - 1);
    }

    /// All tasks of the board, each day in its authoritative order with
    /// `pos` set to the index within that day.
    pub fn flatten_for_save(&self) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.task_count());
        for list in &self.lists {
            for (pos, task) in list.all_tasks().iter().enumerate() {
                let mut task = task.clone();
                task.pos = pos;
                tasks.push(task);
            }
        }
        tasks
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = generate_id();
            if !self.lists.iter().any(|list| list.contains_id(&id)) {
                return id;
            }
        }
    }
}

fn unique_id(taken: &HashSet<String>) -> String {
    loop {
        let id = generate_id();
        if !taken.contains(&id) {
            return id;
        }
    }
}
