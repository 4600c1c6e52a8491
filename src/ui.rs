use std::error::Error;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use log::{debug, info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::board::Board;
use crate::clipboard::{copy_to_clipboard, format_tasks};
use crate::domain::{Context, ContextCatalog, DAY_COUNT, INBOX, SUNDAY, today};
use crate::list::FilteredList;
use crate::storage::{StorageError, TaskStore};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const DONE_TASK_COLOR: Color = Color::DarkGray;
const STATUS_TTL: Duration = Duration::from_secs(2);
const MIN_WIDTH: u16 = 120;
const MIN_HEIGHT: u16 = 40;
const CONTEXTS_PANEL_WIDTH: u16 = 28;

const HELP_LINES: [&str; 5] = [
	"tab/shift+tab next/prev day | esc inbox | 1-7 focus day | up/down select | left/right week",
	"shift+up/down reorder | shift+left/right move to prev/next day | t move to today | i move to inbox",
	"n new task | enter edit task | space toggle done | backspace delete done task",
	"c contexts | k copy tasks | ? help | q quit",
	"contexts: enter apply filter | n new context | backspace delete context | esc close",
];

pub fn run_dashboard<S: TaskStore + ?Sized>(
	board: &mut Board,
	catalog: &mut ContextCatalog,
	store: &S,
	autosave: Duration,
) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, board, catalog, store, autosave);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop<S: TaskStore + ?Sized>(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	board: &mut Board,
	catalog: &mut ContextCatalog,
	store: &S,
	autosave: Duration,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();
	let mut last_save = Instant::now();

	loop {
		terminal.draw(|frame| draw_dashboard(frame, &app, board, catalog))?;

		if event::poll(Duration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind == KeyEventKind::Press && handle_key(&mut app, key, board, catalog) {
					break;
				}
			}
		}

		if last_save.elapsed() >= autosave {
			if let Err(err) = persist(board, catalog, store) {
				warn!("autosave failed: {err}");
				app.set_status(format!("error: autosave failed: {err}"));
			}
			last_save = Instant::now();
		}
	}

	persist(board, catalog, store)?;
	info!("saved board on quit");
	Ok(())
}

fn persist<S: TaskStore + ?Sized>(board: &Board, catalog: &ContextCatalog, store: &S) -> Result<(), StorageError> {
	board.save(store)?;
	store.save_contexts(catalog.all())
}

fn draw_dashboard(frame: &mut Frame, app: &App, board: &Board, catalog: &ContextCatalog) {
	let area = frame.area();
	if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
		render_too_small(frame, area);
		return;
	}

	let footer_height = if app.show_help {
		HELP_LINES.len() as u16 + 3
	} else {
		4
	};
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(12), Constraint::Length(footer_height)])
		.split(area);

	let board_area = if let InputMode::Contexts(view) = &app.mode {
		let body = Layout::default()
			.direction(Direction::Horizontal)
			.constraints([Constraint::Length(CONTEXTS_PANEL_WIDTH), Constraint::Min(40)])
			.split(layout[0]);
		render_contexts_panel(frame, body[0], view, board, catalog);
		body[1]
	} else {
		layout[0]
	};

	render_board(frame, board_area, app, board);
	render_footer(frame, layout[1], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_too_small(frame: &mut Frame, area: Rect) {
	let message = Paragraph::new(vec![
		Line::from("Terminal too small"),
		Line::from(format!(
			"need {MIN_WIDTH}x{MIN_HEIGHT}, have {}x{}",
			area.width, area.height
		)),
	])
	.alignment(Alignment::Center);
	frame.render_widget(message, area);
}

fn render_board(frame: &mut Frame, area: Rect, app: &App, board: &Board) {
	let rows = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
		.split(area);

	let days_per_row = DAY_COUNT / 2;
	for (row_index, row_area) in rows.iter().enumerate() {
		let columns = Layout::default()
			.direction(Direction::Horizontal)
			.constraints([Constraint::Ratio(1, days_per_row as u32); DAY_COUNT / 2])
			.split(*row_area);
		for (column, panel_area) in columns.iter().enumerate() {
			let day = row_index * days_per_row + column;
			let focused = day == board.focus() && matches!(app.mode, InputMode::Normal);
			render_day_panel(frame, *panel_area, board, day, focused);
		}
	}
}

fn render_day_panel(frame: &mut Frame, area: Rect, board: &Board, day: usize, focused: bool) {
	let items = board
		.tasks(day)
		.iter()
		.map(|task| {
			let style = if task.done {
				Style::default().fg(DONE_TASK_COLOR)
			} else {
				Style::default()
			};
			ListItem::new(task.title()).style(style)
		})
		.collect::<Vec<_>>();

	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.border_style(border_style(focused))
				.title(board.title(day)),
		)
		.highlight_symbol("> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	state.select(board.list(day).and_then(FilteredList::cursor));
	frame.render_stateful_widget(list, area, &mut state);
}

fn render_contexts_panel(frame: &mut Frame, area: Rect, view: &ContextView, board: &Board, catalog: &ContextCatalog) {
	let active_id = board.selected_context().id;
	let items = catalog
		.all()
		.iter()
		.map(|context| {
			if context.id == active_id {
				ListItem::new(format!("* {}", context.name)).style(Style::default().add_modifier(Modifier::BOLD))
			} else {
				ListItem::new(format!("  {}", context.name))
			}
		})
		.collect::<Vec<_>>();

	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.border_style(border_style(true))
				.title("Contexts"),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	state.select(Some(view.selected.min(catalog.all().len().saturating_sub(1))));
	frame.render_stateful_widget(list, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let status = app.visible_status(Instant::now()).unwrap_or("");
	let mut footer_lines = match &app.mode {
		InputMode::Normal => vec![Line::from("? help | n new | enter edit | space done | c contexts | q quit")],
		InputMode::Contexts(_) => vec![Line::from("enter apply | n new context | backspace delete | esc close")],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
		],
		InputMode::Select(select) => vec![Line::from(format!(
			"{}: {}",
			select.title,
			select
				.selected_option()
				.map(|option| option.label.as_str())
				.unwrap_or("(none)")
		))],
	};
	footer_lines.push(Line::from(status.to_string()));
	if app.show_help {
		footer_lines.extend(HELP_LINES.iter().map(|line| Line::from(*line)));
	}

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(40, 40, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.map(|option| ListItem::new(option.label.clone()))
			.collect::<Vec<_>>()
	};

	let current = if select.options.is_empty() {
		0
	} else {
		select.selected.saturating_add(1)
	};
	let total = select.options.len();
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("{} ({current}/{total})", select.title)),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len().saturating_sub(1))));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

/// Dispatches one key press. Returns `true` when the dashboard should quit.
fn handle_key(app: &mut App, key: KeyEvent, board: &mut Board, catalog: &mut ContextCatalog) -> bool {
	match &app.mode {
		InputMode::Normal => handle_normal_key(app, key, board, catalog),
		InputMode::Contexts(_) => handle_contexts_key(app, key.code, board, catalog),
		InputMode::Prompt(_) => handle_prompt_key(app, key.code, board, catalog),
		InputMode::Select(_) => handle_select_key(app, key.code, board),
	}
}

fn handle_normal_key(app: &mut App, key: KeyEvent, board: &mut Board, catalog: &ContextCatalog) -> bool {
	let focus = board.focus();
	let shift = key.modifiers.contains(KeyModifiers::SHIFT);

	match key.code {
		KeyCode::Char('q') => return true,
		KeyCode::Char('?') => app.show_help = !app.show_help,
		KeyCode::Tab => {
			board.deselect_and_restore_focus((focus + 1) % DAY_COUNT);
		}
		KeyCode::BackTab => {
			board.deselect_and_restore_focus((focus + DAY_COUNT - 1) % DAY_COUNT);
		}
		KeyCode::Esc => {
			board.deselect_and_restore_focus(INBOX);
		}
		KeyCode::Char(digit @ '1'..='7') => {
			board.deselect_and_restore_focus(usize::from(digit as u8 - b'0'));
		}
		KeyCode::Up if shift => {
			board.move_up(focus);
		}
		KeyCode::Down if shift => {
			board.move_down(focus);
		}
		KeyCode::Up => {
			board.select_prev(focus);
		}
		KeyCode::Down => {
			board.select_next(focus);
		}
		KeyCode::Left if shift => {
			if let Some(target) = focus.checked_sub(1) {
				move_selected(app, board, focus, target);
			}
		}
		KeyCode::Right if shift => {
			if focus < SUNDAY {
				move_selected(app, board, focus, focus + 1);
			}
		}
		KeyCode::Left => board.dec_week(),
		KeyCode::Right => board.inc_week(),
		KeyCode::Char('t') => move_selected(app, board, focus, today()),
		KeyCode::Char('i') => move_selected(app, board, focus, INBOX),
		KeyCode::Char(' ') => {
			if !board.toggle_done(focus) {
				app.set_status("No task selected");
			}
		}
		KeyCode::Backspace => {
			let selected = board.selected_task(focus).map(|task| (task.done, task.name.clone()));
			match selected {
				Some((true, name)) => {
					board.delete_task(focus);
					app.set_status(format!("Deleted task: {name}"));
				}
				Some((false, _)) => app.set_status("Only done tasks can be deleted"),
				None => app.set_status("No task selected"),
			}
		}
		KeyCode::Char('n') => {
			app.mode = InputMode::Prompt(PromptState::new("New task", PromptKind::TaskName { editing: false }));
		}
		KeyCode::Enter => match board.selected_task(focus) {
			Some(task) => {
				let mut prompt = PromptState::new("Edit task", PromptKind::TaskName { editing: true });
				prompt.input = task.name.clone();
				app.mode = InputMode::Prompt(prompt);
			}
			None => app.set_status("No task selected"),
		},
		KeyCode::Char('c') => {
			let selected = catalog.position(board.selected_context().id).unwrap_or(0);
			app.mode = InputMode::Contexts(ContextView { selected });
		}
		KeyCode::Char('k') => copy_day(app, board, catalog, focus),
		_ => {}
	}

	false
}

fn move_selected(app: &mut App, board: &mut Board, from: usize, to: usize) {
	if from == to || board.selected_task(from).is_none() {
		return;
	}
	if board.move_task(from, to) {
		debug!("moved selected task from day {from} to day {to}");
	} else {
		app.set_status("Task could not be moved");
	}
}

fn copy_day(app: &mut App, board: &Board, catalog: &ContextCatalog, day: usize) {
	let tasks = board.tasks(day);
	if tasks.is_empty() {
		app.set_status("Nothing to copy");
		return;
	}

	let text = format_tasks(catalog.all(), tasks);
	match copy_to_clipboard(&text) {
		Ok(()) => app.set_status(format!("Copied {} tasks", tasks.len())),
		Err(err) => {
			warn!("{err}");
			app.set_status(format!("error: {err}"));
		}
	}
}

fn handle_contexts_key(app: &mut App, code: KeyCode, board: &mut Board, catalog: &mut ContextCatalog) -> bool {
	let InputMode::Contexts(view) = &mut app.mode else {
		return false;
	};
	let last_index = catalog.all().len().saturating_sub(1);

	match code {
		KeyCode::Esc => app.mode = InputMode::Normal,
		KeyCode::Up | KeyCode::Char('k') => view.selected = view.selected.saturating_sub(1),
		KeyCode::Down | KeyCode::Char('j') => view.selected = (view.selected + 1).min(last_index),
		KeyCode::Enter => {
			if let Some(context) = catalog.all().get(view.selected).cloned() {
				app.set_status(format!("Context: {}", context.name));
				board.set_context(context);
			}
			app.mode = InputMode::Normal;
		}
		KeyCode::Char('n') => {
			app.mode = InputMode::Prompt(PromptState::new("New context", PromptKind::ContextName));
		}
		KeyCode::Backspace => {
			let Some(id) = catalog.all().get(view.selected).map(|context| context.id) else {
				return false;
			};
			let result = delete_context(board, catalog, id);
			if let InputMode::Contexts(view) = &mut app.mode {
				view.selected = view.selected.min(catalog.all().len().saturating_sub(1));
			}
			match result {
				Ok(message) => app.set_status(message),
				Err(err) => app.set_status(format!("error: {err}")),
			}
		}
		_ => {}
	}

	false
}

fn delete_context(board: &mut Board, catalog: &mut ContextCatalog, id: u32) -> Result<String, String> {
	let context = catalog.get(id).cloned().ok_or_else(|| format!("context not found: {id}"))?;
	if !context.is_none() && board.is_context_used(id) {
		return Err(format!("Context '{}' is still used by tasks", context.name));
	}
	if board.selected_context().id == id && !context.is_none() {
		board.set_context(Context::none());
	}

	let removed = catalog.remove(id)?;
	info!("deleted context '{}' ({})", removed.name, removed.id);
	Ok(format!("Deleted context: {}", removed.name))
}

fn handle_prompt_key(app: &mut App, code: KeyCode, board: &Board, catalog: &mut ContextCatalog) -> bool {
	match code {
		KeyCode::Esc => {
			let kind = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt.kind,
				_ => return false,
			};
			if let PromptKind::ContextName = kind {
				let selected = catalog.position(board.selected_context().id).unwrap_or(0);
				app.mode = InputMode::Contexts(ContextView { selected });
			}
			app.set_status("Input cancelled");
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				other => {
					app.mode = other;
					return false;
				}
			};

			match submit_prompt(&prompt, board, catalog) {
				Ok(PromptOutcome::Select(select)) => app.mode = InputMode::Select(select),
				Ok(PromptOutcome::Contexts { selected, message }) => {
					app.mode = InputMode::Contexts(ContextView { selected });
					app.set_status(message);
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.set_status(format!("error: {err}"));
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(app: &mut App, code: KeyCode, board: &mut Board) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.set_status("Selection cancelled");
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				other => {
					app.mode = other;
					return false;
				}
			};

			match submit_select(&select, board) {
				Ok(message) => app.set_status(message),
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.set_status(format!("error: {err}"));
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(prompt: &PromptState, board: &Board, catalog: &mut ContextCatalog) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::TaskName { editing } => {
			let name = required_text(&prompt.input, "task name")?;
			let preselected = if editing {
				board
					.selected_task(board.focus())
					.map(|task| task.context)
					.ok_or_else(|| "no task selected".to_string())?
			} else {
				board.selected_context().id
			};
			Ok(PromptOutcome::Select(build_task_context_select(catalog, name, editing, preselected)))
		}
		PromptKind::ContextName => {
			let context = catalog.add(&prompt.input)?;
			info!("created context '{}' ({})", context.name, context.id);
			Ok(PromptOutcome::Contexts {
				selected: catalog.position(context.id).unwrap_or(0),
				message: format!("Created context: {}", context.name),
			})
		}
	}
}

fn submit_select(select: &SelectState, board: &mut Board) -> Result<String, String> {
	let context = select
		.selected_option()
		.map(|option| option.value)
		.ok_or_else(|| "no option selected".to_string())?;

	match &select.kind {
		SelectKind::TaskContext { name, editing: true } => {
			if board.update_task(name, context) {
				Ok(format!("Updated task: {name}"))
			} else {
				Err("no task selected".to_string())
			}
		}
		SelectKind::TaskContext { name, editing: false } => {
			board.create_task(name.clone(), context);
			Ok(format!("Created task: {name}"))
		}
	}
}

fn build_task_context_select(catalog: &ContextCatalog, name: String, editing: bool, preselected: u32) -> SelectState {
	let options = catalog
		.all()
		.iter()
		.map(|context| SelectOption::new(context.name.clone(), context.id))
		.collect::<Vec<_>>();
	let mut select = SelectState::new("Context", SelectKind::TaskContext { name, editing }, options);
	select.selected = catalog.position(preselected).unwrap_or(0);
	select
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
	}
}

#[derive(Debug, Clone)]
enum PromptOutcome {
	Select(SelectState),
	Contexts { selected: usize, message: String },
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			kind,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: u32,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: u32) -> Self {
		Self {
			label: label.into(),
			value,
		}
	}
}

#[derive(Debug, Clone, Copy)]
enum PromptKind {
	TaskName { editing: bool },
	ContextName,
}

#[derive(Debug, Clone)]
enum SelectKind {
	TaskContext { name: String, editing: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContextView {
	selected: usize,
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Contexts(ContextView),
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	mode: InputMode,
	show_help: bool,
	status: String,
	status_at: Option<Instant>,
}

impl Default for App {
	fn default() -> Self {
		Self {
			mode: InputMode::Normal,
			show_help: false,
			status: String::new(),
			status_at: None,
		}
	}
}

impl App {
	fn set_status(&mut self, message: impl Into<String>) {
		self.status = message.into();
		self.status_at = Some(Instant::now());
	}

	fn visible_status(&self, now: Instant) -> Option<&str> {
		let set_at = self.status_at?;
		if now.saturating_duration_since(set_at) < STATUS_TTL {
			Some(self.status.as_str())
		} else {
			None
		}
	}
}
