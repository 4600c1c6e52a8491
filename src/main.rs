mod board;
mod clipboard;
mod config;
mod domain;
mod list;
mod logging;
mod storage;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use crate::board::Board;
use crate::clipboard::format_tasks;
use crate::config::{ensure_data_dir, load_settings, resolve_data_dir};
use crate::domain::{CONTEXT_NONE_ID, ContextCatalog, DAY_COUNT, INBOX, day_name, is_valid_day};
use crate::logging::init_logging;
use crate::storage::{JsonStore, TaskStore};
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "weekboard", about = "Week-oriented terminal task board")]
struct Cli {
	/// Directory holding tasks, contexts, config and logs.
	#[arg(long)]
	data_dir: Option<PathBuf>,
	/// Tasks file name inside the data directory.
	#[arg(short, long)]
	file: Option<String>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	AddTask {
		#[arg(long)]
		name: String,
		/// 0 = Inbox, 1 = Monday .. 7 = Sunday
		#[arg(long, default_value_t = INBOX)]
		day: usize,
		#[arg(long)]
		context: Option<String>,
	},
	ListTasks {
		#[arg(long)]
		day: Option<usize>,
	},
	Contexts,
	AddContext {
		#[arg(long)]
		name: String,
	},
	Copy {
		#[arg(long)]
		day: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let data_dir = resolve_data_dir(cli.data_dir);
	ensure_data_dir(&data_dir)?;
	let settings = load_settings(&data_dir, cli.file)?;

	let _logger = match init_logging(&data_dir, settings.log_level.as_deref()) {
		Ok(handle) => Some(handle),
		Err(err) => {
			eprintln!("warning: failed to start logging: {err}");
			None
		}
	};

	let store = JsonStore::new(&data_dir, &settings.tasks_file);
	let mut board = Board::load(&store)?;
	let mut catalog = ContextCatalog::new(store.load_contexts()?);
	info!(
		"using {} and {}",
		store.tasks_path().display(),
		store.contexts_path().display()
	);

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Dashboard => {
			run_dashboard(&mut board, &mut catalog, &store, settings.autosave_interval())?;
		}
		Command::AddTask { name, day, context } => {
			let day = checked_day(day)?;
			let context_id = match context {
				Some(context_name) => catalog
					.find_by_name(&context_name)
					.map(|context| context.id)
					.ok_or_else(|| format!("unknown context: {context_name}"))?,
				None => CONTEXT_NONE_ID,
			};
			let name = name.trim();
			if name.is_empty() {
				return Err("task name is required".into());
			}
			board.deselect_and_restore_focus(day);
			let task_id = board.create_task(name, context_id);
			board.save(&store)?;
			println!("created task {task_id}");
		}
		Command::ListTasks { day } => {
			let days = match day {
				Some(day) => vec![checked_day(day)?],
				None => (0..DAY_COUNT).collect(),
			};
			print_tasks(&board, &catalog, &days);
		}
		Command::Contexts => {
			for context in catalog.all() {
				println!("{:>3} | {}", context.id, context.name);
			}
		}
		Command::AddContext { name } => {
			let context = catalog.add(&name)?;
			store.save_contexts(catalog.all())?;
			println!("created context {} ({})", context.name, context.id);
		}
		Command::Copy { day } => {
			let day = checked_day(day)?;
			println!("{}", format_tasks(catalog.all(), board.tasks(day)));
		}
	}

	Ok(())
}

fn checked_day(day: usize) -> Result<usize, Box<dyn Error>> {
	if is_valid_day(day) {
		Ok(day)
	} else {
		Err(format!("day must be between 0 and {}, got {day}", DAY_COUNT - 1).into())
	}
}

fn print_tasks(board: &Board, catalog: &ContextCatalog, days: &[usize]) {
	if board.task_count() == 0 {
		println!("no tasks yet");
		return;
	}

	for &day in days {
		let tasks = board.tasks(day);
		if tasks.is_empty() {
			continue;
		}

		println!("{}:", day_name(day));
		for task in tasks {
			let context = catalog
				.get(task.context)
				.map(|context| context.name.as_str())
				.unwrap_or("Unknown");
			println!("  {} | {} | {}", task.id, task.title(), context);
		}
	}
}
