use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Deserializer, Serialize};

const ID_LEN: usize = 12;

pub const INBOX: usize = 0;
pub const MONDAY: usize = 1;
pub const TUESDAY: usize = 2;
pub const WEDNESDAY: usize = 3;
pub const THURSDAY: usize = 4;
pub const FRIDAY: usize = 5;
pub const SATURDAY: usize = 6;
pub const SUNDAY: usize = 7;
pub const DAY_COUNT: usize = 8;

pub const FIRST_WEEK: i32 = 1;
pub const LAST_WEEK: i32 = 52;

/// Id of the reserved "all" context. It means "no filter" and is never
/// persisted.
pub const CONTEXT_NONE_ID: u32 = 1;
const CONTEXT_NONE_NAME: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "day_from_signed")]
    pub day: usize,
    #[serde(default)]
    pub done: bool,
    #[serde(default, deserialize_with = "pos_from_signed")]
    pub pos: usize,
    #[serde(default = "default_context_id")]
    pub context: u32,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>, context: u32, day: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            day,
            done: false,
            pos: 0,
            context,
        }
    }

    pub fn title(&self) -> String {
        if self.done {
            format!("✓ {}", self.name)
        } else {
            format!("○ {}", self.name)
        }
    }
}

fn default_context_id() -> u32 {
    CONTEXT_NONE_ID
}

/// Files written by older versions may carry negative days; those belong in
/// the Inbox. Days past Sunday are re-homed when the board is built.
fn day_from_signed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(usize::try_from(raw).unwrap_or_else(|_| {
        log::warn!("task had day {raw}, moving it to the inbox");
        INBOX
    }))
}

fn pos_from_signed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(usize::try_from(raw).unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: u32,
    pub name: String,
}

impl Context {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn none() -> Self {
        Self::new(CONTEXT_NONE_ID, CONTEXT_NONE_NAME)
    }

    pub fn is_none(&self) -> bool {
        self.id == CONTEXT_NONE_ID
    }
}

/// User-defined contexts, always headed by the "all" sentinel.
#[derive(Debug, Clone)]
pub struct ContextCatalog {
    contexts: Vec<Context>,
}

impl ContextCatalog {
    pub fn new(loaded: Vec<Context>) -> Self {
        let mut contexts = vec![Context::none()];
        for context in loaded {
            if contexts.iter().any(|known| known.id == context.id) {
                continue;
            }
            contexts.push(context);
        }
        Self { contexts }
    }

    pub fn all(&self) -> &[Context] {
        &self.contexts
    }

    pub fn get(&self, id: u32) -> Option<&Context> {
        self.contexts.iter().find(|context| context.id == id)
    }

    pub fn position(&self, id: u32) -> Option<usize> {
        self.contexts.iter().position(|context| context.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Context> {
        let name = name.trim();
        self.contexts
            .iter()
            .find(|context| context.name.eq_ignore_ascii_case(name))
    }

    pub fn add(&mut self, name: &str) -> Result<Context, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Context must not be empty".to_string());
        }
        if self.find_by_name(name).is_some() {
            return Err(format!("Context '{name}' does already exist"));
        }

        let next_id = self
            .contexts
            .iter()
            .map(|context| context.id)
            .max()
            .unwrap_or(CONTEXT_NONE_ID)
            + 1;
        let context = Context::new(next_id, name);
        self.contexts.push(context.clone());
        Ok(context)
    }

    pub fn remove(&mut self, id: u32) -> Result<Context, String> {
        if id == CONTEXT_NONE_ID {
            return Err("The 'all' context cannot be deleted".to_string());
        }
        let index = self
            .position(id)
            .ok_or_else(|| format!("context not found: {id}"))?;
        Ok(self.contexts.remove(index))
    }
}

pub fn is_valid_day(day: usize) -> bool {
    day < DAY_COUNT
}

pub fn day_name(day: usize) -> &'static str {
    match day {
        INBOX => "Inbox",
        MONDAY => "Monday",
        TUESDAY => "Tuesday",
        WEDNESDAY => "Wednesday",
        THURSDAY => "Thursday",
        FRIDAY => "Friday",
        SATURDAY => "Saturday",
        SUNDAY => "Sunday",
        _ => "Unknown",
    }
}

/// Monday is 1, Sunday is 7, matching the day-bucket numbering.
pub fn day_for_weekday(weekday: Weekday) -> usize {
    weekday.number_from_monday() as usize
}

pub fn today() -> usize {
    day_for_weekday(Local::now().weekday())
}

pub fn wrap_week(week: i32) -> i32 {
    (week - FIRST_WEEK).rem_euclid(LAST_WEEK) + FIRST_WEEK
}

pub fn current_week() -> i32 {
    let week = Local::now().date_naive().iso_week().week() as i32;
    week.clamp(FIRST_WEEK, LAST_WEEK)
}

pub fn current_iso_year() -> i32 {
    Local::now().date_naive().iso_week().year()
}

pub fn date_for_day(iso_year: i32, week: i32, day: usize) -> Option<NaiveDate> {
    if day == INBOX || !is_valid_day(day) {
        return None;
    }
    let monday = NaiveDate::from_isoywd_opt(iso_year, u32::try_from(week).ok()?, Weekday::Mon)?;
    Some(monday + Duration::days(day as i64 - 1))
}

pub fn day_title(day: usize, week: i32, iso_year: i32, context: &Context) -> String {
    if day == INBOX {
        return format!("[ESC] Inbox (Week {week}) - {}", context.name);
    }

    match date_for_day(iso_year, week, day) {
        Some(date) => format!("[{day}] {} ({})", day_name(day), date.format("%d.%m.%Y")),
        None => format!("[{day}] {}", day_name(day)),
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::{
        Context, ContextCatalog, INBOX, MONDAY, SUNDAY, Task, date_for_day, day_for_weekday,
        day_title, generate_id, wrap_week,
    };

    #[test]
    fn wraps_weeks_cyclically() {
        assert_eq!(wrap_week(53), 1);
        assert_eq!(wrap_week(0), 52);
        assert_eq!(wrap_week(52), 52);
        assert_eq!(wrap_week(1), 1);
        assert_eq!(wrap_week(-1), 51);
    }

    #[test]
    fn maps_sunday_to_last_bucket() {
        assert_eq!(day_for_weekday(Weekday::Mon), MONDAY);
        assert_eq!(day_for_weekday(Weekday::Sun), SUNDAY);
    }

    #[test]
    fn titles_use_iso_week_dates() {
        let context = Context::none();
        assert_eq!(
            day_title(INBOX, 3, 2026, &context),
            "[ESC] Inbox (Week 3) - all"
        );
        // ISO week 1 of 2026 starts on Monday 29 Dec 2025.
        assert_eq!(
            day_title(MONDAY, 1, 2026, &context),
            "[1] Monday (29.12.2025)"
        );
        assert_eq!(
            day_title(SUNDAY, 1, 2026, &context),
            "[7] Sunday (04.01.2026)"
        );
        assert!(date_for_day(2026, 1, INBOX).is_none());
    }

    #[test]
    fn renders_done_marker_in_title() {
        let mut task = Task::new("a", "Write report", 1, MONDAY);
        assert_eq!(task.title(), "○ Write report");
        task.done = true;
        assert_eq!(task.title(), "✓ Write report");
    }

    #[test]
    fn catalog_keeps_sentinel_first_and_skips_duplicates() {
        let catalog = ContextCatalog::new(vec![
            Context::new(1, "shadowed"),
            Context::new(2, "private"),
            Context::new(2, "again"),
        ]);
        let names = catalog
            .all()
            .iter()
            .map(|context| context.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["all", "private"]);
    }

    #[test]
    fn catalog_add_assigns_next_id_and_rejects_duplicates() {
        let mut catalog = ContextCatalog::new(vec![Context::new(4, "work")]);
        let added = catalog.add("  home ").expect("context should be added");
        assert_eq!(added, Context::new(5, "home"));

        let err = catalog.add("WORK").expect_err("duplicate should be rejected");
        assert_eq!(err, "Context 'WORK' does already exist");
        assert!(catalog.add("   ").is_err());
    }

    #[test]
    fn catalog_never_removes_sentinel() {
        let mut catalog = ContextCatalog::new(vec![Context::new(2, "private")]);
        assert!(catalog.remove(1).is_err());
        assert_eq!(catalog.remove(2).expect("remove should work").name, "private");
        assert_eq!(catalog.all().len(), 1);
        assert!(catalog.remove(2).is_err());
    }

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = generate_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
