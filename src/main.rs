use citadel::application::commands::{
    active_draft_impl, add_challenge_impl, add_ritual_impl, clear_week_todo_impl, create_draft_impl,
    delete_draft_impl, dismiss_alert_impl, edit_draft_impl, export_state_impl, import_state_impl,
    list_drafts_impl, list_todo_weeks_impl, overview_impl, pomodoro_status_impl,
    remove_challenge_impl, remove_ritual_impl, rename_draft_impl, rename_ritual_impl,
    ritual_week_impl, select_draft_impl, select_ritual_week_impl, set_light_mode_impl,
    set_notifications_enabled_impl, set_sound_enabled_impl, set_week_todo_impl, test_bell_impl,
    toggle_ritual_check_impl, update_challenge_impl, week_todo_impl, AppState,
};
use citadel::application::watch::run_watch;
use citadel::domain::models::{LightMode, DAY_LABELS};
use citadel::infrastructure::logging::init_logging;
use citadel::infrastructure::storage::EXPORT_FILE_NAME;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser)]
#[command(author, version, about = "Citadel personal management toolkit")]
struct Cli {
    /// Workspace root holding state/ and logs/ (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the focus/break clock
    Status,
    /// Summarize saved weeks, drafts and rituals
    Overview,
    /// Weekly TODO notes
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Free-form scratch pads
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Weekly ritual checklists
    Ritual {
        #[command(subcommand)]
        action: RitualAction,
    },
    /// Break alert preferences
    Pomodoro {
        #[command(subcommand)]
        action: PomodoroAction,
    },
    /// Switch the color theme
    Theme {
        #[arg(value_parser = parse_light_mode)]
        mode: LightMode,
    },
    /// Write the whole document to a JSON file
    Export {
        /// Target file (defaults to pms-control.json)
        path: Option<PathBuf>,
    },
    /// Replace the whole document from a JSON file
    Import { path: PathBuf },
    /// Poll the clock and raise break alerts until interrupted
    Watch,
}

#[derive(Subcommand)]
enum TodoAction {
    /// Print one week's notes
    Show {
        #[arg(long)]
        week: Option<String>,
    },
    /// Replace one week's notes (blank text clears the week)
    Set {
        text: String,
        #[arg(long)]
        week: Option<String>,
    },
    /// Remove one week's notes
    Clear {
        #[arg(long)]
        week: Option<String>,
    },
    /// List saved weeks, most recent first
    Weeks,
}

#[derive(Subcommand)]
enum DraftAction {
    List,
    /// Print a draft's content (the active one by default)
    Show {
        #[arg(long)]
        id: Option<String>,
    },
    /// Create a draft and make it active
    New,
    /// Make a draft active
    Select { id: String },
    /// Retitle a draft (the active one by default)
    Rename {
        title: String,
        #[arg(long)]
        id: Option<String>,
    },
    /// Replace a draft's content (the active one by default)
    Edit {
        content: String,
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete a draft (the active one by default)
    Delete {
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum RitualAction {
    /// Print the week's checklist grid
    Show {
        #[arg(long)]
        week: Option<String>,
    },
    /// Make a week the active one
    Select { week: String },
    /// Add a ritual to the week
    Add {
        #[arg(long)]
        week: Option<String>,
    },
    /// Remove a ritual and its checkmarks
    Remove {
        id: String,
        #[arg(long)]
        week: Option<String>,
    },
    /// Retitle a ritual
    Rename {
        id: String,
        title: String,
        #[arg(long)]
        week: Option<String>,
    },
    /// Flip one checkbox (day 0 = Monday)
    Toggle {
        id: String,
        day: u8,
        #[arg(long)]
        week: Option<String>,
    },
}

#[derive(Subcommand)]
enum PomodoroAction {
    /// Toggle the audible bell
    Sound {
        #[arg(value_parser = parse_switch)]
        enabled: bool,
    },
    /// Toggle desktop notifications (asks for permission when turning on)
    Notify {
        #[arg(value_parser = parse_switch)]
        enabled: bool,
    },
    /// List break challenges
    Challenges,
    /// Add a break challenge
    AddChallenge { text: String },
    /// Rewrite a break challenge by index
    EditChallenge { index: usize, text: String },
    /// Remove a break challenge by index
    RemoveChallenge { index: usize },
    /// Ring the bell and show a sample challenge without waiting for :25
    TestBell,
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on|off, got `{other}`")),
    }
}

fn parse_light_mode(value: &str) -> Result<LightMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "light" => Ok(LightMode::Light),
        "dark" => Ok(LightMode::Dark),
        other => Err(format!("expected light|dark, got `{other}`")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()
            .map_err(|error| format!("failed to resolve current directory: {error}"))?,
    };

    let state = AppState::new(&root).map_err(|error| error.to_string())?;
    if let Err(error) = init_logging(state.logs_dir()) {
        eprintln!("warning: {error}");
    }

    match cli.command {
        Command::Status => {
            let status = pomodoro_status_impl(&state)
                .map_err(|error| state.command_error("status", &error))?;
            println!("{} {}", status.clock, status.mode);
            println!(
                "segment {} - {} ({}% elapsed)",
                status.segment_start, status.segment_end, status.progress_percent
            );
            println!("remaining {}", status.remaining);
            println!("next break at {}", status.next_break);
            if !status.active_challenge.is_empty() {
                println!("challenge: {}", status.active_challenge);
            }
            show_pending_alert(&state)?;
        }
        Command::Overview => {
            let overview = overview_impl(&state)
                .map_err(|error| state.command_error("overview", &error))?;
            println!(
                "{} weeks of notes, {} drafts",
                overview.todo_week_count, overview.draft_count
            );
            match &overview.ritual_week {
                Some(week) => println!("rituals {week}: {}%", overview.ritual_week_score),
                None => println!("no active ritual week"),
            }
            println!("{} {} remaining", overview.mode, overview.remaining);
        }
        Command::Todo { action } => run_todo(&state, action)?,
        Command::Draft { action } => run_draft(&state, action)?,
        Command::Ritual { action } => run_ritual(&state, action)?,
        Command::Pomodoro { action } => run_pomodoro(&state, action)?,
        Command::Theme { mode } => {
            set_light_mode_impl(&state, mode)
                .map_err(|error| state.command_error("theme", &error))?;
        }
        Command::Export { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            let written = export_state_impl(&state, &path)
                .map_err(|error| state.command_error("export", &error))?;
            println!("exported to {}", written.display());
        }
        Command::Import { path } => {
            import_state_impl(&state, &path)
                .map_err(|error| state.command_error("import", &error))?;
            println!("state imported");
        }
        Command::Watch => {
            let state = Arc::new(state);
            let (sender, receiver) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = sender.send(true);
                }
            });
            println!("watching for break triggers (ctrl-c to stop)");
            run_watch(Arc::clone(&state), receiver, |alert| {
                println!("{}", alert.message);
            })
            .await
            .map_err(|error| state.command_error("watch", &error))?;
        }
    }

    Ok(())
}

fn todo_week(state: &AppState, week: Option<String>) -> String {
    week.unwrap_or_else(|| state.current_week_key())
}

/// Prints and clears the pending banner alert.
fn show_pending_alert(state: &AppState) -> Result<(), String> {
    let control = state
        .snapshot()
        .map_err(|error| state.command_error("status", &error))?;
    if control.alert.open {
        println!("[{}] {}", control.alert.severity.as_str(), control.alert.text);
        dismiss_alert_impl(state).map_err(|error| state.command_error("status", &error))?;
    }
    Ok(())
}

fn run_todo(state: &AppState, action: TodoAction) -> Result<(), String> {
    match action {
        TodoAction::Show { week } => {
            let week = todo_week(state, week);
            let text = week_todo_impl(state, &week)
                .map_err(|error| state.command_error("todo_show", &error))?;
            match text {
                Some(text) => println!("{text}"),
                None => println!("no notes for {week}"),
            }
        }
        TodoAction::Set { text, week } => {
            let week = todo_week(state, week);
            set_week_todo_impl(state, &week, &text)
                .map_err(|error| state.command_error("todo_set", &error))?;
        }
        TodoAction::Clear { week } => {
            let week = todo_week(state, week);
            clear_week_todo_impl(state, &week)
                .map_err(|error| state.command_error("todo_clear", &error))?;
        }
        TodoAction::Weeks => {
            let weeks = list_todo_weeks_impl(state)
                .map_err(|error| state.command_error("todo_weeks", &error))?;
            if weeks.is_empty() {
                println!("no weeks saved yet");
            }
            for week in weeks {
                println!("{week}");
            }
        }
    }
    Ok(())
}

fn run_draft(state: &AppState, action: DraftAction) -> Result<(), String> {
    match action {
        DraftAction::List => {
            let drafts = list_drafts_impl(state)
                .map_err(|error| state.command_error("draft_list", &error))?;
            if drafts.items.is_empty() {
                println!("no drafts yet");
            }
            for item in &drafts.items {
                let marker = if drafts.active_id.as_deref() == Some(item.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}  {}", item.id, item.title);
            }
        }
        DraftAction::Show { id } => {
            let item = match id.as_deref() {
                Some(id) => list_drafts_impl(state)
                    .map_err(|error| state.command_error("draft_show", &error))?
                    .items
                    .iter()
                    .find(|item| item.id == id)
                    .cloned(),
                None => active_draft_impl(state)
                    .map_err(|error| state.command_error("draft_show", &error))?,
            };
            match item {
                Some(item) => {
                    println!("{}", item.title);
                    println!("{}", item.content);
                }
                None => println!("no such draft"),
            }
        }
        DraftAction::New => {
            let draft = create_draft_impl(state)
                .map_err(|error| state.command_error("draft_new", &error))?;
            println!("{}  {}", draft.id, draft.title);
        }
        DraftAction::Select { id } => {
            let draft = select_draft_impl(state, &id)
                .map_err(|error| state.command_error("draft_select", &error))?;
            println!("{}  {}", draft.id, draft.title);
        }
        DraftAction::Rename { title, id } => {
            rename_draft_impl(state, id.as_deref(), &title)
                .map_err(|error| state.command_error("draft_rename", &error))?;
        }
        DraftAction::Edit { content, id } => {
            edit_draft_impl(state, id.as_deref(), &content)
                .map_err(|error| state.command_error("draft_edit", &error))?;
        }
        DraftAction::Delete { id } => {
            delete_draft_impl(state, id.as_deref())
                .map_err(|error| state.command_error("draft_delete", &error))?;
        }
    }
    Ok(())
}

fn ritual_week_arg(state: &AppState, week: Option<String>) -> Result<String, String> {
    if let Some(week) = week {
        return Ok(week);
    }
    let snapshot = state
        .snapshot()
        .map_err(|error| state.command_error("ritual", &error))?;
    Ok(snapshot
        .data
        .rituals
        .active_week
        .unwrap_or_else(|| state.current_week_key()))
}

fn run_ritual(state: &AppState, action: RitualAction) -> Result<(), String> {
    match action {
        RitualAction::Show { week } => {
            let week = ritual_week_arg(state, week)?;
            let data = ritual_week_impl(state, &week)
                .map_err(|error| state.command_error("ritual_show", &error))?;
            if data.items.is_empty() {
                println!("no rituals for {week}");
                return Ok(());
            }
            let scores = data.day_scores();
            println!("{week}  score {}%", data.week_score());
            println!(
                "    {}",
                DAY_LABELS
                    .iter()
                    .zip(scores.iter())
                    .map(|(label, score)| format!("{label} {score:>3}%"))
                    .collect::<Vec<_>>()
                    .join("  ")
            );
            for item in &data.items {
                let marks = (0..DAY_LABELS.len() as u8)
                    .map(|day| if data.is_checked(&item.id, day) { "x" } else { "." })
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{}  [{marks}]  {}", item.id, item.title);
            }
        }
        RitualAction::Select { week } => {
            select_ritual_week_impl(state, &week)
                .map_err(|error| state.command_error("ritual_select", &error))?;
        }
        RitualAction::Add { week } => {
            let week = ritual_week_arg(state, week)?;
            let ritual = add_ritual_impl(state, &week)
                .map_err(|error| state.command_error("ritual_add", &error))?;
            println!("{}  {}", ritual.id, ritual.title);
        }
        RitualAction::Remove { id, week } => {
            let week = ritual_week_arg(state, week)?;
            remove_ritual_impl(state, &week, &id)
                .map_err(|error| state.command_error("ritual_remove", &error))?;
        }
        RitualAction::Rename { id, title, week } => {
            let week = ritual_week_arg(state, week)?;
            rename_ritual_impl(state, &week, &id, &title)
                .map_err(|error| state.command_error("ritual_rename", &error))?;
        }
        RitualAction::Toggle { id, day, week } => {
            let week = ritual_week_arg(state, week)?;
            let checked = toggle_ritual_check_impl(state, &week, &id, day)
                .map_err(|error| state.command_error("ritual_toggle", &error))?;
            println!("{}", if checked { "checked" } else { "unchecked" });
        }
    }
    Ok(())
}

fn run_pomodoro(state: &AppState, action: PomodoroAction) -> Result<(), String> {
    match action {
        PomodoroAction::Sound { enabled } => {
            set_sound_enabled_impl(state, enabled)
                .map_err(|error| state.command_error("pomodoro_sound", &error))?;
        }
        PomodoroAction::Notify { enabled } => {
            let effective = set_notifications_enabled_impl(state, enabled)
                .map_err(|error| state.command_error("pomodoro_notify", &error))?;
            if enabled && !effective {
                println!("notifications blocked");
            }
        }
        PomodoroAction::Challenges => {
            let snapshot = state
                .snapshot()
                .map_err(|error| state.command_error("pomodoro_challenges", &error))?;
            let challenges = &snapshot.data.pomodoro.challenges;
            if challenges.is_empty() {
                println!("no challenges configured");
            }
            for (index, challenge) in challenges.iter().enumerate() {
                println!("{index}: {challenge}");
            }
        }
        PomodoroAction::AddChallenge { text } => {
            add_challenge_impl(state, &text)
                .map_err(|error| state.command_error("pomodoro_add_challenge", &error))?;
        }
        PomodoroAction::EditChallenge { index, text } => {
            update_challenge_impl(state, index, &text)
                .map_err(|error| state.command_error("pomodoro_edit_challenge", &error))?;
        }
        PomodoroAction::RemoveChallenge { index } => {
            remove_challenge_impl(state, index)
                .map_err(|error| state.command_error("pomodoro_remove_challenge", &error))?;
        }
        PomodoroAction::TestBell => {
            let outcome = test_bell_impl(state)
                .map_err(|error| state.command_error("pomodoro_test_bell", &error))?;
            println!("test bell: {}", outcome.challenge);
        }
    }
    Ok(())
}
