//! One-shot CLI commands. Each command that needs an identity behaves like
//! entering a dashboard: it runs the session guard first and stops on any
//! redirect.

use anyhow::Result;
use log::{info, warn};

use crate::admin::{AdminController, TaskDraft};
use crate::api::TaskApi;
use crate::cli::{Commands, ConfigAction};
use crate::config::{self, API_BASE_KEY, LOG_LEVEL_KEY};
use crate::database::Database;
use crate::error::ClientError;
use crate::gateway::{HttpGateway, Transport};
use crate::guard::{self, GuardOutcome, ADMIN_PAGE};
use crate::models::{ActionOutcome, Priority, Role, Session, Task, TaskStats, TaskStatus};
use crate::notify::{Confirm, ConsoleNotifier, Notifier, Preset, StdinConfirm};
use crate::resolve::resolve_task;
use crate::user::UserController;

const GATED_MESSAGE: &str = "Title and assignee are both required";

/// Builds the gateway and re-seeds it with the cookie saved for `api_base`.
pub fn connect(db: &Database, api_base: &str) -> Result<TaskApi<HttpGateway>> {
    let gateway = HttpGateway::new(api_base)?;
    if let Some(header) = db.load_cookies(gateway.base_url())? {
        gateway.restore_cookies(&header)?;
    }
    Ok(TaskApi::new(gateway))
}

pub fn persist_session(db: &Database, gateway: &HttpGateway) -> Result<()> {
    db.save_cookies(gateway.base_url(), gateway.cookie_header().as_deref())?;
    Ok(())
}

/// Drops the session locally, in memory and on disk.
pub fn end_session(db: &Database, gateway: &HttpGateway) -> Result<()> {
    gateway.clear_cookies();
    db.clear_cookies(gateway.base_url())?;
    Ok(())
}

/// Runs a network command; `Ok(false)` means it failed and already said why.
pub async fn run(command: Commands, api: &TaskApi<HttpGateway>, db: &Database) -> Result<bool> {
    let logout = matches!(command, Commands::Logout);
    let mut notifier = ConsoleNotifier;
    let succeeded = dispatch(command, api, &mut notifier).await;

    if logout {
        end_session(db, api.transport())?;
    } else {
        persist_session(db, api.transport())?;
    }
    Ok(succeeded)
}

async fn dispatch<T: Transport>(command: Commands, api: &TaskApi<T>, notifier: &mut dyn Notifier) -> bool {
    match command {
        Commands::Login { email, password } => match api.sign_in(&email, &password).await {
            Ok((session, route)) => {
                println!("Logged in as {} ({})", session.email, session.role);
                info!("navigating to {}", route.path());
                true
            }
            Err(e) => {
                notifier.inline(&e.to_string());
                false
            }
        },
        Commands::Logout => {
            if let Err(e) = api.logout().await {
                warn!("Logout failed: {e}");
            }
            println!("Logged out");
            true
        }
        Commands::Me => match api.me().await {
            Ok(session) => {
                println!("{} ({})", session.email, session.role);
                true
            }
            Err(e) => {
                notifier.blocking(&e.to_string());
                false
            }
        },
        Commands::Register { email, password, role } => {
            match api.register(&email, &password, role).await {
                Ok(message) => {
                    notifier.info(&message);
                    true
                }
                Err(e) => {
                    notifier.inline(&e.to_string());
                    false
                }
            }
        }
        Commands::Tasks => list_tasks(api, notifier).await,
        Commands::Create { title, assigned_to, description, priority } => {
            let draft = TaskDraft { title, description, priority, assigned_to };
            create_task(api, draft, notifier).await
        }
        Commands::Edit { task, title, description, priority, status, assigned_to } => {
            let edits = FieldEdits { title, description, priority, status, assigned_to };
            edit_task(api, &task, edits, notifier).await
        }
        Commands::Delete { task, yes } => {
            if yes {
                delete_task(api, &task, &mut Preset(true), notifier).await
            } else {
                delete_task(api, &task, &mut StdinConfirm, notifier).await
            }
        }
        Commands::Status { task, status } => set_status(api, &task, status, notifier).await,
        Commands::Users => list_users(api, notifier).await,
        Commands::Config { .. } | Commands::Completions { .. } | Commands::Tui => true,
    }
}

/// Unwraps a ready guard outcome, logging where a redirect would go.
fn ready<D>(outcome: GuardOutcome<D>) -> Option<(Session, D)> {
    if let Some(route) = outcome.redirect() {
        info!("navigating to {}", route.path());
    }
    outcome.into_result().ok()
}

async fn list_tasks<T: Transport>(api: &TaskApi<T>, notifier: &mut dyn Notifier) -> bool {
    let Some((session, tasks)) = ready(guard::load_own_tasks(api, notifier).await) else {
        return false;
    };

    println!("Tasks for {} ({}):", session.email, session.role);
    println!("------");
    if tasks.is_empty() {
        match session.role {
            Role::Admin => println!("No tasks yet."),
            Role::User | Role::Other => println!("No tasks assigned. Check back later!"),
        }
    }
    for task in &tasks {
        print_task(task);
    }
    println!();
    print_stats(session.role, &TaskStats::from_tasks(&tasks));
    true
}

async fn create_task<T: Transport>(api: &TaskApi<T>, draft: TaskDraft, notifier: &mut dyn Notifier) -> bool {
    let Some((_, tasks)) = ready(guard::load_tasks(api, &ADMIN_PAGE, notifier).await) else {
        return false;
    };

    let mut admin = AdminController::new(tasks);
    admin.draft = draft;
    let before = admin.tasks().len();
    match admin.create(api, notifier).await {
        ActionOutcome::Applied => {
            if let Some(task) = admin.tasks().get(before).or_else(|| admin.tasks().last()) {
                println!("Task created:");
                print_task(task);
            }
            true
        }
        ActionOutcome::Gated => {
            notifier.inline(&ClientError::Validation(GATED_MESSAGE.to_string()).to_string());
            false
        }
        ActionOutcome::Failed | ActionOutcome::Cancelled => false,
    }
}

/// Field overrides for an edit; `None` keeps the task's current value.
#[derive(Debug, Default)]
struct FieldEdits {
    title: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
    status: Option<TaskStatus>,
    assigned_to: Option<String>,
}

impl FieldEdits {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
    }

    fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = Some(description);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
    }
}

async fn edit_task<T: Transport>(
    api: &TaskApi<T>,
    reference: &str,
    edits: FieldEdits,
    notifier: &mut dyn Notifier,
) -> bool {
    if edits.is_empty() {
        notifier.inline("Nothing to change: pass at least one field to edit");
        return false;
    }
    let Some((_, tasks)) = ready(guard::load_tasks(api, &ADMIN_PAGE, notifier).await) else {
        return false;
    };
    let mut admin = AdminController::new(tasks);
    submit_admin_edit(api, &mut admin, reference, edits, &mut StdinConfirm, notifier).await
}

async fn submit_admin_edit<T: Transport>(
    api: &TaskApi<T>,
    admin: &mut AdminController,
    reference: &str,
    edits: FieldEdits,
    confirm: &mut dyn Confirm,
    notifier: &mut dyn Notifier,
) -> bool {
    let target = match resolve_task(admin.tasks(), reference, confirm) {
        Ok(task) => task,
        Err(e) => {
            notifier.inline(&e.to_string());
            return false;
        }
    };

    admin.begin_edit(&target.id);
    if let Some(editing) = admin.editing.as_mut() {
        edits.apply_to(editing);
    }

    match admin.submit_edit(api, notifier).await {
        ActionOutcome::Applied => {
            if let Some(task) = admin.tasks().iter().find(|t| t.id == target.id) {
                println!("Task updated:");
                print_task(task);
            }
            true
        }
        ActionOutcome::Gated => {
            notifier.inline(&ClientError::Validation(GATED_MESSAGE.to_string()).to_string());
            false
        }
        ActionOutcome::Failed | ActionOutcome::Cancelled => false,
    }
}

async fn delete_task<T: Transport>(
    api: &TaskApi<T>,
    reference: &str,
    confirm: &mut dyn Confirm,
    notifier: &mut dyn Notifier,
) -> bool {
    let Some((_, tasks)) = ready(guard::load_tasks(api, &ADMIN_PAGE, notifier).await) else {
        return false;
    };
    let mut admin = AdminController::new(tasks);

    let target = match resolve_task(admin.tasks(), reference, confirm) {
        Ok(task) => task,
        Err(e) => {
            notifier.inline(&e.to_string());
            return false;
        }
    };

    match admin.delete(api, &target.id, confirm, notifier).await {
        ActionOutcome::Applied => {
            println!("Task '{}' deleted", target.title);
            true
        }
        ActionOutcome::Cancelled => {
            println!("Operation cancelled.");
            true
        }
        ActionOutcome::Failed | ActionOutcome::Gated => false,
    }
}

async fn set_status<T: Transport>(
    api: &TaskApi<T>,
    reference: &str,
    status: TaskStatus,
    notifier: &mut dyn Notifier,
) -> bool {
    let Some((session, tasks)) = ready(guard::load_own_tasks(api, notifier).await) else {
        return false;
    };

    match session.role {
        Role::User | Role::Other => {
            let mut user = UserController::new(tasks);
            let target = match resolve_task(user.tasks(), reference, &mut StdinConfirm) {
                Ok(task) => task,
                Err(e) => {
                    notifier.inline(&e.to_string());
                    return false;
                }
            };
            match user.update_status(api, &target.id, status, notifier).await {
                ActionOutcome::Applied => {
                    println!("Task '{}' status updated to '{}'", target.title, status.label());
                    true
                }
                _ => false,
            }
        }
        Role::Admin => {
            let mut admin = AdminController::new(tasks);
            let edits = FieldEdits {
                status: Some(status),
                ..Default::default()
            };
            submit_admin_edit(api, &mut admin, reference, edits, &mut StdinConfirm, notifier).await
        }
    }
}

async fn list_users<T: Transport>(api: &TaskApi<T>, notifier: &mut dyn Notifier) -> bool {
    let outcome = guard::load(api, &ADMIN_PAGE, |_| api.list_users(), notifier).await;
    let Some((_, users)) = ready(outcome) else {
        return false;
    };

    println!("Users:");
    println!("------");
    for user in users {
        println!("{} | {} | Role: {}", user.id, user.email, user.role);
    }
    true
}

fn print_task(task: &Task) {
    println!(
        "{} | {} | Priority: {} | Status: {} | Assigned To: {} | Created By: {}",
        task.id,
        task.title,
        task.priority.label(),
        task.status.label(),
        task.assigned_to,
        task.created_by_or_default()
    );
    println!("    {}", task.description_or_placeholder());
}

fn print_stats(role: Role, stats: &TaskStats) {
    match role {
        Role::Admin => println!(
            "Total: {} | In Progress: {} | Done: {} | To Do: {}",
            stats.total, stats.in_progress, stats.done, stats.todo
        ),
        Role::User | Role::Other => println!(
            "To Do: {} | In Progress: {} | Completed: {}",
            stats.todo, stats.in_progress, stats.done
        ),
    }
}

pub fn run_config(db: &Database, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let Some(description) = config::describe(&key) else {
                return Err(ClientError::Config(format!(
                    "unknown key '{key}'. Known keys: {API_BASE_KEY}, {LOG_LEVEL_KEY}"
                ))
                .into());
            };
            if key == API_BASE_KEY && reqwest::Url::parse(&value).is_err() {
                return Err(ClientError::Config(format!("invalid URL '{value}'")).into());
            }
            if key == LOG_LEVEL_KEY && value.parse::<log::LevelFilter>().is_err() {
                return Err(ClientError::Config(format!(
                    "invalid log level '{value}'. Valid levels are: off, error, warn, info, debug, trace"
                ))
                .into());
            }
            db.set_config(&key, &value, Some(description))?;
            println!("Config '{key}' set to '{value}'");
        }
        ConfigAction::Get { key } => match db.get_config(&key)? {
            Some(value) => println!("{value}"),
            None => println!("Config '{key}' not set"),
        },
        ConfigAction::List => {
            println!("Configs:");
            println!("--------");
            for item in db.get_all_configs()? {
                println!(
                    "{} = {} | {} | Updated: {}",
                    item.key_name,
                    item.value,
                    item.description.as_deref().unwrap_or(""),
                    item.updated_at
                );
            }
        }
        ConfigAction::Delete { key } => {
            if db.delete_config(&key)? {
                println!("Config '{key}' deleted");
            } else {
                println!("Config '{key}' not found");
            }
        }
    }
    Ok(())
}
