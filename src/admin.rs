use log::{debug, info};

use crate::api::TaskApi;
use crate::gateway::Transport;
use crate::models::{ActionOutcome, NewTask, Priority, Task, TaskStats, TaskUpdate};
use crate::notify::{failure_message, Confirm, Notifier};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this task?";

/// Submit controls stay disabled until both are filled in.
pub fn can_submit(title: &str, assigned_to: &str) -> bool {
    !title.is_empty() && !assigned_to.is_empty()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub assigned_to: String,
}

impl TaskDraft {
    pub fn can_submit(&self) -> bool {
        can_submit(&self.title, &self.assigned_to)
    }

    pub fn to_new_task(&self) -> NewTask {
        NewTask {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            assigned_to: self.assigned_to.clone(),
        }
    }
}

/// Task state behind the administrator dashboard.
#[derive(Debug, Default)]
pub struct AdminController {
    tasks: Vec<Task>,
    pub draft: TaskDraft,
    pub editing: Option<Task>,
}

impl AdminController {
    pub fn new(tasks: Vec<Task>) -> Self {
        AdminController {
            tasks,
            ..Default::default()
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Starts editing a copy of the task with `id`.
    pub fn begin_edit(&mut self, id: &str) -> bool {
        self.editing = self.tasks.iter().find(|t| t.id == id).cloned();
        self.editing.is_some()
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn can_submit_edit(&self) -> bool {
        self.editing
            .as_ref()
            .is_some_and(|t| can_submit(&t.title, &t.assigned_to))
    }

    pub async fn create<T: Transport>(
        &mut self,
        api: &TaskApi<T>,
        notifier: &mut dyn Notifier,
    ) -> ActionOutcome {
        if !self.draft.can_submit() {
            debug!("create gated: title or assignee missing");
            return ActionOutcome::Gated;
        }

        match api.create_task(&self.draft.to_new_task()).await {
            Ok(task) => {
                info!("created task {} assigned to {}", task.id, task.assigned_to);
                match self.tasks.iter_mut().find(|t| t.id == task.id) {
                    Some(existing) => *existing = task,
                    None => self.tasks.push(task),
                }
                self.draft = TaskDraft::default();
                ActionOutcome::Applied
            }
            Err(e) => {
                notifier.inline(&failure_message("Failed to create task", &e));
                ActionOutcome::Failed
            }
        }
    }

    /// Sends the edited copy's mutable fields and merges them locally on success.
    pub async fn submit_edit<T: Transport>(
        &mut self,
        api: &TaskApi<T>,
        notifier: &mut dyn Notifier,
    ) -> ActionOutcome {
        let Some(selected) = self.editing.as_ref() else {
            return ActionOutcome::Gated;
        };
        if !can_submit(&selected.title, &selected.assigned_to) {
            debug!("edit gated for task {}", selected.id);
            return ActionOutcome::Gated;
        }

        let id = selected.id.clone();
        let update = TaskUpdate::from_task(selected);
        match api.update_task(&id, &update).await {
            Ok(()) => {
                info!("updated task {id}");
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    task.apply(&update);
                }
                self.editing = None;
                ActionOutcome::Applied
            }
            Err(e) => {
                notifier.inline(&failure_message("Failed to update task", &e));
                ActionOutcome::Failed
            }
        }
    }

    pub async fn delete<T: Transport>(
        &mut self,
        api: &TaskApi<T>,
        id: &str,
        confirm: &mut dyn Confirm,
        notifier: &mut dyn Notifier,
    ) -> ActionOutcome {
        if !confirm.confirm(DELETE_PROMPT) {
            return ActionOutcome::Cancelled;
        }

        match api.delete_task(id).await {
            Ok(()) => {
                info!("deleted task {id}");
                self.tasks.retain(|t| t.id != id);
                ActionOutcome::Applied
            }
            Err(e) => {
                notifier.inline(&failure_message("Failed to delete task", &e));
                ActionOutcome::Failed
            }
        }
    }
}
