use log::info;

use crate::api::TaskApi;
use crate::gateway::Transport;
use crate::models::{ActionOutcome, Task, TaskStats, TaskStatus, TaskUpdate};
use crate::notify::{failure_message, Notifier};

/// Task state behind the end-user dashboard. Only status is writable.
#[derive(Debug, Default)]
pub struct UserController {
    tasks: Vec<Task>,
}

impl UserController {
    pub fn new(tasks: Vec<Task>) -> Self {
        UserController { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    pub async fn update_status<T: Transport>(
        &mut self,
        api: &TaskApi<T>,
        id: &str,
        status: TaskStatus,
        notifier: &mut dyn Notifier,
    ) -> ActionOutcome {
        let update = TaskUpdate::status_only(status);
        match api.update_task(id, &update).await {
            Ok(()) => {
                info!("task {id} moved to {}", status.as_str());
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    task.status = status;
                }
                ActionOutcome::Applied
            }
            Err(e) => {
                notifier.inline(&failure_message("Failed to update status", &e));
                ActionOutcome::Failed
            }
        }
    }
}
