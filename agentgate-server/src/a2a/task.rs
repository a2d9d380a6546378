// Copyright 2025 Agentgate Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Task lifecycle for one inbound message.

use chrono::Utc;
use thiserror::Error;

use super::protocol::{Artifact, Message, Part, Task, TaskState, TaskStatus};

#[derive(Debug, Error)]
pub enum TaskStateError {
    #[error("task {task_id} already reached final state {state:?}")]
    Finalized { task_id: String, state: TaskState },
}

/// Moves a task through `submitted -> working -> final`.
///
/// Once a final update was published the task is closed: further status
/// changes and artifacts are rejected.
#[derive(Debug)]
pub struct TaskUpdater {
    task: Task,
    finalized: bool,
}

impl TaskUpdater {
    /// New submitted task for `message`, reusing its context id if it has one.
    pub fn new(message: &Message) -> Self {
        let task_id = uuid::Uuid::new_v4().to_string();
        let context_id = message
            .context_id
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut first = message.clone();
        first.task_id = Some(task_id.clone());
        first.context_id = Some(context_id.clone());

        Self {
            task: Task {
                id: task_id,
                context_id,
                status: TaskStatus {
                    state: TaskState::Submitted,
                    message: None,
                    timestamp: Utc::now().to_rfc3339(),
                },
                artifacts: Vec::new(),
                history: vec![first],
                kind: "task".to_string(),
            },
            finalized: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task.id
    }

    pub fn context_id(&self) -> &str {
        &self.task.context_id
    }

    pub fn state(&self) -> TaskState {
        self.task.status.state
    }

    pub fn is_final(&self) -> bool {
        self.finalized
    }

    fn ensure_open(&self) -> Result<(), TaskStateError> {
        if self.finalized {
            return Err(TaskStateError::Finalized {
                task_id: self.task.id.clone(),
                state: self.task.status.state,
            });
        }
        Ok(())
    }

    pub fn update_status(
        &mut self,
        state: TaskState,
        message: Option<Message>,
        final_update: bool,
    ) -> Result<(), TaskStateError> {
        self.ensure_open()?;
        if let Some(message) = &message {
            self.task.history.push(message.clone());
        }
        self.task.status = TaskStatus {
            state,
            message,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.finalized = final_update;
        Ok(())
    }

    pub fn start_work(&mut self) -> Result<(), TaskStateError> {
        self.update_status(TaskState::Working, None, false)
    }

    pub fn add_artifact(&mut self, name: &str, parts: Vec<Part>) -> Result<(), TaskStateError> {
        self.ensure_open()?;
        self.task.artifacts.push(Artifact {
            artifact_id: uuid::Uuid::new_v4().to_string(),
            name: Some(name.to_string()),
            parts,
        });
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), TaskStateError> {
        self.update_status(TaskState::Completed, None, true)
    }

    /// Final `input-required` with an explanatory agent message.
    pub fn requires_input(&mut self, text: &str) -> Result<(), TaskStateError> {
        let message = Message::agent_text(text, &self.task.context_id, &self.task.id);
        self.update_status(TaskState::InputRequired, Some(message), true)
    }

    pub fn failed(&mut self, text: &str) -> Result<(), TaskStateError> {
        let message = Message::agent_text(text, &self.task.context_id, &self.task.id);
        self.update_status(TaskState::Failed, Some(message), true)
    }

    pub fn into_task(self) -> Task {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut updater = TaskUpdater::new(&Message::user_text("hi"));
        assert_eq!(updater.state(), TaskState::Submitted);

        updater.start_work().unwrap();
        updater.add_artifact("result", vec![Part::text("done")]).unwrap();
        updater.complete().unwrap();

        let task = updater.into_task();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts[0].name.as_deref(), Some("result"));
        assert_eq!(task.history[0].task_id.as_deref(), Some(task.id.as_str()));
    }

    #[test]
    fn test_no_transition_after_final() {
        let mut updater = TaskUpdater::new(&Message::user_text("hi"));
        updater.start_work().unwrap();
        updater.requires_input("need more").unwrap();

        assert!(updater.complete().is_err());
        assert!(updater.add_artifact("late", vec![]).is_err());
        assert_eq!(updater.state(), TaskState::InputRequired);
    }

    #[test]
    fn test_context_id_is_reused() {
        let mut message = Message::user_text("hi");
        message.context_id = Some("ctx-1".to_string());
        let updater = TaskUpdater::new(&message);
        assert_eq!(updater.context_id(), "ctx-1");
    }
}
