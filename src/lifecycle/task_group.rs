//! A group of concurrent tasks joined as one.

use std::future::Future;

use tokio::task::{Id, JoinSet};

use crate::error::Error;

/// Runs independent tasks concurrently and waits for all of them.
#[derive(Debug, Default)]
pub struct TaskGroup {
    tasks: JoinSet<Result<(), Error>>,
    names: Vec<(Id, String)>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `task` on the runtime as part of this group.
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let name = name.into();
        let abort = self.tasks.spawn(task);
        tracing::debug!(task = %name, "Task started");
        self.names.push((abort.id(), name));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task, then return the first error in completion order.
    ///
    /// Later errors are logged, not returned.
    pub async fn wait(self) -> Result<(), Error> {
        let mut errors = self.wait_all().await.into_iter();
        let first = errors.next();
        for e in errors {
            tracing::warn!(error = %e, "Discarding secondary task error");
        }
        first.map_or(Ok(()), Err)
    }

    /// Wait for every task and collect all errors in completion order.
    pub async fn wait_all(mut self) -> Vec<Error> {
        let mut errors = Vec::new();
        while let Some(joined) = self.tasks.join_next_with_id().await {
            let result = match joined {
                Ok((_, result)) => result,
                Err(e) => Err(Error::TaskPanicked {
                    task: self.name_of(e.id()),
                }),
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }
        errors
    }

    fn name_of(&self, id: Id) -> String {
        self.names
            .iter()
            .find(|(task, _)| *task == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
