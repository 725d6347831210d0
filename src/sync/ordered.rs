use std::future::Future;

use futures::StreamExt;

/// Runs one task per item, strictly in order: a task is not started until
/// the previous one has finished.
pub struct OrderedTasks<T> {
    items: Vec<T>,
}

impl<T> OrderedTasks<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns each task's output in item order.
    pub async fn run<F, Fut, O>(self, task: F) -> Vec<O>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = O>,
    {
        futures::stream::iter(self.items).then(task).collect().await
    }
}
