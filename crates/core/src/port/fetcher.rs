// Fetcher Port (job-fetching collaborators live outside this crate)

use crate::domain::{Message, Namespace};
use tokio::sync::mpsc;

/// Pulls job payloads off one named queue.
pub trait Fetcher: Send {
    /// Queue name as given by the caller
    fn queue(&self) -> &str;

    /// Fully namespaced store key of the queue
    fn queue_key(&self) -> &str;

    /// Take the receiving end of the message channel (only once)
    fn messages(&mut self) -> Option<mpsc::Receiver<Message>>;

    /// Ask the fetcher to stop
    fn stop(&self);
}

/// Maps a queue name to a new fetcher. Must be cheap and side-effect free.
pub trait FetcherFactory: Send + Sync {
    fn fetcher(&self, queue: &str, namespace: &Namespace) -> Box<dyn Fetcher>;
}

impl<F> FetcherFactory for F
where
    F: Fn(&str, &Namespace) -> Box<dyn Fetcher> + Send + Sync,
{
    fn fetcher(&self, queue: &str, namespace: &Namespace) -> Box<dyn Fetcher> {
        self(queue, namespace)
    }
}
