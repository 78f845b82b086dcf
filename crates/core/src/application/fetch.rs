// Default Fetcher Factory
//
// The fetch loop itself belongs to the job-fetching collaborators; this only
// allocates the channels they communicate through.

use crate::application::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
use crate::domain::{Message, Namespace};
use crate::port::{Fetcher, FetcherFactory};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of a fetcher's message channel (a hand-off, not a buffer)
pub const MESSAGE_CHANNEL_CAPACITY: usize = 1;

/// Fetcher backed by a message channel and a stop signal
pub struct ChannelFetcher {
    queue: String,
    queue_key: String,
    sender: mpsc::Sender<Message>,
    receiver: Option<mpsc::Receiver<Message>>,
    stop: ShutdownSender,
    stop_token: ShutdownToken,
}

impl ChannelFetcher {
    pub fn new(queue: &str, namespace: &Namespace) -> Self {
        let (sender, receiver) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (stop, stop_token) = shutdown_channel();
        Self {
            queue: queue.to_string(),
            queue_key: namespace.key(&format!("queue:{}", queue)),
            sender,
            receiver: Some(receiver),
            stop,
            stop_token,
        }
    }

    /// Sending end used by the fetch loop
    pub fn sender(&self) -> mpsc::Sender<Message> {
        self.sender.clone()
    }

    /// Signal observed by the fetch loop
    pub fn stop_token(&self) -> ShutdownToken {
        self.stop_token.clone()
    }
}

impl Fetcher for ChannelFetcher {
    fn queue(&self) -> &str {
        &self.queue
    }

    fn queue_key(&self) -> &str {
        &self.queue_key
    }

    fn messages(&mut self) -> Option<mpsc::Receiver<Message>> {
        self.receiver.take()
    }

    fn stop(&self) {
        self.stop.shutdown();
    }
}

/// Factory producing a fresh `ChannelFetcher` per queue
pub fn default_fetcher_factory() -> Arc<dyn FetcherFactory> {
    Arc::new(|queue: &str, namespace: &Namespace| -> Box<dyn Fetcher> {
        Box::new(ChannelFetcher::new(queue, namespace))
    })
}
