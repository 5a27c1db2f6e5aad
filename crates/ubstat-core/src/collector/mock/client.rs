//! Scripted remote-control client for tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use crate::collector::unbound::{ControlClient, TransportError};

/// Shared view of the commands a [`MockClient`] received.
///
/// Stays valid after the client is moved into a collector.
#[derive(Debug, Clone, Default)]
pub struct SentCommands(Arc<Mutex<Vec<String>>>);

impl SentCommands {
    pub fn all(&self) -> Vec<String> {
        self.0.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, command: &str) {
        if let Ok(mut sent) = self.0.lock() {
            sent.push(command.to_string());
        }
    }
}

/// Replays queued responses, one per `send`.
///
/// Once the script is exhausted every call fails with a connection error,
/// which is what a collector sees when the service goes away.
#[derive(Debug, Default)]
pub struct MockClient {
    responses: VecDeque<Result<Vec<String>, TransportError>>,
    sent: SentCommands,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn respond<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responses
            .push_back(Ok(lines.into_iter().map(Into::into).collect()));
        self
    }

    /// Queues a failed exchange.
    pub fn fail(mut self, error: TransportError) -> Self {
        self.responses.push_back(Err(error));
        self
    }

    pub fn sent(&self) -> SentCommands {
        self.sent.clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl ControlClient for MockClient {
    fn send(&mut self, command: &str) -> Result<Vec<String>, TransportError> {
        self.sent.push(command);
        self.responses.pop_front().unwrap_or_else(|| {
            Err(TransportError::Connect(
                "mock".to_string(),
                io::Error::new(io::ErrorKind::ConnectionRefused, "no scripted response"),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_fails() {
        let mut client = MockClient::new()
            .respond(["total.num.queries=1"])
            .fail(TransportError::Timeout);
        let sent = client.sent();
        assert!(sent.is_empty());

        assert_eq!(client.send("stats_noreset").unwrap(), vec!["total.num.queries=1"]);
        assert!(matches!(client.send("stats_noreset"), Err(TransportError::Timeout)));
        assert!(matches!(
            client.send("stats_noreset"),
            Err(TransportError::Connect(..))
        ));
        assert_eq!(sent.len(), 3);
        assert_eq!(client.remaining(), 0);
    }
}
