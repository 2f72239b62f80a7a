use std::sync::atomic::{AtomicUsize, Ordering};

use nfm_compliance::ComplianceOracle;
use nfm_schemas::{ComplianceResponse, FetchError};
use tokio::sync::{mpsc, oneshot, Mutex};

type Reply = Result<ComplianceResponse, FetchError>;

/// One outstanding oracle call, waiting for the test to answer it.
#[derive(Debug)]
pub struct PendingCheck {
    pub address: String,
    reply: oneshot::Sender<Reply>,
}

impl PendingCheck {
    pub fn respond(self, reply: Reply) {
        // The gate may already have dropped the call; nothing to deliver then.
        let _ = self.reply.send(reply);
    }

    pub fn approve(self) {
        self.respond(Ok(ComplianceResponse {
            success: true,
            is_approved: true,
        }));
    }

    pub fn deny(self) {
        self.respond(Ok(ComplianceResponse {
            success: false,
            is_approved: false,
        }));
    }

    pub fn fail(self, err: FetchError) {
        self.respond(Err(err));
    }
}

/// Oracle whose every `check` blocks until the test releases it via
/// [`ScriptedOracle::next_call`].
pub struct ScriptedOracle {
    calls_tx: mpsc::UnboundedSender<PendingCheck>,
    calls_rx: Mutex<mpsc::UnboundedReceiver<PendingCheck>>,
    issued: AtomicUsize,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        let (calls_tx, calls_rx) = mpsc::unbounded_channel();
        Self {
            calls_tx,
            calls_rx: Mutex::new(calls_rx),
            issued: AtomicUsize::new(0),
        }
    }

    /// Wait for the next call the gate makes.
    pub async fn next_call(&self) -> PendingCheck {
        let mut rx = self.calls_rx.lock().await;
        match rx.recv().await {
            Some(call) => call,
            // `self` owns the sender, so the channel cannot close while borrowed.
            None => unreachable!("scripted oracle channel closed"),
        }
    }

    /// Number of checks issued so far.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ComplianceOracle for ScriptedOracle {
    fn oracle_name(&self) -> &'static str {
        "scripted"
    }

    async fn check(&self, address: &str) -> Result<ComplianceResponse, FetchError> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let (reply, rx) = oneshot::channel();
        if self
            .calls_tx
            .send(PendingCheck {
                address: address.to_string(),
                reply,
            })
            .is_err()
        {
            return Err(FetchError::Network("scripted oracle closed".to_string()));
        }
        rx.await
            .unwrap_or_else(|_| Err(FetchError::Network("scripted reply dropped".to_string())))
    }
}
