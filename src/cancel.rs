use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation flag shared by the batch loop and delivery timers.
///
/// A child token is cancelled with its parent, but cancelling a child leaves
/// the parent and its other children running.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelToken {
            tx: Arc::new(tx),
            parent: None,
        }
    }

    pub fn child(&self) -> CancelToken {
        let (tx, _rx) = watch::channel(false);
        CancelToken {
            tx: Arc::new(tx),
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.lineage().any(|token| *token.tx.borrow())
    }

    /// Resolves once `cancel` has been called on this token or an ancestor.
    pub async fn cancelled(&self) {
        let mut receivers: Vec<watch::Receiver<bool>> =
            self.lineage().map(|token| token.tx.subscribe()).collect();
        loop {
            if receivers.iter().any(|rx| *rx.borrow()) {
                return;
            }
            let changes = receivers.iter_mut().map(|rx| Box::pin(rx.changed()));
            let (changed, _, _) = futures::future::select_all(changes).await;
            if changed.is_err() {
                // Senders live as long as `self`
                std::future::pending::<()>().await;
            }
        }
    }

    fn lineage(&self) -> impl Iterator<Item = &CancelToken> {
        std::iter::successors(Some(self), |token| token.parent.as_deref())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
