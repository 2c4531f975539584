use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub active: bool,
    pub output: String,
    pub progress: usize,
    pub total: usize,
}

/// Progress of the batch currently running, as shown by the status API.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: Mutex<StatusSnapshot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a batch of `total` searches as started. Returns false, leaving the
    /// board untouched, when another batch is still active.
    pub async fn try_start(&self, total: usize) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.active {
            return false;
        }
        *inner = StatusSnapshot {
            active: true,
            output: String::new(),
            progress: 0,
            total,
        };
        true
    }

    pub async fn log(&self, line: impl AsRef<str>) {
        let mut inner = self.inner.lock().await;
        inner.output.push_str(line.as_ref());
        inner.output.push('\n');
    }

    pub async fn advance(&self) {
        self.inner.lock().await.progress += 1;
    }

    pub async fn finish(&self) {
        self.inner.lock().await.active = false;
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.active
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().await.clone()
    }
}
