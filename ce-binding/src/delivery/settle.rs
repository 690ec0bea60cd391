use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::BindingResult;

type SettleFn = Box<dyn FnOnce(BindingResult<()>) + Send>;

/// QoS 2 的结算句柄：可克隆，只有第一次 `settle` 生效，之后的调用记录告警并忽略
#[derive(Clone)]
pub struct Settle {
    callback: Arc<Mutex<Option<SettleFn>>>,
}

impl Settle {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(BindingResult<()>) + Send + 'static,
    {
        Self {
            callback: Arc::new(Mutex::new(Some(Box::new(callback)))),
        }
    }

    pub fn settle(&self, outcome: BindingResult<()>) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match callback {
            Some(callback) => callback(outcome),
            None => tracing::warn!(?outcome, "message already settled, ignoring"),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for Settle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("settled", &self.is_settled())
            .finish()
    }
}
