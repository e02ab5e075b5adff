//! Browser sessions and their ownership rules.
//!
//! A session is checked out by exactly one worker for exactly one task and is
//! handed back through [`SessionGuard`] on every exit path, including unwinds.

pub mod chrome;

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::models::Locator;
use crate::utils::error::Result;

pub use chrome::{ChromeSession, ChromeSessionFactory};

/// A rendered page a single task drives.
pub trait PageSession: Send {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Blocks until `locator` matches at least one element and returns the
    /// match count, or fails with `AppError::Timeout`.
    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<usize>;

    /// Price text inside each of the first `limit` containers, in page order.
    /// A container without a price element yields `AppError::ElementNotFound`.
    fn price_texts(
        &mut self,
        container: &Locator,
        price: &Locator,
        limit: usize,
    ) -> Result<Vec<Result<String>>>;

    /// Whether an idle session can still be handed out.
    fn is_alive(&mut self) -> bool {
        true
    }
}

pub trait SessionFactory: Send + Sync {
    fn acquire(&self) -> Result<Box<dyn PageSession>>;

    /// `healthy == false` means the session hit an unexpected failure and
    /// must not be reused.
    fn release(&self, session: Box<dyn PageSession>, healthy: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Launch a browser for each task and tear it down afterwards.
    #[default]
    PerTask,
    /// Keep up to one idle browser per worker and reuse it.
    Pooled,
}

/// Scoped checkout of a session; releases it when dropped.
pub struct SessionGuard {
    factory: Arc<dyn SessionFactory>,
    session: Option<Box<dyn PageSession>>,
    healthy: bool,
}

impl SessionGuard {
    pub fn acquire(factory: &Arc<dyn SessionFactory>) -> Result<Self> {
        let session = factory.acquire()?;
        Ok(Self {
            factory: Arc::clone(factory),
            session: Some(session),
            healthy: true,
        })
    }

    pub fn mark_failed(&mut self) {
        self.healthy = false;
    }
}

impl Deref for SessionGuard {
    type Target = dyn PageSession;

    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the session out.
        self.session.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_deref_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let healthy = self.healthy && !std::thread::panicking();
            debug!("Releasing browser session (healthy: {})", healthy);
            self.factory.release(session, healthy);
        }
    }
}
