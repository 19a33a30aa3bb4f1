//! Cancellation-aware holder of the displayed image state.
//!
//! Each [`ImageSession::select`] starts a fresh resolution with its own cancel
//! flag and cancels the previous one. A task checks its flag under the view
//! lock before every write, so a superseded resolution can never overwrite the
//! view of the subject that replaced it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::debug;

use super::{ImageCandidate, ImageResolver, ImageSubject, Resolution};

/// Snapshot of what the UI should show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageView {
    pub image_url: Option<String>,
    pub candidates: Vec<ImageCandidate>,
    pub loading: bool,
    pub error: Option<String>,
}

impl From<Resolution> for ImageView {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Idle => Self::default(),
            Resolution::Resolved {
                selected_url,
                candidates,
                ..
            } => Self {
                image_url: selected_url,
                candidates,
                loading: false,
                error: None,
            },
            Resolution::Failed { message } => Self {
                error: Some(message),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug)]
pub struct ImageSession {
    resolver: ImageResolver,
    view: Arc<Mutex<ImageView>>,
    active: Mutex<Option<Arc<AtomicBool>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Applies `update` unless `cancelled` is set. Returns whether it applied.
fn write_if_current(view: &Mutex<ImageView>, cancelled: &AtomicBool, update: impl FnOnce(&mut ImageView)) -> bool {
    let mut guard = lock(view);
    if cancelled.load(Ordering::SeqCst) {
        return false;
    }
    update(&mut guard);
    true
}

impl ImageSession {
    #[must_use]
    pub fn new(resolver: ImageResolver) -> Self {
        Self {
            resolver,
            view: Arc::new(Mutex::new(ImageView::default())),
            active: Mutex::new(None),
        }
    }

    /// Current view snapshot.
    #[must_use]
    pub fn current(&self) -> ImageView {
        lock(&self.view).clone()
    }

    /// Switches to `subject`, cancelling any in-flight resolution.
    ///
    /// Must be called inside a Tokio runtime. The returned handle finishes
    /// when this resolution has either written its result or been discarded.
    pub fn select(&self, subject: ImageSubject) -> JoinHandle<()> {
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut active = lock(&self.active);
            if let Some(previous) = active.replace(cancelled.clone()) {
                // Under the view lock so no write of the old task can interleave.
                let _view = lock(&self.view);
                previous.store(true, Ordering::SeqCst);
            }
        }

        let resolver = self.resolver.clone();
        let view = self.view.clone();
        tokio::spawn(async move {
            let has_subject = subject.key().is_some();
            let started = write_if_current(&view, &cancelled, |v| {
                *v = ImageView {
                    loading: has_subject,
                    ..ImageView::default()
                };
            });
            if !started || !has_subject {
                return;
            }

            let resolution = resolver.resolve(&subject).await;
            let applied = write_if_current(&view, &cancelled, |v| *v = resolution.into());
            if !applied {
                debug!(subject = subject.key().unwrap_or_default(), "discarding superseded resolution");
            }
        })
    }
}
