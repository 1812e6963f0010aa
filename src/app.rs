//! Live event loop
//!
//! One consumer owns the `Session`. Inbound items arrive over a channel from
//! the socket listener; the debounce deadline is slept on inside the same
//! `select!`, so a clear never races an incoming signal.

use crate::config::WatchConfig;
use crate::event::Inbound;
use crate::state::{current_timestamp_ms, Session, SessionView};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub session: Session,
    /// Set when state changed since the last emitted view
    pub needs_render: bool,
}

impl App {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            session: Session::new(config),
            needs_render: true, // Always emit the initial view
        }
    }

    pub fn handle_inbound(&mut self, inbound: Inbound, now: i64) {
        let changed = self.session.apply(inbound, now);
        self.needs_render = self.needs_render || changed;
    }

    pub fn tick(&mut self, now: i64) {
        let changed = self.session.tick(now);
        self.needs_render = self.needs_render || changed;
    }

    /// View to emit, if anything changed since the last call
    pub fn take_view(&mut self, now: i64) -> Option<SessionView> {
        if !self.needs_render {
            return None;
        }
        self.needs_render = false;
        Some(self.session.view(now))
    }
}

/// Milliseconds from `now` until `deadline`, zero if already due
fn wait_ms(deadline: i64, now: i64) -> u64 {
    deadline.saturating_sub(now).max(0) as u64
}

/// Sleep until an epoch-ms deadline, or forever when there is none
async fn sleep_until(deadline: Option<i64>) {
    match deadline {
        Some(at) => {
            let wait = wait_ms(at, current_timestamp_ms());
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Drive the session until cancelled or the channel closes
///
/// `emit` is called with every changed view. Returns the app so callers can
/// inspect the final state.
pub async fn run<F>(
    mut app: App,
    mut rx: mpsc::Receiver<Inbound>,
    cancel: CancellationToken,
    mut emit: F,
) -> App
where
    F: FnMut(&SessionView),
{
    if let Some(view) = app.take_view(current_timestamp_ms()) {
        emit(&view);
    }

    loop {
        let deadline = app.session.next_deadline();
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Event loop cancelled");
                break;
            }
            inbound = rx.recv() => {
                let Some(inbound) = inbound else {
                    tracing::debug!("Inbound channel closed");
                    break;
                };
                app.handle_inbound(inbound, current_timestamp_ms());
            }
            () = sleep_until(deadline) => {
                app.tick(current_timestamp_ms());
            }
        }

        if let Some(view) = app.take_view(current_timestamp_ms()) {
            emit(&view);
        }
    }

    app
}
