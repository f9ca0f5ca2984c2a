// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Flags raised asynchronously (signals, in-band terminal events) and
/// consumed by the control loop. Setting a flag is the only thing the
/// asynchronous side ever does.
#[derive(Debug, Default)]
pub struct SignalLatch {
    resize_pending: AtomicBool,
    shutdown_pending: AtomicBool,
}

impl SignalLatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_resize(&self) {
        self.resize_pending.store(true, Ordering::SeqCst);
    }

    pub fn request_shutdown(&self) {
        self.shutdown_pending.store(true, Ordering::SeqCst);
    }

    pub fn take_resize(&self) -> bool {
        self.resize_pending.swap(false, Ordering::SeqCst)
    }

    pub fn take_shutdown(&self) -> bool {
        self.shutdown_pending.swap(false, Ordering::SeqCst)
    }

    pub fn is_resize_pending(&self) -> bool {
        self.resize_pending.load(Ordering::SeqCst)
    }

    pub fn is_shutdown_pending(&self) -> bool {
        self.shutdown_pending.load(Ordering::SeqCst)
    }

    pub fn any_pending(&self) -> bool {
        self.is_resize_pending() || self.is_shutdown_pending()
    }
}

/// Routes SIGWINCH, SIGINT and SIGTERM into `latch` from a background task.
#[cfg(unix)]
pub fn spawn_listener(latch: Arc<SignalLatch>) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut winch = signal(SignalKind::window_change())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = winch.recv() => {
                    debug!("SIGWINCH received");
                    latch.request_resize();
                }
                Some(()) = interrupt.recv() => {
                    info!("SIGINT received");
                    latch.request_shutdown();
                }
                Some(()) = terminate.recv() => {
                    info!("SIGTERM received");
                    latch.request_shutdown();
                }
                else => break,
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_listener(latch: Arc<SignalLatch>) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            latch.request_shutdown();
        }
    }))
}
