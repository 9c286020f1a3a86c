//! DCD polling during a call.

use crate::port::CarrierDetect;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace, warn};

/// How the monitor decided the carrier is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierLoss {
    /// DCD read back as inactive.
    SignalDropped,
    /// The status query kept failing; the line is presumed dead.
    QueryFailed { attempts: u32 },
}

impl std::fmt::Display for CarrierLoss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignalDropped => write!(f, "DCD dropped"),
            Self::QueryFailed { attempts } => {
                write!(f, "DCD query failed {attempts} times in a row")
            }
        }
    }
}

/// Polls carrier detect on a fixed interval.
///
/// [`CarrierMonitor::watch`] resolves exactly once, on the first sign of
/// carrier loss, and never touches the program; killing it is the bridge's
/// job. Dropping the future stops the polling.
#[derive(Debug, Clone)]
pub struct CarrierMonitor {
    status: Arc<dyn CarrierDetect>,
    interval: Duration,
    max_failures: u32,
}

impl CarrierMonitor {
    pub fn new(status: Arc<dyn CarrierDetect>, interval: Duration, max_failures: u32) -> Self {
        Self {
            status,
            interval,
            max_failures: max_failures.max(1),
        }
    }

    pub async fn watch(&self) -> CarrierLoss {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            ticker.tick().await;
            match self.status.carrier_detect().await {
                Ok(true) => {
                    trace!("carrier present");
                    failures = 0;
                }
                Ok(false) => {
                    info!("carrier detect dropped");
                    return CarrierLoss::SignalDropped;
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "carrier detect query failed");
                    if failures >= self.max_failures {
                        return CarrierLoss::QueryFailed { attempts: failures };
                    }
                }
            }
        }
    }
}
