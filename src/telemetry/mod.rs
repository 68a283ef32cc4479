//! Best-effort analytics sink.
//!
//! Reports never block the session and never fail it: `report` swallows
//! errors after logging them at debug level.

use bevy::log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use crate::shared::Currency;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    #[error("telemetry backend unavailable: {0}")]
    Unavailable(String),
    #[error("could not encode telemetry event: {0}")]
    Encode(String),
}

pub trait Telemetry: Send + Sync + 'static {
    fn report_item_acquired(
        &self,
        currency: Currency,
        amount: u32,
        context: &str,
    ) -> Result<(), TelemetryError>;
}

/// Fire-and-forget wrapper used by the session.
pub fn report(telemetry: &dyn Telemetry, currency: Currency, amount: u32, context: &str) {
    if let Err(err) = telemetry.report_item_acquired(currency, amount, context) {
        debug!("[Telemetry] Dropped {} {} ({}): {}", amount, currency, context, err);
    }
}

#[derive(Debug, Serialize)]
struct ItemAcquired<'a> {
    event: &'static str,
    currency: Currency,
    amount: u32,
    context: &'a str,
}

/// Writes each event as a JSON line through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl LogTelemetry {
    fn encode(currency: Currency, amount: u32, context: &str) -> Result<String, TelemetryError> {
        serde_json::to_string(&ItemAcquired {
            event: "item_acquired",
            currency,
            amount,
            context,
        })
        .map_err(|e| TelemetryError::Encode(e.to_string()))
    }
}

impl Telemetry for LogTelemetry {
    fn report_item_acquired(
        &self,
        currency: Currency,
        amount: u32,
        context: &str,
    ) -> Result<(), TelemetryError> {
        let line = Self::encode(currency, amount, context)?;
        info!("[Telemetry] {}", line);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn report_item_acquired(&self, _: Currency, _: u32, _: &str) -> Result<(), TelemetryError> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Shared log of every report, cloneable into a boxed sink.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingTelemetry {
        pub events: Arc<Mutex<Vec<(Currency, u32, String)>>>,
    }

    impl RecordingTelemetry {
        pub fn events(&self) -> Vec<(Currency, u32, String)> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Telemetry for RecordingTelemetry {
        fn report_item_acquired(
            &self,
            currency: Currency,
            amount: u32,
            context: &str,
        ) -> Result<(), TelemetryError> {
            self.events
                .lock()
                .unwrap()
                .push((currency, amount, context.to_string()));
            Ok(())
        }
    }

    pub struct OfflineTelemetry;

    impl Telemetry for OfflineTelemetry {
        fn report_item_acquired(&self, _: Currency, _: u32, _: &str) -> Result<(), TelemetryError> {
            Err(TelemetryError::Unavailable("offline".to_string()))
        }
    }
}
