//! Single-shot position acquisition on top of callback-style location platforms.
//!
//! A [`LocationPlatform`] reports through one of two callbacks, whenever it
//! likes. [`acquire_position`] bridges that into one awaitable result through
//! a oneshot channel: the first callback to fire settles it, later ones are
//! ignored, and a platform that never answers is cut off by the option timeout.

pub mod fixed;
pub mod ip;

pub use fixed::FixedPlatform;
pub use ip::IpPlatform;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::domain::PositionSample;
use crate::error::LocateError;

pub type OnPosition = Box<dyn FnOnce(PositionSample) + Send + 'static>;
pub type OnPositionError = Box<dyn FnOnce(String) + Send + 'static>;

/// How a fix should be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the caller accepts; zero demands a fresh one
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(12),
            maximum_age: Duration::ZERO,
        }
    }
}

/// A facility that can report the current position
pub trait LocationPlatform {
    /// Start a position request. Exactly one of the callbacks should be
    /// called, at any later point; dropping both means "no answer".
    fn get_current_position(
        &self,
        on_position: OnPosition,
        on_error: OnPositionError,
        options: &PositionOptions,
    );
}

type Settle = Arc<Mutex<Option<oneshot::Sender<Result<PositionSample, LocateError>>>>>;

fn settle(slot: &Settle, result: Result<PositionSample, LocateError>) {
    let sender = slot.lock().ok().and_then(|mut guard| guard.take());
    if let Some(sender) = sender {
        let _ = sender.send(result);
    }
}

/// Request one position fix.
///
/// # Errors
/// - [`LocateError::Unsupported`] when there is no platform.
/// - [`LocateError::Failed`] with the platform's reason, or when it gives
///   no answer before `options.timeout`.
pub async fn acquire_position(
    platform: Option<&dyn LocationPlatform>,
    options: PositionOptions,
) -> Result<PositionSample, LocateError> {
    let Some(platform) = platform else {
        return Err(LocateError::Unsupported);
    };

    let (tx, rx) = oneshot::channel();
    let slot: Settle = Arc::new(Mutex::new(Some(tx)));

    let success_slot = Arc::clone(&slot);
    let on_position: OnPosition = Box::new(move |sample| settle(&success_slot, Ok(sample)));
    // The callbacks own every handle to the sender, so a platform that drops
    // both of them closes the channel.
    let on_error: OnPositionError =
        Box::new(move |reason| settle(&slot, Err(LocateError::Failed(reason))));

    platform.get_current_position(on_position, on_error, &options);

    match tokio::time::timeout(options.timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_closed)) => Err(LocateError::Failed(
            "position request abandoned by the platform".to_string(),
        )),
        Err(_elapsed) => Err(LocateError::Failed(format!(
            "position request timed out after {} ms",
            options.timeout.as_millis()
        ))),
    }
}
