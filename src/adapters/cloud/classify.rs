use crate::error::{DeliveryErrorKind, DeliveryFailure};

/// Maps an error response from the storage API onto the closed set of
/// delivery error kinds. This is the only place vendor messages are read.
pub fn classify(status: u16, message: &str) -> DeliveryErrorKind {
    let lower = message.to_ascii_lowercase();

    match status {
        401 | 403 => DeliveryErrorKind::AuthFailure,
        413 => DeliveryErrorKind::SizeExceeded,
        _ if lower.contains("synchronously") || lower.contains("eager_async") => {
            DeliveryErrorKind::SyncNotSupported
        }
        400 | 420 if lower.contains("too large") || lower.contains("file size") => {
            DeliveryErrorKind::SizeExceeded
        }
        500..=599 => DeliveryErrorKind::Transport,
        _ => DeliveryErrorKind::Rejected,
    }
}

pub fn failure(status: u16, message: impl Into<String>) -> DeliveryFailure {
    let message = message.into();
    DeliveryFailure::new(classify(status, &message), format!("{} {}", status, message))
}

pub fn transport(err: reqwest::Error) -> DeliveryFailure {
    DeliveryFailure::new(DeliveryErrorKind::Transport, err.to_string())
}
