//! BLE adapter error types.

use bulb_domain::error::TransportError;

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// The configured adapter index is out of range.
    #[error("BLE adapter #{index} not found, {available} available")]
    AdapterNotFound {
        /// Requested index.
        index: usize,
        /// Number of adapters on the host.
        available: usize,
    },

    /// The peripheral does not expose the requested service.
    #[error("service {uuid} not found on peripheral")]
    ServiceNotFound {
        /// Requested service UUID.
        uuid: uuid::Uuid,
    },

    /// The BLE stack reported a failure.
    #[error("BLE stack error")]
    Stack(#[from] btleplug::Error),
}

impl BleError {
    /// Convert into a [`TransportError`] for propagation across the port
    /// boundary. A stack-level "not connected" becomes
    /// [`TransportError::Disconnected`] so the session can reconnect.
    #[must_use]
    pub fn into_transport(self) -> TransportError {
        match self {
            Self::Stack(btleplug::Error::NotConnected) => TransportError::Disconnected,
            other => TransportError::Adapter(Box::new(other)),
        }
    }
}

impl From<BleError> for TransportError {
    fn from(err: BleError) -> Self {
        err.into_transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_adapter_not_found_error() {
        let err = BleError::AdapterNotFound {
            index: 2,
            available: 1,
        };
        assert_eq!(err.to_string(), "BLE adapter #2 not found, 1 available");
    }

    #[test]
    fn should_display_stack_error() {
        let err = BleError::Stack(btleplug::Error::DeviceNotFound);
        assert_eq!(err.to_string(), "BLE stack error");
    }

    #[test]
    fn should_convert_not_connected_to_disconnected() {
        let err: TransportError = BleError::Stack(btleplug::Error::NotConnected).into();
        assert!(err.is_disconnect());
    }

    #[test]
    fn should_wrap_other_errors_as_adapter_errors() {
        let err: TransportError = BleError::Stack(btleplug::Error::DeviceNotFound).into();
        assert!(matches!(err, TransportError::Adapter(_)));

        let err: TransportError = BleError::ServiceNotFound {
            uuid: uuid::Uuid::nil(),
        }
        .into();
        assert!(matches!(err, TransportError::Adapter(_)));
    }
}
