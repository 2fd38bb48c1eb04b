//! Scan forwarding: turns central events into discovered peripherals.

use btleplug::api::{Central as _, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::Adapter;
use tokio::sync::mpsc;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::ReceiverStream;

use bulb_app::ports::EventStream;
use bulb_domain::peripheral::PeripheralHandle;

use crate::error::BleError;

const SCAN_BUFFER: usize = 32;

/// Start an unfiltered scan and forward every advertising peripheral.
///
/// Discovery and update events are both forwarded so a bulb already known to
/// the stack is reported again. The forwarding task ends when the returned
/// stream is dropped.
///
/// # Errors
///
/// Returns [`BleError`] when the event stream cannot be opened or the scan
/// cannot be started.
pub(crate) async fn start(central: &Adapter) -> Result<EventStream<PeripheralHandle>, BleError> {
    let mut events = central.events().await?;
    central.start_scan(ScanFilter::default()).await?;

    let (tx, rx) = mpsc::channel(SCAN_BUFFER);
    let central = central.clone();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };
            let Ok(peripheral) = central.peripheral(&id).await else {
                continue;
            };
            let name = match peripheral.properties().await {
                Ok(props) => props.and_then(|props| props.local_name),
                Err(err) => {
                    tracing::debug!(%err, "failed to read peripheral properties");
                    None
                }
            };
            let handle = PeripheralHandle::new(id.to_string(), name);
            if tx.send(handle).await.is_err() {
                break;
            }
        }
        tracing::debug!("BLE scan forwarding stopped");
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}
