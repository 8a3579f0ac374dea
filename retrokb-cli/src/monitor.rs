use anyhow::{bail, Context, Result};
use log::{debug, info};
use rusb::{DeviceHandle, GlobalContext};
use retrokb_engine::KeyboardReport;
use std::time::Duration;

/// Keyboard interface and its interrupt IN endpoint.
const INTERFACE: u8 = 0;
const ENDPOINT_IN: u8 = 0x81;

/// How long one interrupt read may block before polling again.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Open the adapter by vendor/product ID.
fn open_device(vid: u16, pid: u16) -> Result<DeviceHandle<GlobalContext>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            let handle = device.open().context(
                "failed to open keyboard (may need root/sudo or udev rules)",
            )?;
            return Ok(handle);
        }
    }
    bail!("no device {:04x}:{:04x} found. Is the adapter plugged in?", vid, pid);
}

fn decode(bytes: &[u8]) -> Result<KeyboardReport> {
    let Ok(raw) = <&[u8; 8]>::try_from(bytes) else {
        bail!("expected an 8-byte boot report, got {} bytes", bytes.len());
    };
    Ok(KeyboardReport::from_bytes(raw))
}

/// Print reports until `count` have been seen, or forever.
pub fn run(vid: u16, pid: u16, count: Option<usize>) -> Result<()> {
    let handle = open_device(vid, pid)?;

    // The OS keyboard driver owns the interface; borrow it for the session.
    if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
        debug!("auto-detach unavailable: {}", err);
    }
    handle
        .claim_interface(INTERFACE)
        .context("failed to claim keyboard interface")?;
    info!("monitoring {:04x}:{:04x}", vid, pid);

    let mut seen = 0usize;
    let mut buf = [0u8; 8];
    while count.map_or(true, |n| seen < n) {
        match handle.read_interrupt(ENDPOINT_IN, &mut buf, READ_TIMEOUT) {
            Ok(len) => {
                let report = decode(&buf[..len])?;
                seen += 1;
                println!("{:02x?}  {}", report.to_bytes(), crate::describe(&report));
            }
            Err(rusb::Error::Timeout) => continue,
            Err(err) => return Err(err).context("interrupt read failed"),
        }
    }

    handle
        .release_interface(INTERFACE)
        .context("failed to release keyboard interface")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrokb_engine::{Keycode, Mods};

    #[test]
    fn decodes_boot_reports() {
        let report = decode(&[0x02, 0, 0x1F, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(report.mods(), Mods::LEFT_SHIFT);
        assert_eq!(report.keys[0], Keycode::N2.usage());
        assert_eq!(crate::describe(&report), "mods=[LShift] keys=[2]");
    }

    #[test]
    fn rejects_short_reads() {
        assert!(decode(&[0, 0, 4]).is_err());
    }
}
