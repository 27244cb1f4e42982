//! Raw HCI socket backend.
//!
//! This backend drives LE scanning on a raw Linux HCI socket without the
//! BlueZ daemon. It requires CAP_NET_RAW and CAP_NET_ADMIN capabilities or
//! root privileges.
//!
//! Scanning is active so that scan responses, which is where the watch puts
//! its Complete Local Name, are delivered too.

use super::{AdvertisementSource, DiscoveryHandler, ScanError, window_deadline};
use crate::advertisement::{DiscoveryEvent, parse_ad_structures};
use crate::mac_address::MacAddress;
use libc::{
    AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_RAW, c_int, c_void, sockaddr, socklen_t,
};
use log::debug;
use std::future::Future;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::pin::Pin;
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::time::{Instant, timeout_at};

/// Controller index used by [`super::open`] (`hci0`).
pub const DEFAULT_DEVICE: u16 = 0;

const BTPROTO_HCI: c_int = 1;
const SOL_HCI: c_int = 0;
const HCI_FILTER: c_int = 2;
const HCI_CHANNEL_RAW: u16 = 0;

const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;

const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

const LE_SCAN_ACTIVE: u8 = 0x01;
const LE_PUBLIC_ADDRESS: u8 = 0x00;
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

/// 10ms in 0.625ms units.
const SCAN_INTERVAL: u16 = 0x0010;
const SCAN_WINDOW: u16 = 0x0010;

/// Largest HCI event: header plus 255 parameter bytes.
const MAX_EVENT_SIZE: usize = 258;

#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn new() -> Self {
        Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        }
    }

    fn set_ptype(&mut self, ptype: u8) {
        self.type_mask |= 1 << (ptype as u32);
    }

    fn set_event(&mut self, event: u8) {
        let bit = event as usize;
        self.event_mask[bit / 32] |= 1 << (bit % 32);
    }
}

/// Map a socket error to a scan error.
///
/// ENODEV and ENETDOWN mean the controller was removed or powered down.
fn socket_error(context: &str, err: io::Error) -> ScanError {
    match err.raw_os_error() {
        Some(libc::ENODEV) | Some(libc::ENETDOWN) => {
            ScanError::Disconnected(format!("{context}: {err}"))
        }
        _ => ScanError::Bluetooth(format!("{context}: {err}")),
    }
}

fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

fn scan_parameters_packet() -> Vec<u8> {
    let mut params = Vec::with_capacity(7);
    params.push(LE_SCAN_ACTIVE);
    params.extend_from_slice(&SCAN_INTERVAL.to_le_bytes());
    params.extend_from_slice(&SCAN_WINDOW.to_le_bytes());
    params.push(LE_PUBLIC_ADDRESS);
    params.push(FILTER_POLICY_ACCEPT_ALL);
    hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &params)
}

fn scan_enable_packet(enable: bool) -> Vec<u8> {
    // Duplicate filtering off: every heart rate update is a duplicate.
    hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[u8::from(enable), 0x00])
}

fn open_hci_socket(dev_id: u16) -> Result<OwnedFd, ScanError> {
    // SOCK_NONBLOCK is required for AsyncFd
    let fd = unsafe {
        libc::socket(
            AF_BLUETOOTH,
            SOCK_RAW | SOCK_CLOEXEC | SOCK_NONBLOCK,
            BTPROTO_HCI,
        )
    };
    if fd < 0 {
        return Err(socket_error(
            "Failed to create HCI socket",
            io::Error::last_os_error(),
        ));
    }
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    let addr = SockaddrHci {
        hci_family: AF_BLUETOOTH as u16,
        hci_dev: dev_id,
        hci_channel: HCI_CHANNEL_RAW,
    };
    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const SockaddrHci as *const sockaddr,
            mem::size_of::<SockaddrHci>() as socklen_t,
        )
    };
    if ret < 0 {
        return Err(socket_error(
            &format!("Failed to bind HCI socket to hci{dev_id}"),
            io::Error::last_os_error(),
        ));
    }

    Ok(fd)
}

fn set_hci_filter(fd: &OwnedFd) -> Result<(), ScanError> {
    let mut filter = HciFilter::new();
    filter.set_ptype(HCI_EVENT_PKT);
    filter.set_event(EVT_LE_META_EVENT);

    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            SOL_HCI,
            HCI_FILTER,
            &filter as *const HciFilter as *const c_void,
            mem::size_of::<HciFilter>() as socklen_t,
        )
    };
    if ret < 0 {
        return Err(socket_error("Failed to set HCI filter", io::Error::last_os_error()));
    }

    Ok(())
}

fn send_hci_command(fd: &OwnedFd, packet: &[u8]) -> Result<(), ScanError> {
    let ret = unsafe {
        libc::write(
            fd.as_raw_fd(),
            packet.as_ptr() as *const c_void,
            packet.len(),
        )
    };
    if ret < 0 {
        return Err(socket_error(
            "Failed to send HCI command",
            io::Error::last_os_error(),
        ));
    }
    Ok(())
}

/// Parse an HCI LE Advertising Report event into discovery events.
///
/// `packet` starts at the HCI packet type octet. Each report is laid out as
/// event type, address type, address (little-endian), data length, data, RSSI.
/// Parsing stops at the first truncated report.
fn parse_advertising_report(packet: &[u8]) -> Vec<DiscoveryEvent> {
    let mut events = Vec::new();

    if packet.len() < 5
        || packet[0] != HCI_EVENT_PKT
        || packet[1] != EVT_LE_META_EVENT
        || packet[3] != EVT_LE_ADVERTISING_REPORT
    {
        return events;
    }

    let num_reports = packet[4] as usize;
    let mut offset = 5;

    for _ in 0..num_reports {
        // event type + address type + address + data length
        if packet.len() < offset + 9 {
            break;
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&packet[offset + 2..offset + 8]);
        addr.reverse();

        let data_len = packet[offset + 8] as usize;
        let data_start = offset + 9;
        // data + RSSI
        if packet.len() < data_start + data_len + 1 {
            break;
        }

        let fields = parse_ad_structures(&packet[data_start..data_start + data_len]);
        events.push(DiscoveryEvent::new(MacAddress(addr), fields));

        offset = data_start + data_len + 1;
    }

    events
}

/// Advertisement source reading raw HCI events from one controller.
pub struct HciSource {
    events: AsyncFd<OwnedFd>,
    commands: OwnedFd,
}

impl HciSource {
    /// Open `hci<dev_id>` for scanning.
    ///
    /// Two sockets are used: a filtered one that only receives LE meta events,
    /// and one for sending commands.
    pub fn open(dev_id: u16) -> Result<Self, ScanError> {
        let fd = open_hci_socket(dev_id)?;
        set_hci_filter(&fd)?;
        let commands = open_hci_socket(dev_id)?;

        let events = AsyncFd::new(fd).map_err(|e| socket_error("Failed to create async fd", e))?;

        debug!("Using controller hci{dev_id}");
        Ok(Self { events, commands })
    }

    fn set_scanning(&self, enable: bool) -> Result<(), ScanError> {
        if enable {
            // Parameters can only change while scanning is off.
            send_hci_command(&self.commands, &scan_enable_packet(false))?;
            send_hci_command(&self.commands, &scan_parameters_packet())?;
        }
        send_hci_command(&self.commands, &scan_enable_packet(enable))
    }

    async fn scan_window(
        &self,
        window: Duration,
        handler: &mut dyn DiscoveryHandler,
    ) -> Result<(), ScanError> {
        let deadline = window_deadline(window);
        self.set_scanning(true)?;

        let result = self.read_until(deadline, handler).await;
        let stopped = self.set_scanning(false);

        result.and(stopped)
    }

    async fn read_until(
        &self,
        deadline: Instant,
        handler: &mut dyn DiscoveryHandler,
    ) -> Result<(), ScanError> {
        let mut buf = [0u8; MAX_EVENT_SIZE];

        while let Ok(ready) = timeout_at(deadline, self.events.readable()).await {
            let mut guard = ready.map_err(|e| socket_error("Failed to poll HCI socket", e))?;

            // Drain all available packets before waiting again
            loop {
                let n = match guard.try_io(|inner| {
                    let ret = unsafe {
                        libc::read(inner.as_raw_fd(), buf.as_mut_ptr() as *mut c_void, buf.len())
                    };
                    if ret < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(ret as usize)
                    }
                }) {
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => return Err(socket_error("Failed to read HCI socket", e)),
                    Err(_would_block) => break,
                };
                if n == 0 {
                    break;
                }

                for event in parse_advertising_report(&buf[..n]) {
                    handler.on_discovery(&event)?;
                }
            }
        }

        Ok(())
    }
}

impl AdvertisementSource for HciSource {
    fn scan<'a>(
        &'a mut self,
        window: Duration,
        handler: &'a mut dyn DiscoveryHandler,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScanError>> + 'a>> {
        Box::pin(self.scan_window(window, handler))
    }
}
