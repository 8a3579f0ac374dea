//! USB HID keyboard implementation for ATmega32U4.
//!
//! Boot-protocol keyboard on the ATmega32U4's built-in USB controller, using
//! direct register access via avr-device. The engine fills in modifiers and
//! key slots through [`HidReporter`] and calls `flush` once per changed
//! report.

use avr_device::atmega32u4::Peripherals;
use retrokb_engine::{HidReporter, KeyboardReport, Mods, REPORT_SLOTS};

const EP0_SIZE: u8 = 64;
/// Interrupt IN endpoint, one boot report per packet.
const EP1_SIZE: u8 = 8;

/// HID report descriptor for a standard keyboard.
static HID_REPORT_DESCRIPTOR: [u8; 64] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    // Modifier keys (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - LCtrl
    0x29, 0xE7, //   Usage Maximum (231) - RGui
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Reserved byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    // LEDs (5 bits)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    // LED padding (3 bits)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant)
    // Keycodes (6 bytes)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

// USB descriptors
static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    0xC0, 0x16, // idVendor (0x16C0, shared V-USB vendor ID)
    0xDB, 0x27, // idProduct (0x27DB, shared V-USB keyboard)
    0x01, 0x00, // bcdDevice (1.0)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration descriptor
    9,    // bLength
    2,    // bDescriptorType (Configuration)
    34, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    50,   // bMaxPower (100mA)
    // Interface descriptor
    9,    // bLength
    4,    // bDescriptorType (Interface)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    1,    // bInterfaceSubClass (Boot)
    1,    // bInterfaceProtocol (Keyboard)
    0,    // iInterface
    // HID descriptor
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    HID_REPORT_DESCRIPTOR.len() as u8, 0, // wDescriptorLength
    // Endpoint descriptor (EP1 IN, interrupt)
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    0x81, // bEndpointAddress (EP1 IN)
    0x03, // bmAttributes (Interrupt)
    EP1_SIZE, 0, // wMaxPacketSize
    10,   // bInterval (10ms polling)
];

/// String descriptor 0 (language ID)
static STRING_DESC_0: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)

/// String descriptor 1 (manufacturer): "retrokb"
static STRING_DESC_1: [u8; 16] = [
    16, 3, // bLength, bDescriptorType
    b'r', 0, b'e', 0, b't', 0, b'r', 0, b'o', 0, b'k', 0, b'b', 0,
];

/// String descriptor 2 (product): "Commodore Keyboard"
static STRING_DESC_2: [u8; 38] = [
    38, 3, // bLength, bDescriptorType
    b'C', 0, b'o', 0, b'm', 0, b'm', 0, b'o', 0, b'd', 0, b'o', 0, b'r', 0, b'e', 0,
    b' ', 0, b'K', 0, b'e', 0, b'y', 0, b'b', 0, b'o', 0, b'a', 0, b'r', 0, b'd', 0,
];

/// USB device state.
pub struct UsbKeyboard<'a> {
    dp: &'a Peripherals,
    configured: bool,
    /// Report being assembled by the engine.
    pending: KeyboardReport,
}

impl<'a> UsbKeyboard<'a> {
    pub const fn new(dp: &'a Peripherals) -> Self {
        Self {
            dp,
            configured: false,
            pending: KeyboardReport::empty(),
        }
    }

    /// Initialize the ATmega32U4 USB controller.
    pub fn init(&mut self) {
        let dp = self.dp;
        let usb = &dp.USB_DEVICE;

        // Enable USB pad regulator
        usb.uhwcon.write(|w| w.uvrege().set_bit());

        // Enable USB controller and VBUS pad
        usb.usbcon
            .write(|w| w.usbe().set_bit().otgpade().set_bit());

        // Configure PLL for 16MHz crystal -> 96MHz PLL -> 48MHz USB clock
        // PLLCSR: PINDIV=1 (16MHz), PLLE=1
        dp.PLL.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());

        // Wait for PLL lock
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        // Enable USB clock
        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());

        // Attach to bus (clear DETACH)
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        // Bus reset is picked up by polling UDINT; no interrupts are used.
        self.configured = false;
    }

    /// Poll for USB events and handle them. Call this from the main loop.
    pub fn poll(&mut self) {
        let dp = self.dp;
        let usb = &dp.USB_DEVICE;

        let udint = usb.udint.read();

        // End of reset
        if udint.eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0();
            self.configured = false;
        }

        // Check for SETUP packet on EP0
        self.select_endpoint(0);
        let ueintx = usb.ueintx.read();
        if ueintx.rxstpi().bit_is_set() {
            self.handle_setup();
        }
    }

    /// Write one report to EP1. Returns `false`, leaving the report for
    /// the engine to offer again, if the host is not listening.
    fn send_report(&self, report: &KeyboardReport) -> bool {
        if !self.configured {
            return false;
        }

        let dp = self.dp;
        let usb = &dp.USB_DEVICE;
        self.select_endpoint(1);

        // Wait for endpoint ready (RWAL set means we can write)
        let mut timeout: u16 = 0xFFFF;
        while usb.ueintx.read().rwal().bit_is_clear() {
            timeout = timeout.wrapping_sub(1);
            if timeout == 0 {
                return false;
            }
        }

        for byte in report.to_bytes() {
            usb.uedatx.write(|w| w.bits(byte));
        }

        // Clear FIFOCON and TXINI to send
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());
        true
    }

    fn configure_ep0(&self) {
        let dp = self.dp;
        let usb = &dp.USB_DEVICE;

        self.select_endpoint(0);
        // Enable EP0 as control endpoint, 64 bytes
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self) {
        let dp = self.dp;
        let usb = &dp.USB_DEVICE;

        self.select_endpoint(1);
        usb.ueconx.write(|w| w.epen().set_bit());
        // Interrupt IN endpoint
        usb.uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        usb.uecfg1x.write(|w| w.epsize().bits(0b000).alloc().set_bit());
    }

    fn select_endpoint(&self, ep: u8) {
        self.dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
    }

    fn handle_setup(&mut self) {
        let dp = self.dp;
        let usb = &dp.USB_DEVICE;

        // Read 8-byte SETUP packet
        let bm_request_type = usb.uedatx.read().bits();
        let b_request = usb.uedatx.read().bits();
        let w_value_l = usb.uedatx.read().bits();
        let w_value_h = usb.uedatx.read().bits();
        let _w_index_l = usb.uedatx.read().bits();
        let _w_index_h = usb.uedatx.read().bits();
        let w_length_l = usb.uedatx.read().bits();
        let w_length_h = usb.uedatx.read().bits();

        // Acknowledge SETUP
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        let w_length = (w_length_h as u16) << 8 | w_length_l as u16;

        match (bm_request_type, b_request) {
            // GET_DESCRIPTOR
            (0x80, 0x06) => {
                let desc_type = w_value_h;
                let desc_index = w_value_l;
                match (desc_type, desc_index) {
                    (1, _) => self.send_descriptor(&DEVICE_DESCRIPTOR, w_length),
                    (2, _) => self.send_descriptor(&CONFIG_DESCRIPTOR, w_length),
                    (3, 0) => self.send_descriptor(&STRING_DESC_0, w_length),
                    (3, 1) => self.send_descriptor(&STRING_DESC_1, w_length),
                    (3, 2) => self.send_descriptor(&STRING_DESC_2, w_length),
                    _ => self.stall(),
                }
            }

            // SET_ADDRESS
            (0x00, 0x05) => {
                // Send ZLP first, then set address
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(w_value_l & 0x7F).adden().set_bit());
            }

            // SET_CONFIGURATION
            (0x00, 0x09) => {
                // Send ZLP
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                self.configure_ep1();
                self.configured = true;
            }

            // GET_CONFIGURATION
            (0x80, 0x08) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.uedatx
                    .write(|w| w.bits(if self.configured { 1 } else { 0 }));
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID GET_DESCRIPTOR (interface-level)
            (0x81, 0x06) => match w_value_h {
                0x22 => self.send_descriptor(&HID_REPORT_DESCRIPTOR, w_length),
                _ => self.stall(),
            },

            // HID SET_REPORT: host LED state, read and discarded.
            (0x21, 0x09) => {
                while usb.ueintx.read().rxouti().bit_is_clear() {}
                let _leds = usb.uedatx.read().bits();
                usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID SET_IDLE, SET_PROTOCOL: always boot protocol, send ZLP
            (0x21, 0x0A) | (0x21, 0x0B) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            _ => self.stall(),
        }
    }

    fn send_descriptor(&self, desc: &[u8], max_length: u16) {
        let dp = self.dp;
        let usb = &dp.USB_DEVICE;
        let len = core::cmp::min(desc.len(), max_length as usize);
        let mut sent = 0;

        while sent < len {
            while usb.ueintx.read().txini().bit_is_clear() {}

            let chunk_end = core::cmp::min(sent + EP0_SIZE as usize, len);
            for &byte in &desc[sent..chunk_end] {
                usb.uedatx.write(|w| w.bits(byte));
            }

            usb.ueintx.modify(|_, w| w.txini().clear_bit());
            sent = chunk_end;
        }

        // Wait for status stage (host sends ZLP)
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn stall(&self) {
        self.dp
            .USB_DEVICE
            .ueconx
            .modify(|_, w| w.stallrq().set_bit());
    }
}

impl HidReporter for UsbKeyboard<'_> {
    fn set_modifiers(&mut self, mods: Mods) {
        self.pending.modifiers = mods.bits();
    }

    fn set_keys(&mut self, keys: [u8; REPORT_SLOTS]) {
        self.pending.keys = keys;
    }

    fn flush(&mut self) -> bool {
        let report = self.pending;
        self.send_report(&report)
    }
}
