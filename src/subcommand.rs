//! Stateless-per-request responder for the two inbound request families:
//! USB handshake requests (first byte `0x80`) and UART subcommand requests
//! (first byte `0x01`). Pure decode/response functions; the transport and
//! lifecycle layers own counters, framing, and the actual write.

use crate::spi;

/// Outcome of a USB handshake request (`frame[0] == 0x80`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsbEvent {
    /// Reply with ack `0x81`, cmd = the selector, and this payload.
    Reply(Vec<u8>),
    /// Selector `0x04`: no reply is sent; the caller clears `stop_input` so
    /// periodic reports begin.
    StartInput,
    /// Unrecognized selector. Logged by the caller at level > 1.
    Ignored,
}

/// Decode a USB handshake request given its selector byte (`frame[1]`).
pub fn handle_usb_request(selector: u8) -> UsbEvent {
    match selector {
        0x01 => UsbEvent::Reply(vec![0x00, 0x03, 0x00, 0x00, 0x5e, 0x00, 0x53, 0x5e]),
        0x02 | 0x03 => UsbEvent::Reply(Vec::new()),
        0x04 => UsbEvent::StartInput,
        _ => UsbEvent::Ignored,
    }
}

/// Outcome of a UART subcommand request (`frame[0] == 0x01`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UartAck {
    /// Positive ack, with payload (may be empty).
    Positive(Vec<u8>),
    /// Negative ack (e.g. unknown SPI page).
    Negative,
    /// Unknown subcommand id or malformed arguments: no reply is sent.
    /// Logged by the caller at level > 1.
    Ignored,
}

/// Decode a UART subcommand given its id (`frame[10]`) and its argument
/// bytes (`frame[11..]`).
pub fn handle_uart_subcommand(subcmd: u8, args: &[u8]) -> UartAck {
    match subcmd {
        0x01 => UartAck::Positive(vec![0x03, 0x01]),
        0x02 => UartAck::Positive(vec![
            0x03, 0x48, 0x03, 0x02, 0x5e, 0x53, 0x00, 0x5e, 0x00, 0x00, 0x03, 0x01,
        ]),
        0x03 | 0x04 | 0x08 | 0x30 | 0x38 | 0x40 | 0x41 | 0x48 => UartAck::Positive(Vec::new()),
        0x10 => {
            // args: [offset, page, reserved, reserved, length, ...]
            let Some(&offset) = args.first() else {
                return UartAck::Ignored;
            };
            let Some(&page) = args.get(1) else {
                return UartAck::Ignored;
            };
            let Some(&length) = args.get(4) else {
                return UartAck::Ignored;
            };
            let Some(echo) = args.get(0..5) else {
                return UartAck::Ignored;
            };
            match spi::read(page, offset, length) {
                Some(data) => {
                    let mut payload = Vec::with_capacity(echo.len() + data.len());
                    payload.extend_from_slice(echo);
                    payload.extend_from_slice(data);
                    UartAck::Positive(payload)
                }
                None => UartAck::Negative,
            }
        }
        0x21 => UartAck::Positive(vec![0x01, 0x00, 0xff, 0x00, 0x03, 0x00, 0x05, 0x01]),
        _ => UartAck::Ignored,
    }
}

/// Build the UART reply payload: the current input buffer, followed by the
/// ack byte (`0x00` negative, `0x80` positive-empty, `0x80 | subcmd`
/// positive-with-payload), the echoed subcommand id, then any payload data.
pub fn uart_reply_payload(input_buffer: &[u8], subcmd: u8, ack: &UartAck) -> Option<Vec<u8>> {
    let (ack_byte, data): (u8, &[u8]) = match ack {
        UartAck::Positive(data) if data.is_empty() => (0x80, &[]),
        UartAck::Positive(data) => (0x80 | subcmd, data),
        UartAck::Negative => (0x00, &[]),
        UartAck::Ignored => return None,
    };

    let mut payload = Vec::with_capacity(input_buffer.len() + 2 + data.len());
    payload.extend_from_slice(input_buffer);
    payload.push(ack_byte);
    payload.push(subcmd);
    payload.extend_from_slice(data);
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_mac_request_matches_scenario_1() {
        let event = handle_usb_request(0x01);
        assert_eq!(
            event,
            UsbEvent::Reply(vec![0x00, 0x03, 0x00, 0x00, 0x5e, 0x00, 0x53, 0x5e])
        );
    }

    #[test]
    fn handshake_baud_selectors_reply_empty() {
        assert_eq!(handle_usb_request(0x02), UsbEvent::Reply(Vec::new()));
        assert_eq!(handle_usb_request(0x03), UsbEvent::Reply(Vec::new()));
    }

    #[test]
    fn handshake_finalize_starts_input() {
        assert_eq!(handle_usb_request(0x04), UsbEvent::StartInput);
    }

    #[test]
    fn unknown_usb_selector_is_ignored() {
        assert_eq!(handle_usb_request(0xee), UsbEvent::Ignored);
    }

    #[test]
    fn spi_read_known_page_matches_scenario_3() {
        let args = [0x00u8, 0x60, 0x00, 0x00, 0x10];
        let ack = handle_uart_subcommand(0x10, &args);
        let UartAck::Positive(payload) = ack else {
            panic!("expected positive ack");
        };
        assert_eq!(&payload[0..5], &[0x00, 0x60, 0x00, 0x00, 0x10]);
        assert_eq!(&payload[5..], &[0xff; 16]);
    }

    #[test]
    fn spi_read_unknown_page_matches_scenario_4() {
        let args = [0x00u8, 0x70, 0x00, 0x00, 0x10];
        assert_eq!(handle_uart_subcommand(0x10, &args), UartAck::Negative);
    }

    #[test]
    fn spi_read_short_args_is_ignored() {
        let args = [0x00u8, 0x60];
        assert_eq!(handle_uart_subcommand(0x10, &args), UartAck::Ignored);
    }

    #[test]
    fn unknown_uart_subcommand_is_ignored() {
        assert_eq!(handle_uart_subcommand(0xfe, &[]), UartAck::Ignored);
    }

    #[test]
    fn positive_ack_with_payload_sets_high_bit_and_subcmd() {
        let input_buffer = [0u8; 11];
        let ack = UartAck::Positive(vec![0xaa]);
        let payload = uart_reply_payload(&input_buffer, 0x02, &ack).unwrap();
        assert_eq!(payload[11], 0x80 | 0x02);
        assert_eq!(payload[12], 0x02);
        assert_eq!(payload[13], 0xaa);
    }

    #[test]
    fn positive_ack_empty_payload_has_bare_ack_byte() {
        let input_buffer = [0u8; 11];
        let ack = UartAck::Positive(Vec::new());
        let payload = uart_reply_payload(&input_buffer, 0x03, &ack).unwrap();
        assert_eq!(payload[11], 0x80);
        assert_eq!(payload[12], 0x03);
        assert_eq!(payload.len(), 13);
    }

    #[test]
    fn negative_ack_byte_is_zero() {
        let input_buffer = [0u8; 11];
        let payload = uart_reply_payload(&input_buffer, 0x10, &UartAck::Negative).unwrap();
        assert_eq!(payload[11], 0x00);
    }

    #[test]
    fn ignored_ack_produces_no_frame() {
        let input_buffer = [0u8; 11];
        assert!(uart_reply_payload(&input_buffer, 0xfe, &UartAck::Ignored).is_none());
    }
}
