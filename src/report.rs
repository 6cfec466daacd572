//! Serializes [`crate::input::Input`] into the two wire layouts the host
//! expects: the input buffer (buttons + sticks + vibrator byte) and the
//! six-axis buffer (three repeated accelerometer/gyroscope snapshots).
//!
//! The fixed-layout bitfields are described with `packed_struct`, the same
//! way the teacher's own HID report modules model a Joy-Con/Pro Controller
//! report (`drivers/switch/hid_report.rs`'s `ButtonStatus`, `StickData` and
//! `ImuData`).

use packed_struct::prelude::*;

use crate::input::{Input, Sensors, Stick};

/// Size of the packed input buffer: `0x81` + 3 button bytes + 2 packed
/// 3-byte sticks + 1 trailing vibrator byte.
pub const INPUT_BUFFER_LEN: usize = 11;

/// Size of the packed six-axis buffer: three repeated 12-byte snapshots.
pub const SIX_AXIS_BUFFER_LEN: usize = 36;

/// Gyro axes eligible for dots-per-degree conversion via [`dot_to_dps`].
/// `Controller::apply_sens` (spec §6) is expressed as a set of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GyroAxis {
    X,
    Y,
    Z,
}

/// Buttons, d-pad and stick presses packed into the input buffer's three
/// button bytes. Bit positions are `spec.md`'s own (bit 0 = LSB of each
/// byte), expressed in `packed_struct`'s `msb0` numbering the way the
/// teacher's `ButtonStatus` lays out its three button bytes.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct ButtonBytes {
    // byte 0 (left)
    #[packed_field(bits = "7")]
    pub y: bool,
    #[packed_field(bits = "6")]
    pub x: bool,
    #[packed_field(bits = "5")]
    pub b: bool,
    #[packed_field(bits = "4")]
    pub a: bool,
    #[packed_field(bits = "1")]
    pub r: bool,
    #[packed_field(bits = "0")]
    pub zr: bool,

    // byte 1 (center)
    #[packed_field(bits = "15")]
    pub minus: bool,
    #[packed_field(bits = "14")]
    pub plus: bool,
    #[packed_field(bits = "13")]
    pub right_stick_press: bool,
    #[packed_field(bits = "12")]
    pub left_stick_press: bool,
    #[packed_field(bits = "11")]
    pub home: bool,
    #[packed_field(bits = "10")]
    pub capture: bool,

    // byte 2 (right)
    #[packed_field(bits = "23")]
    pub dpad_down: bool,
    #[packed_field(bits = "22")]
    pub dpad_up: bool,
    #[packed_field(bits = "21")]
    pub dpad_right: bool,
    #[packed_field(bits = "20")]
    pub dpad_left: bool,
    #[packed_field(bits = "17")]
    pub l: bool,
    #[packed_field(bits = "16")]
    pub zl: bool,
}

/// One analog stick packed the way the real protocol lays it out: X's low
/// byte, a shared middle byte holding Y's low nibble and X's high nibble,
/// then Y's high byte -- equivalent to `spec.md`'s `(Y << 12) | X`
/// little-endian 24-bit integer, just split at nibble boundaries the way
/// the teacher's `StickData` splits its own X/Y fields across byte 1.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct PackedStick {
    #[packed_field(bytes = "0", endian = "lsb")]
    pub x_lo: u8,
    #[packed_field(bits = "8..=11")]
    pub y_lo: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "12..=15")]
    pub x_hi: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bytes = "2", endian = "lsb")]
    pub y_hi: u8,
}

/// Pack a stick's X/Y into [`PackedStick`]'s nibble-split layout.
fn pack_stick(stick: &Stick) -> PackedStick {
    PackedStick {
        x_lo: (stick.x & 0xFF) as u8,
        y_lo: Integer::from_primitive((stick.y & 0xF) as u8),
        x_hi: Integer::from_primitive(((stick.x >> 8) & 0xF) as u8),
        y_hi: ((stick.y >> 4) & 0xFF) as u8,
    }
}

/// The 11-byte input buffer: leading `0x81`, three packed button bytes, the
/// two packed sticks, and a trailing `0x00` vibrator byte.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "11")]
pub struct PackedInputBuffer {
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    #[packed_field(bytes = "1..=3")]
    pub buttons: ButtonBytes,
    #[packed_field(bytes = "4..=6")]
    pub left_stick: PackedStick,
    #[packed_field(bytes = "7..=9")]
    pub right_stick: PackedStick,
    #[packed_field(bytes = "10")]
    pub vibrator: u8,
}

/// Encode the 11-byte input buffer: leading `0x81`, three packed button
/// bytes, the two packed sticks, and a trailing `0x00` vibrator byte.
pub fn encode_input_buffer(input: &Input) -> [u8; INPUT_BUFFER_LEN] {
    let b = &input.buttons;
    let d = &input.dpad;
    let s = &input.sticks;

    let buttons = ButtonBytes {
        y: b.y,
        x: b.x,
        b: b.b,
        a: b.a,
        r: b.r,
        zr: b.zr,
        minus: b.minus,
        plus: b.plus,
        right_stick_press: s.right.press,
        left_stick_press: s.left.press,
        home: b.home,
        capture: b.capture,
        dpad_down: d.down,
        dpad_up: d.up,
        dpad_right: d.right,
        dpad_left: d.left,
        l: b.l,
        zl: b.zl,
    };

    let buffer = PackedInputBuffer {
        report_id: 0x81,
        buttons,
        left_stick: pack_stick(&s.left),
        right_stick: pack_stick(&s.right),
        vibrator: 0x00,
    };

    buffer
        .pack()
        .expect("PackedInputBuffer is a fixed 11-byte layout and always packs")
}

/// Convert an accumulated mouse-delta "dot" count into a signed,
/// 0.07-degrees-per-second-digit value, clamped to the 16-bit signed
/// range. `dot_per_degree` is the gyro's `Sensitivity` and `report_seconds`
/// is the interval between six-axis flushes.
pub fn dot_to_dps(dot: i32, dot_per_degree: f64, report_seconds: f64) -> i16 {
    let degree = dot as f64 / dot_per_degree;
    let dps = degree / report_seconds;
    let digit = (dps / 0.07).trunc();
    if digit > i16::MAX as f64 {
        i16::MAX
    } else if digit < i16::MIN as f64 {
        i16::MIN
    } else {
        digit as i16
    }
}

/// One accelerometer+gyroscope snapshot, packed the way the teacher's
/// `ImuData` packs its six signed-16-bit little-endian fields.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct SixAxisSnapshot {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub accel_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub accel_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub accel_z: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub gyro_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub gyro_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub gyro_z: Integer<i16, packed_bits::Bits<16>>,
}

/// Encode one 12-byte accel+gyro snapshot, converting the gyro axes listed
/// in `apply_sens` from dots to DPS digits and passing the rest through as
/// raw 16-bit-wrapped integers.
fn encode_sensor_snapshot(
    sensors: &Sensors,
    apply_sens: &std::collections::HashSet<GyroAxis>,
    report_seconds: f64,
) -> SixAxisSnapshot {
    let gyro_digit = |axis: GyroAxis, value: i32| -> i16 {
        if apply_sens.contains(&axis) {
            dot_to_dps(value, sensors.gyro_sensitivity, report_seconds)
        } else {
            value as i16
        }
    };

    SixAxisSnapshot {
        accel_x: Integer::from_primitive(sensors.accel.x as i16),
        accel_y: Integer::from_primitive(sensors.accel.y as i16),
        accel_z: Integer::from_primitive(sensors.accel.z as i16),
        gyro_x: Integer::from_primitive(gyro_digit(GyroAxis::X, sensors.gyro.x)),
        gyro_y: Integer::from_primitive(gyro_digit(GyroAxis::Y, sensors.gyro.y)),
        gyro_z: Integer::from_primitive(gyro_digit(GyroAxis::Z, sensors.gyro.z)),
    }
}

/// Encode the 36-byte six-axis buffer: the same 12-byte snapshot repeated
/// three times. After encoding, all six sensor accumulators are zeroed so
/// the next report starts from a clean slate (the "accumulate between
/// reports, flush on emit" contract).
pub fn encode_six_axis_buffer(
    sensors: &mut Sensors,
    apply_sens: &std::collections::HashSet<GyroAxis>,
    report_seconds: f64,
) -> [u8; SIX_AXIS_BUFFER_LEN] {
    let snapshot = encode_sensor_snapshot(sensors, apply_sens, report_seconds)
        .pack()
        .expect("SixAxisSnapshot is a fixed 12-byte layout and always packs");

    let mut out = [0u8; SIX_AXIS_BUFFER_LEN];
    out[0..12].copy_from_slice(&snapshot);
    out[12..24].copy_from_slice(&snapshot);
    out[24..36].copy_from_slice(&snapshot);

    sensors.accel.reset();
    sensors.gyro.reset();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;
    use std::collections::HashSet;

    #[test]
    fn input_buffer_has_leading_byte_and_trailing_vibrator() {
        let input = Input::new();
        let buf = encode_input_buffer(&input);
        assert_eq!(buf[0], 0x81);
        assert_eq!(buf[10], 0x00);
    }

    #[test]
    fn stick_encoding_matches_scenario_5() {
        let mut input = Input::new();
        input.sticks.left.x = 0x123;
        input.sticks.left.y = 0x456;
        let buf = encode_input_buffer(&input);
        assert_eq!(&buf[4..7], &[0x23, 0x61, 0x45]);
    }

    #[test]
    fn button_bit_round_trip_for_all_combinations() {
        for mask in 0u16..(1 << 12) {
            let mut input = Input::new();
            input.buttons.y = mask & (1 << 0) != 0;
            input.buttons.x = mask & (1 << 1) != 0;
            input.buttons.b = mask & (1 << 2) != 0;
            input.buttons.a = mask & (1 << 3) != 0;
            input.buttons.r = mask & (1 << 4) != 0;
            input.buttons.zr = mask & (1 << 5) != 0;
            input.buttons.minus = mask & (1 << 6) != 0;
            input.buttons.plus = mask & (1 << 7) != 0;
            input.sticks.right.press = mask & (1 << 8) != 0;
            input.sticks.left.press = mask & (1 << 9) != 0;
            input.buttons.home = mask & (1 << 10) != 0;
            input.buttons.capture = mask & (1 << 11) != 0;

            let buf = encode_input_buffer(&input);
            let left = buf[1];
            let center = buf[2];

            assert_eq!(input.buttons.y, left & 1 != 0);
            assert_eq!(input.buttons.x, left & 2 != 0);
            assert_eq!(input.buttons.b, left & 4 != 0);
            assert_eq!(input.buttons.a, left & 8 != 0);
            assert_eq!(input.buttons.r, left & (1 << 6) != 0);
            assert_eq!(input.buttons.zr, left & (1 << 7) != 0);
            assert_eq!(input.buttons.minus, center & 1 != 0);
            assert_eq!(input.buttons.plus, center & 2 != 0);
            assert_eq!(input.sticks.right.press, center & 4 != 0);
            assert_eq!(input.sticks.left.press, center & 8 != 0);
            assert_eq!(input.buttons.home, center & (1 << 4) != 0);
            assert_eq!(input.buttons.capture, center & (1 << 5) != 0);
        }
    }

    #[test]
    fn six_axis_buffer_repeats_snapshot_three_times() {
        let mut sensors = Sensors::default();
        sensors.accel.x = 10;
        sensors.gyro.z = -5;
        let apply_sens = HashSet::new();
        let buf = encode_six_axis_buffer(&mut sensors, &apply_sens, 0.015);
        assert_eq!(&buf[0..12], &buf[12..24]);
        assert_eq!(&buf[12..24], &buf[24..36]);
    }

    #[test]
    fn six_axis_buffer_resets_all_accumulators() {
        let mut sensors = Sensors::default();
        sensors.accel.x = 1;
        sensors.accel.y = 2;
        sensors.accel.z = 3;
        sensors.gyro.x = 4;
        sensors.gyro.y = 5;
        sensors.gyro.z = 6;
        let apply_sens = HashSet::new();
        encode_six_axis_buffer(&mut sensors, &apply_sens, 0.015);
        assert_eq!(sensors.accel, crate::input::SensorAxis::default());
        assert_eq!(sensors.gyro, crate::input::SensorAxis::default());
    }

    #[test]
    fn gyro_sensitivity_conversion_matches_scenario_6() {
        let mut sensors = Sensors {
            gyro_sensitivity: 100.0,
            ..Sensors::default()
        };
        sensors.gyro.y = 1500;
        let mut apply_sens = HashSet::new();
        apply_sens.insert(GyroAxis::Y);

        let buf = encode_six_axis_buffer(&mut sensors, &apply_sens, 0.015);
        let digit = i16::from_le_bytes([buf[8], buf[9]]);
        assert_eq!(digit, 14285);
    }

    #[test]
    fn unlisted_gyro_axis_passes_through_raw() {
        let mut sensors = Sensors::default();
        sensors.gyro.x = 7;
        let apply_sens = HashSet::new();
        let buf = encode_six_axis_buffer(&mut sensors, &apply_sens, 0.015);
        let raw = u16::from_le_bytes([buf[6], buf[7]]);
        assert_eq!(raw, 7);
    }

    #[test]
    fn dot_to_dps_is_monotone_and_clamps() {
        let a = dot_to_dps(100, 10.0, 0.015);
        let b = dot_to_dps(200, 10.0, 0.015);
        assert!(b >= a);
        assert_eq!(dot_to_dps(i32::MAX, 0.001, 0.000001), i16::MAX);
        assert_eq!(dot_to_dps(i32::MIN, 0.001, 0.000001), i16::MIN);
    }
}
