// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Application-layer routing (component J): a read-only sensor/destination
//! table, per-train cached state, and the pure decision logic that turns a
//! `HALL_TRIGGERED` event or a failed ACK into the outbound messages the
//! data-link layer should carry.
#![cfg_attr(not(test), no_std)]

use abi::app_code;
use abi::AppMessage;

/// Train index meaning "every train" — used for the global safety stop.
pub const ALL_TRAINS: u8 = 0xFF;

/// Sentinel `switch_index` meaning a route entry doesn't gate on a switch.
pub const NO_SWITCH: u8 = 0xFF;

pub const SENSOR_COUNT: usize = 24;
pub const DESTINATION_COUNT: usize = 24;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Cw,
    Ccw,
}

/// Magnitude/direction pair, the two meaningful fields of a `MAG_DIR_SET`
/// `arg2` byte: `{magnitude:4, reserved:3, direction:1}` from the LSB.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Speed {
    pub magnitude: u8,
    pub direction: Direction,
}

impl Speed {
    pub const STOP: Speed = Speed { magnitude: 0, direction: Direction::Cw };

    pub fn to_byte(self) -> u8 {
        (self.magnitude & 0xF) | ((self.direction == Direction::Ccw) as u8) << 7
    }

    pub fn from_byte(b: u8) -> Self {
        Speed {
            magnitude: b & 0xF,
            direction: if b & 0x80 != 0 { Direction::Ccw } else { Direction::Cw },
        }
    }
}

/// One entry of the sensor × destination routing table. Read-only at
/// runtime; built once as a `const` table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RoutingEntry {
    pub dir: Direction,
    pub switch_index: u8,
    pub switch_state: bool,
    pub stop: bool,
}

pub const EMPTY_ENTRY: RoutingEntry =
    RoutingEntry { dir: Direction::Cw, switch_index: NO_SWITCH, switch_state: true, stop: false };

pub type RoutingTable = [[RoutingEntry; DESTINATION_COUNT]; SENSOR_COUNT];

/// Bitmask of the layout's track switches: bit set means "thrown straight".
#[derive(Copy, Clone, Debug, Default)]
pub struct SwitchStates(u32);

impl SwitchStates {
    pub const fn new() -> Self {
        SwitchStates(0)
    }

    pub fn is_straight(&self, switch: u8) -> bool {
        self.0 & (1 << switch) != 0
    }

    pub fn set_straight(&mut self, switch: u8, straight: bool) {
        if straight {
            self.0 |= 1 << switch;
        } else {
            self.0 &= !(1 << switch);
        }
    }
}

/// Cached per-train state: where it's headed and the last commanded speed.
#[derive(Copy, Clone, Debug)]
pub struct TrainState {
    pub destination: u8,
    pub speed: Speed,
    pub stopped: bool,
}

impl TrainState {
    pub const fn new() -> Self {
        TrainState { destination: 0, speed: Speed::STOP, stopped: false }
    }
}

impl Default for TrainState {
    fn default() -> Self {
        Self::new()
    }
}

/// Up to 3 outbound application messages produced by one routing decision
/// (a direction change, a switch throw, and a final ack — in that order).
#[derive(Copy, Clone, Debug, Default)]
pub struct RouteEmissions {
    pub messages: [Option<AppMessage>; 3],
    pub len: usize,
}

impl RouteEmissions {
    fn push(&mut self, msg: AppMessage) {
        self.messages[self.len] = Some(msg);
        self.len += 1;
    }
}

fn global_stop() -> AppMessage {
    AppMessage { code: app_code::MAG_DIR_SET, arg1: ALL_TRAINS, arg2: Speed::STOP.to_byte() }
}

/// Handles an inbound `HALL_TRIGGERED(sensor)` event (scenario S6).
pub fn route(
    sensor: u8,
    table: &RoutingTable,
    train: &mut TrainState,
    switches: &mut SwitchStates,
) -> RouteEmissions {
    let mut out = RouteEmissions::default();
    let entry = table[sensor as usize][train.destination as usize];

    if entry.stop {
        out.push(global_stop());
        train.stopped = true;
        out.push(AppMessage { code: app_code::HALL_TRIGGERED_ACK, arg1: sensor, arg2: 0 });
        return out;
    }

    if entry.dir != train.speed.direction || train.stopped {
        train.speed.direction = entry.dir;
        train.stopped = false;
        out.push(AppMessage {
            code: app_code::MAG_DIR_SET,
            arg1: train.destination,
            arg2: train.speed.to_byte(),
        });
    }

    if entry.switch_index != NO_SWITCH && switches.is_straight(entry.switch_index) != entry.switch_state {
        switches.set_straight(entry.switch_index, entry.switch_state);
        out.push(AppMessage {
            code: app_code::SWITCH_THROW,
            arg1: entry.switch_index,
            arg2: entry.switch_state as u8,
        });
    }

    out.push(AppMessage { code: app_code::HALL_TRIGGERED_ACK, arg1: sensor, arg2: 0 });
    out
}

/// Any non-zero `*_ACK` arg2 is fatal-for-motion: emit a global stop
/// (scenario S5). Returns `None` for a successful ack.
pub fn handle_ack(ack_code: u8, arg2: u8) -> Option<AppMessage> {
    let is_ack = matches!(
        ack_code,
        app_code::HALL_TRIGGERED_ACK
            | app_code::HALL_RESET_ACK
            | app_code::MAG_DIR_ACK
            | app_code::SWITCH_THROW_ACK
    );
    if is_ack && arg2 != 0 {
        Some(global_stop())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_table() -> RoutingTable {
        [[EMPTY_ENTRY; DESTINATION_COUNT]; SENSOR_COUNT]
    }

    #[test]
    fn s5_nonzero_mag_dir_ack_triggers_global_stop() {
        let msg = handle_ack(app_code::MAG_DIR_ACK, 1).unwrap();
        assert_eq!(msg.code, app_code::MAG_DIR_SET);
        assert_eq!(msg.arg1, ALL_TRAINS);
        assert_eq!(msg.arg2, 0);
    }

    #[test]
    fn zero_ack_arg2_is_not_fatal() {
        assert!(handle_ack(app_code::MAG_DIR_ACK, 0).is_none());
    }

    #[test]
    fn s6_sensor_route_changes_direction_then_switch_then_acks() {
        let mut table = empty_table();
        table[1][10] = RoutingEntry {
            dir: Direction::Ccw,
            switch_index: 3,
            switch_state: true,
            stop: false,
        };
        let mut train = TrainState { destination: 10, speed: Speed { magnitude: 5, direction: Direction::Cw }, stopped: false };
        let mut switches = SwitchStates::new();
        switches.set_straight(3, true);

        let emissions = route(1, &table, &mut train, &mut switches);

        assert_eq!(emissions.len, 2);
        assert_eq!(emissions.messages[0].unwrap().code, app_code::MAG_DIR_SET);
        assert_eq!(emissions.messages[1].unwrap().code, app_code::HALL_TRIGGERED_ACK);
        assert_eq!(train.speed.direction, Direction::Ccw);
    }

    #[test]
    fn switch_throw_emitted_only_on_disagreement() {
        let mut table = empty_table();
        table[2][5] = RoutingEntry {
            dir: Direction::Cw,
            switch_index: 4,
            switch_state: false,
            stop: false,
        };
        let mut train = TrainState { destination: 5, speed: Speed { magnitude: 0, direction: Direction::Cw }, stopped: false };
        let mut switches = SwitchStates::new();
        switches.set_straight(4, true);

        let emissions = route(2, &table, &mut train, &mut switches);

        assert_eq!(emissions.len, 2);
        assert_eq!(emissions.messages[0].unwrap().code, app_code::SWITCH_THROW);
        assert!(!switches.is_straight(4));
    }

    #[test]
    fn stop_bit_emits_global_stop_and_acks() {
        let mut table = empty_table();
        table[0][0].stop = true;
        let mut train = TrainState::new();
        let mut switches = SwitchStates::new();

        let emissions = route(0, &table, &mut train, &mut switches);

        assert_eq!(emissions.len, 2);
        assert_eq!(emissions.messages[0].unwrap().code, app_code::MAG_DIR_SET);
        assert_eq!(emissions.messages[0].unwrap().arg1, ALL_TRAINS);
        assert!(train.stopped);
    }
}
