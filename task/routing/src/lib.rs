// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Application-layer server (component J). Owns the one train's cached
//! state and the switch bitmask (the only process that ever mutates
//! either), and turns inbound application messages from the data-link
//! task into outbound commands using [`drv_routing_table`].
//!
//! The sensor/destination layout is integration data, not logic, so the
//! table here is a placeholder of empty entries; wiring in the real layout
//! is a `const` edit at this one call site.

#![no_std]

use abi::AppMessage;
use drv_routing_table::{
    handle_ack, route, RoutingTable, SwitchStates, TrainState, DESTINATION_COUNT, EMPTY_ENTRY,
    SENSOR_COUNT,
};
use unwrap_lite::UnwrapLite;
use userlib::well_known::{DATALINK_APP_MB, ROUTING_MB};

const ROUTING_TABLE: RoutingTable = [[EMPTY_ENTRY; DESTINATION_COUNT]; SENSOR_COUNT];

fn emit(msg: AppMessage) {
    let _ = userlib::send(DATALINK_APP_MB, ROUTING_MB, &msg.to_bytes());
}

pub fn main() -> ! {
    userlib::bind(Some(ROUTING_MB)).unwrap_lite();

    let mut train = TrainState::new();
    let mut switches = SwitchStates::new();
    let mut buf = [0u8; abi::MSG_MAX];

    loop {
        let msg = match userlib::recv(Some(ROUTING_MB), &mut buf) {
            Ok(msg) => msg,
            Err(_) => continue,
        };

        // Console lines land here too (see `task-serial-in`); only fixed
        // 3-byte application frames are routing input.
        if msg.data.len() != AppMessage::WIRE_LEN {
            continue;
        }
        let mut wire = [0u8; AppMessage::WIRE_LEN];
        wire.copy_from_slice(msg.data);
        let app = AppMessage::from_bytes(wire);

        if app.code == abi::app_code::HALL_TRIGGERED {
            let emissions = route(app.arg1, &ROUTING_TABLE, &mut train, &mut switches);
            for i in 0..emissions.len {
                if let Some(out) = emissions.messages[i] {
                    emit(out);
                }
            }
        } else if let Some(stop) = handle_ack(app.code, app.arg2) {
            emit(stop);
        }
    }
}
