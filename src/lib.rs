//! Cycle-accurate timing simulator of a Tomasulo-style out-of-order core.

#[macro_use]
extern crate num_derive;

pub mod bus;
pub mod dispatcher;
pub mod instructions;
pub mod processor;
pub mod register_file;
pub mod reservation_station;
pub mod scoreboard;
pub mod stats;
pub mod trace;
