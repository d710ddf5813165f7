use std::collections::VecDeque;

use crate::instructions::Instruction;
use crate::register_file::{RegisterFile, TagAllocator};
use crate::reservation_station::{Operand, ReservationStationTable, Slot};
use crate::stats::StatsTracker;

/// In-order FIFO between fetch and issue. Unbounded; queue order is program
/// order. The issue step performs register renaming.
#[derive(Debug, Default)]
pub struct Dispatcher {
    queue: VecDeque<Instruction>,
}
impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            queue: VecDeque::new(),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Append the previous cycle's fetch batch in fetch order, then sample
    /// queue occupancy for the stats.
    pub fn transfer(&mut self, batch: Vec<Instruction>, cycle: u64, stats: &mut StatsTracker) {
        for mut inst in batch {
            inst.timing.dispatch = cycle;
            self.queue.push_back(inst);
        }
        stats.sample_queue(self.queue.len());
    }

    /// Move instructions from the queue head into free reservation stations,
    /// renaming as we go. Stops at the first structural limit: no free slot
    /// or an empty queue.
    pub fn issue(
        &mut self,
        cycle: u64,
        registers: &mut RegisterFile,
        tags: &mut TagAllocator,
        stations: &mut ReservationStationTable,
        stats: &mut StatsTracker,
    ) {
        while stations.has_free() {
            let mut inst = match self.queue.pop_front() {
                Some(inst) => inst,
                None => break,
            };

            // sources capture the register file before this instruction's
            // own rename lands, so an op reading its destination sees the
            // previous producer
            let src1 = rename_source(inst.src1, registers);
            let src2 = rename_source(inst.src2, registers);

            let tag = tags.next_tag();
            if inst.has_dest() {
                registers.rename(inst.dest, tag);
            }

            inst.timing.issue = cycle;
            stats.issued += 1;

            let slot = Slot {
                class: inst.op.unit_class(),
                dest_reg: inst.dest,
                dest_tag: tag,
                src1,
                src2,
                fired: false,
                inst,
            };
            let installed = stations.alloc(slot);
            debug_assert!(installed.is_some());
        }
    }
}

fn rename_source(reg: i32, registers: &RegisterFile) -> Operand {
    if reg <= 0 {
        // operand not needed, immediately available
        Operand::Ready(0)
    } else if registers.is_ready(reg) {
        Operand::Ready(registers.read(reg))
    } else {
        Operand::Waiting(registers.producer(reg))
    }
}
