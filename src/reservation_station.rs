use crate::bus::CommonDataBus;
use crate::instructions::{Instruction, UnitClass};
use crate::register_file::Tag;

/// A renamed source operand: either a value captured at issue (or woken up
/// since) or a wait on the producer identified by a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Ready(i64),
    Waiting(Tag),
}
impl Operand {
    pub fn is_ready(&self) -> bool {
        match self {
            Operand::Ready(_) => true,
            Operand::Waiting(_) => false,
        }
    }
}

/// One occupied reservation station. The slot owns its instruction from
/// issue until retirement.
#[derive(Debug)]
pub struct Slot {
    pub inst: Instruction,
    pub class: UnitClass,
    pub dest_reg: i32,
    pub dest_tag: Tag,
    pub src1: Operand,
    pub src2: Operand,
    pub fired: bool,
}
impl Slot {
    fn ready_to_fire(&self) -> bool {
        !self.fired && self.src1.is_ready() && self.src2.is_ready()
    }
}

/// A slot that could fire this cycle, as seen by the selection pass.
#[derive(Debug, Clone, Copy)]
pub struct ReadyEntry {
    pub index: usize,
    pub id: u64,
    pub tag: Tag,
    pub class: UnitClass,
    pub dest_reg: i32,
}

/// Bounded table of in-flight instructions, sized at 2x the total
/// functional-unit count. Slot lifecycle:
/// free -> waiting operands -> ready -> fired -> free (retired).
#[derive(Debug)]
pub struct ReservationStationTable {
    slots: Vec<Option<Slot>>,
}
impl ReservationStationTable {
    pub fn new(size: usize) -> Self {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || None);
        ReservationStationTable { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied() == 0
    }

    pub fn has_free(&self) -> bool {
        self.slots.iter().any(|slot| slot.is_none())
    }

    /// Install an issued instruction in the first free slot. None means the
    /// table is full; the caller must not issue in that case.
    pub fn alloc(&mut self, slot: Slot) -> Option<usize> {
        for (index, entry) in self.slots.iter_mut().enumerate() {
            if entry.is_none() {
                *entry = Some(slot);
                return Some(index);
            }
        }
        None
    }

    /// Occupied slots with both operands ready that have not fired yet.
    pub fn scan_ready(&self) -> Vec<ReadyEntry> {
        let mut ready = Vec::new();
        for (index, entry) in self.slots.iter().enumerate() {
            if let Some(slot) = entry {
                if slot.ready_to_fire() {
                    ready.push(ReadyEntry {
                        index,
                        id: slot.inst.id,
                        tag: slot.dest_tag,
                        class: slot.class,
                        dest_reg: slot.dest_reg,
                    });
                }
            }
        }
        ready
    }

    pub fn mark_fired(&mut self, index: usize, cycle: u64) {
        if let Some(slot) = self.slots[index].as_mut() {
            slot.fired = true;
            slot.inst.timing.fire = cycle;
        }
    }

    /// Wakeup scan: every waiting operand checks the active bus slots and
    /// captures the value of a matching broadcast.
    pub fn apply_broadcasts(&mut self, bus: &CommonDataBus) {
        for slot in self.slots.iter_mut().flatten() {
            for broadcast in bus.iter_active() {
                if slot.src1 == Operand::Waiting(broadcast.tag) {
                    slot.src1 = Operand::Ready(broadcast.value);
                }
                if slot.src2 == Operand::Waiting(broadcast.tag) {
                    slot.src2 = Operand::Ready(broadcast.value);
                }
            }
        }
    }

    /// Free every fired slot whose destination tag was broadcast this cycle
    /// and hand back the instructions it owned. Broadcasts that match no
    /// slot are ignored; tags are unique so each broadcast retires at most
    /// one slot.
    pub fn retire_completed(&mut self, bus: &CommonDataBus) -> Vec<Instruction> {
        let mut retired = Vec::new();
        for index in 0..self.slots.len() {
            let done = match &self.slots[index] {
                Some(slot) => {
                    slot.fired && bus.iter_active().any(|broadcast| broadcast.tag == slot.dest_tag)
                }
                None => false,
            };
            if done {
                if let Some(slot) = self.slots[index].take() {
                    retired.push(slot.inst);
                }
            }
        }
        retired
    }
}
