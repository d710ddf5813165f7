use crate::register_file::Tag;

/// One result in flight on the common data bus this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSlot {
    pub tag: Tag,
    pub value: i64,
    pub dest_reg: i32,
}

/// Fixed-width result-forwarding medium. Slots live for exactly one cycle:
/// claimed by publishing units, read by the register file and the wakeup
/// and retirement scans, then cleared by `reset` at the next cycle start.
#[derive(Debug)]
pub struct CommonDataBus {
    slots: Vec<Option<BusSlot>>,
}
impl CommonDataBus {
    pub fn new(width: usize) -> Self {
        CommonDataBus {
            slots: vec![None; width],
        }
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Claim a free slot for a completing result. False means the bus is
    /// saturated; the caller keeps its result and retries next cycle.
    pub fn try_claim_slot(&mut self, tag: Tag, value: i64, dest_reg: i32) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some(BusSlot {
                    tag,
                    value,
                    dest_reg,
                });
                return true;
            }
        }
        false
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &BusSlot> {
        self.slots.iter().flatten()
    }

    pub fn active_count(&self) -> usize {
        self.iter_active().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_are_bounded_by_width() {
        let mut bus = CommonDataBus::new(2);
        assert!(bus.try_claim_slot(0, 0, 1));
        assert!(bus.try_claim_slot(1, 0, 2));
        assert!(!bus.try_claim_slot(2, 0, 3), "third claim must bounce");
        assert_eq!(bus.active_count(), 2);
    }

    #[test]
    fn reset_frees_every_slot() {
        let mut bus = CommonDataBus::new(1);
        assert!(bus.try_claim_slot(5, 9, 3));
        bus.reset();
        assert_eq!(bus.active_count(), 0);
        assert!(bus.try_claim_slot(6, 0, 4));
    }

    #[test]
    fn active_slots_keep_their_payload() {
        let mut bus = CommonDataBus::new(2);
        assert!(bus.try_claim_slot(3, 17, 8));
        let seen: Vec<&BusSlot> = bus.iter_active().collect();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].tag, 3);
        assert_eq!(seen[0].value, 17);
        assert_eq!(seen[0].dest_reg, 8);
    }
}
