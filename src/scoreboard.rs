use log::debug;

use crate::bus::CommonDataBus;
use crate::instructions::UnitClass;
use crate::register_file::Tag;

/// One computation occupying a functional unit. `result_ready` flips one
/// cycle after occupation, modeling the fixed single-cycle execute latency.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    rs_slot: usize,
    dest_reg: i32,
    tag: Tag,
    value: i64,
    result_ready: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct FuncUnit {
    job: Option<InFlight>,
}

/// Per-class pools of execution resources. Counts are fixed at construction.
#[derive(Debug)]
pub struct Scoreboard {
    pools: [Vec<FuncUnit>; 3],
}
impl Scoreboard {
    pub fn new(k0: usize, k1: usize, k2: usize) -> Self {
        Scoreboard {
            pools: [
                vec![FuncUnit::default(); k0],
                vec![FuncUnit::default(); k1],
                vec![FuncUnit::default(); k2],
            ],
        }
    }

    pub fn capacity(&self, class: UnitClass) -> usize {
        self.pools[class.index()].len()
    }

    pub fn busy_count(&self, class: UnitClass) -> usize {
        self.pools[class.index()]
            .iter()
            .filter(|unit| unit.job.is_some())
            .count()
    }

    /// Place a fired reservation-station entry on a free unit of `class`.
    /// False means every unit of the class is occupied.
    pub fn try_occupy(&mut self, class: UnitClass, rs_slot: usize, dest_reg: i32, tag: Tag) -> bool {
        for unit in self.pools[class.index()].iter_mut() {
            if unit.job.is_none() {
                unit.job = Some(InFlight {
                    rs_slot,
                    dest_reg,
                    tag,
                    value: 0,
                    result_ready: false,
                });
                return true;
            }
        }
        false
    }

    /// One cycle of progress for every occupied unit: a unit without a result
    /// gets one, a unit with a result tries to publish it. A unit that cannot
    /// claim a bus slot stays occupied and retries next cycle.
    pub fn advance(&mut self, bus: &mut CommonDataBus) {
        for class in UnitClass::ALL {
            for unit in self.pools[class.index()].iter_mut() {
                match unit.job {
                    Some(ref mut job) if !job.result_ready => job.result_ready = true,
                    Some(job) => {
                        if bus.try_claim_slot(job.tag, job.value, job.dest_reg) {
                            debug!("station {} published tag {}", job.rs_slot, job.tag);
                            unit.job = None;
                        }
                    }
                    None => {}
                }
            }
        }
    }
}
