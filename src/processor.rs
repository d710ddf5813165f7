use log::debug;
use thiserror::Error;

use crate::bus::CommonDataBus;
use crate::dispatcher::Dispatcher;
use crate::instructions::{Instruction, UnitClass};
use crate::register_file::{RegisterFile, TagAllocator};
use crate::reservation_station::ReservationStationTable;
use crate::scoreboard::Scoreboard;
use crate::stats::StatsTracker;
use crate::trace::InstructionSource;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("bus width must be at least 1 (got {0})")]
    BadBusWidth(usize),
    #[error("fetch width must be at least 1 (got {0})")]
    BadFetchWidth(usize),
    #[error("at least one functional unit is required")]
    NoUnits,
    #[error("instruction {id} needs a {class:?} unit but none are configured")]
    EmptyUnitClass { id: u64, class: UnitClass },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Machine shape. The reservation-station count is derived, not configured:
/// twice the total functional-unit count.
#[derive(Debug, Clone)]
pub struct ProcConfig {
    pub bus_width: usize,
    pub fetch_width: usize,
    pub k0: usize,
    pub k1: usize,
    pub k2: usize,
}
impl Default for ProcConfig {
    fn default() -> Self {
        ProcConfig {
            bus_width: 2,
            fetch_width: 4,
            k0: 3,
            k1: 2,
            k2: 1,
        }
    }
}
impl ProcConfig {
    pub fn station_count(&self) -> usize {
        2 * (self.k0 + self.k1 + self.k2)
    }

    /// A single class may be empty (instructions of that class are then a
    /// runtime error at fire time), but the machine as a whole needs units,
    /// a bus, and a front end.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.bus_width == 0 {
            return Err(SimError::BadBusWidth(self.bus_width));
        }
        if self.fetch_width == 0 {
            return Err(SimError::BadFetchWidth(self.fetch_width));
        }
        if self.k0 + self.k1 + self.k2 == 0 {
            return Err(SimError::NoUnits);
        }
        Ok(())
    }
}

/// The cycle-stepped scheduling engine. Owns every piece of machine state
/// and advances it in a fixed stage order, results end first, so each stage
/// only ever reads state left behind by earlier cycles.
pub struct Processor<S> {
    config: ProcConfig,
    source: S,
    registers: RegisterFile,
    tags: TagAllocator,
    stations: ReservationStationTable,
    scoreboard: Scoreboard,
    bus: CommonDataBus,
    dispatcher: Dispatcher,
    fetched: Vec<Instruction>,
    next_id: u64,
    stats: StatsTracker,
}
impl<S: InstructionSource> Processor<S> {
    pub fn new(config: ProcConfig, source: S) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Processor {
            source,
            registers: RegisterFile::new(),
            tags: TagAllocator::new(),
            stations: ReservationStationTable::new(config.station_count()),
            scoreboard: Scoreboard::new(config.k0, config.k1, config.k2),
            bus: CommonDataBus::new(config.bus_width),
            dispatcher: Dispatcher::new(),
            fetched: Vec::new(),
            next_id: 0,
            stats: StatsTracker::new(),
            config,
        })
    }

    /// Run to the drain point: input exhausted and every fetched instruction
    /// retired. Returns the collected statistics.
    pub fn run(mut self) -> Result<StatsTracker, SimError> {
        while !self.drained() {
            self.stats.cycles += 1;
            self.cycle()?;
        }
        Ok(self.stats)
    }

    fn drained(&self) -> bool {
        self.source.exhausted()
            && self.fetched.is_empty()
            && self.dispatcher.is_empty()
            && self.stations.is_empty()
    }

    fn cycle(&mut self) -> Result<(), SimError> {
        let cycle = self.stats.cycles;

        self.bus.reset();
        self.scoreboard.advance(&mut self.bus);
        self.update_registers();
        self.fire(cycle)?;
        self.dispatcher.issue(
            cycle,
            &mut self.registers,
            &mut self.tags,
            &mut self.stations,
            &mut self.stats,
        );
        self.stations.apply_broadcasts(&self.bus);
        self.retire(cycle);
        self.transfer(cycle);
        self.fetch(cycle);

        Ok(())
    }

    fn update_registers(&mut self) {
        for broadcast in self.bus.iter_active() {
            self.registers
                .complete(broadcast.dest_reg, broadcast.tag, broadcast.value);
        }
    }

    /// Place ready stations on free units, oldest producer first. A class
    /// with no free unit is blocked for the rest of this cycle rather than
    /// reselected; a class with no units at all can never accept its
    /// instructions and is reported as an error.
    fn fire(&mut self, cycle: u64) -> Result<(), SimError> {
        let mut blocked = [false; 3];
        loop {
            let pick = self
                .stations
                .scan_ready()
                .into_iter()
                .filter(|entry| !blocked[entry.class.index()])
                .min_by_key(|entry| (entry.tag, entry.index));
            let entry = match pick {
                Some(entry) => entry,
                None => break,
            };

            if self.scoreboard.capacity(entry.class) == 0 {
                return Err(SimError::EmptyUnitClass {
                    id: entry.id,
                    class: entry.class,
                });
            }

            if self
                .scoreboard
                .try_occupy(entry.class, entry.index, entry.dest_reg, entry.tag)
            {
                self.stations.mark_fired(entry.index, cycle);
            } else {
                blocked[entry.class.index()] = true;
            }
        }
        Ok(())
    }

    fn retire(&mut self, cycle: u64) {
        for mut inst in self.stations.retire_completed(&self.bus) {
            inst.timing.retire = cycle;
            debug!("inst {} retired at cycle {}", inst.id, cycle);
            self.stats.record_retired(&inst);
        }
    }

    fn transfer(&mut self, cycle: u64) {
        let batch = std::mem::take(&mut self.fetched);
        self.dispatcher.transfer(batch, cycle, &mut self.stats);
    }

    fn fetch(&mut self, cycle: u64) {
        for record in self.source.fetch(self.config.fetch_width) {
            let id = self.next_id;
            self.next_id += 1;

            let mut inst = Instruction::new(id, record.op, record.dest, record.src1, record.src2);
            inst.timing.fetch = cycle;
            self.stats.fetched += 1;
            self.fetched.push(inst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::OpClass;
    use crate::trace::TraceRecord;
    use std::collections::VecDeque;

    /// In-memory instruction source for driving the engine directly.
    struct VecSource {
        records: VecDeque<TraceRecord>,
    }
    impl VecSource {
        fn new(records: Vec<TraceRecord>) -> Self {
            VecSource {
                records: records.into(),
            }
        }
    }
    impl InstructionSource for VecSource {
        fn fetch(&mut self, max: usize) -> Vec<TraceRecord> {
            let take = max.min(self.records.len());
            self.records.drain(..take).collect()
        }

        fn exhausted(&self) -> bool {
            self.records.is_empty()
        }
    }

    fn record(op: OpClass, dest: i32, src1: i32, src2: i32) -> TraceRecord {
        TraceRecord {
            address: 0,
            op,
            dest,
            src1,
            src2,
        }
    }

    #[test]
    fn config_rejects_zero_widths() {
        let mut config = ProcConfig::default();
        config.bus_width = 0;
        assert!(matches!(config.validate(), Err(SimError::BadBusWidth(0))));

        let mut config = ProcConfig::default();
        config.fetch_width = 0;
        assert!(matches!(config.validate(), Err(SimError::BadFetchWidth(0))));

        let config = ProcConfig {
            k0: 0,
            k1: 0,
            k2: 0,
            ..ProcConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::NoUnits)));
    }

    #[test]
    fn a_single_empty_class_is_a_valid_config() {
        let config = ProcConfig {
            bus_width: 1,
            fetch_width: 1,
            k0: 1,
            k1: 0,
            k2: 0,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.station_count(), 2);
    }

    #[test]
    fn firing_into_an_empty_class_fails_loudly() {
        let config = ProcConfig {
            bus_width: 1,
            fetch_width: 1,
            k0: 1,
            k1: 1,
            k2: 0,
        };
        let source = VecSource::new(vec![record(OpClass::K2, 1, 0, 0)]);
        let processor = Processor::new(config, source).unwrap();

        match processor.run() {
            Err(SimError::EmptyUnitClass { id: 0, class }) => assert_eq!(class, UnitClass::K2),
            other => panic!("expected EmptyUnitClass, got {:?}", other.map(|s| s.retired)),
        }
    }

    #[test]
    fn sentinel_ops_run_on_k1_and_retire() {
        let config = ProcConfig {
            bus_width: 1,
            fetch_width: 2,
            k0: 1,
            k1: 1,
            k2: 0,
        };
        let source = VecSource::new(vec![
            record(OpClass::NoUnit, 0, 0, 0),
            record(OpClass::NoUnit, 2, 0, 0),
        ]);
        let stats = Processor::new(config, source).unwrap().run().unwrap();
        assert_eq!(stats.retired, 2);
    }

    #[test]
    fn resource_conservation_holds_every_cycle() {
        let config = ProcConfig {
            bus_width: 1,
            fetch_width: 4,
            k0: 1,
            k1: 1,
            k2: 1,
        };
        let records = (0..12)
            .map(|i| record(OpClass::from_trace(i % 3).unwrap(), (i % 7) + 1, i % 5, 0))
            .collect();
        let mut processor = Processor::new(config, VecSource::new(records)).unwrap();

        let mut guard = 0;
        while !processor.drained() {
            processor.stats.cycles += 1;
            processor.cycle().unwrap();
            guard += 1;
            assert!(guard < 1000, "simulation failed to drain");

            assert_eq!(processor.stations.len(), 6);
            assert!(processor.stations.occupied() <= processor.stations.len());
            for class in UnitClass::ALL {
                assert!(processor.scoreboard.busy_count(class) <= processor.scoreboard.capacity(class));
            }
            assert!(processor.bus.active_count() <= 1);
        }
        assert_eq!(processor.stats.retired, 12);
    }

    #[test]
    fn drains_with_no_input_at_all() {
        let stats = Processor::new(ProcConfig::default(), VecSource::new(Vec::new()))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(stats.retired, 0);
        assert_eq!(stats.cycles, 0);
    }
}
