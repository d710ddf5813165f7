use std::io::BufRead;

use log::warn;
use regex::Regex;

use crate::instructions::OpClass;
use crate::register_file::REG_FILE_SIZE;

/// One parsed trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub address: u64,
    pub op: OpClass,
    pub dest: i32,
    pub src1: i32,
    pub src2: i32,
}

/// Pull interface the scheduling engine fetches from. Implemented by the
/// trace reader; tests drive the engine from in-memory sources.
pub trait InstructionSource {
    /// Pull up to `max` records; shorter when the input runs dry.
    fn fetch(&mut self, max: usize) -> Vec<TraceRecord>;
    fn exhausted(&self) -> bool;
}

/// Reads instruction records from trace text, one per line:
/// `<hex address> <op class> <dest> <src1> <src2>`.
///
/// Malformed lines are skipped with a warning but still count against the
/// fetch budget of the cycle that read them; blank lines are free.
pub struct TraceReader<R> {
    input: R,
    line_re: Regex,
    exhausted: bool,
    line_no: u64,
}
impl<R: BufRead> TraceReader<R> {
    pub fn new(input: R) -> Self {
        TraceReader {
            input,
            line_re: Regex::new(
                r"^(?:0[xX])?([0-9a-fA-F]+)\s+(-?\d+)\s+(-?\d+)\s+(-?\d+)\s+(-?\d+)$",
            )
            .unwrap(),
            exhausted: false,
            line_no: 0,
        }
    }

    fn parse(&self, line: &str) -> Option<TraceRecord> {
        let captures = self.line_re.captures(line)?;

        let address = u64::from_str_radix(&captures[1], 16).ok()?;
        let op = OpClass::from_trace(captures[2].parse().ok()?)?;
        let dest: i32 = captures[3].parse().ok()?;
        let src1: i32 = captures[4].parse().ok()?;
        let src2: i32 = captures[5].parse().ok()?;

        // register ids must index the 128-entry register file
        let in_range = |reg: i32| reg < REG_FILE_SIZE as i32;
        if !in_range(dest) || !in_range(src1) || !in_range(src2) {
            return None;
        }

        Some(TraceRecord {
            address,
            op,
            dest,
            src1,
            src2,
        })
    }
}
impl<R: BufRead> InstructionSource for TraceReader<R> {
    fn fetch(&mut self, max: usize) -> Vec<TraceRecord> {
        let mut records = Vec::new();
        let mut attempts = 0;
        let mut line = String::new();

        while attempts < max {
            line.clear();
            match self.input.read_line(&mut line) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("trace read failed after line {}: {}", self.line_no, err);
                    self.exhausted = true;
                    break;
                }
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            attempts += 1;

            match self.parse(trimmed) {
                Some(record) => records.push(record),
                None => warn!("skipping malformed trace line {}: {:?}", self.line_no, trimmed),
            }
        }

        records
    }

    fn exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> TraceReader<Cursor<&str>> {
        TraceReader::new(Cursor::new(text))
    }

    #[test]
    fn parses_a_record() {
        let mut source = reader("ab120024 2 3 1 2\n");
        let records = source.fetch(4);
        assert_eq!(
            records,
            vec![TraceRecord {
                address: 0xab12_0024,
                op: OpClass::K2,
                dest: 3,
                src1: 1,
                src2: 2,
            }]
        );
        assert!(source.exhausted());
    }

    #[test]
    fn accepts_prefixed_hex_and_negative_registers() {
        let mut source = reader("0x10 -1 -1 0 -3\n");
        let records = source.fetch(1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, 0x10);
        assert_eq!(records[0].op, OpClass::NoUnit);
        assert_eq!(records[0].dest, -1);
    }

    #[test]
    fn malformed_lines_consume_fetch_budget() {
        let mut source = reader("10 0 1 0 0\nbogus line\n14 0 2 0 0\n");

        // the bad line occupies the second of two fetch slots
        let first = source.fetch(2);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].address, 0x10);
        assert!(!source.exhausted());

        let second = source.fetch(2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].address, 0x14);
    }

    #[test]
    fn blank_lines_are_free() {
        let mut source = reader("\n\n10 1 1 0 0\n");
        let records = source.fetch(1);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn out_of_range_registers_are_malformed() {
        let mut source = reader("10 0 128 0 0\n14 0 1 128 0\n18 0 1 0 0\n");
        let records = source.fetch(3);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, 0x18);
    }

    #[test]
    fn unknown_positive_op_class_is_malformed() {
        let mut source = reader("10 3 1 0 0\n");
        assert!(source.fetch(1).is_empty());
    }

    #[test]
    fn fetch_stops_early_at_end_of_input() {
        let mut source = reader("10 0 1 0 0\n");
        let records = source.fetch(8);
        assert_eq!(records.len(), 1);
        assert!(source.exhausted());
        assert!(source.fetch(8).is_empty());
    }
}
