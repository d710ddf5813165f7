use num::FromPrimitive;

/// The three functional-unit classes the machine is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    K0,
    K1,
    K2,
}
impl UnitClass {
    pub const ALL: [UnitClass; 3] = [UnitClass::K0, UnitClass::K1, UnitClass::K2];

    pub fn index(self) -> usize {
        match self {
            UnitClass::K0 => 0,
            UnitClass::K1 => 1,
            UnitClass::K2 => 2,
        }
    }
}

/// Operation class as it appears in the trace. Negative values mean the
/// instruction needs no functional unit of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum OpClass {
    NoUnit = -1,
    K0 = 0,
    K1 = 1,
    K2 = 2,
}
impl OpClass {
    pub fn from_trace(raw: i32) -> Option<OpClass> {
        match OpClass::from_i32(raw) {
            Some(op) => Some(op),
            // every negative class is the "no unit" sentinel
            None if raw < 0 => Some(OpClass::NoUnit),
            None => None,
        }
    }

    /// Unit class this op occupies. Ops that need no unit of their own
    /// still flow through the pipeline on a K1 unit so they broadcast and
    /// retire like everything else.
    pub fn unit_class(self) -> UnitClass {
        match self {
            OpClass::K0 => UnitClass::K0,
            OpClass::K1 | OpClass::NoUnit => UnitClass::K1,
            OpClass::K2 => UnitClass::K2,
        }
    }
}

/// Cycle number of each pipeline stage an instruction has passed through.
/// Zero means the stage has not been reached yet; cycles count from 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub fetch: u64,
    pub dispatch: u64,
    pub issue: u64,
    pub fire: u64,
    pub retire: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub id: u64,
    pub op: OpClass,
    pub dest: i32,
    pub src1: i32,
    pub src2: i32,
    pub timing: Lifecycle,
}
impl Instruction {
    pub fn new(id: u64, op: OpClass, dest: i32, src1: i32, src2: i32) -> Self {
        Instruction {
            id,
            op,
            dest,
            src1,
            src2,
            timing: Lifecycle::default(),
        }
    }

    /// Register ids of 0 or below are "no destination".
    pub fn has_dest(&self) -> bool {
        self.dest > 0
    }
}
