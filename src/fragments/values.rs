use crate::opcodes::{ConstantValue, Instruction};
use crate::types::Type;
use std::fmt;

/// Kind of place an intermediate value lives in
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum LocationType {
    Stack,
    Local,
    Field,
    Other,
}

/// Where an intermediate value is held
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Location {
    /// Operand stack, indexed from the bottom of the values the fragment sees
    Stack(u16),

    /// Local variable slot
    Local(u16),

    /// Field of a class
    Field { owner: Type, name: String },

    /// Anything else the binary reader wants to identify by name
    Other(String),
}

impl Location {
    pub fn location_type(&self) -> LocationType {
        match self {
            Location::Stack(_) => LocationType::Stack,
            Location::Local(_) => LocationType::Local,
            Location::Field { .. } => LocationType::Field,
            Location::Other(_) => LocationType::Other,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Stack(idx) => write!(f, "stack[{}]", idx),
            Location::Local(idx) => write!(f, "local[{}]", idx),
            Location::Field { owner, name } => write!(f, "{}.{}", owner, name),
            Location::Other(name) => f.write_str(name),
        }
    }
}

/// Value flowing into or out of a fragment
#[derive(Clone, PartialEq, Debug)]
pub struct IntermediateValue {
    value_type: Type,
    location: Location,

    /// `None` if nobody looked, `Some(ConstantValue::Unknown)` if it was looked at and isn't a
    /// static constant
    constant: Option<ConstantValue>,
}

impl IntermediateValue {
    pub fn new(value_type: Type, location: Location) -> IntermediateValue {
        IntermediateValue {
            value_type,
            location,
            constant: None,
        }
    }

    /// Value on the operand stack
    pub fn stack(value_type: Type, index: u16) -> IntermediateValue {
        IntermediateValue::new(value_type, Location::Stack(index))
    }

    /// Value in a local variable
    pub fn local(value_type: Type, index: u16) -> IntermediateValue {
        IntermediateValue::new(value_type, Location::Local(index))
    }

    /// Value pushed by `instruction`, with whatever constant can be read off of it
    pub fn pushed_by(value_type: Type, index: u16, instruction: &Instruction) -> IntermediateValue {
        IntermediateValue::stack(value_type, index).with_constant(instruction.constant_value())
    }

    pub fn with_constant(mut self, constant: ConstantValue) -> IntermediateValue {
        self.constant = Some(constant);
        self
    }

    pub fn value_type(&self) -> &Type {
        &self.value_type
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn constant(&self) -> Option<&ConstantValue> {
        self.constant.as_ref()
    }

    /// Same value, relocated
    pub fn moved_to(&self, location: Location) -> IntermediateValue {
        IntermediateValue {
            value_type: self.value_type.clone(),
            location,
            constant: self.constant.clone(),
        }
    }
}

impl fmt::Display for IntermediateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.value_type, self.location)
    }
}

/// Every way control can leave a fragment
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ExecutionOutcome {
    /// Control can continue with whatever comes next
    pub can_fall_through: bool,
    pub can_throw: bool,
    pub can_return: bool,
}

impl ExecutionOutcome {
    pub const FALLS_THROUGH: ExecutionOutcome = ExecutionOutcome {
        can_fall_through: true,
        can_throw: false,
        can_return: false,
    };

    pub const THROWS: ExecutionOutcome = ExecutionOutcome {
        can_fall_through: false,
        can_throw: true,
        can_return: false,
    };

    pub const RETURNS: ExecutionOutcome = ExecutionOutcome {
        can_fall_through: false,
        can_throw: false,
        can_return: true,
    };

    /// Falls through, but might also throw (method calls, field accesses, allocations)
    pub const MAY_THROW: ExecutionOutcome = ExecutionOutcome {
        can_fall_through: true,
        can_throw: true,
        can_return: false,
    };

    pub fn new(can_fall_through: bool, can_throw: bool, can_return: bool) -> ExecutionOutcome {
        ExecutionOutcome {
            can_fall_through,
            can_throw,
            can_return,
        }
    }

    /// Outcome of running `parts` one after another
    ///
    /// The sequence can throw or return if any part can, and falls through only if every part
    /// does. An empty sequence falls through.
    pub fn sequence(parts: impl IntoIterator<Item = ExecutionOutcome>) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome::FALLS_THROUGH;
        for part in parts {
            outcome.can_fall_through &= part.can_fall_through;
            outcome.can_throw |= part.can_throw;
            outcome.can_return |= part.can_return;
        }
        outcome
    }
}
