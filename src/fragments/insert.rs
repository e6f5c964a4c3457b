use super::{CodeFragment, FragmentKind, IntermediateValue, Location};
use crate::errors::{Error, Result};
use crate::opcodes::{Instruction, StorageClass};
use crate::types::{Assignable, Type};
use std::fmt;
use std::ops::Range;

/// Where a fragment goes relative to the fragment it is inserted into
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InsertionPosition {
    Before,
    Overwrite,
    After,
}

/// Why an insertion was refused
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ConflictReason {
    /// Nothing can feed inputs to a fragment inserted before or after another one
    UnexpectedInputs { count: usize },

    /// The target never falls through, so nothing after it would run
    Unreachable,

    InputArity { expected: usize, found: usize },
    OutputArity { expected: usize, found: usize },

    /// The original's input can't be passed where the replacement expects it
    InputType {
        index: usize,
        expected: Type,
        found: Type,
    },

    /// The replacement's output can't be used where the original's was
    OutputType {
        index: usize,
        expected: Type,
        found: Type,
    },

    /// The replacement never falls through but the original did
    StrandsFallThrough,

    /// No instruction sequence moves the value between the two locations
    UnbindableValue { index: usize },
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::UnexpectedInputs { count } => {
                write!(f, "inserted fragment expects {} inputs, but none are available", count)
            }
            ConflictReason::Unreachable => f.write_str("target never falls through"),
            ConflictReason::InputArity { expected, found } => {
                write!(f, "expected {} inputs but found {}", expected, found)
            }
            ConflictReason::OutputArity { expected, found } => {
                write!(f, "expected {} outputs but found {}", expected, found)
            }
            ConflictReason::InputType {
                index,
                expected,
                found,
            } => write!(
                f,
                "input {} of type {} can't be passed as {}",
                index, found, expected
            ),
            ConflictReason::OutputType {
                index,
                expected,
                found,
            } => write!(
                f,
                "output {} of type {} can't be used as {}",
                index, found, expected
            ),
            ConflictReason::StrandsFallThrough => {
                f.write_str("replacement never falls through, stranding the code after it")
            }
            ConflictReason::UnbindableValue { index } => {
                write!(f, "value {} can't be moved between its locations", index)
            }
        }
    }
}

/// Knobs for [`CodeFragment::insert`]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct InsertionOptions {
    /// When overwriting, returns in the replacement produce its output values instead of exiting
    /// the method
    pub convert_return_to_output_types: bool,

    /// When inserting before or after, returns in the inserted code exit the enclosing method
    /// (otherwise they just produce a value, which is then discarded)
    pub convert_return_call_to_return_instruction: bool,

    /// When inserting before, drop the values the inserted fragment leaves on the stack
    pub discard_outputs: bool,
}

impl Default for InsertionOptions {
    fn default() -> Self {
        InsertionOptions {
            convert_return_to_output_types: true,
            convert_return_call_to_return_instruction: true,
            discard_outputs: true,
        }
    }
}

impl InsertionOptions {
    pub fn with_convert_return_to_output_types(mut self, convert: bool) -> Self {
        self.convert_return_to_output_types = convert;
        self
    }

    pub fn with_convert_return_call_to_return_instruction(mut self, convert: bool) -> Self {
        self.convert_return_call_to_return_instruction = convert;
        self
    }

    pub fn with_discard_outputs(mut self, discard: bool) -> Self {
        self.discard_outputs = discard;
        self
    }
}

impl CodeFragment {
    /// Insert `fragment` relative to this one, editing the tree in place
    ///
    ///   - `Before` is always possible, as long as the inserted fragment takes no inputs
    ///   - `Overwrite` needs matching inputs and outputs, and may not turn code that falls
    ///     through into code that doesn't
    ///   - `After` needs this fragment to fall through and the inserted one to take no inputs
    ///
    /// On failure, nothing is changed.
    pub fn insert(
        &mut self,
        fragment: CodeFragment,
        position: InsertionPosition,
        options: InsertionOptions,
    ) -> Result<()> {
        log::debug!("Inserting '{}' {:?} '{}'", fragment, position, self);
        match position {
            InsertionPosition::Before => self.insert_before(fragment, options),
            InsertionPosition::Overwrite => self.overwrite(fragment, options),
            InsertionPosition::After => self.insert_after(fragment, options),
        }
    }

    fn conflict(
        &self,
        inserted: &CodeFragment,
        position: InsertionPosition,
        reason: ConflictReason,
    ) -> Error {
        log::debug!("Refusing to insert '{}' into '{}': {}", inserted, self, reason);
        Error::ReachabilityConflict {
            target: self.to_string(),
            inserted: inserted.to_string(),
            position,
            reason,
        }
    }

    fn insert_before(&mut self, mut fragment: CodeFragment, options: InsertionOptions) -> Result<()> {
        let position = InsertionPosition::Before;
        if !fragment.inputs.is_empty() {
            let count = fragment.inputs.len();
            return Err(self.conflict(&fragment, position, ConflictReason::UnexpectedInputs { count }));
        }
        if !options.convert_return_call_to_return_instruction {
            fragment.yield_returns();
        }

        let mut inserted_outputs = vec![];
        let discard = if options.discard_outputs {
            discard_outputs(&fragment)?
        } else {
            inserted_outputs = fragment.outputs.clone();
            None
        };

        let mut before = vec![fragment];
        before.extend(discard);
        self.wrap(before, vec![]);

        if !inserted_outputs.is_empty() {
            inserted_outputs.append(&mut self.outputs);
            self.outputs = inserted_outputs;
        }
        Ok(())
    }

    fn insert_after(&mut self, mut fragment: CodeFragment, options: InsertionOptions) -> Result<()> {
        let position = InsertionPosition::After;
        if !self.execution_outcome().can_fall_through {
            return Err(self.conflict(&fragment, position, ConflictReason::Unreachable));
        }
        if !fragment.inputs.is_empty() {
            let count = fragment.inputs.len();
            return Err(self.conflict(&fragment, position, ConflictReason::UnexpectedInputs { count }));
        }
        if !options.convert_return_call_to_return_instruction {
            fragment.yield_returns();
        }

        let discard = discard_outputs(&fragment)?;
        let mut after = vec![fragment];
        after.extend(discard);
        self.wrap(vec![], after);
        Ok(())
    }

    fn overwrite(&mut self, mut replacement: CodeFragment, options: InsertionOptions) -> Result<()> {
        let position = InsertionPosition::Overwrite;
        if options.convert_return_to_output_types {
            replacement.yield_returns();
        }

        if self.inputs.len() != replacement.inputs.len() {
            let reason = ConflictReason::InputArity {
                expected: self.inputs.len(),
                found: replacement.inputs.len(),
            };
            return Err(self.conflict(&replacement, position, reason));
        }
        if self.outputs.len() != replacement.outputs.len() {
            let reason = ConflictReason::OutputArity {
                expected: self.outputs.len(),
                found: replacement.outputs.len(),
            };
            return Err(self.conflict(&replacement, position, reason));
        }
        for (index, (original, new)) in self.inputs.iter().zip(&replacement.inputs).enumerate() {
            if !original.value_type().is_assignable(new.value_type()) {
                let reason = ConflictReason::InputType {
                    index,
                    expected: new.value_type().clone(),
                    found: original.value_type().clone(),
                };
                return Err(self.conflict(&replacement, position, reason));
            }
        }
        for (index, (original, new)) in self.outputs.iter().zip(&replacement.outputs).enumerate() {
            if !new.value_type().is_assignable(original.value_type()) {
                let reason = ConflictReason::OutputType {
                    index,
                    expected: original.value_type().clone(),
                    found: new.value_type().clone(),
                };
                return Err(self.conflict(&replacement, position, reason));
            }
        }
        if self.execution_outcome().can_fall_through
            && !replacement.execution_outcome().can_fall_through
        {
            return Err(self.conflict(&replacement, position, ConflictReason::StrandsFallThrough));
        }

        let unbindable = |index| {
            self.conflict(&replacement, position, ConflictReason::UnbindableValue { index })
        };
        let bind_inputs = move_values(&self.inputs, &replacement.inputs, unbindable)?;
        let bind_outputs = move_values(&replacement.outputs, &self.outputs, unbindable)?;

        if bind_inputs.is_none() && bind_outputs.is_none() {
            *self = replacement;
        } else {
            let inputs = std::mem::take(&mut self.inputs);
            let outputs = std::mem::take(&mut self.outputs);
            let mut children: Vec<CodeFragment> = bind_inputs.into_iter().collect();
            children.push(replacement);
            children.extend(bind_outputs);
            *self = CodeFragment::body(children, inputs, outputs);
        }
        Ok(())
    }

    /// Turn returns into yields, making the first yielded values the outputs if there are none
    fn yield_returns(&mut self) {
        if self.convert_returns() > 0 && self.outputs.is_empty() {
            if let Some(yielded) = self.first_yield() {
                self.outputs = yielded.outputs.clone();
            }
        }
    }

    /// Replace this fragment with a body running `before`, then this fragment, then `after`
    ///
    /// If this fragment already is a body, the new fragments are spliced into it instead.
    fn wrap(&mut self, before: Vec<CodeFragment>, after: Vec<CodeFragment>) {
        let original = std::mem::replace(self, CodeFragment::body(vec![], vec![], vec![]));
        let inputs = original.inputs.clone();
        let outputs = original.outputs.clone();

        let mut children = before;
        match original.kind {
            FragmentKind::Body {
                children: existing,
            } => children.extend(existing),
            kind => children.push(CodeFragment::new(kind, original.inputs, original.outputs)),
        }
        children.extend(after);
        *self = CodeFragment::body(children, inputs, outputs);
    }
}

/// Code popping whatever `fragment` leaves on the stack
fn discard_outputs(fragment: &CodeFragment) -> Result<Option<CodeFragment>> {
    let on_stack: Vec<&IntermediateValue> = fragment
        .outputs
        .iter()
        .filter(|value| matches!(value.location(), Location::Stack(_)))
        .collect();
    if on_stack.is_empty() {
        return Ok(None);
    }
    let mut pops = vec![];
    for value in on_stack.iter().rev() {
        pops.push(Instruction::pop(value.value_type())?);
    }
    let inputs = on_stack.into_iter().cloned().collect();
    Ok(Some(CodeFragment::code(pops, inputs, vec![])))
}

/// Code moving values from the locations in `from` to the matching locations in `to`
///
/// The values move in parallel: every local is read before any local a read depends on is
/// written. Stack values are positional, so the stack values of `from` must be exactly the top
/// of the stack. Values moving between locals travel through the stack (all loads, then all
/// stores), so swaps and cycles need no scratch slot. Values in fields or other locations can
/// only stay where they are.
///
/// Stores from the stack into locals normally run first. If one of them would clobber a local
/// that still has to be read, they run last instead, which is only possible when nothing gets
/// loaded onto the stack for good.
fn move_values(
    from: &[IntermediateValue],
    to: &[IntermediateValue],
    unbindable: impl Fn(usize) -> Error,
) -> Result<Option<CodeFragment>> {
    let mut stores = vec![];
    let mut local_loads = vec![];
    let mut local_stores = vec![];
    let mut loads = vec![];

    // Slots read before the move, and slots holding a value after it
    let mut read: Vec<(usize, Range<u16>)> = vec![];
    let mut written: Vec<(usize, Range<u16>)> = vec![];
    let mut stored: Vec<(usize, Range<u16>)> = vec![];

    // Once a stack value stays on the stack, nothing beneath it can be popped off into a local
    let mut kept_on_stack = false;
    for (index, (source, target)) in from.iter().zip(to).enumerate().rev() {
        match (source.location(), target.location()) {
            (Location::Stack(_), Location::Stack(_)) => kept_on_stack = true,
            (Location::Stack(_), Location::Local(slot)) if !kept_on_stack => {
                stores.push(Instruction::store(target.value_type(), *slot)?);
                stored.push((index, slots(target, *slot)?));
                written.push((index, slots(target, *slot)?));
            }
            (Location::Local(from_slot), Location::Local(to_slot)) => {
                written.push((index, slots(target, *to_slot)?));
                if from_slot != to_slot {
                    read.push((index, slots(source, *from_slot)?));
                    local_loads.push(Instruction::load(source.value_type(), *from_slot)?);
                    local_stores.push(Instruction::store(target.value_type(), *to_slot)?);
                }
            }
            (Location::Local(slot), Location::Stack(_)) => read.push((index, slots(source, *slot)?)),
            (source_location, target_location) if source_location == target_location => (),
            _ => return Err(unbindable(index)),
        }
    }

    // Two values can't end up in the same slot
    for (position, (index, range)) in written.iter().enumerate() {
        if written[position + 1..].iter().any(|(_, other)| overlaps(range, other)) {
            return Err(unbindable(*index));
        }
    }

    // Loads go on top of every value already on the stack
    let mut loaded = false;
    for (index, (source, target)) in from.iter().zip(to).enumerate() {
        match (source.location(), target.location()) {
            (Location::Local(slot), Location::Stack(_)) => {
                loads.push(Instruction::load(source.value_type(), *slot)?);
                loaded = true;
            }
            (Location::Stack(_), Location::Stack(_)) if loaded => return Err(unbindable(index)),
            _ => (),
        }
    }

    // Gathered top down, but locals are pushed in order and popped in reverse
    local_loads.reverse();

    let clobbering = stored
        .iter()
        .find(|(_, range)| read.iter().any(|(_, other)| overlaps(range, other)));
    let mut instructions = vec![];
    match clobbering {
        None => {
            instructions.append(&mut stores);
            instructions.append(&mut loads);
            instructions.append(&mut local_loads);
            instructions.append(&mut local_stores);
        }
        Some((index, _)) if !loads.is_empty() => return Err(unbindable(*index)),
        Some(_) => {
            instructions.append(&mut local_loads);
            instructions.append(&mut local_stores);
            instructions.append(&mut stores);
        }
    }

    if instructions.is_empty() {
        return Ok(None);
    }
    Ok(Some(CodeFragment::code(instructions, from.to_vec(), to.to_vec())))
}

/// Local slots taken up by `value` when it is held starting at `slot`
fn slots(value: &IntermediateValue, slot: u16) -> Result<Range<u16>> {
    let width = StorageClass::of(value.value_type())?.width();
    Ok(slot..slot.saturating_add(width))
}

fn overlaps(a: &Range<u16>, b: &Range<u16>) -> bool {
    a.start < b.end && b.start < a.end
}
