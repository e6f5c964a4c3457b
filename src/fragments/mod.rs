//! Typed fragments of method bodies, and the rules for splicing them together
//!
//! A binary reader reduces a method body to a tree of [`CodeFragment`]s: method calls, field
//! accesses, returns, allocations, straight-line instruction runs, and bodies sequencing other
//! fragments. Each fragment declares the values it consumes and produces, and how control can
//! leave it. Patches are applied by calling [`CodeFragment::insert`] on fragments of that tree,
//! which mutates the tree in place after checking that the edit keeps inputs, outputs, and
//! reachability consistent.

mod insert;
mod values;

pub use insert::*;
pub use values::*;

use crate::errors::Result;
use crate::opcodes::Instruction;
use crate::types::Type;
use std::fmt;

/// A unit of executable code with typed inputs and outputs
#[derive(Clone, PartialEq, Debug)]
pub struct CodeFragment {
    kind: FragmentKind,
    inputs: Vec<IntermediateValue>,
    outputs: Vec<IntermediateValue>,
}

#[derive(Clone, PartialEq, Debug)]
pub enum FragmentKind {
    /// Invocation of `containing_class.name`, consuming receiver and arguments
    MethodCall { containing_class: Type, name: String },

    FieldLoad { containing_class: Type, name: String },

    FieldStore { containing_class: Type, name: String },

    /// Exit from the enclosing method, returning the inputs (if any)
    Return,

    /// Allocation and construction of a `class` instance
    New { class: Type },

    /// Run of instructions with a known exit profile
    Code {
        instructions: Vec<Instruction>,
        outcome: ExecutionOutcome,
    },

    /// Fragments executed one after another
    Body { children: Vec<CodeFragment> },

    /// Former return whose values now flow on to the surrounding code instead
    Yield,
}

/// Which kinds of fragments a query is interested in
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FragmentVariant {
    Any,
    MethodCall,
    FieldLoad,
    FieldStore,
    Return,
    New,
    Code,
    Body,
    Yield,
}

impl FragmentVariant {
    pub fn matches(self, fragment: &CodeFragment) -> bool {
        match (self, &fragment.kind) {
            (FragmentVariant::Any, _) => true,
            (FragmentVariant::MethodCall, FragmentKind::MethodCall { .. })
            | (FragmentVariant::FieldLoad, FragmentKind::FieldLoad { .. })
            | (FragmentVariant::FieldStore, FragmentKind::FieldStore { .. })
            | (FragmentVariant::Return, FragmentKind::Return)
            | (FragmentVariant::New, FragmentKind::New { .. })
            | (FragmentVariant::Code, FragmentKind::Code { .. })
            | (FragmentVariant::Body, FragmentKind::Body { .. })
            | (FragmentVariant::Yield, FragmentKind::Yield) => true,
            _ => false,
        }
    }
}

impl CodeFragment {
    pub fn new(
        kind: FragmentKind,
        inputs: Vec<IntermediateValue>,
        outputs: Vec<IntermediateValue>,
    ) -> CodeFragment {
        CodeFragment {
            kind,
            inputs,
            outputs,
        }
    }

    pub fn method_call(
        containing_class: Type,
        name: impl Into<String>,
        inputs: Vec<IntermediateValue>,
        outputs: Vec<IntermediateValue>,
    ) -> CodeFragment {
        let name = name.into();
        let kind = FragmentKind::MethodCall {
            containing_class,
            name,
        };
        CodeFragment::new(kind, inputs, outputs)
    }

    /// Load of a field (`receiver` is `None` for static fields)
    pub fn field_load(
        containing_class: Type,
        name: impl Into<String>,
        receiver: Option<IntermediateValue>,
        value: IntermediateValue,
    ) -> CodeFragment {
        let name = name.into();
        let kind = FragmentKind::FieldLoad {
            containing_class,
            name,
        };
        CodeFragment::new(kind, receiver.into_iter().collect(), vec![value])
    }

    /// Store to a field (`receiver` is `None` for static fields)
    pub fn field_store(
        containing_class: Type,
        name: impl Into<String>,
        receiver: Option<IntermediateValue>,
        value: IntermediateValue,
    ) -> CodeFragment {
        let name = name.into();
        let kind = FragmentKind::FieldStore {
            containing_class,
            name,
        };
        let mut inputs: Vec<IntermediateValue> = receiver.into_iter().collect();
        inputs.push(value);
        CodeFragment::new(kind, inputs, vec![])
    }

    /// Return from the method (`value` is `None` in `void` methods)
    pub fn return_value(value: Option<IntermediateValue>) -> CodeFragment {
        CodeFragment::new(FragmentKind::Return, value.into_iter().collect(), vec![])
    }

    pub fn new_object(
        class: Type,
        inputs: Vec<IntermediateValue>,
        instance: IntermediateValue,
    ) -> CodeFragment {
        CodeFragment::new(FragmentKind::New { class }, inputs, vec![instance])
    }

    /// Straight-line instructions, whose exit profile is read off the instructions
    pub fn code(
        instructions: Vec<Instruction>,
        inputs: Vec<IntermediateValue>,
        outputs: Vec<IntermediateValue>,
    ) -> CodeFragment {
        let outcome = ExecutionOutcome::sequence(instructions.iter().map(Instruction::outcome));
        CodeFragment::code_with_outcome(instructions, outcome, inputs, outputs)
    }

    /// Instructions with an exit profile worked out by the reader (for code with branches)
    pub fn code_with_outcome(
        instructions: Vec<Instruction>,
        outcome: ExecutionOutcome,
        inputs: Vec<IntermediateValue>,
        outputs: Vec<IntermediateValue>,
    ) -> CodeFragment {
        let kind = FragmentKind::Code {
            instructions,
            outcome,
        };
        CodeFragment::new(kind, inputs, outputs)
    }

    pub fn body(
        children: Vec<CodeFragment>,
        inputs: Vec<IntermediateValue>,
        outputs: Vec<IntermediateValue>,
    ) -> CodeFragment {
        CodeFragment::new(FragmentKind::Body { children }, inputs, outputs)
    }

    pub fn kind(&self) -> &FragmentKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[IntermediateValue] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[IntermediateValue] {
        &self.outputs
    }

    /// Directly contained fragments (empty for anything but bodies)
    pub fn children(&self) -> &[CodeFragment] {
        match &self.kind {
            FragmentKind::Body { children } => children,
            _ => &[],
        }
    }

    /// Name of the method or field involved
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            FragmentKind::MethodCall { name, .. }
            | FragmentKind::FieldLoad { name, .. }
            | FragmentKind::FieldStore { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Class declaring the method or field involved, or the class being instantiated
    pub fn containing_class_type(&self) -> Option<&Type> {
        match &self.kind {
            FragmentKind::MethodCall {
                containing_class, ..
            }
            | FragmentKind::FieldLoad {
                containing_class, ..
            }
            | FragmentKind::FieldStore {
                containing_class, ..
            } => Some(containing_class),
            FragmentKind::New { class } => Some(class),
            _ => None,
        }
    }

    /// Type consumed, for fragments taking exactly one value (or the stored value of field stores)
    pub fn input_type(&self) -> Option<&Type> {
        match (&self.kind, self.inputs.as_slice()) {
            (FragmentKind::FieldStore { .. }, [.., value]) => Some(value.value_type()),
            (_, [value]) => Some(value.value_type()),
            _ => None,
        }
    }

    /// Type produced, for fragments producing exactly one value
    pub fn output_type(&self) -> Option<&Type> {
        match self.outputs.as_slice() {
            [value] => Some(value.value_type()),
            _ => None,
        }
    }

    /// How control can leave this fragment
    ///
    /// Bodies derive this from their children: they can throw or return if any child can, and
    /// fall through only if every child does.
    pub fn execution_outcome(&self) -> ExecutionOutcome {
        match &self.kind {
            FragmentKind::MethodCall { .. }
            | FragmentKind::FieldLoad { .. }
            | FragmentKind::FieldStore { .. }
            | FragmentKind::New { .. } => ExecutionOutcome::MAY_THROW,
            FragmentKind::Return => ExecutionOutcome::RETURNS,
            FragmentKind::Yield => ExecutionOutcome::FALLS_THROUGH,
            FragmentKind::Code { outcome, .. } => *outcome,
            FragmentKind::Body { children } => {
                ExecutionOutcome::sequence(children.iter().map(CodeFragment::execution_outcome))
            }
        }
    }

    /// Descendants matching `variant`, in source order
    ///
    /// The fragment itself is not included, so anything other than a body finds nothing.
    pub fn find_fragments(&self, variant: FragmentVariant) -> Vec<&CodeFragment> {
        let mut found = vec![];
        self.collect_fragments(variant, &mut found);
        found
    }

    fn collect_fragments<'a>(&'a self, variant: FragmentVariant, found: &mut Vec<&'a CodeFragment>) {
        for child in self.children() {
            if variant.matches(child) {
                found.push(child);
            }
            child.collect_fragments(variant, found);
        }
    }

    /// Run `edit` on every descendant matching `variant`
    ///
    /// Children are visited before their parents, and fragments introduced by `edit` itself are
    /// not visited. The first error stops the walk; edits made up to that point stay applied.
    pub fn for_each_fragment_mut<F>(&mut self, variant: FragmentVariant, edit: &mut F) -> Result<()>
    where
        F: FnMut(&mut CodeFragment) -> Result<()>,
    {
        if let FragmentKind::Body { children } = &mut self.kind {
            for child in children.iter_mut() {
                child.for_each_fragment_mut(variant, edit)?;
                if variant.matches(child) {
                    edit(child)?;
                }
            }
        }
        Ok(())
    }

    /// Turn every `Return` in this fragment into a `Yield` of the same values
    ///
    /// Returns inside `Code` runs are plain instructions and are left alone.
    pub(crate) fn convert_returns(&mut self) -> usize {
        if let FragmentKind::Body { children } = &mut self.kind {
            return children.iter_mut().map(CodeFragment::convert_returns).sum();
        }
        if self.kind == FragmentKind::Return {
            self.kind = FragmentKind::Yield;
            self.outputs = self.inputs.clone();
            1
        } else {
            0
        }
    }

    /// First `Yield` in this fragment (possibly the fragment itself)
    pub(crate) fn first_yield(&self) -> Option<&CodeFragment> {
        match &self.kind {
            FragmentKind::Yield => Some(self),
            FragmentKind::Body { children } => children.iter().find_map(CodeFragment::first_yield),
            _ => None,
        }
    }
}

impl fmt::Display for CodeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FragmentKind::MethodCall {
                containing_class,
                name,
            } => write!(f, "call {}.{}", containing_class, name)?,
            FragmentKind::FieldLoad {
                containing_class,
                name,
            } => write!(f, "load {}.{}", containing_class, name)?,
            FragmentKind::FieldStore {
                containing_class,
                name,
            } => write!(f, "store {}.{}", containing_class, name)?,
            FragmentKind::Return => f.write_str("return")?,
            FragmentKind::New { class } => write!(f, "new {}", class)?,
            FragmentKind::Code { instructions, .. } => {
                write!(f, "code [")?;
                for (i, instruction) in instructions.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", instruction)?;
                }
                f.write_str("]")?;
            }
            FragmentKind::Body { children } => write!(f, "body of {} fragments", children.len())?,
            FragmentKind::Yield => f.write_str("yield")?,
        }
        write!(f, " ({} in, {} out)", self.inputs.len(), self.outputs.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptors::BaseType;

    fn int() -> Type {
        Type::primitive(BaseType::Int)
    }

    fn list() -> Type {
        Type::of_class("java.util.List").unwrap()
    }

    fn size_call() -> CodeFragment {
        CodeFragment::method_call(
            list(),
            "size",
            vec![IntermediateValue::stack(list(), 0)],
            vec![IntermediateValue::stack(int(), 0)],
        )
    }

    #[test]
    fn capabilities() {
        let call = size_call();
        assert_eq!(call.name(), Some("size"));
        assert_eq!(call.containing_class_type(), Some(&list()));
        assert_eq!(call.input_type(), Some(&list()));
        assert_eq!(call.output_type(), Some(&int()));

        let store = CodeFragment::field_store(
            Type::of_class("me.alec.Point").unwrap(),
            "x",
            Some(IntermediateValue::stack(Type::of_class("me.alec.Point").unwrap(), 0)),
            IntermediateValue::stack(int(), 1),
        );
        assert_eq!(store.input_type(), Some(&int()));
        assert_eq!(store.output_type(), None);

        let ret = CodeFragment::return_value(None);
        assert_eq!(ret.name(), None);
        assert_eq!(ret.containing_class_type(), None);
        assert_eq!(ret.input_type(), None);
    }

    #[test]
    fn leaf_outcomes() {
        assert_eq!(size_call().execution_outcome(), ExecutionOutcome::MAY_THROW);
        assert_eq!(
            CodeFragment::return_value(None).execution_outcome(),
            ExecutionOutcome::RETURNS
        );
        let throw = CodeFragment::code(
            vec![Instruction::AConstNull, Instruction::AThrow],
            vec![],
            vec![],
        );
        assert_eq!(throw.execution_outcome(), ExecutionOutcome::THROWS);
    }

    #[test]
    fn body_outcomes() {
        let empty = CodeFragment::body(vec![], vec![], vec![]);
        assert_eq!(empty.execution_outcome(), ExecutionOutcome::FALLS_THROUGH);

        let body = CodeFragment::body(
            vec![size_call(), CodeFragment::return_value(None)],
            vec![],
            vec![],
        );
        assert_eq!(body.execution_outcome(), ExecutionOutcome::new(false, true, true));

        let nested = CodeFragment::body(vec![body, size_call()], vec![], vec![]);
        assert_eq!(nested.execution_outcome(), ExecutionOutcome::new(false, true, true));

        // A throw after the return still counts
        let throw = CodeFragment::code(vec![Instruction::AConstNull, Instruction::AThrow], vec![], vec![]);
        let returns_then_throws =
            CodeFragment::body(vec![CodeFragment::return_value(None), throw], vec![], vec![]);
        assert_eq!(
            returns_then_throws.execution_outcome(),
            ExecutionOutcome::new(false, true, true)
        );
    }

    #[test]
    fn finding_fragments() {
        let inner = CodeFragment::body(
            vec![size_call(), CodeFragment::return_value(None)],
            vec![],
            vec![],
        );
        let outer = CodeFragment::body(vec![size_call(), inner], vec![], vec![]);

        assert_eq!(outer.find_fragments(FragmentVariant::MethodCall).len(), 2);
        assert_eq!(outer.find_fragments(FragmentVariant::Return).len(), 1);
        assert_eq!(outer.find_fragments(FragmentVariant::Body).len(), 1);
        assert_eq!(outer.find_fragments(FragmentVariant::Any).len(), 4);

        let kinds: Vec<String> = outer
            .find_fragments(FragmentVariant::Any)
            .iter()
            .map(|fragment| fragment.to_string())
            .collect();
        assert_eq!(
            kinds,
            [
                "call java.util.List.size (1 in, 1 out)",
                "body of 2 fragments (0 in, 0 out)",
                "call java.util.List.size (1 in, 1 out)",
                "return (0 in, 0 out)",
            ]
        );

        // Leaves have no descendants
        assert!(size_call().find_fragments(FragmentVariant::Any).is_empty());
    }

    #[test]
    fn editing_fragments() {
        let mut body = CodeFragment::body(
            vec![size_call(), CodeFragment::body(vec![size_call()], vec![], vec![])],
            vec![],
            vec![],
        );
        let mut seen = 0;
        body.for_each_fragment_mut(FragmentVariant::MethodCall, &mut |fragment| {
            seen += 1;
            *fragment = CodeFragment::code(vec![Instruction::IConst0], vec![], vec![]);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, 2);
        assert!(body.find_fragments(FragmentVariant::MethodCall).is_empty());
        assert_eq!(body.find_fragments(FragmentVariant::Code).len(), 2);
    }

    #[test]
    fn converting_returns() {
        let value = IntermediateValue::stack(int(), 0);
        let mut body = CodeFragment::body(
            vec![size_call(), CodeFragment::return_value(Some(value.clone()))],
            vec![],
            vec![],
        );
        assert_eq!(body.convert_returns(), 1);
        let yielded = body.first_yield().unwrap();
        assert_eq!(yielded.outputs(), &[value]);
        assert_eq!(body.execution_outcome(), ExecutionOutcome::MAY_THROW);
    }
}
