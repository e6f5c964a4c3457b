//! Storage classes and the small instruction subset needed to glue fragments together
//!
//! The JVM has one family of load/store/return instructions per storage class: all the small
//! integral types share the `int` family and all references share the `a` family. Inserting a
//! fragment only ever needs to move values between the operand stack and local variables, drop
//! values, push constants, or exit the method, so that is all that is modelled here.
//!
//! Like the `wide` prefix in the class file format, the short (`iload_0`), normal (`iload 4`),
//! and wide (`wide iload 300`) forms of loads and stores are one instruction here. The form is
//! picked when serializing.

use crate::binary_format::Serialize;
use crate::descriptors::BaseType;
use crate::errors::{Error, Result};
use crate::fragments::{ExecutionOutcome, IntermediateValue, Location};
use crate::names::BinaryName;
use crate::types::{DescriptorType, Type};
use byteorder::WriteBytesExt;
use std::convert::TryFrom;
use std::fmt;

/// Which family of typed instructions handles a value
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum StorageClass {
    /// `boolean`, `byte`, `char`, `short`, and `int`
    Int,
    Long,
    Float,
    Double,

    /// Classes and arrays
    Reference,
}

impl StorageClass {
    /// Storage class of a type
    ///
    /// `void` has no values to store, and values of unknown or union type can't be stored without
    /// first deciding on a concrete type.
    pub fn of(typ: &Type) -> Result<StorageClass> {
        let category = typ.descriptor_type();
        match category {
            DescriptorType::Boolean
            | DescriptorType::Byte
            | DescriptorType::Char
            | DescriptorType::Short
            | DescriptorType::Int => Ok(StorageClass::Int),
            DescriptorType::Long => Ok(StorageClass::Long),
            DescriptorType::Float => Ok(StorageClass::Float),
            DescriptorType::Double => Ok(StorageClass::Double),
            DescriptorType::Array | DescriptorType::Class => Ok(StorageClass::Reference),
            DescriptorType::Void | DescriptorType::Value | DescriptorType::Union => {
                Err(Error::UnsupportedValueCategory {
                    value_type: typ.clone(),
                    category,
                })
            }
        }
    }

    /// Number of local variable (or stack) slots a value occupies
    pub fn width(self) -> u16 {
        match self {
            StorageClass::Long | StorageClass::Double => 2,
            _ => 1,
        }
    }

    /// Opcode of the `?load` taking an explicit index
    pub fn load_opcode(self) -> u8 {
        match self {
            StorageClass::Int => 0x15,
            StorageClass::Long => 0x16,
            StorageClass::Float => 0x17,
            StorageClass::Double => 0x18,
            StorageClass::Reference => 0x19,
        }
    }

    /// Opcode of `?load_0` (followed by `_1` through `_3`)
    fn short_load_opcode(self) -> u8 {
        match self {
            StorageClass::Int => 0x1A,
            StorageClass::Long => 0x1E,
            StorageClass::Float => 0x22,
            StorageClass::Double => 0x26,
            StorageClass::Reference => 0x2A,
        }
    }

    /// Opcode of the `?store` taking an explicit index
    pub fn store_opcode(self) -> u8 {
        match self {
            StorageClass::Int => 0x36,
            StorageClass::Long => 0x37,
            StorageClass::Float => 0x38,
            StorageClass::Double => 0x39,
            StorageClass::Reference => 0x3A,
        }
    }

    fn short_store_opcode(self) -> u8 {
        match self {
            StorageClass::Int => 0x3B,
            StorageClass::Long => 0x3F,
            StorageClass::Float => 0x43,
            StorageClass::Double => 0x47,
            StorageClass::Reference => 0x4B,
        }
    }

    pub fn return_opcode(self) -> u8 {
        match self {
            StorageClass::Int => 0xAC,
            StorageClass::Long => 0xAD,
            StorageClass::Float => 0xAE,
            StorageClass::Double => 0xAF,
            StorageClass::Reference => 0xB0,
        }
    }
}

/// Value of a constant pushed by an instruction
#[derive(Clone, PartialEq, Debug)]
pub enum Constant {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),

    /// Class literal
    Class(Type),
}

impl Constant {
    /// Type of the value pushed (`null` is typed as `java/lang/Object`)
    pub fn value_type(&self) -> Type {
        match self {
            Constant::Null => Type::object(),
            Constant::Int(_) => Type::primitive(BaseType::Int),
            Constant::Long(_) => Type::primitive(BaseType::Long),
            Constant::Float(_) => Type::primitive(BaseType::Float),
            Constant::Double(_) => Type::primitive(BaseType::Double),
            Constant::String(_) => Type::string(),
            Constant::Class(_) => Type::of_binary_name(&BinaryName::CLASS),
        }
    }
}

/// Statically known value of something, or an explicit marker that it isn't known
///
/// `Unknown` is a positive statement ("this was examined and has no static value"), which is why
/// it is a variant rather than the absence of a value.
#[derive(Clone, PartialEq, Debug)]
pub enum ConstantValue {
    Known(Constant),
    Unknown,
}

impl ConstantValue {
    pub fn known(&self) -> Option<&Constant> {
        match self {
            ConstantValue::Known(constant) => Some(constant),
            ConstantValue::Unknown => None,
        }
    }
}

/// JVM instructions used when splicing fragments together
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),

    /// Load from the constant pool, covering `ldc`, `ldc_w`, and `ldc2_w`
    Ldc { index: u16, constant: Constant },

    /// Load from a local variable
    Load(StorageClass, u16),

    /// Store into a local variable
    Store(StorageClass, u16),

    Pop,
    Pop2,

    /// Return from the method, with a value unless it is `void`
    Return(Option<StorageClass>),

    AThrow,
}

impl Instruction {
    /// Load of a value of type `typ` out of local variable `index`
    pub fn load(typ: &Type, index: u16) -> Result<Instruction> {
        Ok(Instruction::Load(StorageClass::of(typ)?, index))
    }

    pub fn store(typ: &Type, index: u16) -> Result<Instruction> {
        Ok(Instruction::Store(StorageClass::of(typ)?, index))
    }

    /// Load that pushes `value` onto the stack, if it lives in a local variable
    ///
    /// Values in other locations produce `None` (stack values are already where a load would
    /// put them).
    pub fn load_for(value: &IntermediateValue) -> Result<Option<Instruction>> {
        let class = StorageClass::of(value.value_type())?;
        Ok(match value.location() {
            Location::Local(index) => Some(Instruction::Load(class, *index)),
            _ => None,
        })
    }

    /// Store that moves a value from the top of the stack into `value`'s local variable
    pub fn store_for(value: &IntermediateValue) -> Result<Option<Instruction>> {
        let class = StorageClass::of(value.value_type())?;
        Ok(match value.location() {
            Location::Local(index) => Some(Instruction::Store(class, *index)),
            _ => None,
        })
    }

    /// Instruction dropping a value of type `typ` from the top of the stack
    pub fn pop(typ: &Type) -> Result<Instruction> {
        Ok(match StorageClass::of(typ)?.width() {
            2 => Instruction::Pop2,
            _ => Instruction::Pop,
        })
    }

    /// Return instruction for a method with return type `typ`
    pub fn return_for(typ: &Type) -> Result<Instruction> {
        if typ.descriptor_type() == DescriptorType::Void {
            Ok(Instruction::Return(None))
        } else {
            Ok(Instruction::Return(Some(StorageClass::of(typ)?)))
        }
    }

    /// Shortest instruction pushing an `int` constant
    pub fn push_int(value: i32) -> Option<Instruction> {
        Some(match value {
            -1 => Instruction::IConstM1,
            0 => Instruction::IConst0,
            1 => Instruction::IConst1,
            2 => Instruction::IConst2,
            3 => Instruction::IConst3,
            4 => Instruction::IConst4,
            5 => Instruction::IConst5,
            _ => match i8::try_from(value) {
                Ok(byte) => Instruction::BiPush(byte),
                Err(_) => Instruction::SiPush(i16::try_from(value).ok()?),
            },
        })
    }

    /// Constant this instruction pushes, if it is a constant push at all
    pub fn constant_value(&self) -> ConstantValue {
        let constant = match self {
            Instruction::AConstNull => Constant::Null,
            Instruction::IConstM1 => Constant::Int(-1),
            Instruction::IConst0 => Constant::Int(0),
            Instruction::IConst1 => Constant::Int(1),
            Instruction::IConst2 => Constant::Int(2),
            Instruction::IConst3 => Constant::Int(3),
            Instruction::IConst4 => Constant::Int(4),
            Instruction::IConst5 => Constant::Int(5),
            Instruction::LConst0 => Constant::Long(0),
            Instruction::LConst1 => Constant::Long(1),
            Instruction::FConst0 => Constant::Float(0.0),
            Instruction::FConst1 => Constant::Float(1.0),
            Instruction::FConst2 => Constant::Float(2.0),
            Instruction::DConst0 => Constant::Double(0.0),
            Instruction::DConst1 => Constant::Double(1.0),
            Instruction::BiPush(b) => Constant::Int(i32::from(*b)),
            Instruction::SiPush(s) => Constant::Int(i32::from(*s)),
            Instruction::Ldc { constant, .. } => constant.clone(),
            _ => return ConstantValue::Unknown,
        };
        ConstantValue::Known(constant)
    }

    /// How control leaves this instruction
    pub fn outcome(&self) -> ExecutionOutcome {
        match self {
            Instruction::Return(_) => ExecutionOutcome::RETURNS,
            Instruction::AThrow => ExecutionOutcome::THROWS,
            _ => ExecutionOutcome::FALLS_THROUGH,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = |class: &StorageClass| match class {
            StorageClass::Int => "i",
            StorageClass::Long => "l",
            StorageClass::Float => "f",
            StorageClass::Double => "d",
            StorageClass::Reference => "a",
        };
        match self {
            Instruction::AConstNull => f.write_str("aconst_null"),
            Instruction::BiPush(b) => write!(f, "bipush {}", b),
            Instruction::SiPush(s) => write!(f, "sipush {}", s),
            Instruction::Ldc { index, .. } => write!(f, "ldc #{}", index),
            Instruction::Load(class, idx) => write!(f, "{}load {}", prefix(class), idx),
            Instruction::Store(class, idx) => write!(f, "{}store {}", prefix(class), idx),
            Instruction::Pop => f.write_str("pop"),
            Instruction::Pop2 => f.write_str("pop2"),
            Instruction::Return(None) => f.write_str("return"),
            Instruction::Return(Some(class)) => write!(f, "{}return", prefix(class)),
            Instruction::AThrow => f.write_str("athrow"),
            other => match other.constant_value() {
                ConstantValue::Known(Constant::Int(-1)) => f.write_str("iconst_m1"),
                ConstantValue::Known(Constant::Int(i)) => write!(f, "iconst_{}", i),
                ConstantValue::Known(Constant::Long(l)) => write!(f, "lconst_{}", l),
                ConstantValue::Known(Constant::Float(x)) => write!(f, "fconst_{}", x),
                ConstantValue::Known(Constant::Double(x)) => write!(f, "dconst_{}", x),
                _ => write!(f, "{:?}", other),
            },
        }
    }
}

impl Serialize for Instruction {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        /* The load/store instructions follow the same pattern:
         *
         *   - short form (0-3) have special bytes
         *   - normal form (0-255) use `iload` plus a byte operand
         *   - wide form (255-65535) use `wide iload` plus two byte operands
         */
        fn serialize_load_or_store<W: WriteBytesExt>(
            idx: u16,
            short_form_start: u8,
            normal_form: u8,
            writer: &mut W,
        ) -> std::io::Result<()> {
            match u8::try_from(idx) {
                Ok(n @ 0..=3) => (short_form_start + n).serialize(writer),
                Ok(n) => {
                    normal_form.serialize(writer)?;
                    n.serialize(writer)
                }
                Err(_) => {
                    0xC4u8.serialize(writer)?;
                    normal_form.serialize(writer)?;
                    idx.serialize(writer)
                }
            }
        }

        match self {
            Instruction::AConstNull => 0x01u8.serialize(writer)?,
            Instruction::IConstM1 => 0x02u8.serialize(writer)?,
            Instruction::IConst0 => 0x03u8.serialize(writer)?,
            Instruction::IConst1 => 0x04u8.serialize(writer)?,
            Instruction::IConst2 => 0x05u8.serialize(writer)?,
            Instruction::IConst3 => 0x06u8.serialize(writer)?,
            Instruction::IConst4 => 0x07u8.serialize(writer)?,
            Instruction::IConst5 => 0x08u8.serialize(writer)?,
            Instruction::LConst0 => 0x09u8.serialize(writer)?,
            Instruction::LConst1 => 0x0au8.serialize(writer)?,
            Instruction::FConst0 => 0x0bu8.serialize(writer)?,
            Instruction::FConst1 => 0x0cu8.serialize(writer)?,
            Instruction::FConst2 => 0x0du8.serialize(writer)?,
            Instruction::DConst0 => 0x0eu8.serialize(writer)?,
            Instruction::DConst1 => 0x0fu8.serialize(writer)?,
            Instruction::BiPush(b) => {
                0x10u8.serialize(writer)?;
                b.serialize(writer)?;
            }
            Instruction::SiPush(s) => {
                0x11u8.serialize(writer)?;
                s.serialize(writer)?;
            }
            Instruction::Ldc {
                index,
                constant: Constant::Long(_) | Constant::Double(_),
            } => {
                0x14u8.serialize(writer)?;
                index.serialize(writer)?;
            }
            Instruction::Ldc { index, .. } => match u8::try_from(*index) {
                Ok(b) => {
                    0x12u8.serialize(writer)?;
                    b.serialize(writer)?;
                }
                Err(_) => {
                    0x13u8.serialize(writer)?;
                    index.serialize(writer)?;
                }
            },
            Instruction::Load(class, idx) => serialize_load_or_store(
                *idx,
                class.short_load_opcode(),
                class.load_opcode(),
                writer,
            )?,
            Instruction::Store(class, idx) => serialize_load_or_store(
                *idx,
                class.short_store_opcode(),
                class.store_opcode(),
                writer,
            )?,
            Instruction::Pop => 0x57u8.serialize(writer)?,
            Instruction::Pop2 => 0x58u8.serialize(writer)?,
            Instruction::Return(None) => 0xB1u8.serialize(writer)?,
            Instruction::Return(Some(class)) => class.return_opcode().serialize(writer)?,
            Instruction::AThrow => 0xBFu8.serialize(writer)?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binary_format::to_bytes;

    fn primitive(base: BaseType) -> Type {
        Type::primitive(base)
    }

    #[test]
    fn storage_classes() {
        let int_family = [
            BaseType::Boolean,
            BaseType::Byte,
            BaseType::Char,
            BaseType::Short,
            BaseType::Int,
        ];
        for base in int_family {
            assert_eq!(StorageClass::of(&primitive(base)).unwrap(), StorageClass::Int);
        }
        assert_eq!(StorageClass::of(&primitive(BaseType::Long)).unwrap(), StorageClass::Long);
        assert_eq!(StorageClass::of(&primitive(BaseType::Float)).unwrap(), StorageClass::Float);
        assert_eq!(StorageClass::of(&primitive(BaseType::Double)).unwrap(), StorageClass::Double);
        assert_eq!(StorageClass::of(&Type::string()).unwrap(), StorageClass::Reference);
        assert_eq!(
            StorageClass::of(&Type::new("[I").unwrap()).unwrap(),
            StorageClass::Reference
        );
    }

    #[test]
    fn unstorable_categories() {
        let union = Type::union_of(&[Type::string(), Type::object()]);
        for typ in [Type::void(), Type::unknown_value(), union] {
            match StorageClass::of(&typ) {
                Err(Error::UnsupportedValueCategory { value_type, .. }) => {
                    assert_eq!(value_type, typ)
                }
                other => panic!("expected unsupported category, got {:?}", other),
            }
        }
        assert!(Instruction::pop(&Type::void()).is_err());
    }

    #[test]
    fn pops_by_width() {
        assert_eq!(Instruction::pop(&primitive(BaseType::Long)).unwrap(), Instruction::Pop2);
        assert_eq!(Instruction::pop(&primitive(BaseType::Double)).unwrap(), Instruction::Pop2);
        assert_eq!(Instruction::pop(&Type::object()).unwrap(), Instruction::Pop);
    }

    #[test]
    fn returns() {
        assert_eq!(Instruction::return_for(&Type::void()).unwrap(), Instruction::Return(None));
        assert_eq!(
            Instruction::return_for(&primitive(BaseType::Boolean)).unwrap(),
            Instruction::Return(Some(StorageClass::Int))
        );
        assert!(Instruction::return_for(&Type::unknown_value()).is_err());
    }

    #[test]
    fn constants() {
        assert_eq!(Instruction::AConstNull.constant_value(), ConstantValue::Known(Constant::Null));
        assert_eq!(Instruction::IConstM1.constant_value(), ConstantValue::Known(Constant::Int(-1)));
        assert_eq!(Instruction::LConst1.constant_value(), ConstantValue::Known(Constant::Long(1)));
        assert_eq!(
            Instruction::FConst2.constant_value(),
            ConstantValue::Known(Constant::Float(2.0))
        );
        assert_eq!(
            Instruction::BiPush(-100).constant_value(),
            ConstantValue::Known(Constant::Int(-100))
        );
        assert_eq!(
            Instruction::SiPush(1000).constant_value(),
            ConstantValue::Known(Constant::Int(1000))
        );
        let ldc = Instruction::Ldc {
            index: 7,
            constant: Constant::String(String::from("hi")),
        };
        assert_eq!(
            ldc.constant_value().known(),
            Some(&Constant::String(String::from("hi")))
        );
        assert_eq!(Instruction::Pop.constant_value(), ConstantValue::Unknown);
        assert_eq!(
            Instruction::Load(StorageClass::Int, 1).constant_value(),
            ConstantValue::Unknown
        );
    }

    #[test]
    fn shortest_int_push() {
        assert_eq!(Instruction::push_int(3), Some(Instruction::IConst3));
        assert_eq!(Instruction::push_int(-1), Some(Instruction::IConstM1));
        assert_eq!(Instruction::push_int(100), Some(Instruction::BiPush(100)));
        assert_eq!(Instruction::push_int(-30000), Some(Instruction::SiPush(-30000)));
        assert_eq!(Instruction::push_int(70000), None);
    }

    #[test]
    fn serialized_forms() {
        let bytes = |insn: Instruction| to_bytes(&insn).unwrap();
        assert_eq!(bytes(Instruction::Load(StorageClass::Int, 2)), vec![0x1C]);
        assert_eq!(bytes(Instruction::Load(StorageClass::Reference, 0)), vec![0x2A]);
        assert_eq!(bytes(Instruction::Store(StorageClass::Long, 9)), vec![0x37, 9]);
        assert_eq!(
            bytes(Instruction::Store(StorageClass::Double, 300)),
            vec![0xC4, 0x39, 0x01, 0x2C]
        );
        assert_eq!(bytes(Instruction::SiPush(-2)), vec![0x11, 0xFF, 0xFE]);
        assert_eq!(
            bytes(Instruction::Ldc {
                index: 3,
                constant: Constant::Int(100_000)
            }),
            vec![0x12, 3]
        );
        assert_eq!(
            bytes(Instruction::Ldc {
                index: 300,
                constant: Constant::String(String::new())
            }),
            vec![0x13, 0x01, 0x2C]
        );
        assert_eq!(
            bytes(Instruction::Ldc {
                index: 3,
                constant: Constant::Long(1 << 40)
            }),
            vec![0x14, 0x00, 0x03]
        );
        assert_eq!(bytes(Instruction::Return(Some(StorageClass::Reference))), vec![0xB0]);
        assert_eq!(bytes(Instruction::Return(None)), vec![0xB1]);
    }

    #[test]
    fn outcomes() {
        assert_eq!(Instruction::AThrow.outcome(), ExecutionOutcome::THROWS);
        assert_eq!(Instruction::Return(None).outcome(), ExecutionOutcome::RETURNS);
        assert_eq!(Instruction::Pop.outcome(), ExecutionOutcome::FALLS_THROUGH);
    }

    #[test]
    fn rendering() {
        assert_eq!(Instruction::Load(StorageClass::Reference, 1).to_string(), "aload 1");
        assert_eq!(Instruction::IConst4.to_string(), "iconst_4");
        assert_eq!(Instruction::IConstM1.to_string(), "iconst_m1");
        assert_eq!(Instruction::Return(Some(StorageClass::Long)).to_string(), "lreturn");
    }
}
