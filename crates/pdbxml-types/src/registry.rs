//! Closed token registries.
//!
//! Each registry maps the tokens used by the XML encoding onto a small
//! enumeration. Lookups of tokens outside the table fail with
//! [`ReadError::UnknownToken`].

use crate::error::{ReadError, ReadResult};
use serde::{Deserialize, Serialize};

/// Scalar kinds a base descriptor can name with the `.` sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Void,
    WChar,
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
}

const PRIMITIVES: &[(&str, PrimitiveKind)] = &[
    ("VOID", PrimitiveKind::Void),
    ("WCHAR", PrimitiveKind::WChar),
    ("CHAR", PrimitiveKind::Char),
    ("UCHAR", PrimitiveKind::UChar),
    ("SHORT", PrimitiveKind::Short),
    ("USHORT", PrimitiveKind::UShort),
    ("INT", PrimitiveKind::Int),
    ("UINT", PrimitiveKind::UInt),
    ("LONG", PrimitiveKind::Long),
    ("ULONG", PrimitiveKind::ULong),
    ("LONGLONG", PrimitiveKind::LongLong),
    ("ULONGLONG", PrimitiveKind::ULongLong),
    ("FLOAT", PrimitiveKind::Float),
    ("DOUBLE", PrimitiveKind::Double),
];

impl PrimitiveKind {
    /// Look up a primitive by its document token (`INT`, `ULONGLONG`, ...).
    pub fn lookup(token: &str) -> ReadResult<Self> {
        PRIMITIVES
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| ReadError::unknown_token("primitive type", token))
    }

    /// C spelling of the type.
    pub fn c_name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::WChar => "wchar_t",
            PrimitiveKind::Char => "char",
            PrimitiveKind::UChar => "unsigned char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UShort => "unsigned short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UInt => "unsigned int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::ULong => "unsigned long",
            PrimitiveKind::LongLong => "long long",
            PrimitiveKind::ULongLong => "unsigned long long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }
}

/// Type qualifiers carried by the `attr` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeAttr {
    Const,
    Volatile,
    Unaligned,
}

impl TypeAttr {
    pub fn lookup(token: &str) -> ReadResult<Self> {
        match token {
            "CONST" => Ok(TypeAttr::Const),
            "VOLATILE" => Ok(TypeAttr::Volatile),
            "UNALIGNED" => Ok(TypeAttr::Unaligned),
            _ => Err(ReadError::unknown_token("type attribute", token)),
        }
    }

    pub fn c_name(self) -> &'static str {
        match self {
            TypeAttr::Const => "const",
            TypeAttr::Volatile => "volatile",
            TypeAttr::Unaligned => "__unaligned",
        }
    }
}

/// Calling convention of a function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallConv {
    #[default]
    Default,
    Stdcall,
}

impl CallConv {
    /// Keyword placed in front of the declarator, if any.
    pub fn c_keyword(self) -> Option<&'static str> {
        match self {
            CallConv::Default => None,
            CallConv::Stdcall => Some("__stdcall"),
        }
    }
}

/// One operator of a wrap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapOp {
    /// `a N`
    Array,
    /// `p`
    Pointer,
    /// `F id` for stdcall, any other token followed by an id for the default convention.
    Function(CallConv),
}

impl WrapOp {
    /// Classify a wrap token. Every token is valid: anything that is not
    /// `a` or `p` introduces a function.
    pub fn parse(token: &str) -> Self {
        match token {
            "a" => WrapOp::Array,
            "p" => WrapOp::Pointer,
            "F" => WrapOp::Function(CallConv::Stdcall),
            _ => WrapOp::Function(CallConv::Default),
        }
    }

    /// Number of tokens the operator consumes after itself.
    pub fn operands(self) -> usize {
        match self {
            WrapOp::Pointer => 0,
            WrapOp::Array | WrapOp::Function(_) => 1,
        }
    }
}
