//! C type representation.
//!
//! This module defines the type tree produced by the reader. Composite types
//! keep their members in declaration order, wrappers (pointer, array,
//! function) nest exactly one inner type, and references to other named
//! types are left unresolved as [`CType::Named`].

use crate::registry::{CallConv, PrimitiveKind, TypeAttr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A C type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CType {
    /// Scalar type (void, char, int, double, ...)
    Primitive(PrimitiveKind),

    /// Pointer to another type
    Pointer(Box<CType>),

    /// Fixed-length array of elements
    Array(ArrayType),

    /// Structure type
    Struct(StructType),

    /// Union type
    Union(UnionType),

    /// Enumeration type
    Enum(EnumType),

    /// Function type
    Function(FunctionType),

    /// Scalar occupying a number of bits of its enclosing struct
    BitField(BitFieldType),

    /// Type with qualifiers (const, volatile, ...)
    Attributed(AttributedType),

    /// Named reference to a type, resolved later by the storage
    Named(String),
}

impl CType {
    /// Check if this is a pointer type.
    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer(_))
    }

    /// Check if this is a struct type.
    pub fn is_struct(&self) -> bool {
        matches!(self, CType::Struct(_))
    }

    /// Check if this is a struct, union or enum.
    pub fn is_composite(&self) -> bool {
        matches!(self, CType::Struct(_) | CType::Union(_) | CType::Enum(_))
    }

    /// Check if this is an unresolved named reference.
    pub fn is_named(&self) -> bool {
        matches!(self, CType::Named(_))
    }

    /// Short lowercase name of the variant, used in listings.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CType::Primitive(_) => "primitive",
            CType::Pointer(_) => "pointer",
            CType::Array(_) => "array",
            CType::Struct(_) => "struct",
            CType::Union(_) => "union",
            CType::Enum(_) => "enum",
            CType::Function(_) => "function",
            CType::BitField(_) => "bit-field",
            CType::Attributed(_) => "attributed",
            CType::Named(_) => "named",
        }
    }

    /// Collect every name referenced through [`CType::Named`], in tree order.
    pub fn named_references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_named(&mut names);
        names
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            CType::Primitive(_) | CType::Enum(_) => {}
            CType::Named(name) => out.push(name),
            CType::Pointer(inner) => inner.collect_named(out),
            CType::Array(a) => a.element.collect_named(out),
            CType::BitField(b) => b.base.collect_named(out),
            CType::Attributed(a) => a.inner.collect_named(out),
            CType::Struct(s) => {
                for field in &s.fields {
                    field.field_type.collect_named(out);
                }
            }
            CType::Union(u) => {
                for member in &u.members {
                    member.member_type.collect_named(out);
                }
            }
            CType::Function(f) => {
                f.return_type.collect_named(out);
                for param in &f.parameters {
                    param.collect_named(out);
                }
            }
        }
    }

    /// Format this type as a C declaration.
    ///
    /// Anonymous composites are abbreviated to `struct { ... }`; use
    /// [`TypeDatabase::format_type`](crate::TypeDatabase::format_type) for a
    /// full definition.
    pub fn to_c_string(&self, name: Option<&str>) -> String {
        self.declare(name.unwrap_or_default().to_string())
    }

    /// Wrap `decl` in this type's declarator syntax, working inside out.
    fn declare(&self, decl: String) -> String {
        match self {
            CType::Primitive(p) => with_specifier(p.c_name(), &decl),
            CType::Named(n) => with_specifier(n, &decl),
            CType::Struct(_) => with_specifier("struct { ... }", &decl),
            CType::Union(_) => with_specifier("union { ... }", &decl),
            CType::Enum(_) => with_specifier("enum { ... }", &decl),
            CType::Pointer(inner) => {
                let decl = format!("*{}", decl);
                match &**inner {
                    // The convention keyword goes inside the parentheses: `(__stdcall *fn)`
                    CType::Function(f) => {
                        let kw = f.convention.c_keyword().unwrap_or_default();
                        declare_function(f, format!("({})", with_specifier(kw, &decl)))
                    }
                    CType::Array(_) => inner.declare(format!("({})", decl)),
                    // `const int (*p)[3]`: qualifiers stay with the element type
                    CType::Attributed(a) if matches!(*a.inner, CType::Array(_)) => {
                        inner.declare(format!("({})", decl))
                    }
                    _ => inner.declare(decl),
                }
            }
            CType::Array(a) => a.element.declare(format!("{}[{}]", decl, a.length)),
            CType::Function(f) => {
                let decl = match f.convention.c_keyword() {
                    Some(kw) => with_specifier(kw, &decl),
                    None => decl,
                };
                declare_function(f, decl)
            }
            CType::BitField(b) => format!("{} : {}", b.base.declare(decl), b.width),
            CType::Attributed(a) => {
                let quals: Vec<_> = a.attrs.iter().map(|attr| attr.c_name()).collect();
                let quals = quals.join(" ");
                if a.inner.is_pointer() {
                    // Qualifiers on a pointer bind to the declarator: `int *const p`
                    a.inner.declare(with_specifier(&quals, &decl))
                } else {
                    with_specifier(&quals, &a.inner.declare(decl))
                }
            }
        }
    }
}

fn declare_function(f: &FunctionType, decl: String) -> String {
    let params: Vec<_> = f.parameters.iter().map(|p| p.to_c_string(None)).collect();
    let params_str = if params.is_empty() {
        "void".to_string()
    } else {
        params.join(", ")
    };
    f.return_type.declare(format!("{}({})", decl, params_str))
}

fn with_specifier(spec: &str, decl: &str) -> String {
    if decl.is_empty() {
        spec.to_string()
    } else if spec.is_empty() {
        decl.to_string()
    } else {
        format!("{} {}", spec, decl)
    }
}

/// Array type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayType {
    /// Element type.
    pub element: Box<CType>,
    /// Number of elements.
    pub length: usize,
}

impl ArrayType {
    pub fn new(element: CType, length: usize) -> Self {
        Self {
            element: Box::new(element),
            length,
        }
    }
}

/// Structure type details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructType {
    /// Fields in declaration order.
    pub fields: Vec<StructField>,
}

impl StructType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn add_field(&mut self, name: String, field_type: CType) {
        self.fields.push(StructField { name, field_type });
    }

    /// Get field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field in a struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    /// Field name.
    pub name: String,
    /// Field type.
    pub field_type: CType,
}

/// Union type details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    /// Members in declaration order.
    pub members: Vec<UnionMember>,
}

impl UnionType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member.
    pub fn add_member(&mut self, name: String, member_type: CType) {
        self.members.push(UnionMember { name, member_type });
    }
}

/// A member in a union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionMember {
    /// Member name.
    pub name: String,
    /// Member type.
    pub member_type: CType,
}

/// Enumeration type details.
///
/// Values are kept as the literal strings found in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    /// Enumerators (name, literal value).
    pub values: Vec<(String, String)>,
}

impl EnumType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an enumerator.
    pub fn add_value(&mut self, name: String, literal: String) {
        self.values.push((name, literal));
    }

    /// Get the literal by name.
    pub fn literal_of(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get the numeric value by name.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.literal_of(name).and_then(parse_enum_literal)
    }

    /// Get name by numeric value.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| parse_enum_literal(v) == Some(value))
            .map(|(n, _)| n.as_str())
    }
}

/// Parse a decimal or `0x` hexadecimal literal, optionally negative.
pub fn parse_enum_literal(literal: &str) -> Option<i64> {
    let literal = literal.trim();
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    if digits.starts_with(['-', '+']) {
        return None;
    }
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u64>().ok()?,
    };
    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        // Unsigned 64-bit enumerators keep their bit pattern
        Some(magnitude as i64)
    }
}

/// Function type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionType {
    /// Return type.
    pub return_type: Box<CType>,
    /// Calling convention.
    pub convention: CallConv,
    /// Parameter types in order.
    pub parameters: Vec<CType>,
}

impl FunctionType {
    pub fn new(return_type: CType, convention: CallConv) -> Self {
        Self {
            return_type: Box::new(return_type),
            convention,
            parameters: Vec::new(),
        }
    }

    /// Add a parameter.
    pub fn add_param(&mut self, param_type: CType) {
        self.parameters.push(param_type);
    }
}

/// Bit field details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitFieldType {
    /// Underlying scalar type.
    pub base: Box<CType>,
    /// Number of bits.
    pub width: u32,
}

impl BitFieldType {
    pub fn new(base: CType, width: u32) -> Self {
        Self {
            base: Box::new(base),
            width,
        }
    }
}

/// Qualified type details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedType {
    /// Qualified type.
    pub inner: Box<CType>,
    /// Qualifiers; duplicates collapse.
    pub attrs: BTreeSet<TypeAttr>,
}

impl AttributedType {
    pub fn new(inner: CType, attrs: BTreeSet<TypeAttr>) -> Self {
        Self {
            inner: Box::new(inner),
            attrs,
        }
    }

    pub fn has(&self, attr: TypeAttr) -> bool {
        self.attrs.contains(&attr)
    }
}

// Common type constructors for convenience
impl CType {
    pub fn prim(kind: PrimitiveKind) -> Self {
        CType::Primitive(kind)
    }
    pub fn void() -> Self {
        CType::Primitive(PrimitiveKind::Void)
    }
    pub fn char() -> Self {
        CType::Primitive(PrimitiveKind::Char)
    }
    pub fn int() -> Self {
        CType::Primitive(PrimitiveKind::Int)
    }
    pub fn uint() -> Self {
        CType::Primitive(PrimitiveKind::UInt)
    }

    pub fn ptr(inner: CType) -> Self {
        CType::Pointer(Box::new(inner))
    }
    pub fn array(element: CType, length: usize) -> Self {
        CType::Array(ArrayType::new(element, length))
    }
    pub fn bit_field(base: CType, width: u32) -> Self {
        CType::BitField(BitFieldType::new(base, width))
    }
    pub fn attributed(inner: CType, attrs: impl IntoIterator<Item = TypeAttr>) -> Self {
        CType::Attributed(AttributedType::new(inner, attrs.into_iter().collect()))
    }

    /// Create a reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        CType::Named(name.into())
    }
}
