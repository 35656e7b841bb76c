//! Type database reader.
//!
//! Decodes the three sections of a [`Document`] into [`CType`] trees:
//!
//! - section 0: function records, each child an argument descriptor
//! - section 1: unnamed (anonymous) struct/union/enum records
//! - section 2: named struct/union/enum records
//!
//! A type descriptor carries three attributes:
//!
//! - `base`: `.NAME` primitive, `$NAME` reference to a named type, or a sigil
//!   followed by the id of an unnamed type (`#12`)
//! - `attr`: optional whitespace-separated qualifiers (`CONST VOLATILE`)
//! - `wrap`: optional wrap chain applied left to right, each token wrapping
//!   the result so far: `p` pointer, `a N` array of N, `F id` stdcall
//!   function, any other token followed by an id a default-convention
//!   function. Bit-fields never take a wrap chain.

use crate::document::{parse_int, Document, Element};
use crate::error::{ReadError, ReadResult};
use crate::locator::Locator;
use crate::registry::{CallConv, PrimitiveKind, TypeAttr, WrapOp};
use crate::types::*;
use std::collections::BTreeSet;

/// Destination for decoded named types.
pub trait TypeStorage {
    /// Store one named type. Duplicate handling is up to the storage.
    fn add(&mut self, name: String, ty: CType);
}

impl TypeStorage for Vec<(String, CType)> {
    fn add(&mut self, name: String, ty: CType) {
        self.push((name, ty));
    }
}

/// Reader options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Fail on out-of-order section records instead of scanning for them.
    pub strict_order: bool,
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict_order(mut self, strict: bool) -> Self {
        self.strict_order = strict;
        self
    }
}

/// Longest wrap chain accepted, in tokens. Each token adds one level of
/// nesting to the decoded tree, and dropping or comparing that tree recurses
/// once per level.
pub const MAX_WRAP_TOKENS: usize = 1024;

/// Decoder over one document. Each reader is good for one pass: the
/// locators' cursors only move forward.
pub struct TypeReader<'d> {
    funcs: Locator<'d>,
    unnamed: Locator<'d>,
    named: &'d Element,
}

impl<'d> TypeReader<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self::with_config(doc, ReaderConfig::default())
    }

    pub fn with_config(doc: &'d Document, config: ReaderConfig) -> Self {
        Self {
            funcs: Locator::new("functions", doc.functions()).strict(config.strict_order),
            unnamed: Locator::new("unnamed", doc.unnamed()).strict(config.strict_order),
            named: doc.named(),
        }
    }

    /// Decode every named type in document order and hand it to `storage`.
    ///
    /// Stops at the first failure; the failing type is never added.
    /// Returns the number of types added.
    pub fn read_to_storage<S: TypeStorage + ?Sized>(&mut self, storage: &mut S) -> ReadResult<usize> {
        let named = self.named;
        for record in &named.children {
            let name = record.required_attr("name")?;
            let ty = self.read_group(record)?;
            log::debug!("read {} {}", ty.kind_name(), name);
            storage.add(name.to_string(), ty);
        }
        Ok(named.len())
    }

    /// Number of lookups that fell back to a section scan.
    pub fn fallbacks(&self) -> usize {
        self.funcs.fallbacks() + self.unnamed.fallbacks()
    }

    /// Decode a struct, union or enum record.
    pub fn read_group(&mut self, record: &Element) -> ReadResult<CType> {
        match record.tag.as_str() {
            "enum" => Self::read_enum(record),
            "struct" => {
                let mut st = StructType::new();
                for field in &record.children {
                    let name = field.required_attr("name")?;
                    st.add_field(name.to_string(), self.read_field(field)?);
                }
                Ok(CType::Struct(st))
            }
            "union" => {
                let mut un = UnionType::new();
                for member in &record.children {
                    let name = member.required_attr("name")?;
                    un.add_member(name.to_string(), self.read_field(member)?);
                }
                Ok(CType::Union(un))
            }
            other => Err(ReadError::unknown_token("type kind", other)),
        }
    }

    fn read_enum(record: &Element) -> ReadResult<CType> {
        let mut en = EnumType::new();
        for constant in &record.children {
            let name = constant.required_attr("name")?;
            let val = constant.required_attr("val")?;
            en.add_value(name.to_string(), val.to_string());
        }
        Ok(CType::Enum(en))
    }

    /// Decode one struct field or union member.
    pub fn read_field(&mut self, field: &Element) -> ReadResult<CType> {
        if field.tag == "bit-field" {
            let base = self.read_type(field, false)?;
            let width = field.int_attr("len")?;
            Ok(CType::bit_field(base, width))
        } else {
            self.read_type(field, true)
        }
    }

    /// Decode the `base`, `attr` and (optionally) `wrap` descriptors of a record.
    pub fn read_type(&mut self, record: &Element, has_wrap: bool) -> ReadResult<CType> {
        let mut t = self.read_base(record.required_attr("base")?)?;
        if let Some(attr) = record.attr("attr") {
            t = CType::Attributed(AttributedType::new(t, read_attr(attr)?));
        }
        if has_wrap {
            if let Some(wrap) = record.attr("wrap") {
                t = self.read_wrap(wrap, t)?;
            }
        }
        Ok(t)
    }

    fn read_base(&mut self, base: &str) -> ReadResult<CType> {
        let mut chars = base.chars();
        let sigil = chars
            .next()
            .ok_or_else(|| ReadError::malformed(base, "empty base descriptor"))?;
        let payload = chars.as_str();

        match sigil {
            '.' => Ok(CType::Primitive(PrimitiveKind::lookup(payload)?)),
            '$' if payload.is_empty() => Err(ReadError::malformed(base, "empty type name")),
            '$' => Ok(CType::named(payload)),
            _ => self.read_unnamed(parse_int("base", payload)?),
        }
    }

    fn read_unnamed(&mut self, id: u32) -> ReadResult<CType> {
        let record = self.unnamed.find(id)?;
        self.read_group(record)
    }

    fn read_wrap(&mut self, wrap: &str, mut t: CType) -> ReadResult<CType> {
        let tokens: Vec<&str> = wrap.split_whitespace().collect();
        if tokens.len() > MAX_WRAP_TOKENS {
            return Err(ReadError::malformed(wrap, "wrap chain is too long"));
        }
        let mut i = 0;
        while i < tokens.len() {
            let op = WrapOp::parse(tokens[i]);
            t = match op {
                WrapOp::Pointer => CType::ptr(t),
                WrapOp::Array => {
                    let length = parse_int("wrap", operand(&tokens, i, wrap)?)?;
                    CType::array(t, length)
                }
                WrapOp::Function(conv) => {
                    let id = parse_int("wrap", operand(&tokens, i, wrap)?)?;
                    self.read_func(id, t, conv)?
                }
            };
            i += 1 + op.operands();
        }
        Ok(t)
    }

    fn read_func(&mut self, id: u32, ret: CType, conv: CallConv) -> ReadResult<CType> {
        let record = self.funcs.find(id)?;
        let mut func = FunctionType::new(ret, conv);
        for arg in &record.children {
            func.add_param(self.read_type(arg, true)?);
        }
        Ok(CType::Function(func))
    }
}

fn read_attr(attr: &str) -> ReadResult<BTreeSet<TypeAttr>> {
    attr.split_whitespace().map(TypeAttr::lookup).collect()
}

fn operand<'w>(tokens: &[&'w str], i: usize, wrap: &str) -> ReadResult<&'w str> {
    tokens
        .get(i + 1)
        .copied()
        .ok_or_else(|| ReadError::malformed(wrap, "wrap operator is missing its operand"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(funcs: &str, unnamed: &str, named: &str) -> Document {
        Document::parse(&format!(
            "<types><funcs>{}</funcs><unnamed>{}</unnamed><named>{}</named></types>",
            funcs, unnamed, named
        ))
        .unwrap()
    }

    fn read_all(doc: &Document) -> ReadResult<Vec<(String, CType)>> {
        let mut out = Vec::new();
        TypeReader::new(doc).read_to_storage(&mut out)?;
        Ok(out)
    }

    /// Decode a single struct field with the given attributes.
    fn field(attrs: &str) -> CType {
        let d = doc("", "", &format!(r#"<struct name="S"><field name="f" {}/></struct>"#, attrs));
        let types = read_all(&d).unwrap();
        match &types[0].1 {
            CType::Struct(s) => s.fields[0].field_type.clone(),
            other => panic!("Expected struct, got {:?}", other),
        }
    }

    #[test]
    fn test_base_primitive() {
        assert_eq!(field(r#"base=".INT""#), CType::int());
        assert_eq!(
            field(r#"base=".WCHAR""#),
            CType::prim(PrimitiveKind::WChar)
        );
    }

    #[test]
    fn test_base_named_reference() {
        assert_eq!(field(r#"base="$_LIST_ENTRY""#), CType::named("_LIST_ENTRY"));
    }

    #[test]
    fn test_wrap_pointer() {
        assert_eq!(field(r#"base=".INT" wrap="p""#), CType::ptr(CType::int()));
    }

    #[test]
    fn test_wrap_array() {
        assert_eq!(
            field(r#"base=".CHAR" wrap="a 260""#),
            CType::array(CType::char(), 260)
        );
    }

    #[test]
    fn test_wrap_applies_left_to_right() {
        assert_eq!(
            field(r#"base="$X" wrap="p a 3""#),
            CType::array(CType::ptr(CType::named("X")), 3)
        );
        assert_eq!(
            field(r#"base="$X" wrap="a 3 p""#),
            CType::ptr(CType::array(CType::named("X"), 3))
        );
    }

    #[test]
    fn test_wrap_extra_whitespace() {
        assert_eq!(
            field(r#"base=".INT" wrap="  p   p ""#),
            CType::ptr(CType::ptr(CType::int()))
        );
    }

    #[test]
    fn test_empty_wrap_is_identity() {
        assert_eq!(field(r#"base=".INT" wrap="""#), CType::int());
    }

    #[test]
    fn test_attr_wraps_base_before_wrap_chain() {
        assert_eq!(
            field(r#"base=".CHAR" attr="CONST" wrap="p""#),
            CType::ptr(CType::attributed(CType::char(), [TypeAttr::Const]))
        );
    }

    #[test]
    fn test_attr_set_collapses_duplicates() {
        assert_eq!(
            field(r#"base=".INT" attr="VOLATILE CONST VOLATILE""#),
            CType::attributed(CType::int(), [TypeAttr::Const, TypeAttr::Volatile])
        );
    }

    #[test]
    fn test_function_wrap() {
        let d = doc(
            r#"<func id="0"><arg base=".INT"/><arg base=".CHAR" wrap="p"/></func>"#,
            "",
            r#"<struct name="S"><field name="cb" base=".VOID" wrap="F 0 p"/></struct>"#,
        );
        let types = read_all(&d).unwrap();
        let CType::Struct(s) = &types[0].1 else {
            panic!("Expected struct");
        };

        let mut expected = FunctionType::new(CType::void(), CallConv::Stdcall);
        expected.add_param(CType::int());
        expected.add_param(CType::ptr(CType::char()));
        assert_eq!(s.fields[0].field_type, CType::ptr(CType::Function(expected)));
    }

    #[test]
    fn test_function_default_convention() {
        let d = doc(
            r#"<func id="0"/>"#,
            "",
            r#"<struct name="S"><field name="f" base=".INT" wrap="f 0"/></struct>"#,
        );
        let types = read_all(&d).unwrap();
        let CType::Struct(s) = &types[0].1 else {
            panic!("Expected struct");
        };
        let CType::Function(f) = &s.fields[0].field_type else {
            panic!("Expected function");
        };
        assert_eq!(f.convention, CallConv::Default);
        assert_eq!(*f.return_type, CType::int());
        assert!(f.parameters.is_empty());
    }

    #[test]
    fn test_function_argument_references_another_function() {
        // Arguments are decoded with their own wrap chains, which may pull
        // further function records in order
        let d = doc(
            r#"<func id="0"><arg base=".VOID" wrap="F 1 p"/></func>
               <func id="1"><arg base=".INT"/></func>"#,
            "",
            r#"<struct name="S"><field name="f" base=".INT" wrap="F 0 p"/></struct>"#,
        );
        let mut reader_out = Vec::new();
        let mut reader = TypeReader::new(&d);
        reader.read_to_storage(&mut reader_out).unwrap();
        assert_eq!(reader.fallbacks(), 0);

        let CType::Struct(s) = &reader_out[0].1 else {
            panic!("Expected struct");
        };
        let CType::Pointer(outer) = &s.fields[0].field_type else {
            panic!("Expected pointer");
        };
        let CType::Function(outer) = &**outer else {
            panic!("Expected function");
        };
        let CType::Pointer(inner) = &outer.parameters[0] else {
            panic!("Expected pointer parameter");
        };
        let CType::Function(inner) = &**inner else {
            panic!("Expected function parameter");
        };
        assert_eq!(inner.parameters, [CType::int()]);
    }

    #[test]
    fn test_unnamed_base() {
        let d = doc(
            "",
            r#"<union id="0"><field name="i" base=".INT"/><field name="f" base=".FLOAT"/></union>"#,
            r##"<struct name="S"><field name="u" base="#0" wrap="p"/></struct>"##,
        );
        let types = read_all(&d).unwrap();
        let CType::Struct(s) = &types[0].1 else {
            panic!("Expected struct");
        };

        let mut u = UnionType::new();
        u.add_member("i".to_string(), CType::int());
        u.add_member("f".to_string(), CType::prim(PrimitiveKind::Float));
        assert_eq!(s.fields[0].field_type, CType::ptr(CType::Union(u)));
    }

    #[test]
    fn test_unnamed_out_of_order_uses_fallback() {
        let d = doc(
            "",
            r#"<struct id="1"><field name="b" base=".CHAR"/></struct>
               <struct id="0"><field name="a" base=".INT"/></struct>"#,
            r##"<struct name="S"><field name="x" base="#0"/></struct>"##,
        );
        let mut out = Vec::new();
        let mut reader = TypeReader::new(&d);
        reader.read_to_storage(&mut out).unwrap();
        assert_eq!(reader.fallbacks(), 1);

        let CType::Struct(s) = &out[0].1 else {
            panic!("Expected struct");
        };
        let CType::Struct(inner) = &s.fields[0].field_type else {
            panic!("Expected unnamed struct");
        };
        assert_eq!(inner.fields[0].name, "a");
    }

    #[test]
    fn test_strict_order_rejects_desync() {
        let d = doc(
            "",
            r#"<struct id="1"/><struct id="0"/>"#,
            r##"<struct name="S"><field name="x" base="#0"/></struct>"##,
        );
        let mut out: Vec<(String, CType)> = Vec::new();
        let err = TypeReader::with_config(&d, ReaderConfig::new().strict_order(true))
            .read_to_storage(&mut out)
            .unwrap_err();
        assert!(matches!(err, ReadError::SequenceMismatch { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unnamed_reference_past_end() {
        let d = doc("", "", r##"<struct name="S"><field name="x" base="#0"/></struct>"##);
        let err = read_all(&d).unwrap_err();
        assert!(matches!(err, ReadError::OutOfRange { section: "unnamed", .. }));
    }

    #[test]
    fn test_bit_field() {
        assert_eq!(
            field_with_tag("bit-field", r#"base=".UINT" len="3""#),
            CType::bit_field(CType::uint(), 3)
        );
    }

    #[test]
    fn test_bit_field_ignores_wrap() {
        assert_eq!(
            field_with_tag("bit-field", r#"base=".INT" attr="CONST" len="1" wrap="p a 2""#),
            CType::bit_field(CType::attributed(CType::int(), [TypeAttr::Const]), 1)
        );
    }

    #[test]
    fn test_bit_field_ignores_function_wrap() {
        // The function record must not be consumed
        let d = doc(
            r#"<func id="0"/>"#,
            "",
            r#"<struct name="S">
                 <bit-field name="b" base=".INT" len="2" wrap="F 0"/>
                 <field name="f" base=".INT" wrap="F 0 p"/>
               </struct>"#,
        );
        let mut out = Vec::new();
        let mut reader = TypeReader::new(&d);
        reader.read_to_storage(&mut out).unwrap();
        assert_eq!(reader.fallbacks(), 0);
    }

    #[test]
    fn test_bit_field_missing_len() {
        let d = doc("", "", r#"<struct name="S"><bit-field name="b" base=".INT"/></struct>"#);
        let err = read_all(&d).unwrap_err();
        assert!(matches!(err, ReadError::MissingAttribute { attr: "len", .. }));
    }

    fn field_with_tag(tag: &str, attrs: &str) -> CType {
        let d = doc(
            "",
            "",
            &format!(r#"<struct name="S"><{} name="f" {}/></struct>"#, tag, attrs),
        );
        let types = read_all(&d).unwrap();
        let CType::Struct(s) = &types[0].1 else {
            panic!("Expected struct");
        };
        s.fields[0].field_type.clone()
    }

    #[test]
    fn test_struct_scenario() {
        let d = doc(
            "",
            "",
            r#"<struct name="S">
                 <bit-field name="f0" len="3" base=".INT"/>
                 <field name="f1" base="$T" wrap="p"/>
               </struct>"#,
        );
        let types = read_all(&d).unwrap();

        let mut expected = StructType::new();
        expected.add_field("f0".to_string(), CType::bit_field(CType::int(), 3));
        expected.add_field("f1".to_string(), CType::ptr(CType::named("T")));
        assert_eq!(types, [("S".to_string(), CType::Struct(expected))]);
    }

    #[test]
    fn test_member_order_preserved() {
        let d = doc(
            "",
            "",
            r#"<struct name="S">
                 <field name="zeta" base=".INT"/>
                 <field name="alpha" base=".INT"/>
                 <field name="mid" base=".INT"/>
               </struct>"#,
        );
        let types = read_all(&d).unwrap();
        let CType::Struct(s) = &types[0].1 else {
            panic!("Expected struct");
        };
        let names: Vec<_> = s.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_enum() {
        let d = doc(
            "",
            "",
            r#"<enum name="COLOR">
                 <const name="RED" val="0"/>
                 <const name="BLUE" val="0x10"/>
               </enum>"#,
        );
        let types = read_all(&d).unwrap();
        let CType::Enum(e) = &types[0].1 else {
            panic!("Expected enum");
        };
        assert_eq!(
            e.values,
            [
                ("RED".to_string(), "0".to_string()),
                ("BLUE".to_string(), "0x10".to_string())
            ]
        );
    }

    #[test]
    fn test_named_types_in_document_order() {
        let d = doc(
            "",
            "",
            r#"<struct name="B"/><union name="A"/><enum name="C"/>"#,
        );
        let mut out = Vec::new();
        let count = TypeReader::new(&d).read_to_storage(&mut out).unwrap();
        assert_eq!(count, 3);
        let names: Vec<_> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["B", "A", "C"]);
        assert!(out[1].1 == CType::Union(UnionType::new()));
    }

    #[test]
    fn test_unknown_primitive_aborts_load() {
        let d = doc(
            "",
            "",
            r#"<struct name="OK"><field name="a" base=".INT"/></struct>
               <struct name="BAD"><field name="a" base=".NOTATYPE"/></struct>
               <struct name="NEVER"/>"#,
        );
        let mut out = Vec::new();
        let err = TypeReader::new(&d).read_to_storage(&mut out).unwrap_err();
        assert!(matches!(
            err,
            ReadError::UnknownToken { kind: "primitive type", ref token } if token == "NOTATYPE"
        ));
        // Nothing from the failing entry onwards reaches the storage
        let names: Vec<_> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["OK"]);
    }

    #[test]
    fn test_unknown_attribute() {
        let d = doc("", "", r#"<struct name="S"><field name="a" base=".INT" attr="RESTRICT"/></struct>"#);
        let err = read_all(&d).unwrap_err();
        assert!(matches!(err, ReadError::UnknownToken { kind: "type attribute", .. }));
    }

    #[test]
    fn test_unknown_group_tag() {
        let d = doc("", "", r#"<class name="C"/>"#);
        let err = read_all(&d).unwrap_err();
        assert!(matches!(err, ReadError::UnknownToken { kind: "type kind", .. }));
    }

    #[test]
    fn test_malformed_descriptors() {
        let cases = [
            r#"<struct name="S"><field name="a" base=""/></struct>"#,
            r#"<struct name="S"><field name="a" base="$"/></struct>"#,
            r#"<struct name="S"><field name="a" base=".INT" wrap="a"/></struct>"#,
        ];
        for named in cases {
            let err = read_all(&doc("", "", named)).unwrap_err();
            assert!(
                matches!(err, ReadError::MalformedDescriptor { .. }),
                "{} gave {:?}",
                named,
                err
            );
        }
    }

    #[test]
    fn test_wrap_chain_limit() {
        let at_limit = vec!["p"; MAX_WRAP_TOKENS].join(" ");
        let ty = field(&format!(r#"base=".INT" wrap="{}""#, at_limit));
        assert!(ty.is_pointer());

        let too_long = vec!["p"; 100_000].join(" ");
        let named = format!(
            r#"<struct name="S"><field name="a" base=".INT" wrap="{}"/></struct>"#,
            too_long
        );
        let err = read_all(&doc("", "", &named)).unwrap_err();
        assert!(matches!(
            err,
            ReadError::MalformedDescriptor { reason: "wrap chain is too long", .. }
        ));
    }

    #[test]
    fn test_invalid_numbers() {
        let cases = [
            r##"<struct name="S"><field name="a" base="#x"/></struct>"##,
            r#"<struct name="S"><field name="a" base=".INT" wrap="a many"/></struct>"#,
            r#"<struct name="S"><field name="a" base=".INT" wrap="F one"/></struct>"#,
        ];
        for named in cases {
            let err = read_all(&doc("", "", named)).unwrap_err();
            assert!(
                matches!(err, ReadError::InvalidNumber { .. }),
                "{} gave {:?}",
                named,
                err
            );
        }
    }

    #[test]
    fn test_missing_base() {
        let d = doc("", "", r#"<struct name="S"><field name="a"/></struct>"#);
        let err = read_all(&d).unwrap_err();
        assert!(matches!(err, ReadError::MissingAttribute { attr: "base", .. }));
    }

    #[test]
    fn test_dyn_storage() {
        let d = doc("", "", r#"<enum name="E"/>"#);
        let mut out: Vec<(String, CType)> = Vec::new();
        let storage: &mut dyn TypeStorage = &mut out;
        TypeReader::new(&d).read_to_storage(storage).unwrap();
        assert_eq!(out.len(), 1);
    }
}
