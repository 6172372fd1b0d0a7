//! The C11 subset type algebra.
//!
//! A [`CType`] is a shape (basic, pointer, array, or function) plus the
//! qualifiers and storage class attached to the declaration it types.
//! Basic types are built up from raw specifier bits via [`SpecifierSet`],
//! mirroring the way the source grammar accumulates `int`, `unsigned`,
//! `long`, ... tokens before the declarator is known.

mod error;
mod target;

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

pub use error::TypeError;
pub use target::Target;

bitflags! {
    /// Raw specifier tokens, accumulated before a declaration's base type
    /// is finalized. Not every combination of these bits is a valid type;
    /// [`SpecifierSet::finalize`] is the only way to get a [`BasicKind`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Specifier: u16 {
        const VOID     = 1 << 0;
        const CHAR     = 1 << 1;
        const SHORT    = 1 << 2;
        const INT      = 1 << 3;
        const LONG     = 1 << 4;
        const SIGNED   = 1 << 5;
        const UNSIGNED = 1 << 6;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Qualifiers: u8 {
        const CONST    = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StorageClass: u8 {
        const EXTERN   = 1 << 0;
        const STATIC   = 1 << 1;
        const AUTO     = 1 << 2;
        const REGISTER = 1 << 3;
    }
}

fn has_multiple_bits(bits: u16) -> bool {
    bits & bits.wrapping_sub(1) != 0
}

/// The nine basic types this subset admits, plus `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Void,
    SignedChar,
    UnsignedChar,
    SignedShortInt,
    UnsignedShortInt,
    SignedInt,
    UnsignedInt,
    SignedLongInt,
    UnsignedLongInt,
}

impl BasicKind {
    /// The integer conversion rank, or `None` for `void`, which
    /// participates in no arithmetic conversion.
    pub fn rank(self) -> Option<u8> {
        use BasicKind::*;
        match self {
            Void => None,
            SignedChar => Some(1),
            UnsignedChar => Some(2),
            SignedShortInt => Some(3),
            UnsignedShortInt => Some(4),
            SignedInt => Some(5),
            UnsignedInt => Some(6),
            SignedLongInt => Some(7),
            UnsignedLongInt => Some(8),
        }
    }

    pub fn is_signed(self) -> bool {
        use BasicKind::*;
        matches!(self, SignedChar | SignedShortInt | SignedInt | SignedLongInt)
    }

    pub fn is_unsigned(self) -> bool {
        use BasicKind::*;
        matches!(self, UnsignedChar | UnsignedShortInt | UnsignedInt | UnsignedLongInt)
    }

    pub fn is_long(self) -> bool {
        matches!(self, BasicKind::SignedLongInt | BasicKind::UnsignedLongInt)
    }

    fn size(self, target: &Target) -> u32 {
        use BasicKind::*;
        match self {
            Void => 0,
            SignedChar | UnsignedChar => 1,
            SignedShortInt | UnsignedShortInt => 2,
            SignedInt | UnsignedInt => 4,
            SignedLongInt | UnsignedLongInt => target.long_size,
        }
    }

    fn name(self) -> &'static str {
        use BasicKind::*;
        match self {
            Void => "void",
            SignedChar => "signed char",
            UnsignedChar => "unsigned char",
            SignedShortInt => "short",
            UnsignedShortInt => "unsigned short",
            SignedInt => "int",
            UnsignedInt => "unsigned int",
            SignedLongInt => "long",
            UnsignedLongInt => "unsigned long",
        }
    }
}

/// Accumulates raw [`Specifier`] tokens as a declaration is parsed, then
/// validates and collapses them into a single [`BasicKind`].
///
/// The validation order follows the source grammar's own checks: reject
/// an empty specifier set, reject conflicting base keywords
/// (`void`/`char`/`int`), reject conflicting signedness, reject `short`
/// combined with `char`, then apply defaulting (`int` defaults to
/// `signed`, `char` defaults to `unsigned`) before a final exhaustive
/// match rejects any remaining combination that isn't one of the nine
/// valid basic types (e.g. `short long`, `void long`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecifierSet(Specifier);

impl SpecifierSet {
    pub fn new() -> Self {
        Self(Specifier::empty())
    }

    pub fn add(&mut self, specifier: Specifier) {
        self.0 |= specifier;
    }

    pub fn finalize(self) -> Result<BasicKind, TypeError> {
        let raw = self.0;
        if raw.is_empty() {
            return Err(TypeError::EmptySpecifier);
        }

        let bases = raw & (Specifier::VOID | Specifier::CHAR | Specifier::INT);
        if has_multiple_bits(bases.bits()) {
            return Err(TypeError::MultipleBaseSpecifiers);
        }
        let signedness = raw & (Specifier::SIGNED | Specifier::UNSIGNED);
        if has_multiple_bits(signedness.bits()) {
            return Err(TypeError::ConflictingSignedness);
        }
        if raw.contains(Specifier::SHORT) && raw.contains(Specifier::CHAR) {
            return Err(TypeError::ShortWithChar);
        }
        if raw.contains(Specifier::SHORT) && raw.contains(Specifier::LONG) {
            return Err(TypeError::ShortWithLong);
        }

        let mut bits = raw;
        if bases.is_empty() {
            bits |= Specifier::INT;
        }

        if bits.contains(Specifier::VOID) {
            if !signedness.is_empty() {
                return Err(TypeError::VoidWithSignedness);
            }
            if bits.contains(Specifier::SHORT) || bits.contains(Specifier::LONG) {
                return Err(TypeError::VoidWithSize);
            }
            return Ok(BasicKind::Void);
        }

        if bits.contains(Specifier::CHAR) {
            if signedness.is_empty() {
                bits |= Specifier::UNSIGNED;
            }
            return Ok(if bits.contains(Specifier::UNSIGNED) {
                BasicKind::UnsignedChar
            } else {
                BasicKind::SignedChar
            });
        }

        if signedness.is_empty() {
            bits |= Specifier::SIGNED;
        }
        let signed = bits.contains(Specifier::SIGNED);
        Ok(match (bits.contains(Specifier::SHORT), bits.contains(Specifier::LONG), signed) {
            (true, false, true) => BasicKind::SignedShortInt,
            (true, false, false) => BasicKind::UnsignedShortInt,
            (false, true, true) => BasicKind::SignedLongInt,
            (false, true, false) => BasicKind::UnsignedLongInt,
            (false, false, true) => BasicKind::SignedInt,
            (false, false, false) => BasicKind::UnsignedInt,
            (true, true, _) => unreachable!("short+long rejected above"),
        })
    }
}

/// A named, typed function parameter. Equality between function types
/// compares parameter types only, not names, matching the source
/// compiler's own type-compatibility check.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub ty: Rc<CType>,
}

impl Param {
    pub fn new(name: Option<String>, ty: Rc<CType>) -> Self {
        Self { name, ty }
    }
}

#[derive(Debug, Clone)]
pub enum Shape {
    Basic(BasicKind),
    Pointer(Rc<CType>),
    Array(Rc<CType>, u32),
    Function(Rc<CType>, Vec<Param>),
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Shape::Basic(a), Shape::Basic(b)) => a == b,
            (Shape::Pointer(a), Shape::Pointer(b)) => a == b,
            (Shape::Array(a, na), Shape::Array(b, nb)) => na == nb && a == b,
            (Shape::Function(ra, pa), Shape::Function(rb, pb)) => {
                ra == rb
                    && pa.len() == pb.len()
                    && pa.iter().zip(pb.iter()).all(|(l, r)| l.ty == r.ty)
            }
            _ => false,
        }
    }
}

impl Eq for Shape {}

/// A fully resolved C type: a shape, plus the qualifiers and storage
/// class of the declaration it belongs to.
///
/// Two `CType`s are equal iff their shapes are structurally identical;
/// qualifiers and storage class are declaration metadata, not part of
/// the type's identity for compatibility purposes.
#[derive(Debug, Clone)]
pub struct CType {
    pub shape: Shape,
    pub qualifiers: Qualifiers,
    pub storage: StorageClass,
}

impl PartialEq for CType {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
    }
}

impl Eq for CType {}

impl CType {
    pub fn basic(kind: BasicKind) -> Self {
        Self { shape: Shape::Basic(kind), qualifiers: Qualifiers::empty(), storage: StorageClass::empty() }
    }

    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn with_storage(mut self, storage: StorageClass) -> Result<Self, TypeError> {
        if has_multiple_bits(storage.bits() as u16) {
            return Err(TypeError::MultipleStorageClasses);
        }
        self.storage = storage;
        Ok(self)
    }

    pub fn pointer_to(child: Rc<CType>) -> Self {
        Self { shape: Shape::Pointer(child), qualifiers: Qualifiers::empty(), storage: StorageClass::empty() }
    }

    pub fn array_of(child: Rc<CType>, length: u32) -> Result<Self, TypeError> {
        if length == 0 {
            return Err(TypeError::NonPositiveArraySize);
        }
        Ok(Self { shape: Shape::Array(child, length), qualifiers: Qualifiers::empty(), storage: StorageClass::empty() })
    }

    pub fn function_of(ret: Rc<CType>, params: Vec<Param>) -> Result<Self, TypeError> {
        match &ret.shape {
            Shape::Function(..) => Err(TypeError::FunctionReturningFunction),
            Shape::Array(..) => Err(TypeError::FunctionReturningArray),
            _ => Ok(Self { shape: Shape::Function(ret, params), qualifiers: Qualifiers::empty(), storage: StorageClass::empty() }),
        }
    }

    pub fn is_basic(&self) -> bool {
        matches!(self.shape, Shape::Basic(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.shape, Shape::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.shape, Shape::Array(..))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.shape, Shape::Function(..))
    }

    /// Basic types other than `void` participate in arithmetic.
    pub fn is_arithmetic(&self) -> bool {
        matches!(self.shape, Shape::Basic(k) if k != BasicKind::Void)
    }

    /// Arithmetic types and pointers are the C11 subset's scalar types.
    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn basic_kind(&self) -> Option<BasicKind> {
        match self.shape {
            Shape::Basic(k) => Some(k),
            _ => None,
        }
    }

    pub fn rank(&self) -> Option<u8> {
        self.basic_kind().and_then(BasicKind::rank)
    }

    /// Two pointer chains are compatible if, after stripping however many
    /// levels of indirection both share, what remains on each side is
    /// some basic type. The source compiler does not require the
    /// pointees to be the same basic type, only that both be scalar
    /// basic types; this reproduces that loose rule rather than
    /// tightening it.
    pub fn pointers_compatible(a: &CType, b: &CType) -> bool {
        let mut a = a;
        let mut b = b;
        while let (Shape::Pointer(ca), Shape::Pointer(cb)) = (&a.shape, &b.shape) {
            a = ca;
            b = cb;
        }
        a.is_basic() && b.is_basic()
    }

    pub fn size(&self, target: &Target) -> Option<u32> {
        match &self.shape {
            Shape::Basic(k) => Some(k.size(target)),
            Shape::Pointer(_) => Some(target.pointer_size),
            Shape::Array(child, len) => child.size(target).map(|elem| elem * len),
            Shape::Function(..) => None,
        }
    }

    pub fn align(&self, target: &Target) -> Option<u32> {
        match &self.shape {
            Shape::Basic(k) => Some(k.size(target).max(1)),
            Shape::Pointer(_) => Some(target.pointer_size),
            Shape::Array(child, _) => child.align(target),
            Shape::Function(..) => None,
        }
    }

    /// A human-readable rendering of the type, used in diagnostics
    /// (`"pointer to signed int"`, `"array of 4 unsigned char"`).
    pub fn describe(&self) -> String {
        match &self.shape {
            Shape::Basic(k) => k.name().to_string(),
            Shape::Pointer(child) => format!("pointer to {}", child.describe()),
            Shape::Array(child, len) => format!("array of {len} {}", child.describe()),
            Shape::Function(ret, params) => {
                let params = params.iter().map(|p| p.ty.describe()).collect::<Vec<_>>().join(", ");
                format!("function({params}) returning {}", ret.describe())
            }
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalize(specs: &[Specifier]) -> Result<BasicKind, TypeError> {
        let mut set = SpecifierSet::new();
        for s in specs {
            set.add(*s);
        }
        set.finalize()
    }

    #[test]
    fn bare_int_defaults_to_signed() {
        assert_eq!(finalize(&[Specifier::INT]), Ok(BasicKind::SignedInt));
        assert_eq!(finalize(&[]).map(|_| ()), Err(TypeError::EmptySpecifier));
    }

    #[test]
    fn bare_char_defaults_to_unsigned() {
        assert_eq!(finalize(&[Specifier::CHAR]), Ok(BasicKind::UnsignedChar));
        assert_eq!(finalize(&[Specifier::CHAR, Specifier::SIGNED]), Ok(BasicKind::SignedChar));
    }

    #[test]
    fn all_nine_valid_combinations() {
        assert_eq!(finalize(&[Specifier::VOID]), Ok(BasicKind::Void));
        assert_eq!(finalize(&[Specifier::CHAR, Specifier::SIGNED]), Ok(BasicKind::SignedChar));
        assert_eq!(finalize(&[Specifier::CHAR, Specifier::UNSIGNED]), Ok(BasicKind::UnsignedChar));
        assert_eq!(finalize(&[Specifier::SHORT, Specifier::SIGNED]), Ok(BasicKind::SignedShortInt));
        assert_eq!(finalize(&[Specifier::SHORT, Specifier::UNSIGNED]), Ok(BasicKind::UnsignedShortInt));
        assert_eq!(finalize(&[Specifier::INT, Specifier::SIGNED]), Ok(BasicKind::SignedInt));
        assert_eq!(finalize(&[Specifier::INT, Specifier::UNSIGNED]), Ok(BasicKind::UnsignedInt));
        assert_eq!(finalize(&[Specifier::LONG, Specifier::SIGNED]), Ok(BasicKind::SignedLongInt));
        assert_eq!(finalize(&[Specifier::LONG, Specifier::UNSIGNED]), Ok(BasicKind::UnsignedLongInt));
    }

    #[test]
    fn rejects_conflicting_combinations() {
        assert_eq!(finalize(&[Specifier::VOID, Specifier::INT]), Err(TypeError::MultipleBaseSpecifiers));
        assert_eq!(finalize(&[Specifier::SIGNED, Specifier::UNSIGNED, Specifier::INT]), Err(TypeError::ConflictingSignedness));
        assert_eq!(finalize(&[Specifier::SHORT, Specifier::CHAR]), Err(TypeError::ShortWithChar));
        assert_eq!(finalize(&[Specifier::SHORT, Specifier::LONG]), Err(TypeError::ShortWithLong));
        assert_eq!(finalize(&[Specifier::VOID, Specifier::SIGNED]), Err(TypeError::VoidWithSignedness));
        assert_eq!(finalize(&[Specifier::VOID, Specifier::LONG]), Err(TypeError::VoidWithSize));
    }

    #[test]
    fn rank_orders_long_above_int() {
        let int = BasicKind::SignedInt.rank().unwrap();
        let long = BasicKind::SignedLongInt.rank().unwrap();
        let uint = BasicKind::UnsignedInt.rank().unwrap();
        assert!(long > int);
        assert!(long > uint);
        assert!(BasicKind::Void.rank().is_none());
    }

    #[test]
    fn pointer_chains_of_equal_depth_are_compatible() {
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let char_ty = Rc::new(CType::basic(BasicKind::UnsignedChar));
        let pp_int = CType::pointer_to(Rc::new(CType::pointer_to(int_ty)));
        let pp_char = CType::pointer_to(Rc::new(CType::pointer_to(char_ty)));
        assert!(CType::pointers_compatible(&pp_int, &pp_char));
    }

    #[test]
    fn pointer_chains_of_unequal_depth_are_not_compatible() {
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let p_int = CType::pointer_to(int_ty.clone());
        let pp_int = CType::pointer_to(Rc::new(CType::pointer_to(int_ty)));
        assert!(!CType::pointers_compatible(&p_int, &pp_int));
    }

    #[test]
    fn array_of_zero_length_is_rejected() {
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        assert_eq!(CType::array_of(int_ty, 0).unwrap_err(), TypeError::NonPositiveArraySize);
    }

    #[test]
    fn function_cannot_return_function_or_array() {
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let fn_ty = Rc::new(CType::function_of(int_ty.clone(), vec![]).unwrap());
        assert_eq!(CType::function_of(fn_ty, vec![]).unwrap_err(), TypeError::FunctionReturningFunction);

        let arr_ty = Rc::new(CType::array_of(int_ty, 4).unwrap());
        assert!(matches!(
            CType::function_of(arr_ty, vec![]).unwrap_err(),
            TypeError::FunctionReturningArray
        ));
    }

    #[test]
    fn function_equality_ignores_parameter_names() {
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let a = CType::function_of(
            int_ty.clone(),
            vec![Param::new(Some("x".into()), int_ty.clone())],
        )
        .unwrap();
        let b = CType::function_of(
            int_ty.clone(),
            vec![Param::new(Some("y".into()), int_ty.clone())],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn describe_renders_derived_types() {
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let ptr = CType::pointer_to(int_ty);
        assert_eq!(ptr.describe(), "pointer to int");
    }

    #[test]
    fn size_of_array_multiplies_element_size() {
        let target = Target::default();
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let arr = CType::array_of(int_ty, 4).unwrap();
        assert_eq!(arr.size(&target), Some(16));
    }

    #[test]
    fn qualifiers_and_storage_do_not_affect_equality() {
        let a = CType::basic(BasicKind::SignedInt).with_qualifiers(Qualifiers::CONST);
        let b = CType::basic(BasicKind::SignedInt).with_storage(StorageClass::STATIC).unwrap();
        assert_eq!(a, b);
    }
}
