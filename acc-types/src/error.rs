use std::fmt;

/// Everything that can go wrong while finalizing a declaration's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    EmptySpecifier,
    MultipleBaseSpecifiers,
    ConflictingSignedness,
    ShortWithChar,
    ShortWithLong,
    VoidWithSignedness,
    VoidWithSize,
    MultipleStorageClasses,
    NonPositiveArraySize,
    FunctionReturningFunction,
    FunctionReturningArray,
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            TypeError::EmptySpecifier => "declaration has no type specifier",
            TypeError::MultipleBaseSpecifiers => "more than one of void, char, int in declaration specifiers",
            TypeError::ConflictingSignedness => "both signed and unsigned specified",
            TypeError::ShortWithChar => "short combined with char",
            TypeError::ShortWithLong => "both short and long specified",
            TypeError::VoidWithSignedness => "void combined with signed or unsigned",
            TypeError::VoidWithSize => "void combined with short or long",
            TypeError::MultipleStorageClasses => "more than one storage class specified",
            TypeError::NonPositiveArraySize => "array size must be positive",
            TypeError::FunctionReturningFunction => "function cannot return a function type",
            TypeError::FunctionReturningArray => "function cannot return an array type",
        };
        write!(f, "{message}")
    }
}

impl std::error::Error for TypeError {}
