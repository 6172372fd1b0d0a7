use std::fmt;

/// Every diagnosable condition the analyzer finds. Rendered to a string
/// for `acc_diagnostics::Reporter`; kept structured here so tests can
/// match on the specific failure rather than scraping message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    PreviouslyDeclared { name: String },
    UndeclaredIdentifier { name: String },
    InvalidLvalue,
    InvalidPointerDereference,
    InvalidUnaryOperand { op: &'static str },
    InvalidBinaryOperand { op: &'static str },
    IncompatibleAssignment { right: String, left: String },
    InvalidInitializer { right: String, left: String },
    IncompatibleArgument { arg: String, param: String },
    ArityMismatch { expected: usize, got: usize },
    NotAFunction,
    InvalidTertiaryTypes,
    InvalidSubscriptOperand,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::PreviouslyDeclared { name } => {
                write!(f, "Previously declared identifier '{name}'")
            }
            AnalysisError::UndeclaredIdentifier { name } => {
                write!(f, "Undeclared identifier '{name}'")
            }
            AnalysisError::InvalidLvalue => write!(f, "Invalid lvalue"),
            AnalysisError::InvalidPointerDereference => write!(f, "Invalid Pointer dereference"),
            AnalysisError::InvalidUnaryOperand { op } => {
                write!(f, "Invalid operand to unary operator '{op}'")
            }
            AnalysisError::InvalidBinaryOperand { op } => {
                write!(f, "Invalid operand type to binary operator '{op}'")
            }
            AnalysisError::IncompatibleAssignment { right, left } => {
                write!(f, "Incompatible assignment. Cannot assign type '{right}' to type '{left}'")
            }
            AnalysisError::InvalidInitializer { right, left } => {
                write!(f, "Invalid initializer value. Cannot assign type '{right}' to type '{left}'")
            }
            AnalysisError::IncompatibleArgument { arg, param } => {
                write!(f, "Incompatible argument type. Cannot pass type '{arg}' to type '{param}'")
            }
            AnalysisError::ArityMismatch { expected, got } => {
                write!(f, "Invalid number of arguments to function. Expected {expected}, got {got}")
            }
            AnalysisError::NotAFunction => write!(f, "Not a function"),
            AnalysisError::InvalidTertiaryTypes => write!(f, "Invalid types in tertiary expression"),
            AnalysisError::InvalidSubscriptOperand => write!(f, "Invalid subscript operand"),
        }
    }
}

impl std::error::Error for AnalysisError {}
