use index_vec::IndexVec;

use crate::function::Function;
use crate::object::{Object, ObjectId};

/// A whole translation unit's worth of lowered IR: global objects plus
/// every function defined in it.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub globals: IndexVec<ObjectId, Object>,
    pub functions: Vec<Function>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_global(&mut self, object: Object) -> ObjectId {
        self.globals.push(object)
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
