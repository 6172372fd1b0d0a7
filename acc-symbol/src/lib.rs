//! Lexical scopes and name resolution.
//!
//! A [`SymbolTable`] is an arena of [`Scope`]s linked by parent pointers,
//! mirroring the source compiler's per-scope linked symbol lists, but
//! addressed through [`ScopeId`]/[`SymbolId`] indices instead of raw
//! pointers so the analyzer can hold onto a symbol across AST mutation
//! without fighting the borrow checker.

use std::rc::Rc;

use acc_types::CType;
use index_vec::{index_vec, IndexVec};

index_vec::define_index_type! {
    pub struct ScopeId = u32;
}

index_vec::define_index_type! {
    pub struct SymbolId = u32;
}

/// Where a symbol's storage lives, and at what offset within that
/// storage class — filled in by the analyzer's address allocation, not
/// by the table itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Static,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub kind: AddressKind,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Rc<CType>,
    pub address: Option<Address>,
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: Vec<SymbolId>,
}

/// An arena of scopes. `put` always inserts into a given scope; lookups
/// search outward through parent links only when asked to.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: IndexVec<ScopeId, Scope>,
    symbols: IndexVec<SymbolId, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self { scopes: index_vec![], symbols: index_vec![] };
        table.scopes.push(Scope::default());
        table
    }

    /// The table's outermost scope, created with the table itself.
    pub fn root(&self) -> ScopeId {
        ScopeId::new(0)
    }

    /// Open a new scope whose lookups fall back to `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope { parent: Some(parent), symbols: Vec::new() })
    }

    /// Define a new entry in `scope`. Callers are responsible for
    /// rejecting duplicate names within the same scope before calling
    /// this; the table itself does not check, matching the source
    /// compiler's division of labor (the analyzer diagnoses the
    /// duplicate, the table just stores).
    pub fn put(&mut self, scope: ScopeId, name: impl Into<String>, ty: Rc<CType>) -> SymbolId {
        let id = self.symbols.push(Symbol { name: name.into(), ty, address: None });
        self.scopes[scope].symbols.push(id);
        id
    }

    /// Look up `name` in `scope`, and in its ancestors when
    /// `search_parent` is set.
    pub fn get(&self, scope: ScopeId, name: &str, search_parent: bool) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let found = self.scopes[id]
                .symbols
                .iter()
                .rev()
                .find(|&&sym| self.symbols[sym].name == name);
            if let Some(&sym) = found {
                return Some(sym);
            }
            if !search_parent {
                return None;
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Whether `name` is already bound directly in `scope` (not an
    /// ancestor). This is the check the analyzer runs before `put` to
    /// diagnose redeclaration.
    pub fn is_declared_locally(&self, scope: ScopeId, name: &str) -> bool {
        self.get(scope, name, false).is_some()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn set_address(&mut self, id: SymbolId, address: Address) {
        self.symbols[id].address = Some(address);
    }
}

#[cfg(test)]
mod tests {
    use acc_types::BasicKind;

    use super::*;

    fn int_ty() -> Rc<CType> {
        Rc::new(CType::basic(BasicKind::SignedInt))
    }

    #[test]
    fn finds_symbol_in_own_scope() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let sym = table.put(root, "x", int_ty());
        assert_eq!(table.get(root, "x", false), Some(sym));
    }

    #[test]
    fn child_scope_falls_back_to_parent_when_asked() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let sym = table.put(root, "x", int_ty());
        let child = table.push_scope(root);

        assert_eq!(table.get(child, "x", true), Some(sym));
        assert_eq!(table.get(child, "x", false), None);
    }

    #[test]
    fn missing_name_returns_none() {
        let table = SymbolTable::new();
        let root = table.root();
        assert_eq!(table.get(root, "nope", true), None);
    }

    #[test]
    fn shadowing_in_child_scope_hides_parent_entry() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", int_ty());
        let child = table.push_scope(root);
        let inner = table.put(child, "x", int_ty());

        assert_eq!(table.get(child, "x", true), Some(inner));
    }

    #[test]
    fn is_declared_locally_ignores_ancestors() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", int_ty());
        let child = table.push_scope(root);

        assert!(!table.is_declared_locally(child, "x"));
        assert!(table.is_declared_locally(root, "x"));
    }

    #[test]
    fn address_starts_unset_until_allocated() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let sym = table.put(root, "x", int_ty());
        assert!(table.symbol(sym).address.is_none());

        table.set_address(sym, Address { kind: AddressKind::Static, offset: 4 });
        assert_eq!(table.symbol(sym).address, Some(Address { kind: AddressKind::Static, offset: 4 }));
    }
}
