use acc_symbol::{Address, AddressKind};
use acc_types::{CType, Target};

/// Tracks how much storage has been handed out so far within one
/// allocation region — the whole translation unit (static storage) or
/// one function body (automatic storage).
#[derive(Debug, Clone, Copy)]
pub struct Allocator {
    currently_allocated: u32,
    translation_unit: bool,
}

impl Allocator {
    pub fn translation_unit() -> Self {
        Self { currently_allocated: 0, translation_unit: true }
    }

    pub fn function_body() -> Self {
        Self { currently_allocated: 0, translation_unit: false }
    }

    /// Round up to `ty`'s alignment, record that offset, then advance
    /// past `ty`'s size. Returns the address to stamp on the symbol.
    pub fn allocate(&mut self, ty: &CType, target: &Target) -> Address {
        let size = ty.size(target).unwrap_or(0);
        let align = ty.align(target).unwrap_or(1).max(1);

        if self.currently_allocated & (align - 1) != 0 {
            self.currently_allocated = (self.currently_allocated | (align - 1)) + 1;
        }

        let offset = self.currently_allocated;
        self.currently_allocated += size;

        Address {
            kind: if self.translation_unit { AddressKind::Static } else { AddressKind::Automatic },
            offset,
        }
    }

    pub fn frame_size(&self) -> u32 {
        self.currently_allocated
    }
}

#[cfg(test)]
mod tests {
    use acc_types::BasicKind;

    use super::*;

    #[test]
    fn pads_for_alignment() {
        let target = Target::default();
        let mut allocator = Allocator::function_body();
        let char_ty = CType::basic(BasicKind::UnsignedChar);
        let int_ty = CType::basic(BasicKind::SignedInt);

        let char_addr = allocator.allocate(&char_ty, &target);
        let int_addr = allocator.allocate(&int_ty, &target);

        assert_eq!(char_addr.offset, 0);
        assert_eq!(int_addr.offset, 4);
        assert_eq!(allocator.frame_size(), 8);
    }

    #[test]
    fn function_body_allocates_automatic_storage() {
        let target = Target::default();
        let mut allocator = Allocator::function_body();
        let addr = allocator.allocate(&CType::basic(BasicKind::SignedInt), &target);
        assert_eq!(addr.kind, AddressKind::Automatic);
    }

    #[test]
    fn translation_unit_allocates_static_storage() {
        let target = Target::default();
        let mut allocator = Allocator::translation_unit();
        let addr = allocator.allocate(&CType::basic(BasicKind::SignedInt), &target);
        assert_eq!(addr.kind, AddressKind::Static);
    }
}
