use crate::SyntaxKind;

const SIZE: usize = 5;

/// Bitset of syntax kinds, usable in `const` contexts for recovery sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyntaxSet {
    bits: [u64; SIZE],
}

impl SyntaxSet {
    pub const EMPTY: Self = Self { bits: [0; SIZE] };
    const BITS_PER_SLOT: u16 = u64::BITS as u16;

    const fn slot(kind: SyntaxKind) -> (usize, u64) {
        let kind = kind as u16;
        let slot_index = (kind / Self::BITS_PER_SLOT) as usize;
        debug_assert!(slot_index < SIZE, "increase the size of the bitset array");
        (slot_index, 1 << (kind % Self::BITS_PER_SLOT))
    }

    pub const fn new<const N: usize>(kinds: [SyntaxKind; N]) -> Self {
        let mut set = Self::EMPTY;
        let mut i = 0;
        while i < kinds.len() {
            set = set.with(kinds[i]);
            i += 1;
        }
        set
    }

    pub const fn with(mut self, kind: SyntaxKind) -> Self {
        let (slot, mask) = Self::slot(kind);
        self.bits[slot] |= mask;
        self
    }

    pub const fn union(mut self, other: &Self) -> Self {
        let mut i = 0;
        while i < SIZE {
            self.bits[i] |= other.bits[i];
            i += 1;
        }
        self
    }

    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let (slot, mask) = Self::slot(kind);
        self.bits[slot] & mask != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntaxKind::*;

    #[test]
    fn covers_every_kind() {
        let set = SyntaxSet::new([SEMICOLON, TOMBSTONE]);
        assert!(set.contains(SEMICOLON));
        assert!(set.contains(TOMBSTONE));
        assert!(!set.contains(RIGHT_BRACE));
    }

    #[test]
    fn union_merges_members() {
        const ITEMS: SyntaxSet = SyntaxSet::new([FUNCTION_KW, TYPE_KW]);
        const STMTS: SyntaxSet = SyntaxSet::new([IF_KW, RETURN_KW]);
        let both = ITEMS.union(&STMTS);
        assert!(both.contains(FUNCTION_KW));
        assert!(both.contains(RETURN_KW));
        assert!(!ITEMS.contains(IF_KW));
    }
}
