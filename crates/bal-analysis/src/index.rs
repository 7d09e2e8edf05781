//! Position and name lookups over a unit's bindings.

use bal_yellow::{TextRange, TextSize};
use rustc_hash::FxHashMap;

use crate::Name;
use crate::binder::Bindings;
use crate::scope::{SymbolId, Target};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolIndex {
    /// Declaring names and resolved references, ordered by start offset.
    occurrences: Vec<(TextRange, SymbolId)>,
    by_name: FxHashMap<Name, Vec<SymbolId>>,
    references: FxHashMap<SymbolId, Vec<TextRange>>,
}

impl SymbolIndex {
    pub fn new(bindings: &Bindings) -> Self {
        let mut index = Self::default();

        for (symbol, data) in bindings.symbols() {
            index.by_name.entry(data.name.clone()).or_default().push(symbol);
        }
        index.occurrences.extend(bindings.definitions());

        for (_, resolution) in bindings.resolutions() {
            let Target::Symbol(symbol) = resolution.target else { continue };
            index.occurrences.push((resolution.range, symbol));
            index.references.entry(symbol).or_default().push(resolution.range);
        }

        index.occurrences.sort_by_key(|(range, _)| (range.start(), range.end()));
        for ranges in index.references.values_mut() {
            ranges.sort_by_key(|range| range.start());
        }
        index
    }

    /// The symbol declared or referenced by the name touching `offset`.
    pub fn symbol_at(&self, offset: TextSize) -> Option<SymbolId> {
        let after = self.occurrences.partition_point(|(range, _)| range.start() <= offset);
        self.occurrences[..after]
            .iter()
            .rev()
            .find(|(range, _)| range.contains_inclusive(offset))
            .map(|&(_, symbol)| symbol)
    }

    /// Every symbol of the unit with this name, in declaration order.
    pub fn lookup(&self, name: &str) -> &[SymbolId] {
        self.by_name.get(&Name::new(name)).map_or(&[], Vec::as_slice)
    }

    /// The ranges of the references that resolved to `symbol`.
    pub fn references(&self, symbol: SymbolId) -> &[TextRange] {
        self.references.get(&symbol).map_or(&[], Vec::as_slice)
    }
}
