//! Scratch builders
//!
//! Reusable buffers that are filled with a node's fields and then submitted
//! to a repository for interning, or compared against an already-interned
//! node without interning at all. Each acquisition clears the buffer.

use super::{
    Fluent, GroundAtomData, GroundFunctionTermData, Index, Object, Static,
};

/// Per-worker scratch buffers for the grounding hot path.
#[derive(Debug, Clone, Default)]
pub struct Builders {
    /// The current variable binding, one object per parameter position.
    pub binding: Vec<Index<Object>>,
    static_atom: GroundAtomData<Static>,
    fluent_atom: GroundAtomData<Fluent>,
    static_fterm: GroundFunctionTermData<Static>,
    fluent_fterm: GroundFunctionTermData<Fluent>,
}

impl Builders {
    /// Create empty builders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the static ground-atom buffer, cleared.
    pub fn static_atom(&mut self) -> &mut GroundAtomData<Static> {
        self.static_atom.predicate = None;
        self.static_atom.objects.clear();
        &mut self.static_atom
    }

    /// Acquire the fluent ground-atom buffer, cleared.
    pub fn fluent_atom(&mut self) -> &mut GroundAtomData<Fluent> {
        self.fluent_atom.predicate = None;
        self.fluent_atom.objects.clear();
        &mut self.fluent_atom
    }

    /// Acquire the static ground-function-term buffer, cleared.
    pub fn static_fterm(&mut self) -> &mut GroundFunctionTermData<Static> {
        self.static_fterm.function = None;
        self.static_fterm.objects.clear();
        &mut self.static_fterm
    }

    /// Acquire the fluent ground-function-term buffer, cleared.
    pub fn fluent_fterm(&mut self) -> &mut GroundFunctionTermData<Fluent> {
        self.fluent_fterm.function = None;
        self.fluent_fterm.objects.clear();
        &mut self.fluent_fterm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Index;

    #[test]
    fn test_acquisition_clears() {
        let mut b = Builders::new();
        let buf = b.fluent_atom();
        buf.predicate = Some(Index::new(1));
        buf.objects.push(Index::new(0));

        let buf = b.fluent_atom();
        assert!(buf.predicate.is_none());
        assert!(buf.objects.is_empty());
    }
}
