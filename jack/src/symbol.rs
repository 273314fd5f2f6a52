//! Two level symbol table.
use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::vm::Segment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmolStr,
    /// Declared type, either a primitive or a class name.
    pub ty: SmolStr,
    pub kind: SymbolKind,
    /// Position among the symbols of the same kind in the same scope.
    pub index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Class variable shared by all instances.
    Static,
    /// Instance variable.
    Field,
    /// Subroutine argument.
    Arg,
    /// Subroutine local variable.
    Var,
}

impl SymbolKind {
    const COUNT: usize = 4;

    /// VM segment the symbol is stored in.
    #[rustfmt::skip]
    pub fn segment(&self) -> Segment {
        match self {
            SymbolKind::Static => Segment::Static,
            SymbolKind::Field  => Segment::This,
            SymbolKind::Arg    => Segment::Argument,
            SymbolKind::Var    => Segment::Local,
        }
    }

    /// Statics and fields live as long as the class.
    #[inline]
    pub fn is_class_scoped(&self) -> bool {
        matches!(self, SymbolKind::Static | SymbolKind::Field)
    }

    #[inline]
    fn slot(&self) -> usize {
        *self as usize
    }
}

/// What to do when a name is declared twice in the same scope.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Redefinition {
    /// Fail with a duplicate symbol error.
    #[default]
    Reject,
    /// Replace the earlier entry. The replacement takes a fresh index.
    Shadow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineError {
    Duplicate(SmolStr),
    /// Indices of this kind are exhausted.
    Overflow(SmolStr),
}

/// Mapping of names to symbols.
#[derive(Debug, Default)]
pub struct Scope {
    symbols: BTreeMap<SmolStr, Symbol>,
}

impl Scope {
    #[inline]
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    #[inline]
    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    #[inline]
    pub fn contains_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}

/// Symbol table for one class.
///
/// Holds the class scope, which lives as long as the class being
/// compiled, and the scope of the subroutine currently being compiled.
/// Lookups search the subroutine scope first, so arguments and locals
/// shadow fields and statics.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class: Scope,
    subroutine: Scope,
    /// Next index of each symbol kind.
    counts: [u16; SymbolKind::COUNT],
    redefinition: Redefinition,
}

impl SymbolTable {
    pub fn new(redefinition: Redefinition) -> Self {
        Self {
            redefinition,
            ..Default::default()
        }
    }

    /// Discard the previous subroutine's scope, resetting the
    /// argument and local variable counters.
    pub fn start_subroutine(&mut self) {
        self.subroutine = Scope::default();
        self.counts[SymbolKind::Arg.slot()] = 0;
        self.counts[SymbolKind::Var.slot()] = 0;
    }

    /// Declare a new symbol, assigning it the next index for its kind.
    ///
    /// Statics and fields are added to the class scope, arguments
    /// and locals to the subroutine scope.
    pub fn define(
        &mut self,
        name: impl Into<SmolStr>,
        ty: impl Into<SmolStr>,
        kind: SymbolKind,
    ) -> Result<&Symbol, DefineError> {
        let name = name.into();

        let scope = if kind.is_class_scoped() {
            &mut self.class
        } else {
            &mut self.subroutine
        };

        if self.redefinition == Redefinition::Reject && scope.contains_symbol(&name) {
            return Err(DefineError::Duplicate(name));
        }

        let index = self.counts[kind.slot()];
        self.counts[kind.slot()] = match index.checked_add(1) {
            Some(next) => next,
            None => return Err(DefineError::Overflow(name)),
        };

        scope.add_symbol(Symbol {
            name: name.clone(),
            ty: ty.into(),
            kind,
            index,
        });

        Ok(scope
            .get_symbol(&name)
            .unwrap_or_else(|| unreachable!("symbol was just inserted")))
    }

    /// Lookup the given symbol name according to the scope rules.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.subroutine
            .get_symbol(name)
            .or_else(|| self.class.get_symbol(name))
    }

    #[inline]
    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        self.lookup(name).map(|symbol| symbol.kind)
    }

    #[inline]
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|symbol| symbol.ty.as_str())
    }

    #[inline]
    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|symbol| symbol.index)
    }

    /// Number of symbols of the given kind defined so far.
    #[inline]
    pub fn var_count(&self, kind: SymbolKind) -> u16 {
        self.counts[kind.slot()]
    }
}
