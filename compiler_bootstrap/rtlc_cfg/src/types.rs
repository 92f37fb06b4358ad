//! Control-cell types (§3 "Statement CFG node").

use hashbrown::HashMap;
use rtlc_common::Position;
use rtlc_tree::NodeId;

pub type CellId = u32;

/// The statement-kind tag set enumerated in §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Assignment,
    ShortVarDecl,
    Expression,
    IncDec,
    Send,
    If,
    IfTest,
    IfElse,
    For,
    ForInit,
    ForCond,
    ForPost,
    Block,
    Return,
    Break,
    Continue,
    Empty,
    FinishNode,
    FunctionEntry,
}

/// One control cell. `if`/`for` wrapper cells hold their child refs but carry
/// no predecessors/successors of their own — they never accumulate a
/// predecessor because nothing in the live wiring diagram points at them, so
/// the emitter's "has a predecessor" filter naturally excludes them from the
/// register list.
#[derive(Debug, Clone)]
pub struct ControlCell {
    pub id: CellId,
    pub tree_node: NodeId,
    pub sub_node: Option<NodeId>,
    pub kind: CellKind,
    pub function: String,
    pub pos: Position,
    pub canonical_name: String,

    pub predecessors: Vec<CellId>,
    pub successors: Vec<CellId>,
    pub predecessors_taken: Vec<CellId>,
    pub successors_taken: Vec<CellId>,

    pub if_simple: Option<CellId>,
    pub if_test: Option<CellId>,
    pub if_taken: Option<CellId>,
    pub if_else: Option<CellId>,

    pub for_init: Option<CellId>,
    pub for_cond: Option<CellId>,
    pub for_post: Option<CellId>,
    pub for_block: Option<CellId>,
}

impl ControlCell {
    pub fn has_predecessor(&self) -> bool {
        !self.predecessors.is_empty() || !self.predecessors_taken.is_empty()
    }
}

/// The statement control-flow graph for every function in the compilation
/// unit, plus the reverse write map the emitter's dataflow section consumes.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    pub cells: Vec<ControlCell>,
    pub writes: HashMap<String, Vec<CellId>>,
    pub entries: HashMap<String, CellId>,
}

impl Cfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, id: CellId) -> &ControlCell {
        &self.cells[id as usize]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut ControlCell {
        &mut self.cells[id as usize]
    }

    pub fn for_function<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a ControlCell> + 'a {
        self.cells.iter().filter(move |c| c.function == function)
    }

    pub fn connect(&mut self, from: CellId, to: CellId) {
        if !self.cell(from).successors.contains(&to) {
            self.cell_mut(from).successors.push(to);
        }
        if !self.cell(to).predecessors.contains(&from) {
            self.cell_mut(to).predecessors.push(from);
        }
    }

    pub fn connect_taken(&mut self, from: CellId, to: CellId) {
        if !self.cell(from).successors_taken.contains(&to) {
            self.cell_mut(from).successors_taken.push(to);
        }
        if !self.cell(to).predecessors_taken.contains(&from) {
            self.cell_mut(to).predecessors_taken.push(from);
        }
    }
}
