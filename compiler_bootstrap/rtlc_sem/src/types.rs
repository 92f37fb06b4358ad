//! Variable and function binding types (§3).

use hashbrown::HashMap;
use rtlc_tree::NodeId;

pub type VarId = u32;
pub type FuncId = u32;

/// Which grammar production introduced a variable binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    VarDecl,
    ParameterDecl,
    ShortVarDecl,
    /// Synthesized by the function-table pass, one per declared return slot.
    Result,
}

/// The shape a binding's storage takes in hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    Numeric,
    Array { dims: Vec<u32> },
    Channel { depth: i64 },
    Map,
}

impl Aggregate {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Aggregate::Numeric)
    }
}

/// `(name, bit_width)`, e.g. `("uint", 32)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveType {
    pub name: String,
    pub bit_width: u32,
}

/// A named storage location in the emitted hardware (§3 "Variable binding").
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VarId,
    pub decl_node: NodeId,
    pub decl_kind: DeclKind,
    pub function: String,
    pub source_name: String,
    pub canonical_name: String,
    pub primitive: PrimitiveType,
    pub aggregate: Aggregate,
    pub is_parameter: bool,
    pub is_result: bool,
}

impl Variable {
    pub fn bit_width(&self) -> u32 {
        self.primitive.bit_width
    }
}

/// Ordered collection of variable bindings, keyed by `(function, source_name)`.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    pub variables: Vec<Variable>,
    by_key: HashMap<(String, String), VarId>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: Variable) -> VarId {
        let id = variable.id;
        let key = (variable.function.clone(), variable.source_name.clone());
        self.by_key.insert(key, id);
        self.variables.push(variable);
        id
    }

    pub fn next_id(&self) -> VarId {
        self.variables.len() as VarId
    }

    pub fn get(&self, id: VarId) -> &Variable {
        &self.variables[id as usize]
    }

    pub fn lookup(&self, function: &str, source_name: &str) -> Option<&Variable> {
        self.by_key
            .get(&(function.to_string(), source_name.to_string()))
            .map(|&id| self.get(id))
    }

    pub fn for_function<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a Variable> + 'a {
        self.variables.iter().filter(move |v| v.function == function)
    }
}

/// A declared function (§3 "Function").
#[derive(Debug, Clone)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    pub decl_node: NodeId,
    pub parameters: Vec<VarId>,
    pub results: Vec<VarId>,
}

pub const ENTRY_FUNCTION: &str = "main";

/// Ordered collection of functions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    pub functions: Vec<Function>,
    by_name: HashMap<String, FuncId>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, function: Function) -> FuncId {
        let id = function.id;
        self.by_name.insert(function.name.clone(), id);
        self.functions.push(function);
        id
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, id: FuncId) -> &Function {
        &self.functions[id as usize]
    }

    pub fn by_name(&self, name: &str) -> Option<&Function> {
        self.by_name.get(name).map(|&id| self.get(id))
    }

    pub fn entry_point(&self) -> Option<&Function> {
        self.by_name(ENTRY_FUNCTION)
    }
}
