//! Rule-name constants for the grammar productions the rest of the pipeline
//! matches against with [`crate::walk_up_to`] / [`crate::walk_down_to`].
//!
//! A tree node's `rule` is a plain string: for an interior node it names the
//! grammar production that produced it, for a leaf it is the literal token
//! text. Keeping the production names as constants here means a typo in a
//! later crate is a compile error instead of a silent "ancestor not found".

pub const ROOT: &str = "sourceFile";
pub const FUNCTION_DECL: &str = "functionDecl";
pub const PARAMETER_DECL: &str = "parameterDecl";
pub const PARAMETER_LIST: &str = "parameterList";
pub const IDENTIFIER_LIST: &str = "identifierList";
pub const IDENTIFIER: &str = "identifier";
pub const VAR_DECL: &str = "varDecl";
pub const SHORT_VAR_DECL: &str = "shortVarDecl";
pub const R_TYPE: &str = "r_type";
pub const TYPE_LIT: &str = "typeLit";
pub const ARRAY_TYPE: &str = "arrayType";
pub const ARRAY_LENGTH: &str = "arrayLength";
pub const CHANNEL_TYPE: &str = "channelType";
pub const MAP_TYPE: &str = "mapType";
pub const BASIC_LIT: &str = "basicLit";
pub const STRING_LIT: &str = "stringLit";
pub const BLOCK: &str = "block";
pub const STATEMENT_LIST: &str = "statementList";
pub const SIMPLE_STMT: &str = "simpleStmt";
pub const ASSIGNMENT: &str = "assignment";
pub const EXPRESSION: &str = "expression";
pub const IF_STMT: &str = "ifStmt";
pub const FOR_STMT: &str = "forStmt";
pub const FOR_CLAUSE: &str = "forClause";
pub const BREAK_STMT: &str = "breakStmt";
pub const CONTINUE_STMT: &str = "continueStmt";
pub const RETURN_STMT: &str = "returnStmt";
pub const INC_DEC_STMT: &str = "incDecStmt";
pub const SEND_STMT: &str = "sendStmt";
pub const GO_STMT: &str = "goStmt";
pub const EXPRESSION_STMT: &str = "expressionStmt";
pub const CALL_EXPR: &str = "callExpr";
pub const RESULT: &str = "result";
/// Placeholder allocated for an omitted `forClause` slot (init/cond/post),
/// so the CFG builder can address all three positionally even when one or
/// two are absent from the source.
pub const EMPTY: &str = "emptyStmt";
