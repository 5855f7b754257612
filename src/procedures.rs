//! Procedure and arithmetic-function registries.
//!
//! The validator checks `CALL` clauses against a [`ProcedureRegistry`] and
//! function applications against a [`FunctionRegistry`]. Both are traits so
//! hosts can plug in their own catalogs; in-memory implementations and a
//! builtin function table are provided.

use smol_str::SmolStr;
use std::collections::HashMap;

/// Argument-count contract of a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Fixed(usize),
    /// Any number of arguments; the arity check is skipped.
    Variadic,
}

/// A registered procedure signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    /// The dotted procedure name, e.g. `db.labels`.
    pub name: SmolStr,
    /// Argument-count contract.
    pub arity: Arity,
    /// True when the procedure does not modify the graph.
    pub read_only: bool,
    /// Declared output names, in order.
    pub outputs: Vec<SmolStr>,
}

impl Procedure {
    /// Number of declared outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// The i-th declared output name.
    pub fn output_name(&self, i: usize) -> Option<&SmolStr> {
        self.outputs.get(i)
    }

    /// True when `name` is a declared output.
    pub fn contains_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o == name)
    }
}

/// Lookup of procedure signatures by name.
pub trait ProcedureRegistry: Send + Sync {
    /// Resolves a procedure by its dotted name.
    fn lookup(&self, name: &str) -> Option<&Procedure>;
}

/// A simple in-memory procedure registry.
#[derive(Debug, Default)]
pub struct InMemoryProcedureRegistry {
    procedures: HashMap<SmolStr, Procedure>,
}

impl InMemoryProcedureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry preloaded with the standard `db.*` introspection
    /// procedures.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Procedure {
            name: "db.labels".into(),
            arity: Arity::Fixed(0),
            read_only: true,
            outputs: vec!["label".into()],
        });
        registry.register(Procedure {
            name: "db.relationshipTypes".into(),
            arity: Arity::Fixed(0),
            read_only: true,
            outputs: vec!["relationshipType".into()],
        });
        registry.register(Procedure {
            name: "db.propertyKeys".into(),
            arity: Arity::Fixed(0),
            read_only: true,
            outputs: vec!["propertyKey".into()],
        });
        registry.register(Procedure {
            name: "db.idx.fulltext.queryNodes".into(),
            arity: Arity::Fixed(2),
            read_only: true,
            outputs: vec!["node".into(), "score".into()],
        });
        registry.register(Procedure {
            name: "db.idx.fulltext.createNodeIndex".into(),
            arity: Arity::Variadic,
            read_only: false,
            outputs: vec![],
        });
        registry
    }

    /// Registers a procedure, replacing any previous entry of the same name.
    pub fn register(&mut self, procedure: Procedure) {
        self.procedures.insert(procedure.name.clone(), procedure);
    }
}

impl ProcedureRegistry for InMemoryProcedureRegistry {
    fn lookup(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }
}

/// Lookup of arithmetic functions by (case-insensitive) name.
pub trait FunctionRegistry: Send + Sync {
    /// True when the function exists.
    fn exists(&self, name: &str) -> bool;
    /// True when the function is an aggregation.
    fn is_aggregate(&self, name: &str) -> bool;
}

/// The builtin arithmetic-function table.
#[derive(Debug, Default)]
pub struct BuiltinFunctions;

/// Scalar and list functions.
const FUNCTIONS: &[&str] = &[
    "abs",
    "ceil",
    "coalesce",
    "endnode",
    "exists",
    "floor",
    "head",
    "id",
    "keys",
    "labels",
    "last",
    "left",
    "length",
    "ltrim",
    "nodes",
    "properties",
    "rand",
    "range",
    "relationships",
    "replace",
    "reverse",
    "right",
    "round",
    "rtrim",
    "sign",
    "size",
    "split",
    "sqrt",
    "startnode",
    "substring",
    "timestamp",
    "tolower",
    "tostring",
    "toupper",
    "tointeger",
    "tofloat",
    "tojson",
    "trim",
    "type",
    "e",
    "exp",
    "log",
    "log10",
    "pow",
    "sin",
    "cos",
    "tan",
    "cot",
    "asin",
    "acos",
    "atan",
    "atan2",
    "degrees",
    "radians",
    "pi",
    "haversin",
    "point",
    "distance",
    "shortestpath",
];

/// Aggregations, legal only under WITH/RETURN.
const AGGREGATIONS: &[&str] = &[
    "avg",
    "collect",
    "count",
    "max",
    "min",
    "percentilecont",
    "percentiledisc",
    "stdev",
    "stdevp",
    "sum",
];

impl FunctionRegistry for BuiltinFunctions {
    fn exists(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        FUNCTIONS.contains(&lower.as_str()) || AGGREGATIONS.contains(&lower.as_str())
    }

    fn is_aggregate(&self, name: &str) -> bool {
        AGGREGATIONS.contains(&name.to_ascii_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_functions_case_insensitive() {
        let functions = BuiltinFunctions;
        assert!(functions.exists("toUpper"));
        assert!(functions.exists("COUNT"));
        assert!(functions.is_aggregate("Collect"));
        assert!(!functions.is_aggregate("abs"));
        assert!(!functions.exists("no_such_function"));
    }

    #[test]
    fn procedure_outputs() {
        let registry = InMemoryProcedureRegistry::with_builtins();
        let labels = registry.lookup("db.labels").unwrap();
        assert_eq!(labels.arity, Arity::Fixed(0));
        assert!(labels.read_only);
        assert_eq!(labels.output_count(), 1);
        assert_eq!(labels.output_name(0).unwrap(), "label");
        assert!(labels.contains_output("label"));
        assert!(!labels.contains_output("missing"));
        assert!(registry.lookup("dbms.shutdown").is_none());
    }

    #[test]
    fn register_replaces() {
        let mut registry = InMemoryProcedureRegistry::new();
        registry.register(Procedure {
            name: "custom.proc".into(),
            arity: Arity::Fixed(1),
            read_only: false,
            outputs: vec!["value".into()],
        });
        registry.register(Procedure {
            name: "custom.proc".into(),
            arity: Arity::Variadic,
            read_only: true,
            outputs: vec![],
        });
        assert_eq!(
            registry.lookup("custom.proc").unwrap().arity,
            Arity::Variadic
        );
    }
}
