//! # Variable Store
//!
//! Typed variables available to templates and `variable` queries. The store
//! is seeded from the command line and grows with every capture during a run.

use std::collections::HashMap;

use crate::query::QueryResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    String(String),
    Number(f64),
    Bool(bool),
    /// Captured value with no scalar form (list, node set, JSON object...).
    Opaque(QueryResult),
}

impl Variable {
    /// Converts a capture result into a variable. `None` results are not
    /// stored.
    pub fn from_result(result: QueryResult) -> Option<Self> {
        match result {
            QueryResult::None => None,
            QueryResult::String(s) => Some(Variable::String(s)),
            QueryResult::Number(n) => Some(Variable::Number(n)),
            QueryResult::Boolean(b) => Some(Variable::Bool(b)),
            other => Some(Variable::Opaque(other)),
        }
    }

    /// Query result seen by a `variable` query.
    pub fn to_result(&self) -> QueryResult {
        match self {
            Variable::String(s) => QueryResult::String(s.clone()),
            Variable::Number(n) => QueryResult::Number(*n),
            Variable::Bool(b) => QueryResult::Boolean(*b),
            Variable::Opaque(result) => result.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: HashMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store where every value is a string variable.
    pub fn from_strings<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let variables = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Variable::String(v.into())))
            .collect();
        Self { variables }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, variable: Variable) {
        self.variables.insert(name.into(), variable);
    }

    /// Stores a capture result under `name`. Returns `false` when the result
    /// is `None` and nothing was written.
    pub fn insert_result(&mut self, name: impl Into<String>, result: QueryResult) -> bool {
        match Variable::from_result(result) {
            Some(variable) => {
                self.insert(name, variable);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_store_should_overwrite_on_insert() {
        let mut store = VariableStore::from_strings([("name", "bob")]);
        store.insert("name", Variable::Number(2.0));
        assert_eq!(store.get("name"), Some(&Variable::Number(2.0)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn variable_store_lookup_should_be_case_sensitive() {
        let store = VariableStore::from_strings([("Token", "abc")]);
        assert!(store.get("token").is_none());
        assert!(store.get("Token").is_some());
    }

    #[test]
    fn insert_result_should_skip_none_and_wrap_containers() {
        let mut store = VariableStore::new();
        assert!(!store.insert_result("missing", QueryResult::None));
        assert!(store.get("missing").is_none());

        assert!(store.insert_result("ids", QueryResult::List(vec![QueryResult::Number(1.0)])));
        assert_eq!(
            store.get("ids"),
            Some(&Variable::Opaque(QueryResult::List(vec![QueryResult::Number(1.0)])))
        );

        assert!(store.insert_result("ok", QueryResult::Boolean(true)));
        assert_eq!(store.get("ok").map(Variable::to_result), Some(QueryResult::Boolean(true)));
    }
}
