//! Name → constructor registry for aggregate functions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::function::{
    create_avg, create_count, create_identity, create_max, create_min, create_sum, AggFunction,
    FuncArgs,
};
use crate::traits::OpError;

pub type FuncCreator = fn(&FuncArgs) -> Result<Box<dyn AggFunction>, OpError>;

/// One requested aggregate, e.g. `{"func": "SUM", "inputs": ["a"], "outputs": ["sum_a"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggFuncDesc {
    #[serde(alias = "name", alias = "funcName")]
    pub func: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

impl AggFuncDesc {
    pub fn new(func: &str, inputs: &[&str], output: &str) -> Self {
        Self {
            func: func.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: vec![output.to_string()],
            filter: None,
        }
    }

    pub fn with_filter(mut self, column: &str) -> Self {
        self.filter = Some(column.to_string());
        self
    }
}

#[derive(Clone)]
pub struct AggFuncRegistry {
    creators: HashMap<String, FuncCreator>,
}

impl Default for AggFuncRegistry {
    fn default() -> Self {
        let mut r = Self {
            creators: HashMap::new(),
        };
        r.register("SUM", create_sum);
        r.register("COUNT", create_count);
        r.register("MIN", create_min);
        r.register("MAX", create_max);
        r.register("AVG", create_avg);
        r.register("IDENTITY", create_identity);
        r
    }
}

impl AggFuncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a function. Names are case-insensitive.
    pub fn register(&mut self, name: &str, creator: FuncCreator) {
        self.creators.insert(name.to_ascii_uppercase(), creator);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(&name.to_ascii_uppercase())
    }

    pub fn create(&self, name: &str, args: &FuncArgs) -> Result<Box<dyn AggFunction>, OpError> {
        let creator = self
            .creators
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| OpError::Config(format!("unknown aggregate function '{name}'")))?;
        creator(args)
    }
}
