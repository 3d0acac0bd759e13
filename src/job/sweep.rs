// src/job/sweep.rs

//! Parameter sweeps collapsed into a single array job.
//!
//! A sweep is an ordered list of variables, each with a non-empty list of
//! values. Every combination of values is one task of the array job, and the
//! task index is the combination written as a mixed-radix number: the first
//! declared variable is the least significant digit, and each digit's base is
//! the length of that variable's value list.
//!
//! With `a = [X, Y, Z]` and `b = [P, Q]` the task indices run as
//!
//! ```text
//! 1 -> (X, P)   2 -> (Y, P)   3 -> (Z, P)
//! 4 -> (X, Q)   5 -> (Y, Q)   6 -> (Z, Q)
//! ```
//!
//! [`Sweep::decode`] and the bash produced by [`Sweep::preamble`] walk the
//! variables in the same order, so the shell side and the Rust side always
//! agree on which values a task index selects.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::errors::{BatchError, Result};

/// Environment variable Grid Engine sets to the 1-based task index.
pub const SGE_TASK_ID: &str = "SGE_TASK_ID";

/// Shell variable holding the 0-based working index in generated scripts.
const WORKING_INDEX: &str = "TASK_ID";

/// Suffixes of the per-variable helper names written by the preamble.
const HELPER_SUFFIXES: [&str; 2] = ["_ARRAY", "_INDEX"];

static SHELL_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Why a set of sweep variables was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("variable '{0}' has no values")]
    EmptyValues(String),

    #[error("variable name '{0}' is not a valid shell identifier")]
    InvalidVariableName(String),

    #[error("variable '{0}' is declared more than once")]
    DuplicateVariable(String),

    #[error("variable name '{name}' collides with the '{suffix}' helper of variable '{owner}'")]
    HelperNameClash {
        name: String,
        owner: String,
        suffix: &'static str,
    },

    #[error("number of combinations does not fit in 64 bits")]
    TooManyTasks,
}

/// One swept variable and its candidate values, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepVariable {
    pub name: String,
    pub values: Vec<String>,
}

impl SweepVariable {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Validated sweep with its precomputed task count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep {
    variables: Vec<SweepVariable>,
    task_count: u64,
}

impl Sweep {
    /// Validate the variables and compute the number of tasks.
    ///
    /// No variables at all is a valid sweep with exactly one task.
    pub fn new(variables: Vec<SweepVariable>) -> std::result::Result<Self, SweepError> {
        let mut seen = HashSet::new();
        let mut task_count: u64 = 1;

        for var in &variables {
            if !SHELL_IDENT.is_match(&var.name) || var.name == WORKING_INDEX {
                return Err(SweepError::InvalidVariableName(var.name.clone()));
            }
            if !seen.insert(var.name.as_str()) {
                return Err(SweepError::DuplicateVariable(var.name.clone()));
            }
            if var.values.is_empty() {
                return Err(SweepError::EmptyValues(var.name.clone()));
            }
            task_count = task_count
                .checked_mul(var.values.len() as u64)
                .ok_or(SweepError::TooManyTasks)?;
        }

        check_helper_names(&variables)?;

        Ok(Self {
            variables,
            task_count,
        })
    }

    pub fn variables(&self) -> &[SweepVariable] {
        &self.variables
    }

    pub fn task_count(&self) -> u64 {
        self.task_count
    }

    /// Map a 1-based task index to one `(variable, value)` pair per variable.
    pub fn decode(&self, task_index: u64) -> Result<Vec<(&str, &str)>> {
        if task_index == 0 || task_index > self.task_count {
            return Err(BatchError::TaskIndexOutOfRange {
                index: task_index,
                task_count: self.task_count,
            });
        }

        let mut working = task_index - 1;
        let mut bound = Vec::with_capacity(self.variables.len());

        for var in &self.variables {
            let radix = var.values.len() as u64;
            let selector = (working % radix) as usize;
            bound.push((var.name.as_str(), var.values[selector].as_str()));
            working /= radix;
        }

        // Range was checked above, so every digit has been consumed.
        debug_assert_eq!(working, 0);
        Ok(bound)
    }

    /// Inverse of [`Sweep::decode`]: turn one selected position per variable
    /// into the 1-based task index.
    pub fn encode(&self, selectors: &[usize]) -> Result<u64> {
        if selectors.len() != self.variables.len() {
            return Err(BatchError::ConfigError(format!(
                "expected {} selectors, got {}",
                self.variables.len(),
                selectors.len()
            )));
        }

        let mut index: u64 = 0;
        let mut weight: u64 = 1;
        for (var, &sel) in self.variables.iter().zip(selectors) {
            if sel >= var.values.len() {
                return Err(BatchError::ConfigError(format!(
                    "selector {sel} out of range for variable '{}' ({} values)",
                    var.name,
                    var.values.len()
                )));
            }
            index += sel as u64 * weight;
            weight *= var.values.len() as u64;
        }

        Ok(index + 1)
    }

    /// Bash that binds every sweep variable for the task index found in
    /// `$task_id_var`.
    pub fn preamble(&self, task_id_var: &str) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "{WORKING_INDEX}=$(( {task_id_var} - 1 ))");

        for var in &self.variables {
            let quoted: Vec<String> = var.values.iter().map(|v| shell_quote(v)).collect();
            let _ = writeln!(out, "{}_ARRAY=({})", var.name, quoted.join(" "));
        }
        out.push('\n');

        for var in &self.variables {
            let radix = var.values.len();
            let name = &var.name;
            let _ = writeln!(out, "{name}_INDEX=$(( {WORKING_INDEX} % {radix} ))");
            let _ = writeln!(out, "{name}=\"${{{name}_ARRAY[${name}_INDEX]}}\"");
            let _ = writeln!(out, "{WORKING_INDEX}=$(( {WORKING_INDEX} / {radix} ))");
        }

        out
    }

    /// Full task script: decode preamble followed by the job command.
    pub fn expand(&self, command: &str) -> String {
        let mut script = self.preamble(&format!("${SGE_TASK_ID}"));
        script.push('\n');
        script.push_str(command);
        script.push('\n');
        script
    }
}

/// Each variable `v` gets `v_ARRAY` and `v_INDEX` in the preamble; no other
/// variable may use those names.
fn check_helper_names(variables: &[SweepVariable]) -> std::result::Result<(), SweepError> {
    let names: HashSet<&str> = variables.iter().map(|v| v.name.as_str()).collect();

    for owner in variables {
        for suffix in HELPER_SUFFIXES {
            let helper = format!("{}{suffix}", owner.name);
            if names.contains(helper.as_str()) {
                return Err(SweepError::HelperNameClash {
                    name: helper,
                    owner: owner.name.clone(),
                    suffix,
                });
            }
        }
    }
    Ok(())
}

/// Single-quote a value for bash, escaping embedded single quotes.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
