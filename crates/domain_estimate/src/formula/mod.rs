//! Quantity formula engine
//!
//! Catalog line items carry quantity formulas such as
//! `MAX(3, CEIL(FLOOR_SF(zone) / 500))`. This module interprets them against
//! a zone's [`ZoneMetrics`] using a closed grammar: decimal numbers, `+ - * /`,
//! parentheses, the metric functions `FLOOR_SF`, `WALL_SF`, `CEILING_SF`,
//! `PERIMETER_LF` and `ROOF_SF`, and the helpers `MAX`, `MIN` and `CEIL`.
//! Nothing outside that whitelist is ever evaluated.
//!
//! Validation and evaluation share one compile step, so a formula that
//! validates always evaluates. Runtime arithmetic faults (division by zero,
//! overflow) resolve to zero and surface as warnings.
//!
//! # Example
//!
//! ```rust
//! use domain_estimate::formula::{calculate_quantity_from_metrics, validate_formula};
//! use domain_estimate::zone::Zone;
//! use rust_decimal_macros::dec;
//!
//! let metrics = Zone::room("Bedroom", dec!(12), dec!(10), dec!(8)).metrics();
//! assert!(validate_formula("MAX(3, CEIL(FLOOR_SF(zone)/500))").valid);
//!
//! let result = calculate_quantity_from_metrics("MAX(3, CEIL(FLOOR_SF(zone)/500))", &metrics).unwrap();
//! assert_eq!(result.quantity, dec!(3));
//! ```

mod eval;
mod lexer;
mod parser;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::metrics::{Metric, ZoneMetrics};
use parser::{BinaryOp, Expr};

/// Longest formula text accepted
pub const MAX_FORMULA_LENGTH: usize = 512;

/// Deepest nesting of parentheses, calls and negations accepted
pub const MAX_DEPTH: usize = 32;

/// Name a formula uses to refer to the zone being measured
pub const ZONE_ARGUMENT: &str = "zone";

/// Structural formula errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Formula is empty")]
    Empty,

    #[error("Formula exceeds maximum length of {max} characters")]
    TooLong { max: usize },

    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Formula nesting exceeds maximum depth of {max}")]
    TooDeep { max: usize },

    #[error("Unknown metric/function: {0}")]
    UnknownIdentifier(String),

    #[error("{function} expects {expected}, found {found} argument(s)")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Invalid argument for {function}: {message}")]
    InvalidArgument { function: String, message: String },
}

/// Helper functions available to formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Function {
    #[serde(rename = "MAX")]
    Max,
    #[serde(rename = "MIN")]
    Min,
    #[serde(rename = "CEIL")]
    Ceil,
}

impl Function {
    pub const ALL: [Function; 3] = [Function::Max, Function::Min, Function::Ceil];

    pub fn name(&self) -> &'static str {
        match self {
            Function::Max => "MAX",
            Function::Min => "MIN",
            Function::Ceil => "CEIL",
        }
    }

    pub fn from_name(name: &str) -> Option<Function> {
        Function::ALL.into_iter().find(|f| f.name() == name)
    }

    fn check_arity(&self, found: usize) -> Result<(), FormulaError> {
        let ok = match self {
            Function::Max | Function::Min => found >= 1,
            Function::Ceil => found == 1,
        };
        if ok {
            return Ok(());
        }
        Err(FormulaError::Arity {
            function: self.name().to_string(),
            expected: match self {
                Function::Max | Function::Min => "at least 1 argument".to_string(),
                Function::Ceil => "exactly 1 argument".to_string(),
            },
            found,
        })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A whitelisted, fully resolved formula tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Number(Decimal),
    Metric(Metric),
    Call(Function, Vec<Node>),
    Negate(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

/// Output of the shared compile step
struct Compiled {
    node: Option<Node>,
    errors: Vec<FormulaError>,
    metrics: BTreeSet<Metric>,
    functions: BTreeSet<Function>,
}

fn compile(text: &str) -> Compiled {
    let mut compiled = Compiled {
        node: None,
        errors: Vec::new(),
        metrics: BTreeSet::new(),
        functions: BTreeSet::new(),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        compiled.errors.push(FormulaError::Empty);
        return compiled;
    }
    if trimmed.len() > MAX_FORMULA_LENGTH {
        compiled.errors.push(FormulaError::TooLong { max: MAX_FORMULA_LENGTH });
        return compiled;
    }

    let expr = match lexer::tokenize(trimmed).and_then(|tokens| parser::parse(&tokens, trimmed.len())) {
        Ok(expr) => expr,
        Err(err) => {
            compiled.errors.push(err);
            return compiled;
        }
    };

    let mut resolver = Resolver {
        errors: Vec::new(),
        metrics: BTreeSet::new(),
        functions: BTreeSet::new(),
    };
    let node = resolver.resolve(&expr);

    compiled.errors = resolver.errors;
    compiled.metrics = resolver.metrics;
    compiled.functions = resolver.functions;
    if compiled.errors.is_empty() {
        compiled.node = node;
    }
    compiled
}

struct Resolver {
    errors: Vec<FormulaError>,
    metrics: BTreeSet<Metric>,
    functions: BTreeSet<Function>,
}

impl Resolver {
    fn resolve(&mut self, expr: &Expr) -> Option<Node> {
        match expr {
            Expr::Number(value) => Some(Node::Number(*value)),
            Expr::Negate(inner) => self.resolve(inner).map(|n| Node::Negate(Box::new(n))),
            Expr::Binary { op, lhs, rhs } => {
                // Resolve both sides so every unknown name is reported.
                let lhs = self.resolve(lhs);
                let rhs = self.resolve(rhs);
                Some(Node::Binary(*op, Box::new(lhs?), Box::new(rhs?)))
            }
            Expr::Identifier { name, args, .. } => self.resolve_identifier(name, args.as_deref()),
        }
    }

    fn resolve_identifier(&mut self, name: &str, args: Option<&[Expr]>) -> Option<Node> {
        if let Some(metric) = Metric::from_name(name) {
            self.metrics.insert(metric);
            return match args {
                None => Some(Node::Metric(metric)),
                Some([Expr::Identifier { name: arg, args: None, .. }]) if arg == ZONE_ARGUMENT => {
                    Some(Node::Metric(metric))
                }
                Some(args) if args.len() != 1 => {
                    self.errors.push(FormulaError::Arity {
                        function: name.to_string(),
                        expected: format!("exactly 1 argument ({})", ZONE_ARGUMENT),
                        found: args.len(),
                    });
                    None
                }
                Some(_) => {
                    self.errors.push(FormulaError::InvalidArgument {
                        function: name.to_string(),
                        message: format!("metric functions take '{}' as their argument", ZONE_ARGUMENT),
                    });
                    None
                }
            };
        }

        if let Some(function) = Function::from_name(name) {
            self.functions.insert(function);
            let Some(args) = args else {
                self.errors.push(FormulaError::Arity {
                    function: name.to_string(),
                    expected: "a call with arguments".to_string(),
                    found: 0,
                });
                return None;
            };
            if let Err(err) = function.check_arity(args.len()) {
                self.errors.push(err);
            }
            let resolved: Vec<Option<Node>> = args.iter().map(|a| self.resolve(a)).collect();
            return resolved
                .into_iter()
                .collect::<Option<Vec<Node>>>()
                .map(|nodes| Node::Call(function, nodes));
        }

        if name == ZONE_ARGUMENT {
            self.errors.push(FormulaError::InvalidArgument {
                function: ZONE_ARGUMENT.to_string(),
                message: "'zone' can only be passed to a metric function".to_string(),
            });
        } else {
            self.errors.push(FormulaError::UnknownIdentifier(name.to_string()));
        }
        if let Some(args) = args {
            for arg in args {
                if !matches!(arg, Expr::Identifier { name, args: None, .. } if name == ZONE_ARGUMENT) {
                    self.resolve(arg);
                }
            }
        }
        None
    }
}

/// Static analysis result for a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub referenced_metrics: Vec<String>,
    pub referenced_functions: Vec<String>,
}

/// Checks a formula against the grammar and whitelist without evaluating it
pub fn validate_formula(text: &str) -> FormulaValidation {
    let compiled = compile(text);
    FormulaValidation {
        valid: compiled.errors.is_empty(),
        errors: compiled.errors.iter().map(|e| e.to_string()).collect(),
        referenced_metrics: compiled.metrics.iter().map(|m| m.name().to_string()).collect(),
        referenced_functions: compiled.functions.iter().map(|f| f.name().to_string()).collect(),
    }
}

/// Successful evaluation of a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityCalculation {
    /// Result rounded to 2 decimal places
    pub quantity: Decimal,
    /// Metric name to the value used
    pub breakdown: BTreeMap<String, Decimal>,
    pub explanation: String,
    pub warnings: Vec<String>,
}

/// Evaluates a formula against resolved zone metrics
///
/// Returns the first structural error for formulas that do not validate.
pub fn calculate_quantity_from_metrics(
    text: &str,
    metrics: &ZoneMetrics,
) -> Result<QuantityCalculation, FormulaError> {
    let compiled = compile(text);
    let node = match (compiled.node, compiled.errors.into_iter().next()) {
        (_, Some(err)) => return Err(err),
        (Some(node), None) => node,
        (None, None) => return Err(FormulaError::Empty),
    };

    let mut evaluator = eval::Evaluator::new(metrics);
    let raw = evaluator.evaluate(&node);
    let quantity = raw.round_dp(2);

    let explanation = if evaluator.breakdown.is_empty() {
        format!("{} = {}", text.trim(), quantity.normalize())
    } else {
        let inputs: Vec<String> = evaluator
            .breakdown
            .iter()
            .map(|(name, value)| format!("{}={}", name, value.normalize()))
            .collect();
        format!("{} = {} ({})", text.trim(), quantity.normalize(), inputs.join(", "))
    };

    Ok(QuantityCalculation {
        quantity,
        breakdown: evaluator.breakdown,
        explanation,
        warnings: evaluator.warnings,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn metrics_strategy() -> impl Strategy<Value = ZoneMetrics> {
        (0u32..100_000, 0u32..100_000, 0u32..2_000, proptest::option::of(0u32..100_000)).prop_map(
            |(floor, wall, perimeter, roof)| ZoneMetrics {
                floor_square_feet: Decimal::new(floor as i64, 1),
                ceiling_square_feet: Decimal::new(floor as i64, 1),
                wall_square_feet: Decimal::new(wall as i64, 1),
                perimeter_linear_feet: Decimal::new(perimeter as i64, 1),
                roof_square_feet: roof.map(|r| Decimal::new(r as i64, 1)),
                ..ZoneMetrics::default()
            },
        )
    }

    fn formula_strategy() -> impl Strategy<Value = String> {
        let atom = prop_oneof![
            (0u32..1000).prop_map(|n| n.to_string()),
            Just("FLOOR_SF(zone)".to_string()),
            Just("WALL_SF(zone)".to_string()),
            Just("CEILING_SF".to_string()),
            Just("PERIMETER_LF(zone)".to_string()),
            Just("ROOF_SF(zone)".to_string()),
            Just("UNKNOWN(zone)".to_string()),
            Just("zone".to_string()),
            Just("".to_string()),
        ];
        atom.prop_recursive(4, 32, 3, |inner| {
            prop_oneof![
                (inner.clone(), prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")], inner.clone())
                    .prop_map(|(a, op, b)| format!("{} {} {}", a, op, b)),
                inner.clone().prop_map(|a| format!("CEIL({})", a)),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("MAX({}, {})", a, b)),
                (inner.clone(), inner).prop_map(|(a, b)| format!("MIN({}, ({}))", a, b)),
            ]
        })
    }

    proptest! {
        #[test]
        fn valid_iff_evaluation_succeeds(formula in formula_strategy(), metrics in metrics_strategy()) {
            let validation = validate_formula(&formula);
            let calculation = calculate_quantity_from_metrics(&formula, &metrics);
            prop_assert_eq!(validation.valid, calculation.is_ok());
        }
    }
}
