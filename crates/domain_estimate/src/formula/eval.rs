//! Evaluation of resolved formula trees

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::parser::BinaryOp;
use super::{Function, Node};
use crate::metrics::ZoneMetrics;

pub(crate) struct Evaluator<'a> {
    metrics: &'a ZoneMetrics,
    pub breakdown: BTreeMap<String, Decimal>,
    pub warnings: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(metrics: &'a ZoneMetrics) -> Self {
        Self {
            metrics,
            breakdown: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Evaluates a node; arithmetic faults resolve to zero with a warning
    pub fn evaluate(&mut self, node: &Node) -> Decimal {
        match node {
            Node::Number(value) => *value,
            Node::Metric(metric) => {
                let value = match self.metrics.get(*metric) {
                    Some(value) => value,
                    None => {
                        self.warn(format!("{} is not available for this zone; resolved to 0", metric));
                        Decimal::ZERO
                    }
                };
                self.breakdown.insert(metric.name().to_string(), value);
                value
            }
            Node::Negate(inner) => -self.evaluate(inner),
            Node::Binary(op, lhs, rhs) => {
                let lhs = self.evaluate(lhs);
                let rhs = self.evaluate(rhs);
                self.binary(*op, lhs, rhs)
            }
            Node::Call(function, args) => {
                let values: Vec<Decimal> = args.iter().map(|a| self.evaluate(a)).collect();
                match function {
                    Function::Max => values.into_iter().max().unwrap_or_default(),
                    Function::Min => values.into_iter().min().unwrap_or_default(),
                    Function::Ceil => values.first().map(|v| v.ceil()).unwrap_or_default(),
                }
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Decimal, rhs: Decimal) -> Decimal {
        let result = match op {
            BinaryOp::Add => lhs.checked_add(rhs),
            BinaryOp::Sub => lhs.checked_sub(rhs),
            BinaryOp::Mul => lhs.checked_mul(rhs),
            BinaryOp::Div => {
                if rhs.is_zero() {
                    self.warn(format!("Division by zero ({} / 0); resolved to 0", lhs.normalize()));
                    return Decimal::ZERO;
                }
                lhs.checked_div(rhs)
            }
        };
        result.unwrap_or_else(|| {
            self.warn(format!(
                "Arithmetic overflow in {} {} {}; resolved to 0",
                lhs.normalize(),
                op.symbol(),
                rhs.normalize()
            ));
            Decimal::ZERO
        })
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}
