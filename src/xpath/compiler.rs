//! XPath Expression Compiler
//!
//! Lowers the AST to a flat stack program. Namespace prefixes are resolved
//! and function calls checked here, so a compiled expression only fails at
//! evaluation time on type errors.

use std::collections::HashMap;

use super::functions::Function;
use super::parser::{parse, ArithmeticOp, Axis, CompareOp, Expr, LocationPath, NodeTest, Step};
use crate::dom::namespace::ns;
use crate::error::XPathError;

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the root of the context node's tree
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top with the step's result
    Step {
        axis: Axis,
        test: CompiledTest,
        predicates: Vec<CompiledExpr>,
    },
    /// Filter the node-set on top, positions in document order
    Predicate(CompiledExpr),
    Union,
    Number(f64),
    String(String),
    Call(Function, usize),
    Compare(CompareOp),
    Arithmetic(ArithmeticOp),
    Negate,
    /// Right operand runs only when the left one is false
    Or(CompiledExpr),
    /// Right operand runs only when the left one is true
    And(CompiledExpr),
}

/// Node test with prefixes replaced by namespace URIs
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledTest {
    Any,
    /// `uri` is None for names in no namespace
    Name { uri: Option<String>, local: String },
    /// `prefix:*`
    Namespace(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledExpr {
    /// Compile an AST against a prefix → URI table
    pub fn compile(expr: &Expr, namespaces: &HashMap<String, String>) -> Result<Self, XPathError> {
        let compiler = Compiler { namespaces };
        let mut ops = Vec::new();
        compiler.compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    /// Parse and compile in one go
    pub fn from_source(input: &str, namespaces: &HashMap<String, String>) -> Result<Self, XPathError> {
        Self::compile(&parse(input)?, namespaces)
    }
}

struct Compiler<'n> {
    namespaces: &'n HashMap<String, String>,
}

impl Compiler<'_> {
    fn compile_expr(&self, expr: &Expr, ops: &mut Vec<Op>) -> Result<(), XPathError> {
        match expr {
            Expr::Or(left, right) => {
                self.compile_expr(left, ops)?;
                ops.push(Op::Or(self.compile_nested(right)?));
            }
            Expr::And(left, right) => {
                self.compile_expr(left, ops)?;
                ops.push(Op::And(self.compile_nested(right)?));
            }
            Expr::Compare(left, op, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Compare(*op));
            }
            Expr::Arithmetic(left, op, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Arithmetic(*op));
            }
            Expr::Negate(inner) => {
                self.compile_expr(inner, ops)?;
                ops.push(Op::Negate);
            }
            Expr::Union(left, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Union);
            }
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::Literal(s) => ops.push(Op::String(s.clone())),
            Expr::FunctionCall(name, args) => {
                let function =
                    Function::from_name(name).ok_or_else(|| XPathError::UnknownFunction(name.clone()))?;
                function.check_arity(args.len())?;
                for arg in args {
                    self.compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(function, args.len()));
            }
            Expr::Path(LocationPath { absolute, steps }) => {
                ops.push(if *absolute { Op::Root } else { Op::Context });
                self.compile_steps(steps, ops)?;
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                self.compile_expr(primary, ops)?;
                for predicate in predicates {
                    ops.push(Op::Predicate(self.compile_nested(predicate)?));
                }
                self.compile_steps(steps, ops)?;
            }
        }
        Ok(())
    }

    fn compile_nested(&self, expr: &Expr) -> Result<CompiledExpr, XPathError> {
        let mut ops = Vec::new();
        self.compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    fn compile_steps(&self, steps: &[Step], ops: &mut Vec<Op>) -> Result<(), XPathError> {
        let mut i = 0;
        while i < steps.len() {
            let step = &steps[i];
            // `//name` without positional context collapses to descendant::name
            if let Some(next) = steps.get(i + 1) {
                if is_plain_descendant_or_self(step) && next.axis == Axis::Child && next.predicates.is_empty() {
                    ops.push(Op::Step {
                        axis: Axis::Descendant,
                        test: self.compile_test(&next.node_test)?,
                        predicates: Vec::new(),
                    });
                    i += 2;
                    continue;
                }
            }
            let predicates = step
                .predicates
                .iter()
                .map(|p| self.compile_nested(p))
                .collect::<Result<Vec<_>, _>>()?;
            ops.push(Op::Step {
                axis: step.axis,
                test: self.compile_test(&step.node_test)?,
                predicates,
            });
            i += 1;
        }
        Ok(())
    }

    fn compile_test(&self, test: &NodeTest) -> Result<CompiledTest, XPathError> {
        Ok(match test {
            NodeTest::Any => CompiledTest::Any,
            NodeTest::Name { prefix: None, local } => CompiledTest::Name {
                uri: None,
                local: local.clone(),
            },
            NodeTest::Name {
                prefix: Some(prefix),
                local,
            } => CompiledTest::Name {
                uri: Some(self.resolve(prefix)?),
                local: local.clone(),
            },
            NodeTest::PrefixWildcard(prefix) => CompiledTest::Namespace(self.resolve(prefix)?),
            NodeTest::Node => CompiledTest::Node,
            NodeTest::Text => CompiledTest::Text,
            NodeTest::Comment => CompiledTest::Comment,
            NodeTest::ProcessingInstruction(target) => CompiledTest::ProcessingInstruction(target.clone()),
        })
    }

    fn resolve(&self, prefix: &str) -> Result<String, XPathError> {
        if prefix == "xml" {
            return Ok(ns::XML.to_string());
        }
        self.namespaces
            .get(prefix)
            .cloned()
            .ok_or_else(|| XPathError::UnboundPrefix(prefix.to_string()))
    }
}

fn is_plain_descendant_or_self(step: &Step) -> bool {
    step.axis == Axis::DescendantOrSelf && step.node_test == NodeTest::Node && step.predicates.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom() -> HashMap<String, String> {
        HashMap::from([("atom".to_string(), "http://www.w3.org/2005/Atom".to_string())])
    }

    #[test]
    fn test_prefix_resolution() {
        let compiled = CompiledExpr::from_source("/atom:feed", &atom()).unwrap();
        assert_eq!(
            compiled.ops,
            vec![
                Op::Root,
                Op::Step {
                    axis: Axis::Child,
                    test: CompiledTest::Name {
                        uri: Some("http://www.w3.org/2005/Atom".to_string()),
                        local: "feed".to_string()
                    },
                    predicates: Vec::new(),
                }
            ]
        );

        let xml = CompiledExpr::from_source("@xml:lang", &HashMap::new()).unwrap();
        assert!(matches!(
            &xml.ops[1],
            Op::Step { test: CompiledTest::Name { uri: Some(uri), .. }, .. } if uri == ns::XML
        ));
    }

    #[test]
    fn test_unbound_prefix() {
        assert_eq!(
            CompiledExpr::from_source("//cmis:value", &atom()),
            Err(XPathError::UnboundPrefix("cmis".to_string()))
        );
        assert_eq!(
            CompiledExpr::from_source("cmis:*", &HashMap::new()),
            Err(XPathError::UnboundPrefix("cmis".to_string()))
        );
    }

    #[test]
    fn test_function_validation() {
        assert_eq!(
            CompiledExpr::from_source("substring('a', 1)", &HashMap::new()),
            Err(XPathError::UnknownFunction("substring".to_string()))
        );
        assert!(matches!(
            CompiledExpr::from_source("count()", &HashMap::new()),
            Err(XPathError::Argument { function: "count", .. })
        ));
        let ok = CompiledExpr::from_source("count(//a)", &HashMap::new()).unwrap();
        assert_eq!(ok.ops.last(), Some(&Op::Call(Function::Count, 1)));
    }

    #[test]
    fn test_descendant_shortcut() {
        let compiled = CompiledExpr::from_source("//atom:entry", &atom()).unwrap();
        assert_eq!(compiled.ops.len(), 2);
        assert!(matches!(compiled.ops[1], Op::Step { axis: Axis::Descendant, .. }));

        // Positional predicates keep the two-step form
        let compiled = CompiledExpr::from_source("//atom:entry[1]", &atom()).unwrap();
        assert_eq!(compiled.ops.len(), 3);
    }

    #[test]
    fn test_short_circuit_ops() {
        let compiled = CompiledExpr::from_source("true() or 1 = 2", &HashMap::new()).unwrap();
        assert_eq!(compiled.ops.len(), 2);
        match &compiled.ops[1] {
            Op::Or(right) => assert_eq!(right.ops.last(), Some(&Op::Compare(CompareOp::Eq))),
            other => panic!("unexpected {other:?}"),
        }
    }
}
