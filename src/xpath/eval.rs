//! XPath Evaluator
//!
//! Runs a compiled stack program against a document. Node-sets are kept in
//! document order; the order is a preorder ranking computed once per
//! evaluator, since node IDs stop tracking document order after tree edits.

use std::cell::OnceCell;

use super::axes;
use super::compiler::{CompiledExpr, CompiledTest, Op};
use super::functions;
use super::parser::{ArithmeticOp, Axis, CompareOp};
use super::value::{parse_number, XPathNode, XPathValue};
use crate::dom::{NodeId, XmlDocument, DOCUMENT_NODE};
use crate::error::XPathError;

/// Dynamic context: context node, position and size
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub node: XPathNode,
    /// 1-based
    pub position: usize,
    pub size: usize,
}

impl EvalContext {
    pub fn new(node: XPathNode) -> Self {
        EvalContext {
            node,
            position: 1,
            size: 1,
        }
    }
}

/// Evaluates compiled expressions against one document
pub struct Evaluator<'d> {
    doc: &'d XmlDocument,
    order: OnceCell<Vec<u32>>,
}

impl<'d> Evaluator<'d> {
    pub fn new(doc: &'d XmlDocument) -> Self {
        Evaluator {
            doc,
            order: OnceCell::new(),
        }
    }

    /// Evaluate with `node` as the context node
    pub fn evaluate(&self, expr: &CompiledExpr, node: NodeId) -> Result<XPathValue, XPathError> {
        self.run(expr, &EvalContext::new(XPathNode::Node(node)))
    }

    fn run(&self, expr: &CompiledExpr, ctx: &EvalContext) -> Result<XPathValue, XPathError> {
        let mut stack: Vec<XPathValue> = Vec::with_capacity(4);

        for op in &expr.ops {
            let value = match op {
                Op::Root => XPathValue::NodeSet(vec![self.tree_root(ctx.node)]),
                Op::Context => XPathValue::NodeSet(vec![ctx.node]),
                Op::Step {
                    axis,
                    test,
                    predicates,
                } => {
                    let input = pop_nodeset(&mut stack)?;
                    XPathValue::NodeSet(self.step(&input, *axis, test, predicates)?)
                }
                Op::Predicate(predicate) => {
                    let input = pop_nodeset(&mut stack)?;
                    XPathValue::NodeSet(self.filter(input, predicate)?)
                }
                Op::Union => {
                    let right = pop(&mut stack);
                    let left = pop(&mut stack);
                    match (left, right) {
                        (XPathValue::NodeSet(mut left), XPathValue::NodeSet(right)) => {
                            left.extend(right);
                            self.sort_unique(&mut left);
                            XPathValue::NodeSet(left)
                        }
                        _ => return Err(XPathError::UnionOfNonNodeSets),
                    }
                }
                Op::Number(n) => XPathValue::Number(*n),
                Op::String(s) => XPathValue::String(s.clone()),
                Op::Call(function, argc) => {
                    let args = stack.split_off(stack.len().saturating_sub(*argc));
                    functions::call(*function, args, ctx, self.doc)?
                }
                Op::Compare(op) => {
                    let right = pop(&mut stack);
                    let left = pop(&mut stack);
                    XPathValue::Boolean(self.compare(&left, *op, &right))
                }
                Op::Arithmetic(op) => {
                    let right = pop(&mut stack).to_number(self.doc);
                    let left = pop(&mut stack).to_number(self.doc);
                    XPathValue::Number(match op {
                        ArithmeticOp::Add => left + right,
                        ArithmeticOp::Sub => left - right,
                        ArithmeticOp::Mul => left * right,
                        ArithmeticOp::Div => left / right,
                        ArithmeticOp::Mod => left % right,
                    })
                }
                Op::Negate => XPathValue::Number(-pop(&mut stack).to_number(self.doc)),
                Op::Or(right) => {
                    let left = pop(&mut stack).to_boolean();
                    XPathValue::Boolean(left || self.run(right, ctx)?.to_boolean())
                }
                Op::And(right) => {
                    let left = pop(&mut stack).to_boolean();
                    XPathValue::Boolean(left && self.run(right, ctx)?.to_boolean())
                }
            };
            stack.push(value);
        }

        stack
            .pop()
            .ok_or_else(|| XPathError::Syntax("empty expression".to_string()))
    }

    /// Apply one location step to every input node
    ///
    /// Predicates see each context node's axis result separately, so
    /// positions on reverse axes count nearest first.
    fn step(
        &self,
        input: &[XPathNode],
        axis: Axis,
        test: &CompiledTest,
        predicates: &[CompiledExpr],
    ) -> Result<Vec<XPathNode>, XPathError> {
        let mut result = Vec::new();
        for &node in input {
            let mut selected: Vec<XPathNode> = axes::navigate(self.doc, node, axis)
                .into_iter()
                .filter(|&n| axes::matches(self.doc, n, test, axis))
                .collect();
            for predicate in predicates {
                selected = self.filter(selected, predicate)?;
            }
            result.extend(selected);
        }
        if input.len() > 1 || axis.is_reverse() {
            self.sort_unique(&mut result);
        }
        Ok(result)
    }

    /// Keep nodes whose predicate holds; a number means `position() = n`
    fn filter(&self, nodes: Vec<XPathNode>, predicate: &CompiledExpr) -> Result<Vec<XPathNode>, XPathError> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let ctx = EvalContext {
                node,
                position: i + 1,
                size,
            };
            let keep = match self.run(predicate, &ctx)? {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    fn tree_root(&self, node: XPathNode) -> XPathNode {
        let mut current = match node {
            XPathNode::Node(id) => id,
            XPathNode::Attribute { owner, .. } => owner,
        };
        while let Some(parent) = self.doc.parent_of(current) {
            current = parent;
        }
        XPathNode::Node(current)
    }

    /// Preorder rank of every node; detached subtrees rank after the tree
    fn order(&self) -> &[u32] {
        self.order.get_or_init(|| {
            let count = self.doc.node_count();
            let mut rank = vec![u32::MAX; count];
            let mut next = 0u32;
            let mut assign = |root: NodeId, rank: &mut Vec<u32>| {
                rank[root as usize] = next;
                next += 1;
                for id in self.doc.descendants(root) {
                    rank[id as usize] = next;
                    next += 1;
                }
            };
            if count > 0 {
                assign(DOCUMENT_NODE, &mut rank);
            }
            for id in 0..count as NodeId {
                if rank[id as usize] == u32::MAX && self.doc.parent_of(id).is_none() {
                    assign(id, &mut rank);
                }
            }
            rank
        })
    }

    fn order_key(&self, node: XPathNode) -> u64 {
        let order = self.order();
        let rank = |id: NodeId| u64::from(order.get(id as usize).copied().unwrap_or(u32::MAX));
        match node {
            XPathNode::Node(id) => rank(id) << 32,
            XPathNode::Attribute { owner, index } => (rank(owner) << 32) | (u64::from(index) + 1),
        }
    }

    fn sort_unique(&self, nodes: &mut Vec<XPathNode>) {
        nodes.sort_by_key(|&n| self.order_key(n));
        nodes.dedup();
    }

    fn compare(&self, left: &XPathValue, op: CompareOp, right: &XPathValue) -> bool {
        let doc = self.doc;
        match (left, right) {
            (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                let right_values: Vec<String> = r.iter().map(|n| n.string_value(doc)).collect();
                l.iter().any(|n| {
                    let value = n.string_value(doc);
                    right_values.iter().any(|rv| compare_strings(&value, op, rv))
                })
            }
            (XPathValue::NodeSet(nodes), other) => self.compare_nodeset(nodes, op, other),
            (other, XPathValue::NodeSet(nodes)) => self.compare_nodeset(nodes, op.flip(), other),
            _ => compare_atomic(left, op, right, doc),
        }
    }

    fn compare_nodeset(&self, nodes: &[XPathNode], op: CompareOp, other: &XPathValue) -> bool {
        let doc = self.doc;
        match other {
            XPathValue::Boolean(_) => {
                compare_atomic(&XPathValue::Boolean(!nodes.is_empty()), op, other, doc)
            }
            XPathValue::Number(n) => nodes
                .iter()
                .any(|node| compare_numbers(parse_number(&node.string_value(doc)), op, *n)),
            XPathValue::String(s) => nodes
                .iter()
                .any(|node| compare_strings(&node.string_value(doc), op, s)),
            XPathValue::NodeSet(_) => false,
        }
    }
}

fn pop(stack: &mut Vec<XPathValue>) -> XPathValue {
    stack.pop().unwrap_or_default()
}

fn pop_nodeset(stack: &mut Vec<XPathValue>) -> Result<Vec<XPathNode>, XPathError> {
    pop(stack).into_nodeset().ok_or(XPathError::NodeSetRequired)
}

fn compare_numbers(left: f64, op: CompareOp, right: f64) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::Lt => left < right,
        CompareOp::LtEq => left <= right,
        CompareOp::Gt => left > right,
        CompareOp::GtEq => left >= right,
    }
}

/// String comparison for `=`/`!=`, numeric for the relational operators
fn compare_strings(left: &str, op: CompareOp, right: &str) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        _ => compare_numbers(parse_number(left), op, parse_number(right)),
    }
}

fn compare_atomic(left: &XPathValue, op: CompareOp, right: &XPathValue, doc: &XmlDocument) -> bool {
    let is_bool = |v: &XPathValue| matches!(v, XPathValue::Boolean(_));
    let is_number = |v: &XPathValue| matches!(v, XPathValue::Number(_));
    match op {
        CompareOp::Eq | CompareOp::NotEq if is_bool(left) || is_bool(right) => {
            let equal = left.to_boolean() == right.to_boolean();
            equal == (op == CompareOp::Eq)
        }
        CompareOp::Eq | CompareOp::NotEq if is_number(left) || is_number(right) => {
            compare_numbers(left.to_number(doc), op, right.to_number(doc))
        }
        CompareOp::Eq | CompareOp::NotEq => {
            compare_strings(&left.to_string_value(doc), op, &right.to_string_value(doc))
        }
        _ => compare_numbers(left.to_number(doc), op, right.to_number(doc)),
    }
}
