use std::fmt;

use crate::tuple::{CompareOp, Tuple, Value};

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    field: usize,
    op: CompareOp,
    operand: Value,
}

impl Predicate {
    pub fn new(field: usize, op: CompareOp, operand: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// Returns true if `tuple` satisfies the comparison. Values of
    /// different types never match.
    pub fn filter(&self, tuple: &Tuple) -> bool {
        tuple
            .value(self.field)
            .is_some_and(|value| value.satisfies(self.op, &self.operand))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} {} {}", self.field, self.op, self.operand)
    }
}

/// Compares a field of a left tuple with a field of a right tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPredicate {
    left_field: usize,
    op: CompareOp,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: CompareOp, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }

    pub fn left_field(&self) -> usize {
        self.left_field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn right_field(&self) -> usize {
        self.right_field
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        match (left.value(self.left_field), right.value(self.right_field)) {
            (Some(l), Some(r)) => l.satisfies(self.op, r),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, Schema};

    fn tuple(id: i32, name: &str) -> Tuple {
        let schema = Schema::builder()
            .column("id", DataType::Integer)
            .column("name", DataType::Text(8))
            .build_arc();
        Tuple::new(schema, vec![Value::Integer(id), Value::from(name)]).unwrap()
    }

    #[test]
    fn test_predicate_operators() {
        let t = tuple(5, "m");
        assert!(Predicate::new(0, CompareOp::Equals, 5).filter(&t));
        assert!(Predicate::new(0, CompareOp::NotEquals, 4).filter(&t));
        assert!(Predicate::new(0, CompareOp::LessThan, 6).filter(&t));
        assert!(Predicate::new(0, CompareOp::LessThanOrEq, 5).filter(&t));
        assert!(Predicate::new(0, CompareOp::GreaterThan, 4).filter(&t));
        assert!(Predicate::new(0, CompareOp::GreaterThanOrEq, 5).filter(&t));
        assert!(!Predicate::new(0, CompareOp::GreaterThan, 5).filter(&t));
        assert!(Predicate::new(1, CompareOp::LessThan, "z").filter(&t));
    }

    #[test]
    fn test_predicate_type_mismatch_is_false() {
        let t = tuple(5, "m");
        assert!(!Predicate::new(0, CompareOp::Equals, "5").filter(&t));
        assert!(!Predicate::new(9, CompareOp::Equals, 5).filter(&t));
    }

    #[test]
    fn test_join_predicate() {
        let p = JoinPredicate::new(0, CompareOp::Equals, 0);
        assert!(p.filter(&tuple(1, "a"), &tuple(1, "x")));
        assert!(!p.filter(&tuple(1, "a"), &tuple(2, "y")));

        let p = JoinPredicate::new(1, CompareOp::LessThan, 1);
        assert!(p.filter(&tuple(1, "a"), &tuple(2, "b")));
    }
}
