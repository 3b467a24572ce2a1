//! Post-join row filter.
//!
//! Supports conjunctions of comparisons: `lhs OP rhs [AND lhs OP rhs ...]`
//! where OP ∈ {==, =, !=, <>, <, <=, >, >=}. An operand that names a column of
//! the bound table is a column reference; anything else (numbers, quoted
//! strings, `true`/`false`) is a literal parsed to the other side's type.

use std::cmp::Ordering;
use std::str::FromStr;

use qkernel_core::table::Table;
use qkernel_core::types::Value;

use crate::traits::OpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    // Longest spellings first so `<=` is not read as `<`.
    const SPELLINGS: [(&'static str, CmpOp); 8] = [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<>", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("=", CmpOp::Eq),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    lhs: String,
    op: CmpOp,
    rhs: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl FromStr for Predicate {
    type Err = OpError;

    fn from_str(expr: &str) -> Result<Self, OpError> {
        Predicate::parse(expr)
    }
}

impl Predicate {
    pub fn parse(expr: &str) -> Result<Self, OpError> {
        let terms = split_and(expr)
            .into_iter()
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;
        if terms.is_empty() {
            return Err(OpError::Config(format!("empty filter expression '{expr}'")));
        }
        Ok(Self { terms })
    }

    /// Resolve operands against `table`'s columns.
    pub fn bind(&self, table: &Table) -> Result<BoundPredicate, OpError> {
        let terms = self
            .terms
            .iter()
            .map(|t| bind_term(t, table))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BoundPredicate { terms })
    }
}

/// Split on the keyword `AND` (any case), outside quotes.
fn split_and(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None => {
                let at_word = i == 0 || bytes[i - 1].is_ascii_whitespace();
                let is_and = bytes.len() >= i + 3
                    && bytes[i..i + 3].eq_ignore_ascii_case(b"and")
                    && bytes.get(i + 3).map_or(false, |c| c.is_ascii_whitespace());
                if at_word && is_and && i > 0 {
                    parts.push(expr[start..i].trim());
                    i += 3;
                    start = i;
                    continue;
                }
            }
        }
        i += 1;
    }
    parts.push(expr[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_term(term: &str) -> Result<Term, OpError> {
    let mut quote: Option<char> = None;
    for (pos, c) in term.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None => {
                let rest = &term[pos..];
                if let Some((spelling, op)) =
                    CmpOp::SPELLINGS.iter().find(|(s, _)| rest.starts_with(s))
                {
                    let lhs = term[..pos].trim();
                    let rhs = term[pos + spelling.len()..].trim();
                    if lhs.is_empty() || rhs.is_empty() {
                        break;
                    }
                    return Ok(Term {
                        lhs: lhs.to_string(),
                        op: *op,
                        rhs: rhs.to_string(),
                    });
                }
            }
        }
    }
    Err(OpError::Config(format!("unparseable filter term: {term}")))
}

#[derive(Debug, Clone)]
enum Operand {
    Column(usize),
    Literal(Value),
}

#[derive(Debug, Clone)]
struct BoundTerm {
    lhs: Operand,
    op: CmpOp,
    rhs: Operand,
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
}

fn column_ref(token: &str, table: &Table) -> Option<usize> {
    if is_quoted(token) {
        return None;
    }
    table.column_index(token)
}

fn bind_term(term: &Term, table: &Table) -> Result<BoundTerm, OpError> {
    let lhs_col = column_ref(&term.lhs, table);
    let rhs_col = column_ref(&term.rhs, table);
    let type_of = |idx: usize| table.column_at(idx).map(|c| c.value_type());

    let (lhs, rhs) = match (lhs_col, rhs_col) {
        (Some(l), Some(r)) => {
            if type_of(l) != type_of(r) {
                return Err(OpError::Config(format!(
                    "cannot compare '{}' with '{}': column types differ",
                    term.lhs, term.rhs
                )));
            }
            (Operand::Column(l), Operand::Column(r))
        }
        (Some(col), None) => (Operand::Column(col), literal(&term.rhs, type_of(col))?),
        (None, Some(col)) => (literal(&term.lhs, type_of(col))?, Operand::Column(col)),
        (None, None) => {
            return Err(OpError::Config(format!(
                "filter term '{} ... {}' references no known column",
                term.lhs, term.rhs
            )))
        }
    };
    Ok(BoundTerm {
        lhs,
        op: term.op,
        rhs,
    })
}

fn literal(
    token: &str,
    value_type: Option<qkernel_core::schema::ValueType>,
) -> Result<Operand, OpError> {
    value_type
        .and_then(|vt| Value::parse_literal(token, vt))
        .map(Operand::Literal)
        .ok_or_else(|| OpError::Config(format!("cannot parse literal '{token}'")))
}

/// A predicate resolved against one table's column layout.
#[derive(Debug, Clone)]
pub struct BoundPredicate {
    terms: Vec<BoundTerm>,
}

impl BoundPredicate {
    /// True when every term holds for `row`. Incomparable values fail the term.
    pub fn eval(&self, table: &Table, row: usize) -> bool {
        self.terms.iter().all(|t| {
            let lhs = resolve(&t.lhs, table, row);
            let rhs = resolve(&t.rhs, table, row);
            match (lhs, rhs) {
                (Some(a), Some(b)) => a.compare(&b).map_or(false, |ord| t.op.holds(ord)),
                _ => false,
            }
        })
    }
}

fn resolve(operand: &Operand, table: &Table, row: usize) -> Option<Value> {
    match operand {
        Operand::Column(idx) => table.value(*idx, row),
        Operand::Literal(v) => Some(v.clone()),
    }
}
