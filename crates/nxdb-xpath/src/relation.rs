use core::cmp::Ordering;
use core::fmt;

/// Operator of a general comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Relation {
    pub const ALL: [Relation; 6] = [
        Relation::Eq,
        Relation::Ne,
        Relation::Lt,
        Relation::Gt,
        Relation::Le,
        Relation::Ge,
    ];

    /// Relation to use after exchanging the operands: `a < b` iff `b > a`.
    pub fn flip(self) -> Self {
        match self {
            Relation::Lt => Relation::Gt,
            Relation::Gt => Relation::Lt,
            Relation::Le => Relation::Ge,
            Relation::Ge => Relation::Le,
            other => other,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Ne => "!=",
            Relation::Lt => "<",
            Relation::Gt => ">",
            Relation::Le => "<=",
            Relation::Ge => ">=",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "=" => Relation::Eq,
            "!=" => Relation::Ne,
            "<" => Relation::Lt,
            ">" => Relation::Gt,
            "<=" => Relation::Le,
            ">=" => Relation::Ge,
            _ => return None,
        })
    }

    pub fn is_ordering(self) -> bool {
        !matches!(self, Relation::Eq | Relation::Ne)
    }

    /// IEEE comparison; any NaN operand makes every relation false, `!=` included.
    pub fn compare_numbers(self, left: f64, right: f64) -> bool {
        if left.is_nan() || right.is_nan() {
            return false;
        }
        match self {
            Relation::Eq => left == right,
            Relation::Ne => left != right,
            Relation::Gt => left > right,
            Relation::Lt => left < right,
            Relation::Ge => left >= right,
            Relation::Le => left <= right,
        }
    }

    /// Code point order (`str` ordering compares UTF-8 bytes, which is the
    /// same order as comparing scalar values).
    pub fn compare_strings(self, left: &str, right: &str) -> bool {
        self.holds(left.cmp(right))
    }

    /// Only `=` and `!=` are defined on booleans; ordering relations are false.
    pub fn compare_booleans(self, left: bool, right: bool) -> bool {
        match self {
            Relation::Eq => left == right,
            Relation::Ne => left != right,
            _ => false,
        }
    }

    /// Whether an ordering outcome satisfies the relation.
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            Relation::Eq => ord == Ordering::Equal,
            Relation::Ne => ord != Ordering::Equal,
            Relation::Lt => ord == Ordering::Less,
            Relation::Le => ord != Ordering::Greater,
            Relation::Gt => ord == Ordering::Greater,
            Relation::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
