use crate::{Error, Result};
use std::fmt::{Display, Formatter};

/// The maximum nesting depth of a plural expression (parentheses and ternaries).
const MAX_DEPTH: usize = 64;

/// The expression that is used if a catalog does not declare its own plural forms.
const DEFAULT_EXPRESSION: &str = "n != 1";

/// Binary operators of the plural expression language, grouped by precedence (lowest first).
const PRECEDENCE: &[&[(&str, BinaryOp)]] = &[
    &[("||", BinaryOp::Or)],
    &[("&&", BinaryOp::And)],
    &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
    &[
        ("<=", BinaryOp::Le),
        (">=", BinaryOp::Ge),
        ("<", BinaryOp::Lt),
        (">", BinaryOp::Gt),
    ],
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    N,
    Literal(u64),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, n: u64) -> u64 {
        match self {
            Expr::N => n,
            Expr::Literal(value) => *value,
            Expr::Not(inner) => u64::from(inner.eval(n) == 0),
            Expr::Conditional(condition, then, otherwise) => {
                if condition.eval(n) != 0 {
                    then.eval(n)
                } else {
                    otherwise.eval(n)
                }
            }
            Expr::Binary(op, left, right) => {
                let left = left.eval(n);
                // short-circuit like C does
                match op {
                    BinaryOp::Or if left != 0 => return 1,
                    BinaryOp::And if left == 0 => return 0,
                    _ => {}
                }
                let right = right.eval(n);
                match op {
                    BinaryOp::Or | BinaryOp::And => u64::from(right != 0),
                    BinaryOp::Eq => u64::from(left == right),
                    BinaryOp::Ne => u64::from(left != right),
                    BinaryOp::Lt => u64::from(left < right),
                    BinaryOp::Le => u64::from(left <= right),
                    BinaryOp::Gt => u64::from(left > right),
                    BinaryOp::Ge => u64::from(left >= right),
                    BinaryOp::Add => left.wrapping_add(right),
                    BinaryOp::Sub => left.wrapping_sub(right),
                    BinaryOp::Mul => left.wrapping_mul(right),
                    // a division by zero selects the first form instead of trapping
                    BinaryOp::Div => left.checked_div(right).unwrap_or(0),
                    BinaryOp::Rem => left.checked_rem(right).unwrap_or(0),
                }
            }
        }
    }
}

/// Recursive descent parser over the raw expression text.
struct Parser<'a> {
    source: &'a str,
    rest: &'a str,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            rest: source,
            depth: 0,
        }
    }

    fn error(&self, reason: &'static str) -> Error {
        Error::InvalidPluralForms {
            expression: self.source.to_string(),
            reason,
        }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Consumes `token` if the remaining input starts with it.
    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn parse(mut self) -> Result<Expr> {
        let expr = self.conditional()?;
        self.skip_whitespace();
        // tolerate the trailing semicolon of the header value
        let rest = self.rest.trim_end_matches(';').trim();
        if !rest.is_empty() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression is nested too deeply"));
        }

        let condition = self.binary(0)?;
        let expr = if self.eat("?") {
            let then = self.conditional()?;
            if !self.eat(":") {
                return Err(self.error("expected ':' in conditional"));
            }
            let otherwise = self.conditional()?;
            Expr::Conditional(Box::new(condition), Box::new(then), Box::new(otherwise))
        } else {
            condition
        };

        self.depth -= 1;
        Ok(expr)
    }

    fn binary(&mut self, level: usize) -> Result<Expr> {
        let Some(operators) = PRECEDENCE.get(level) else {
            return self.unary();
        };

        let mut left = self.binary(level + 1)?;
        'outer: loop {
            for (token, op) in operators.iter() {
                if self.peek_operator(token) {
                    self.eat(token);
                    let right = self.binary(level + 1)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn peek_operator(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if !self.rest.starts_with(token) {
            return false;
        }
        // '<' and '>' must not swallow the first half of '<=' and '>='
        let next = self.rest[token.len()..].chars().next();
        !(token.len() == 1 && matches!(token, "<" | ">") && next == Some('='))
    }

    fn unary(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        if self.rest.starts_with('!') && !self.rest.starts_with("!=") {
            self.eat("!");
            self.depth += 1;
            if self.depth > MAX_DEPTH {
                return Err(self.error("expression is nested too deeply"));
            }
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        if self.eat("(") {
            let inner = self.conditional()?;
            if !self.eat(")") {
                return Err(self.error("unbalanced parenthesis"));
            }
            return Ok(inner);
        }
        if self.eat("n") {
            return Ok(Expr::N);
        }

        let digits = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if digits == 0 {
            return Err(self.error("expected 'n', a number or '('"));
        }
        let value = self.rest[..digits]
            .parse::<u64>()
            .map_err(|_| self.error("number out of range"))?;
        self.rest = &self.rest[digits..];
        Ok(Expr::Literal(value))
    }
}

/// The rule that selects one of the plural forms of a translation for a given count.
///
/// Rules are written in the C-like expression language of the `Plural-Forms` catalog header,
/// e.g. `nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 && (n%100<10 || n%100>=20) ? 1 : 2);`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralRule {
    source: String,
    forms: Option<usize>,
    expr: Expr,
}

impl PluralRule {
    /// Parses a bare plural expression such as `n != 1`.
    pub fn parse(expression: &str) -> Result<Self> {
        let expr = Parser::new(expression).parse()?;
        Ok(Self {
            source: expression.trim().to_string(),
            forms: None,
            expr,
        })
    }

    /// Parses the value of a `Plural-Forms` header (`nplurals=N; plural=EXPR;`).
    pub fn from_header(value: &str) -> Result<Self> {
        let mut forms = None;
        let mut expression = None;
        for part in value.split(';') {
            let part = part.trim();
            if let Some(count) = part.strip_prefix("nplurals=") {
                forms = count.trim().parse::<usize>().ok();
            } else if let Some(expr) = part.strip_prefix("plural=") {
                expression = Some(expr);
            }
        }

        let Some(expression) = expression else {
            return Err(Error::InvalidPluralForms {
                expression: value.to_string(),
                reason: "missing plural expression",
            });
        };

        let mut rule = Self::parse(expression)?;
        rule.forms = forms;
        Ok(rule)
    }

    /// The index of the plural form that should be used for `n` items.
    pub fn index(&self, n: u64) -> usize {
        usize::try_from(self.expr.eval(n)).unwrap_or(usize::MAX)
    }

    /// The number of plural forms that the catalog declared, if any.
    pub fn forms(&self) -> Option<usize> {
        self.forms
    }
}

impl Default for PluralRule {
    fn default() -> Self {
        Self {
            source: DEFAULT_EXPRESSION.to_string(),
            forms: Some(2),
            expr: Expr::Binary(BinaryOp::Ne, Box::new(Expr::N), Box::new(Expr::Literal(1))),
        }
    }
}

impl Display for PluralRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_germanic() {
        let rule = PluralRule::default();
        assert_eq!(rule.index(0), 1);
        assert_eq!(rule.index(1), 0);
        assert_eq!(rule.index(2), 1);
        assert_eq!(rule, PluralRule::parse("n != 1").unwrap().with_forms(Some(2)));
        assert_eq!(rule.to_string(), "n != 1");
    }

    #[test]
    fn single_form() {
        let rule = PluralRule::from_header("nplurals=1; plural=0;").unwrap();
        assert_eq!(rule.forms(), Some(1));
        assert_eq!(rule.index(0), 0);
        assert_eq!(rule.index(42), 0);
    }

    #[test]
    fn french() {
        let rule = PluralRule::from_header("nplurals=2; plural=(n > 1);").unwrap();
        assert_eq!(rule.index(0), 0);
        assert_eq!(rule.index(1), 0);
        assert_eq!(rule.index(2), 1);
    }

    #[test]
    fn polish() {
        let rule = PluralRule::from_header(
            "nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 && (n%100<10 || n%100>=20) ? 1 : 2);",
        )
        .unwrap();
        assert_eq!(rule.forms(), Some(3));
        assert_eq!(rule.index(1), 0);
        assert_eq!(rule.index(2), 1);
        assert_eq!(rule.index(4), 1);
        assert_eq!(rule.index(5), 2);
        assert_eq!(rule.index(12), 2);
        assert_eq!(rule.index(22), 1);
        assert_eq!(rule.index(25), 2);
    }

    #[test]
    fn negation_and_division() {
        let rule = PluralRule::parse("!(n / 2)").unwrap();
        assert_eq!(rule.index(1), 1);
        assert_eq!(rule.index(2), 0);

        let rule = PluralRule::parse("n % 0").unwrap();
        assert_eq!(rule.index(7), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            PluralRule::parse("n +* 1"),
            Err(Error::InvalidPluralForms { .. })
        ));
        assert!(PluralRule::parse("(n == 1").is_err());
        assert!(PluralRule::parse("n == 1 ? 0").is_err());
        assert!(PluralRule::parse("import os").is_err());
        assert!(PluralRule::from_header("nplurals=2;").is_err());
    }

    #[test]
    fn rejects_deep_nesting() {
        let expression = format!("{}n{}", "(".repeat(100), ")".repeat(100));
        assert!(PluralRule::parse(&expression).is_err());
    }

    impl PluralRule {
        fn with_forms(mut self, forms: Option<usize>) -> Self {
            self.forms = forms;
            self
        }
    }
}
