// Operator tokens as they appear in the `Operator` / `TokenKind` attributes,
// with their surface spelling and constant evaluation.

use std::cmp::Ordering;

use strum::{Display, EnumString, IntoStaticStr};

use crate::domain::value::ConstValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum Operator {
    Equals,
    PlusEquals,
    MinusEquals,
    MultiplyEquals,
    DivideEquals,
    RemainderEquals,
    Plus,
    Minus,
    Multiply,
    Divide,
    Rem,
    Format,
    DotDot,
    Join,
    Isplit,
    Csplit,
    Ireplace,
    Creplace,
    Imatch,
    Cmatch,
    Inotmatch,
    Cnotmatch,
    Ilike,
    Clike,
    Inotlike,
    Cnotlike,
    Ieq,
    Ceq,
    Ine,
    Cne,
    Ige,
    Cge,
    Igt,
    Cgt,
    Ile,
    Cle,
    Ilt,
    Clt,
    Icontains,
    Ccontains,
    Inotcontains,
    Cnotcontains,
    Iin,
    Cin,
    Inotin,
    Cnotin,
    Is,
    IsNot,
    As,
    And,
    Or,
    Xor,
    Band,
    Bor,
    Bxor,
    Bnot,
    Not,
    Exclaim,
    Shl,
    Shr,
    PlusPlus,
    MinusMinus,
    PostfixPlusPlus,
    PostfixMinusMinus,
    Comma,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Operator> {
        token.parse().ok()
    }

    /// Spelling between the operands of a binary or assignment node.
    pub fn binary_text(self) -> Option<&'static str> {
        use Operator::*;
        Some(match self {
            Equals => " = ",
            PlusEquals => " += ",
            MinusEquals => " -= ",
            MultiplyEquals => " *= ",
            DivideEquals => " /= ",
            RemainderEquals => " %= ",
            Plus => " + ",
            Minus => " - ",
            Multiply => " * ",
            Divide => " / ",
            Rem => " % ",
            Format => " -f ",
            DotDot => "..",
            Join => " -join ",
            Isplit => " -split ",
            Csplit => " -csplit ",
            Ireplace => " -replace ",
            Creplace => " -creplace ",
            Imatch => " -match ",
            Cmatch => " -cmatch ",
            Inotmatch => " -notmatch ",
            Cnotmatch => " -cnotmatch ",
            Ilike => " -like ",
            Clike => " -clike ",
            Inotlike => " -notlike ",
            Cnotlike => " -cnotlike ",
            Ieq => " -eq ",
            Ceq => " -ceq ",
            Ine => " -ne ",
            Cne => " -cne ",
            Ige => " -ge ",
            Cge => " -cge ",
            Igt => " -gt ",
            Cgt => " -cgt ",
            Ile => " -le ",
            Cle => " -cle ",
            Ilt => " -lt ",
            Clt => " -clt ",
            Icontains => " -contains ",
            Ccontains => " -ccontains ",
            Inotcontains => " -notcontains ",
            Cnotcontains => " -cnotcontains ",
            Iin => " -in ",
            Cin => " -cin ",
            Inotin => " -notin ",
            Cnotin => " -cnotin ",
            Is => " -is ",
            IsNot => " -isnot ",
            As => " -as ",
            And => " -and ",
            Or => " -or ",
            Xor => " -xor ",
            Band => " -band ",
            Bor => " -bor ",
            Bxor => " -bxor ",
            Shl => " -shl ",
            Shr => " -shr ",
            Bnot | Not | Exclaim | PlusPlus | MinusMinus | PostfixPlusPlus
            | PostfixMinusMinus | Comma => return None,
        })
    }

    /// Spelling of a unary operator and whether it follows its operand.
    pub fn unary_text(self) -> Option<(&'static str, bool)> {
        use Operator::*;
        Some(match self {
            Not => ("-not ", false),
            Exclaim => ("!", false),
            Minus => ("-", false),
            Plus => ("+", false),
            Bnot => ("-bnot ", false),
            Join => ("-join ", false),
            Isplit => ("-split ", false),
            Comma => (",", false),
            PlusPlus => ("++", false),
            MinusMinus => ("--", false),
            PostfixPlusPlus => ("++", true),
            PostfixMinusMinus => ("--", true),
            _ => return None,
        })
    }

    /// Operators that write to their operand.
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            Operator::PlusPlus
                | Operator::MinusMinus
                | Operator::PostfixPlusPlus
                | Operator::PostfixMinusMinus
        )
    }

    pub fn is_comparison(self) -> bool {
        self.comparison().is_some()
    }

    /// Ordering predicate and case sensitivity of a comparison operator.
    fn comparison(self) -> Option<(fn(Ordering) -> bool, bool)> {
        use Operator::*;
        let pred: fn(Ordering) -> bool = match self {
            Ieq | Ceq => |o| o == Ordering::Equal,
            Ine | Cne => |o| o != Ordering::Equal,
            Ige | Cge => |o| o != Ordering::Less,
            Igt | Cgt => |o| o == Ordering::Greater,
            Ile | Cle => |o| o != Ordering::Greater,
            Ilt | Clt => |o| o == Ordering::Less,
            _ => return None,
        };
        let case_sensitive = matches!(self, Ceq | Cne | Cge | Cgt | Cle | Clt);
        Some((pred, case_sensitive))
    }

    /// Evaluates a comparison of two scalar literals. The right operand is
    /// converted to the type of the left one, as the language does.
    pub fn compare(self, left: &ConstValue, right: &ConstValue) -> Option<bool> {
        let (pred, case_sensitive) = self.comparison()?;
        let ordering = match (left, right) {
            (ConstValue::Int(a), b) => a.cmp(&b.to_int()?),
            (ConstValue::Str(a), b) if b.is_scalar() => {
                let b = b.to_string();
                if self.is_equality() {
                    if case_sensitive {
                        a.as_str().cmp(b.as_str())
                    } else {
                        a.to_lowercase().cmp(&b.to_lowercase())
                    }
                } else {
                    culture_order(a, &b, case_sensitive)?
                }
            }
            _ => return None,
        };
        Some(pred(ordering))
    }

    fn is_equality(self) -> bool {
        matches!(self, Operator::Ieq | Operator::Ceq | Operator::Ine | Operator::Cne)
    }

    /// Integer arithmetic folded by the optimizer.
    pub fn eval_int(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Operator::Plus => a.checked_add(b),
            Operator::Minus => a.checked_sub(b),
            Operator::Multiply => a.checked_mul(b),
            Operator::Bxor => Some(a ^ b),
            Operator::Band => Some(a & b),
            Operator::Bor => Some(a | b),
            _ => None,
        }
    }
}

/// String ordering of the culture-aware comparers, for ASCII letters and
/// digits only: letters compare ignoring case, and when that ties a
/// case-sensitive comparison puts lowercase first. Other strings are not
/// ordered.
fn culture_order(a: &str, b: &str, case_sensitive: bool) -> Option<Ordering> {
    let plain = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric());
    if !plain(a) || !plain(b) {
        return None;
    }
    let folded = a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase());
    if !case_sensitive || folded != Ordering::Equal {
        return Some(folded);
    }
    let upper = |s: &str| s.chars().map(|c| c.is_ascii_uppercase()).collect::<Vec<_>>();
    Some(upper(a).cmp(&upper(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!(Operator::parse("Ieq"), Some(Operator::Ieq));
        assert_eq!(Operator::parse("PostfixPlusPlus"), Some(Operator::PostfixPlusPlus));
        assert_eq!(Operator::parse("Bogus"), None);
    }

    #[test]
    fn test_spelling() {
        assert_eq!(Operator::Igt.binary_text(), Some(" -gt "));
        assert_eq!(Operator::Not.binary_text(), None);
        assert_eq!(Operator::PostfixPlusPlus.unary_text(), Some(("++", true)));
    }

    #[test]
    fn test_compare() {
        let five = ConstValue::Int(5);
        let ten = ConstValue::Int(10);
        assert_eq!(Operator::Igt.compare(&five, &ten), Some(false));
        assert_eq!(Operator::Ile.compare(&five, &ten), Some(true));
        let a = ConstValue::Str("ABC".into());
        let b = ConstValue::Str("abc".into());
        assert_eq!(Operator::Ieq.compare(&a, &b), Some(true));
        assert_eq!(Operator::Ceq.compare(&a, &b), Some(false));
        assert_eq!(Operator::Ieq.compare(&five, &ConstValue::Str("5".into())), Some(true));
        assert_eq!(Operator::Plus.compare(&five, &ten), None);
    }

    #[test]
    fn test_string_ordering_follows_culture_rules() {
        let s = |v: &str| ConstValue::Str(v.into());
        assert_eq!(Operator::Clt.compare(&s("ab"), &s("B")), Some(true));
        assert_eq!(Operator::Clt.compare(&s("a"), &s("A")), Some(true));
        assert_eq!(Operator::Igt.compare(&s("b"), &s("A")), Some(true));
        assert_eq!(Operator::Ilt.compare(&s("9"), &s("a")), Some(true));
        assert_eq!(Operator::Ilt.compare(&s("a-b"), &s("ab")), None);
        assert_eq!(Operator::Ieq.compare(&s("a-b"), &s("A-B")), Some(true));
    }
}
