use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Processor status flags a conditional branch can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Flag {
    N,
    V,
    C,
    Z,
}

/// Condition keywords accepted in a test, e.g. `if (not carry)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Condition {
    Plus,
    Positive,
    Greater,
    Minus,
    Negative,
    Less,
    Overflow,
    Carry,
    Nonzero,
    Set,
    True,
    #[strum(to_string = "one", serialize = "1")]
    One,
    Equal,
    #[strum(to_string = "zero", serialize = "0")]
    Zero,
    False,
    Unset,
    Clear,
}

impl Condition {
    /// The flag this keyword tests and the flag state under which it holds.
    pub fn flag(self) -> (Flag, bool) {
        use Condition::*;
        match self {
            Plus | Positive | Greater => (Flag::N, false),
            Minus | Negative | Less => (Flag::N, true),
            Overflow => (Flag::V, true),
            Carry => (Flag::C, true),
            Nonzero | Set | True | One => (Flag::Z, false),
            Equal | Zero | False | Unset | Clear => (Flag::Z, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Polarity {
    #[default]
    #[strum(to_string = "is", serialize = "has")]
    Is,
    #[strum(to_string = "not", serialize = "no")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Distance {
    #[default]
    Near,
    Far,
}

/// A full branch test: `[near|far] [is|has|no|not] condition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub distance: Distance,
    pub polarity: Polarity,
    pub cond: Condition,
}

impl Test {
    pub fn new(cond: Condition) -> Self {
        Self {
            distance: Distance::Near,
            polarity: Polarity::Is,
            cond,
        }
    }

    pub fn far(mut self) -> Self {
        self.distance = Distance::Far;
        self
    }

    pub fn not(mut self) -> Self {
        self.polarity = match self.polarity {
            Polarity::Is => Polarity::Not,
            Polarity::Not => Polarity::Is,
        };
        self
    }

    /// Flag and the state it must have for the whole test to hold.
    pub fn flag(&self) -> (Flag, bool) {
        let (flag, state) = self.cond.flag();
        match self.polarity {
            Polarity::Is => (flag, state),
            Polarity::Not => (flag, !state),
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.distance == Distance::Far {
            write!(f, "far ")?;
        }
        if self.polarity == Polarity::Not {
            write!(f, "not ")?;
        }
        write!(f, "{}", self.cond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!("positive".parse::<Condition>(), Ok(Condition::Positive));
        assert_eq!("1".parse::<Condition>(), Ok(Condition::One));
        assert_eq!("0".parse::<Condition>(), Ok(Condition::Zero));
        assert_eq!("no".parse::<Polarity>(), Ok(Polarity::Not));
        assert_eq!("has".parse::<Polarity>(), Ok(Polarity::Is));
        assert_eq!("FAR".parse::<Distance>(), Ok(Distance::Far));
    }

    #[test]
    fn negation_flips_flag_state() {
        assert_eq!(Test::new(Condition::Carry).flag(), (Flag::C, true));
        assert_eq!(Test::new(Condition::Carry).not().flag(), (Flag::C, false));
        assert_eq!(Test::new(Condition::Unset).flag(), (Flag::Z, true));
        assert_eq!(Test::new(Condition::Set).not().flag(), (Flag::Z, true));
    }

    #[test]
    fn display() {
        assert_eq!(Test::new(Condition::Overflow).far().not().to_string(), "far not overflow");
        assert_eq!(Test::new(Condition::Zero).to_string(), "zero");
    }
}
