use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Registers a `switch` can select on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Reg {
    A,
    X,
    Y,
}

impl Reg {
    /// Accepts `x` as well as the qualified `reg.x`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let name = s
            .strip_prefix("reg.")
            .or_else(|| s.strip_prefix("REG."))
            .unwrap_or(s);
        match name.parse::<Self>() {
            Ok(reg) => Ok(reg),
            Err(_) => Err(format!("Unknown reg name: {s}")),
        }
    }
}

#[test]
fn test() {
    assert_eq!(Reg::parse("x"), Ok(Reg::X));
    assert_eq!(Reg::parse("reg.y"), Ok(Reg::Y));
    assert_eq!(Reg::parse("A"), Ok(Reg::A));
    assert!(Reg::parse("hoge").is_err());
}
