use rand::Rng;
use rand::distr::Alphanumeric;

/// Prefix every generated name carries, so leftovers are easy to find and sweep.
pub const NAME_PREFIX: &str = "tf-acc-test";

#[derive(Debug, Clone, PartialEq)]
pub struct RuleFixture {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsingRuleFixture {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub rule: RuleFixture,
}

pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

fn with_prefix(len: usize) -> String {
    format!("{NAME_PREFIX}-{}", random_string(len))
}

/// A fresh set of names for one acceptance test run.
pub fn random_parsing_rule() -> ParsingRuleFixture {
    ParsingRuleFixture {
        name: with_prefix(10),
        description: random_string(20),
        creator: random_string(8),
        rule: RuleFixture {
            name: with_prefix(10),
            description: random_string(20),
        },
    }
}
