use std::fmt;
use std::str::FromStr;

/// Platform regions and their REST endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Region {
    #[default]
    #[value(name = "EU1")]
    Eu1,
    #[value(name = "EU2")]
    Eu2,
    #[value(name = "US1")]
    Us1,
    #[value(name = "US2")]
    Us2,
    #[value(name = "AP1")]
    Ap1,
    #[value(name = "AP2")]
    Ap2,
    #[value(name = "AP3")]
    Ap3,
}

impl Region {
    pub fn api_url(&self) -> &'static str {
        match self {
            Region::Eu1 => "https://api.coralogix.com",
            Region::Eu2 => "https://api.eu2.coralogix.com",
            Region::Us1 => "https://api.coralogix.us",
            Region::Us2 => "https://api.cx498.coralogix.com",
            Region::Ap1 => "https://api.app.coralogix.in",
            Region::Ap2 => "https://api.coralogixsg.com",
            Region::Ap3 => "https://api.ap3.coralogix.com",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Eu1 => "EU1",
            Region::Eu2 => "EU2",
            Region::Us1 => "US1",
            Region::Us2 => "US2",
            Region::Ap1 => "AP1",
            Region::Ap2 => "AP2",
            Region::Ap3 => "AP3",
        }
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EU1" => Ok(Region::Eu1),
            "EU2" => Ok(Region::Eu2),
            "US1" => Ok(Region::Us1),
            "US2" => Ok(Region::Us2),
            "AP1" => Ok(Region::Ap1),
            "AP2" => Ok(Region::Ap2),
            "AP3" => Ok(Region::Ap3),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
