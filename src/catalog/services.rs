use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Kinds of service a student can book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Tutoring,
    #[serde(alias = "test-prep")]
    TestPrep,
    #[serde(alias = "homework-help")]
    HomeworkHelp,
    Counseling,
}

impl ServiceType {
    pub fn all() -> &'static [ServiceType] {
        &[
            ServiceType::Tutoring,
            ServiceType::TestPrep,
            ServiceType::HomeworkHelp,
            ServiceType::Counseling,
        ]
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceType::Tutoring => "tutoring",
            ServiceType::TestPrep => "test_prep",
            ServiceType::HomeworkHelp => "homework_help",
            ServiceType::Counseling => "counseling",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Tutoring => "1-on-1 Tutoring",
            ServiceType::TestPrep => "Test Preparation",
            ServiceType::HomeworkHelp => "Homework Help",
            ServiceType::Counseling => "Academic Counseling",
        }
    }

    /// Counseling leaves the booking wizard for the counselor flow.
    pub fn uses_counselor_flow(&self) -> bool {
        matches!(self, ServiceType::Counseling)
    }
}

impl Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "tutoring" => Ok(ServiceType::Tutoring),
            "test_prep" => Ok(ServiceType::TestPrep),
            "homework_help" => Ok(ServiceType::HomeworkHelp),
            "counseling" => Ok(ServiceType::Counseling),
            _ => Err(format!("Unknown service type: {}", s)),
        }
    }
}
