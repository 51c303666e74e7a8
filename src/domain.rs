use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ScoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankingDomain {
    #[serde(rename = "Portfolio Optimization")]
    PortfolioOptimization,
    #[serde(rename = "Investment Risk Control")]
    InvestmentRiskControl,
    #[serde(rename = "Fraud Detection")]
    FraudDetection,
    #[serde(rename = "AML Compliance & Control")]
    AmlCompliance,
    #[serde(rename = "Customer Servicing (eKYC/CDD)")]
    CustomerServicing,
    #[serde(rename = "General Banking AI")]
    GeneralBankingAi,
}

impl BankingDomain {
    pub const ALL: [BankingDomain; 6] = [
        BankingDomain::PortfolioOptimization,
        BankingDomain::InvestmentRiskControl,
        BankingDomain::FraudDetection,
        BankingDomain::AmlCompliance,
        BankingDomain::CustomerServicing,
        BankingDomain::GeneralBankingAi,
    ];

    pub const DEFAULT: BankingDomain = BankingDomain::GeneralBankingAi;

    pub fn as_str(&self) -> &'static str {
        match self {
            BankingDomain::PortfolioOptimization => "Portfolio Optimization",
            BankingDomain::InvestmentRiskControl => "Investment Risk Control",
            BankingDomain::FraudDetection => "Fraud Detection",
            BankingDomain::AmlCompliance => "AML Compliance & Control",
            BankingDomain::CustomerServicing => "Customer Servicing (eKYC/CDD)",
            BankingDomain::GeneralBankingAi => "General Banking AI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiDomain {
    #[serde(rename = "LLM SFT")]
    LlmSft,
    #[serde(rename = "RLHF")]
    Rlhf,
    #[serde(rename = "Agent Designing")]
    AgentDesigning,
    #[serde(rename = "Agentic AI Pipeline")]
    AgenticPipeline,
    #[serde(rename = "RAG Systems")]
    RagSystems,
    #[serde(rename = "Predictive Analytics")]
    PredictiveAnalytics,
}

impl AiDomain {
    pub const ALL: [AiDomain; 6] = [
        AiDomain::LlmSft,
        AiDomain::Rlhf,
        AiDomain::AgentDesigning,
        AiDomain::AgenticPipeline,
        AiDomain::RagSystems,
        AiDomain::PredictiveAnalytics,
    ];

    pub const DEFAULT: AiDomain = AiDomain::PredictiveAnalytics;

    pub fn as_str(&self) -> &'static str {
        match self {
            AiDomain::LlmSft => "LLM SFT",
            AiDomain::Rlhf => "RLHF",
            AiDomain::AgentDesigning => "Agent Designing",
            AiDomain::AgenticPipeline => "Agentic AI Pipeline",
            AiDomain::RagSystems => "RAG Systems",
            AiDomain::PredictiveAnalytics => "Predictive Analytics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Methodology {
    #[serde(rename = "Empirical Study")]
    EmpiricalStudy,
    #[serde(rename = "Theoretical Framework")]
    TheoreticalFramework,
    #[serde(rename = "Case Study")]
    CaseStudy,
    #[serde(rename = "Survey/Review")]
    SurveyReview,
    #[serde(rename = "Prototype/Implementation")]
    Prototype,
}

impl Methodology {
    pub const ALL: [Methodology; 5] = [
        Methodology::EmpiricalStudy,
        Methodology::TheoreticalFramework,
        Methodology::CaseStudy,
        Methodology::SurveyReview,
        Methodology::Prototype,
    ];

    pub const DEFAULT: Methodology = Methodology::EmpiricalStudy;

    pub fn as_str(&self) -> &'static str {
        match self {
            Methodology::EmpiricalStudy => "Empirical Study",
            Methodology::TheoreticalFramework => "Theoretical Framework",
            Methodology::CaseStudy => "Case Study",
            Methodology::SurveyReview => "Survey/Review",
            Methodology::Prototype => "Prototype/Implementation",
        }
    }
}

macro_rules! literal_enum {
    ($ty:ident, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ScoutError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .into_iter()
                    .find(|item| item.as_str() == value)
                    .ok_or_else(|| ScoutError::InvalidValue(format!("{}: {value}", $label)))
            }
        }

        impl $ty {
            pub fn coerce(value: Option<&str>) -> $ty {
                value
                    .and_then(|value| value.parse().ok())
                    .unwrap_or($ty::DEFAULT)
            }

            pub fn literals() -> Vec<&'static str> {
                $ty::ALL.iter().map(|item| item.as_str()).collect()
            }
        }
    };
}

literal_enum!(BankingDomain, "banking domain");
literal_enum!(AiDomain, "AI domain");
literal_enum!(Methodology, "methodology");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DateRange {
    Any,
    PastWeek,
    #[default]
    PastMonth,
    PastYear,
    #[value(name = "past-5-years")]
    #[serde(rename = "past-5-years")]
    PastFiveYears,
}

impl DateRange {
    pub fn label(&self) -> &'static str {
        match self {
            DateRange::Any => "any time",
            DateRange::PastWeek => "the past week",
            DateRange::PastMonth => "the past month",
            DateRange::PastYear => "the past year",
            DateRange::PastFiveYears => "the past 5 years",
        }
    }

    pub fn after(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            DateRange::Any => None,
            DateRange::PastWeek => today.checked_sub_days(chrono::Days::new(7)),
            DateRange::PastMonth => today.checked_sub_months(Months::new(1)),
            DateRange::PastYear => today.checked_sub_months(Months::new(12)),
            DateRange::PastFiveYears => today.checked_sub_months(Months::new(60)),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    #[value(name = "openai")]
    OpenAi,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}
