use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::id::{FlagId, TransactionId};

/// The fixed set of detection rules a flag can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    DigitalAllowance,
    SmurfCash,
    TitheTrap,
    RoundNumber,
    GhostAsset,
}

impl RuleId {
    pub const ALL: [RuleId; 5] = [
        RuleId::DigitalAllowance,
        RuleId::SmurfCash,
        RuleId::TitheTrap,
        RuleId::RoundNumber,
        RuleId::GhostAsset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::DigitalAllowance => "DIGITAL_ALLOWANCE",
            RuleId::SmurfCash => "SMURF_CASH",
            RuleId::TitheTrap => "TITHE_TRAP",
            RuleId::RoundNumber => "ROUND_NUMBER",
            RuleId::GhostAsset => "GHOST_ASSET",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleId::DigitalAllowance => "Potential Sanctionable Transfer",
            RuleId::SmurfCash => "Structured Cash Withdrawal",
            RuleId::TitheTrap => "Sanctionable Transfer (Charity)",
            RuleId::RoundNumber => "Potential Informal Care Agreement",
            RuleId::GhostAsset => "Undisclosed Asset Alert",
        }
    }

    /// Static guidance shown to the caseworker next to every flag of this rule.
    pub fn caseworker_insight(self) -> &'static str {
        match self {
            RuleId::DigitalAllowance => "Review for pattern of gifting. Request explanation.",
            RuleId::SmurfCash => "Unverified cash is presumed a gift. Receipts required.",
            RuleId::TitheTrap => "Strictly unallowable. Must be added to penalty divisor.",
            RuleId::RoundNumber => "Flagged as 'Round Number'. Require Contract.",
            RuleId::GhostAsset => "Client transferring funds to hidden account. Denial risk.",
        }
    }

    pub fn risk_level(self) -> RiskLevel {
        match self {
            RuleId::DigitalAllowance | RuleId::TitheTrap | RuleId::GhostAsset => RiskLevel::High,
            RuleId::SmurfCash | RuleId::RoundNumber => RiskLevel::Medium,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown rule id: '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    None,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::None => write!(f, "NONE"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HIGH" => Ok(RiskLevel::High),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "LOW" => Ok(RiskLevel::Low),
            "NONE" => Ok(RiskLevel::None),
            other => Err(format!("Unknown risk level: '{other}'")),
        }
    }
}

/// Reviewer decision on a flag. Only a review action moves a flag off `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagStatus {
    #[default]
    Pending,
    Confirmed,
    Ignored,
    Safe,
}

impl FlagStatus {
    /// Ignored and safe flags drop out of the exposure total.
    pub fn counts_toward_exposure(self) -> bool {
        matches!(self, FlagStatus::Pending | FlagStatus::Confirmed)
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagStatus::Pending => write!(f, "PENDING"),
            FlagStatus::Confirmed => write!(f, "CONFIRMED"),
            FlagStatus::Ignored => write!(f, "IGNORED"),
            FlagStatus::Safe => write!(f, "SAFE"),
        }
    }
}

impl std::str::FromStr for FlagStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(FlagStatus::Pending),
            "CONFIRMED" => Ok(FlagStatus::Confirmed),
            "IGNORED" => Ok(FlagStatus::Ignored),
            "SAFE" => Ok(FlagStatus::Safe),
            other => Err(format!("Unknown flag status: '{other}'")),
        }
    }
}

/// One potential violation: a single transaction matched by a single rule.
///
/// `transaction_id` is a lookup key into the session's transactions, never
/// an embedded copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFlag {
    pub id: FlagId,
    pub transaction_id: TransactionId,
    pub rule_id: RuleId,
    pub risk_level: RiskLevel,
    pub label: String,
    pub description: String,
    pub caseworker_insight: String,
    pub status: FlagStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AuditFlag {
    /// A fresh `Pending` flag carrying the rule's static label and guidance.
    pub fn pending(transaction_id: TransactionId, rule_id: RuleId, description: String) -> Self {
        AuditFlag {
            id: FlagId::new(),
            transaction_id,
            rule_id,
            risk_level: rule_id.risk_level(),
            label: rule_id.label().to_string(),
            description,
            caseworker_insight: rule_id.caseworker_insight().to_string(),
            status: FlagStatus::Pending,
            notes: None,
        }
    }

    pub fn is_reviewed(&self) -> bool {
        self.status != FlagStatus::Pending || self.notes.is_some()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReviewError {
    #[error("Flag not found: {0}")]
    FlagNotFound(FlagId),
}

/// Record a reviewer decision on one flag. Empty notes clear the field.
pub fn review(
    flags: &mut [AuditFlag],
    flag_id: FlagId,
    status: FlagStatus,
    notes: Option<String>,
) -> Result<&AuditFlag, ReviewError> {
    let flag = flags
        .iter_mut()
        .find(|f| f.id == flag_id)
        .ok_or(ReviewError::FlagNotFound(flag_id))?;
    flag.status = status;
    flag.notes = notes.filter(|n| !n.trim().is_empty());
    Ok(flag)
}
