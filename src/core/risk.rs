//! Project risk register entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    Technical,
    Business,
    Resource,
    Dependency,
}

/// Severity shared by risks and bottleneck alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    #[default]
    Open,
    Mitigating,
    Resolved,
}

/// A tracked project risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub risk_type: RiskType,
    pub severity: Severity,
    pub description: String,
    pub impact: String,
    pub mitigation: String,
    pub owner: String,
    pub status: RiskStatus,
    pub created_at: DateTime<Utc>,
}

impl Risk {
    /// Open and mitigating risks count as current; resolved ones are history.
    pub fn is_current(&self) -> bool {
        self.status != RiskStatus::Resolved
    }
}

/// Risk fields supplied at registration; id and timestamp are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRisk {
    pub risk_type: RiskType,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub mitigation: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub status: RiskStatus,
}

impl NewRisk {
    pub fn new(risk_type: RiskType, severity: Severity, description: &str) -> Self {
        Self {
            risk_type,
            severity,
            description: description.to_string(),
            impact: String::new(),
            mitigation: String::new(),
            owner: String::new(),
            status: RiskStatus::Open,
        }
    }

    pub(crate) fn into_risk(self, now: DateTime<Utc>) -> Risk {
        Risk {
            id: format!("risk-{}", &Uuid::new_v4().simple().to_string()[..12]),
            risk_type: self.risk_type,
            severity: self.severity,
            description: self.description,
            impact: self.impact,
            mitigation: self.mitigation,
            owner: self.owner,
            status: self.status,
            created_at: now,
        }
    }
}

/// Partial risk update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskUpdate {
    pub risk_type: Option<RiskType>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub impact: Option<String>,
    pub mitigation: Option<String>,
    pub owner: Option<String>,
    pub status: Option<RiskStatus>,
}

impl RiskUpdate {
    pub fn status(status: RiskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, risk: &mut Risk) {
        if let Some(v) = self.risk_type {
            risk.risk_type = v;
        }
        if let Some(v) = self.severity {
            risk.severity = v;
        }
        if let Some(v) = self.description {
            risk.description = v;
        }
        if let Some(v) = self.impact {
            risk.impact = v;
        }
        if let Some(v) = self.mitigation {
            risk.mitigation = v;
        }
        if let Some(v) = self.owner {
            risk.owner = v;
        }
        if let Some(v) = self.status {
            risk.status = v;
        }
    }
}
