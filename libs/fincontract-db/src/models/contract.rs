use chrono::{DateTime, Utc};
use fincontract_shared::analysis::{AnalysisReport, ComplianceAlert, RiskLevel};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Uploaded,
    Analyzing,
    Analyzed,
    Failed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Uploaded => "uploaded",
            ContractStatus::Analyzing => "analyzing",
            ContractStatus::Analyzed => "analyzed",
            ContractStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: Option<String>,
    pub contract_type: String,
    pub content: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contract listing row joined with its latest analysis score.
#[derive(Debug, Clone, FromRow)]
pub struct ContractListing {
    pub id: Uuid,
    pub title: String,
    pub file_name: Option<String>,
    pub contract_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub risk_score: Option<i32>,
    pub risk_level: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContractAnalysis {
    pub id: i64,
    pub contract_id: Uuid,
    pub user_id: Uuid,
    pub risk_score: i32,
    pub risk_level: String,
    pub summary: String,
    pub red_flags: Json<Vec<String>>,
    pub suggestions: Json<Vec<String>>,
    pub compliance_alerts: Json<Vec<ComplianceAlert>>,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl ContractAnalysis {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::from(self.risk_level.as_str())
    }

    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            risk_score: self.risk_score,
            summary: self.summary.clone(),
            red_flags: self.red_flags.0.clone(),
            suggestions: self.suggestions.0.clone(),
            compliance_alerts: self.compliance_alerts.0.clone(),
        }
    }
}

/// Analysis row for dashboard aggregation, carrying the contract title.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisDigest {
    pub contract_id: Uuid,
    pub contract_title: String,
    pub risk_score: i32,
    pub compliance_alerts: Json<Vec<ComplianceAlert>>,
    pub created_at: DateTime<Utc>,
}
