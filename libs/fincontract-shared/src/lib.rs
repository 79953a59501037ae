use serde::{Deserialize, Serialize};

/// Body of every failed API call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

pub mod promo {
    use super::*;
    use chrono::{DateTime, Utc};

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RedeemRequest {
        #[serde(default)]
        pub code: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct RedemptionView {
        pub starts_at: DateTime<Utc>,
        pub expires_at: DateTime<Utc>,
        pub plan_id: String,
        pub validity_duration_days: i32,
        pub code: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RedeemResponse {
        pub success: bool,
        pub redemption: RedemptionView,
    }
}

pub mod analysis {
    use super::*;

    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[serde(rename_all = "snake_case")]
    pub enum RiskLevel {
        Low,
        Medium,
        High,
        Critical,
    }

    impl RiskLevel {
        pub const ALL: [RiskLevel; 4] = [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ];

        pub fn from_score(score: i32) -> Self {
            match score {
                s if s < 30 => RiskLevel::Low,
                s if s < 60 => RiskLevel::Medium,
                s if s < 80 => RiskLevel::High,
                _ => RiskLevel::Critical,
            }
        }

        pub fn as_str(&self) -> &'static str {
            match self {
                RiskLevel::Low => "low",
                RiskLevel::Medium => "medium",
                RiskLevel::High => "high",
                RiskLevel::Critical => "critical",
            }
        }
    }

    impl From<&str> for RiskLevel {
        fn from(s: &str) -> Self {
            match s {
                "medium" => RiskLevel::Medium,
                "high" => RiskLevel::High,
                "critical" => RiskLevel::Critical,
                _ => RiskLevel::Low,
            }
        }
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum AlertSeverity {
        Info,
        Warning,
        Critical,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct ComplianceAlert {
        pub regulation: String,
        pub severity: AlertSeverity,
        pub message: String,
    }

    /// What an analysis backend returns for one contract.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct AnalysisReport {
        pub risk_score: i32,
        #[serde(default)]
        pub summary: String,
        #[serde(default)]
        pub red_flags: Vec<String>,
        #[serde(default)]
        pub suggestions: Vec<String>,
        #[serde(default)]
        pub compliance_alerts: Vec<ComplianceAlert>,
    }

    /// Request body sent to the hosted `legal-widgets` function.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AnalyzeContractRequest {
        pub action: String,
        pub contract_type: String,
        pub title: String,
        pub content: String,
    }
}

pub mod contracts {
    use super::analysis::{AnalysisReport, ComplianceAlert, RiskLevel};
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UploadContractRequest {
        pub title: String,
        #[serde(default)]
        pub file_name: Option<String>,
        #[serde(default)]
        pub contract_type: Option<String>,
        pub content: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ContractSummary {
        pub id: Uuid,
        pub title: String,
        pub file_name: Option<String>,
        pub contract_type: String,
        pub status: String,
        pub risk_score: Option<i32>,
        pub risk_level: Option<RiskLevel>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnalysisView {
        pub risk_level: RiskLevel,
        pub model: String,
        pub created_at: DateTime<Utc>,
        #[serde(flatten)]
        pub report: AnalysisReport,
        /// `summary` rendered with bold and line breaks as HTML.
        pub summary_html: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ContractDetail {
        #[serde(flatten)]
        pub contract: ContractSummary,
        pub content: String,
        pub analysis: Option<AnalysisView>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct RiskBucket {
        pub level: RiskLevel,
        pub count: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct TrendPoint {
        /// `YYYY-MM`
        pub month: String,
        pub analyses: i64,
        pub average_risk: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct RecentAlert {
        pub contract_id: Uuid,
        pub contract_title: String,
        #[serde(flatten)]
        pub alert: ComplianceAlert,
        pub raised_at: DateTime<Utc>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct DashboardSummary {
        pub total_contracts: i64,
        pub analyzed_contracts: i64,
        pub average_risk: Option<f64>,
        pub risk_distribution: Vec<RiskBucket>,
        pub recent_alerts: Vec<RecentAlert>,
        pub trend: Vec<TrendPoint>,
    }
}

pub mod billing {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CheckoutRequest {
        pub plan_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CheckoutResponse {
        pub url: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct PlanOffer {
        pub plan_id: String,
        pub checkout_base: String,
    }
}

pub mod audit {
    use super::*;
    use chrono::{DateTime, Utc};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct AuditEntry {
        pub timestamp: DateTime<Utc>,
        pub user_id: String,
        pub action: String,
        pub detail: String,
    }
}

pub mod format {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FormatRequest {
        pub text: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FormatResponse {
        pub html: String,
    }
}
