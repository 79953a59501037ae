use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fincontract_shared::analysis::{
    AlertSeverity, AnalysisReport, AnalyzeContractRequest, ComplianceAlert, RiskLevel,
};
use reqwest::Client;

use crate::config::AnalysisConfig;

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Recorded on every stored analysis.
    fn model_name(&self) -> &str;

    async fn analyze(&self, title: &str, contract_type: &str, content: &str) -> Result<AnalysisReport>;
}

/// Calls the hosted `legal-widgets` function.
#[derive(Clone)]
pub struct HostedAnalysisClient {
    client: Client,
    endpoint: String,
    service_key: String,
}

impl HostedAnalysisClient {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build analysis HTTP client")?;

        let endpoint = format!(
            "{}/functions/v1/{}",
            config.base_url.trim_end_matches('/'),
            config.function_name
        );

        Ok(Self {
            client,
            endpoint,
            service_key: config.service_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisBackend for HostedAnalysisClient {
    fn model_name(&self) -> &str {
        "legal-widgets"
    }

    async fn analyze(&self, title: &str, contract_type: &str, content: &str) -> Result<AnalysisReport> {
        let body = AnalyzeContractRequest {
            action: "analyze_contract".to_string(),
            contract_type: contract_type.to_string(),
            title: title.to_string(),
            content: content.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&body)
            .send()
            .await
            .context("Analysis request failed")?
            .error_for_status()
            .context("Analysis function returned an error status")?;

        let report: AnalysisReport = response
            .json()
            .await
            .context("Analysis function returned malformed JSON")?;
        Ok(report)
    }
}

struct ClauseRule {
    needle: &'static str,
    flag: &'static str,
    suggestion: &'static str,
}

const CLAUSE_RULES: &[ClauseRule] = &[
    ClauseRule {
        needle: "unlimited liability",
        flag: "Unlimited liability exposure",
        suggestion: "Negotiate a liability cap tied to the contract value",
    },
    ClauseRule {
        needle: "margin call",
        flag: "Margin call terms allow immediate liquidation",
        suggestion: "Require a written notice period before positions are liquidated",
    },
    ClauseRule {
        needle: "leverage",
        flag: "Leveraged exposure",
        suggestion: "Set an explicit maximum leverage ratio",
    },
    ClauseRule {
        needle: "auto-renew",
        flag: "Automatic renewal",
        suggestion: "Add an opt-out window of at least 30 days before renewal",
    },
    ClauseRule {
        needle: "termination without notice",
        flag: "Counterparty may terminate without notice",
        suggestion: "Ask for a mutual termination notice period",
    },
    ClauseRule {
        needle: "indemnif",
        flag: "Broad indemnification obligations",
        suggestion: "Limit indemnities to third-party claims caused by your breach",
    },
    ClauseRule {
        needle: "penalty",
        flag: "Penalty clauses",
        suggestion: "Replace penalties with capped liquidated damages",
    },
    ClauseRule {
        needle: "binding arbitration",
        flag: "Mandatory binding arbitration",
        suggestion: "Confirm the arbitration seat and rules are acceptable",
    },
    ClauseRule {
        needle: "sole discretion",
        flag: "Unilateral discretion for the counterparty",
        suggestion: "Require decisions to be made reasonably and in good faith",
    },
];

struct RegulationRule {
    needles: &'static [&'static str],
    regulation: &'static str,
    message: &'static str,
}

const REGULATION_RULES: &[RegulationRule] = &[
    RegulationRule {
        needles: &["mifid"],
        regulation: "MiFID II",
        message: "Check best-execution and client categorisation duties",
    },
    RegulationRule {
        needles: &["dodd-frank", "swap"],
        regulation: "Dodd-Frank",
        message: "Swap reporting and clearing obligations may apply",
    },
    RegulationRule {
        needles: &["personal data", "gdpr"],
        regulation: "GDPR",
        message: "Personal data processing terms need a data processing agreement",
    },
];

const TRADING_TYPES: &[&str] = &["trading", "brokerage", "derivatives", "futures"];

/// Local keyword-driven analysis used in demo mode.
#[derive(Debug, Clone, Default)]
pub struct DemoAnalysis;

impl DemoAnalysis {
    pub fn report(&self, title: &str, contract_type: &str, content: &str) -> AnalysisReport {
        let text = content.to_lowercase();

        let matched: Vec<&ClauseRule> = CLAUSE_RULES
            .iter()
            .filter(|rule| text.contains(rule.needle))
            .collect();

        let mut compliance_alerts: Vec<ComplianceAlert> = REGULATION_RULES
            .iter()
            .filter(|rule| rule.needles.iter().any(|n| text.contains(n)))
            .map(|rule| ComplianceAlert {
                regulation: rule.regulation.to_string(),
                severity: AlertSeverity::Warning,
                message: rule.message.to_string(),
            })
            .collect();

        let is_trading = TRADING_TYPES
            .iter()
            .any(|t| contract_type.eq_ignore_ascii_case(t));
        if is_trading && !text.contains("kyc") && !text.contains("anti-money laundering") {
            compliance_alerts.push(ComplianceAlert {
                regulation: "KYC/AML".to_string(),
                severity: AlertSeverity::Critical,
                message: "No KYC or anti-money laundering provisions found".to_string(),
            });
        }

        let risk_score = (15 + 12 * matched.len() as i32).min(100);
        let level = RiskLevel::from_score(risk_score);

        let mut summary = format!(
            "**{}** scored **{}/100** ({} risk).",
            title,
            risk_score,
            level.as_str()
        );
        if matched.is_empty() {
            summary.push_str("\nNo high-risk clauses were detected.");
        } else {
            summary.push_str(&format!("\n{} clause(s) need attention:", matched.len()));
            for rule in &matched {
                summary.push_str(&format!("\n- **{}**", rule.flag));
            }
        }
        if !compliance_alerts.is_empty() {
            summary.push_str(&format!(
                "\n{} compliance alert(s) raised.",
                compliance_alerts.len()
            ));
        }

        AnalysisReport {
            risk_score,
            summary,
            red_flags: matched.iter().map(|r| r.flag.to_string()).collect(),
            suggestions: matched.iter().map(|r| r.suggestion.to_string()).collect(),
            compliance_alerts,
        }
    }
}

#[async_trait]
impl AnalysisBackend for DemoAnalysis {
    fn model_name(&self) -> &str {
        "demo"
    }

    async fn analyze(&self, title: &str, contract_type: &str, content: &str) -> Result<AnalysisReport> {
        Ok(self.report(title, contract_type, content))
    }
}
