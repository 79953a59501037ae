use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use fincontract_db::models::contract::{
    AnalysisDigest, Contract, ContractAnalysis, ContractListing, ContractStatus,
};
use fincontract_db::repositories::contract_repo::ContractRepository;
use fincontract_shared::analysis::{AnalysisReport, RiskLevel};
use fincontract_shared::contracts::{
    AnalysisView, ContractDetail, ContractSummary, DashboardSummary, RecentAlert, RiskBucket,
    TrendPoint, UploadContractRequest,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::analysis_service::AnalysisBackend;
use crate::utils::format_analysis_text;

/// Storage the contract workspace needs.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        file_name: Option<&str>,
        contract_type: &str,
        content: &str,
    ) -> Result<Contract>;
    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Contract>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ContractListing>>;
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64>;
    async fn update_status(&self, id: Uuid, status: ContractStatus) -> Result<()>;
    /// Stores the analysis and marks the contract `analyzed`, all or nothing.
    async fn save_analysis(
        &self,
        contract: &Contract,
        report: &AnalysisReport,
        model: &str,
    ) -> Result<ContractAnalysis>;
    async fn latest_analysis(&self, contract_id: Uuid) -> Result<Option<ContractAnalysis>>;
    /// Every analysis of the user's contracts, newest first.
    async fn list_digests(&self, user_id: Uuid) -> Result<Vec<AnalysisDigest>>;
    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
impl ContractStore for ContractRepository {
    async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        file_name: Option<&str>,
        contract_type: &str,
        content: &str,
    ) -> Result<Contract> {
        ContractRepository::create(self, user_id, title, file_name, contract_type, content).await
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Contract>> {
        ContractRepository::get_for_user(self, id, user_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ContractListing>> {
        ContractRepository::list_for_user(self, user_id).await
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        ContractRepository::count_for_user(self, user_id).await
    }

    async fn update_status(&self, id: Uuid, status: ContractStatus) -> Result<()> {
        ContractRepository::update_status(self, id, status).await
    }

    async fn save_analysis(
        &self,
        contract: &Contract,
        report: &AnalysisReport,
        model: &str,
    ) -> Result<ContractAnalysis> {
        ContractRepository::save_analysis(self, contract, report, model).await
    }

    async fn latest_analysis(&self, contract_id: Uuid) -> Result<Option<ContractAnalysis>> {
        ContractRepository::latest_analysis(self, contract_id).await
    }

    async fn list_digests(&self, user_id: Uuid) -> Result<Vec<AnalysisDigest>> {
        ContractRepository::list_digests(self, user_id).await
    }

    async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        ContractRepository::delete_for_user(self, id, user_id).await
    }
}

pub const MAX_CONTRACT_CHARS: usize = 200_000;
pub const MAX_TITLE_CHARS: usize = 200;
const RECENT_ALERT_LIMIT: usize = 10;
const TREND_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidUpload {
    pub title: String,
    pub file_name: Option<String>,
    pub contract_type: String,
    pub content: String,
}

pub fn validate_upload(req: UploadContractRequest) -> Result<ValidUpload, ApiError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::BadRequest("Title is too long".to_string()));
    }
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Contract content is empty".to_string()));
    }
    if req.content.chars().count() > MAX_CONTRACT_CHARS {
        return Err(ApiError::BadRequest("Contract too large".to_string()));
    }

    let contract_type = req
        .contract_type
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "general".to_string());

    Ok(ValidUpload {
        title: title.to_string(),
        file_name: req
            .file_name
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty()),
        contract_type,
        content: req.content,
    })
}

/// Clamps whatever the backend returned into the stored range.
pub fn normalize_report(mut report: AnalysisReport) -> AnalysisReport {
    report.risk_score = report.risk_score.clamp(0, 100);
    report.red_flags.retain(|f| !f.trim().is_empty());
    report.suggestions.retain(|s| !s.trim().is_empty());
    report
}

fn summary_from_contract(contract: &Contract, analysis: Option<&ContractAnalysis>) -> ContractSummary {
    ContractSummary {
        id: contract.id,
        title: contract.title.clone(),
        file_name: contract.file_name.clone(),
        contract_type: contract.contract_type.clone(),
        status: contract.status.clone(),
        risk_score: analysis.map(|a| a.risk_score),
        risk_level: analysis.map(|a| a.level()),
        created_at: contract.created_at,
    }
}

fn summary_from_listing(row: ContractListing) -> ContractSummary {
    ContractSummary {
        id: row.id,
        title: row.title,
        file_name: row.file_name,
        contract_type: row.contract_type,
        status: row.status,
        risk_score: row.risk_score,
        risk_level: row.risk_level.as_deref().map(RiskLevel::from),
        created_at: row.created_at,
    }
}

fn analysis_view(analysis: &ContractAnalysis) -> AnalysisView {
    let report = analysis.report();
    let summary_html = format_analysis_text(&report.summary);
    AnalysisView {
        risk_level: analysis.level(),
        model: analysis.model.clone(),
        created_at: analysis.created_at,
        report,
        summary_html,
    }
}

/// Months from `TREND_MONTHS - 1` months ago up to the month of `now`, as `YYYY-MM`.
fn trend_months(now: DateTime<Utc>) -> Vec<String> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..TREND_MONTHS as i32)
        .rev()
        .map(|back| {
            let idx = current - back;
            format!("{:04}-{:02}", idx.div_euclid(12), idx.rem_euclid(12) + 1)
        })
        .collect()
}

/// Builds the dashboard from every analysis the user ran (newest first).
/// Distribution, average and alerts use only the latest analysis per contract;
/// the trend counts every analysis.
pub fn summarize_dashboard(
    total_contracts: i64,
    digests: &[AnalysisDigest],
    now: DateTime<Utc>,
) -> DashboardSummary {
    let mut seen = HashSet::new();
    let latest: Vec<&AnalysisDigest> = digests
        .iter()
        .filter(|d| seen.insert(d.contract_id))
        .collect();

    let mut counts: BTreeMap<RiskLevel, i64> = RiskLevel::ALL.iter().map(|l| (*l, 0)).collect();
    for d in &latest {
        *counts.entry(RiskLevel::from_score(d.risk_score)).or_default() += 1;
    }

    let average_risk = if latest.is_empty() {
        None
    } else {
        let sum: i64 = latest.iter().map(|d| i64::from(d.risk_score)).sum();
        Some(sum as f64 / latest.len() as f64)
    };

    let recent_alerts = latest
        .iter()
        .flat_map(|d| {
            d.compliance_alerts.0.iter().map(move |alert| RecentAlert {
                contract_id: d.contract_id,
                contract_title: d.contract_title.clone(),
                alert: alert.clone(),
                raised_at: d.created_at,
            })
        })
        .take(RECENT_ALERT_LIMIT)
        .collect();

    let mut buckets: BTreeMap<String, (i64, i64)> =
        trend_months(now).into_iter().map(|m| (m, (0, 0))).collect();
    for d in digests {
        let key = d.created_at.format("%Y-%m").to_string();
        if let Some((count, sum)) = buckets.get_mut(&key) {
            *count += 1;
            *sum += i64::from(d.risk_score);
        }
    }
    let trend = buckets
        .into_iter()
        .map(|(month, (count, sum))| TrendPoint {
            month,
            analyses: count,
            average_risk: if count == 0 { 0.0 } else { sum as f64 / count as f64 },
        })
        .collect();

    DashboardSummary {
        total_contracts,
        analyzed_contracts: latest.len() as i64,
        average_risk,
        risk_distribution: counts
            .into_iter()
            .map(|(level, count)| RiskBucket { level, count })
            .collect(),
        recent_alerts,
        trend,
    }
}

#[derive(Clone)]
pub struct ContractService {
    repo: Arc<dyn ContractStore>,
    backend: Arc<dyn AnalysisBackend>,
}

impl ContractService {
    pub fn new(repo: Arc<dyn ContractStore>, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self { repo, backend }
    }

    pub async fn upload(
        &self,
        user_id: Uuid,
        req: UploadContractRequest,
    ) -> Result<ContractSummary, ApiError> {
        let upload = validate_upload(req)?;
        let contract = self
            .repo
            .create(
                user_id,
                &upload.title,
                upload.file_name.as_deref(),
                &upload.contract_type,
                &upload.content,
            )
            .await?;
        tracing::info!("User {} uploaded contract {} ({})", user_id, contract.id, contract.contract_type);
        Ok(summary_from_contract(&contract, None))
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ContractSummary>, ApiError> {
        let rows = self.repo.list_for_user(user_id).await?;
        Ok(rows.into_iter().map(summary_from_listing).collect())
    }

    async fn owned(&self, user_id: Uuid, id: Uuid) -> Result<Contract, ApiError> {
        self.repo
            .get_for_user(id, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Contract not found".to_string()))
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<ContractDetail, ApiError> {
        let contract = self.owned(user_id, id).await?;
        let analysis = self.repo.latest_analysis(contract.id).await?;
        Ok(ContractDetail {
            contract: summary_from_contract(&contract, analysis.as_ref()),
            content: contract.content,
            analysis: analysis.as_ref().map(analysis_view),
        })
    }

    pub async fn analyze(&self, user_id: Uuid, id: Uuid) -> Result<AnalysisView, ApiError> {
        let contract = self.owned(user_id, id).await?;
        self.repo.update_status(contract.id, ContractStatus::Analyzing).await?;

        let report = match self
            .backend
            .analyze(&contract.title, &contract.contract_type, &contract.content)
            .await
        {
            Ok(report) => normalize_report(report),
            Err(e) => {
                tracing::error!("Analysis of contract {} failed: {:#}", contract.id, e);
                self.mark_failed(contract.id).await;
                return Err(ApiError::Upstream("Analysis failed".to_string()));
            }
        };

        let analysis = match self
            .repo
            .save_analysis(&contract, &report, self.backend.model_name())
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::error!("Could not store analysis of contract {}: {:#}", contract.id, e);
                self.mark_failed(contract.id).await;
                return Err(ApiError::Internal(e));
            }
        };
        tracing::info!(
            "Contract {} analysed: score {} ({})",
            contract.id,
            analysis.risk_score,
            analysis.risk_level
        );
        Ok(analysis_view(&analysis))
    }

    async fn mark_failed(&self, id: Uuid) {
        if let Err(e) = self.repo.update_status(id, ContractStatus::Failed).await {
            tracing::warn!("Could not mark contract {} as failed: {:#}", id, e);
        }
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if self.repo.delete_for_user(id, user_id).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound("Contract not found".to_string()))
        }
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<DashboardSummary, ApiError> {
        let total = self.repo.count_for_user(user_id).await?;
        let digests = self.repo.list_digests(user_id).await?;
        Ok(summarize_dashboard(total, &digests, Utc::now()))
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use sqlx::types::Json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Tables {
        contracts: Vec<Contract>,
        analyses: Vec<ContractAnalysis>,
        fail_saves: bool,
    }

    #[derive(Default)]
    pub struct MemoryContractStore {
        tables: Mutex<Tables>,
    }

    impl MemoryContractStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_saves(&self) {
            self.tables.lock().unwrap().fail_saves = true;
        }

        pub fn status_of(&self, id: Uuid) -> Option<String> {
            let tables = self.tables.lock().unwrap();
            tables.contracts.iter().find(|c| c.id == id).map(|c| c.status.clone())
        }

        pub fn analysis_count(&self, contract_id: Uuid) -> usize {
            let tables = self.tables.lock().unwrap();
            tables.analyses.iter().filter(|a| a.contract_id == contract_id).count()
        }
    }

    fn latest_for(analyses: &[ContractAnalysis], contract_id: Uuid) -> Option<&ContractAnalysis> {
        analyses
            .iter()
            .filter(|a| a.contract_id == contract_id)
            .max_by_key(|a| (a.created_at, a.id))
    }

    #[async_trait]
    impl ContractStore for MemoryContractStore {
        async fn create(
            &self,
            user_id: Uuid,
            title: &str,
            file_name: Option<&str>,
            contract_type: &str,
            content: &str,
        ) -> Result<Contract> {
            let now = Utc::now();
            let contract = Contract {
                id: Uuid::new_v4(),
                user_id,
                title: title.to_string(),
                file_name: file_name.map(str::to_string),
                contract_type: contract_type.to_string(),
                content: content.to_string(),
                status: ContractStatus::Uploaded.to_string(),
                created_at: now,
                updated_at: now,
            };
            self.tables.lock().unwrap().contracts.push(contract.clone());
            Ok(contract)
        }

        async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Contract>> {
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .contracts
                .iter()
                .find(|c| c.id == id && c.user_id == user_id)
                .cloned())
        }

        async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ContractListing>> {
            let tables = self.tables.lock().unwrap();
            let mut rows: Vec<ContractListing> = tables
                .contracts
                .iter()
                .filter(|c| c.user_id == user_id)
                .map(|c| {
                    let latest = latest_for(&tables.analyses, c.id);
                    ContractListing {
                        id: c.id,
                        title: c.title.clone(),
                        file_name: c.file_name.clone(),
                        contract_type: c.contract_type.clone(),
                        status: c.status.clone(),
                        created_at: c.created_at,
                        risk_score: latest.map(|a| a.risk_score),
                        risk_level: latest.map(|a| a.risk_level.clone()),
                    }
                })
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
            let tables = self.tables.lock().unwrap();
            Ok(tables.contracts.iter().filter(|c| c.user_id == user_id).count() as i64)
        }

        async fn update_status(&self, id: Uuid, status: ContractStatus) -> Result<()> {
            let mut tables = self.tables.lock().unwrap();
            if let Some(c) = tables.contracts.iter_mut().find(|c| c.id == id) {
                c.status = status.to_string();
                c.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn save_analysis(
            &self,
            contract: &Contract,
            report: &AnalysisReport,
            model: &str,
        ) -> Result<ContractAnalysis> {
            let mut tables = self.tables.lock().unwrap();
            if tables.fail_saves {
                anyhow::bail!("Failed to insert contract analysis");
            }
            let analysis = ContractAnalysis {
                id: tables.analyses.len() as i64 + 1,
                contract_id: contract.id,
                user_id: contract.user_id,
                risk_score: report.risk_score,
                risk_level: RiskLevel::from_score(report.risk_score).as_str().to_string(),
                summary: report.summary.clone(),
                red_flags: Json(report.red_flags.clone()),
                suggestions: Json(report.suggestions.clone()),
                compliance_alerts: Json(report.compliance_alerts.clone()),
                model: model.to_string(),
                created_at: Utc::now(),
            };
            tables.analyses.push(analysis.clone());
            if let Some(c) = tables.contracts.iter_mut().find(|c| c.id == contract.id) {
                c.status = ContractStatus::Analyzed.to_string();
            }
            Ok(analysis)
        }

        async fn latest_analysis(&self, contract_id: Uuid) -> Result<Option<ContractAnalysis>> {
            let tables = self.tables.lock().unwrap();
            Ok(latest_for(&tables.analyses, contract_id).cloned())
        }

        async fn list_digests(&self, user_id: Uuid) -> Result<Vec<AnalysisDigest>> {
            let tables = self.tables.lock().unwrap();
            let mut digests: Vec<AnalysisDigest> = tables
                .analyses
                .iter()
                .filter(|a| a.user_id == user_id)
                .filter_map(|a| {
                    let contract = tables.contracts.iter().find(|c| c.id == a.contract_id)?;
                    Some(AnalysisDigest {
                        contract_id: a.contract_id,
                        contract_title: contract.title.clone(),
                        risk_score: a.risk_score,
                        compliance_alerts: a.compliance_alerts.clone(),
                        created_at: a.created_at,
                    })
                })
                .collect();
            digests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(digests)
        }

        async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
            let mut tables = self.tables.lock().unwrap();
            let before = tables.contracts.len();
            tables.contracts.retain(|c| !(c.id == id && c.user_id == user_id));
            let deleted = tables.contracts.len() != before;
            if deleted {
                tables.analyses.retain(|a| a.contract_id != id);
            }
            Ok(deleted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fincontract_shared::analysis::{AlertSeverity, ComplianceAlert};
    use sqlx::types::Json;

    use super::memory::MemoryContractStore;
    use crate::services::analysis_service::DemoAnalysis;

    struct UnreachableBackend;

    #[async_trait]
    impl AnalysisBackend for UnreachableBackend {
        fn model_name(&self) -> &str {
            "hosted"
        }

        async fn analyze(&self, _: &str, _: &str, _: &str) -> Result<AnalysisReport> {
            anyhow::bail!("connection refused")
        }
    }

    async fn uploaded(
        store: &Arc<MemoryContractStore>,
        backend: Arc<dyn AnalysisBackend>,
    ) -> (ContractService, Uuid, Uuid) {
        let service = ContractService::new(store.clone(), backend);
        let user = Uuid::new_v4();
        let summary = service
            .upload(user, upload("Loan facility", "The borrower shall repay on demand."))
            .await
            .unwrap();
        (service, user, summary.id)
    }

    fn upload(title: &str, content: &str) -> UploadContractRequest {
        UploadContractRequest {
            title: title.to_string(),
            file_name: Some("  ".to_string()),
            contract_type: Some(" Trading ".to_string()),
            content: content.to_string(),
        }
    }

    fn digest(contract: u128, score: i32, at: DateTime<Utc>, alerts: usize) -> AnalysisDigest {
        AnalysisDigest {
            contract_id: Uuid::from_u128(contract),
            contract_title: format!("Contract {}", contract),
            risk_score: score,
            compliance_alerts: Json(
                (0..alerts)
                    .map(|i| ComplianceAlert {
                        regulation: format!("REG-{}", i),
                        severity: AlertSeverity::Warning,
                        message: "check".to_string(),
                    })
                    .collect(),
            ),
            created_at: at,
        }
    }

    #[test]
    fn upload_is_normalized() {
        let valid = validate_upload(upload("  ISDA Master  ", "text")).unwrap();
        assert_eq!(valid.title, "ISDA Master");
        assert_eq!(valid.contract_type, "trading");
        assert_eq!(valid.file_name, None);
    }

    #[test]
    fn upload_rejects_empty_and_oversized() {
        assert!(matches!(validate_upload(upload(" ", "text")), Err(ApiError::BadRequest(_))));
        assert!(matches!(validate_upload(upload("T", "   ")), Err(ApiError::BadRequest(_))));
        let huge = "x".repeat(MAX_CONTRACT_CHARS + 1);
        assert!(matches!(validate_upload(upload("T", &huge)), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn report_scores_are_clamped() {
        let report = AnalysisReport {
            risk_score: 140,
            summary: String::new(),
            red_flags: vec!["a".into(), " ".into()],
            suggestions: vec![],
            compliance_alerts: vec![],
        };
        let normalized = normalize_report(report);
        assert_eq!(normalized.risk_score, 100);
        assert_eq!(normalized.red_flags, vec!["a".to_string()]);

        let negative = normalize_report(AnalysisReport { risk_score: -4, ..normalized });
        assert_eq!(negative.risk_score, 0);
    }

    #[test]
    fn trend_months_cross_year_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).unwrap();
        assert_eq!(
            trend_months(now),
            vec!["2025-09", "2025-10", "2025-11", "2025-12", "2026-01", "2026-02"]
        );
    }

    #[test]
    fn dashboard_uses_latest_analysis_per_contract() {
        let now = Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        let digests = vec![
            digest(1, 85, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap(), 1),
            digest(2, 20, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap(), 0),
            digest(1, 40, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(), 3),
        ];

        let summary = summarize_dashboard(3, &digests, now);
        assert_eq!(summary.total_contracts, 3);
        assert_eq!(summary.analyzed_contracts, 2);
        assert_eq!(summary.average_risk, Some(52.5));

        let count = |level: RiskLevel| {
            summary
                .risk_distribution
                .iter()
                .find(|b| b.level == level)
                .map(|b| b.count)
                .unwrap()
        };
        assert_eq!(count(RiskLevel::Critical), 1);
        assert_eq!(count(RiskLevel::Low), 1);
        assert_eq!(count(RiskLevel::Medium), 0);
        assert_eq!(summary.risk_distribution.len(), 4);

        // Superseded analysis alerts are not reported.
        assert_eq!(summary.recent_alerts.len(), 1);

        assert_eq!(summary.trend.len(), 6);
        let march = summary.trend.iter().find(|t| t.month == "2026-03").unwrap();
        assert_eq!(march.analyses, 2);
        assert_eq!(march.average_risk, 52.5);
        let feb = summary.trend.iter().find(|t| t.month == "2026-02").unwrap();
        assert_eq!(feb.analyses, 1);
    }

    #[test]
    fn dashboard_caps_recent_alerts() {
        let now = Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        let digests: Vec<_> = (0..5).map(|i| digest(i, 50, now, 4)).collect();
        let summary = summarize_dashboard(5, &digests, now);
        assert_eq!(summary.recent_alerts.len(), RECENT_ALERT_LIMIT);
    }

    #[test]
    fn empty_dashboard() {
        let summary = summarize_dashboard(0, &[], Utc::now());
        assert_eq!(summary.average_risk, None);
        assert!(summary.recent_alerts.is_empty());
        assert!(summary.trend.iter().all(|t| t.analyses == 0));
    }
    #[tokio::test]
    async fn analyze_stores_report_and_marks_analyzed() {
        let store = Arc::new(MemoryContractStore::new());
        let (service, user, id) = uploaded(&store, Arc::new(DemoAnalysis)).await;

        let view = service.analyze(user, id).await.unwrap();
        assert_eq!(view.model, "demo");
        assert_eq!(store.status_of(id).as_deref(), Some("analyzed"));
        assert_eq!(store.analysis_count(id), 1);

        let detail = service.get(user, id).await.unwrap();
        assert_eq!(detail.contract.risk_score, Some(view.report.risk_score));
        assert!(detail.analysis.is_some());
    }

    #[tokio::test]
    async fn backend_failure_marks_contract_failed() {
        let store = Arc::new(MemoryContractStore::new());
        let (service, user, id) = uploaded(&store, Arc::new(UnreachableBackend)).await;

        let err = service.analyze(user, id).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(ref m) if m == "Analysis failed"));
        assert_eq!(store.status_of(id).as_deref(), Some("failed"));
        assert_eq!(store.analysis_count(id), 0);
    }

    #[tokio::test]
    async fn storage_failure_marks_contract_failed() {
        let store = Arc::new(MemoryContractStore::new());
        let (service, user, id) = uploaded(&store, Arc::new(DemoAnalysis)).await;
        store.fail_saves();

        let err = service.analyze(user, id).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(store.status_of(id).as_deref(), Some("failed"));
        assert_eq!(store.analysis_count(id), 0);
    }

    #[tokio::test]
    async fn other_users_cannot_analyze_or_delete() {
        let store = Arc::new(MemoryContractStore::new());
        let (service, _, id) = uploaded(&store, Arc::new(DemoAnalysis)).await;
        let stranger = Uuid::new_v4();

        assert!(matches!(service.analyze(stranger, id).await, Err(ApiError::NotFound(_))));
        assert!(matches!(service.delete(stranger, id).await, Err(ApiError::NotFound(_))));
        assert_eq!(store.status_of(id).as_deref(), Some("uploaded"));
    }
}
