use sqlx::PgPool;
use sqlx::types::Json;
use anyhow::{Context, Result};
use fincontract_shared::analysis::{AnalysisReport, RiskLevel};
use uuid::Uuid;
use crate::models::contract::{AnalysisDigest, Contract, ContractAnalysis, ContractListing, ContractStatus};

const CONTRACT_COLUMNS: &str = "id, user_id, title, file_name, contract_type, content, status, created_at, updated_at";
const ANALYSIS_COLUMNS: &str = "id, contract_id, user_id, risk_score, risk_level, summary, red_flags, suggestions, compliance_alerts, model, created_at";

#[derive(Debug, Clone)]
pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        file_name: Option<&str>,
        contract_type: &str,
        content: &str,
    ) -> Result<Contract> {
        sqlx::query_as::<_, Contract>(&format!(
            r#"
            INSERT INTO contracts (id, user_id, title, file_name, contract_type, content, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(file_name)
        .bind(contract_type)
        .bind(content)
        .bind(ContractStatus::Uploaded.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create contract")
    }

    pub async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Contract>> {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch contract")
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ContractListing>> {
        sqlx::query_as::<_, ContractListing>(
            r#"
            SELECT c.id, c.title, c.file_name, c.contract_type, c.status, c.created_at,
                   a.risk_score, a.risk_level
            FROM contracts c
            LEFT JOIN LATERAL (
                SELECT risk_score, risk_level
                FROM contract_analyses
                WHERE contract_id = c.id
                ORDER BY created_at DESC
                LIMIT 1
            ) a ON TRUE
            WHERE c.user_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list contracts")
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contracts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count contracts")
    }

    pub async fn update_status(&self, id: Uuid, status: ContractStatus) -> Result<()> {
        sqlx::query("UPDATE contracts SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update contract status")?;
        Ok(())
    }

    /// Stores the analysis and flips the contract to `analyzed` in one transaction.
    pub async fn save_analysis(
        &self,
        contract: &Contract,
        report: &AnalysisReport,
        model: &str,
    ) -> Result<ContractAnalysis> {
        let mut tx = self.pool.begin().await?;

        let level = RiskLevel::from_score(report.risk_score);
        let analysis = sqlx::query_as::<_, ContractAnalysis>(&format!(
            r#"
            INSERT INTO contract_analyses
                (contract_id, user_id, risk_score, risk_level, summary, red_flags, suggestions, compliance_alerts, model)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ANALYSIS_COLUMNS}
            "#
        ))
        .bind(contract.id)
        .bind(contract.user_id)
        .bind(report.risk_score)
        .bind(level.as_str())
        .bind(&report.summary)
        .bind(Json(&report.red_flags))
        .bind(Json(&report.suggestions))
        .bind(Json(&report.compliance_alerts))
        .bind(model)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert contract analysis")?;

        sqlx::query("UPDATE contracts SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(ContractStatus::Analyzed.as_str())
            .bind(contract.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(analysis)
    }

    pub async fn latest_analysis(&self, contract_id: Uuid) -> Result<Option<ContractAnalysis>> {
        sqlx::query_as::<_, ContractAnalysis>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM contract_analyses WHERE contract_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch latest analysis")
    }

    /// Every analysis the user has run, newest first.
    pub async fn list_digests(&self, user_id: Uuid) -> Result<Vec<AnalysisDigest>> {
        sqlx::query_as::<_, AnalysisDigest>(
            r#"
            SELECT a.contract_id, c.title AS contract_title, a.risk_score, a.compliance_alerts, a.created_at
            FROM contract_analyses a
            JOIN contracts c ON c.id = a.contract_id
            WHERE a.user_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch analysis digests")
    }

    pub async fn delete_for_user(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete contract")?;
        Ok(result.rows_affected() > 0)
    }
}
