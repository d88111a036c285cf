//! Inventory report service
//!
//! Persists reconciliation submissions. A submission is planned by
//! [`shared::reconciliation::plan_report`] and written in a single
//! transaction: the report, its lines and batches, and (only when every line
//! reconciles) the branch stock upserts. Any error rolls all of it back.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::branch::fetch_branch;
use shared::models::{
    CreateInvReportInput, InvReport, InvReportBatch, InvReportItem, InvReportItemResponse,
    InvReportResponse,
};
use shared::reconciliation::{expected_from_counts, plan_report, PriceSnapshot, ReportPlan};
use shared::types::Pagination;

const REPORT_COLUMNS: &str = "id, branch_id, created_at, last_edit, start_date, end_date, status, \
     viewed_by, is_viewed, items_count, products_with_delivery, products_with_transfer, \
     products_with_pullout, products_with_offtake, total_offtake_value";
const ITEM_COLUMNS: &str = "id, invreport_id, product_id, beginning, deliver, transfer, pull_out, \
     offtake, selling_area, current_cost, current_srp";
const BATCH_COLUMNS: &str = "id, invreport_item_id, quantity, expiration_date, batch_type, created_at";

/// Inventory report service
#[derive(Clone)]
pub struct InventoryReportService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: i32,
    cost: Decimal,
    srp: Decimal,
}

/// One CSV row of an exported report
#[derive(Debug, Serialize)]
pub struct ReportCsvLine {
    pub report_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub beginning: i32,
    pub deliver: i32,
    pub transfer: i32,
    pub pull_out: i32,
    pub offtake: i32,
    pub selling_area: i32,
    pub expected_selling_area: i64,
    pub consistent: bool,
    pub current_cost: Decimal,
    pub current_srp: Decimal,
    pub peso_value: Decimal,
    pub offtake_value: Decimal,
}

impl ReportCsvLine {
    fn new(report_id: i32, item: &InvReportItemResponse, product_name: String) -> Self {
        let expected = expected_from_counts(
            item.beginning,
            item.deliver,
            item.transfer,
            item.pull_out,
            item.offtake,
        );
        Self {
            report_id,
            product_id: item.product_id,
            product_name,
            beginning: item.beginning,
            deliver: item.deliver,
            transfer: item.transfer,
            pull_out: item.pull_out,
            offtake: item.offtake,
            selling_area: item.selling_area,
            expected_selling_area: expected,
            consistent: i64::from(item.selling_area) == expected,
            current_cost: item.current_cost,
            current_srp: item.current_srp,
            peso_value: item.peso_value,
            offtake_value: Decimal::from(item.offtake) * item.current_srp,
        }
    }
}

/// Render export rows as CSV text with a header line
pub fn export_to_csv(lines: &[ReportCsvLine]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for line in lines {
        wtr.serialize(line)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

impl InventoryReportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Reconcile and persist a physical count submission
    pub async fn create_report(&self, input: CreateInvReportInput) -> AppResult<InvReportResponse> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        fetch_branch(&mut *tx, input.branch_id).await?;

        let product_ids: Vec<i32> = input.items.iter().map(|i| i.product_id).collect();
        let catalog: HashMap<i32, PriceSnapshot> = sqlx::query_as::<_, PriceRow>(
            "SELECT id, cost, srp FROM products WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| {
            let snapshot = PriceSnapshot {
                cost: row.cost,
                srp: row.srp,
            };
            (row.id, snapshot)
        })
        .collect();

        let plan = plan_report(&input.items, &catalog)?;

        let report = insert_report(&mut tx, &input, &plan).await?;
        let items = insert_lines(&mut tx, report.id, &plan).await?;

        for update in &plan.stock_updates {
            sqlx::query(
                r#"
                INSERT INTO branch_products (product_id, branch_id, quantity, is_available)
                VALUES ($1, $2, $3, FALSE)
                ON CONFLICT (product_id, branch_id) DO UPDATE SET quantity = EXCLUDED.quantity
                "#,
            )
            .bind(update.product_id)
            .bind(report.branch_id)
            .bind(update.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        for line in plan.inconsistent_lines() {
            tracing::debug!(
                report_id = report.id,
                product_id = line.input.product_id,
                selling_area = line.input.selling_area,
                expected = line.expected_selling_area,
                "line does not reconcile"
            );
        }
        tracing::info!(
            report_id = report.id,
            branch_id = report.branch_id,
            status = report.status.as_str(),
            lines = plan.lines.len(),
            stock_updates = plan.stock_updates.len(),
            "inventory report submitted"
        );

        Ok(InvReportResponse::new(&report, items))
    }

    pub async fn get_report(&self, report_id: i32) -> AppResult<InvReportResponse> {
        let report = sqlx::query_as::<_, InvReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM invreports WHERE id = $1"
        ))
        .bind(report_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory report".into()))?;

        let mut hydrated = self.hydrate(vec![report]).await?;
        hydrated
            .pop()
            .ok_or_else(|| AppError::Internal("report vanished while loading".into()))
    }

    /// All reports, newest first
    pub async fn list_reports(&self, page: Pagination) -> AppResult<Vec<InvReportResponse>> {
        self.list(None, page).await
    }

    /// Reports of one branch, newest first
    pub async fn list_branch_reports(
        &self,
        branch_id: i32,
        page: Pagination,
    ) -> AppResult<Vec<InvReportResponse>> {
        self.list(Some(branch_id), page).await
    }

    async fn list(
        &self,
        branch_id: Option<i32>,
        page: Pagination,
    ) -> AppResult<Vec<InvReportResponse>> {
        let (skip, limit) = page.window();
        let reports = sqlx::query_as::<_, InvReport>(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM invreports
            WHERE ($1::int IS NULL OR branch_id = $1)
            ORDER BY created_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(branch_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        self.hydrate(reports).await
    }

    /// Record that `viewer_id` has seen the report; status is untouched
    pub async fn mark_viewed(&self, report_id: i32, viewer_id: i32) -> AppResult<InvReportResponse> {
        let report = sqlx::query_as::<_, InvReport>(&format!(
            r#"
            UPDATE invreports SET is_viewed = TRUE, viewed_by = $2
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(report_id)
        .bind(viewer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory report".into()))?;

        tracing::info!(report_id, viewer_id, "inventory report viewed");

        let mut hydrated = self.hydrate(vec![report]).await?;
        hydrated
            .pop()
            .ok_or_else(|| AppError::Internal("report vanished while loading".into()))
    }

    /// Export one report's lines as CSV
    pub async fn export_report_csv(&self, report_id: i32) -> AppResult<(InvReportResponse, String)> {
        let report = self.get_report(report_id).await?;

        let product_ids: Vec<i32> = report.items.iter().map(|i| i.product_id).collect();
        let names: HashMap<i32, String> = sqlx::query_as::<_, (i32, String)>(
            "SELECT id, name FROM products WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let lines: Vec<ReportCsvLine> = report
            .items
            .iter()
            .map(|item| {
                let name = names.get(&item.product_id).cloned().unwrap_or_default();
                ReportCsvLine::new(report.id, item, name)
            })
            .collect();

        let csv = export_to_csv(&lines)?;
        Ok((report, csv))
    }

    /// Load lines and batches for a page of reports, preserving their order
    async fn hydrate(&self, reports: Vec<InvReport>) -> AppResult<Vec<InvReportResponse>> {
        if reports.is_empty() {
            return Ok(Vec::new());
        }

        let report_ids: Vec<i32> = reports.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, InvReportItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM invreport_items WHERE invreport_id = ANY($1) ORDER BY id"
        ))
        .bind(&report_ids)
        .fetch_all(&self.db)
        .await?;

        let item_ids: Vec<i32> = items.iter().map(|i| i.id).collect();
        let mut batches: HashMap<i32, Vec<InvReportBatch>> = HashMap::new();
        let batch_rows = sqlx::query_as::<_, InvReportBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM invreport_batches WHERE invreport_item_id = ANY($1) ORDER BY id"
        ))
        .bind(&item_ids)
        .fetch_all(&self.db)
        .await?;
        for batch in batch_rows {
            batches.entry(batch.invreport_item_id).or_default().push(batch);
        }

        let mut lines: HashMap<i32, Vec<InvReportItemResponse>> = HashMap::new();
        for item in &items {
            let item_batches = batches.get(&item.id).map(Vec::as_slice).unwrap_or_default();
            lines
                .entry(item.invreport_id)
                .or_default()
                .push(InvReportItemResponse::new(item, item_batches));
        }

        Ok(reports
            .iter()
            .map(|r| InvReportResponse::new(r, lines.remove(&r.id).unwrap_or_default()))
            .collect())
    }
}

async fn insert_report(
    conn: &mut PgConnection,
    input: &CreateInvReportInput,
    plan: &ReportPlan<'_>,
) -> AppResult<InvReport> {
    let summary = &plan.summary;
    let report = sqlx::query_as::<_, InvReport>(&format!(
        r#"
        INSERT INTO invreports (
            branch_id, start_date, end_date, status, last_edit,
            items_count, products_with_delivery, products_with_transfer,
            products_with_pullout, products_with_offtake, total_offtake_value
        )
        VALUES ($1, $2, $3, $4, NOW(), $5, $6, $7, $8, $9, $10)
        RETURNING {REPORT_COLUMNS}
        "#
    ))
    .bind(input.branch_id)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(plan.status)
    .bind(summary.items_count)
    .bind(summary.products_with_delivery)
    .bind(summary.products_with_transfer)
    .bind(summary.products_with_pullout)
    .bind(summary.products_with_offtake)
    .bind(summary.total_offtake_value)
    .fetch_one(conn)
    .await?;
    Ok(report)
}

/// Insert every planned line with its batches, in submission order
async fn insert_lines(
    conn: &mut PgConnection,
    report_id: i32,
    plan: &ReportPlan<'_>,
) -> AppResult<Vec<InvReportItemResponse>> {
    let mut responses = Vec::with_capacity(plan.lines.len());

    for line in &plan.lines {
        let input = line.input;
        let item = sqlx::query_as::<_, InvReportItem>(&format!(
            r#"
            INSERT INTO invreport_items (
                invreport_id, product_id, beginning, deliver, transfer, pull_out,
                offtake, selling_area, current_cost, current_srp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(report_id)
        .bind(input.product_id)
        .bind(input.beginning)
        .bind(input.deliver)
        .bind(input.transfer)
        .bind(input.pull_out)
        .bind(input.offtake)
        .bind(input.selling_area)
        .bind(line.snapshot.cost)
        .bind(line.snapshot.srp)
        .fetch_one(&mut *conn)
        .await?;

        let mut batches = Vec::with_capacity(input.batches.len());
        for batch in &input.batches {
            let row = sqlx::query_as::<_, InvReportBatch>(&format!(
                r#"
                INSERT INTO invreport_batches (invreport_item_id, quantity, expiration_date, batch_type)
                VALUES ($1, $2, $3, $4)
                RETURNING {BATCH_COLUMNS}
                "#
            ))
            .bind(item.id)
            .bind(batch.quantity)
            .bind(batch.expiration_date)
            .bind(batch.batch_type)
            .fetch_one(&mut *conn)
            .await?;
            batches.push(row);
        }

        responses.push(InvReportItemResponse::new(&item, &batches));
    }

    Ok(responses)
}
