//! Statistics Handlers
//!
//! 基于发票快照的销售统计。数据量按单店规模假设，
//! 区间内发票直接载入内存聚合。

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::db::models::Invoice;
use crate::db::repository::InvoiceRepository;
use crate::utils::{AppError, AppResult};

/// 榜单条数
const TOP_PRODUCT_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    /// today | week | month | custom
    #[serde(default = "default_time_range", rename = "timeRange")]
    pub time_range: String,
    /// custom 区间起点 (RFC3339)
    pub start: Option<String>,
    /// custom 区间终点 (RFC3339)
    pub end: Option<String>,
}

fn default_time_range() -> String {
    "today".to_string()
}

/// 汇总数字
#[derive(Debug, Serialize)]
pub struct StatisticsSummary {
    pub revenue: Decimal,
    pub invoice_count: usize,
    pub units_sold: i64,
    pub average_invoice_value: Decimal,
}

/// 单日营收桶
#[derive(Debug, Serialize)]
pub struct RevenueBucket {
    /// 日期 (YYYY-MM-DD)
    pub date: String,
    pub revenue: Decimal,
    pub invoice_count: usize,
}

/// 销量榜条目
#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub product_name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub summary: StatisticsSummary,
    pub trend: Vec<RevenueBucket>,
    pub top_products: Vec<TopProduct>,
}

/// GET /api/statistics?timeRange=... - 销售概览
///
/// 已取消的发票不计入任何统计
pub async fn overview(
    State(state): State<ServerState>,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<StatisticsResponse>> {
    let (start, end) = resolve_range(&query)?;

    let repo = InvoiceRepository::new(state.db.clone());
    let invoices = repo
        .find_in_range(&start.to_rfc3339(), &end.to_rfc3339())
        .await?;

    Ok(Json(aggregate(&invoices)))
}

/// 把 timeRange 参数解析成 UTC 时间区间
fn resolve_range(query: &StatisticsQuery) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let now = Utc::now();
    match query.time_range.as_str() {
        // 当天从 UTC 零点起算，不是滚动 24 小时
        "today" => Ok((now.date_naive().and_time(NaiveTime::MIN).and_utc(), now)),
        "week" => Ok((now - Duration::days(7), now)),
        "month" => Ok((now - Duration::days(30), now)),
        "custom" => {
            let start = parse_bound(query.start.as_deref(), "start")?;
            let end = parse_bound(query.end.as_deref(), "end")?;
            if start > end {
                return Err(AppError::validation("start must not be after end"));
            }
            Ok((start, end))
        }
        other => Err(AppError::validation(format!(
            "Unknown timeRange '{}', expected today|week|month|custom",
            other
        ))),
    }
}

fn parse_bound(value: Option<&str>, field: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = value
        .ok_or_else(|| AppError::validation(format!("{field} is required for custom range")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| AppError::validation(format!("{field} must be an RFC3339 timestamp")))
}

fn aggregate(invoices: &[Invoice]) -> StatisticsResponse {
    let mut revenue = Decimal::ZERO;
    let mut units_sold: i64 = 0;
    let mut buckets: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    let mut products: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();

    for invoice in invoices {
        revenue += invoice.total;

        // created_at 是 RFC3339，前 10 个字符即日期
        let date = invoice.created_at.chars().take(10).collect::<String>();
        let bucket = buckets.entry(date).or_insert((Decimal::ZERO, 0));
        bucket.0 += invoice.total;
        bucket.1 += 1;

        for item in &invoice.items {
            units_sold += item.quantity as i64;
            let entry = products
                .entry(item.product_name.clone())
                .or_insert((0, Decimal::ZERO));
            entry.0 += item.quantity as i64;
            entry.1 += item.line_total();
        }
    }

    let invoice_count = invoices.len();
    let average_invoice_value = if invoice_count > 0 {
        revenue / Decimal::from(invoice_count as u64)
    } else {
        Decimal::ZERO
    };

    let trend = buckets
        .into_iter()
        .map(|(date, (revenue, invoice_count))| RevenueBucket {
            date,
            revenue,
            invoice_count,
        })
        .collect();

    let mut top_products: Vec<TopProduct> = products
        .into_iter()
        .map(|(product_name, (units_sold, revenue))| TopProduct {
            product_name,
            units_sold,
            revenue,
        })
        .collect();
    top_products.sort_by(|a, b| b.units_sold.cmp(&a.units_sold));
    top_products.truncate(TOP_PRODUCT_LIMIT);

    StatisticsResponse {
        summary: StatisticsSummary {
            revenue,
            invoice_count,
            units_sold,
            average_invoice_value,
        },
        trend,
        top_products,
    }
}
