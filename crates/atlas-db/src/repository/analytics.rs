//! # Analytics Repository
//!
//! Read-only aggregation queries over sales, products, customers, and users.
//!
//! ## Aggregation Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Analytics Aggregator                            │
//! │                                                                     │
//! │  sales ──────┬──► dashboard_stats   (today / yesterday / weekly)    │
//! │  sale_lines ─┼──► sales_trends      (per calendar day)              │
//! │  products ───┼──► top_products      (per product, by revenue)       │
//! │  categories ─┼──► sales_by_category (Uncategorized bucket)          │
//! │  customers ──┼──► customer_segments (active only)                   │
//! │  users ──────┴──► hourly_pattern    (24 zero-filled buckets)        │
//! │                                                                     │
//! │  NO WRITE PATH. Aggregations are computed on demand and tolerate    │
//! │  eventual consistency with the ledger.                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Profit figures are estimates at a fixed margin of revenue; there is no
//! per-product cost basis in this system. Average handling time is likewise
//! a derived heuristic, not a measured duration.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use atlas_core::period::Window;
use atlas_core::{PREMIUM_BALANCE_CENTS, PROFIT_MARGIN, REGULAR_BALANCE_CENTS};

use crate::error::DbResult;

// =============================================================================
// Result Types
// =============================================================================

/// Revenue/transaction/profit figures for one window.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodFigures {
    pub revenue_cents: i64,
    pub transactions: i64,
    /// Estimated at a fixed margin of revenue, rounded to whole cents.
    pub profit_cents: i64,
}

/// Product stock-level counts for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ProductCounts {
    pub total: i64,
    /// 0 < stock_quantity <= min_stock_level
    pub low_stock: i64,
    /// stock_quantity = 0
    pub out_of_stock: i64,
}

/// User counts for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct UserCounts {
    pub total: i64,
    /// Users whose last login falls on the current calendar day.
    pub active_today: i64,
}

/// The dashboard headline block.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub today: PeriodFigures,
    pub yesterday: PeriodFigures,
    pub weekly: PeriodFigures,
    pub products: ProductCounts,
    pub users: UserCounts,
}

/// One calendar day in a sales trend.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    /// Calendar day, `YYYY-MM-DD`.
    pub day: String,
    pub revenue_cents: i64,
    pub transactions: i64,
    pub profit_cents: i64,
}

/// One product in a top-products ranking.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Revenue attributed to one category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategorySales {
    pub category: String,
    pub revenue_cents: i64,
}

/// One cashier's figures over a window.
#[derive(Debug, Clone, Serialize)]
pub struct CashierPerformance {
    pub cashier_id: String,
    pub cashier_name: String,
    pub revenue_cents: i64,
    pub transactions: i64,
    pub items_sold: i64,
    /// Heuristic minutes-per-transaction estimate, rounded to 2 decimals.
    pub avg_handling_time: f64,
}

/// One customer segment's share of the active population.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSegment {
    pub segment: &'static str,
    pub count: i64,
    /// Percentage of active customers, rounded to 2 decimals; 0 when the
    /// active population is empty.
    pub percentage: f64,
}

/// Revenue bucketed by hour of day.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyPoint {
    /// Hour of day, 0-23.
    pub hour: u32,
    pub revenue_cents: i64,
    pub transactions: i64,
}

/// Stock value attributed to one category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryValuation {
    pub category: String,
    pub value_cents: i64,
    pub products: i64,
}

/// Total and per-category stock valuation.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryValuation {
    pub total_value_cents: i64,
    pub by_category: Vec<CategoryValuation>,
}

// =============================================================================
// Repository
// =============================================================================

/// Read-only repository for analytics aggregations.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    /// Creates a new AnalyticsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsRepository { pool }
    }

    /// Dashboard headline figures: today, yesterday, and the trailing seven
    /// days, plus product and user counts.
    pub async fn dashboard_stats(&self) -> DbResult<DashboardStats> {
        let today = Utc::now().date_naive();
        debug!(%today, "Computing dashboard stats");

        let today_figures = self.figures_for(Window::single_day(today)).await?;
        let yesterday_figures = self
            .figures_for(Window::single_day(today - Duration::days(1)))
            .await?;
        let weekly_figures = self
            .figures_for(Window::named(atlas_core::Period::SevenDays, today))
            .await?;

        let (total_products, low_stock, out_of_stock): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN stock_quantity > 0 AND stock_quantity <= min_stock_level
                             THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN stock_quantity = 0 THEN 1 ELSE 0 END), 0)
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let today_window = Window::single_day(today);
        let (total_users, active_today): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN last_login_at BETWEEN ?1 AND ?2 THEN 1 ELSE 0 END), 0)
            FROM users
            "#,
        )
        .bind(today_window.start)
        .bind(today_window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            today: today_figures,
            yesterday: yesterday_figures,
            weekly: weekly_figures,
            products: ProductCounts {
                total: total_products,
                low_stock,
                out_of_stock,
            },
            users: UserCounts {
                total: total_users,
                active_today,
            },
        })
    }

    async fn figures_for(&self, window: Window) -> DbResult<PeriodFigures> {
        let (transactions, revenue_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cents), 0)
            FROM sales WHERE created_at BETWEEN ?1 AND ?2
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(PeriodFigures {
            revenue_cents,
            transactions,
            profit_cents: estimate_profit(revenue_cents),
        })
    }

    /// Daily revenue and estimated profit across the window, ascending by day.
    pub async fn sales_trends(&self, window: Window) -> DbResult<Vec<TrendPoint>> {
        debug!(start = %window.start, end = %window.end, "Computing sales trends");

        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT date(created_at), COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM sales
            WHERE created_at BETWEEN ?1 AND ?2
            GROUP BY date(created_at)
            ORDER BY date(created_at) ASC
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(day, revenue_cents, transactions)| TrendPoint {
                day,
                revenue_cents,
                transactions,
                profit_cents: estimate_profit(revenue_cents),
            })
            .collect())
    }

    /// Per-product quantity and revenue across sale lines in the window,
    /// sorted by revenue descending, truncated to `limit`.
    pub async fn top_products(&self, window: Window, limit: u32) -> DbResult<Vec<TopProduct>> {
        let limit = atlas_core::validation::clamp_limit(limit);

        let rows: Vec<TopProduct> = sqlx::query_as(
            r#"
            SELECT
                l.product_id AS product_id,
                l.product_name AS product_name,
                COALESCE(SUM(l.quantity), 0) AS quantity,
                COALESCE(SUM(l.total_cents), 0) AS revenue_cents
            FROM sale_lines l
            JOIN sales s ON s.id = l.sale_id
            WHERE s.created_at BETWEEN ?1 AND ?2
            GROUP BY l.product_id, l.product_name
            ORDER BY revenue_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Revenue per category across the window, uncategorized products
    /// grouped under "Uncategorized", sorted descending.
    pub async fn sales_by_category(&self, window: Window) -> DbResult<Vec<CategorySales>> {
        let rows: Vec<CategorySales> = sqlx::query_as(
            r#"
            SELECT
                COALESCE(c.name, 'Uncategorized') AS category,
                COALESCE(SUM(l.total_cents), 0) AS revenue_cents
            FROM sale_lines l
            JOIN sales s ON s.id = l.sale_id
            JOIN products p ON p.id = l.product_id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE s.created_at BETWEEN ?1 AND ?2
            GROUP BY COALESCE(c.name, 'Uncategorized')
            ORDER BY revenue_cents DESC
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Per-cashier revenue, transaction count, items sold, and the derived
    /// average-handling-time estimate, sorted by revenue descending.
    pub async fn cashier_performance(&self, window: Window) -> DbResult<Vec<CashierPerformance>> {
        // Line quantities are pre-aggregated per sale so joining them does
        // not multiply the sale totals.
        let rows: Vec<(String, String, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                s.cashier_id,
                s.cashier_name,
                COALESCE(SUM(s.total_cents), 0) AS revenue_cents,
                COUNT(*),
                COALESCE(SUM(li.items), 0)
            FROM sales s
            JOIN (
                SELECT sale_id, SUM(quantity) AS items
                FROM sale_lines GROUP BY sale_id
            ) li ON li.sale_id = s.id
            WHERE s.created_at BETWEEN ?1 AND ?2
            GROUP BY s.cashier_id, s.cashier_name
            ORDER BY revenue_cents DESC
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(cashier_id, cashier_name, revenue_cents, transactions, items_sold)| {
                    CashierPerformance {
                        cashier_id,
                        cashier_name,
                        revenue_cents,
                        transactions,
                        items_sold,
                        avg_handling_time: estimate_handling_time(items_sold, transactions),
                    }
                },
            )
            .collect())
    }

    /// Partitions active customers by outstanding balance into Premium,
    /// Regular, and Occasional, with each segment's share of the population.
    pub async fn customer_segments(&self) -> DbResult<Vec<CustomerSegment>> {
        let (total, premium, regular): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN outstanding_balance_cents >= ?1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN outstanding_balance_cents >= ?2
                              AND outstanding_balance_cents < ?1 THEN 1 ELSE 0 END), 0)
            FROM customers
            WHERE is_active = 1
            "#,
        )
        .bind(PREMIUM_BALANCE_CENTS)
        .bind(REGULAR_BALANCE_CENTS)
        .fetch_one(&self.pool)
        .await?;

        let occasional = total - premium - regular;

        Ok(vec![
            CustomerSegment {
                segment: "Premium",
                count: premium,
                percentage: percentage_of(premium, total),
            },
            CustomerSegment {
                segment: "Regular",
                count: regular,
                percentage: percentage_of(regular, total),
            },
            CustomerSegment {
                segment: "Occasional",
                count: occasional,
                percentage: percentage_of(occasional, total),
            },
        ])
    }

    /// Revenue by hour of day across the trailing `days` days plus today.
    /// Always returns exactly 24 entries, zero-filled.
    pub async fn hourly_pattern(&self, days: i64) -> DbResult<Vec<HourlyPoint>> {
        let window = Window::trailing_days(days, Utc::now().date_naive());

        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                CAST(strftime('%H', created_at) AS INTEGER),
                COALESCE(SUM(total_cents), 0),
                COUNT(*)
            FROM sales
            WHERE created_at BETWEEN ?1 AND ?2
            GROUP BY 1
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        let mut pattern: Vec<HourlyPoint> = (0..24)
            .map(|hour| HourlyPoint {
                hour,
                revenue_cents: 0,
                transactions: 0,
            })
            .collect();

        for (hour, revenue_cents, transactions) in rows {
            if let Some(point) = pattern.get_mut(hour as usize) {
                point.revenue_cents = revenue_cents;
                point.transactions = transactions;
            }
        }

        Ok(pattern)
    }

    /// Total and per-category stock value (price × quantity) across all
    /// products, uncategorized grouped as "Uncategorized".
    pub async fn inventory_valuation(&self) -> DbResult<InventoryValuation> {
        let by_category: Vec<CategoryValuation> = sqlx::query_as(
            r#"
            SELECT
                COALESCE(c.name, 'Uncategorized') AS category,
                COALESCE(SUM(p.price_cents * p.stock_quantity), 0) AS value_cents,
                COUNT(*) AS products
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            GROUP BY COALESCE(c.name, 'Uncategorized')
            ORDER BY value_cents DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let total_value_cents = by_category.iter().map(|c| c.value_cents).sum();

        Ok(InventoryValuation {
            total_value_cents,
            by_category,
        })
    }
}

// =============================================================================
// Estimation Helpers
// =============================================================================

/// Estimated profit at the fixed margin, rounded to whole cents.
fn estimate_profit(revenue_cents: i64) -> i64 {
    (revenue_cents as f64 * PROFIT_MARGIN).round() as i64
}

/// Heuristic average-handling-time estimate:
/// `2 + (items / transactions) × 0.2`, rounded to 2 decimals.
fn estimate_handling_time(items: i64, transactions: i64) -> f64 {
    if transactions == 0 {
        return 0.0;
    }
    let raw = 2.0 + (items as f64 / transactions as f64) * 0.2;
    (raw * 100.0).round() / 100.0
}

/// Percentage share rounded to 2 decimals; 0 when the population is empty.
fn percentage_of(count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = count as f64 * 100.0 / total as f64;
    (pct * 100.0).round() / 100.0
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::NewCustomer;
    use crate::repository::product::NewProduct;
    use crate::repository::user::NewUser;
    use atlas_core::{Caller, NewSaleLine, Period, Role};
    use chrono::{DateTime, Duration};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn cashier(id: &str) -> Caller {
        Caller {
            user_id: id.to_string(),
            name: format!("Cashier {id}"),
            role: Role::Cashier,
        }
    }

    async fn seed_product(
        db: &Database,
        sku: &str,
        price_cents: i64,
        stock: i64,
        category_id: Option<String>,
    ) -> String {
        db.products()
            .insert(NewProduct {
                sku: sku.to_string(),
                name: format!("Product {sku}"),
                price_cents,
                stock_quantity: stock,
                min_stock_level: 0,
                category_id,
                supplier_id: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn sell(db: &Database, who: &str, product_id: &str, price_cents: i64, quantity: i64) {
        db.sales()
            .create(
                &cashier(who),
                vec![NewSaleLine {
                    product_id: product_id.to_string(),
                    product_name: format!("Product {product_id}"),
                    unit_price_cents: price_cents,
                    quantity,
                }],
            )
            .await
            .unwrap();
    }

    /// Inserts a bare sale header with a chosen timestamp, for window tests.
    async fn backdated_sale(db: &Database, total_cents: i64, created_at: DateTime<Utc>) {
        sqlx::query(
            r#"
            INSERT INTO sales (id, total_cents, cashier_id, cashier_name, created_at)
            VALUES (?1, ?2, 'c1', 'Cashier c1', ?3)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(total_cents)
        .bind(created_at)
        .execute(db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_dashboard_empty_database() {
        let db = test_db().await;

        let stats = db.analytics().dashboard_stats().await.unwrap();
        assert_eq!(stats.today.revenue_cents, 0);
        assert_eq!(stats.today.transactions, 0);
        assert_eq!(stats.today.profit_cents, 0);
        assert_eq!(stats.products.total, 0);
        assert_eq!(stats.users.total, 0);
    }

    #[tokio::test]
    async fn test_dashboard_windows_and_profit_margin() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 100, None).await;
        sell(&db, "c1", &p1, 1000, 10).await; // 100.00 today

        let yesterday = Utc::now() - Duration::days(1);
        backdated_sale(&db, 5000, yesterday).await;
        // Outside the 7-day window entirely.
        backdated_sale(&db, 99_999, Utc::now() - Duration::days(30)).await;

        let stats = db.analytics().dashboard_stats().await.unwrap();

        assert_eq!(stats.today.revenue_cents, 10_000);
        assert_eq!(stats.today.transactions, 1);
        assert_eq!(stats.today.profit_cents, 2_000); // 20% of revenue

        assert_eq!(stats.yesterday.revenue_cents, 5_000);
        assert_eq!(stats.weekly.revenue_cents, 15_000);
        assert_eq!(stats.weekly.transactions, 2);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let db = test_db().await;
        seed_product(&db, "OK", 1000, 10, None).await;

        db.products()
            .insert(NewProduct {
                sku: "LOW".to_string(),
                name: "Low".to_string(),
                price_cents: 500,
                stock_quantity: 2,
                min_stock_level: 5,
                category_id: None,
                supplier_id: None,
            })
            .await
            .unwrap();
        seed_product(&db, "OUT", 500, 0, None).await;

        let u1 = db
            .users()
            .insert(NewUser {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                role: Role::Cashier,
            })
            .await
            .unwrap();
        db.users()
            .insert(NewUser {
                name: "Bilal".to_string(),
                email: "bilal@example.com".to_string(),
                role: Role::Manager,
            })
            .await
            .unwrap();
        db.users().record_login(&u1.id).await.unwrap();

        let stats = db.analytics().dashboard_stats().await.unwrap();
        assert_eq!(stats.products.total, 3);
        assert_eq!(stats.products.low_stock, 1);
        assert_eq!(stats.products.out_of_stock, 1);
        assert_eq!(stats.users.total, 2);
        assert_eq!(stats.users.active_today, 1);
    }

    #[tokio::test]
    async fn test_sales_trends_grouped_by_day() {
        let db = test_db().await;
        let today = Utc::now().date_naive();

        backdated_sale(&db, 10_000, Utc::now()).await;
        backdated_sale(&db, 2_500, Utc::now()).await;
        backdated_sale(&db, 5_000, Utc::now() - Duration::days(2)).await;

        let window = Window::named(Period::SevenDays, today);
        let trends = db.analytics().sales_trends(window).await.unwrap();

        assert_eq!(trends.len(), 2);
        // Ascending by day: the older day first.
        assert_eq!(trends[0].revenue_cents, 5_000);
        assert_eq!(trends[0].profit_cents, 1_000);
        assert_eq!(trends[1].revenue_cents, 12_500);
        assert_eq!(trends[1].transactions, 2);
        assert_eq!(trends[1].profit_cents, 2_500);
        assert!(trends[0].day < trends[1].day);
    }

    #[tokio::test]
    async fn test_top_products_by_revenue() {
        let db = test_db().await;
        let cheap = seed_product(&db, "CHEAP", 100, 100, None).await;
        let pricey = seed_product(&db, "PRICEY", 10_000, 100, None).await;

        sell(&db, "c1", &cheap, 100, 20).await; // 20.00
        sell(&db, "c1", &pricey, 10_000, 1).await; // 100.00

        let window = Window::named(Period::SevenDays, Utc::now().date_naive());
        let top = db.analytics().top_products(window, 10).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, pricey);
        assert_eq!(top[0].revenue_cents, 10_000);
        assert_eq!(top[1].product_id, cheap);
        assert_eq!(top[1].quantity, 20);

        let truncated = db.analytics().top_products(window, 1).await.unwrap();
        assert_eq!(truncated.len(), 1);
    }

    #[tokio::test]
    async fn test_sales_by_category_with_uncategorized_bucket() {
        let db = test_db().await;
        let drinks = db.categories().insert("Drinks").await.unwrap();

        let cola = seed_product(&db, "COLA", 200, 100, Some(drinks.id.clone())).await;
        let misc = seed_product(&db, "MISC", 300, 100, None).await;

        sell(&db, "c1", &cola, 200, 5).await; // 10.00 Drinks
        sell(&db, "c1", &misc, 300, 1).await; // 3.00 Uncategorized

        let window = Window::named(Period::SevenDays, Utc::now().date_naive());
        let by_category = db.analytics().sales_by_category(window).await.unwrap();

        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category[0].category, "Drinks");
        assert_eq!(by_category[0].revenue_cents, 1_000);
        assert_eq!(by_category[1].category, "Uncategorized");
        assert_eq!(by_category[1].revenue_cents, 300);
    }

    #[tokio::test]
    async fn test_cashier_performance_handling_estimate() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 100, None).await;

        // One transaction with 3 items: 2 + (3/1) × 0.2 = 2.6
        sell(&db, "c1", &p1, 1000, 3).await;
        // Two transactions with 1 item each: 2 + (2/2) × 0.2 = 2.2
        sell(&db, "c2", &p1, 1000, 1).await;
        sell(&db, "c2", &p1, 1000, 1).await;

        let window = Window::named(Period::SevenDays, Utc::now().date_naive());
        let perf = db.analytics().cashier_performance(window).await.unwrap();

        assert_eq!(perf.len(), 2);
        // Sorted by revenue: c1 (30.00) before c2 (20.00).
        assert_eq!(perf[0].cashier_id, "c1");
        assert_eq!(perf[0].revenue_cents, 3_000);
        assert_eq!(perf[0].transactions, 1);
        assert_eq!(perf[0].items_sold, 3);
        assert_eq!(perf[0].avg_handling_time, 2.6);

        assert_eq!(perf[1].cashier_id, "c2");
        assert_eq!(perf[1].transactions, 2);
        assert_eq!(perf[1].avg_handling_time, 2.2);
    }

    #[tokio::test]
    async fn test_customer_segments_active_only() {
        let db = test_db().await;

        let seed = |balance: i64, active: bool| NewCustomer {
            name: format!("Customer {balance}"),
            phone: None,
            email: None,
            address: None,
            credit_limit_cents: 0,
            outstanding_balance_cents: balance,
            is_active: active,
        };

        db.customers().insert(seed(PREMIUM_BALANCE_CENTS, true)).await.unwrap();
        db.customers().insert(seed(REGULAR_BALANCE_CENTS, true)).await.unwrap();
        db.customers().insert(seed(1_000, true)).await.unwrap();
        // Inactive customers do not count, whatever their balance.
        db.customers().insert(seed(PREMIUM_BALANCE_CENTS, false)).await.unwrap();

        let segments = db.analytics().customer_segments().await.unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].segment, "Premium");
        assert_eq!(segments[0].count, 1);
        assert_eq!(segments[0].percentage, 33.33);
        assert_eq!(segments[1].segment, "Regular");
        assert_eq!(segments[1].count, 1);
        assert_eq!(segments[2].segment, "Occasional");
        assert_eq!(segments[2].count, 1);
    }

    #[tokio::test]
    async fn test_customer_segments_empty_population() {
        let db = test_db().await;

        let segments = db.analytics().customer_segments().await.unwrap();
        assert_eq!(segments.len(), 3);
        for segment in segments {
            assert_eq!(segment.count, 0);
            assert_eq!(segment.percentage, 0.0);
        }
    }

    #[tokio::test]
    async fn test_hourly_pattern_always_24_entries() {
        let db = test_db().await;

        // Invalid day counts coerce to 1.
        let empty = db.analytics().hourly_pattern(0).await.unwrap();
        assert_eq!(empty.len(), 24);
        assert!(empty.iter().all(|p| p.revenue_cents == 0));
        assert_eq!(empty[0].hour, 0);
        assert_eq!(empty[23].hour, 23);

        backdated_sale(&db, 4_200, Utc::now()).await;

        let pattern = db.analytics().hourly_pattern(1).await.unwrap();
        assert_eq!(pattern.len(), 24);
        let total: i64 = pattern.iter().map(|p| p.revenue_cents).sum();
        assert_eq!(total, 4_200);
        assert_eq!(pattern.iter().filter(|p| p.transactions > 0).count(), 1);
    }

    #[tokio::test]
    async fn test_inventory_valuation_total_matches_categories() {
        let db = test_db().await;
        let drinks = db.categories().insert("Drinks").await.unwrap();

        seed_product(&db, "COLA", 200, 50, Some(drinks.id.clone())).await; // 100.00
        seed_product(&db, "JUICE", 300, 10, Some(drinks.id)).await; // 30.00
        seed_product(&db, "MISC", 1000, 3, None).await; // 30.00

        let valuation = db.analytics().inventory_valuation().await.unwrap();

        assert_eq!(valuation.total_value_cents, 16_000);
        let sum: i64 = valuation.by_category.iter().map(|c| c.value_cents).sum();
        assert_eq!(valuation.total_value_cents, sum);

        // The SQL aggregate agrees with per-product stock valuation.
        let products = db.products().list(1, 50).await.unwrap();
        let per_product: i64 = products.items.iter().map(|p| p.stock_value().cents()).sum();
        assert_eq!(valuation.total_value_cents, per_product);

        assert_eq!(valuation.by_category[0].category, "Drinks");
        assert_eq!(valuation.by_category[0].value_cents, 13_000);
        assert_eq!(valuation.by_category[0].products, 2);

        // Re-aggregating the same data yields identical totals.
        let again = db.analytics().inventory_valuation().await.unwrap();
        assert_eq!(again.total_value_cents, valuation.total_value_cents);
    }
}
