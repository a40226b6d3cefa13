use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::{AccountHistory, DataSource, FillRole, FillRow, RawFill};

/// Insert raw fills for a market. Fill ids are globally unique, so replays
/// are no-ops. Takes a connection so callers can batch it inside one
/// transaction with the sync-record advance.
pub async fn save_fills(
    conn: &mut PgConnection,
    market_id: &str,
    fills: &[RawFill],
) -> anyhow::Result<u64> {
    let mut inserted = 0;
    for fill in fills {
        let result = sqlx::query(
            r#"
            INSERT INTO fills (id, market_id, transaction_hash, filled_at, maker, taker, market_token, side, value_usd, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&fill.id)
        .bind(market_id)
        .bind(&fill.transaction_hash)
        .bind(fill.timestamp)
        .bind(&fill.maker)
        .bind(&fill.taker)
        .bind(&fill.market_token)
        .bind(fill.side.as_str())
        .bind(fill.value_usd)
        .bind(fill.price)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// All stored fills for a market within `(after, before]`, oldest first.
pub async fn get_fills_for_market(
    pool: &PgPool,
    market_id: &str,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
) -> anyhow::Result<Vec<RawFill>> {
    let rows = sqlx::query_as::<_, FillRow>(
        r#"
        SELECT * FROM fills
        WHERE market_id = $1
          AND ($2::timestamptz IS NULL OR filled_at > $2)
          AND ($3::timestamptz IS NULL OR filled_at <= $3)
        ORDER BY filled_at ASC, id ASC
        "#,
    )
    .bind(market_id)
    .bind(after)
    .bind(before)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(FillRow::into_raw).collect())
}

/// Store a wallet's fills in wallet-relative form: the side recorded is what
/// the wallet actually did, with taker fills inverted from the maker's raw
/// direction. This is the table point-in-time state reads from.
pub async fn save_wallet_trades(
    conn: &mut PgConnection,
    wallet: &str,
    fills: &[RawFill],
) -> anyhow::Result<u64> {
    let wallet = wallet.to_lowercase();
    let mut inserted = 0;
    for fill in fills {
        let role = if fill.maker.eq_ignore_ascii_case(&wallet) {
            FillRole::Maker
        } else if fill.taker.eq_ignore_ascii_case(&wallet) {
            FillRole::Taker
        } else {
            continue;
        };
        let side = match role {
            FillRole::Maker => fill.side,
            FillRole::Taker => fill.side.opposite(),
        };
        let result = sqlx::query(
            r#"
            INSERT INTO wallet_trades (wallet, fill_id, transaction_hash, traded_at, side, value_usd, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (wallet, fill_id) DO NOTHING
            "#,
        )
        .bind(&wallet)
        .bind(&fill.id)
        .bind(&fill.transaction_hash)
        .bind(fill.timestamp)
        .bind(side.as_str())
        .bind(fill.value_usd)
        .bind(fill.price)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

#[derive(Debug, Clone, FromRow)]
pub struct WalletStateRow {
    pub trade_count: i64,
    pub volume_usd: Decimal,
    pub pnl_usd: Decimal,
    pub last_trade_at: Option<DateTime<Utc>>,
}

/// Aggregate a wallet's stored activity strictly before `timestamp`.
/// Transactions (not fills) are counted, and PnL is the realized cash flow:
/// sells add, buys subtract.
pub async fn wallet_state_before(
    pool: &PgPool,
    wallet: &str,
    timestamp: DateTime<Utc>,
) -> anyhow::Result<WalletStateRow> {
    let row = sqlx::query_as::<_, WalletStateRow>(
        r#"
        SELECT
            COUNT(DISTINCT transaction_hash) AS trade_count,
            COALESCE(SUM(value_usd), 0) AS volume_usd,
            COALESCE(SUM(CASE WHEN side = 'SELL' THEN value_usd ELSE -value_usd END), 0) AS pnl_usd,
            MAX(traded_at) AS last_trade_at
        FROM wallet_trades
        WHERE wallet = $1 AND traded_at < $2
        "#,
    )
    .bind(wallet.to_lowercase())
    .bind(timestamp)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

#[derive(Debug, Clone, FromRow)]
struct AccountOverviewRow {
    trade_count: i64,
    first_trade_at: Option<DateTime<Utc>>,
    last_trade_at: Option<DateTime<Utc>>,
    volume_usd: Decimal,
    pnl_usd: Decimal,
}

/// Lifetime account summary from locally stored trades. Fallback for when the
/// upstream account endpoint is unavailable; `None` when we hold nothing for
/// the wallet.
pub async fn account_overview(
    pool: &PgPool,
    wallet: &str,
) -> anyhow::Result<Option<AccountHistory>> {
    let row = sqlx::query_as::<_, AccountOverviewRow>(
        r#"
        SELECT
            COUNT(DISTINCT transaction_hash) AS trade_count,
            MIN(traded_at) AS first_trade_at,
            MAX(traded_at) AS last_trade_at,
            COALESCE(SUM(value_usd), 0) AS volume_usd,
            COALESCE(SUM(CASE WHEN side = 'SELL' THEN value_usd ELSE -value_usd END), 0) AS pnl_usd
        FROM wallet_trades
        WHERE wallet = $1
        "#,
    )
    .bind(wallet.to_lowercase())
    .fetch_one(pool)
    .await?;

    if row.trade_count == 0 {
        return Ok(None);
    }

    Ok(Some(AccountHistory {
        total_trades: row.trade_count,
        first_trade_date: row.first_trade_at,
        last_trade_date: row.last_trade_at,
        creation_date: None,
        total_volume_usd: row.volume_usd,
        profit_usd: Some(row.pnl_usd),
        data_source: DataSource::Cache,
    }))
}
