use sqlx::PgPool;

use crate::intelligence::{ScoredTrade, SignalName};
use crate::models::SuspiciousTradeRow;

/// Upsert one scored trade. Re-scanning a market rewrites the scores rather
/// than duplicating rows; identity is (transaction, outcome, wallet).
pub async fn upsert_scored_trade(
    pool: &PgPool,
    scored: &ScoredTrade,
) -> anyhow::Result<SuspiciousTradeRow> {
    let trade = &scored.trade;
    let score = &scored.score;
    let tags: Vec<String> = scored.tags.iter().map(|t| t.as_str().to_string()).collect();

    let row = sqlx::query_as::<_, SuspiciousTradeRow>(
        r#"
        INSERT INTO suspicious_trades (
            market_id, wallet, transaction_hash, outcome, side,
            total_size, total_value_usd, avg_price, traded_at,
            total_score, size_impact_score, account_history_score, conviction_score,
            price_impact_pct, is_alert, tags, had_complementary_fills, approximate_history
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        ON CONFLICT (transaction_hash, outcome, wallet) DO UPDATE SET
            total_size = EXCLUDED.total_size,
            total_value_usd = EXCLUDED.total_value_usd,
            avg_price = EXCLUDED.avg_price,
            total_score = EXCLUDED.total_score,
            size_impact_score = EXCLUDED.size_impact_score,
            account_history_score = EXCLUDED.account_history_score,
            conviction_score = EXCLUDED.conviction_score,
            price_impact_pct = EXCLUDED.price_impact_pct,
            is_alert = EXCLUDED.is_alert,
            tags = EXCLUDED.tags,
            had_complementary_fills = EXCLUDED.had_complementary_fills,
            approximate_history = EXCLUDED.approximate_history
        RETURNING *
        "#,
    )
    .bind(&trade.market_id)
    .bind(&trade.wallet)
    .bind(&trade.transaction_hash)
    .bind(trade.outcome.as_str())
    .bind(trade.side.as_str())
    .bind(trade.total_size)
    .bind(trade.total_value_usd)
    .bind(trade.avg_price)
    .bind(trade.timestamp)
    .bind(score.total)
    .bind(score.signal_score(SignalName::SizeImpact))
    .bind(score.signal_score(SignalName::AccountHistory))
    .bind(score.signal_score(SignalName::Conviction))
    .bind(scored.price_impact_pct)
    .bind(score.is_alert)
    .bind(&tags)
    .bind(trade.had_complementary_fills)
    .bind(score.used_approximate_history())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Highest-scoring trades across all markets.
pub async fn ranked(
    pool: &PgPool,
    limit: i64,
    alerts_only: bool,
) -> anyhow::Result<Vec<SuspiciousTradeRow>> {
    let rows = sqlx::query_as::<_, SuspiciousTradeRow>(
        r#"
        SELECT * FROM suspicious_trades
        WHERE NOT $2 OR is_alert
        ORDER BY total_score DESC, traded_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .bind(alerts_only)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Highest-scoring trades for one market.
pub async fn ranked_for_market(
    pool: &PgPool,
    market_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<SuspiciousTradeRow>> {
    let rows = sqlx::query_as::<_, SuspiciousTradeRow>(
        r#"
        SELECT * FROM suspicious_trades
        WHERE market_id = $1
        ORDER BY total_score DESC, traded_at DESC
        LIMIT $2
        "#,
    )
    .bind(market_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
