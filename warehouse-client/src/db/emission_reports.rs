use anyhow::{bail, Result};
use sqlx::PgPool;
use time::Date;

use crate::{
    analytics::{
        CountryRank, CubeRow, LatestComparison, MovingAverage, RankMethod, SectorContribution,
    },
    domain::{Dimension, MissingReference},
};

/// Inner join of facts against every dimension a report reads.
///
/// Start and end time are joined even where a report does not read them so
/// that every report sees the same set of facts.
const JOINED_FACTS: &str = r#"
    FROM emissions e
    JOIN country c     ON e.country_id    = c.id
    JOIN start_time st ON e.start_time_id = st.id
    JOIN end_time et   ON e.end_time_id   = et.id
    JOIN sector s      ON e.sector_id     = s.id
    JOIN gas g         ON e.gas_id        = g.id
"#;

/// Sum and count over every subset of (country, sector, gas).
pub async fn cube(pool: &PgPool) -> Result<Vec<CubeRow>> {
    let sql = format!(
        r#"
        SELECT
            COALESCE(c.iso_code, 'ALL')                AS country,
            COALESCE(s.sector, 'ALL')                  AS sector,
            COALESCE(g.gas, 'ALL')                     AS gas,
            SUM(COALESCE(e.quantity, 0))::float8       AS total_quantity,
            COUNT(*)::int8                             AS record_count,
            GROUPING(c.iso_code, s.sector, g.gas)::int4 AS grouping_id
        {JOINED_FACTS}
        GROUP BY CUBE (c.iso_code, s.sector, g.gas)
        ORDER BY
            COALESCE(c.iso_code, 'ALL') COLLATE "C",
            COALESCE(s.sector, 'ALL') COLLATE "C",
            COALESCE(g.gas, 'ALL') COLLATE "C",
            GROUPING(c.iso_code, s.sector, g.gas)
        "#
    );

    let rows = sqlx::query_as::<_, CubeRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Countries ranked by total quantity, highest first.
pub async fn country_rank(pool: &PgPool, method: RankMethod) -> Result<Vec<CountryRank>> {
    let rank_fn = match method {
        RankMethod::Competition => "RANK",
        RankMethod::Dense => "DENSE_RANK",
    };
    let sql = format!(
        r#"
        SELECT
            c.iso_code                                  AS country,
            SUM(COALESCE(e.quantity, 0))::float8        AS total_quantity,
            {rank_fn}() OVER (ORDER BY SUM(COALESCE(e.quantity, 0)) DESC)::int8 AS rank
        {JOINED_FACTS}
        GROUP BY c.iso_code
        ORDER BY rank, c.iso_code COLLATE "C"
        "#
    );

    let rows = sqlx::query_as::<_, CountryRank>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

#[derive(sqlx::FromRow)]
struct LatestComparisonRecord {
    country: String,
    gas: String,
    end_time: Date,
    total_quantity: f64,
    latest_quantity: f64,
    comparison: String,
}

/// Each (country, gas, end time) total against the final period's total.
pub async fn latest_comparison(pool: &PgPool) -> Result<Vec<LatestComparison>> {
    let sql = format!(
        r#"
        WITH period_totals AS (
            SELECT
                c.iso_code                            AS country,
                g.gas                                 AS gas,
                et.end_time                           AS end_time,
                SUM(COALESCE(e.quantity, 0))::float8  AS total_quantity
            {JOINED_FACTS}
            GROUP BY c.iso_code, g.gas, et.end_time
        ),
        anchored AS (
            SELECT
                *,
                LAST_VALUE(total_quantity) OVER (
                    PARTITION BY country, gas
                    ORDER BY end_time
                    ROWS BETWEEN CURRENT ROW AND UNBOUNDED FOLLOWING
                ) AS latest_quantity
            FROM period_totals
        )
        SELECT
            country,
            gas,
            end_time,
            total_quantity,
            latest_quantity,
            CASE
                WHEN total_quantity > latest_quantity THEN 'More'
                WHEN total_quantity < latest_quantity THEN 'Less'
                ELSE 'Latest'
            END AS comparison
        FROM anchored
        WHERE total_quantity <> 0
        ORDER BY country COLLATE "C", gas COLLATE "C", end_time
        "#
    );

    let records = sqlx::query_as::<_, LatestComparisonRecord>(&sql)
        .fetch_all(pool)
        .await?;

    records
        .into_iter()
        .map(|r| -> Result<LatestComparison> {
            Ok(LatestComparison {
                comparison: r.comparison.parse()?,
                country: r.country,
                gas: r.gas,
                end_time: r.end_time,
                total_quantity: r.total_quantity,
                latest_quantity: r.latest_quantity,
            })
        })
        .collect()
}

/// Trailing mean of yearly (country, sector) totals over `window` rows.
pub async fn moving_average(pool: &PgPool, window: usize) -> Result<Vec<MovingAverage>> {
    if window == 0 {
        bail!("moving average window must be at least 1");
    }
    let preceding = window - 1;
    let sql = format!(
        r#"
        WITH yearly AS (
            SELECT
                c.iso_code                                  AS country,
                s.sector                                    AS sector,
                EXTRACT(YEAR FROM st.start_time)::int4      AS period,
                SUM(COALESCE(e.quantity, 0))::float8        AS total_quantity
            {JOINED_FACTS}
            GROUP BY 1, 2, 3
        )
        SELECT
            country,
            sector,
            period,
            total_quantity,
            AVG(total_quantity) OVER (
                PARTITION BY country, sector
                ORDER BY period
                ROWS BETWEEN {preceding} PRECEDING AND CURRENT ROW
            )::float8 AS moving_average
        FROM yearly
        ORDER BY country COLLATE "C", sector COLLATE "C", period
        "#
    );

    let rows = sqlx::query_as::<_, MovingAverage>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Cumulative share of the grand total, sectors from largest to smallest.
pub async fn sector_contribution(pool: &PgPool) -> Result<Vec<SectorContribution>> {
    let sql = format!(
        r#"
        WITH sector_totals AS (
            SELECT
                s.sector                              AS sector,
                SUM(COALESCE(e.quantity, 0))::float8  AS total_quantity
            {JOINED_FACTS}
            GROUP BY s.sector
        )
        SELECT
            sector,
            total_quantity,
            SUM(total_quantity) OVER (ORDER BY total_quantity DESC)::float8 AS cumulative_quantity,
            (SUM(total_quantity) OVER (ORDER BY total_quantity DESC)
                / NULLIF(SUM(total_quantity) OVER (), 0))::float8        AS cumulative_fraction
        FROM sector_totals
        ORDER BY total_quantity DESC, sector COLLATE "C"
        "#
    );

    let rows = sqlx::query_as::<_, SectorContribution>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[derive(sqlx::FromRow)]
struct MissingReferenceRecord {
    record_id: i32,
    dimension: String,
    dimension_id: i32,
}

/// Facts the inner join drops, one row per dangling reference.
pub async fn exclusions(pool: &PgPool) -> Result<Vec<MissingReference>> {
    let sql = r#"
        SELECT record_id, dimension, dimension_id
        FROM (
            SELECT e.id AS record_id, 'country' AS dimension, e.country_id AS dimension_id, 1 AS ord
            FROM emissions e LEFT JOIN country c ON e.country_id = c.id WHERE c.id IS NULL
            UNION ALL
            SELECT e.id, 'start_time', e.start_time_id, 2
            FROM emissions e LEFT JOIN start_time st ON e.start_time_id = st.id WHERE st.id IS NULL
            UNION ALL
            SELECT e.id, 'end_time', e.end_time_id, 3
            FROM emissions e LEFT JOIN end_time et ON e.end_time_id = et.id WHERE et.id IS NULL
            UNION ALL
            SELECT e.id, 'sector', e.sector_id, 4
            FROM emissions e LEFT JOIN sector s ON e.sector_id = s.id WHERE s.id IS NULL
            UNION ALL
            SELECT e.id, 'gas', e.gas_id, 5
            FROM emissions e LEFT JOIN gas g ON e.gas_id = g.id WHERE g.id IS NULL
        ) missing
        ORDER BY record_id, ord
    "#;

    let records = sqlx::query_as::<_, MissingReferenceRecord>(sql)
        .fetch_all(pool)
        .await?;

    records
        .into_iter()
        .map(|r| -> Result<MissingReference> {
            Ok(MissingReference {
                record_id: r.record_id,
                dimension: r.dimension.parse::<Dimension>().map_err(anyhow::Error::msg)?,
                dimension_id: r.dimension_id,
            })
        })
        .collect()
}
