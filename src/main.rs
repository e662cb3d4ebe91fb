use rustdb_stats::storage::MemoryStorage;
use rustdb_stats::{ColumnType, Error, Op, StatisticsRegistry, StatsConfig, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Build statistics for a small demo table and print a few estimates.
///
/// Usage: `rustdb-stats [OP VALUE]...`, e.g. `rustdb-stats "<" 250 "=" 42`
#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let storage = MemoryStorage::new();
    let orders = storage.create_table(
        "orders",
        vec![ColumnType::Int, ColumnType::Int, ColumnType::String],
    )?;
    for i in 0..10_000i64 {
        let amount = (i * 37) % 1000;
        let region = ["north", "south", "east", "west"][(i % 4) as usize];
        storage.insert(
            orders,
            vec![Value::Int(i), Value::Int(amount), Value::String(region.to_string())],
        )?;
    }

    let registry = StatisticsRegistry::new();
    registry
        .recompute_all(&storage, &storage, &StatsConfig::default())
        .await?;

    let stats = registry
        .get("orders")
        .ok_or_else(|| Error::Catalog("no statistics for orders".to_string()))?;
    info!(
        rows = stats.total_rows(),
        pages = stats.page_count(),
        scan_cost = stats.estimate_scan_cost(),
        "orders statistics ready"
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let predicates: Vec<(Op, i64)> = if args.is_empty() {
        vec![(Op::LessThan, 250), (Op::Equals, 42), (Op::GreaterThanOrEq, 900)]
    } else {
        args.chunks(2)
            .map(|pair| match pair {
                [op, value] => {
                    let value = value
                        .parse::<i64>()
                        .map_err(|e| Error::Type(format!("Invalid constant {}: {}", value, e)))?;
                    Ok((op.parse::<Op>()?, value))
                }
                _ => Err(Error::Configuration("expected OP VALUE pairs".to_string())),
            })
            .collect::<Result<_, Error>>()?
    };

    for (op, value) in predicates {
        let selectivity = stats.estimate_selectivity(1, op, &Value::Int(value));
        println!(
            "amount {} {}: selectivity {:.4}, ~{} rows",
            op,
            value,
            selectivity,
            stats.estimate_table_cardinality(selectivity)
        );
    }

    Ok(())
}
