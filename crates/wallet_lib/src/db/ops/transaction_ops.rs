use crate::db::model::*;
use crate::error::WalletError;
use sqlx::SqliteConnection;

/// Inserts the record unless a row with the same tx_hash exists.
/// An existing row yields `WalletError::DuplicateRecord` and is left untouched.
pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    tx: &TransactionDao,
) -> Result<TransactionDao, WalletError> {
    let res = sqlx::query_as::<_, TransactionDao>(
        r"INSERT INTO transactions
(tx_hash, block_number, from_address, to_address, value, gas_used, gas_price, status, transaction_type, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT(tx_hash) DO NOTHING
RETURNING *;
",
    )
    .bind(&tx.tx_hash)
    .bind(tx.block_number)
    .bind(&tx.from_address)
    .bind(&tx.to_address)
    .bind(&tx.value)
    .bind(tx.gas_used)
    .bind(&tx.gas_price)
    .bind(tx.status)
    .bind(&tx.transaction_type)
    .bind(tx.created_at)
    .fetch_optional(conn)
    .await?;
    res.ok_or_else(|| WalletError::DuplicateRecord(tx.tx_hash.clone()))
}

pub async fn get_transactions(
    conn: &mut SqliteConnection,
    transaction_type: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<TransactionDao>, sqlx::Error> {
    let rows = match transaction_type {
        Some(transaction_type) => {
            sqlx::query_as::<_, TransactionDao>(
                r"SELECT * FROM transactions WHERE transaction_type = $1 ORDER BY id ASC LIMIT $2 OFFSET $3",
            )
            .bind(transaction_type)
            .bind(limit)
            .bind(skip)
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, TransactionDao>(
                r"SELECT * FROM transactions ORDER BY id ASC LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(skip)
            .fetch_all(conn)
            .await?
        }
    };
    Ok(rows)
}

pub async fn get_transaction_by_hash(
    conn: &mut SqliteConnection,
    tx_hash: &str,
) -> Result<Option<TransactionDao>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionDao>(
        r"SELECT * FROM transactions WHERE lower(tx_hash) = lower($1)",
    )
    .bind(tx_hash)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Rows sent from or to `address`, compared case-insensitively
pub async fn get_transactions_by_address(
    conn: &mut SqliteConnection,
    address: &str,
    transaction_type: Option<&str>,
) -> Result<Vec<TransactionDao>, sqlx::Error> {
    let rows = match transaction_type {
        Some(transaction_type) => {
            sqlx::query_as::<_, TransactionDao>(
                r"SELECT * FROM transactions
WHERE (lower(from_address) = lower($1) OR lower(to_address) = lower($2))
AND transaction_type = $3
ORDER BY id ASC
",
            )
            .bind(address)
            .bind(address)
            .bind(transaction_type)
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, TransactionDao>(
                r"SELECT * FROM transactions
WHERE lower(from_address) = lower($1) OR lower(to_address) = lower($2)
ORDER BY id ASC
",
            )
            .bind(address)
            .bind(address)
            .fetch_all(conn)
            .await?
        }
    };
    Ok(rows)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::connection::create_sqlite_connection;

    pub fn sample_dao(
        tx_hash: &str,
        from: &str,
        to: &str,
        transaction_type: &str,
    ) -> TransactionDao {
        TransactionDao {
            id: 0,
            tx_hash: tx_hash.to_string(),
            block_number: 100,
            from_address: from.to_string(),
            to_address: Some(to.to_string()),
            value: "0.0001".to_string(),
            gas_used: 21000,
            gas_price: "2".to_string(),
            status: true,
            transaction_type: transaction_type.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    const ALICE: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
    const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let mut conn = create_sqlite_connection(None, true).await.unwrap();
        let dao = sample_dao("0x01", ALICE, CONTRACT, "deposit");
        let inserted = insert_transaction(&mut conn, &dao).await.unwrap();
        assert!(inserted.id > 0);
        assert_eq!(inserted.value, "0.0001");
        assert!(inserted.status);

        let mut changed = dao.clone();
        changed.value = "5".to_string();
        let err = insert_transaction(&mut conn, &changed).await.unwrap_err();
        assert!(matches!(err, WalletError::DuplicateRecord(_)));

        let all = get_transactions(&mut conn, None, 0, 100).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, "0.0001");
    }

    #[tokio::test]
    async fn test_type_filter_before_paging() {
        let mut conn = create_sqlite_connection(None, true).await.unwrap();
        for i in 0..6 {
            let kind = if i % 2 == 0 { "deposit" } else { "withdraw" };
            let dao = sample_dao(&format!("0x{:02x}", i), ALICE, CONTRACT, kind);
            insert_transaction(&mut conn, &dao).await.unwrap();
        }
        let deposits = get_transactions(&mut conn, Some("deposit"), 0, 2)
            .await
            .unwrap();
        assert_eq!(deposits.len(), 2);
        assert!(deposits.iter().all(|d| d.transaction_type == "deposit"));
        assert!(deposits[0].id < deposits[1].id);

        let rest = get_transactions(&mut conn, Some("deposit"), 2, 100)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);

        let page = get_transactions(&mut conn, None, 1, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].tx_hash, "0x01");
    }

    #[tokio::test]
    async fn test_address_lookup_is_case_insensitive() {
        let mut conn = create_sqlite_connection(None, true).await.unwrap();
        insert_transaction(&mut conn, &sample_dao("0x01", ALICE, CONTRACT, "deposit"))
            .await
            .unwrap();
        insert_transaction(&mut conn, &sample_dao("0x02", CONTRACT, ALICE, "withdraw"))
            .await
            .unwrap();
        insert_transaction(
            &mut conn,
            &sample_dao(
                "0x03",
                CONTRACT,
                "0x0000000000000000000000000000000000000001",
                "withdraw",
            ),
        )
        .await
        .unwrap();

        let rows = get_transactions_by_address(&mut conn, &ALICE.to_lowercase(), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        let upper = ALICE.to_uppercase().replace("0X", "0x");
        let rows = get_transactions_by_address(&mut conn, &upper, Some("withdraw"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tx_hash, "0x02");
    }

    #[tokio::test]
    async fn test_get_by_hash() {
        let mut conn = create_sqlite_connection(None, true).await.unwrap();
        insert_transaction(&mut conn, &sample_dao("0xabcd", ALICE, CONTRACT, "deposit"))
            .await
            .unwrap();
        assert!(get_transaction_by_hash(&mut conn, "0xABCD").await.unwrap().is_some());
        assert!(get_transaction_by_hash(&mut conn, "0xdead").await.unwrap().is_none());
    }
}
