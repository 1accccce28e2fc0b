use crate::db::ops::*;
use crate::model::TransactionKind;
use actix_web::web::Data;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ServerData {
    pub db_connection: Arc<Mutex<SqliteConnection>>,
}

macro_rules! return_on_error {
    ( $e:expr ) => {
        match $e {
            Ok(x) => x,
            Err(err) => {
                log::error!("Database error: {}", err);
                return HttpResponse::InternalServerError().json(json!({
                    "error": err.to_string()
                }));
            }
        }
    };
}

fn default_limit() -> u32 {
    100
}

#[derive(Deserialize, Debug)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub transaction_type: Option<TransactionKind>,
}

#[derive(Deserialize, Debug)]
pub struct TypeQuery {
    pub transaction_type: Option<TransactionKind>,
}

pub async fn transactions(
    data: Data<Box<ServerData>>,
    query: web::Query<TransactionsQuery>,
) -> impl Responder {
    let txs = {
        let mut db_conn = data.db_connection.lock().await;
        return_on_error!(
            get_transactions(
                &mut db_conn,
                query.transaction_type.map(|t| t.as_str()),
                query.skip as i64,
                query.limit as i64
            )
            .await
        )
    };
    HttpResponse::Ok().json(txs)
}

pub async fn transaction_by_hash(
    data: Data<Box<ServerData>>,
    tx_hash: web::Path<String>,
) -> impl Responder {
    let tx = {
        let mut db_conn = data.db_connection.lock().await;
        return_on_error!(get_transaction_by_hash(&mut db_conn, &tx_hash).await)
    };
    match tx {
        Some(tx) => HttpResponse::Ok().json(tx),
        None => HttpResponse::NotFound().json(json!({
            "detail": "Transaction not found"
        })),
    }
}

pub async fn transactions_by_address(
    data: Data<Box<ServerData>>,
    address: web::Path<String>,
    query: web::Query<TypeQuery>,
) -> impl Responder {
    let txs = {
        let mut db_conn = data.db_connection.lock().await;
        return_on_error!(
            get_transactions_by_address(
                &mut db_conn,
                &address,
                query.transaction_type.map(|t| t.as_str())
            )
            .await
        )
    };
    HttpResponse::Ok().json(txs)
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/transactions", web::get().to(transactions))
        .route("/transactions/", web::get().to(transactions))
        .route(
            "/transactions/address/{address}",
            web::get().to(transactions_by_address),
        )
        .route("/transactions/{tx_hash}", web::get().to(transaction_by_hash));
}
