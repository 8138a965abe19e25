use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;

use crate::database::{Database, Pool};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub bus: String,
    pub seat: i64,
    pub price: f64,
    pub created_at: NaiveDateTime,
}

// MySQL хранит цену в DECIMAL, поэтому приводим к DOUBLE прямо в запросе
const MYSQL_SELECT_ALL: &str =
    "SELECT id, bus, seat, CAST(price AS DOUBLE) AS price, created_at FROM tickets ORDER BY id DESC";
const MYSQL_SELECT_ONE: &str =
    "SELECT id, bus, seat, CAST(price AS DOUBLE) AS price, created_at FROM tickets WHERE id = ?";
const SQLITE_SELECT_ALL: &str =
    "SELECT id, bus, seat, price, created_at FROM tickets ORDER BY id DESC";
const SQLITE_SELECT_ONE: &str =
    "SELECT id, bus, seat, price, created_at FROM tickets WHERE id = ?";
const INSERT: &str = "INSERT INTO tickets (bus, seat, price) VALUES (?, ?, ?)";
const DELETE: &str = "DELETE FROM tickets WHERE id = ?";

impl Ticket {
    /// All tickets, newest first.
    pub async fn list(db: &Database) -> Result<Vec<Ticket>, sqlx::Error> {
        match &db.pool {
            Pool::MySql(pool) => sqlx::query_as::<_, Ticket>(MYSQL_SELECT_ALL).fetch_all(pool).await,
            Pool::Sqlite(pool) => sqlx::query_as::<_, Ticket>(SQLITE_SELECT_ALL).fetch_all(pool).await,
        }
    }

    pub async fn find(db: &Database, id: i64) -> Result<Option<Ticket>, sqlx::Error> {
        match &db.pool {
            Pool::MySql(pool) => {
                sqlx::query_as::<_, Ticket>(MYSQL_SELECT_ONE)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            }
            Pool::Sqlite(pool) => {
                sqlx::query_as::<_, Ticket>(SQLITE_SELECT_ONE)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            }
        }
    }

    /// Inserts the ticket and reads the stored row back by its generated id.
    pub async fn create(db: &Database, ticket: &NewTicket) -> Result<Ticket, sqlx::Error> {
        let id = match &db.pool {
            Pool::MySql(pool) => {
                let result = sqlx::query(INSERT)
                    .bind(&ticket.bus)
                    .bind(ticket.seat)
                    .bind(ticket.price)
                    .execute(pool)
                    .await?;
                // AUTO_INCREMENT колонка BIGINT, значение всегда влезает в i64
                i64::try_from(result.last_insert_id()).map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            }
            Pool::Sqlite(pool) => {
                let result = sqlx::query(INSERT)
                    .bind(&ticket.bus)
                    .bind(ticket.seat)
                    .bind(ticket.price)
                    .execute(pool)
                    .await?;
                result.last_insert_rowid()
            }
        };

        Ticket::find(db, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Returns `false` when no row had this id.
    pub async fn delete(db: &Database, id: i64) -> Result<bool, sqlx::Error> {
        let affected = match &db.pool {
            Pool::MySql(pool) => sqlx::query(DELETE).bind(id).execute(pool).await?.rows_affected(),
            Pool::Sqlite(pool) => sqlx::query(DELETE).bind(id).execute(pool).await?.rows_affected(),
        };
        Ok(affected > 0)
    }
}

/// Тело запроса POST /tickets как есть: поля могут прийти строками, числами или null.
#[derive(Debug, Default)]
pub struct TicketPayload {
    pub bus: Option<Value>,
    pub seat: Option<Value>,
    pub price: Option<Value>,
}

// Поля берутся только по ключам объекта: массив или скаляр дают пустой payload
impl<'de> Deserialize<'de> for TicketPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(mut fields) => TicketPayload {
                bus: fields.remove("bus"),
                seat: fields.remove("seat"),
                price: fields.remove("price"),
            },
            _ => TicketPayload::default(),
        })
    }
}

/// A validated ticket ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub bus: String,
    pub seat: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TicketInputError {
    #[error("Missing fields")]
    Missing,
    #[error("Invalid fields")]
    Invalid,
}

impl TryFrom<TicketPayload> for NewTicket {
    type Error = TicketInputError;

    fn try_from(payload: TicketPayload) -> Result<Self, Self::Error> {
        let (bus, seat, price) = match (payload.bus, payload.seat, payload.price) {
            (Some(bus), Some(seat), Some(price))
                if !is_blank(&bus) && !is_blank(&seat) && !is_blank(&price) =>
            {
                (bus, seat, price)
            }
            _ => return Err(TicketInputError::Missing),
        };

        Ok(NewTicket {
            bus: coerce_text(&bus).ok_or(TicketInputError::Invalid)?,
            seat: coerce_integer(&seat).ok_or(TicketInputError::Invalid)?,
            price: coerce_number(&price).ok_or(TicketInputError::Invalid)?,
        })
    }
}

// null, false, "" и 0 считаются незаполненным полем, как и отсутствующий ключ
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn integral(x: f64) -> Option<i64> {
    let in_range = x >= i64::MIN as f64 && x < i64::MAX as f64;
    (x.fract() == 0.0 && in_range).then_some(x as i64)
}
