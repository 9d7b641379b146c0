mod postgres_connect;
mod sqlx_postgres;

pub use annpale_db_macros::{SqlxObject, TextEnum};
pub use sqlx_postgres::*;
