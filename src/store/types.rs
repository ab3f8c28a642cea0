//! Row types returned by the directory queries.
//!
//! Identifier and birth-date columns decode from whichever integer or
//! temporal column type the schema uses, so a signedness or `DATE` vs
//! `DATETIME` difference does not fail the whole query.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySql, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Decode, FromRow, Type, TypeInfo, ValueRef};

/// Row identifier from a signed or `UNSIGNED` integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Signed(i64),
    Unsigned(u64),
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        RowId::Signed(id)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        RowId::Unsigned(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Signed(id) => write!(f, "{id}"),
            RowId::Unsigned(id) => write!(f, "{id}"),
        }
    }
}

impl Type<MySql> for RowId {
    fn type_info() -> MySqlTypeInfo {
        <i64 as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        <i64 as Type<MySql>>::compatible(ty) || <u64 as Type<MySql>>::compatible(ty)
    }
}

impl<'r> Decode<'r, MySql> for RowId {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
        let unsigned = value.type_info().name().ends_with("UNSIGNED");
        if unsigned {
            Ok(RowId::Unsigned(<u64 as Decode<MySql>>::decode(value)?))
        } else {
            Ok(RowId::Signed(<i64 as Decode<MySql>>::decode(value)?))
        }
    }
}

/// Calendar date of birth from a `DATE`, `DATETIME` or `TIMESTAMP` column.
/// Serialized as `YYYY-MM-DD`; any time of day is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BirthDate(pub NaiveDate);

impl From<NaiveDate> for BirthDate {
    fn from(date: NaiveDate) -> Self {
        BirthDate(date)
    }
}

impl Type<MySql> for BirthDate {
    fn type_info() -> MySqlTypeInfo {
        <NaiveDate as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        <NaiveDate as Type<MySql>>::compatible(ty)
            || <NaiveDateTime as Type<MySql>>::compatible(ty)
            || <DateTime<Utc> as Type<MySql>>::compatible(ty)
    }
}

impl<'r> Decode<'r, MySql> for BirthDate {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
        let type_name = value.type_info().name().to_string();
        let date = match type_name.as_str() {
            "DATE" => <NaiveDate as Decode<MySql>>::decode(value)?,
            "TIMESTAMP" => <DateTime<Utc> as Decode<MySql>>::decode(value)?.date_naive(),
            _ => <NaiveDateTime as Decode<MySql>>::decode(value)?.date(),
        };
        Ok(BirthDate(date))
    }
}

/// A patient as returned by the full listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Patient {
    /// Unique patient identifier.
    pub patient_id: RowId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<BirthDate>,
}

/// A provider as returned by the full listing. The listing does not select
/// `provider_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub provider_speciality: Option<String>,
}

/// Patient row produced by the first-name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PatientFirstName {
    pub patient_id: RowId,
    pub first_name: String,
}

/// Provider row produced by the specialty search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProviderSpecialty {
    pub provider_id: RowId,
    pub provider_speciality: String,
}
