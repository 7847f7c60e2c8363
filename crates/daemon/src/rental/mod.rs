// Copyright (C) 2025 the motorpool authors. This program is free software:
// you can redistribute it and/or modify it under the terms of the GNU General
// Public License as published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The rental domain: entity records and the relational-store seam.
//!
//! The daemon treats the store as an opaque external collaborator; every
//! trait call is one unit of work with its own transaction boundary. Deletes
//! are soft (a deletion date), and soft-deleted rows are invisible to every
//! read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rpc_common::Record;

pub use in_memory::{InMemoryRentalStore, VehicleSeed};

mod in_memory;

/// A client account. `password` holds the salted digest, never plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    pub name: String,
    pub surname: String,
    pub birthday: NaiveDate,
    pub phone: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// 0 = client, 1 = employee, 2 = administrator.
    pub position: i64,
    pub comment: String,
    pub license_categories: String,
    pub license_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<NaiveDate>,
}

/// A vehicle listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub company_id: i64,
    pub location: String,
    pub photos: String,
    pub rent_condition: String,
    pub header: String,
    /// Whether the listing comes with a driver.
    pub driver: bool,
    pub category_id: i64,
    pub license_category: String,
    pub fixed_rate: f64,
    pub percent: f64,
    pub brand: String,
    pub transmission: i64,
    pub engine: i64,
    pub body_type: i64,
    pub drive: i64,
    pub wheel_side: i64,
    pub year: i64,
    pub power: i64,
    /// Rental price per day.
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<NaiveDate>,
}

impl Vehicle {
    /// The display label used wherever a record references a vehicle.
    pub fn label(&self) -> String {
        format!("{}: id {}", self.brand, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<NaiveDate>,
}

/// A rental contract. `status`: 0 = active, 1 = completed, 2 = cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub client_id: i64,
    pub car_id: i64,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub driver: bool,
    pub note: String,
    pub status: i64,
    pub commission: f64,
    pub cost: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub client_id: i64,
    pub car_id: i64,
    pub added_on: NaiveDate,
}

/// Fields for account creation; everything else is defaulted by the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub surname: String,
    pub birthday: NaiveDate,
    pub phone: String,
    /// Salted digest, prepared by the handler.
    pub password: String,
    pub email: Option<String>,
    pub license_categories: String,
    pub license_number: String,
}

/// Profile fields a client may change about themselves. Phone and password
/// have their own flows and are deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub email: Option<String>,
    pub comment: Option<String>,
    pub license_categories: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContract {
    pub client_id: i64,
    pub car_id: i64,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub driver: bool,
    pub note: String,
    pub status: i64,
    pub commission: f64,
    pub cost: i64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rental store unavailable: {0}")]
    Unavailable(String),
}

/// The relational store behind the domain handlers. Reads never return
/// soft-deleted rows.
pub trait RentalStore: Send + Sync {
    fn account_by_phone(&self, phone: &str) -> Result<Option<Account>, StoreError>;
    fn account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;
    fn create_account(&self, new: NewAccount) -> Result<Account, StoreError>;
    /// Returns false if the account is gone.
    fn set_password(&self, id: i64, password: String) -> Result<bool, StoreError>;
    fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, StoreError>;
    fn soft_delete_account(&self, id: i64, on: NaiveDate) -> Result<bool, StoreError>;

    fn category(&self, id: i64) -> Result<Option<Category>, StoreError>;
    fn vehicle(&self, id: i64) -> Result<Option<Vehicle>, StoreError>;
    fn vehicles_in_category(&self, category_id: i64) -> Result<Vec<Vehicle>, StoreError>;

    fn create_contract(&self, new: NewContract) -> Result<Contract, StoreError>;
    fn contract_for(
        &self,
        client_id: i64,
        contract_id: i64,
    ) -> Result<Option<Contract>, StoreError>;
    fn contracts_for(&self, client_id: i64) -> Result<Vec<Contract>, StoreError>;

    fn create_favorite(
        &self,
        client_id: i64,
        car_id: i64,
        on: NaiveDate,
    ) -> Result<Favorite, StoreError>;
    fn favorite(&self, client_id: i64, car_id: i64) -> Result<Option<Favorite>, StoreError>;
    fn favorites_for(&self, client_id: i64) -> Result<Vec<Favorite>, StoreError>;
    fn delete_favorite(&self, favorite_id: i64) -> Result<bool, StoreError>;
}

/// Render an entity into a response content record.
pub fn to_record<T: Serialize>(entity: &T) -> Record {
    match serde_json::to_value(entity).expect("entity serialization cannot fail") {
        serde_json::Value::Object(map) => map,
        _ => Record::new(),
    }
}
