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

//! In-memory rental store. One mutex hold per trait call is the transaction
//! boundary.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{
    Account, Category, Contract, Favorite, NewAccount, NewContract, ProfileUpdate, RentalStore,
    StoreError, Vehicle,
};

#[derive(Default)]
struct Inner {
    accounts: HashMap<i64, Account>,
    vehicles: HashMap<i64, Vehicle>,
    categories: HashMap<i64, Category>,
    contracts: HashMap<i64, Contract>,
    favorites: HashMap<i64, Favorite>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryRentalStore {
    inner: Mutex<Inner>,
}

/// Seed fields for a vehicle listing; presentation columns default to empty.
#[derive(Debug, Clone, Default)]
pub struct VehicleSeed {
    pub company_id: i64,
    pub location: String,
    pub header: String,
    pub brand: String,
    pub category_id: i64,
    pub license_category: String,
    pub driver: bool,
    pub year: i64,
    pub power: i64,
    pub price: i64,
    pub fixed_rate: f64,
    pub percent: f64,
}

impl InMemoryRentalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/demo seeding; the marketplace side that lists vehicles is not
    /// part of the client protocol.
    pub fn add_category(&self, name: &str) -> Category {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let category = Category {
            id,
            name: name.to_string(),
            icon: String::new(),
            deleted_on: None,
        };
        inner.categories.insert(id, category.clone());
        category
    }

    pub fn add_vehicle(&self, seed: VehicleSeed) -> Vehicle {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let vehicle = Vehicle {
            id,
            company_id: seed.company_id,
            location: seed.location,
            photos: String::new(),
            rent_condition: String::new(),
            header: seed.header,
            driver: seed.driver,
            category_id: seed.category_id,
            license_category: seed.license_category,
            fixed_rate: seed.fixed_rate,
            percent: seed.percent,
            brand: seed.brand,
            transmission: 0,
            engine: 0,
            body_type: 0,
            drive: 0,
            wheel_side: 0,
            year: seed.year,
            power: seed.power,
            price: seed.price,
            deleted_on: None,
        };
        inner.vehicles.insert(id, vehicle.clone());
        vehicle
    }

    pub fn remove_vehicle(&self, id: i64, on: NaiveDate) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(vehicle) = inner.vehicles.get_mut(&id) {
            vehicle.deleted_on = Some(on);
        }
    }
}

impl RentalStore for InMemoryRentalStore {
    fn account_by_phone(&self, phone: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .values()
            .find(|a| a.phone == phone && a.deleted_on.is_none())
            .cloned())
    }

    fn account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .get(&id)
            .filter(|a| a.deleted_on.is_none())
            .cloned())
    }

    fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let account = Account {
            id,
            company_id: None,
            name: new.name,
            surname: new.surname,
            birthday: new.birthday,
            phone: new.phone,
            password: new.password,
            email: new.email,
            position: 0,
            comment: "client".to_string(),
            license_categories: new.license_categories,
            license_number: new.license_number,
            deleted_on: None,
        };
        inner.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn set_password(&self, id: i64, password: String) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .accounts
            .get_mut(&id)
            .filter(|a| a.deleted_on.is_none())
        {
            Some(account) => {
                account.password = password;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(account) = inner
            .accounts
            .get_mut(&id)
            .filter(|a| a.deleted_on.is_none())
        else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            account.name = name;
        }
        if let Some(surname) = update.surname {
            account.surname = surname;
        }
        if let Some(birthday) = update.birthday {
            account.birthday = birthday;
        }
        if let Some(email) = update.email {
            account.email = Some(email);
        }
        if let Some(comment) = update.comment {
            account.comment = comment;
        }
        if let Some(license_categories) = update.license_categories {
            account.license_categories = license_categories;
        }
        if let Some(license_number) = update.license_number {
            account.license_number = license_number;
        }
        Ok(Some(account.clone()))
    }

    fn soft_delete_account(&self, id: i64, on: NaiveDate) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .accounts
            .get_mut(&id)
            .filter(|a| a.deleted_on.is_none())
        {
            Some(account) => {
                account.deleted_on = Some(on);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn category(&self, id: i64) -> Result<Option<Category>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .categories
            .get(&id)
            .filter(|c| c.deleted_on.is_none())
            .cloned())
    }

    fn vehicle(&self, id: i64) -> Result<Option<Vehicle>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .vehicles
            .get(&id)
            .filter(|v| v.deleted_on.is_none())
            .cloned())
    }

    fn vehicles_in_category(&self, category_id: i64) -> Result<Vec<Vehicle>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut vehicles: Vec<Vehicle> = inner
            .vehicles
            .values()
            .filter(|v| v.category_id == category_id && v.deleted_on.is_none())
            .cloned()
            .collect();
        vehicles.sort_by_key(|v| v.id);
        Ok(vehicles)
    }

    fn create_contract(&self, new: NewContract) -> Result<Contract, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let contract = Contract {
            id,
            client_id: new.client_id,
            car_id: new.car_id,
            date_start: new.date_start,
            date_end: new.date_end,
            driver: new.driver,
            note: new.note,
            status: new.status,
            commission: new.commission,
            cost: new.cost,
            deleted_on: None,
        };
        inner.contracts.insert(id, contract.clone());
        Ok(contract)
    }

    fn contract_for(
        &self,
        client_id: i64,
        contract_id: i64,
    ) -> Result<Option<Contract>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .contracts
            .get(&contract_id)
            .filter(|c| c.client_id == client_id && c.deleted_on.is_none())
            .cloned())
    }

    fn contracts_for(&self, client_id: i64) -> Result<Vec<Contract>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut contracts: Vec<Contract> = inner
            .contracts
            .values()
            .filter(|c| c.client_id == client_id && c.deleted_on.is_none())
            .cloned()
            .collect();
        contracts.sort_by_key(|c| c.id);
        Ok(contracts)
    }

    fn create_favorite(
        &self,
        client_id: i64,
        car_id: i64,
        on: NaiveDate,
    ) -> Result<Favorite, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let favorite = Favorite {
            id,
            client_id,
            car_id,
            added_on: on,
        };
        inner.favorites.insert(id, favorite.clone());
        Ok(favorite)
    }

    fn favorite(&self, client_id: i64, car_id: i64) -> Result<Option<Favorite>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .favorites
            .values()
            .find(|f| f.client_id == client_id && f.car_id == car_id)
            .cloned())
    }

    fn favorites_for(&self, client_id: i64) -> Result<Vec<Favorite>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut favorites: Vec<Favorite> = inner
            .favorites
            .values()
            .filter(|f| f.client_id == client_id)
            .cloned()
            .collect();
        favorites.sort_by_key(|f| f.id);
        Ok(favorites)
    }

    fn delete_favorite(&self, favorite_id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.favorites.remove(&favorite_id).is_some())
    }
}
