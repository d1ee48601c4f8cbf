//! Address book service
//!
//! At most one address per user is the default; the first saved
//! address becomes the default automatically.

use crate::store::KeyedStore;
use shared::models::{Actor, Address, AddressCreate, AddressUpdate, OwnerRef};
use shared::util::{now_millis, record_id};
use shared::{AppError, AppResult};

#[derive(Clone)]
pub struct AddressService {
    store: KeyedStore,
}

impl AddressService {
    pub fn new(store: KeyedStore) -> Self {
        Self { store }
    }

    /// Addresses of one user, default first then newest.
    pub async fn addresses_for(&self, actor: &Actor, user_id: &str) -> AppResult<Vec<Address>> {
        self.check_access(actor, user_id)?;
        let mut addresses: Vec<Address> = self.store.get_by_index("user_id", user_id).await?;
        addresses.sort_by_key(|a| (std::cmp::Reverse(a.is_default), std::cmp::Reverse(a.created_at)));
        Ok(addresses)
    }

    pub async fn create(&self, actor: &Actor, payload: AddressCreate) -> AppResult<Address> {
        validate_required(&payload.recipient, "recipient")?;
        validate_required(&payload.street, "street")?;
        validate_required(&payload.city, "city")?;
        validate_required(&payload.postal_code, "postal_code")?;
        validate_required(&payload.country, "country")?;

        let existing = self.addresses_for(actor, &actor.id).await?;
        let is_default = payload.is_default.unwrap_or(existing.is_empty());
        if is_default {
            self.clear_default(&existing).await?;
        }

        let now = now_millis();
        let address = Address {
            id: record_id(),
            user_id: actor.id.clone(),
            label: payload.label,
            recipient: payload.recipient,
            street: payload.street,
            city: payload.city,
            postal_code: payload.postal_code,
            country: payload.country,
            phone: payload.phone,
            is_default,
            created_at: now,
            updated_at: now,
        };
        self.store.put(&address).await?;
        Ok(address)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        address_id: &str,
        payload: AddressUpdate,
    ) -> AppResult<Address> {
        let mut address = self.owned(actor, address_id).await?;

        if let Some(label) = payload.label {
            address.label = Some(label);
        }
        if let Some(recipient) = payload.recipient {
            validate_required(&recipient, "recipient")?;
            address.recipient = recipient;
        }
        if let Some(street) = payload.street {
            validate_required(&street, "street")?;
            address.street = street;
        }
        if let Some(city) = payload.city {
            validate_required(&city, "city")?;
            address.city = city;
        }
        if let Some(postal_code) = payload.postal_code {
            validate_required(&postal_code, "postal_code")?;
            address.postal_code = postal_code;
        }
        if let Some(country) = payload.country {
            validate_required(&country, "country")?;
            address.country = country;
        }
        if let Some(phone) = payload.phone {
            address.phone = Some(phone);
        }
        address.updated_at = now_millis();

        self.store.update(&address).await?;
        Ok(address)
    }

    /// Make `address_id` the user's single default address.
    pub async fn set_default(&self, actor: &Actor, address_id: &str) -> AppResult<Address> {
        let mut address = self.owned(actor, address_id).await?;
        let others = self.addresses_for(actor, &address.user_id).await?;
        self.clear_default(&others).await?;
        address.is_default = true;
        address.updated_at = now_millis();
        self.store.update(&address).await?;
        Ok(address)
    }

    pub async fn delete(&self, actor: &Actor, address_id: &str) -> AppResult<bool> {
        let address = self.owned(actor, address_id).await?;
        Ok(self.store.delete::<Address>(&address.id).await?)
    }

    async fn owned(&self, actor: &Actor, address_id: &str) -> AppResult<Address> {
        let address = self
            .store
            .get::<Address>(address_id)
            .await?
            .ok_or_else(|| AppError::not_found("Address").with_detail("id", address_id))?;
        self.check_access(actor, &address.user_id)?;
        Ok(address)
    }

    fn check_access(&self, actor: &Actor, user_id: &str) -> AppResult<()> {
        if !actor.can_access(&OwnerRef::User(user_id.to_string())) {
            return Err(AppError::permission_denied("not the owner of this address"));
        }
        Ok(())
    }

    async fn clear_default(&self, addresses: &[Address]) -> AppResult<()> {
        for address in addresses.iter().filter(|a| a.is_default) {
            let mut cleared = address.clone();
            cleared.is_default = false;
            cleared.updated_at = now_millis();
            self.store.update(&cleared).await?;
        }
        Ok(())
    }
}

fn validate_required(value: &str, field: &'static str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(
            AppError::validation(format!("{} must not be empty", field)).with_detail("field", field)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCode;
    use shared::models::Role;

    fn payload(recipient: &str) -> AddressCreate {
        AddressCreate {
            label: Some("Home".to_string()),
            recipient: recipient.to_string(),
            street: "1 Rose Lane".to_string(),
            city: "Lyon".to_string(),
            postal_code: "69001".to_string(),
            country: "FR".to_string(),
            phone: None,
            is_default: None,
        }
    }

    #[tokio::test]
    async fn test_first_address_becomes_default() {
        let service = AddressService::new(KeyedStore::open_in_memory().unwrap());
        let ana = Actor::new("u1", "Ana", Role::Customer);

        let first = service.create(&ana, payload("Ana")).await.unwrap();
        assert!(first.is_default);

        let second = service.create(&ana, payload("Ana B")).await.unwrap();
        assert!(!second.is_default);
    }

    #[tokio::test]
    async fn test_set_default_is_exclusive() {
        let service = AddressService::new(KeyedStore::open_in_memory().unwrap());
        let ana = Actor::new("u1", "Ana", Role::Customer);

        let first = service.create(&ana, payload("Ana")).await.unwrap();
        let second = service.create(&ana, payload("Ana B")).await.unwrap();

        service.set_default(&ana, &second.id).await.unwrap();
        let addresses = service.addresses_for(&ana, "u1").await.unwrap();
        assert_eq!(addresses[0].id, second.id);
        assert!(addresses[0].is_default);
        assert!(!addresses.iter().find(|a| a.id == first.id).unwrap().is_default);
    }

    #[tokio::test]
    async fn test_foreign_address_not_accessible() {
        let service = AddressService::new(KeyedStore::open_in_memory().unwrap());
        let ana = Actor::new("u1", "Ana", Role::Customer);
        let eve = Actor::new("u2", "Eve", Role::Customer);

        let address = service.create(&ana, payload("Ana")).await.unwrap();
        let err = service.delete(&eve, &address.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        // Admins can manage any address book.
        let admin = Actor::new("a1", "Boss", Role::Admin);
        assert!(service.delete(&admin, &address.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_fields_rejected() {
        let service = AddressService::new(KeyedStore::open_in_memory().unwrap());
        let ana = Actor::new("u1", "Ana", Role::Customer);
        let err = service.create(&ana, payload("  ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
