//! Referential use-case service: sites, fleets, engins, failures, lubricants.
//!
//! Every write returns the stored record read back from the repository.

use super::{require_found, ServiceError, ServiceResult};
use crate::model::referential::{
    Engin, EnginFilter, EnginInput, LookupKind, Lubrifiant, LubrifiantInput, NameInput,
    NamedEntry, Panne, PanneInput, Parc, ParcInput, Site, SiteInput,
};
use crate::model::EntityId;
use crate::repo::referential_repo::ReferentialRepository;

pub struct ReferentialService<R: ReferentialRepository> {
    repo: R,
}

impl<R: ReferentialRepository> ReferentialService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_lookup(&self, kind: LookupKind, input: &NameInput) -> ServiceResult<NamedEntry> {
        let id = self.repo.create_lookup(kind, input)?;
        self.read_back(self.repo.get_lookup(kind, id)?)
    }

    pub fn update_lookup(
        &self,
        kind: LookupKind,
        id: EntityId,
        input: &NameInput,
    ) -> ServiceResult<NamedEntry> {
        self.repo.update_lookup(kind, id, input)?;
        self.read_back(self.repo.get_lookup(kind, id)?)
    }

    pub fn get_lookup(&self, kind: LookupKind, id: EntityId) -> ServiceResult<NamedEntry> {
        require_found(self.repo.get_lookup(kind, id)?, kind.label(), id)
    }

    pub fn list_lookups(&self, kind: LookupKind) -> ServiceResult<Vec<NamedEntry>> {
        Ok(self.repo.list_lookups(kind)?)
    }

    pub fn delete_lookup(&self, kind: LookupKind, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_lookup(kind, id)?)
    }

    pub fn create_site(&self, input: &SiteInput) -> ServiceResult<Site> {
        let id = self.repo.create_site(input)?;
        self.read_back(self.repo.get_site(id)?)
    }

    pub fn update_site(&self, id: EntityId, input: &SiteInput) -> ServiceResult<Site> {
        self.repo.update_site(id, input)?;
        self.read_back(self.repo.get_site(id)?)
    }

    pub fn get_site(&self, id: EntityId) -> ServiceResult<Site> {
        require_found(self.repo.get_site(id)?, "site", id)
    }

    pub fn list_sites(&self) -> ServiceResult<Vec<Site>> {
        Ok(self.repo.list_sites()?)
    }

    pub fn delete_site(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_site(id)?)
    }

    pub fn create_parc(&self, input: &ParcInput) -> ServiceResult<Parc> {
        let id = self.repo.create_parc(input)?;
        self.read_back(self.repo.get_parc(id)?)
    }

    pub fn update_parc(&self, id: EntityId, input: &ParcInput) -> ServiceResult<Parc> {
        self.repo.update_parc(id, input)?;
        self.read_back(self.repo.get_parc(id)?)
    }

    pub fn get_parc(&self, id: EntityId) -> ServiceResult<Parc> {
        require_found(self.repo.get_parc(id)?, "parc", id)
    }

    pub fn list_parcs(&self, typeparc_id: Option<EntityId>) -> ServiceResult<Vec<Parc>> {
        Ok(self.repo.list_parcs(typeparc_id)?)
    }

    pub fn delete_parc(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_parc(id)?)
    }

    pub fn create_panne(&self, input: &PanneInput) -> ServiceResult<Panne> {
        let id = self.repo.create_panne(input)?;
        self.read_back(self.repo.get_panne(id)?)
    }

    pub fn update_panne(&self, id: EntityId, input: &PanneInput) -> ServiceResult<Panne> {
        self.repo.update_panne(id, input)?;
        self.read_back(self.repo.get_panne(id)?)
    }

    pub fn get_panne(&self, id: EntityId) -> ServiceResult<Panne> {
        require_found(self.repo.get_panne(id)?, "panne", id)
    }

    pub fn list_pannes(&self, typepanne_id: Option<EntityId>) -> ServiceResult<Vec<Panne>> {
        Ok(self.repo.list_pannes(typepanne_id)?)
    }

    pub fn delete_panne(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_panne(id)?)
    }

    pub fn create_lubrifiant(&self, input: &LubrifiantInput) -> ServiceResult<Lubrifiant> {
        let id = self.repo.create_lubrifiant(input)?;
        self.read_back(self.repo.get_lubrifiant(id)?)
    }

    pub fn update_lubrifiant(
        &self,
        id: EntityId,
        input: &LubrifiantInput,
    ) -> ServiceResult<Lubrifiant> {
        self.repo.update_lubrifiant(id, input)?;
        self.read_back(self.repo.get_lubrifiant(id)?)
    }

    pub fn get_lubrifiant(&self, id: EntityId) -> ServiceResult<Lubrifiant> {
        require_found(self.repo.get_lubrifiant(id)?, "lubrifiant", id)
    }

    pub fn list_lubrifiants(
        &self,
        typelubrifiant_id: Option<EntityId>,
    ) -> ServiceResult<Vec<Lubrifiant>> {
        Ok(self.repo.list_lubrifiants(typelubrifiant_id)?)
    }

    pub fn delete_lubrifiant(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_lubrifiant(id)?)
    }

    pub fn create_engin(&self, input: &EnginInput) -> ServiceResult<Engin> {
        let id = self.repo.create_engin(input)?;
        self.read_back(self.repo.get_engin(id)?)
    }

    pub fn update_engin(&self, id: EntityId, input: &EnginInput) -> ServiceResult<Engin> {
        self.repo.update_engin(id, input)?;
        self.read_back(self.repo.get_engin(id)?)
    }

    pub fn get_engin(&self, id: EntityId) -> ServiceResult<Engin> {
        require_found(self.repo.get_engin(id)?, "engin", id)
    }

    pub fn list_engins(&self, filter: &EnginFilter) -> ServiceResult<Vec<Engin>> {
        Ok(self.repo.list_engins(filter)?)
    }

    pub fn delete_engin(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_engin(id)?)
    }

    fn read_back<T>(&self, value: Option<T>) -> ServiceResult<T> {
        value.ok_or(ServiceError::InconsistentState(
            "written referential row not found in read-back",
        ))
    }
}
