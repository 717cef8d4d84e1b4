//! Yearly KPI target use-case service.

use super::{require_found, ServiceError, ServiceResult};
use crate::model::objectif::{Objectif, ObjectifInput};
use crate::model::EntityId;
use crate::repo::objectif_repo::ObjectifRepository;

pub struct ObjectifService<R: ObjectifRepository> {
    repo: R,
}

impl<R: ObjectifRepository> ObjectifService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create(&self, input: &ObjectifInput) -> ServiceResult<Objectif> {
        let id = self.repo.create(input)?;
        self.read_back(id)
    }

    pub fn update(&self, id: EntityId, input: &ObjectifInput) -> ServiceResult<Objectif> {
        self.repo.update(id, input)?;
        self.read_back(id)
    }

    pub fn get(&self, id: EntityId) -> ServiceResult<Objectif> {
        require_found(self.repo.get(id)?, "objectif", id)
    }

    pub fn list(&self, annee: Option<i32>) -> ServiceResult<Vec<Objectif>> {
        Ok(self.repo.list(annee)?)
    }

    /// Site target when one exists, else the parc-wide target.
    pub fn effective(
        &self,
        annee: i32,
        parc_id: EntityId,
        site_id: Option<EntityId>,
    ) -> ServiceResult<Option<Objectif>> {
        if let Some(site_id) = site_id {
            if let Some(objectif) = self.repo.find(annee, parc_id, Some(site_id))? {
                return Ok(Some(objectif));
            }
        }
        Ok(self.repo.find(annee, parc_id, None)?)
    }

    pub fn delete(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete(id)?)
    }

    fn read_back(&self, id: EntityId) -> ServiceResult<Objectif> {
        self.repo.get(id)?.ok_or(ServiceError::InconsistentState(
            "written objectif not found in read-back",
        ))
    }
}
